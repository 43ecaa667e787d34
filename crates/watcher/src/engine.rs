//! Aggregation engine
//!
//! Raw events are merged per path into a pending batch. Every enqueue pushes
//! the debounce deadline to `now + quiet_window`; when the deadline passes
//! without further events the timer thread swaps the batch out and hands it to
//! the delivery context.
//!
//! ```text
//! enqueue ──► [lock] batch.record + deadline = now + window ──► notify timer
//! timer   ──► [lock] deadline passed? take batch + hand to delivery queue
//! ```
//!
//! The batch and the deadline share one lock. Batches are handed to the
//! delivery queue under that lock so consecutive flushes reach the consumer
//! in order; the hand-off is a non-blocking channel push. The lock is never
//! held while a consumer callback runs or while calling into a provider.

use crate::batch::{PendingBatch, Recorded};
use crate::delivery::DeliveryHandle;
use crate::stats::{EngineStats, StatsSnapshot};
use parking_lot::{Condvar, Mutex};
use quiesce_core::{ChangeEvent, ConfigError, EngineConfig};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, trace, warn};

struct EngineState {
    batch: PendingBatch,
    /// When the armed timer fires; `None` when disarmed
    deadline: Option<Instant>,
    config: EngineConfig,
    shutdown: bool,
}

struct Shared {
    state: Mutex<EngineState>,
    wake: Condvar,
    delivery: DeliveryHandle,
    stats: EngineStats,
}

impl Shared {
    fn enqueue(&self, event: ChangeEvent) -> bool {
        trace!(path = %event.path.display(), kind = %event.kind, "Enqueue");

        let mut state = self.state.lock();
        if state.shutdown {
            return false;
        }

        let prefer_added = state.config.prefer_added_on_create_modify;
        let recorded = state.batch.record(event, prefer_added);
        // A window too large to represent leaves the batch for an explicit flush
        state.deadline = Instant::now().checked_add(state.config.quiet_window);
        drop(state);

        self.wake.notify_one();
        self.stats
            .record_enqueue(matches!(recorded, Recorded::Merged { .. }));
        true
    }

    /// Hand a batch to the delivery queue; call with the state lock held
    fn dispatch(&self, batch: PendingBatch, reason: &str) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let events = batch.into_events();
        let count = events.len();
        debug!("Flushing {} merged changes ({})", count, reason);

        self.stats.record_flush(count);
        self.delivery.deliver(events);
        count
    }
}

/// Cloneable enqueue handle given to provider callbacks
///
/// Enqueueing through a sink after the engine shut down is a no-op.
#[derive(Clone)]
pub struct EngineSink {
    shared: Arc<Shared>,
}

impl EngineSink {
    /// Returns false if the engine has shut down
    pub fn enqueue(&self, event: ChangeEvent) -> bool {
        self.shared.enqueue(event)
    }
}

/// Debouncing, merging change collector
pub struct AggregationEngine {
    shared: Arc<Shared>,
    timer: Option<JoinHandle<()>>,
}

impl AggregationEngine {
    /// Create an engine delivering through `delivery`
    ///
    /// Spawns the debounce timer thread; fails only if that spawn fails.
    pub fn spawn(config: EngineConfig, delivery: DeliveryHandle) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState {
                batch: PendingBatch::new(),
                deadline: None,
                config,
                shutdown: false,
            }),
            wake: Condvar::new(),
            delivery,
            stats: EngineStats::default(),
        });

        let timer_shared = Arc::clone(&shared);
        let timer = thread::Builder::new()
            .name("quiesce-debounce".to_string())
            .spawn(move || run_timer(timer_shared))?;

        debug!(
            "Aggregation engine started (quiet window: {:?})",
            config.quiet_window
        );

        Ok(Self {
            shared,
            timer: Some(timer),
        })
    }

    /// Merge an event into the pending batch and restart the quiet window
    ///
    /// Returns false if the engine has shut down.
    pub fn enqueue(&self, event: ChangeEvent) -> bool {
        self.shared.enqueue(event)
    }

    pub fn sink(&self) -> EngineSink {
        EngineSink {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Deliver everything pending right now, without waiting for the window
    ///
    /// Returns the number of merged changes handed to the delivery context.
    pub fn flush_now(&self) -> usize {
        let mut state = self.shared.state.lock();
        state.deadline = None;
        let batch = state.batch.take();
        self.shared.dispatch(batch, "explicit flush")
    }

    /// Drop everything pending without delivering it and disarm the timer
    pub fn discard_pending(&self) -> usize {
        let discarded = {
            let mut state = self.shared.state.lock();
            state.deadline = None;
            let count = state.batch.len();
            state.batch.clear();
            count
        };

        if discarded > 0 {
            debug!("Discarded {} pending changes", discarded);
        }
        self.shared.stats.record_discard(discarded);
        discarded
    }

    /// Number of distinct paths waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.shared.state.lock().batch.len()
    }

    pub fn config(&self) -> EngineConfig {
        self.shared.state.lock().config
    }

    /// Replace the configuration; an already armed deadline is kept
    pub fn set_config(&self, config: EngineConfig) {
        self.shared.state.lock().config = config;
    }

    /// Update the quiet window from a signed millisecond count
    ///
    /// A negative value is rejected and the current window stays in effect.
    pub fn set_quiet_window_ms(&self, quiet_window_ms: i64) -> Result<(), ConfigError> {
        self.shared
            .state
            .lock()
            .config
            .set_quiet_window_ms(quiet_window_ms)
    }

    pub fn set_prefer_added(&self, prefer_added: bool) {
        self.shared.state.lock().config.prefer_added_on_create_modify = prefer_added;
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn is_shut_down(&self) -> bool {
        self.timer.is_none()
    }

    /// Stop accepting events, drop the pending batch and join the timer thread
    ///
    /// Once this returns the timer can no longer fire. Returns the number of
    /// pending changes that were dropped.
    pub fn shutdown(&mut self) -> usize {
        let Some(timer) = self.timer.take() else {
            return 0;
        };

        let discarded = {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.deadline = None;
            let count = state.batch.len();
            state.batch.clear();
            count
        };
        self.shared.wake.notify_all();
        self.shared.stats.record_discard(discarded);

        if timer.join().is_err() {
            warn!("Debounce timer thread panicked");
        }
        debug!(
            "Aggregation engine stopped ({} pending changes dropped)",
            discarded
        );
        discarded
    }
}

impl Drop for AggregationEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_timer(shared: Arc<Shared>) {
    let mut state = shared.state.lock();

    loop {
        if state.shutdown {
            break;
        }

        let deadline = state.deadline;
        match deadline {
            None => shared.wake.wait(&mut state),
            Some(deadline) if Instant::now() < deadline => {
                // Woken early either by a rearm or spuriously; re-read the deadline
                shared.wake.wait_until(&mut state, deadline);
            }
            Some(_) => {
                state.deadline = None;
                let batch = state.batch.take();
                shared.dispatch(batch, "quiet window elapsed");
            }
        }
    }
}
