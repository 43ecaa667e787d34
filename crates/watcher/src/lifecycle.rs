//! Watch lifecycle state machine
//!
//! ```text
//! Stopped ──start──► Starting ──(all targets attempted)──► Active
//!    ▲                                                       │
//!    └────────────── Stopping ◄────────stop──────────────────┘
//! ```
//!
//! Only `Active` lets provider callbacks through to the engine. A bad target
//! is recorded in the start report and never blocks the others. Changing
//! targets means a full stop + start cycle.

use crate::delivery::{ChangeHandler, DeliveryHandle, Dispatcher};
use crate::engine::{AggregationEngine, EngineSink};
use crate::error::LifecycleError;
use crate::provider::{ProviderCallback, ProviderNotice, WatchProvider};
use crate::stats::StatsSnapshot;
use parking_lot::Mutex;
use quiesce_core::{
    quiet_window_from_millis, ConfigError, EngineConfig, RegistrationError, WatchTarget,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the lifecycle is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Stopped,
    Starting,
    Active,
    Stopping,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Active,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Starting => 1,
            Self::Active => 2,
            Self::Stopping => 3,
        }
    }
}

/// Lifecycle state readable from provider callbacks without locking
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Stopped.as_u8()))
    }

    fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: LifecycleState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

/// A target that could not be registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub target: WatchTarget,
    pub error: RegistrationError,
}

/// Outcome of a start call
#[derive(Debug, Clone, Default)]
pub struct StartReport {
    /// Paths now being watched
    pub registered: Vec<PathBuf>,
    /// Targets the provider rejected
    pub failures: Vec<TargetFailure>,
    /// Disabled targets that were not attempted
    pub skipped: usize,
    /// Start was a no-op because the lifecycle was already active
    pub already_active: bool,
}

impl StartReport {
    /// Every enabled target was registered
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a stop call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Targets removed from the provider
    pub unregistered: usize,
    /// Pending changes dropped without delivery
    pub discarded: usize,
    /// Stop was a no-op because the lifecycle was already stopped
    pub already_stopped: bool,
}

/// Snapshot of the lifecycle for status output
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub state: LifecycleState,
    pub registered_targets: usize,
    pub last_start_failures: usize,
    pub pending_changes: usize,
    pub provider_monitoring: bool,
    /// Counters of the current (or last) engine session
    pub engine: StatsSnapshot,
}

struct Registration {
    path: PathBuf,
    is_file: bool,
}

struct Session {
    engine: AggregationEngine,
    registrations: Vec<Registration>,
}

/// Start/stop state machine owning an engine and its registrations
pub struct WatchLifecycle<P: WatchProvider> {
    provider: P,
    dispatcher: Dispatcher,
    config: Mutex<EngineConfig>,
    state: Arc<StateCell>,
    /// Held for the whole of a start or stop; serializes transitions
    session: Mutex<Option<Session>>,
    last_stats: Mutex<StatsSnapshot>,
    last_start_failures: AtomicUsize,
}

impl<P: WatchProvider> WatchLifecycle<P> {
    /// Create a stopped lifecycle; `handler` receives every merged change
    ///
    /// The delivery thread is spawned here and lives as long as the lifecycle,
    /// so all callbacks land on the same thread across restarts.
    pub fn new<H: ChangeHandler>(
        provider: P,
        config: EngineConfig,
        handler: H,
    ) -> Result<Self, LifecycleError> {
        let dispatcher = Dispatcher::spawn(handler).map_err(LifecycleError::spawn("delivery"))?;

        Ok(Self {
            provider,
            dispatcher,
            config: Mutex::new(config),
            state: Arc::new(StateCell::new()),
            session: Mutex::new(None),
            last_stats: Mutex::new(StatsSnapshot::default()),
            last_start_failures: AtomicUsize::new(0),
        })
    }

    /// Register every enabled target and begin delivering changes
    ///
    /// No-op when already active.
    pub fn start(&self, targets: &[WatchTarget]) -> Result<StartReport, LifecycleError> {
        let mut session = self.session.lock();
        if session.is_some() {
            debug!("Start ignored: already active");
            return Ok(StartReport {
                already_active: true,
                ..StartReport::default()
            });
        }

        self.state.set(LifecycleState::Starting);

        let config = *self.config.lock();
        let engine = match AggregationEngine::spawn(config, self.dispatcher.handle())
            .map_err(LifecycleError::spawn("debounce"))
        {
            Ok(engine) => engine,
            Err(error) => {
                self.state.set(LifecycleState::Stopped);
                return Err(error);
            }
        };

        let callback = self.route_to(engine.sink(), self.dispatcher.handle());
        let mut report = StartReport::default();
        let mut registrations = Vec::new();

        for target in targets {
            if !target.enabled {
                debug!("Skipping disabled target {}", target.path.display());
                report.skipped += 1;
                continue;
            }

            match self.register(target, Arc::clone(&callback)) {
                Ok(()) => {
                    debug!("Watching {}", target.path.display());
                    report.registered.push(target.path.clone());
                    registrations.push(Registration {
                        path: target.path.clone(),
                        is_file: target.is_file,
                    });
                }
                Err(error) => {
                    warn!("Failed to watch {}: {}", target.path.display(), error);
                    report.failures.push(TargetFailure {
                        target: target.clone(),
                        error,
                    });
                }
            }
        }

        self.last_start_failures
            .store(report.failures.len(), Ordering::Relaxed);
        *session = Some(Session {
            engine,
            registrations,
        });
        self.state.set(LifecycleState::Active);

        info!(
            "Watching {} targets ({} failed, {} disabled, quiet window {:?})",
            report.registered.len(),
            report.failures.len(),
            report.skipped,
            config.quiet_window
        );
        Ok(report)
    }

    /// Drop pending changes without delivering them, then unregister everything
    ///
    /// The debounce timer is stopped before any target is removed, so a slow
    /// unregistration cannot let a pending batch through. Batches that
    /// were already handed to the delivery thread are still delivered.
    /// No-op when already stopped.
    pub fn stop(&self) -> StopReport {
        let mut session = self.session.lock();
        let Some(mut running) = session.take() else {
            debug!("Stop ignored: already stopped");
            return StopReport {
                already_stopped: true,
                ..StopReport::default()
            };
        };

        self.state.set(LifecycleState::Stopping);

        // Disarm before unregistering; removal may block on in-flight callbacks
        let discarded = running.engine.shutdown();
        *self.last_stats.lock() = running.engine.stats();

        let mut unregistered = 0;
        for registration in &running.registrations {
            let removed = if registration.is_file {
                self.provider.remove_file(&registration.path)
            } else {
                self.provider.remove_directory(&registration.path)
            };
            if removed {
                unregistered += 1;
            } else {
                debug!(
                    "Provider had no registration for {}",
                    registration.path.display()
                );
            }
        }

        self.state.set(LifecycleState::Stopped);

        info!(
            "Stopped watching ({} targets removed, {} pending changes dropped)",
            unregistered, discarded
        );
        StopReport {
            unregistered,
            discarded,
            already_stopped: false,
        }
    }

    /// Full stop + start with a new set of targets
    pub fn restart(&self, targets: &[WatchTarget]) -> Result<StartReport, LifecycleError> {
        self.stop();
        self.start(targets)
    }

    pub fn is_active(&self) -> bool {
        self.state.get() == LifecycleState::Active
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Deliver pending changes now; returns 0 when not active
    pub fn flush_now(&self) -> usize {
        self.session
            .lock()
            .as_ref()
            .map_or(0, |running| running.engine.flush_now())
    }

    pub fn config(&self) -> EngineConfig {
        *self.config.lock()
    }

    /// Replace the engine configuration, for this and later sessions
    pub fn set_config(&self, config: EngineConfig) {
        self.update_config(|current| *current = config);
    }

    /// Update the quiet window; a negative value leaves the current one in effect
    pub fn set_quiet_window_ms(&self, quiet_window_ms: i64) -> Result<(), ConfigError> {
        let quiet_window = quiet_window_from_millis(quiet_window_ms)?;
        self.update_config(|current| current.quiet_window = quiet_window);
        Ok(())
    }

    pub fn set_prefer_added(&self, prefer_added: bool) {
        self.update_config(|current| current.prefer_added_on_create_modify = prefer_added);
    }

    /// Read-modify-write of the config, pushed to the running engine
    ///
    /// Lock order matches `start`: session, then config.
    fn update_config(&self, update: impl FnOnce(&mut EngineConfig)) {
        let session = self.session.lock();
        let mut config = self.config.lock();
        update(&mut config);
        if let Some(running) = session.as_ref() {
            running.engine.set_config(*config);
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let session = self.session.lock();
        let (registered_targets, pending_changes, engine) = match session.as_ref() {
            Some(running) => (
                running.registrations.len(),
                running.engine.pending_len(),
                running.engine.stats(),
            ),
            None => (0, 0, *self.last_stats.lock()),
        };

        Diagnostics {
            state: self.state.get(),
            registered_targets,
            last_start_failures: self.last_start_failures.load(Ordering::Relaxed),
            pending_changes,
            provider_monitoring: self.provider.is_monitoring(),
            engine,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn register(
        &self,
        target: &WatchTarget,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError> {
        if target.is_file {
            self.provider.add_file(&target.path, target.interest, callback)
        } else {
            self.provider
                .add_directory(&target.path, target.recursive, target.interest, callback)
        }
    }

    /// Provider callback shared by all targets of one session
    fn route_to(&self, sink: EngineSink, delivery: DeliveryHandle) -> ProviderCallback {
        let state = Arc::clone(&self.state);

        Arc::new(move |notice: ProviderNotice| {
            if state.get() != LifecycleState::Active {
                return;
            }
            match notice {
                ProviderNotice::Changed(event) => {
                    sink.enqueue(event);
                }
                ProviderNotice::Failed(error) => {
                    delivery.report_error(error);
                }
            }
        })
    }
}

impl<P: WatchProvider> Drop for WatchLifecycle<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
