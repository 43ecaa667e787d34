//! Delivery context
//!
//! Every consumer callback runs on one dedicated thread, fed by a channel.
//! Engines and providers enqueue from whatever thread they run on; the
//! consumer only ever sees the delivery thread.

use crossbeam_channel::{unbounded, Receiver, Sender};
use quiesce_core::{ChangeEvent, ProviderError};
use std::io;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, trace, warn};

/// Consumer of merged changes
///
/// Invoked once per (path, merged kind) per flush, always on the delivery
/// thread. Implementations are expected to return quickly; there is no timeout.
pub trait ChangeHandler: Send + 'static {
    /// A merged change for one path
    fn on_change(&mut self, event: ChangeEvent);

    /// The notification source reported a failure (e.g. dropped events)
    fn on_provider_error(&mut self, error: ProviderError) {
        warn!("Watch provider failure: {}", error);
    }
}

impl<F> ChangeHandler for F
where
    F: FnMut(ChangeEvent) + Send + 'static,
{
    fn on_change(&mut self, event: ChangeEvent) {
        self(event)
    }
}

enum Delivery {
    Batch(Vec<ChangeEvent>),
    ProviderError(ProviderError),
    Shutdown,
}

/// Cheap handle for handing work to the delivery thread
#[derive(Clone)]
pub struct DeliveryHandle {
    tx: Sender<Delivery>,
}

impl DeliveryHandle {
    /// Queue a flushed batch; returns false if the delivery thread is gone
    pub(crate) fn deliver(&self, events: Vec<ChangeEvent>) -> bool {
        if events.is_empty() {
            return true;
        }
        self.send(Delivery::Batch(events))
    }

    /// Queue a provider failure signal; returns false if the delivery thread is gone
    pub fn report_error(&self, error: ProviderError) -> bool {
        self.send(Delivery::ProviderError(error))
    }

    fn send(&self, delivery: Delivery) -> bool {
        if self.tx.send(delivery).is_err() {
            warn!("Delivery context is gone, dropping notification");
            return false;
        }
        true
    }
}

/// Owns the delivery thread and the consumer handler
pub struct Dispatcher {
    handle: DeliveryHandle,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl Dispatcher {
    /// Spawn the delivery thread for a handler
    pub fn spawn<H: ChangeHandler>(handler: H) -> io::Result<Self> {
        let (tx, rx) = unbounded();

        let thread = thread::Builder::new()
            .name("quiesce-delivery".to_string())
            .spawn(move || run_delivery(rx, handler))?;
        let thread_id = thread.thread().id();

        Ok(Self {
            handle: DeliveryHandle { tx },
            thread: Some(thread),
            thread_id,
        })
    }

    pub fn handle(&self) -> DeliveryHandle {
        self.handle.clone()
    }

    /// True when called from inside a handler callback
    pub fn is_delivery_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Deliver everything already queued, then stop the thread
    ///
    /// Called from inside a handler, this only signals the thread; it exits
    /// once the current callback returns.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        let _ = self.handle.tx.send(Delivery::Shutdown);

        if self.is_delivery_thread() {
            return;
        }
        if thread.join().is_err() {
            warn!("Delivery thread panicked in a change handler");
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_delivery<H: ChangeHandler>(rx: Receiver<Delivery>, mut handler: H) {
    debug!("Delivery thread started");

    while let Ok(delivery) = rx.recv() {
        match delivery {
            Delivery::Batch(events) => {
                trace!("Delivering {} merged changes", events.len());
                for event in events {
                    handler.on_change(event);
                }
            }
            Delivery::ProviderError(error) => handler.on_provider_error(error),
            Delivery::Shutdown => break,
        }
    }

    debug!("Delivery thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiesce_core::ChangeKind;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_closure_handler_receives_batches_in_order() {
        let (tx, rx) = unbounded();
        let mut dispatcher = Dispatcher::spawn(move |event: ChangeEvent| {
            tx.send(event).unwrap();
        })
        .unwrap();

        let handle = dispatcher.handle();
        assert!(handle.deliver(vec![ChangeEvent::new("a", ChangeKind::Added)]));
        assert!(handle.deliver(vec![ChangeEvent::new("b", ChangeKind::Removed)]));
        dispatcher.shutdown();

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                ChangeEvent::new("a", ChangeKind::Added),
                ChangeEvent::new("b", ChangeKind::Removed)
            ]
        );
    }

    struct Recorder {
        tx: Sender<Result<ChangeEvent, ProviderError>>,
    }

    impl ChangeHandler for Recorder {
        fn on_change(&mut self, event: ChangeEvent) {
            self.tx.send(Ok(event)).unwrap();
        }

        fn on_provider_error(&mut self, error: ProviderError) {
            self.tx.send(Err(error)).unwrap();
        }
    }

    #[test]
    fn test_provider_errors_reach_handler() {
        let (tx, rx) = unbounded();
        let dispatcher = Dispatcher::spawn(Recorder { tx }).unwrap();

        dispatcher
            .handle()
            .report_error(ProviderError::Overflow { path: None });

        let got = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(got, Err(ProviderError::Overflow { path: None }));
    }

    #[test]
    fn test_callbacks_run_on_one_thread() {
        let (tx, rx) = unbounded();
        let dispatcher = Dispatcher::spawn(move |_event: ChangeEvent| {
            tx.send(thread::current().id()).unwrap();
        })
        .unwrap();
        let dispatcher = Arc::new(dispatcher);

        let senders: Vec<_> = (0..4)
            .map(|i| {
                let handle = dispatcher.handle();
                thread::spawn(move || {
                    handle.deliver(vec![ChangeEvent::new(format!("f{i}"), ChangeKind::Modified)]);
                })
            })
            .collect();
        for sender in senders {
            sender.join().unwrap();
        }

        let ids: Vec<_> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert!(ids.iter().all(|id| *id == dispatcher.thread_id));
    }

    #[test]
    fn test_send_after_shutdown_fails_quietly() {
        let mut dispatcher = Dispatcher::spawn(|_event: ChangeEvent| {}).unwrap();
        let handle = dispatcher.handle();
        dispatcher.shutdown();

        assert!(!handle.deliver(vec![ChangeEvent::new("late", ChangeKind::Added)]));
        // Empty batches never touch the channel
        assert!(handle.deliver(Vec::new()));
    }
}
