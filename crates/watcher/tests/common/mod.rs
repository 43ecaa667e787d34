//! Shared fixtures for lifecycle tests

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use quiesce_watcher::{
    ChangeEvent, ChangeHandler, ChangeKind, InterestMask, ProviderCallback, ProviderError,
    ProviderNotice, RegistrationError, WatchProvider,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// In-memory provider: tests push events through it by hand
#[derive(Default)]
pub struct MockProvider {
    active: Mutex<HashMap<PathBuf, (bool, ProviderCallback)>>,
    /// Every callback ever handed out, including unregistered ones
    history: Mutex<Vec<ProviderCallback>>,
    failing: Mutex<HashSet<PathBuf>>,
    removed: Mutex<Vec<PathBuf>>,
    adds: Mutex<usize>,
    removal_delay: Mutex<Duration>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make registrations of `path` fail with NotFound
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.failing.lock().insert(path.into());
    }

    /// Make every removal block for `delay`, like a backend draining callbacks
    pub fn slow_removal(&self, delay: Duration) {
        *self.removal_delay.lock() = delay;
    }

    /// Fire the callback registered for `target`; false if nothing is registered
    pub fn emit(&self, target: impl AsRef<Path>, path: impl Into<PathBuf>, kind: ChangeKind) -> bool {
        self.notify(target.as_ref(), ProviderNotice::changed(path, kind))
    }

    pub fn emit_error(&self, target: impl AsRef<Path>, error: ProviderError) -> bool {
        self.notify(target.as_ref(), ProviderNotice::Failed(error))
    }

    /// Fire every callback ever registered, as a late in-flight notification would
    pub fn emit_stale(&self, path: impl Into<PathBuf>, kind: ChangeKind) {
        let path = path.into();
        let callbacks: Vec<_> = self.history.lock().clone();
        for callback in callbacks {
            callback(ProviderNotice::changed(path.clone(), kind));
        }
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.active.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().clone()
    }

    pub fn add_calls(&self) -> usize {
        *self.adds.lock()
    }

    fn notify(&self, target: &Path, notice: ProviderNotice) -> bool {
        // Call outside the lock, like a real backend thread would
        let callback = self.active.lock().get(target).map(|(_, cb)| Arc::clone(cb));
        match callback {
            Some(callback) => {
                callback(notice);
                true
            }
            None => false,
        }
    }

    fn add(&self, path: &Path, is_file: bool, callback: ProviderCallback) -> Result<(), RegistrationError> {
        *self.adds.lock() += 1;

        if self.failing.lock().contains(path) {
            return Err(RegistrationError::NotFound(path.to_path_buf()));
        }

        let mut active = self.active.lock();
        if active.contains_key(path) {
            return Err(RegistrationError::AlreadyRegistered(path.to_path_buf()));
        }
        self.history.lock().push(Arc::clone(&callback));
        active.insert(path.to_path_buf(), (is_file, callback));
        Ok(())
    }

    fn remove(&self, path: &Path, is_file: bool) -> bool {
        let delay = *self.removal_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut active = self.active.lock();
        match active.get(path) {
            Some((registered_as_file, _)) if *registered_as_file == is_file => {
                active.remove(path);
                self.removed.lock().push(path.to_path_buf());
                true
            }
            _ => false,
        }
    }
}

impl WatchProvider for MockProvider {
    fn add_file(
        &self,
        path: &Path,
        _interest: InterestMask,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError> {
        self.add(path, true, callback)
    }

    fn add_directory(
        &self,
        path: &Path,
        _recursive: bool,
        _interest: InterestMask,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError> {
        self.add(path, false, callback)
    }

    fn remove_file(&self, path: &Path) -> bool {
        self.remove(path, true)
    }

    fn remove_directory(&self, path: &Path) -> bool {
        self.remove(path, false)
    }

    fn is_monitoring(&self) -> bool {
        !self.active.lock().is_empty()
    }
}

/// What the consumer saw
#[derive(Debug, Clone)]
pub enum Delivered {
    Change {
        at: Instant,
        event: ChangeEvent,
        thread: ThreadId,
    },
    Error(ProviderError),
}

/// Handler forwarding everything into a channel
pub struct Collector {
    tx: Sender<Delivered>,
}

impl Collector {
    pub fn new() -> (Self, Receiver<Delivered>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl ChangeHandler for Collector {
    fn on_change(&mut self, event: ChangeEvent) {
        let _ = self.tx.send(Delivered::Change {
            at: Instant::now(),
            event,
            thread: thread::current().id(),
        });
    }

    fn on_provider_error(&mut self, error: ProviderError) {
        let _ = self.tx.send(Delivered::Error(error));
    }
}

/// Next change delivery, failing the test after `timeout`
pub fn next_change(rx: &Receiver<Delivered>, timeout: Duration) -> (Instant, ChangeEvent, ThreadId) {
    match rx.recv_timeout(timeout) {
        Ok(Delivered::Change { at, event, thread }) => (at, event, thread),
        Ok(other) => panic!("expected a change, got {:?}", other),
        Err(_) => panic!("no change delivered within {:?}", timeout),
    }
}

/// Assert nothing at all is delivered for `wait`
pub fn assert_quiet(rx: &Receiver<Delivered>, wait: Duration) {
    if let Ok(delivered) = rx.recv_timeout(wait) {
        panic!("unexpected delivery: {:?}", delivered);
    }
}
