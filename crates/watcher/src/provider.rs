//! Watch provider interface
//!
//! A provider performs the actual OS-level change detection. The engine only
//! relies on this trait, so any notification source (the bundled `notify`
//! backend, a polling scanner, a test double) can feed it.

use quiesce_core::{ChangeEvent, ChangeKind, InterestMask, ProviderError, RegistrationError};
use std::path::Path;
use std::sync::Arc;

/// Something a provider reports for a registered target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderNotice {
    /// A raw change for a path
    Changed(ChangeEvent),
    /// The provider itself failed (e.g. its event buffer overflowed)
    Failed(ProviderError),
}

impl ProviderNotice {
    pub fn changed(path: impl Into<std::path::PathBuf>, kind: ChangeKind) -> Self {
        Self::Changed(ChangeEvent::new(path, kind))
    }
}

/// Callback invoked by a provider, from any thread, until the target is removed
pub type ProviderCallback = Arc<dyn Fn(ProviderNotice) + Send + Sync>;

/// Platform-agnostic notification source
///
/// Registration failures are returned, never panicked. Removal is idempotent.
pub trait WatchProvider: Send + Sync {
    /// Watch a single file
    fn add_file(
        &self,
        path: &Path,
        interest: InterestMask,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError>;

    /// Watch a directory, optionally its whole tree
    fn add_directory(
        &self,
        path: &Path,
        recursive: bool,
        interest: InterestMask,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError>;

    /// Stop watching a file; returns false if it was not registered
    fn remove_file(&self, path: &Path) -> bool;

    /// Stop watching a directory; returns false if it was not registered
    fn remove_directory(&self, path: &Path) -> bool;

    /// True while at least one target is registered
    fn is_monitoring(&self) -> bool;
}

impl<P: WatchProvider + ?Sized> WatchProvider for Arc<P> {
    fn add_file(
        &self,
        path: &Path,
        interest: InterestMask,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError> {
        (**self).add_file(path, interest, callback)
    }

    fn add_directory(
        &self,
        path: &Path,
        recursive: bool,
        interest: InterestMask,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError> {
        (**self).add_directory(path, recursive, interest, callback)
    }

    fn remove_file(&self, path: &Path) -> bool {
        (**self).remove_file(path)
    }

    fn remove_directory(&self, path: &Path) -> bool {
        (**self).remove_directory(path)
    }

    fn is_monitoring(&self) -> bool {
        (**self).is_monitoring()
    }
}
