//! Concrete watch providers
//!
//! `NotifyProvider` wraps the `notify` crate's recommended backend
//! (inotify on Linux, FSEvents on macOS, ReadDirectoryChangesW on Windows).

mod native;

pub use native::NotifyProvider;
