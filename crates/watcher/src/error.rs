//! Lifecycle errors

use thiserror::Error;

/// The lifecycle could not bring up its machinery
///
/// Per-target registration failures are not errors at this level; they are
/// collected in the start report.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to spawn the {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl LifecycleError {
    pub(crate) fn spawn(thread: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Spawn { thread, source }
    }
}
