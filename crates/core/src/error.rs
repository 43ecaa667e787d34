//! Error taxonomy shared by providers, the engine and configuration

use std::path::PathBuf;
use thiserror::Error;

/// A watch target could not be registered with a provider
///
/// Recorded per target; never aborts registration of the other targets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("expected a file: {0}")]
    NotAFile(PathBuf),

    #[error("expected a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("already registered: {0}")]
    AlreadyRegistered(PathBuf),

    #[error("failed to watch {path}: {message}")]
    Backend { path: PathBuf, message: String },
}

impl RegistrationError {
    /// Path the failed registration was for
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(path)
            | Self::PermissionDenied(path)
            | Self::NotAFile(path)
            | Self::NotADirectory(path)
            | Self::AlreadyRegistered(path)
            | Self::Backend { path, .. } => path,
        }
    }
}

/// The notification source itself failed
///
/// Events lost this way cannot be reconstructed by the engine; the signal only
/// tells the consumer that its view may be stale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("notification buffer overflowed, events were dropped{}", fmt_scope(.path))]
    Overflow { path: Option<PathBuf> },

    #[error("watch backend error: {0}")]
    Backend(String),
}

fn fmt_scope(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" under {}", path.display()),
        None => String::new(),
    }
}

/// Rejected configuration value
///
/// The previously configured value stays in effect.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("quiet window must be non-negative, got {0}ms")]
    NegativeQuietWindow(i64),

    #[error("watch target has an empty path")]
    EmptyTargetPath,

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
