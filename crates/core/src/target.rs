//! Declarative watch targets

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which kinds of attribute changes a target is interested in
///
/// Providers consult this to decide which raw notifications to forward.
/// Creation and removal of the watched entries are always reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestMask {
    /// Entries renamed, created or deleted (files)
    pub file_name: bool,
    /// Entries renamed, created or deleted (directories)
    pub dir_name: bool,
    /// Generic attribute changes
    pub attributes: bool,
    /// Size changes
    pub size: bool,
    /// Last-write time changes (content writes)
    pub last_write: bool,
    /// Last-access time changes
    pub last_access: bool,
    /// Creation time changes
    pub creation: bool,
    /// Permission / ownership changes
    pub security: bool,
}

impl InterestMask {
    /// Every flag set
    pub fn all() -> Self {
        Self {
            file_name: true,
            dir_name: true,
            attributes: true,
            size: true,
            last_write: true,
            last_access: true,
            creation: true,
            security: true,
        }
    }

    /// No flag set
    pub fn none() -> Self {
        Self {
            file_name: false,
            dir_name: false,
            attributes: false,
            size: false,
            last_write: false,
            last_access: false,
            creation: false,
            security: false,
        }
    }

    /// Content writes are visible through either size or last-write changes
    pub fn wants_content(&self) -> bool {
        self.size || self.last_write
    }

    /// Whether a name change (rename) is of interest
    pub fn wants_names(&self) -> bool {
        self.file_name || self.dir_name
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::none()
    }
}

impl Default for InterestMask {
    fn default() -> Self {
        Self {
            file_name: true,
            dir_name: true,
            size: true,
            last_write: true,
            ..Self::none()
        }
    }
}

/// What to observe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchTarget {
    /// File or directory to watch
    pub path: PathBuf,

    /// Watch the whole directory tree (directories only)
    #[serde(default)]
    pub recursive: bool,

    /// Target is a single file rather than a directory
    #[serde(default)]
    pub is_file: bool,

    /// Attribute changes of interest
    #[serde(default)]
    pub interest: InterestMask,

    /// Disabled targets are skipped on start (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl WatchTarget {
    /// A single file with the default interest mask
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: false,
            is_file: true,
            interest: InterestMask::default(),
            enabled: true,
        }
    }

    /// A directory with the default interest mask
    pub fn directory(path: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            recursive,
            is_file: false,
            interest: InterestMask::default(),
            enabled: true,
        }
    }

    pub fn with_interest(mut self, interest: InterestMask) -> Self {
        self.interest = interest;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn default_true() -> bool {
    true
}
