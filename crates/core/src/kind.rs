//! Change kinds reported by watch providers

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a watched path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    /// Path was created
    Added,
    /// Path was deleted
    Removed,
    /// Contents or watched attributes changed
    Modified,
    /// Path was the old name of a rename
    RenamedFrom,
    /// Path is the new name of a rename
    RenamedTo,
}

impl ChangeKind {
    /// All kinds, in declaration order
    pub const ALL: [ChangeKind; 5] = [
        ChangeKind::Added,
        ChangeKind::Removed,
        ChangeKind::Modified,
        ChangeKind::RenamedFrom,
        ChangeKind::RenamedTo,
    ];

    /// Severity rank used by the merge policy (higher wins)
    ///
    /// Rank 1 is left free for kinds a provider cannot classify.
    pub fn rank(self) -> u8 {
        match self {
            Self::Added => 2,
            Self::Modified => 3,
            Self::RenamedFrom | Self::RenamedTo => 4,
            Self::Removed => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::RenamedFrom => "renamed-from",
            Self::RenamedTo => "renamed-to",
        }
    }

    /// True for the two halves of a rename
    pub fn is_rename(self) -> bool {
        matches!(self, Self::RenamedFrom | Self::RenamedTo)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
