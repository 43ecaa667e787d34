//! Pending changes accumulated between flushes

use ahash::AHashMap;
use quiesce_core::{merge, ChangeEvent, ChangeKind};
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

/// Path -> merged kind since the last flush
///
/// Holds at most one entry per path. The stored kind is the fold of every kind
/// recorded for that path, in arrival order. Not synchronized on its own; the
/// engine keeps it behind its state lock.
#[derive(Debug, Default)]
pub struct PendingBatch {
    changes: AHashMap<PathBuf, ChangeKind>,
}

/// Outcome of recording one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// First event for this path in the batch
    Inserted(ChangeKind),
    /// Merged into an existing entry
    Merged {
        previous: ChangeKind,
        merged: ChangeKind,
    },
}

impl Recorded {
    /// Kind now pending for the path
    pub fn kind(self) -> ChangeKind {
        match self {
            Self::Inserted(kind) => kind,
            Self::Merged { merged, .. } => merged,
        }
    }
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge an event
    pub fn record(&mut self, event: ChangeEvent, prefer_added: bool) -> Recorded {
        match self.changes.entry(event.path) {
            Entry::Occupied(mut entry) => {
                let previous = *entry.get();
                let merged = merge(previous, event.kind, prefer_added);
                entry.insert(merged);
                Recorded::Merged { previous, merged }
            }
            Entry::Vacant(entry) => {
                entry.insert(event.kind);
                Recorded::Inserted(event.kind)
            }
        }
    }

    /// Swap out the whole batch, leaving an empty one behind
    pub fn take(&mut self) -> PendingBatch {
        std::mem::take(self)
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }

    pub fn get(&self, path: &Path) -> Option<ChangeKind> {
        self.changes.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Consume into events; order across paths is unspecified
    pub fn into_events(self) -> Vec<ChangeEvent> {
        self.changes
            .into_iter()
            .map(|(path, kind)| ChangeEvent { path, kind })
            .collect()
    }
}
