//! Engine counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for one aggregation engine
#[derive(Debug, Default)]
pub struct EngineStats {
    enqueued: AtomicU64,
    coalesced: AtomicU64,
    flushes: AtomicU64,
    delivered: AtomicU64,
    discarded: AtomicU64,
}

impl EngineStats {
    pub(crate) fn record_enqueue(&self, coalesced: bool) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        if coalesced {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_flush(&self, delivered: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.delivered.fetch_add(delivered as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_discard(&self, discarded: usize) {
        self.discarded.fetch_add(discarded as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_enqueued: self.enqueued.load(Ordering::Relaxed),
            events_coalesced: self.coalesced.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            events_delivered: self.delivered.load(Ordering::Relaxed),
            events_discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Raw events accepted by the engine
    pub events_enqueued: u64,
    /// Events merged into an entry that was already pending
    pub events_coalesced: u64,
    /// Non-empty batches handed to the delivery context
    pub flushes: u64,
    /// Merged events handed to the delivery context
    pub events_delivered: u64,
    /// Pending entries dropped on stop
    pub events_discarded: u64,
}
