use crate::plan::CollectionStats;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// This stores some global states for an MMTK instance.
/// The plan keeps a reference to it, and the public API reads it without going through the plan.
#[derive(Default)]
pub struct GlobalState {
    /// The number of collection cycles that ran to completion or were started. Also the id of
    /// the last cycle.
    pub(crate) gc_count: AtomicUsize,
    /// Statistics of the last completed cycle.
    pub(crate) last_stats: Mutex<Option<CollectionStats>>,
}

impl GlobalState {
    /// Claim the id of a new cycle.
    pub(crate) fn next_gc_id(&self) -> usize {
        self.gc_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn collection_count(&self) -> usize {
        self.gc_count.load(Ordering::SeqCst)
    }

    pub fn last_collection_stats(&self) -> Option<CollectionStats> {
        self.last_stats.lock().unwrap().clone()
    }

    pub(crate) fn record_collection(&self, stats: CollectionStats) {
        *self.last_stats.lock().unwrap() = Some(stats);
    }
}
