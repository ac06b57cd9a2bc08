use crate::engine::{reconcile_with, BallEvent, SeedPolicy};
use crate::snapshot::Snapshot;
use rayon::prelude::*;
use std::sync::Mutex;

/// Append-only snapshot collector shared by the worker pool.
///
/// Workers append in whatever order they finish; frame order is restored
/// once, after ingestion, by [`History::into_sorted`] or [`History::results`].
#[derive(Debug, Default)]
pub struct History {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, snapshot: Snapshot) {
        // A worker that panicked mid-push can't leave the Vec half-written,
        // so a poisoned lock still guards valid data.
        let mut guard = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of everything collected so far.
    pub fn sorted(&self) -> Vec<Snapshot> {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner()).clone();
        sort_by_frame(&mut snapshots);
        snapshots
    }

    /// Recompute the event log from scratch.
    pub fn results(&self, seed: SeedPolicy) -> Vec<BallEvent> {
        reconcile_with(&self.sorted(), seed)
    }

    /// Consume the collector once ingestion is over.
    pub fn into_sorted(self) -> Vec<Snapshot> {
        let mut snapshots = self.snapshots.into_inner().unwrap_or_else(|e| e.into_inner());
        sort_by_frame(&mut snapshots);
        snapshots
    }
}

/// Frame order is the fold order.  Stable so equal indices keep arrival order.
pub fn sort_by_frame(snapshots: &mut [Snapshot]) {
    snapshots.par_sort_by_key(Snapshot::frame_index);
}
