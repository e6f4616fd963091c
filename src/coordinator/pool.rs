//! Worker pool bookkeeping
//!
//! Tracks one free/busy flag per worker. Workers are identified by rank,
//! 1-based (rank 0 is the coordinator). Claim-and-mark is atomic because
//! the coordinator is single-flow; the linear scan is fine for pools of
//! tens of workers.

/// Free/busy flags for the worker pool
pub struct WorkerPool {
    free: Vec<bool>,
}

impl WorkerPool {
    /// Pool of `count` workers, all initially free
    pub fn new(count: usize) -> Self {
        Self {
            free: vec![true; count],
        }
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// First free worker rank, if any
    pub fn find_free(&self) -> Option<usize> {
        self.free.iter().position(|&f| f).map(|i| i + 1)
    }

    pub fn mark_busy(&mut self, rank: usize) {
        self.free[rank - 1] = false;
    }

    pub fn mark_free(&mut self, rank: usize) {
        self.free[rank - 1] = true;
    }
}
