//! Task registry and outstanding-result tracking
//!
//! The registry is the ordered record of every dispatched logical command
//! together with the set of sub-tasks whose results have not yet arrived.
//! Owned exclusively by the coordinator's single control flow; no locking.
//!
//! Each dispatched sub-task gets a unique id minted here; workers echo the
//! id in their result and the coordinator resolves it back to a registry
//! index. Matching by id rather than queue order keeps correlation correct
//! when chunks of one matrix job finish on different workers out of dispatch
//! order.

use std::collections::VecDeque;
use std::time::Instant;

/// Timing and metadata for one logical client command
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub client_id: String,
    pub verb: String,
    pub argument: String,

    /// Seconds since coordinator start; 0.0 until set
    pub arrival_time: f64,
    pub dispatch_time: f64,
    pub completion_time: f64,
}

/// One dispatched sub-task awaiting its result
#[derive(Debug, Clone, Copy)]
struct Outstanding {
    sub_task_id: u64,
    task_index: usize,
}

/// Monotonic run clock, seconds since coordinator start
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Ordered task records plus the outstanding sub-task queue
pub struct TaskRegistry {
    records: Vec<TaskRecord>,
    outstanding: VecDeque<Outstanding>,
    next_sub_task_id: u64,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            outstanding: VecDeque::new(),
            // Id 0 is reserved for replies that correlate to nothing
            next_sub_task_id: 1,
        }
    }

    /// Register a newly parsed command; returns its registry index
    pub fn record_arrival(
        &mut self,
        client_id: &str,
        verb: &str,
        argument: &str,
        now: f64,
    ) -> usize {
        self.records.push(TaskRecord {
            client_id: client_id.to_string(),
            verb: verb.to_string(),
            argument: argument.to_string(),
            arrival_time: now,
            dispatch_time: 0.0,
            completion_time: 0.0,
        });
        self.records.len() - 1
    }

    /// Record the first (or only) sub-task send time
    pub fn set_dispatch(&mut self, task_index: usize, now: f64) {
        self.records[task_index].dispatch_time = now;
    }

    /// Record a result arrival; for partitioned jobs the last write wins
    pub fn set_completion(&mut self, task_index: usize, now: f64) {
        self.records[task_index].completion_time = now;
    }

    /// Enqueue one outstanding sub-task for a record; returns the minted id
    ///
    /// A matrix job split into K chunks enqueues K entries referencing the
    /// same registry index.
    pub fn enqueue(&mut self, task_index: usize) -> u64 {
        let sub_task_id = self.next_sub_task_id;
        self.next_sub_task_id += 1;
        self.outstanding.push_back(Outstanding {
            sub_task_id,
            task_index,
        });
        sub_task_id
    }

    /// Retire an outstanding sub-task by id; returns its registry index
    ///
    /// `None` means a stray or duplicate result (protocol error at the
    /// caller).
    pub fn resolve(&mut self, sub_task_id: u64) -> Option<usize> {
        let pos = self
            .outstanding
            .iter()
            .position(|o| o.sub_task_id == sub_task_id)?;
        self.outstanding.remove(pos).map(|o| o.task_index)
    }

    /// Number of results not yet received
    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn record(&self, task_index: usize) -> &TaskRecord {
        &self.records[task_index]
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrival_dispatch_completion_ordering() {
        let mut reg = TaskRegistry::new();
        let idx = reg.record_arrival("CLI0", "PRIMES", "100", 0.1);
        reg.set_dispatch(idx, 0.2);
        reg.set_completion(idx, 0.9);

        let rec = reg.record(idx);
        assert!(rec.arrival_time <= rec.dispatch_time);
        assert!(rec.dispatch_time <= rec.completion_time);
    }

    #[test]
    fn test_resolve_out_of_order() {
        let mut reg = TaskRegistry::new();
        let idx = reg.record_arrival("CLI0", "MATRIXADD", "8 a b", 0.0);
        let first = reg.enqueue(idx);
        let second = reg.enqueue(idx);
        let third = reg.enqueue(idx);
        assert_eq!(reg.outstanding_len(), 3);

        // Chunks finish out of dispatch order
        assert_eq!(reg.resolve(second), Some(idx));
        assert_eq!(reg.resolve(third), Some(idx));
        assert_eq!(reg.resolve(first), Some(idx));
        assert_eq!(reg.outstanding_len(), 0);
    }

    #[test]
    fn test_resolve_unknown_id() {
        let mut reg = TaskRegistry::new();
        let idx = reg.record_arrival("CLI0", "PRIMES", "10", 0.0);
        let id = reg.enqueue(idx);

        assert_eq!(reg.resolve(id + 100), None);
        assert_eq!(reg.resolve(id), Some(idx));
        // A duplicate result no longer matches
        assert_eq!(reg.resolve(id), None);
    }

    #[test]
    fn test_id_zero_is_never_minted() {
        let mut reg = TaskRegistry::new();
        let idx = reg.record_arrival("CLI0", "PRIMES", "10", 0.0);
        let id = reg.enqueue(idx);
        assert_ne!(id, 0);
        // The reserved id matches nothing even with entries outstanding
        assert_eq!(reg.resolve(0), None);
        assert_eq!(reg.outstanding_len(), 1);
    }

    #[test]
    fn test_ids_are_unique_across_records() {
        let mut reg = TaskRegistry::new();
        let a = reg.record_arrival("CLI0", "PRIMES", "10", 0.0);
        let b = reg.record_arrival("CLI1", "PRIMES", "20", 0.0);
        let id_a = reg.enqueue(a);
        let id_b = reg.enqueue(b);
        assert_ne!(id_a, id_b);
        assert_eq!(reg.resolve(id_b), Some(b));
        assert_eq!(reg.resolve(id_a), Some(a));
    }
}
