//! Matrix job partitioning and dispatch
//!
//! Jobs with N above the configured threshold are split into contiguous
//! row ranges, one per worker. Below or at the threshold the whole job goes
//! to a single worker as one chunk covering `[0, N)`.

use super::Coordinator;
use crate::command::Command;
use crate::compute::Matrix;
use crate::protocol::{MatrixOp, MatrixTaskMessage, Message};
use crate::Result;

/// Split `[0, n)` into contiguous row ranges, one per worker
///
/// Splitting happens across `min(n, num_workers)` chunks so no chunk is
/// empty. Every chunk gets `n / k` rows; the remainder rows go to the last
/// chunk.
pub fn chunk_ranges(n: usize, num_workers: usize) -> Vec<(usize, usize)> {
    let k = num_workers.min(n);
    if k == 0 {
        return Vec::new();
    }

    let rows = n / k;
    let mut ranges = Vec::with_capacity(k);
    let mut start = 0;
    for chunk in 0..k {
        let end = if chunk == k - 1 { n } else { start + rows };
        ranges.push((start, end));
        start = end;
    }
    ranges
}

impl Coordinator {
    /// Load operands and route a matrix job to one or many workers
    ///
    /// Operand read failures are logged and the job abandoned; its registry
    /// record keeps the arrival time and zeroed dispatch/completion times.
    pub(crate) async fn dispatch_matrix(
        &mut self,
        cmd: &Command,
        op: MatrixOp,
        size: usize,
        file_a: &str,
        file_b: &str,
        task_index: usize,
    ) -> Result<()> {
        if size == 0 {
            self.audit
                .error(&format!("{}: matrix size must be positive", cmd.client_id));
            return Ok(());
        }

        let a = match Matrix::load(file_a, size) {
            Ok(m) => m,
            Err(e) => {
                self.audit
                    .error(&format!("{}: {:#}", cmd.client_id, e));
                return Ok(());
            }
        };
        let b = match Matrix::load(file_b, size) {
            Ok(m) => m,
            Err(e) => {
                self.audit
                    .error(&format!("{}: {:#}", cmd.client_id, e));
                return Ok(());
            }
        };

        if size > self.matrix_threshold {
            self.dispatch_matrix_partitioned(cmd, op, &a, &b, task_index)
                .await
        } else {
            self.dispatch_matrix_single(cmd, op, a, b, task_index).await
        }
    }

    /// Whole job to one worker, as a single chunk covering `[0, N)`
    async fn dispatch_matrix_single(
        &mut self,
        cmd: &Command,
        op: MatrixOp,
        a: Matrix,
        b: Matrix,
        task_index: usize,
    ) -> Result<()> {
        let size = a.size;
        let rank = self.acquire_worker().await?;
        self.pool.mark_busy(rank);

        let dispatch = self.clock.now();
        self.registry.set_dispatch(task_index, dispatch);
        let sub_task_id = self.registry.enqueue(task_index);

        self.links[rank - 1]
            .send(&Message::MatrixTask(MatrixTaskMessage {
                sub_task_id,
                client_id: cmd.client_id.clone(),
                op,
                size,
                start_row: 0,
                end_row: size,
                a: a.data,
                b: b.data,
            }))
            .await?;

        self.audit.event(&format!(
            "DISPATCHED: {} TO: {} TIME: {:.6}",
            cmd.client_id, rank, dispatch
        ));
        Ok(())
    }

    /// One row-range chunk per worker
    ///
    /// The dispatch time stamps the first chunk's send; completions overwrite
    /// each other so the record ends with the last chunk's arrival.
    async fn dispatch_matrix_partitioned(
        &mut self,
        cmd: &Command,
        op: MatrixOp,
        a: &Matrix,
        b: &Matrix,
        task_index: usize,
    ) -> Result<()> {
        let size = a.size;
        let ranges = chunk_ranges(size, self.pool.len());

        let mut first_chunk = true;
        for (start_row, end_row) in ranges {
            let rank = self.acquire_worker().await?;
            self.pool.mark_busy(rank);

            let dispatch = self.clock.now();
            if first_chunk {
                self.registry.set_dispatch(task_index, dispatch);
                first_chunk = false;
            }
            let sub_task_id = self.registry.enqueue(task_index);

            let a_chunk = a.row_slice(start_row, end_row).to_vec();
            // Addition is element-wise so B ships as the matching row slice;
            // every multiply output row reads all of B's columns
            let b_chunk = match op {
                MatrixOp::Add => b.row_slice(start_row, end_row).to_vec(),
                MatrixOp::Mult => b.data.clone(),
            };

            self.links[rank - 1]
                .send(&Message::MatrixTask(MatrixTaskMessage {
                    sub_task_id,
                    client_id: cmd.client_id.clone(),
                    op,
                    size,
                    start_row,
                    end_row,
                    a: a_chunk,
                    b: b_chunk,
                }))
                .await?;

            self.audit.event(&format!(
                "DISPATCHED: {} ROWS: [{}, {}) TO: {} TIME: {:.6}",
                cmd.client_id, start_row, end_row, rank, dispatch
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        assert_eq!(chunk_ranges(8, 4), vec![(0, 2), (2, 4), (4, 6), (6, 8)]);
    }

    #[test]
    fn test_remainder_goes_to_last_chunk() {
        assert_eq!(chunk_ranges(10, 3), vec![(0, 3), (3, 6), (6, 10)]);
        assert_eq!(chunk_ranges(7, 4), vec![(0, 1), (1, 2), (2, 3), (3, 7)]);
    }

    #[test]
    fn test_more_workers_than_rows() {
        // No empty chunks: one row each for min(n, workers) chunks
        assert_eq!(chunk_ranges(2, 5), vec![(0, 1), (1, 2)]);
        assert_eq!(chunk_ranges(1, 8), vec![(0, 1)]);
    }

    #[test]
    fn test_single_worker() {
        assert_eq!(chunk_ranges(5, 1), vec![(0, 5)]);
    }

    #[test]
    fn test_ranges_cover_all_rows() {
        for n in 1..40 {
            for workers in 1..8 {
                let ranges = chunk_ranges(n, workers);
                assert_eq!(ranges.len(), workers.min(n));
                assert_eq!(ranges[0].0, 0);
                assert_eq!(ranges.last().unwrap().1, n);
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].1, pair[1].0);
                }
                for (s, e) in &ranges {
                    assert!(s < e);
                }
            }
        }
    }

    #[test]
    fn test_zero_rows() {
        assert!(chunk_ranges(0, 4).is_empty());
    }
}
