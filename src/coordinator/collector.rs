//! Result collection and per-client output files
//!
//! Every result is a `TaskResult` whose payload starts with the client id.
//! Plain results append the payload line to `<client_id>_result.txt`. A
//! payload of the form `<client_id> MATRIXRESULT <N> <start> <end>` announces
//! a `MatrixResult` buffer that follows on the same connection; its rows are
//! formatted and appended instead.

use super::Coordinator;
use crate::error::EngineError;
use crate::protocol::Message;
use crate::Result;
use std::io::Write;
use std::path::PathBuf;

/// Parse a `<client_id> MATRIXRESULT <N> <start> <end>` payload
fn parse_matrix_result_header(payload: &str) -> Option<(usize, usize, usize)> {
    let tokens: Vec<&str> = payload.split_whitespace().collect();
    if tokens.len() != 5 || tokens[1] != "MATRIXRESULT" {
        return None;
    }
    let n = tokens[2].parse().ok()?;
    let start = tokens[3].parse().ok()?;
    let end = tokens[4].parse().ok()?;
    Some((n, start, end))
}

impl Coordinator {
    /// Process one message received from `rank`
    ///
    /// The worker is always returned to the pool, even for stray or
    /// malformed results; losing a worker slot over a bad payload would
    /// deadlock dispatch.
    pub(crate) async fn handle_worker_message(&mut self, rank: usize, msg: Message) -> Result<()> {
        let result = match msg {
            Message::TaskResult(result) => result,
            other => {
                let err = EngineError::Protocol(format!(
                    "unexpected {} message from worker {}",
                    other.tag(),
                    rank
                ));
                self.audit.error(&err.to_string());
                self.pool.mark_free(rank);
                return Ok(());
            }
        };

        let task_index = match self.registry.resolve(result.sub_task_id) {
            Some(idx) => idx,
            None => {
                let err = EngineError::Protocol(format!(
                    "worker {} returned a result for unknown sub-task {}",
                    rank, result.sub_task_id
                ));
                self.audit.error(&err.to_string());
                // Drop the stray payload; an announced buffer still occupies
                // the stream and must be consumed to keep it framed
                if parse_matrix_result_header(&result.payload).is_some() {
                    let _ = self.links[rank - 1].recv().await?;
                }
                self.pool.mark_free(rank);
                self.completed_results += 1;
                return Ok(());
            }
        };

        let client_id = result
            .payload
            .split_whitespace()
            .next()
            .unwrap_or("UNKNOWN")
            .to_string();

        if let Some((n, start_row, end_row)) = parse_matrix_result_header(&result.payload) {
            // The buffer follows on the same ordered connection
            let follow = self.links[rank - 1].recv().await?;
            match follow {
                Message::MatrixResult(buffer) if buffer.sub_task_id == result.sub_task_id => {
                    let expected = end_row.saturating_sub(start_row) * n;
                    if buffer.values.len() != expected {
                        self.audit.error(&format!(
                            "Worker {} sent {} matrix values for rows [{}, {}) of a {}x{} result",
                            rank,
                            buffer.values.len(),
                            start_row,
                            end_row,
                            n,
                            n
                        ));
                    } else if let Err(e) = self.append_matrix_rows(&client_id, n, &buffer.values) {
                        self.audit
                            .error(&format!("{}: {:#}", client_id, e));
                    }
                }
                other => {
                    self.audit.error(&format!(
                        "Expected MATRIX_RESULT from worker {}, got {}",
                        rank,
                        other.tag()
                    ));
                }
            }
        } else if let Err(e) = self.append_result_line(&client_id, &result.payload) {
            self.audit.error(&format!("{}: {:#}", client_id, e));
        }

        let completion = self.clock.now();
        self.registry.set_completion(task_index, completion);
        let event = format!(
            "COMPLETED: {} TIME: {:.6}",
            self.registry.record(task_index).client_id,
            completion
        );
        self.audit.event(&event);

        self.pool.mark_free(rank);
        self.completed_results += 1;
        Ok(())
    }

    fn result_path(&self, client_id: &str) -> PathBuf {
        self.out_dir.join(format!("{}_result.txt", client_id))
    }

    fn open_result_file(&self, client_id: &str) -> Result<std::fs::File> {
        let path = self.result_path(client_id);
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                EngineError::Resource(format!("failed to open {}: {}", path.display(), e)).into()
            })
    }

    /// Append one textual result line to the client's result file
    fn append_result_line(&self, client_id: &str, payload: &str) -> Result<()> {
        let mut file = self.open_result_file(client_id)?;
        writeln!(file, "{}", payload)?;
        Ok(())
    }

    /// Append formatted matrix rows to the client's result file
    fn append_matrix_rows(&self, client_id: &str, n: usize, values: &[f32]) -> Result<()> {
        let mut file = self.open_result_file(client_id)?;
        for row in values.chunks(n) {
            let line = row
                .iter()
                .map(|v| format!("{:.6}", v))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matrix_result_header() {
        assert_eq!(
            parse_matrix_result_header("CLI2 MATRIXRESULT 8 0 4"),
            Some((8, 0, 4))
        );
        assert_eq!(parse_matrix_result_header("CLI0 42"), None);
        assert_eq!(parse_matrix_result_header("CLI0 Total anagrams: 24"), None);
        // Wrong arity or non-numeric fields
        assert_eq!(parse_matrix_result_header("CLI2 MATRIXRESULT 8 0"), None);
        assert_eq!(parse_matrix_result_header("CLI2 MATRIXRESULT 8 x 4"), None);
    }
}
