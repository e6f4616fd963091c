//! Recoverable error taxonomy
//!
//! Every variant here is recovered locally: logged to the audit trail and,
//! for worker-side failures, surfaced as an `ERROR:` line in the client's
//! result file. Only startup failures (command file, log file, worker
//! connections) terminate the process, and those travel as `anyhow::Error`.

use thiserror::Error;

/// Errors raised while dispatching and collecting tasks
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input line; skipped with no side effects
    #[error("malformed command: {0}")]
    Parse(String),

    /// File-open or write failure while persisting a result
    #[error("resource failure: {0}")]
    Resource(String),

    /// Unexpected message or unmatched result; pool state is still updated
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Worker-side rejection of invalid task parameters
    #[error("invalid task: {0}")]
    Validation(String),
}
