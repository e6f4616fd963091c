//! Taskmill - coordinator/worker job-dispatch engine
//!
//! Taskmill reads a stream of client commands, routes each one to an
//! available worker across a fixed-size pool of worker processes, and
//! collects results asynchronously while recording per-command timing.
//!
//! # Architecture
//!
//! - **Coordinator**: single control flow reading the command file,
//!   dispatching over TCP, draining results opportunistically
//! - **Workers**: one process per pool member, executing one task at a time
//! - **Matrix partitioning**: large matrix jobs are split into row-range
//!   sub-tasks fanned out across the pool and reassembled on collection
//! - **Audit trail**: timestamped event log plus a per-command CSV report

pub mod audit;
pub mod command;
pub mod compute;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod protocol;
pub mod worker;

// Re-export commonly used types
pub use command::Command;
pub use config::Config;
pub use error::EngineError;

/// Result type used throughout Taskmill
pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
