//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Standalone mode (default) - spawn local workers and run the coordinator
    Standalone,
    /// Coordinator mode - dispatch to already-running workers
    Coordinator,
    /// Worker mode - listen for a coordinator and execute tasks
    Worker,
    /// Generate mode - write a random matrix file for testing
    Generate,
}

/// Taskmill - coordinator/worker job-dispatch engine
#[derive(Parser, Debug)]
#[command(name = "taskmill")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: standalone, coordinator, worker, or generate
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// Command file to process (standalone and coordinator modes)
    #[arg(value_name = "COMMAND_FILE")]
    pub command_file: Option<PathBuf>,

    /// Port to listen on (worker mode only)
    #[arg(long, default_value = "9000", env = "TASKMILL_PORT")]
    pub listen_port: u16,

    /// Comma-separated list of worker addresses for coordinator mode
    /// (e.g., "10.0.1.10:9000,10.0.1.11:9000")
    #[arg(long)]
    pub host_list: Option<String>,

    /// File containing worker addresses (one per line, for coordinator mode)
    #[arg(long)]
    pub workers_file: Option<PathBuf>,

    /// Number of local workers to spawn (standalone mode; defaults to the
    /// number of CPUs)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Directory for result files, the event log, and the CSV report
    #[arg(short = 'o', long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Matrix dimension above which jobs are partitioned across the pool
    #[arg(long, default_value = "64")]
    pub matrix_threshold: usize,

    // === Generate Options ===
    /// Matrix dimension to generate
    #[arg(long, default_value = "8")]
    pub size: usize,

    /// Output path for the generated matrix
    #[arg(long, default_value = "matrix.txt")]
    pub out: PathBuf,

    /// Seed for reproducible generation
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    /// Cross-field validation clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        match self.mode {
            ExecutionMode::Standalone => {
                if self.command_file.is_none() {
                    return Err("standalone mode requires a command file".to_string());
                }
                if self.workers == Some(0) {
                    return Err("--workers must be at least 1".to_string());
                }
            }
            ExecutionMode::Coordinator => {
                if self.command_file.is_none() {
                    return Err("coordinator mode requires a command file".to_string());
                }
                if self.host_list.is_none() && self.workers_file.is_none() {
                    return Err(
                        "coordinator mode requires --host-list or --workers-file".to_string()
                    );
                }
            }
            ExecutionMode::Worker => {}
            ExecutionMode::Generate => {
                if self.size == 0 {
                    return Err("--size must be at least 1".to_string());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["taskmill", "commands.txt"]);
        assert_eq!(cli.mode, ExecutionMode::Standalone);
        assert_eq!(cli.command_file, Some(PathBuf::from("commands.txt")));
        assert_eq!(cli.listen_port, 9000);
        assert_eq!(cli.matrix_threshold, 64);
        assert_eq!(cli.output_dir, PathBuf::from("output"));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_standalone_requires_command_file() {
        let cli = Cli::parse_from(["taskmill"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_coordinator_requires_workers() {
        let cli = Cli::parse_from(["taskmill", "--mode", "coordinator", "commands.txt"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from([
            "taskmill",
            "--mode",
            "coordinator",
            "--host-list",
            "127.0.0.1:9000",
            "commands.txt",
        ]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_worker_mode_needs_no_command_file() {
        let cli = Cli::parse_from(["taskmill", "--mode", "worker", "--listen-port", "9100"]);
        assert_eq!(cli.listen_port, 9100);
        assert!(cli.validate().is_ok());
    }
}
