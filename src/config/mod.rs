//! Configuration layer
//!
//! `Cli` is the raw command line; `Config` is the resolved coordinator
//! configuration after worker addresses have been collected from
//! `--host-list`, `--workers-file`, or local spawning.

pub mod cli;

pub use cli::{Cli, ExecutionMode};

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Resolved coordinator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker addresses in rank order (rank = index + 1)
    pub workers: Vec<String>,
    pub output_dir: PathBuf,
    pub matrix_threshold: usize,
}

impl Config {
    /// Resolve worker addresses from the CLI (coordinator mode)
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut workers = Vec::new();

        if let Some(list) = &cli.host_list {
            workers.extend(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            );
        }

        if let Some(path) = &cli.workers_file {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read workers file {}", path.display()))?;
            workers.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|s| !s.is_empty() && !s.starts_with('#'))
                    .map(String::from),
            );
        }

        Ok(Self {
            workers,
            output_dir: cli.output_dir.clone(),
            matrix_threshold: cli.matrix_threshold,
        })
    }
}
