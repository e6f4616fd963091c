//! Coordinator control loop
//!
//! The coordinator connects to every worker, reads the command file line by
//! line, registers each command in the task registry, and routes work to
//! free workers (partitioning large matrix jobs across the pool). Results
//! are drained opportunistically between input lines so the pool stays as
//! free as possible. After the last line it blocks until every outstanding
//! sub-task has reported, stops the workers, and writes the CSV report.
//!
//! A single async flow owns all mutable state; nothing here is shared.

pub mod collector;
pub mod partition;
pub mod pool;
pub mod registry;

use crate::audit::{self, AuditLog};
use crate::command::{parse_command_line, parse_matrix_argument, Command};
use crate::config::Config;
use crate::protocol::{Channel, MatrixOp, Message, WorkMessage};
use crate::Result;
use anyhow::Context;
use pool::WorkerPool;
use registry::{Clock, TaskRegistry};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Poll interval while waiting for the next result from any worker
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Connection set, pool state, registry, and audit trail
pub struct Coordinator {
    /// One ordered channel per worker, index = rank - 1
    links: Vec<Channel>,
    pool: WorkerPool,
    registry: TaskRegistry,
    clock: Clock,
    audit: AuditLog,
    out_dir: PathBuf,
    matrix_threshold: usize,
    completed_results: u64,
}

impl Coordinator {
    /// Connect to every worker and open the audit log
    ///
    /// Fails if no workers are configured or any connection cannot be
    /// established.
    pub async fn connect(config: &Config) -> Result<Self> {
        println!("Connecting to {} workers...", config.workers.len());
        let mut links = Vec::with_capacity(config.workers.len());
        for (i, addr) in config.workers.iter().enumerate() {
            let link = Channel::connect(addr).await?;
            println!("  Worker {} connected ({})", i + 1, addr);
            links.push(link);
        }

        let pool = WorkerPool::new(links.len());
        if pool.is_empty() {
            anyhow::bail!("No workers specified; need at least one worker to make progress");
        }

        std::fs::create_dir_all(&config.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                config.output_dir.display()
            )
        })?;
        let audit = AuditLog::create(config.output_dir.join("server_log.txt"))?;

        Ok(Self {
            links,
            pool,
            registry: TaskRegistry::new(),
            clock: Clock::start(),
            audit,
            out_dir: config.output_dir.clone(),
            matrix_threshold: config.matrix_threshold,
            completed_results: 0,
        })
    }

    /// Process the whole command file, then drain, stop workers, and report
    pub async fn run(mut self, command_file: &Path) -> Result<()> {
        let file = std::fs::File::open(command_file)
            .with_context(|| format!("Failed to open command file {}", command_file.display()))?;
        let reader = std::io::BufReader::new(file);

        for line in reader.lines() {
            let line = line.context("Failed to read command file")?;
            if line.trim().is_empty() {
                continue;
            }
            self.process_line(&line).await?;

            // Keep the pool maximally free without blocking the input loop
            self.drain_available().await?;
        }

        // Every dispatched sub-task still owes a result
        while self.registry.outstanding_len() > 0 {
            self.drain_one_blocking().await?;
        }

        for link in &mut self.links {
            link.send(&Message::Stop).await?;
        }
        self.audit.event("SHUTDOWN: all workers stopped");

        audit::write_report(self.out_dir.join("tasks.csv"), self.registry.records())?;

        println!(
            "Done: {} results collected, report written to {}",
            self.completed_results,
            self.out_dir.join("tasks.csv").display()
        );
        Ok(())
    }

    /// Handle one command-file line
    async fn process_line(&mut self, line: &str) -> Result<()> {
        let cmd = match parse_command_line(line) {
            Ok(cmd) => cmd,
            Err(e) => {
                self.audit.error(&e.to_string());
                return Ok(());
            }
        };

        if cmd.is_wait() {
            return self.handle_wait(&cmd).await;
        }

        let arrival = self.clock.now();
        self.audit.event(&format!(
            "ARRIVED: {} COMMAND: {} ARG: {} TIME: {:.6}",
            cmd.client_id, cmd.verb, cmd.argument, arrival
        ));

        // Matrix verbs take the partitioned path; an unrecognized MATRIX*
        // verb rides the plain path and comes back as an unknown-command
        // error from the worker
        let matrix_op = if cmd.is_matrix() {
            MatrixOp::from_verb(&cmd.verb)
        } else {
            None
        };

        if let Some(op) = matrix_op {
            // Argument errors leave no registry record behind
            let (size, file_a, file_b) = match parse_matrix_argument(&cmd.argument) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.audit.error(&e.to_string());
                    return Ok(());
                }
            };
            let task_index =
                self.registry
                    .record_arrival(&cmd.client_id, &cmd.verb, &cmd.argument, arrival);
            self.dispatch_matrix(&cmd, op, size, &file_a, &file_b, task_index)
                .await
        } else {
            let task_index =
                self.registry
                    .record_arrival(&cmd.client_id, &cmd.verb, &cmd.argument, arrival);
            self.dispatch_work(&cmd, line, task_index).await
        }
    }

    /// `WAIT <seconds>`: pause dispatch; no worker involved, no record
    async fn handle_wait(&mut self, cmd: &Command) -> Result<()> {
        match cmd.argument.parse::<f64>() {
            Ok(secs) if secs >= 0.0 && secs.is_finite() => {
                tokio::time::sleep(Duration::from_secs_f64(secs)).await;
            }
            _ => {
                self.audit
                    .error(&format!("bad WAIT duration: {:?}", cmd.argument));
            }
        }
        Ok(())
    }

    /// Ship a plain command line to one free worker
    async fn dispatch_work(&mut self, cmd: &Command, line: &str, task_index: usize) -> Result<()> {
        let rank = self.acquire_worker().await?;
        self.pool.mark_busy(rank);

        let dispatch = self.clock.now();
        self.registry.set_dispatch(task_index, dispatch);
        let sub_task_id = self.registry.enqueue(task_index);

        self.links[rank - 1]
            .send(&Message::Work(WorkMessage {
                sub_task_id,
                line: line.trim().to_string(),
            }))
            .await?;

        self.audit.event(&format!(
            "DISPATCHED: {} TO: {} TIME: {:.6}",
            cmd.client_id, rank, dispatch
        ));
        Ok(())
    }

    /// Wait for a free worker, draining results while the pool is exhausted
    pub(crate) async fn acquire_worker(&mut self) -> Result<usize> {
        loop {
            if let Some(rank) = self.pool.find_free() {
                return Ok(rank);
            }
            self.drain_one_blocking().await?;
        }
    }

    /// Collect every result currently available, without blocking
    async fn drain_available(&mut self) -> Result<()> {
        loop {
            let mut progressed = false;
            for i in 0..self.links.len() {
                while let Some(msg) = self.links[i].try_recv()? {
                    self.handle_worker_message(i + 1, msg).await?;
                    progressed = true;
                }
            }
            if !progressed {
                return Ok(());
            }
        }
    }

    /// Block until one result from any worker has been collected
    async fn drain_one_blocking(&mut self) -> Result<()> {
        loop {
            for i in 0..self.links.len() {
                if let Some(msg) = self.links[i].try_recv()? {
                    self.handle_worker_message(i + 1, msg).await?;
                    return Ok(());
                }
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}
