//! Taskmill entry point: mode dispatch and local worker spawning

use anyhow::{Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use std::process::Child;
use std::time::Duration;
use taskmill::compute::Matrix;
use taskmill::config::{Cli, Config, ExecutionMode};
use taskmill::coordinator::Coordinator;
use taskmill::worker::WorkerService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(msg) = cli.validate() {
        eprintln!("Error: {}", msg);
        std::process::exit(1);
    }

    match cli.mode {
        ExecutionMode::Standalone => run_standalone(&cli).await,
        ExecutionMode::Coordinator => run_coordinator(&cli).await,
        ExecutionMode::Worker => WorkerService::new(cli.listen_port).run().await,
        ExecutionMode::Generate => run_generate(&cli),
    }
}

/// Connect to already-running workers and process the command file
async fn run_coordinator(cli: &Cli) -> Result<()> {
    let config = Config::from_cli(cli)?;
    let command_file = command_file_arg(cli)?;
    Coordinator::connect(&config).await?.run(command_file).await
}

fn command_file_arg(cli: &Cli) -> Result<&std::path::Path> {
    cli.command_file
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No command file specified"))
}

/// Spawn local worker processes, run the coordinator against them, clean up
async fn run_standalone(cli: &Cli) -> Result<()> {
    let command_file = command_file_arg(cli)?;
    let count = cli.workers.unwrap_or_else(num_cpus::get).max(1);
    let exe = std::env::current_exe().context("Failed to locate own executable")?;

    println!("Starting {} local workers...", count);
    let mut children: Vec<Child> = Vec::with_capacity(count);
    let mut addrs = Vec::with_capacity(count);
    for _ in 0..count {
        let port = find_available_port()?;
        let child = std::process::Command::new(&exe)
            .arg("--mode")
            .arg("worker")
            .arg("--listen-port")
            .arg(port.to_string())
            .stdout(std::process::Stdio::null())
            .spawn()
            .context("Failed to spawn local worker")?;
        children.push(child);
        addrs.push(format!("127.0.0.1:{}", port));
    }

    // Give the workers a moment to bind their listeners
    tokio::time::sleep(Duration::from_millis(300)).await;

    let config = Config {
        workers: addrs,
        output_dir: cli.output_dir.clone(),
        matrix_threshold: cli.matrix_threshold,
    };

    let result = match Coordinator::connect(&config).await {
        Ok(coordinator) => coordinator.run(command_file).await,
        Err(e) => Err(e),
    };

    // Workers exit on their own after the stop message; reap stragglers
    for mut child in children {
        let _ = child.kill();
        let _ = child.wait();
    }

    result
}

/// Ask the OS for a free TCP port
///
/// The listener is dropped before the worker binds, so another process could
/// in principle grab the port in between; good enough for localhost testing.
fn find_available_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")
        .context("Failed to probe for a free port")?;
    Ok(listener.local_addr()?.port())
}

/// Write a random matrix file for testing
fn run_generate(cli: &Cli) -> Result<()> {
    let mut rng = match cli.seed {
        Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
        None => rand::rngs::StdRng::from_entropy(),
    };

    let n = cli.size;
    let data: Vec<f32> = (0..n * n).map(|_| rng.gen_range(0.0f32..10.0)).collect();
    let matrix = Matrix::from_vec(data, n)?;
    matrix.store(&cli.out)?;

    println!("Wrote {}x{} matrix to {}", n, n, cli.out.display());
    Ok(())
}
