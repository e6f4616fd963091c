//! Worker service
//!
//! A worker listens on a TCP port, accepts a coordinator connection, and
//! serves sub-tasks until told to stop: plain commands run a numeric kernel
//! and return one text line; matrix sub-tasks run the row-range kernel and
//! return a header line followed by the result buffer. Errors in a sub-task
//! never kill the worker; they come back as `ERROR:`-prefixed payloads so
//! the coordinator can log them and move on.

use crate::command::{parse_command_line, Command, VERB_WAIT};
use crate::error::EngineError;
use crate::compute::matrix::{add_rows, mult_rows};
use crate::compute::{anagrams, primes};
use crate::protocol::{
    Channel, MatrixOp, MatrixResultMessage, MatrixTaskMessage, Message, TaskResultMessage,
    WorkMessage,
};
use crate::Result;
use anyhow::Context;
use tokio::net::TcpListener;

/// Worker half of the engine
pub struct WorkerService {
    listen_port: u16,
}

impl WorkerService {
    pub fn new(listen_port: u16) -> Self {
        Self { listen_port }
    }

    /// Accept coordinator connections and serve each until it stops us
    ///
    /// Connections are served one at a time; a worker belongs to a single
    /// coordinator for the lifetime of a run.
    pub async fn run(&self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.listen_port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        println!("Worker listening on port {}", self.listen_port);

        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .context("Failed to accept connection")?;
            println!("Coordinator connected from {}", peer);

            let mut link = Channel::from_stream(stream);
            let identity = format!("worker:{}", self.listen_port);
            match serve_coordinator(&mut link, &identity).await {
                Ok(()) => {
                    println!("Coordinator disconnected cleanly");
                    return Ok(());
                }
                Err(e) => {
                    // A dropped coordinator should not kill the worker
                    eprintln!("Connection error: {:#}", e);
                }
            }
        }
    }
}

/// Serve one coordinator connection until `Stop` arrives
///
/// `identity` names this worker in error payloads.
pub async fn serve_coordinator(link: &mut Channel, identity: &str) -> Result<()> {
    loop {
        match link.recv().await? {
            Message::Stop => return Ok(()),
            Message::Work(work) => {
                let payload = handle_work(&work);
                link.send(&Message::TaskResult(TaskResultMessage {
                    sub_task_id: work.sub_task_id,
                    payload,
                }))
                .await?;
            }
            Message::MatrixTask(task) => handle_matrix_task(link, task).await?,
            other => {
                link.send(&Message::TaskResult(TaskResultMessage {
                    // Reserved id: never matches an outstanding entry
                    sub_task_id: 0,
                    payload: format!("ERROR: Unexpected {} message at {}", other.tag(), identity),
                }))
                .await?;
            }
        }
    }
}

/// Run the kernel for one plain command line
fn handle_work(work: &WorkMessage) -> String {
    let cmd = match parse_command_line(&work.line) {
        Ok(cmd) => cmd,
        Err(_) => return "ERROR: Malformed command".to_string(),
    };

    if cmd.verb == VERB_WAIT {
        return "ERROR: Worker received WAIT command".to_string();
    }

    match cmd.verb.as_str() {
        "PRIMES" => match cmd.argument.parse::<u64>() {
            Ok(n) => format!("{} {}", cmd.client_id, primes::count_primes_up_to(n)),
            Err(_) => bad_argument(&cmd),
        },
        "PRIMEDIVISORS" => match cmd.argument.parse::<u64>() {
            Ok(n) => format!("{} {}", cmd.client_id, primes::count_prime_divisors(n)),
            Err(_) => bad_argument(&cmd),
        },
        "ANAGRAMS" => format!(
            "{} Total anagrams: {}",
            cmd.client_id,
            anagrams::anagram_count(&cmd.argument)
        ),
        _ => format!("{} ERROR: Unknown command", cmd.client_id),
    }
}

fn bad_argument(cmd: &Command) -> String {
    format!(
        "{} ERROR: Bad {} argument {:?}",
        cmd.client_id, cmd.verb, cmd.argument
    )
}

/// Validate, compute, and answer one matrix sub-task
///
/// The answer is a `TaskResult` header naming the row range, immediately
/// followed by the `MatrixResult` buffer. Invalid tasks get only an
/// `ERROR:` payload.
async fn handle_matrix_task(link: &mut Channel, task: MatrixTaskMessage) -> Result<()> {
    if let Err(reason) = validate_matrix_task(&task) {
        link.send(&Message::TaskResult(TaskResultMessage {
            sub_task_id: task.sub_task_id,
            payload: format!("{} ERROR: {}", task.client_id, reason),
        }))
        .await?;
        return Ok(());
    }

    let values = match task.op {
        MatrixOp::Add => add_rows(&task.a, &task.b, task.size),
        MatrixOp::Mult => mult_rows(&task.a, &task.b, task.size),
    };

    link.send(&Message::TaskResult(TaskResultMessage {
        sub_task_id: task.sub_task_id,
        payload: format!(
            "{} MATRIXRESULT {} {} {}",
            task.client_id, task.size, task.start_row, task.end_row
        ),
    }))
    .await?;
    link.send(&Message::MatrixResult(MatrixResultMessage {
        sub_task_id: task.sub_task_id,
        values,
    }))
    .await?;
    Ok(())
}

fn validate_matrix_task(task: &MatrixTaskMessage) -> Result<(), EngineError> {
    if task.size == 0 {
        return Err(EngineError::Validation(
            "matrix size must be positive".to_string(),
        ));
    }
    if task.start_row >= task.end_row || task.end_row > task.size {
        return Err(EngineError::Validation(format!(
            "bad row range [{}, {}) for size {}",
            task.start_row, task.end_row, task.size
        )));
    }
    let rows = task.end_row - task.start_row;
    if task.a.len() != rows * task.size {
        return Err(EngineError::Validation(format!(
            "operand A holds {} values, expected {}",
            task.a.len(),
            rows * task.size
        )));
    }
    let expected_b = match task.op {
        MatrixOp::Add => rows * task.size,
        MatrixOp::Mult => task.size * task.size,
    };
    if task.b.len() != expected_b {
        return Err(EngineError::Validation(format!(
            "operand B holds {} values, expected {}",
            task.b.len(),
            expected_b
        )));
    }
    Ok(())
}
