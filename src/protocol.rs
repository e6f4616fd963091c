//! Coordinator/worker wire protocol
//!
//! This module defines the messages exchanged between the coordinator and
//! each worker, serialized with MessagePack (rmp-serde) for full serde
//! feature support.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                          Worker
//!     |                                  |
//!     |------- WORK(line) ------------->|
//!     |<------ TASK_RESULT(text) -------|
//!     |                                  |
//!     |------- MATRIX_TASK(chunk) ----->|
//!     |<------ TASK_RESULT(header) -----|
//!     |<------ MATRIX_RESULT(buffer) ---|
//!     |                                  |
//!     |------- STOP ------------------->|
//! ```
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```
//!
//! Messages between one sender/receiver pair arrive in send order (TCP);
//! there is no ordering guarantee across different workers. Every sub-task
//! therefore carries a unique `sub_task_id` that the worker echoes back in
//! its result, and the coordinator correlates results by id.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Protocol version
///
/// Increment this when making breaking changes to the protocol.
/// Coordinator and workers must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Reject frames larger than this (a 2048x2048 f32 matrix pair is ~32MB)
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Matrix operation carried by a [`MatrixTaskMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixOp {
    Add,
    Mult,
}

impl MatrixOp {
    /// Map a matrix-family verb to its operation
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "MATRIXADD" => Some(MatrixOp::Add),
            "MATRIXMULT" => Some(MatrixOp::Mult),
            _ => None,
        }
    }
}

/// Protocol message
///
/// All messages exchanged between the coordinator and worker processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Plain command (Coordinator → Worker)
    ///
    /// Carries the raw command-file line; the worker re-parses it and runs
    /// the matching numeric kernel.
    Work(WorkMessage),

    /// Matrix sub-task (Coordinator → Worker)
    ///
    /// A row-range slice of a matrix job, or the whole matrix when the job
    /// runs on a single worker (`start_row = 0`, `end_row = size`).
    MatrixTask(MatrixTaskMessage),

    /// Textual result (Worker → Coordinator)
    ///
    /// Either `<client_id> <value...>` or the matrix-result announcement
    /// `<client_id> MATRIXRESULT <N> <start_row> <end_row>`, in which case a
    /// `MatrixResult` follows on the same connection.
    TaskResult(TaskResultMessage),

    /// Matrix result buffer (Worker → Coordinator)
    ///
    /// Always sent immediately after the `TaskResult` announcing it.
    MatrixResult(MatrixResultMessage),

    /// Stop message (Coordinator → Worker)
    ///
    /// Terminates the worker loop. Carries no payload.
    Stop,
}

impl Message {
    /// Tag name for diagnostics
    pub fn tag(&self) -> &'static str {
        match self {
            Message::Work(_) => "WORK",
            Message::MatrixTask(_) => "MATRIX_TASK",
            Message::TaskResult(_) => "TASK_RESULT",
            Message::MatrixResult(_) => "MATRIX_RESULT",
            Message::Stop => "STOP",
        }
    }
}

/// Plain command message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkMessage {
    /// Unique id for result correlation
    pub sub_task_id: u64,

    /// Raw command-file line (`CLI<id> <VERB> <ARGUMENT>`)
    pub line: String,
}

/// Matrix sub-task message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixTaskMessage {
    /// Unique id for result correlation
    pub sub_task_id: u64,

    /// Client the result belongs to
    pub client_id: String,

    /// Add or multiply
    pub op: MatrixOp,

    /// Full matrix dimension N (operands are N x N)
    pub size: usize,

    /// Assigned row range `[start_row, end_row)`
    pub start_row: usize,
    pub end_row: usize,

    /// Row slice `[start_row, end_row)` of operand A, row-major,
    /// `(end_row - start_row) * size` values
    pub a: Vec<f32>,

    /// Operand B: the matching row slice for `Add`, the full `size * size`
    /// matrix for `Mult` (every output row needs all of B)
    pub b: Vec<f32>,
}

/// Textual result message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultMessage {
    /// Echo of the dispatched sub-task id
    pub sub_task_id: u64,

    /// Result text, `<client_id>`-prefixed
    pub payload: String,
}

/// Matrix result buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixResultMessage {
    /// Echo of the dispatched sub-task id
    pub sub_task_id: u64,

    /// `(end_row - start_row) * size` result values, row-major
    pub values: Vec<f32>,
}

/// Serialize a message to bytes
///
/// Prepends a 4-byte length field for framing.
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg).context("Failed to serialize message")?;

    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize a message from bytes
///
/// Expects a 4-byte length prefix followed by a MessagePack message.
/// Returns `(message, bytes_consumed)` where `bytes_consumed` includes the
/// length prefix, or `None` when the buffer does not yet hold a full frame.
pub fn deserialize_message(buf: &[u8]) -> Result<Option<(Message, usize)>> {
    if buf.len() < 4 {
        return Ok(None);
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if msg_len > MAX_MESSAGE_SIZE {
        anyhow::bail!("Message too large: {} bytes (max {})", msg_len, MAX_MESSAGE_SIZE);
    }

    if buf.len() < 4 + msg_len {
        return Ok(None);
    }

    let msg = rmp_serde::from_slice(&buf[4..4 + msg_len])
        .context("Failed to deserialize message")?;

    Ok(Some((msg, 4 + msg_len)))
}

/// One framed, ordered connection to a peer
///
/// Owns the socket plus a reassembly buffer so that the non-blocking probe
/// never tears a partially received frame.
pub struct Channel {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl Channel {
    /// Connect to a listening peer
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to {}", addr))?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an accepted connection
    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream,
            buf: Vec::new(),
        }
    }

    /// Blocking send
    pub async fn send(&mut self, msg: &Message) -> Result<()> {
        let framed = serialize_message(msg)?;
        self.stream
            .write_all(&framed)
            .await
            .context("Failed to write message")?;
        self.stream.flush().await.context("Failed to flush stream")?;
        Ok(())
    }

    /// Blocking receive: waits until a complete frame is available
    pub async fn recv(&mut self) -> Result<Message> {
        loop {
            if let Some(msg) = self.take_frame()? {
                return Ok(msg);
            }
            self.stream
                .readable()
                .await
                .context("Connection lost while waiting for message")?;
            if self.fill()? == FillOutcome::WouldBlock {
                // Spurious readiness; poll again
                continue;
            }
        }
    }

    /// Non-blocking probe: returns a message only if one is fully buffered
    /// or can be read without waiting
    pub fn try_recv(&mut self) -> Result<Option<Message>> {
        loop {
            if let Some(msg) = self.take_frame()? {
                return Ok(Some(msg));
            }
            if self.fill()? == FillOutcome::WouldBlock {
                return Ok(None);
            }
        }
    }

    /// Pop one complete frame from the reassembly buffer, if present
    fn take_frame(&mut self) -> Result<Option<Message>> {
        match deserialize_message(&self.buf)? {
            Some((msg, consumed)) => {
                self.buf.drain(..consumed);
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }

    /// Pull whatever the socket has ready into the reassembly buffer
    fn fill(&mut self) -> Result<FillOutcome> {
        let mut tmp = [0u8; 64 * 1024];
        match self.stream.try_read(&mut tmp) {
            Ok(0) => anyhow::bail!("Connection closed by peer"),
            Ok(n) => {
                self.buf.extend_from_slice(&tmp[..n]);
                Ok(FillOutcome::Read)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(FillOutcome::WouldBlock),
            Err(e) => Err(e).context("Failed to read from peer"),
        }
    }
}

#[derive(PartialEq, Eq)]
enum FillOutcome {
    Read,
    WouldBlock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize_work() {
        let msg = Message::Work(WorkMessage {
            sub_task_id: 7,
            line: "CLI0 PRIMES 10000".to_string(),
        });

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed) = deserialize_message(&bytes).unwrap().unwrap();

        assert_eq!(consumed, bytes.len());

        match deserialized {
            Message::Work(work) => {
                assert_eq!(work.sub_task_id, 7);
                assert_eq!(work.line, "CLI0 PRIMES 10000");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_serialize_deserialize_matrix_task() {
        let msg = Message::MatrixTask(MatrixTaskMessage {
            sub_task_id: 3,
            client_id: "CLI1".to_string(),
            op: MatrixOp::Add,
            size: 4,
            start_row: 1,
            end_row: 3,
            a: vec![1.0; 8],
            b: vec![2.0; 8],
        });

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed) = deserialize_message(&bytes).unwrap().unwrap();

        assert_eq!(consumed, bytes.len());

        match deserialized {
            Message::MatrixTask(task) => {
                assert_eq!(task.client_id, "CLI1");
                assert_eq!(task.op, MatrixOp::Add);
                assert_eq!((task.start_row, task.end_row), (1, 3));
                assert_eq!(task.a.len(), 8);
                assert_eq!(task.b.len(), 8);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_serialize_deserialize_stop() {
        let msg = Message::Stop;

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed) = deserialize_message(&bytes).unwrap().unwrap();

        assert_eq!(consumed, bytes.len());

        match deserialized {
            Message::Stop => {}
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_message_framing() {
        let msg = Message::Stop;
        let bytes = serialize_message(&msg).unwrap();

        assert!(bytes.len() >= 4);
        let msg_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(bytes.len(), 4 + msg_len);
    }

    #[test]
    fn test_partial_frame_is_not_consumed() {
        let msg = Message::Work(WorkMessage {
            sub_task_id: 1,
            line: "CLI0 ANAGRAMS ab".to_string(),
        });
        let bytes = serialize_message(&msg).unwrap();

        // Every strict prefix is an incomplete frame
        for cut in 0..bytes.len() {
            assert!(deserialize_message(&bytes[..cut]).unwrap().is_none());
        }
    }

    #[test]
    fn test_matrix_op_from_verb() {
        assert_eq!(MatrixOp::from_verb("MATRIXADD"), Some(MatrixOp::Add));
        assert_eq!(MatrixOp::from_verb("MATRIXMULT"), Some(MatrixOp::Mult));
        assert_eq!(MatrixOp::from_verb("PRIMES"), None);
    }
}
