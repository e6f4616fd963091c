//! Audit trail: event log and shutdown CSV report
//!
//! `server_log.txt` records arrivals, dispatches, completions and errors as
//! human-readable timestamped lines. At shutdown the full task registry is
//! serialized to `tasks.csv`, one row per dispatched logical command.

use crate::coordinator::registry::TaskRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Append-only event log
pub struct AuditLog {
    file: File,
}

impl AuditLog {
    /// Create (truncate) the log file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(Self { file })
    }

    /// Append one timestamped event line and flush
    pub fn event(&mut self, msg: &str) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        if let Err(e) = writeln!(self.file, "[{}] {}", stamp, msg).and_then(|_| self.file.flush())
        {
            eprintln!("Warning: Failed to write log line: {}", e);
        }
    }

    /// Append an ERROR-prefixed event line
    pub fn error(&mut self, msg: &str) {
        self.event(&format!("ERROR: {}", msg));
    }
}

/// Write the per-command timing report
///
/// Header: `client_id,command,arg,arrival_time,dispatch_time,completion_time,
/// total_time`, timestamps in seconds since coordinator start.
pub fn write_report<P: AsRef<Path>>(path: P, records: &[TaskRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path)
        .with_context(|| format!("Failed to open {} for writing CSV", path.display()))?;

    writeln!(
        file,
        "client_id,command,arg,arrival_time,dispatch_time,completion_time,total_time"
    )?;
    for rec in records {
        let total_time = rec.completion_time - rec.arrival_time;
        writeln!(
            file,
            "{},{},{},{:.6},{:.6},{:.6},{:.6}",
            rec.client_id,
            rec.verb,
            rec.argument,
            rec.arrival_time,
            rec.dispatch_time,
            rec.completion_time,
            total_time
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(client: &str, arrival: f64, dispatch: f64, completion: f64) -> TaskRecord {
        TaskRecord {
            client_id: client.to_string(),
            verb: "PRIMES".to_string(),
            argument: "100".to_string(),
            arrival_time: arrival,
            dispatch_time: dispatch,
            completion_time: completion,
        }
    }

    #[test]
    fn test_event_log_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server_log.txt");

        let mut log = AuditLog::create(&path).unwrap();
        log.event("ARRIVED: CLI0 COMMAND: PRIMES ARG: 100 TIME: 0.001000");
        log.error("Malformed command: \"junk\"");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ARRIVED: CLI0"));
        assert!(lines[1].contains("ERROR: Malformed command"));
        // Timestamp prefix [HH:MM:SS]
        assert!(lines[0].starts_with('['));
        assert_eq!(lines[0].find(']'), Some(9));
    }

    #[test]
    fn test_csv_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.csv");

        let records = vec![
            record("CLI0", 0.5, 0.6, 1.5),
            record("CLI1", 0.7, 0.8, 2.0),
        ];
        write_report(&path, &records).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "client_id,command,arg,arrival_time,dispatch_time,completion_time,total_time"
        );
        assert!(lines[1].starts_with("CLI0,PRIMES,100,0.500000,0.600000,1.500000,1.000000"));
    }
}
