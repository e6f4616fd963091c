//! Command-file line parsing
//!
//! One instruction per line:
//!
//! ```text
//! CLI<id> <VERB> <ARGUMENT>     e.g. CLI0 PRIMES 10000
//! WAIT <seconds>                pauses dispatch at the coordinator
//! ```
//!
//! The same parser runs on both sides: the coordinator parses lines as they
//! arrive from the command file, and workers re-parse the raw line embedded
//! in a `Work` message before selecting a kernel.

use crate::error::EngineError;

/// Control verb that pauses the coordinator instead of dispatching
pub const VERB_WAIT: &str = "WAIT";

/// One parsed instruction
///
/// `client_id` is empty for the control verb `WAIT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub client_id: String,
    pub verb: String,
    pub argument: String,
}

impl Command {
    /// Whether this command belongs to the matrix family
    /// (`MATRIXADD` / `MATRIXMULT`)
    pub fn is_matrix(&self) -> bool {
        self.verb.starts_with("MATRIX")
    }

    /// Whether this is the `WAIT` control verb
    pub fn is_wait(&self) -> bool {
        self.verb == VERB_WAIT
    }
}

/// Parse one command-file line
///
/// Accepts `WAIT <seconds>` and `CLI<id> <VERB> <ARGUMENT>` lines; anything
/// else is a [`EngineError::Parse`].
pub fn parse_command_line(line: &str) -> Result<Command, EngineError> {
    let trimmed = line.trim();

    if let Some(rest) = trimmed.strip_prefix(VERB_WAIT) {
        let arg = rest.trim();
        if arg.is_empty() || arg.split_whitespace().count() != 1 {
            return Err(EngineError::Parse(format!("bad WAIT line: {trimmed:?}")));
        }
        return Ok(Command {
            client_id: String::new(),
            verb: VERB_WAIT.to_string(),
            argument: arg.to_string(),
        });
    }

    if trimmed.starts_with("CLI") {
        let mut tokens = trimmed.splitn(3, char::is_whitespace);
        let client_id = tokens.next().unwrap_or_default();
        let verb = tokens.next().unwrap_or_default();
        let argument = tokens.next().unwrap_or_default().trim();
        if verb.is_empty() || argument.is_empty() {
            return Err(EngineError::Parse(format!(
                "expected `CLI<id> <VERB> <ARGUMENT>`, got {trimmed:?}"
            )));
        }
        return Ok(Command {
            client_id: client_id.to_string(),
            verb: verb.to_string(),
            argument: argument.to_string(),
        });
    }

    Err(EngineError::Parse(format!("unrecognized line: {trimmed:?}")))
}

/// Parse a matrix-family argument: `<N> <fileA> <fileB>`
pub fn parse_matrix_argument(arg: &str) -> Result<(usize, String, String), EngineError> {
    let mut tokens = arg.split_whitespace();
    let size = tokens
        .next()
        .and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(|| EngineError::Parse(format!("bad matrix size in {arg:?}")))?;
    let file_a = tokens.next();
    let file_b = tokens.next();
    match (file_a, file_b, tokens.next()) {
        (Some(a), Some(b), None) => Ok((size, a.to_string(), b.to_string())),
        _ => Err(EngineError::Parse(format!(
            "expected `<N> <fileA> <fileB>`, got {arg:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_command() {
        let cmd = parse_command_line("CLI0 PRIMES 10000").unwrap();
        assert_eq!(cmd.client_id, "CLI0");
        assert_eq!(cmd.verb, "PRIMES");
        assert_eq!(cmd.argument, "10000");
        assert!(!cmd.is_wait());
        assert!(!cmd.is_matrix());
    }

    #[test]
    fn test_parse_matrix_command() {
        let cmd = parse_command_line("CLI1 MATRIXMULT 2000 a.txt b.txt").unwrap();
        assert_eq!(cmd.verb, "MATRIXMULT");
        assert_eq!(cmd.argument, "2000 a.txt b.txt");
        assert!(cmd.is_matrix());
    }

    #[test]
    fn test_parse_wait() {
        let cmd = parse_command_line("WAIT 5").unwrap();
        assert!(cmd.is_wait());
        assert_eq!(cmd.client_id, "");
        assert_eq!(cmd.argument, "5");
    }

    #[test]
    fn test_parse_malformed_lines() {
        assert!(parse_command_line("").is_err());
        assert!(parse_command_line("WAIT").is_err());
        assert!(parse_command_line("CLI0 PRIMES").is_err());
        assert!(parse_command_line("nonsense line here").is_err());
    }

    #[test]
    fn test_parse_matrix_argument() {
        let (n, a, b) = parse_matrix_argument("128 a.txt b.txt").unwrap();
        assert_eq!(n, 128);
        assert_eq!(a, "a.txt");
        assert_eq!(b, "b.txt");

        assert!(parse_matrix_argument("x a.txt b.txt").is_err());
        assert!(parse_matrix_argument("128 a.txt").is_err());
        assert!(parse_matrix_argument("128 a.txt b.txt extra").is_err());
    }
}
