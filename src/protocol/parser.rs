//! Line Protocol Parser
//!
//! This module turns raw bytes from a client into validated [`Command`]s.
//! Parsing happens in two steps:
//!
//! 1. [`next_frame`] finds one `\n`-terminated frame in a buffer. It returns
//!    `None` while the frame is incomplete, so the caller can read more data.
//! 2. [`parse_frame`] decodes the frame as UTF-8 and runs it through the
//!    command grammar:
//!
//! ```text
//! put <key> <value:f64> <timestamp:i64>
//! get <key>
//! ```
//!
//! Tokens are separated by any run of whitespace. Verbs are case sensitive.
//! Every failure is a [`CommandError`]; on the wire they all collapse into the
//! same `wrong command` reply, and the variants exist so the server can log
//! what actually went wrong.

use crate::protocol::types::{Command, SEP};
use thiserror::Error;

/// Errors produced while interpreting a frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// The frame contained no tokens
    #[error("empty command")]
    EmptyCommand,

    /// The frame is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// The verb is neither `put` nor `get`
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The verb got the wrong number of parameters
    #[error("wrong number of arguments for '{command}': expected {expected}, got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    /// The value of a `put` is not a floating-point number
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The timestamp of a `put` is not an integer
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Result type for command parsing.
pub type CommandResult<T> = Result<T, CommandError>;

/// Finds the first complete frame in `buf`.
///
/// Returns the frame with its separator stripped, and the number of bytes it
/// occupied (separator included), or `None` if no separator has arrived yet.
pub fn next_frame(buf: &[u8]) -> Option<(&[u8], usize)> {
    buf.iter()
        .position(|&b| b == SEP)
        .map(|pos| (&buf[..pos], pos + 1))
}

/// Decodes and parses one frame (separator already stripped).
pub fn parse_frame(frame: &[u8]) -> CommandResult<Command> {
    let line =
        std::str::from_utf8(frame).map_err(|e| CommandError::InvalidUtf8(e.to_string()))?;
    parse_command(line)
}

/// Parses one command line.
///
/// # Example
///
/// ```
/// use tsmetrics::protocol::{parse_command, Command};
///
/// let command = parse_command("put cpu 0.5 100").unwrap();
/// assert_eq!(
///     command,
///     Command::Put { key: "cpu".to_string(), value: 0.5, timestamp: 100 }
/// );
/// assert!(parse_command("get cpu memory").is_err());
/// ```
pub fn parse_command(line: &str) -> CommandResult<Command> {
    let mut tokens = line.split_whitespace();
    let verb = tokens.next().ok_or(CommandError::EmptyCommand)?;
    let params: Vec<&str> = tokens.collect();

    match verb {
        "put" => {
            let [key, value, timestamp] = expect_params::<3>("put", &params)?;
            let value = value
                .parse::<f64>()
                .map_err(|_| CommandError::InvalidValue(value.to_string()))?;
            let timestamp = timestamp
                .parse::<i64>()
                .map_err(|_| CommandError::InvalidTimestamp(timestamp.to_string()))?;

            Ok(Command::Put {
                key: key.to_string(),
                value,
                timestamp,
            })
        }
        "get" => {
            let [key] = expect_params::<1>("get", &params)?;
            Ok(Command::Get {
                key: key.to_string(),
            })
        }
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn expect_params<'a, const N: usize>(
    command: &'static str,
    params: &[&'a str],
) -> CommandResult<[&'a str; N]> {
    <[&str; N]>::try_from(params).map_err(|_| CommandError::WrongArity {
        command,
        expected: N,
        got: params.len(),
    })
}
