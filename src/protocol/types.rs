//! Wire Types for the Metrics Protocol
//!
//! This module defines the parsed [`Command`] and the [`Response`] that is
//! rendered back to the client.
//!
//! ## Response Format
//!
//! Every response is a status line followed by a payload block, and the
//! connection handler appends one extra separator to close the frame:
//!
//! ```text
//! ok\n                      status
//! cpu 0.5 100\n             one line per sample
//! cpu 0.9 200\n
//! \n                        end of response
//! ```
//!
//! A failed command always renders as `error\nwrong command\n\n`.

use crate::storage::Snapshot;
use std::fmt;

/// Separator terminating every line on the wire.
pub const SEP: u8 = b'\n';

/// Status token of a successful response.
pub const STATUS_OK: &str = "ok";

/// Status token of a failed response.
pub const STATUS_ERROR: &str = "error";

/// The only error message the protocol ever sends.
pub const ERROR_MESSAGE: &str = "wrong command";

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `put <key> <value> <timestamp>`
    Put {
        key: String,
        value: f64,
        timestamp: i64,
    },
    /// `get <key>`, where the key may be the wildcard `*`
    Get { key: String },
}

impl Command {
    /// The verb as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Put { .. } => "put",
            Command::Get { .. } => "get",
        }
    }
}

/// The result of one command, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Success, carrying the samples to render (empty for `put`).
    Ok(Snapshot),
    /// A malformed command.
    Error,
}

impl Response {
    /// Creates a successful response with no payload.
    pub fn ok() -> Self {
        Response::Ok(Snapshot::empty())
    }

    pub fn status(&self) -> &'static str {
        match self {
            Response::Ok(_) => STATUS_OK,
            Response::Error => STATUS_ERROR,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error)
    }

    /// Renders the status line and payload block, without the closing separator.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Renders the status line and payload block into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.status().as_bytes());
        buf.push(SEP);

        match self {
            Response::Ok(snapshot) => {
                for sample in snapshot.iter_samples() {
                    buf.extend_from_slice(
                        format!(
                            "{} {} {}",
                            sample.key,
                            format_value(sample.value),
                            sample.timestamp
                        )
                        .as_bytes(),
                    );
                    buf.push(SEP);
                }
            }
            Response::Error => {
                buf.extend_from_slice(ERROR_MESSAGE.as_bytes());
                buf.push(SEP);
            }
        }
    }

    /// Renders the complete frame, including the end-of-response separator.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut buf = self.serialize();
        buf.push(SEP);
        buf
    }
}

/// Formats a sample value so that it parses back to the same `f64`.
///
/// Integral values keep a trailing `.0` (`1.0`, not `1`). Very large and very
/// small magnitudes switch to exponent form without a sign or padding (`1e16`,
/// `1e-5`), and non-finite values render as `NaN`, `inf` and `-inf`. All of
/// these are accepted by `f64::from_str`.
pub fn format_value(value: f64) -> String {
    format!("{:?}", value)
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok(snapshot) if snapshot.is_empty() => write!(f, "ok (empty)"),
            Response::Ok(snapshot) => write!(f, "ok ({} samples)", snapshot.len()),
            Response::Error => write!(f, "error: {}", ERROR_MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageEngine, WILDCARD};

    #[test]
    fn test_ok_serialize() {
        assert_eq!(Response::ok().serialize(), b"ok\n");
        assert_eq!(Response::ok().to_frame(), b"ok\n\n");
    }

    #[test]
    fn test_error_serialize() {
        assert_eq!(Response::Error.serialize(), b"error\nwrong command\n");
        assert_eq!(Response::Error.to_frame(), b"error\nwrong command\n\n");
    }

    #[test]
    fn test_single_key_serialize() {
        let engine = StorageEngine::new();
        engine.put("cpu", 0.9, 200);
        engine.put("cpu", 0.5, 100);

        let response = Response::Ok(engine.get("cpu"));
        assert_eq!(response.to_frame(), b"ok\ncpu 0.5 100\ncpu 0.9 200\n\n");
    }

    #[test]
    fn test_all_keys_serialize() {
        let engine = StorageEngine::new();
        engine.put("palm.cpu", 2.0, 1150864248);
        engine.put("eardrum.cpu", 3.0, 1150864250);
        engine.put("palm.cpu", 0.5, 1150864247);

        let response = Response::Ok(engine.get(WILDCARD));
        assert_eq!(
            response.to_frame(),
            b"ok\neardrum.cpu 3.0 1150864250\npalm.cpu 0.5 1150864247\npalm.cpu 2.0 1150864248\n\n"
        );
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(1.0), "1.0");
        assert_eq!(format_value(-12.25), "-12.25");
        assert_eq!(format_value(0.1).parse::<f64>().unwrap(), 0.1);
    }

    #[test]
    fn test_format_value_exponent_and_non_finite() {
        assert_eq!(format_value(1e16), "1e16");
        assert_eq!(format_value(0.00001), "1e-5");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-inf");

        assert_eq!(format_value(1e16).parse::<f64>().unwrap(), 1e16);
        assert_eq!(format_value(0.00001).parse::<f64>().unwrap(), 0.00001);
        assert!(format_value(f64::NAN).parse::<f64>().unwrap().is_nan());
    }

    #[test]
    fn test_display() {
        assert_eq!(Response::ok().to_string(), "ok (empty)");
        assert_eq!(Response::Error.to_string(), "error: wrong command");
    }

    #[test]
    fn test_command_name() {
        let put = Command::Put {
            key: "cpu".to_string(),
            value: 1.0,
            timestamp: 1,
        };
        let get = Command::Get {
            key: "*".to_string(),
        };
        assert_eq!(put.name(), "put");
        assert_eq!(get.name(), "get");
    }
}
