//! Metrics Line Protocol
//!
//! This module implements the text protocol spoken by tsmetrics clients.
//!
//! ## Overview
//!
//! Each request is a single line terminated by `\n`. Each response is a
//! status line (`ok` or `error`), zero or more payload lines, and one empty
//! line that marks the end of the response.
//!
//! ## Modules
//!
//! - `types`: Defines `Command`, `Response` and response rendering
//! - `parser`: Frame splitting and the command grammar
//!
//! ## Example
//!
//! ```
//! use tsmetrics::protocol::{next_frame, parse_frame, Command, Response};
//!
//! let data = b"get cpu\n";
//! let (frame, consumed) = next_frame(data).unwrap();
//! assert_eq!(consumed, data.len());
//! assert_eq!(parse_frame(frame).unwrap(), Command::Get { key: "cpu".to_string() });
//!
//! assert_eq!(Response::Error.to_frame(), b"error\nwrong command\n\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{next_frame, parse_command, parse_frame, CommandError, CommandResult};
pub use types::{format_value, Command, Response, ERROR_MESSAGE, SEP, STATUS_ERROR, STATUS_OK};
