//! Command Handler
//!
//! Executes parsed commands against the shared [`StorageEngine`] and turns
//! the outcome into a [`Response`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ parse_frame │───>│  execute()  │───>│  Response   │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                      StorageEngine                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A malformed frame never reaches the storage engine, so it cannot
//! mutate anything.

use crate::protocol::{parse_frame, Command, CommandError, Response};
use crate::storage::{Snapshot, StorageEngine};
use std::sync::Arc;
use tracing::trace;

/// Runs client commands against the storage engine.
///
/// Cloning is cheap; every connection gets its own handler sharing one engine.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Returns the storage engine this handler writes to.
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Interprets one frame (separator already stripped) and returns the
    /// response to send back.
    ///
    /// Decoding and grammar failures both become [`Response::Error`]; use
    /// [`interpret`](Self::interpret) to see the cause.
    pub fn handle_frame(&self, frame: &[u8]) -> Response {
        match self.interpret(frame) {
            Ok(snapshot) => Response::Ok(snapshot),
            Err(_) => Response::Error,
        }
    }

    /// Parses and executes one frame.
    pub fn interpret(&self, frame: &[u8]) -> Result<Snapshot, CommandError> {
        let command = parse_frame(frame)?;
        Ok(self.execute(command))
    }

    /// Executes a validated command.
    ///
    /// `put` yields an empty snapshot; `get` yields the requested series.
    pub fn execute(&self, command: Command) -> Snapshot {
        match command {
            Command::Put {
                key,
                value,
                timestamp,
            } => {
                let replaced = self.storage.put(&key, value, timestamp);
                trace!(key = %key, value, timestamp, replaced = replaced.is_some(), "put");
                Snapshot::empty()
            }
            Command::Get { key } => {
                let snapshot = self.storage.get(&key);
                trace!(key = %key, samples = snapshot.len(), "get");
                snapshot
            }
        }
    }
}
