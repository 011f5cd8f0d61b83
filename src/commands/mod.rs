//! Command Handler Module
//!
//! This module implements the command execution layer for tsmetrics.
//! It receives frames from a connection, parses them with the protocol
//! module, runs them against the storage engine and returns a response.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `put <key> <value> <timestamp>`
//! - `get <key>` / `get *`

pub mod handler;

pub use handler::CommandHandler;
