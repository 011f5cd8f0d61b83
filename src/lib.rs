//! # tsmetrics - A Minimal In-Memory Time-Series Metrics Store
//!
//! tsmetrics keeps `(timestamp, value)` samples per metric key in memory and
//! serves them over a line-oriented TCP protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              tsmetrics                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Server    │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │   Line      │    │              StorageEngine                   │   │
//! │  │   Parser    │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │  └─────────────┘    │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use tsmetrics::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::bind("127.0.0.1:8888").await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Protocol
//!
//! ```text
//! > put cpu 0.5 100
//! < ok
//! <
//! > get cpu
//! < ok
//! < cpu 0.5 100
//! <
//! > get a b
//! < error
//! < wrong command
//! <
//! ```
//!
//! - `put <key> <value> <timestamp>` stores one sample; a repeated timestamp
//!   replaces the earlier value.
//! - `get <key>` returns that key's samples in timestamp order; `get *`
//!   returns every key.
//!
//! ## Module Overview
//!
//! - [`protocol`]: Frame splitting, command grammar and response rendering
//! - [`storage`]: Thread-safe time-series storage engine
//! - [`commands`]: Executes commands against the storage engine
//! - [`connection`]: Client connection management
//! - [`server`]: TCP listener and connection supervision
//! - [`config`]: Host/port configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Command, CommandError, Response};
pub use server::Server;
pub use storage::{Snapshot, StorageEngine};

/// The default port tsmetrics listens on
pub const DEFAULT_PORT: u16 = 8888;

/// The default host tsmetrics binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of tsmetrics
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
