//! Storage Engine Module
//!
//! This module provides the in-memory time-series store for tsmetrics:
//! a thread-safe, sharded mapping from metric key to an ordered series of
//! `(timestamp, value)` samples.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!          key ──> Series (BTreeMap<timestamp, value>)
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **Last Write Wins**: a second `put` at the same timestamp replaces the value
//! - **Snapshots**: reads return owned copies, ordered by key and timestamp
//!
//! ## Example
//!
//! ```
//! use tsmetrics::storage::{StorageEngine, WILDCARD};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(StorageEngine::new());
//! engine.put("cpu", 0.5, 100);
//! engine.put("memory", 512.0, 100);
//!
//! let all = engine.get(WILDCARD);
//! assert_eq!(all.keys().collect::<Vec<_>>(), vec!["cpu", "memory"]);
//! ```

pub mod engine;

pub use engine::{Sample, Series, Snapshot, StorageEngine, StorageStats, WILDCARD};
