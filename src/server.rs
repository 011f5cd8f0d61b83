//! TCP Listener
//!
//! Accepts client connections and runs one [`ConnectionHandler`] task per
//! client. All handlers share a single [`StorageEngine`].
//!
//! Handler tasks live in a [`JoinSet`], so the server owns every task it
//! spawns: finished tasks are reaped as the loop goes, and stopping the
//! server aborts whatever is still running.
//!
//! [`ConnectionHandler`]: crate::connection::ConnectionHandler

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::StorageEngine;
use anyhow::Context;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// A bound metrics server.
pub struct Server {
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
}

impl Server {
    /// Binds a listener on `addr` with a fresh storage engine.
    pub async fn bind(addr: impl ToSocketAddrs) -> anyhow::Result<Self> {
        Self::bind_with_storage(addr, Arc::new(StorageEngine::new())).await
    }

    /// Binds a listener on `addr` that serves the given storage engine.
    pub async fn bind_with_storage(
        addr: impl ToSocketAddrs,
        storage: Arc<StorageEngine>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("failed to bind listener")?;

        Ok(Self {
            listener,
            storage,
            stats: Arc::new(ConnectionStats::new()),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    /// Accepts connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Accepts connections until `shutdown` completes, then aborts every
    /// connection still open.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) {
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let handler = CommandHandler::new(Arc::clone(&self.storage));
                        let stats = Arc::clone(&self.stats);
                        connections.spawn(handle_connection(stream, addr, handler, stats));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!(error = %e, "Connection task failed");
                    }
                }
            }
        }

        info!(open = connections.len(), "Listener stopped, closing connections");
        connections.shutdown().await;
        debug!("All connections closed");
    }
}
