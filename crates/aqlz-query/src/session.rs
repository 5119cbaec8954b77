//! Connection session
//!
//! A session owns the configuration for one database and creates the
//! connection handle on first use. The handle is then reused by every
//! subsequent action until the session is closed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use aqlz_core::{AqlzError, Connection, ConnectionConfig, DatabaseDriver, Result};
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Lifecycle of a session's connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No action has connected yet
    Unconnected,
    /// The handle exists and is reused
    Connected,
    /// `close()` was called; further actions fail
    Closed,
}

/// Lazily connected session to a single database
pub struct Session {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
    connection: OnceCell<Arc<dyn Connection>>,
    closed: AtomicBool,
}

impl Session {
    /// Create a session. Does not touch the network.
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig) -> Self {
        Self {
            driver,
            config,
            connection: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Identifier used to attribute history entries to this session's configuration
    pub fn connection_id(&self) -> Uuid {
        self.config.id
    }

    /// Get the connection handle, creating it on first call
    ///
    /// Concurrent first calls share a single connect attempt. A failed
    /// connect is not remembered, so the next call tries again.
    pub async fn connection(&self) -> Result<Arc<dyn Connection>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AqlzError::Connection("session is closed".to_string()));
        }

        let connection = self
            .connection
            .get_or_try_init(|| async {
                tracing::info!(
                    driver = %self.config.driver,
                    host = %self.config.host,
                    database = self.config.database.as_deref().unwrap_or_default(),
                    "opening connection"
                );
                self.driver.connect(&self.config).await.inspect_err(|e| {
                    tracing::warn!(error = %e, "connection attempt failed");
                })
            })
            .await?;

        Ok(connection.clone())
    }

    pub fn state(&self) -> SessionState {
        if self.closed.load(Ordering::SeqCst) {
            SessionState::Closed
        } else if self.connection.initialized() {
            SessionState::Connected
        } else {
            SessionState::Unconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Close the connection handle, if one was created
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        match self.connection.get() {
            Some(connection) => {
                tracing::debug!("closing session connection");
                connection.close().await
            }
            None => Ok(()),
        }
    }
}
