use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use bulkbench_core::{BenchResult, ConnectionSettings};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use crate::util::map_connect_error;

const APPLICATION_NAME: &str = "bulkbench";

/// Opens one dedicated connection per caller. Never pools.
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    settings: Arc<ConnectionSettings>,
}

impl ConnectionProvider {
    /// Creates a provider over settings resolved once at startup.
    pub fn new(settings: Arc<ConnectionSettings>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .database(&self.settings.database)
            .username(&self.settings.username)
            .password(&self.settings.password)
            .application_name(APPLICATION_NAME)
    }

    /// Opens a connection scoped to the returned guard.
    ///
    /// Fails with `BenchError::Connection` when the server is unreachable or
    /// rejects the credentials. Not retried.
    pub async fn acquire(&self) -> BenchResult<ScopedConnection> {
        let started = Instant::now();
        let conn = PgConnection::connect_with(&self.connect_options())
            .await
            .map_err(|err| map_connect_error(&self.settings.host, err))?;

        tracing::debug!(
            host = %self.settings.host,
            database = %self.settings.database,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "connection opened"
        );

        Ok(ScopedConnection { conn })
    }
}

/// Exclusively owned connection.
///
/// Dropping the guard closes the socket on every exit path, including errors
/// and task cancellation; [`ScopedConnection::release`] additionally sends a
/// graceful terminate message.
#[derive(Debug)]
pub struct ScopedConnection {
    conn: PgConnection,
}

impl ScopedConnection {
    /// Closes the connection gracefully. Close failures are only logged since
    /// the socket is gone either way.
    pub async fn release(self) {
        if let Err(err) = self.conn.close().await {
            tracing::debug!(error = %err, "connection close failed");
        }
    }
}

impl Deref for ScopedConnection {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for ScopedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
