use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DatabaseConfig;

/// Username/password pair, as stored in the secret service.
///
/// Extra fields in the stored secret (engine, host, ...) are ignored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to open a connection. Built once at startup and then
/// only read, shared by `Arc` with every job.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl ConnectionSettings {
    pub fn new(database: &DatabaseConfig, credentials: Credentials) -> Self {
        Self {
            host: database.host.clone(),
            port: database.port,
            database: database.name.clone(),
            username: credentials.username,
            password: credentials.password,
        }
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
