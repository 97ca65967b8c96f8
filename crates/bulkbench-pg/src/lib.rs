//! PostgreSQL adapters: scoped connections, table administration and the
//! two bulk-insert strategies.

mod admin;
mod connection;
pub mod copy_text;
mod strategy;
mod util;

pub use admin::{count_rows, create_table, drop_table, server_version};
pub use connection::{ConnectionProvider, ScopedConnection};
pub use strategy::{
    strategy_for, BatchedStatementInsert, BulkStreamInsert, InsertStrategy, WriteOptions,
    DEFAULT_PAGE_SIZE,
};

/// Column holding the synthetic key.
pub const KEY_COLUMN: &str = "fake_id";

/// Column holding the JSON payload.
pub const PAYLOAD_COLUMN: &str = "json_data";
