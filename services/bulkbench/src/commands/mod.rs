//! Subcommand implementations.

pub mod admin;
pub mod bench;
pub mod worker;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bulkbench_core::{BenchConfig, ConnectionSettings, TableName};
use bulkbench_pg::{ConnectionProvider, ScopedConnection};
use bulkbench_secrets::{resolve_connection_settings, resolver_from_config};

pub(crate) fn load_config(path: Option<&Path>) -> Result<BenchConfig> {
    BenchConfig::load_with_file(path).context("failed to load configuration")
}

/// Validates `--table`, falling back to the configured default.
pub(crate) fn table_name(requested: Option<String>, config: &BenchConfig) -> Result<TableName> {
    let raw = requested.unwrap_or_else(|| config.benchmark.table.clone());
    TableName::parse(&raw).with_context(|| format!("invalid table name {raw:?}"))
}

pub(crate) async fn connection_settings(config: &BenchConfig) -> Result<Arc<ConnectionSettings>> {
    let resolver = resolver_from_config(&config.credentials)
        .await
        .context("failed to build credential resolver")?;
    let settings = resolve_connection_settings(config, resolver.as_ref())
        .await
        .context("failed to resolve database credentials")?;
    Ok(Arc::new(settings))
}

pub(crate) async fn connect(config: &BenchConfig) -> Result<ScopedConnection> {
    let provider = ConnectionProvider::new(connection_settings(config).await?);
    Ok(provider.acquire().await?)
}
