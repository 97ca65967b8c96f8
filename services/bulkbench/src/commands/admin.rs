use std::path::Path;

use anyhow::{Context, Result};

use super::{connect, connection_settings, load_config, table_name};

pub async fn test_connect(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut conn = connect(&config).await?;
    let version = bulkbench_pg::server_version(&mut conn)
        .await
        .context("failed to query server version")?;
    conn.release().await;
    println!("{version}");
    println!("successfully connected to database");
    Ok(())
}

pub async fn create_table(config_path: Option<&Path>, table: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let table = table_name(table, &config)?;
    let mut conn = connect(&config).await?;
    let result = bulkbench_pg::create_table(&mut conn, &table).await;
    conn.release().await;
    result.with_context(|| format!("failed to create table {table}"))?;
    println!("successfully created table {table}");
    Ok(())
}

pub async fn drop_table(config_path: Option<&Path>, table: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let table = table_name(table, &config)?;
    let mut conn = connect(&config).await?;
    let result = bulkbench_pg::drop_table(&mut conn, &table).await;
    conn.release().await;
    result.with_context(|| format!("failed to drop table {table}"))?;
    println!("successfully dropped table {table}");
    Ok(())
}

pub async fn count_rows(config_path: Option<&Path>, table: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let table = table_name(table, &config)?;
    let mut conn = connect(&config).await?;
    let result = bulkbench_pg::count_rows(&mut conn, &table).await;
    conn.release().await;
    let count = result.with_context(|| format!("failed to count rows in {table}"))?;
    println!("{count}");
    Ok(())
}

/// Prints the resolved credentials as JSON.
pub async fn test_credentials(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let settings = connection_settings(&config).await?;
    let secret = serde_json::json!({
        "username": settings.username,
        "password": settings.password,
    });
    println!("{secret}");
    Ok(())
}
