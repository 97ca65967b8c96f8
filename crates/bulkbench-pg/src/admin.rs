//! Table administration and smoke-test queries.

use bulkbench_core::{BenchResult, TableName};
use sqlx::postgres::PgConnection;

use crate::util::map_write_error;
use crate::{KEY_COLUMN, PAYLOAD_COLUMN};

/// Creates the benchmark table if it does not exist. Idempotent.
pub async fn create_table(conn: &mut PgConnection, table: &TableName) -> BenchResult<()> {
    let statement = format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    {KEY_COLUMN} text NOT NULL,\n    {PAYLOAD_COLUMN} jsonb\n)"
    );
    sqlx::query(&statement)
        .execute(conn)
        .await
        .map_err(|err| map_write_error(&format!("failed to create table {table}"), err))?;

    tracing::info!(table = %table, "table created");
    Ok(())
}

/// Drops the benchmark table if it exists. Idempotent.
pub async fn drop_table(conn: &mut PgConnection, table: &TableName) -> BenchResult<()> {
    let statement = format!("DROP TABLE IF EXISTS {table}");
    sqlx::query(&statement)
        .execute(conn)
        .await
        .map_err(|err| map_write_error(&format!("failed to drop table {table}"), err))?;

    tracing::info!(table = %table, "table dropped");
    Ok(())
}

/// Returns `SELECT version()`.
pub async fn server_version(conn: &mut PgConnection) -> BenchResult<String> {
    sqlx::query_scalar::<_, String>("SELECT version()")
        .fetch_one(conn)
        .await
        .map_err(|err| map_write_error("version query failed", err))
}

/// Counts the rows currently in `table`.
pub async fn count_rows(conn: &mut PgConnection, table: &TableName) -> BenchResult<i64> {
    let statement = format!("SELECT COUNT(*) FROM {table}");
    sqlx::query_scalar::<_, i64>(&statement)
        .fetch_one(conn)
        .await
        .map_err(|err| map_write_error(&format!("failed to count rows in {table}"), err))
}
