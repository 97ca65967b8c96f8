//! Tests against a live PostgreSQL server.
//!
//! Run with `cargo test -p bulkbench-pg -- --ignored`. Connection settings come
//! from BULKBENCH_TEST_HOST / _PORT / _DATABASE / _USER / _PASSWORD and default
//! to a local `postgres:postgres` server.

use std::sync::Arc;

use bulkbench_core::{build_rows, generate, ConnectionSettings, StrategyKind, TableName};
use bulkbench_pg::{
    count_rows, create_table, drop_table, server_version, strategy_for, ConnectionProvider,
    WriteOptions,
};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn provider() -> ConnectionProvider {
    let settings = ConnectionSettings {
        host: env_or("BULKBENCH_TEST_HOST", "localhost"),
        port: env_or("BULKBENCH_TEST_PORT", "5432")
            .parse()
            .expect("BULKBENCH_TEST_PORT must be a port number"),
        database: env_or("BULKBENCH_TEST_DATABASE", "postgres"),
        username: env_or("BULKBENCH_TEST_USER", "postgres"),
        password: env_or("BULKBENCH_TEST_PASSWORD", "postgres"),
    };
    ConnectionProvider::new(Arc::new(settings))
}

fn table(suffix: &str) -> TableName {
    TableName::parse(&format!("bulkbench_it_{}_{suffix}", std::process::id())).unwrap()
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn version_query_succeeds() {
    let mut conn = provider().acquire().await.expect("connect");
    let version = server_version(&mut conn).await.expect("version");
    assert!(version.starts_with("PostgreSQL"));
    conn.release().await;
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn create_and_drop_are_idempotent() {
    let table = table("ddl");
    let mut conn = provider().acquire().await.expect("connect");

    drop_table(&mut conn, &table).await.expect("drop missing table");
    create_table(&mut conn, &table).await.expect("first create");
    create_table(&mut conn, &table).await.expect("second create");
    assert_eq!(count_rows(&mut conn, &table).await.unwrap(), 0);
    drop_table(&mut conn, &table).await.expect("drop");
    drop_table(&mut conn, &table).await.expect("drop again");

    conn.release().await;
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn both_strategies_write_the_same_row_count() {
    let rows = build_rows(250, &generate(2)).unwrap();
    let provider = provider();

    for kind in [StrategyKind::Batched, StrategyKind::Bulk] {
        let table = table(kind.as_str());
        let mut conn = provider.acquire().await.expect("connect");
        drop_table(&mut conn, &table).await.unwrap();
        create_table(&mut conn, &table).await.unwrap();

        let strategy = strategy_for(kind, WriteOptions { page_size: 64 });
        let written = strategy.write(&mut conn, &table, &rows).await.expect("write");

        assert_eq!(written, 250, "{kind} reported a short write");
        assert_eq!(count_rows(&mut conn, &table).await.unwrap(), 250);

        drop_table(&mut conn, &table).await.unwrap();
        conn.release().await;
    }
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn bulk_stream_preserves_payload_text() {
    let table = table("fidelity");
    let rows = build_rows(3, &generate(1)).unwrap();
    let mut conn = provider().acquire().await.expect("connect");
    drop_table(&mut conn, &table).await.unwrap();
    create_table(&mut conn, &table).await.unwrap();

    strategy_for(StrategyKind::Bulk, WriteOptions::default())
        .write(&mut conn, &table, &rows)
        .await
        .expect("copy");

    let stored: Vec<(String, String)> = sqlx::query_as(&format!(
        "SELECT fake_id, json_data::text FROM {table} ORDER BY fake_id"
    ))
    .fetch_all(&mut *conn)
    .await
    .unwrap();

    assert_eq!(stored.len(), 3);
    for ((key, payload), row) in stored.iter().zip(&rows) {
        assert_eq!(key, &row.key);
        let stored_json: serde_json::Value = serde_json::from_str(payload).unwrap();
        let original_json: serde_json::Value = serde_json::from_str(&row.payload).unwrap();
        assert_eq!(stored_json, original_json);
    }

    drop_table(&mut conn, &table).await.unwrap();
    conn.release().await;
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn write_into_missing_table_is_a_write_error() {
    let table = table("missing");
    let rows = build_rows(5, &generate(0)).unwrap();
    let mut conn = provider().acquire().await.expect("connect");
    drop_table(&mut conn, &table).await.unwrap();

    for kind in [StrategyKind::Batched, StrategyKind::Bulk] {
        let err = strategy_for(kind, WriteOptions::default())
            .write(&mut conn, &table, &rows)
            .await
            .unwrap_err();
        assert!(
            matches!(err, bulkbench_core::BenchError::Write { .. }),
            "{kind}: unexpected {err:?}"
        );
    }

    conn.release().await;
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let settings = ConnectionSettings {
        host: "127.0.0.1".to_string(),
        port: 1,
        database: "postgres".to_string(),
        username: "nobody".to_string(),
        password: String::new(),
    };
    let err = ConnectionProvider::new(Arc::new(settings))
        .acquire()
        .await
        .unwrap_err();
    assert!(matches!(err, bulkbench_core::BenchError::Connection { .. }));
}
