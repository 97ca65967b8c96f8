use std::sync::Arc;

use async_trait::async_trait;
use bulkbench_core::{
    BenchError, BenchResult, StrategyKind, SyntheticRow, TableName, MAX_PAGE_SIZE,
};
use sqlx::postgres::{PgConnection, Postgres};
use sqlx::{Connection, QueryBuilder};

use crate::copy_text::encode_rows;
use crate::util::map_write_error;
use crate::{KEY_COLUMN, PAYLOAD_COLUMN};

/// Rows per grouped `INSERT` statement.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Bytes per COPY data message.
const COPY_CHUNK_BYTES: usize = 1 << 20;

/// Tuning shared by every strategy instance of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub page_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Writes one batch of rows through a dedicated connection.
#[async_trait]
pub trait InsertStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Writes every row in one transaction and commits. Returns the number of
    /// rows the server reports as written.
    async fn write(
        &self,
        conn: &mut PgConnection,
        table: &TableName,
        rows: &[SyntheticRow],
    ) -> BenchResult<u64>;
}

/// Returns the strategy implementation for `kind`.
pub fn strategy_for(kind: StrategyKind, options: WriteOptions) -> Arc<dyn InsertStrategy> {
    match kind {
        StrategyKind::Batched => Arc::new(BatchedStatementInsert::new(options.page_size)),
        StrategyKind::Bulk => Arc::new(BulkStreamInsert),
    }
}

/// Grouped parameterized `INSERT` statements inside one transaction.
#[derive(Debug, Clone)]
pub struct BatchedStatementInsert {
    page_size: usize,
}

impl BatchedStatementInsert {
    /// `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[async_trait]
impl InsertStrategy for BatchedStatementInsert {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Batched
    }

    async fn write(
        &self,
        conn: &mut PgConnection,
        table: &TableName,
        rows: &[SyntheticRow],
    ) -> BenchResult<u64> {
        let mut tx = conn
            .begin()
            .await
            .map_err(|err| map_write_error("failed to open transaction", err))?;

        let mut written = 0_u64;
        for page in rows.chunks(self.page_size) {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {table} ({KEY_COLUMN}, {PAYLOAD_COLUMN}) "
            ));
            builder.push_values(page, |mut values, row| {
                values.push_bind(row.key.as_str());
                values.push_bind(&*row.payload).push_unseparated("::jsonb");
            });

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|err| map_write_error("batched insert failed", err))?;
            written += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|err| map_write_error("commit failed", err))?;

        Ok(written)
    }
}

/// Single `COPY ... FROM STDIN` stream of text-format records.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkStreamInsert;

#[async_trait]
impl InsertStrategy for BulkStreamInsert {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Bulk
    }

    async fn write(
        &self,
        conn: &mut PgConnection,
        table: &TableName,
        rows: &[SyntheticRow],
    ) -> BenchResult<u64> {
        let buffer = encode_rows(rows);
        let statement = format!("COPY {table} ({KEY_COLUMN}, {PAYLOAD_COLUMN}) FROM STDIN");

        let mut tx = conn
            .begin()
            .await
            .map_err(|err| map_write_error("failed to open transaction", err))?;

        let mut copy = tx
            .copy_in_raw(&statement)
            .await
            .map_err(|err| map_write_error("COPY rejected", err))?;

        for chunk in buffer.chunks(COPY_CHUNK_BYTES) {
            let sent = copy.send(chunk).await.map(|_| ());
            if let Err(err) = sent {
                let message = err.to_string();
                if let Err(abort_err) = copy.abort(message.clone()).await {
                    tracing::debug!(error = %abort_err, "COPY abort failed");
                }
                return Err(BenchError::write(format!("COPY stream failed: {message}")));
            }
        }

        let written = copy
            .finish()
            .await
            .map_err(|err| map_write_error("COPY load failed", err))?;

        tx.commit()
            .await
            .map_err(|err| map_write_error("commit failed", err))?;

        Ok(written)
    }
}
