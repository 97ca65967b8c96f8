use bulkbench_core::BenchError;

/// Maps a failure while opening a connection.
pub(crate) fn map_connect_error(settings_host: &str, err: sqlx::Error) -> BenchError {
    BenchError::connection(format!("failed to connect to {settings_host}: {err}"))
}

/// Maps a failure while writing rows or running DDL.
pub(crate) fn map_write_error(context: &str, err: sqlx::Error) -> BenchError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err
                .code()
                .map(|code| code.into_owned())
                .unwrap_or_else(|| "?".to_string());
            BenchError::write(format!("{context}: [{code}] {}", db_err.message()))
        }
        other => BenchError::write(format!("{context}: {other}")),
    }
}
