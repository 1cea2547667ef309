//! SQLite backend implementation for resilient-rdbc
//!
//! Embedded file-backed storage over rusqlite. The synchronous driver is
//! bridged onto the async runtime with `spawn_blocking`; the connection
//! handle lives behind a mutex and is taken out of its slot on close.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::types::{Row, Value};

/// Convert a Value to a rusqlite parameter
fn value_to_sql(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        Value::Int32(n) => rusqlite::types::Value::Integer(i64::from(*n)),
        Value::Int64(n) => rusqlite::types::Value::Integer(*n),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

/// Convert a rusqlite value to a Value
fn ref_to_value(value: rusqlite::types::ValueRef<'_>) -> Value {
    use rusqlite::types::ValueRef;

    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int64(n),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

/// Apply pragmas for concurrent access: WAL journal, NORMAL synchronous,
/// and a busy timeout so writers wait for locks instead of failing.
fn configure_connection(conn: &rusqlite::Connection) {
    // journal_mode returns a result row, so pragma_update over execute_batch
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
}

/// SQLite connection implementation
pub struct SqliteConnection {
    db_path: PathBuf,
    conn: Arc<Mutex<Option<rusqlite::Connection>>>,
}

impl SqliteConnection {
    /// Open (creating if needed) the database file named by
    /// `config.database`, creating parent directories first.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let db_path = PathBuf::from(&config.database);
        let path = db_path.clone();

        let conn = tokio::task::spawn_blocking(move || -> Result<rusqlite::Connection> {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        Error::connection_with_source("failed to create database directory", e)
                    })?;
                }
            }

            let conn = rusqlite::Connection::open(&path)
                .map_err(|e| Error::connection_with_source("failed to open sqlite database", e))?;
            configure_connection(&conn);
            Ok(conn)
        })
        .await
        .map_err(|e| Error::connection(format!("blocking task failed: {e}")))??;

        info!(path = %db_path.display(), "sqlite connection created");

        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let params: Vec<rusqlite::types::Value> = params.iter().map(value_to_sql).collect();

        tokio::task::spawn_blocking(move || -> Result<Vec<Row>> {
            let guard = conn.lock();
            let db = guard
                .as_ref()
                .ok_or_else(|| Error::connection("no database connection"))?;

            let mut stmt = db
                .prepare(&sql)
                .map_err(|e| Error::query_with_sql(e.to_string(), &sql))?;
            let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

            let mut sql_rows = stmt
                .query(rusqlite::params_from_iter(params))
                .map_err(|e| Error::query_with_sql(e.to_string(), &sql))?;

            let mut rows = Vec::new();
            while let Some(row) = sql_rows
                .next()
                .map_err(|e| Error::query_with_sql(e.to_string(), &sql))?
            {
                let mut values = Vec::with_capacity(columns.len());
                for idx in 0..columns.len() {
                    let value = row
                        .get_ref(idx)
                        .map_err(|e| Error::query_with_sql(e.to_string(), &sql))?;
                    values.push(ref_to_value(value));
                }
                rows.push(Row::new(columns.clone(), values));
            }

            Ok(rows)
        })
        .await
        .map_err(|e| Error::connection(format!("blocking task failed: {e}")))?
    }

    async fn execute_command(&self, sql: &str, params: &[Value]) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let params: Vec<rusqlite::types::Value> = params.iter().map(value_to_sql).collect();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut guard = conn.lock();
            let db = guard
                .as_mut()
                .ok_or_else(|| Error::connection("no database connection"))?;

            // Dropping an uncommitted transaction rolls it back
            let tx = db
                .transaction()
                .map_err(|e| Error::command_with_sql(e.to_string(), &sql))?;
            tx.execute(&sql, rusqlite::params_from_iter(params))
                .map_err(|e| Error::command_with_sql(e.to_string(), &sql))?;
            tx.commit()
                .map_err(|e| Error::command_with_sql(e.to_string(), &sql))?;

            Ok(())
        })
        .await
        .map_err(|e| Error::connection(format!("blocking task failed: {e}")))?
    }

    async fn health_check(&self) -> bool {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            match guard.as_ref() {
                Some(db) => db.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
                None => false,
            }
        })
        .await
        .unwrap_or(false)
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(db) = conn.lock().take() {
                // Returns the handle on failure; drop it either way
                if let Err((_, e)) = db.close() {
                    tracing::warn!(path = %path.display(), error = %e, "sqlite close failed");
                } else {
                    info!(path = %path.display(), "sqlite connection closed");
                }
            }
        })
        .await
        .map_err(|e| Error::connection(format!("blocking task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;

    fn sqlite_config(path: &Path) -> ConnectionConfig {
        ConnectionConfig::new(BackendKind::Sqlite).with_database(path.to_string_lossy())
    }

    #[tokio::test]
    async fn test_create_insert_select() {
        let dir = tempfile::tempdir().unwrap();
        let conn = SqliteConnection::connect(&sqlite_config(&dir.path().join("t.db")))
            .await
            .unwrap();

        conn.execute_command(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)",
            &[],
        )
        .await
        .unwrap();
        conn.execute_command(
            "INSERT INTO users (id, name) VALUES (?1, ?2)",
            &[Value::Int64(1), Value::String("Alice".into())],
        )
        .await
        .unwrap();

        let rows = conn
            .execute_query("SELECT id, name FROM users", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_name("id"), Some(&Value::Int64(1)));
        assert_eq!(
            rows[0].get_by_name("name"),
            Some(&Value::String("Alice".into()))
        );
    }

    #[tokio::test]
    async fn test_parent_directories_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("t.db");

        let conn = SqliteConnection::connect(&sqlite_config(&nested)).await.unwrap();
        assert!(nested.parent().unwrap().exists());
        assert!(conn.health_check().await);
    }

    #[tokio::test]
    async fn test_failed_command_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let conn = SqliteConnection::connect(&sqlite_config(&dir.path().join("t.db")))
            .await
            .unwrap();

        conn.execute_command("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();
        conn.execute_command("INSERT INTO t (id) VALUES (1)", &[])
            .await
            .unwrap();

        // Duplicate primary key fails and must not leave partial state
        let err = conn
            .execute_command("INSERT INTO t (id) VALUES (1)", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Command { .. }));

        let rows = conn.execute_query("SELECT id FROM t", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_close_then_use_fails() {
        let dir = tempfile::tempdir().unwrap();
        let conn = SqliteConnection::connect(&sqlite_config(&dir.path().join("t.db")))
            .await
            .unwrap();

        conn.close().await.unwrap();
        assert!(!conn.health_check().await);

        let err = conn.execute_query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));

        // Close again is fine
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_query_error_carries_sql() {
        let dir = tempfile::tempdir().unwrap();
        let conn = SqliteConnection::connect(&sqlite_config(&dir.path().join("t.db")))
            .await
            .unwrap();

        let err = conn
            .execute_query("SELECT * FROM missing_table", &[])
            .await
            .unwrap_err();
        match err {
            Error::Query { sql, .. } => {
                assert_eq!(sql.as_deref(), Some("SELECT * FROM missing_table"));
            }
            other => panic!("expected query error, got {other:?}"),
        }
    }
}
