//! Integration tests for the embedded SQLite backend
//!
//! Exercises the sqlite backend through the factory, the plain manager, and
//! the resilient manager, against real tempfile-backed databases.

#![cfg(feature = "sqlite")]

use resilient_rdbc::prelude::*;
use std::path::Path;

fn sqlite_config(path: &Path) -> ConnectionConfig {
    ConnectionConfig::new(BackendKind::Sqlite).with_database(path.to_string_lossy())
}

// ==================== Factory Dispatch Tests ====================

#[tokio::test]
async fn test_factory_creates_sqlite_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir.path().join("app.db"));

    let conn = create_connection(&config).await.unwrap();
    assert!(conn.health_check().await);
    conn.close().await.unwrap();
    assert!(!conn.health_check().await);
}

#[tokio::test]
async fn test_parent_directories_created_on_first_use() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("data").join("stores").join("app.db");

    let conn = create_connection(&sqlite_config(&nested)).await.unwrap();
    assert!(nested.parent().unwrap().exists());
    assert!(conn.health_check().await);
}

// ==================== Plain Manager Tests ====================

#[tokio::test]
async fn test_manager_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let manager = create_manager(sqlite_config(&dir.path().join("app.db")));

    manager
        .execute_command(
            "CREATE TABLE events (id INTEGER PRIMARY KEY, label TEXT, weight REAL)",
            &[],
        )
        .await
        .unwrap();
    manager
        .execute_command(
            "INSERT INTO events (id, label, weight) VALUES (?1, ?2, ?3)",
            &[
                Value::Int64(1),
                Value::String("entry".into()),
                Value::Float64(0.5),
            ],
        )
        .await
        .unwrap();

    let rows = manager
        .execute_query("SELECT id, label, weight FROM events", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_by_name("id"), Some(&Value::Int64(1)));
    assert_eq!(
        rows[0].get_by_name("label"),
        Some(&Value::String("entry".into()))
    );
    assert_eq!(rows[0].get_by_name("weight"), Some(&Value::Float64(0.5)));

    assert!(manager.health_check().await);
    manager.close().await.unwrap();
}

#[tokio::test]
async fn test_manager_reconnects_to_same_file_after_close() {
    let dir = tempfile::tempdir().unwrap();
    let manager = create_manager(sqlite_config(&dir.path().join("app.db")));

    manager
        .execute_command("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
        .await
        .unwrap();
    manager
        .execute_command("INSERT INTO t (id) VALUES (1)", &[])
        .await
        .unwrap();
    manager.close().await.unwrap();

    // Fresh connection, same persisted data
    let rows = manager.execute_query("SELECT id FROM t", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_query_error_propagates_on_plain_path() {
    let dir = tempfile::tempdir().unwrap();
    let manager = create_manager(sqlite_config(&dir.path().join("app.db")));

    let err = manager
        .execute_query("SELECT * FROM no_such_table", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Query { .. }));
    assert!(!err.is_retriable());
}

// ==================== Resilient Manager Tests ====================

#[tokio::test]
async fn test_resilient_round_trip_with_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ResilientManager::new(
        sqlite_config(&dir.path().join("app.db")).with_pool_size(2),
    );

    manager
        .execute_command_with_retry(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)",
            &[],
        )
        .await
        .unwrap();
    // NUL-bearing text is stripped before it reaches the driver
    manager
        .execute_command_with_retry(
            "INSERT INTO notes (id, body) VALUES (?1, ?2)",
            &[Value::Int64(1), Value::String("sa\u{0}fe".into())],
        )
        .await
        .unwrap();

    let rows = manager
        .execute_query_with_retry("SELECT body FROM notes WHERE id = ?1", &[Value::Int64(1)])
        .await
        .unwrap();
    assert_eq!(rows[0].get_by_name("body"), Some(&Value::String("safe".into())));

    assert!(manager.health_check_with_retry().await);
    manager.close().await.unwrap();
}

#[tokio::test]
async fn test_pooled_connections_share_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir.path().join("app.db")).with_pool_size(3);
    let manager = ResilientManager::new(config);

    manager
        .execute_command_with_retry("CREATE TABLE counters (n INTEGER)", &[])
        .await
        .unwrap();
    for _ in 0..3 {
        manager
            .execute_command_with_retry("INSERT INTO counters (n) VALUES (1)", &[])
            .await
            .unwrap();
    }

    let rows = manager
        .execute_query_with_retry("SELECT COUNT(*) AS total FROM counters", &[])
        .await
        .unwrap();
    assert_eq!(rows[0].get_by_name("total"), Some(&Value::Int64(3)));

    manager.close().await.unwrap();
}
