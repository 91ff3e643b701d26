//! Integration tests for koios.

mod common;

use common::{create_sqlite_fixture, get_test_database_url, sqlite_params, TestDatabase};
use koios::connector::Column;
use koios::export;
use koios::registry::ConnectionRegistry;
use koios::session::{load_session_from_path, save_session_to_path, DatabaseEntry, SessionState};
use koios::workspace::QueryWorkspace;
use koios::Error;

#[tokio::test]
async fn test_sqlite_browse_and_query() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    create_sqlite_fixture(&path);

    let mut registry = ConnectionRegistry::new();
    let id = registry
        .open_connection("sqlite", sqlite_params(&path))
        .await
        .unwrap();
    assert_eq!(id, "sqlite-1");
    assert_eq!(registry.display_name(&id), Some("shop.db"));

    assert_eq!(
        registry.get_tables(&id).await.unwrap(),
        vec!["customers", "orders"]
    );
    assert_eq!(
        registry.get_columns(&id, "customers").await.unwrap(),
        vec![Column::new("id", "INTEGER"), Column::new("name", "TEXT")]
    );

    let result = registry
        .run_query(&id, "SELECT id, total, note FROM orders ORDER BY id")
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["id", "total", "note"]);
    assert_eq!(
        result.rows,
        vec![vec!["10", "9.5", "NULL"], vec!["11", "20", "gift, wrapped"]]
    );
}

#[tokio::test]
async fn test_sqlite_errors_leave_connection_usable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    create_sqlite_fixture(&path);

    let mut registry = ConnectionRegistry::new();
    let id = registry
        .open_connection("sqlite", sqlite_params(&path))
        .await
        .unwrap();

    assert!(matches!(
        registry.run_query(&id, "SELEC 1").await,
        Err(Error::Query(_))
    ));
    assert!(registry.get_columns(&id, "missing").await.is_err());

    let result = registry.run_query(&id, "SELECT count(*) AS n FROM customers").await.unwrap();
    assert_eq!(result.rows, vec![vec!["2"]]);
}

#[tokio::test]
async fn test_sqlite_statement_without_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    create_sqlite_fixture(&path);

    let mut registry = ConnectionRegistry::new();
    let id = registry
        .open_connection("sqlite", sqlite_params(&path))
        .await
        .unwrap();

    let result = registry
        .run_query(&id, "UPDATE customers SET name = upper(name)")
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["status"]);
    assert_eq!(result.rows, vec![vec!["2 rows"]]);
}

#[tokio::test]
async fn test_ids_are_never_reused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    create_sqlite_fixture(&path);

    let mut registry = ConnectionRegistry::new();
    let first = registry
        .open_connection("sqlite", sqlite_params(&path))
        .await
        .unwrap();
    assert_eq!(registry.close_connection(&first).as_deref(), Some("shop.db"));

    let second = registry
        .open_connection("sqlite", sqlite_params(&path))
        .await
        .unwrap();
    assert_ne!(first, second);
    assert!(registry.get_tables(&first).await.unwrap_err().is_not_open());
}

#[tokio::test]
async fn test_export_query_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    create_sqlite_fixture(&path);

    let mut registry = ConnectionRegistry::new();
    let id = registry
        .open_connection("sqlite", sqlite_params(&path))
        .await
        .unwrap();
    let result = registry
        .run_query(&id, "SELECT id, note FROM orders ORDER BY id")
        .await
        .unwrap();

    let out = dir.path().join("orders.csv");
    export::write_csv(&result, &out).unwrap();
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "id,note\n10,NULL\n11,\"gift, wrapped\"\n"
    );
}

#[tokio::test]
async fn test_session_reopens_databases() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("shop.db");
    create_sqlite_fixture(&db_path);

    let mut registry = ConnectionRegistry::new();
    registry
        .open_connection("sqlite", sqlite_params(&db_path))
        .await
        .unwrap();
    let mut workspace = QueryWorkspace::new();
    workspace.set_current_text("SELECT * FROM orders");

    let state = SessionState {
        databases: registry.snapshot().into_iter().map(DatabaseEntry::from).collect(),
        queries: workspace.snapshot(),
    };
    let session_path = dir.path().join("session.json");
    save_session_to_path(&state, &session_path).unwrap();

    let loaded = load_session_from_path(&session_path).unwrap();
    assert_eq!(loaded, state);

    let mut reopened = ConnectionRegistry::new();
    for entry in loaded.databases {
        reopened
            .open_connection(&entry.driver, entry.connect_params)
            .await
            .unwrap();
    }
    assert_eq!(reopened.snapshot(), registry.snapshot());
}

#[tokio::test]
async fn test_postgres_browse_and_query() {
    let Some(admin_url) = get_test_database_url() else {
        eprintln!("Skipping: TEST_DATABASE_URL not set");
        return;
    };

    let test_db = TestDatabase::new(&admin_url).await.unwrap();
    let client = test_db.connect().await.unwrap();
    client
        .batch_execute(
            "CREATE TABLE widgets (id INTEGER PRIMARY KEY, label TEXT);
             INSERT INTO widgets VALUES (1, 'bolt'), (2, NULL);",
        )
        .await
        .unwrap();

    let mut registry = ConnectionRegistry::new();
    let id = registry
        .open_connection("postgres", test_db.params())
        .await
        .unwrap();
    assert_eq!(id, "postgres-1");

    assert!(registry
        .get_tables(&id)
        .await
        .unwrap()
        .contains(&"widgets".to_string()));

    let columns = registry.get_columns(&id, "widgets").await.unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "label"]);

    let result = registry
        .run_query(&id, "SELECT id, label FROM widgets ORDER BY id")
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec!["1", "bolt"], vec!["2", "NULL"]]);

    let err = registry
        .run_query(&id, "SELECT * FROM nonexistent_table_xyz")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("nonexistent_table_xyz"));
}

#[tokio::test]
async fn test_postgres_unreachable_host() {
    let mut registry = ConnectionRegistry::new();
    let params = [
        ("db", "shop"),
        ("host", "invalid-host-that-does-not-exist"),
        ("user", "nobody"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let err = registry.open_connection("postgres", params).await.unwrap_err();
    assert!(matches!(err, Error::Connect { .. }));
    assert!(registry.is_empty());
}
