use std::path::Path;

use async_trait::async_trait;
use tokio_rusqlite::rusqlite::types::ValueRef;
use tokio_rusqlite::{rusqlite, Connection, OpenFlags};
use tracing::info;

use super::{param, Column, ConnectParams, Connector, DriverKind, FieldKind, FormField, QueryResult};
use crate::error::{Error, Result};

pub(super) const FIELDS: &[FormField] = &[FormField {
    key: "file",
    label: "Filename",
    default: "",
    kind: FieldKind::Text,
}];

/// Absolute path of the database file. Relative paths resolve against the working directory.
pub(super) fn target(params: &ConnectParams) -> Result<String> {
    let file = param(params, "file").trim();
    if file.is_empty() {
        return Err(Error::connect("sqlite", "no database file given"));
    }

    let path = Path::new(file);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::connect("sqlite", e))?
            .join(path)
    };

    Ok(absolute.to_string_lossy().into_owned())
}

pub(super) fn display_name(params: &ConnectParams) -> String {
    let file = param(params, "file").trim();
    Path::new(file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

/// SQLite database file, served by tokio-rusqlite's dedicated worker thread.
pub struct SqliteConnector {
    conn: Connection,
    name: String,
}

impl SqliteConnector {
    /// Opens an existing file. A missing file is a connect error, not a new database.
    pub async fn open(path: &str, name: String) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(path, flags)
            .await
            .map_err(|e| Error::connect("sqlite", format!("{path}: {e}")))?;

        info!(path, "opened sqlite database");
        Ok(Self { conn, name })
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    fn driver(&self) -> DriverKind {
        DriverKind::Sqlite
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.conn
            .call(|conn| -> rusqlite::Result<Vec<String>> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_schema \
                     WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
                     ORDER BY name",
                )?;
                let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
                names.collect()
            })
            .await
            .map_err(Error::query)
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
        let owned = table.to_string();
        let columns = self
            .conn
            .call(move |conn| -> rusqlite::Result<Vec<Column>> {
                let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
                let columns = stmt.query_map([&owned], |row| {
                    Ok(Column {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                    })
                })?;
                columns.collect()
            })
            .await
            .map_err(Error::query)?;

        if columns.is_empty() {
            return Err(Error::query(format!("no such table: {table}")));
        }
        Ok(columns)
    }

    async fn run_query(&self, text: &str) -> Result<QueryResult> {
        let text = text.to_string();
        self.conn
            .call(move |conn| -> rusqlite::Result<QueryResult> {
                let result = {
                    let mut stmt = conn.prepare(&text)?;
                    let columns: Vec<String> =
                        stmt.column_names().into_iter().map(String::from).collect();
                    let width = columns.len();

                    let mut rows = Vec::new();
                    let mut cursor = stmt.query([])?;
                    while let Some(row) = cursor.next()? {
                        let mut cells = Vec::with_capacity(width);
                        for i in 0..width {
                            cells.push(render_value(row.get_ref(i)?));
                        }
                        rows.push(cells);
                    }

                    QueryResult { columns, rows }
                };

                if result.columns.is_empty() {
                    return Ok(QueryResult::status(format!("{} rows", conn.changes())));
                }
                Ok(result)
            })
            .await
            .map_err(Error::query)
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("x'{hex}'")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn params(file: &str) -> ConnectParams {
        ConnectParams::from([("file".to_string(), file.to_string())])
    }

    async fn fixture(path: &Path) {
        let conn = Connection::open(path).await.unwrap();
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE t (id INTEGER, name TEXT);
                 INSERT INTO t VALUES (1, 'alpha'), (2, NULL);",
            )
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_target_is_absolute() {
        let target = target(&params("data/app.db")).unwrap();
        assert!(Path::new(&target).is_absolute());
        assert!(target.ends_with("app.db"));

        assert_eq!(target_of("/tmp/x.db"), "/tmp/x.db");
    }

    fn target_of(file: &str) -> String {
        target(&params(file)).unwrap()
    }

    #[test]
    fn test_target_requires_file() {
        assert!(matches!(
            target(&ConnectParams::new()),
            Err(Error::Connect { .. })
        ));
    }

    #[test]
    fn test_display_name_is_base_name() {
        assert_eq!(display_name(&params("/var/lib/shop.sqlite")), "shop.sqlite");
        assert_eq!(display_name(&params("local.db")), "local.db");
    }

    #[tokio::test]
    async fn test_introspection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fixture.db");
        fixture(&path).await;

        let conn = SqliteConnector::open(path.to_str().unwrap(), "fixture.db".into())
            .await
            .unwrap();

        assert_eq!(conn.list_tables().await.unwrap(), vec!["t"]);
        assert_eq!(
            conn.list_columns("t").await.unwrap(),
            vec![Column::new("id", "INTEGER"), Column::new("name", "TEXT")]
        );
    }

    #[tokio::test]
    async fn test_unknown_table_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fixture.db");
        fixture(&path).await;

        let conn = SqliteConnector::open(path.to_str().unwrap(), "fixture.db".into())
            .await
            .unwrap();
        let err = conn.list_columns("missing").await.unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }

    #[tokio::test]
    async fn test_run_query_renders_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fixture.db");
        fixture(&path).await;

        let conn = SqliteConnector::open(path.to_str().unwrap(), "fixture.db".into())
            .await
            .unwrap();
        let result = conn
            .run_query("SELECT id, name, 1.5, x'0aff' FROM t ORDER BY id")
            .await
            .unwrap();

        assert_eq!(result.columns.len(), 4);
        assert_eq!(result.columns[0], "id");
        assert_eq!(result.rows[0], vec!["1", "alpha", "1.5", "x'0aff'"]);
        assert_eq!(result.rows[1][1], "NULL");
    }

    #[tokio::test]
    async fn test_statement_without_rows_reports_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fixture.db");
        fixture(&path).await;

        let conn = SqliteConnector::open(path.to_str().unwrap(), "fixture.db".into())
            .await
            .unwrap();
        let result = conn.run_query("UPDATE t SET name = 'x'").await.unwrap();
        assert_eq!(result, QueryResult::status("2 rows"));
    }

    #[tokio::test]
    async fn test_malformed_sql_is_a_query_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fixture.db");
        fixture(&path).await;

        let conn = SqliteConnector::open(path.to_str().unwrap(), "fixture.db".into())
            .await
            .unwrap();
        assert!(matches!(
            conn.run_query("SELEC nonsense").await,
            Err(Error::Query(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_a_connect_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.db");
        let err = SqliteConnector::open(path.to_str().unwrap(), "nope.db".into())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connect { .. }));
        assert!(!path.exists());
    }
}
