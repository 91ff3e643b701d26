//! Set of open connections keyed by opaque ids.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::connector::{Column, ConnectParams, Connector, DriverKind, QueryResult};
use crate::error::{Error, Result};

struct Entry {
    /// Open order, for a stable snapshot.
    seq: u64,
    driver: DriverKind,
    params: ConnectParams,
    connector: Arc<dyn Connector>,
}

/// What the session file remembers about one open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub driver: DriverKind,
    pub params: ConnectParams,
}

/// Listing row for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: String,
    pub driver: DriverKind,
    pub name: String,
}

/// Owns every open connector.
///
/// Ids have the form `<driver>-<n>` with `n` counting up from 1 for the life of the
/// registry; an id is never handed out twice, even after its connection closes.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: HashMap<String, Entry>,
    counter: u64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the driver name, opens a connector and registers it.
    ///
    /// Nothing is registered and no id is consumed if the driver is unknown or the open
    /// fails.
    pub async fn open_connection(&mut self, driver: &str, params: ConnectParams) -> Result<String> {
        let kind: DriverKind = driver.parse()?;
        let connector = kind.open(&params).await?;
        Ok(self.insert(kind, params, connector))
    }

    /// Registers an already opened connector and returns its new id.
    pub fn insert(
        &mut self,
        driver: DriverKind,
        params: ConnectParams,
        connector: Arc<dyn Connector>,
    ) -> String {
        self.counter += 1;
        let id = format!("{}-{}", driver, self.counter);
        info!(id = %id, name = connector.display_name(), "registered connection");

        self.entries.insert(
            id.clone(),
            Entry {
                seq: self.counter,
                driver,
                params,
                connector,
            },
        );
        id
    }

    /// Removes the connection and returns its display name. Unknown ids are a no-op and
    /// return `None`.
    ///
    /// The connector is released once background tasks still using it finish.
    pub fn close_connection(&mut self, id: &str) -> Option<String> {
        let entry = self.entries.remove(id)?;
        let name = entry.connector.display_name().to_string();
        info!(id, name = %name, "closed connection");
        Some(name)
    }

    pub fn connector(&self, id: &str) -> Result<Arc<dyn Connector>> {
        self.entries
            .get(id)
            .map(|entry| Arc::clone(&entry.connector))
            .ok_or_else(|| Error::NotOpen(id.to_string()))
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|entry| entry.connector.display_name())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn get_tables(&self, id: &str) -> Result<Vec<String>> {
        self.connector(id)?.list_tables().await
    }

    pub async fn get_columns(&self, id: &str, table: &str) -> Result<Vec<Column>> {
        self.connector(id)?.list_columns(table).await
    }

    pub async fn run_query(&self, id: &str, text: &str) -> Result<QueryResult> {
        self.connector(id)?.run_query(text).await
    }

    /// Open connections, oldest first.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.ordered()
            .into_iter()
            .map(|(id, entry)| ConnectionInfo {
                id: id.clone(),
                driver: entry.driver,
                name: entry.connector.display_name().to_string(),
            })
            .collect()
    }

    /// Driver and parameters of every open connection, for the session file.
    pub fn snapshot(&self) -> Vec<ConnectionSpec> {
        self.ordered()
            .into_iter()
            .map(|(_, entry)| ConnectionSpec {
                driver: entry.driver,
                params: entry.params.clone(),
            })
            .collect()
    }

    fn ordered(&self) -> Vec<(&String, &Entry)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeConnector {
        name: String,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        fn driver(&self) -> DriverKind {
            DriverKind::Sqlite
        }

        fn display_name(&self) -> &str {
            &self.name
        }

        async fn list_tables(&self) -> Result<Vec<String>> {
            Ok(vec!["users".to_string()])
        }

        async fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
            Err(Error::query(format!("no such table: {table}")))
        }

        async fn run_query(&self, text: &str) -> Result<QueryResult> {
            Ok(QueryResult::status(text))
        }
    }

    fn fake(name: &str) -> Arc<dyn Connector> {
        Arc::new(FakeConnector {
            name: name.to_string(),
        })
    }

    fn file_params(file: &str) -> ConnectParams {
        ConnectParams::from([("file".to_string(), file.to_string())])
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut registry = ConnectionRegistry::new();
        let a = registry.insert(DriverKind::Sqlite, file_params("a.db"), fake("a.db"));
        let b = registry.insert(DriverKind::Postgres, ConnectParams::new(), fake("pg"));
        assert_eq!(a, "sqlite-1");
        assert_eq!(b, "postgres-2");

        assert_eq!(registry.close_connection(&a), Some("a.db".to_string()));
        let c = registry.insert(DriverKind::Sqlite, file_params("a.db"), fake("a.db"));
        assert_eq!(c, "sqlite-3");
    }

    #[test]
    fn test_close_unknown_is_noop() {
        let mut registry = ConnectionRegistry::new();
        registry.insert(DriverKind::Sqlite, file_params("a.db"), fake("a.db"));

        assert_eq!(registry.close_connection("sqlite-42"), None);
        assert_eq!(registry.close_connection("sqlite-1"), Some("a.db".to_string()));
        // Second close of the same id is also a no-op.
        assert_eq!(registry.close_connection("sqlite-1"), None);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_driver_leaves_registry_unchanged() {
        let mut registry = ConnectionRegistry::new();
        registry.insert(DriverKind::Sqlite, file_params("a.db"), fake("a.db"));

        let err = registry
            .open_connection("oracle", ConnectParams::new())
            .await
            .unwrap_err();
        assert_eq!(err, Error::UnsupportedDriver("oracle".to_string()));
        assert_eq!(registry.len(), 1);

        // The counter did not move.
        let next = registry.insert(DriverKind::Sqlite, file_params("b.db"), fake("b.db"));
        assert_eq!(next, "sqlite-2");
    }

    #[tokio::test]
    async fn test_failed_open_registers_nothing() {
        let mut registry = ConnectionRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.db");

        let err = registry
            .open_connection("sqlite", file_params(missing.to_str().unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_lookups_by_unknown_id_are_not_open() {
        let registry = ConnectionRegistry::new();
        assert_eq!(
            registry.get_tables("sqlite-1").await.unwrap_err(),
            Error::NotOpen("sqlite-1".to_string())
        );
        assert!(registry.get_columns("x", "t").await.unwrap_err().is_not_open());
        assert!(registry.run_query("x", "select 1").await.unwrap_err().is_not_open());
    }

    #[tokio::test]
    async fn test_delegates_to_connector() {
        let mut registry = ConnectionRegistry::new();
        let id = registry.insert(DriverKind::Sqlite, file_params("a.db"), fake("a.db"));

        assert_eq!(registry.get_tables(&id).await.unwrap(), vec!["users"]);
        assert!(matches!(
            registry.get_columns(&id, "nope").await,
            Err(Error::Query(_))
        ));
        assert_eq!(
            registry.run_query(&id, "select 1").await.unwrap(),
            QueryResult::status("select 1")
        );
    }

    #[test]
    fn test_snapshot_in_open_order() {
        let mut registry = ConnectionRegistry::new();
        for name in ["c.db", "a.db", "b.db"] {
            registry.insert(DriverKind::Sqlite, file_params(name), fake(name));
        }
        registry.close_connection("sqlite-2");

        let files: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|spec| spec.params["file"].clone())
            .collect();
        assert_eq!(files, vec!["c.db", "b.db"]);

        let names: Vec<_> = registry.connections().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["c.db", "b.db"]);
    }
}
