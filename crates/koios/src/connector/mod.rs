//! Uniform access to the supported database drivers.
//!
//! Every driver kind supplies the same pieces: a rule turning connect parameters into a
//! connection target, a display name rule, the fields of the add-database form, and a
//! [`Connector`] implementation that owns one live connection.

mod athena;
mod postgres;
mod sqlite;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

pub use athena::AthenaConnector;
pub use postgres::PostgresConnector;
pub use sqlite::SqliteConnector;

use crate::error::{Error, Result};

/// Driver-specific connect parameters, keyed by parameter name.
pub type ConnectParams = BTreeMap<String, String>;

/// A column as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Result of running arbitrary query text. Every cell is already rendered to a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    /// Single `status` column used for statements that return no rows.
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            columns: vec!["status".to_string()],
            rows: vec![vec![message.into()]],
        }
    }
}

/// One open database connection.
///
/// Implementations are shared between the presentation thread and background tasks, so
/// they must be `Send + Sync`. Concurrent calls on the same connector are allowed; the
/// driver decides whether they run in parallel or queue up.
#[async_trait]
pub trait Connector: Send + Sync {
    fn driver(&self) -> DriverKind;

    /// Name shown in the database tree. Never used for identity.
    fn display_name(&self) -> &str;

    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns of `table` in schema order. Unknown tables are an error.
    async fn list_columns(&self, table: &str) -> Result<Vec<Column>>;

    async fn run_query(&self, text: &str) -> Result<QueryResult>;
}

/// The closed set of supported drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DriverKind {
    Sqlite,
    Postgres,
    Athena,
}

impl DriverKind {
    pub const ALL: [DriverKind; 3] = [DriverKind::Sqlite, DriverKind::Postgres, DriverKind::Athena];

    pub fn name(&self) -> &'static str {
        match self {
            DriverKind::Sqlite => "sqlite",
            DriverKind::Postgres => "postgres",
            DriverKind::Athena => "athena",
        }
    }

    /// Builds the driver's connection target from the connect parameters.
    pub fn target(&self, params: &ConnectParams) -> Result<String> {
        match self {
            DriverKind::Sqlite => sqlite::target(params),
            DriverKind::Postgres => postgres::target(params),
            DriverKind::Athena => Ok(athena::target(params)),
        }
    }

    pub fn display_name(&self, params: &ConnectParams) -> String {
        match self {
            DriverKind::Sqlite => sqlite::display_name(params),
            DriverKind::Postgres => postgres::display_name(params),
            DriverKind::Athena => athena::display_name(params),
        }
    }

    /// Fields of the add-database form, in display order.
    pub fn fields(&self) -> &'static [FormField] {
        match self {
            DriverKind::Sqlite => sqlite::FIELDS,
            DriverKind::Postgres => postgres::FIELDS,
            DriverKind::Athena => athena::FIELDS,
        }
    }

    /// Opens a connection. Fails without side effects if the target cannot be built or
    /// the resource cannot be reached.
    pub async fn open(self, params: &ConnectParams) -> Result<Arc<dyn Connector>> {
        let target = self.target(params)?;
        let name = self.display_name(params);

        let connector: Arc<dyn Connector> = match self {
            DriverKind::Sqlite => Arc::new(SqliteConnector::open(&target, name).await?),
            DriverKind::Postgres => {
                Arc::new(PostgresConnector::open(&target, params, name).await?)
            }
            DriverKind::Athena => Arc::new(AthenaConnector::open(params, name).await?),
        };

        Ok(connector)
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DriverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DriverKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnsupportedDriver(s.to_string()))
    }
}

/// How a form field is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Rendered masked.
    Secret,
    /// One of a fixed set of values; the first is the default.
    Choice(&'static [&'static str]),
}

/// One input of the add-database form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    /// Connect parameter key the value is stored under.
    pub key: &'static str,
    pub label: &'static str,
    pub default: &'static str,
    pub kind: FieldKind,
}

/// Returns the parameter value, or "" when missing.
fn param<'a>(params: &'a ConnectParams, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or("")
}

/// Returns the parameter value, or `default` when missing or empty.
fn param_or<'a>(params: &'a ConnectParams, key: &str, default: &'a str) -> &'a str {
    match param(params, key).trim() {
        "" => default,
        value => value,
    }
}
