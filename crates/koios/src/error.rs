//! Error taxonomy shared by connectors, the connection registry and the key map.

use thiserror::Error;

/// Errors raised by the session engine.
///
/// Everything except [`Error::UnknownOperation`] is recoverable: the controller turns it
/// into a dismissible notification and keeps running.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The driver could not open the resource described by the connect parameters.
    #[error("cannot connect to {driver} database: {message}")]
    Connect { driver: String, message: String },

    /// The driver kind is not one of the supported drivers.
    #[error("unsupported driver: {0:?}")]
    UnsupportedDriver(String),

    /// The connection id has no live connection.
    #[error("database is not open: {0}")]
    NotOpen(String),

    /// Introspection or query execution failed.
    #[error("{0}")]
    Query(String),

    /// A key binding names an operation that does not exist.
    #[error("{key:?}: unknown operation {operation:?}")]
    UnknownOperation { key: String, operation: String },
}

impl Error {
    pub fn connect(driver: impl Into<String>, message: impl ToString) -> Self {
        Self::Connect {
            driver: driver.into(),
            message: message.to_string(),
        }
    }

    pub fn query(message: impl ToString) -> Self {
        Self::Query(message.to_string())
    }

    /// True for failures the user caused by pointing at something that isn't there.
    pub fn is_not_open(&self) -> bool {
        matches!(self, Self::NotOpen(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
