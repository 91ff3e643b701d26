//! Messages from background tasks to the presentation loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::connector::{Column, ConnectParams, Connector, DriverKind, QueryResult};
use crate::error::Result;

/// The result of one background operation, applied on the presentation thread.
pub enum Update {
    ConnectionOpened {
        driver: DriverKind,
        params: ConnectParams,
        result: Result<Arc<dyn Connector>>,
    },
    TablesLoaded {
        id: String,
        result: Result<Vec<String>>,
    },
    ColumnsLoaded {
        id: String,
        table: String,
        result: Result<Vec<Column>>,
    },
    QueryFinished {
        id: String,
        result: Result<QueryResult>,
        elapsed: Duration,
    },
    /// Posted once per background operation, after its result.
    ActivityStopped,
}

impl Update {
    pub fn name(&self) -> &'static str {
        match self {
            Update::ConnectionOpened { .. } => "connection-opened",
            Update::TablesLoaded { .. } => "tables-loaded",
            Update::ColumnsLoaded { .. } => "columns-loaded",
            Update::QueryFinished { .. } => "query-finished",
            Update::ActivityStopped => "activity-stopped",
        }
    }
}

/// Held by a background task for its whole body. Dropping it posts
/// [`Update::ActivityStopped`], whether the task finished, failed or panicked.
pub struct ActivityGuard {
    tx: UnboundedSender<Update>,
}

impl ActivityGuard {
    pub(crate) fn new(tx: UnboundedSender<Update>) -> Self {
        Self { tx }
    }

    /// Posts the operation's result. The stop message follows when the guard drops.
    pub fn send(&self, update: Update) {
        let _ = self.tx.send(update);
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(Update::ActivityStopped);
    }
}
