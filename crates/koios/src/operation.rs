//! Named operations that key bindings can trigger.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Every operation the session controller implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Quit,
    GotoQueryInput,
    GotoTree,
    GotoResult,
    SetCurrentDb,
    AddDb,
    ExecQuery,
    ShowHelp,
    NextQueryTab,
    PrevQueryTab,
    CloseTab,
    CloseDb,
    DownloadResult,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::Quit,
        Operation::GotoQueryInput,
        Operation::GotoTree,
        Operation::GotoResult,
        Operation::SetCurrentDb,
        Operation::AddDb,
        Operation::ExecQuery,
        Operation::ShowHelp,
        Operation::NextQueryTab,
        Operation::PrevQueryTab,
        Operation::CloseTab,
        Operation::CloseDb,
        Operation::DownloadResult,
    ];

    /// Name used in key binding configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Quit => "quit",
            Operation::GotoQueryInput => "goto-queryinput",
            Operation::GotoTree => "goto-tree",
            Operation::GotoResult => "goto-result",
            Operation::SetCurrentDb => "set-current-db",
            Operation::AddDb => "add-db",
            Operation::ExecQuery => "exec-query",
            Operation::ShowHelp => "show-help",
            Operation::NextQueryTab => "next-query-tab",
            Operation::PrevQueryTab => "prev-query-tab",
            Operation::CloseTab => "close-tab",
            Operation::CloseDb => "close-db",
            Operation::DownloadResult => "download-result",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operation::Quit => "Quit koios",
            Operation::GotoQueryInput => "Move focus to the query input",
            Operation::GotoTree => "Move focus to the database tree",
            Operation::GotoResult => "Move focus to the query result",
            Operation::SetCurrentDb => "Use the database selected in the tree for queries",
            Operation::AddDb => "Open a new database connection",
            Operation::ExecQuery => "Execute the query in the current tab",
            Operation::ShowHelp => "Show key bindings",
            Operation::NextQueryTab => "Go to the next query tab",
            Operation::PrevQueryTab => "Go to the previous query tab",
            Operation::CloseTab => "Close the current query tab",
            Operation::CloseDb => "Close the database selected in the tree",
            Operation::DownloadResult => "Save the last query result as CSV",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("Unknown operation: {}", s))
    }
}

/// The operations available to key bindings, by name.
///
/// Built once at startup and handed to the key map for validation and to the
/// controller for dispatch.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    operations: BTreeMap<&'static str, Operation>,
}

impl OperationRegistry {
    /// Registry holding every implemented operation.
    pub fn new() -> Self {
        Self::with_operations(Operation::ALL)
    }

    pub fn with_operations(operations: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            operations: operations.into_iter().map(|op| (op.name(), op)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Operation> {
        self.operations.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Operations sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = Operation> + '_ {
        self.operations.values().copied()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
