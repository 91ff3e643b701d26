//! Query tabs.
//!
//! Committed tabs live in `tabs`. When `index == tabs.len()` the user is typing into an
//! uncommitted trailing tab whose text sits in `pending`; it becomes a real tab only when
//! navigation leaves it with non-empty text.
//!
//! Wraparound: moving forward off the last committed tab enters the uncommitted slot, and
//! moving forward from an empty uncommitted slot wraps to tab 0. Moving backward never
//! enters the uncommitted slot; from tab 0 it wraps to the last committed tab.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted form of the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub tabs: Vec<String>,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWorkspace {
    tabs: Vec<String>,
    index: usize,
    pending: String,
}

impl Default for QueryWorkspace {
    fn default() -> Self {
        Self {
            tabs: vec![String::new()],
            index: 0,
            pending: String::new(),
        }
    }
}

impl QueryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_text(&self) -> &str {
        self.tabs.get(self.index).unwrap_or(&self.pending)
    }

    pub fn set_current_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        match self.tabs.get_mut(self.index) {
            Some(slot) => *slot = text,
            None => self.pending = text,
        }
    }

    /// Tabs as displayed, including the uncommitted slot when it is current.
    pub fn tabs(&self) -> Vec<&str> {
        let mut tabs: Vec<&str> = self.tabs.iter().map(String::as_str).collect();
        if self.at_pending() {
            tabs.push(&self.pending);
        }
        tabs
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of displayed tabs.
    pub fn len(&self) -> usize {
        self.tabs.len() + usize::from(self.at_pending())
    }

    /// Editor title, e.g. `Query 2/3`.
    pub fn title(&self) -> String {
        format!("Query {}/{}", self.index + 1, self.len())
    }

    pub fn next_tab(&mut self) {
        self.clamp();

        if self.at_pending() {
            if self.pending.is_empty() {
                self.index = 0;
            } else {
                self.commit_pending();
                self.index = self.tabs.len();
            }
        } else {
            self.index += 1;
        }

        debug!(index = self.index, tabs = self.len(), "next query tab");
    }

    pub fn prev_tab(&mut self) {
        self.clamp();

        if self.at_pending() {
            self.commit_pending();
        }

        self.index = match self.index.checked_sub(1) {
            Some(index) => index,
            None => self.tabs.len() - 1,
        };

        debug!(index = self.index, tabs = self.len(), "previous query tab");
    }

    /// Closes the current tab unless it is the only one. The previous tab becomes current.
    pub fn close_tab(&mut self) {
        self.clamp();

        if self.len() <= 1 {
            return;
        }

        if self.at_pending() {
            self.pending.clear();
        } else {
            self.tabs.remove(self.index);
        }
        self.index = self.index.saturating_sub(1);
    }

    /// `None` while the workspace is a single empty tab.
    pub fn snapshot(&self) -> Option<WorkspaceSnapshot> {
        let mut tabs = self.tabs.clone();
        if !self.pending.is_empty() {
            tabs.push(self.pending.clone());
        }

        if tabs.len() == 1 && tabs[0].is_empty() {
            return None;
        }

        Some(WorkspaceSnapshot {
            tabs,
            index: self.index,
        })
    }

    pub fn restore(&mut self, snapshot: WorkspaceSnapshot) {
        *self = Self::default();
        if snapshot.tabs.is_empty() {
            return;
        }

        self.tabs = snapshot.tabs;
        self.index = snapshot.index;
        self.clamp();
    }

    fn at_pending(&self) -> bool {
        self.index >= self.tabs.len()
    }

    fn commit_pending(&mut self) {
        if !self.pending.is_empty() {
            self.tabs.push(std::mem::take(&mut self.pending));
        }
    }

    fn clamp(&mut self) {
        if self.index > self.tabs.len() {
            self.index = self.tabs.len();
        }
    }
}
