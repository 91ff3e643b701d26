//! Database tree: connections, their tables, and each table's columns.
//!
//! Tables and columns are fetched lazily the first time their parent is expanded. Tree
//! node identifiers are the connection id, then the table name, then the column name.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tui_tree_widget::{Tree, TreeItem, TreeState};

use crate::connector::Column;

/// Background work the tree needs after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeAction {
    LoadTables { id: String },
    LoadColumns { id: String, table: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Children<T> {
    Unloaded,
    Loading,
    Loaded(Vec<T>),
}

impl<T> Children<T> {
    fn start_loading(&mut self) -> bool {
        if matches!(self, Children::Unloaded) {
            *self = Children::Loading;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone)]
struct TableNode {
    name: String,
    columns: Children<Column>,
}

#[derive(Debug, Clone)]
struct DbNode {
    id: String,
    name: String,
    tables: Children<TableNode>,
}

#[derive(Default)]
pub struct DbTree {
    nodes: Vec<DbNode>,
    state: TreeState<String>,
}

impl DbTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_database(&mut self, id: &str, name: &str) {
        self.nodes.push(DbNode {
            id: id.to_string(),
            name: name.to_string(),
            tables: Children::Unloaded,
        });
        if self.state.selected().is_empty() {
            self.state.select(vec![id.to_string()]);
        }
    }

    pub fn remove_database(&mut self, id: &str) {
        self.nodes.retain(|node| node.id != id);
        self.state.close(&[id.to_string()]);
        if self.selected_database().is_none() {
            let first = self.nodes.first().map(|node| vec![node.id.clone()]);
            self.state.select(first.unwrap_or_default());
        }
    }

    /// Connection id of the selected node or of its ancestor.
    pub fn selected_database(&self) -> Option<&str> {
        let id = self.state.selected().first()?;
        self.nodes
            .iter()
            .find(|node| &node.id == id)
            .map(|node| node.id.as_str())
    }

    pub fn select_database(&mut self, id: &str) {
        self.state.select(vec![id.to_string()]);
    }

    pub fn database_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.id.as_str()).collect()
    }

    pub fn tables(&self, id: &str) -> Option<Vec<&str>> {
        match &self.node(id)?.tables {
            Children::Loaded(tables) => Some(tables.iter().map(|t| t.name.as_str()).collect()),
            _ => None,
        }
    }

    pub fn columns(&self, id: &str, table: &str) -> Option<&[Column]> {
        let Children::Loaded(tables) = &self.node(id)?.tables else {
            return None;
        };
        match &tables.iter().find(|t| t.name == table)?.columns {
            Children::Loaded(columns) => Some(columns),
            _ => None,
        }
    }

    pub fn set_tables(&mut self, id: &str, tables: Vec<String>) {
        if let Some(node) = self.node_mut(id) {
            node.tables = Children::Loaded(
                tables
                    .into_iter()
                    .map(|name| TableNode {
                        name,
                        columns: Children::Unloaded,
                    })
                    .collect(),
            );
        }
    }

    pub fn set_columns(&mut self, id: &str, table: &str, columns: Vec<Column>) {
        if let Some(table) = self.table_mut(id, table) {
            table.columns = Children::Loaded(columns);
        }
    }

    /// Forgets an in-flight table load so the next expansion retries it.
    pub fn tables_failed(&mut self, id: &str) {
        if let Some(node) = self.node_mut(id) {
            node.tables = Children::Unloaded;
        }
        self.state.close(&[id.to_string()]);
    }

    pub fn columns_failed(&mut self, id: &str, table: &str) {
        if let Some(node) = self.table_mut(id, table) {
            node.columns = Children::Unloaded;
        }
        self.state.close(&[id.to_string(), table.to_string()]);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<TreeAction> {
        match key.code {
            KeyCode::Up => {
                self.state.key_up();
                None
            }
            KeyCode::Down => {
                self.state.key_down();
                None
            }
            KeyCode::Left => {
                self.state.key_left();
                None
            }
            KeyCode::Right => {
                let action = self.expand_selected();
                self.state.key_right();
                action
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let action = self.expand_selected();
                self.state.toggle_selected();
                action
            }
            KeyCode::Home => {
                self.state.select_first();
                None
            }
            KeyCode::End => {
                self.state.select_last();
                None
            }
            _ => None,
        }
    }

    /// Marks the selected node as loading and returns the fetch it needs, if any.
    fn expand_selected(&mut self) -> Option<TreeAction> {
        let selected = self.state.selected().to_vec();
        match selected.as_slice() {
            [id] => {
                let node = self.node_mut(id)?;
                node.tables.start_loading().then(|| TreeAction::LoadTables {
                    id: id.clone(),
                })
            }
            [id, table] => {
                let node = self.table_mut(id, table)?;
                node.columns
                    .start_loading()
                    .then(|| TreeAction::LoadColumns {
                        id: id.clone(),
                        table: table.clone(),
                    })
            }
            _ => None,
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, current: Option<&str>, focused: bool) {
        let border = if focused { Color::Cyan } else { Color::DarkGray };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Databases ")
            .border_style(Style::default().fg(border));

        if self.nodes.is_empty() {
            let empty = Paragraph::new("No database open")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(empty, area);
            return;
        }

        let items = self.items(current);
        let highlight = if focused {
            Style::default().bg(Color::DarkGray).fg(Color::White)
        } else {
            Style::default().fg(Color::Yellow)
        };

        match Tree::new(&items) {
            Ok(tree) => {
                let tree = tree
                    .block(block)
                    .highlight_style(highlight)
                    .highlight_symbol("▶ ");
                frame.render_stateful_widget(tree, area, &mut self.state);
            }
            Err(err) => {
                let broken = Paragraph::new(format!("Cannot draw tree: {err}"))
                    .block(block)
                    .style(Style::default().fg(Color::Red));
                frame.render_widget(broken, area);
            }
        }
    }

    fn items(&self, current: Option<&str>) -> Vec<TreeItem<'static, String>> {
        self.nodes
            .iter()
            .map(|node| {
                let is_current = current == Some(node.id.as_str());
                let label = if is_current {
                    Line::from(vec![
                        Span::styled("● ", Style::default().fg(Color::Green)),
                        Span::styled(
                            node.name.clone(),
                            Style::default()
                                .fg(Color::Green)
                                .add_modifier(Modifier::BOLD),
                        ),
                    ])
                } else {
                    Line::from(format!("  {}", node.name))
                };

                let children = match &node.tables {
                    Children::Loaded(tables) => tables.iter().map(table_item).collect(),
                    other => vec![placeholder(other)],
                };
                tree_item(node.id.clone(), label, children)
            })
            .collect()
    }

    fn node(&self, id: &str) -> Option<&DbNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut DbNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    fn table_mut(&mut self, id: &str, table: &str) -> Option<&mut TableNode> {
        match &mut self.node_mut(id)?.tables {
            Children::Loaded(tables) => tables.iter_mut().find(|t| t.name == table),
            _ => None,
        }
    }
}

fn table_item(table: &TableNode) -> TreeItem<'static, String> {
    let children = match &table.columns {
        Children::Loaded(columns) => columns
            .iter()
            .map(|c| {
                TreeItem::new_leaf(
                    c.name.clone(),
                    Line::from(vec![
                        Span::raw(c.name.clone()),
                        Span::styled(
                            format!(" ({})", c.data_type),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]),
                )
            })
            .collect(),
        other => vec![placeholder(other)],
    };
    tree_item(table.name.clone(), Line::from(table.name.clone()), children)
}

fn placeholder<T>(state: &Children<T>) -> TreeItem<'static, String> {
    let text = match state {
        Children::Loading => "Loading...",
        _ => "...",
    };
    TreeItem::new_leaf(
        String::new(),
        Span::styled(text, Style::default().fg(Color::DarkGray)),
    )
}

/// Builds a branch, falling back to a leaf if the children have clashing identifiers.
fn tree_item(
    id: String,
    label: Line<'static>,
    children: Vec<TreeItem<'static, String>>,
) -> TreeItem<'static, String> {
    TreeItem::new(id.clone(), label.clone(), children)
        .unwrap_or_else(|_| TreeItem::new_leaf(id, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_expanding_database_loads_tables_once() {
        let mut tree = DbTree::new();
        tree.add_database("sqlite-1", "shop.db");
        assert_eq!(tree.selected_database(), Some("sqlite-1"));

        assert_eq!(
            tree.handle_key(key(KeyCode::Right)),
            Some(TreeAction::LoadTables {
                id: "sqlite-1".into()
            })
        );
        // Already loading.
        assert_eq!(tree.handle_key(key(KeyCode::Enter)), None);

        tree.set_tables("sqlite-1", vec!["orders".into(), "users".into()]);
        assert_eq!(tree.tables("sqlite-1"), Some(vec!["orders", "users"]));
    }

    #[test]
    fn test_expanding_table_loads_columns() {
        let mut tree = DbTree::new();
        tree.add_database("sqlite-1", "shop.db");
        tree.set_tables("sqlite-1", vec!["users".into()]);
        tree.state.select(vec!["sqlite-1".into(), "users".into()]);

        assert_eq!(
            tree.handle_key(key(KeyCode::Right)),
            Some(TreeAction::LoadColumns {
                id: "sqlite-1".into(),
                table: "users".into()
            })
        );

        tree.set_columns(
            "sqlite-1",
            "users",
            vec![Column::new("id", "INTEGER"), Column::new("name", "TEXT")],
        );
        let columns = tree.columns("sqlite-1", "users").unwrap();
        assert_eq!(columns[1], Column::new("name", "TEXT"));
        assert_eq!(tree.selected_database(), Some("sqlite-1"));
    }

    #[test]
    fn test_failed_load_can_be_retried() {
        let mut tree = DbTree::new();
        tree.add_database("sqlite-1", "shop.db");
        assert!(tree.handle_key(key(KeyCode::Right)).is_some());

        tree.tables_failed("sqlite-1");
        assert_eq!(tree.tables("sqlite-1"), None);
        assert!(tree.handle_key(key(KeyCode::Right)).is_some());
    }

    #[test]
    fn test_remove_selected_database_selects_first() {
        let mut tree = DbTree::new();
        tree.add_database("sqlite-1", "a.db");
        tree.add_database("sqlite-2", "b.db");
        tree.add_database("sqlite-3", "c.db");
        tree.select_database("sqlite-2");

        tree.remove_database("sqlite-2");
        assert_eq!(tree.database_ids(), vec!["sqlite-1", "sqlite-3"]);
        assert_eq!(tree.selected_database(), Some("sqlite-1"));

        tree.remove_database("sqlite-1");
        tree.remove_database("sqlite-3");
        assert_eq!(tree.selected_database(), None);
    }

    #[test]
    fn test_items_build_for_every_state() {
        let mut tree = DbTree::new();
        tree.add_database("sqlite-1", "a.db");
        tree.add_database("postgres-2", "localhost/app");
        tree.set_tables("postgres-2", vec!["users".into()]);
        tree.set_columns("postgres-2", "users", vec![Column::new("id", "integer")]);

        let items = tree.items(Some("postgres-2"));
        assert_eq!(items.len(), 2);
        assert!(Tree::new(&items).is_ok());
    }
}
