//! Key binding reference, generated from the live key map.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Clear, Row, Table, TableState};
use ratatui::Frame;

use crate::config::Keymap;
use crate::operation::OperationRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpRow {
    pub keys: String,
    pub operation: &'static str,
    pub description: &'static str,
}

/// One row per registered operation, sorted by operation name.
pub fn help_rows(keymap: &Keymap, operations: &OperationRegistry) -> Vec<HelpRow> {
    operations
        .iter()
        .map(|op| HelpRow {
            keys: keymap.keys_for(op.name()).join(", "),
            operation: op.name(),
            description: op.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelpAction {
    Continue,
    Close,
}

pub struct HelpPopup {
    rows: Vec<HelpRow>,
    state: TableState,
}

impl HelpPopup {
    pub fn new(rows: Vec<HelpRow>) -> Self {
        Self {
            rows,
            state: TableState::default().with_selected(Some(0)),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> HelpAction {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('?') => {
                HelpAction::Close
            }
            KeyCode::Up => {
                self.state.select_previous();
                HelpAction::Continue
            }
            KeyCode::Down => {
                if self.state.selected().unwrap_or(0) + 1 < self.rows.len() {
                    self.state.select_next();
                }
                HelpAction::Continue
            }
            _ => HelpAction::Continue,
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let header = Row::new(["Key", "Operation", "Description"])
            .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan));

        let rows = self.rows.iter().map(|row| {
            Row::new([
                Cell::from(row.keys.clone()).style(Style::default().fg(Color::Yellow)),
                Cell::from(row.operation),
                Cell::from(row.description),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(18),
                Constraint::Length(18),
                Constraint::Min(20),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Help (Esc to close) "),
        )
        .row_highlight_style(Style::default().bg(Color::DarkGray));

        frame.render_widget(Clear, area);
        frame.render_stateful_widget(table, area, &mut self.state);
    }
}
