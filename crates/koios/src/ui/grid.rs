use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::connector::QueryResult;

const MIN_COL_WIDTH: u16 = 3;
const MAX_COL_WIDTH: u16 = 40;
const PAGE: usize = 10;

/// Scrollable view over the last query result.
#[derive(Default)]
pub struct ResultGrid {
    result: Option<QueryResult>,
    widths: Vec<u16>,
    elapsed: Option<Duration>,
    state: TableState,
    col_offset: usize,
}

impl ResultGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_result(&mut self, result: QueryResult, elapsed: Duration) {
        self.widths = column_widths(&result);
        self.state = TableState::default();
        if !result.rows.is_empty() {
            self.state.select(Some(0));
        }
        self.col_offset = 0;
        self.elapsed = Some(elapsed);
        self.result = Some(result);
    }

    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    pub fn selected_row(&self) -> Option<usize> {
        self.state.selected()
    }

    pub fn col_offset(&self) -> usize {
        self.col_offset
    }

    /// e.g. `12 rows in 34 ms`
    pub fn summary(&self) -> Option<String> {
        let result = self.result.as_ref()?;
        let rows = result.rows.len();
        let noun = if rows == 1 { "row" } else { "rows" };
        Some(match self.elapsed {
            Some(elapsed) => format!("{rows} {noun} in {} ms", elapsed.as_millis()),
            None => format!("{rows} {noun}"),
        })
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let Some(result) = &self.result else {
            return;
        };
        let rows = result.rows.len();
        let cols = result.columns.len();
        let last = rows.saturating_sub(1);
        let current = self.state.selected().unwrap_or(0);

        let next = match key.code {
            KeyCode::Up => current.saturating_sub(1),
            KeyCode::Down => (current + 1).min(last),
            KeyCode::PageUp => current.saturating_sub(PAGE),
            KeyCode::PageDown => (current + PAGE).min(last),
            KeyCode::Home => 0,
            KeyCode::End => last,
            KeyCode::Left => {
                self.col_offset = self.col_offset.saturating_sub(1);
                current
            }
            KeyCode::Right => {
                self.col_offset = (self.col_offset + 1).min(cols.saturating_sub(1));
                current
            }
            _ => return,
        };

        if rows > 0 {
            self.state.select(Some(next));
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
        let border = if focused { Color::Cyan } else { Color::DarkGray };
        let mut block = Block::default()
            .borders(Borders::ALL)
            .title(" Result ")
            .border_style(Style::default().fg(border));
        if let Some(summary) = self.summary() {
            block = block.title_bottom(format!(" {summary} "));
        }

        let Some(result) = &self.result else {
            let empty = Paragraph::new("Run a query to see results")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(empty, area);
            return;
        };

        let visible = self.col_offset..result.columns.len();
        let widths: Vec<Constraint> = self.widths[visible.clone()]
            .iter()
            .map(|w| Constraint::Length(*w))
            .collect();

        let header = Row::new(
            result.columns[visible.clone()]
                .iter()
                .zip(&self.widths[visible.clone()])
                .map(|(name, w)| Cell::from(fit(name, *w))),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = result.rows.iter().map(|row| {
            Row::new(
                row.iter()
                    .skip(self.col_offset)
                    .zip(&self.widths[visible.clone()])
                    .map(|(value, w)| Cell::from(fit(value, *w))),
            )
        });

        let highlight = if focused {
            Style::default().bg(Color::DarkGray).fg(Color::White)
        } else {
            Style::default()
        };

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(1)
            .row_highlight_style(highlight)
            .highlight_symbol("> ");

        frame.render_stateful_widget(table, area, &mut self.state);
    }
}

fn column_widths(result: &QueryResult) -> Vec<u16> {
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.width()).collect();
    for row in &result.rows {
        for (w, value) in widths.iter_mut().zip(row) {
            *w = (*w).max(value.width());
        }
    }
    widths
        .into_iter()
        .map(|w| (w.min(usize::from(MAX_COL_WIDTH)) as u16).max(MIN_COL_WIDTH))
        .collect()
}

/// Truncates to `width` display columns, marking the cut with `...`.
fn fit(value: &str, width: u16) -> String {
    let width = usize::from(width);
    if value.width() <= width {
        return value.to_string();
    }

    let budget = width.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for ch in value.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    if width >= 3 {
        out.push_str("...");
    }
    out
}
