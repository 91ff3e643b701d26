//! Add-database modal.
//!
//! Two stages: pick a driver, then fill in that driver's fields. Field definitions come
//! from [`DriverKind::fields`], so a new driver needs no changes here.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::connector::{ConnectParams, DriverKind, FieldKind, FormField};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    Continue,
    Cancel,
    Submit {
        driver: DriverKind,
        params: ConnectParams,
    },
}

enum Stage {
    ChooseDriver,
    Fields,
}

pub struct AddDbForm {
    stage: Stage,
    driver: usize,
    values: Vec<String>,
    focused: usize,
}

impl Default for AddDbForm {
    fn default() -> Self {
        Self::new()
    }
}

impl AddDbForm {
    pub fn new() -> Self {
        Self {
            stage: Stage::ChooseDriver,
            driver: 0,
            values: Vec::new(),
            focused: 0,
        }
    }

    pub fn driver(&self) -> DriverKind {
        DriverKind::ALL[self.driver]
    }

    fn fields(&self) -> &'static [FormField] {
        self.driver().fields()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match self.stage {
            Stage::ChooseDriver => self.handle_driver_key(key),
            Stage::Fields => self.handle_field_key(key),
        }
    }

    fn handle_driver_key(&mut self, key: KeyEvent) -> FormAction {
        let count = DriverKind::ALL.len();
        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Up | KeyCode::BackTab => self.driver = (self.driver + count - 1) % count,
            KeyCode::Down | KeyCode::Tab => self.driver = (self.driver + 1) % count,
            KeyCode::Enter => {
                self.values = self
                    .fields()
                    .iter()
                    .map(|f| match f.kind {
                        FieldKind::Choice(options) if f.default.is_empty() => {
                            options.first().copied().unwrap_or_default().to_string()
                        }
                        _ => f.default.to_string(),
                    })
                    .collect();
                self.focused = 0;
                self.stage = Stage::Fields;
            }
            _ => {}
        }
        FormAction::Continue
    }

    fn handle_field_key(&mut self, key: KeyEvent) -> FormAction {
        let count = self.values.len();
        if count == 0 {
            return FormAction::Cancel;
        }
        let field = self.fields()[self.focused];

        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => {
                let params = self
                    .fields()
                    .iter()
                    .zip(&self.values)
                    .filter_map(|(f, value)| {
                        let value = match f.kind {
                            FieldKind::Text => value.trim(),
                            FieldKind::Secret | FieldKind::Choice(_) => value.as_str(),
                        };
                        (!value.is_empty()).then(|| (f.key.to_string(), value.to_string()))
                    })
                    .collect();
                return FormAction::Submit {
                    driver: self.driver(),
                    params,
                };
            }
            KeyCode::Up | KeyCode::BackTab => self.focused = (self.focused + count - 1) % count,
            KeyCode::Down | KeyCode::Tab => self.focused = (self.focused + 1) % count,
            KeyCode::Left | KeyCode::Right => {
                if let FieldKind::Choice(options) = field.kind {
                    let value = &mut self.values[self.focused];
                    *value = cycle(options, value, key.code == KeyCode::Right).to_string();
                }
            }
            KeyCode::Backspace => {
                if !matches!(field.kind, FieldKind::Choice(_)) {
                    self.values[self.focused].pop();
                }
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                if !matches!(field.kind, FieldKind::Choice(_)) {
                    self.values[self.focused].push(c);
                }
            }
            _ => {}
        }
        FormAction::Continue
    }

    pub fn render(&self, frame: &mut Frame, screen: Rect) {
        let lines = match self.stage {
            Stage::ChooseDriver => self.driver_lines(),
            Stage::Fields => self.field_lines(),
        };

        let width = 60u16.min(screen.width.saturating_sub(4));
        let height = (lines.len() as u16 + 2).min(screen.height);
        let area = Rect::new(
            screen.x + screen.width.saturating_sub(width) / 2,
            screen.y + screen.height.saturating_sub(height) / 2,
            width,
            height,
        );

        let title = match self.stage {
            Stage::ChooseDriver => " Add database: driver ".to_string(),
            Stage::Fields => format!(" Add {} database ", self.driver()),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title)
            .title_bottom(" Enter confirm · Esc cancel ");

        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn driver_lines(&self) -> Vec<Line<'static>> {
        DriverKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                if i == self.driver {
                    Line::from(Span::styled(
                        format!("▶ {kind}"),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(format!("  {kind}"))
                }
            })
            .collect()
    }

    fn field_lines(&self) -> Vec<Line<'static>> {
        self.fields()
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(i, (field, value))| {
                let focused = i == self.focused;
                let shown = match field.kind {
                    FieldKind::Secret => "•".repeat(value.chars().count()),
                    FieldKind::Choice(_) => format!("◀ {value} ▶"),
                    FieldKind::Text => value.clone(),
                };
                let label_style = if focused {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                let cursor = if focused && !matches!(field.kind, FieldKind::Choice(_)) {
                    "▏"
                } else {
                    ""
                };
                Line::from(vec![
                    Span::styled(format!("{:>18}: ", field.label), label_style),
                    Span::raw(shown),
                    Span::styled(cursor, Style::default().fg(Color::Yellow)),
                ])
            })
            .collect()
    }

    #[cfg(test)]
    fn value(&self, key: &str) -> Option<&str> {
        self.fields()
            .iter()
            .position(|f| f.key == key)
            .map(|i| self.values[i].as_str())
    }
}

fn cycle<'a>(options: &[&'a str], current: &str, forward: bool) -> &'a str {
    let len = options.len();
    if len == 0 {
        return "";
    }
    let pos = options.iter().position(|o| *o == current).unwrap_or(0);
    let next = if forward {
        (pos + 1) % len
    } else {
        (pos + len - 1) % len
    };
    options[next]
}
