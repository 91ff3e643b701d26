//! Single-line path prompt used by the result download.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear};
use ratatui::Frame;
use tui_textarea::TextArea;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResult {
    Pending,
    Submitted(String),
    Cancelled,
}

pub struct PathPrompt {
    title: String,
    textarea: TextArea<'static>,
}

impl PathPrompt {
    pub fn new(title: impl Into<String>, initial: &str) -> Self {
        let mut textarea = TextArea::new(vec![initial.to_string()]);
        textarea.set_cursor_line_style(Style::default().add_modifier(Modifier::UNDERLINED));
        textarea.move_cursor(tui_textarea::CursorMove::End);
        Self {
            title: title.into(),
            textarea,
        }
    }

    pub fn value(&self) -> String {
        self.textarea.lines().concat()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PromptResult {
        match key.code {
            KeyCode::Esc => PromptResult::Cancelled,
            KeyCode::Enter => {
                let value = self.value().trim().to_string();
                if value.is_empty() {
                    PromptResult::Pending
                } else {
                    PromptResult::Submitted(value)
                }
            }
            // Single line: swallow anything that would split it.
            KeyCode::Char('m') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                PromptResult::Pending
            }
            _ => {
                self.textarea.input(key);
                PromptResult::Pending
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame, screen: Rect) {
        let height = 3u16.min(screen.height);
        let area = Rect {
            x: screen.x,
            y: screen.y + screen.height.saturating_sub(height),
            width: screen.width,
            height,
        };

        self.textarea.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} (Enter save, Esc cancel) ", self.title))
                .border_style(Style::default().fg(Color::Yellow)),
        );

        frame.render_widget(Clear, area);
        frame.render_widget(&self.textarea, area);
    }
}
