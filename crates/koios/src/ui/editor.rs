use crossterm::event::KeyEvent;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;
use tui_textarea::TextArea;

/// Multi-line input holding the text of the current query tab.
pub struct QueryEditor {
    textarea: TextArea<'static>,
}

impl QueryEditor {
    pub fn new() -> Self {
        Self {
            textarea: new_textarea(Vec::new()),
        }
    }

    pub fn text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    /// Replaces the buffer, e.g. when switching tabs. Undo history is dropped.
    pub fn set_text(&mut self, text: &str) {
        self.textarea = new_textarea(text.lines().map(str::to_string).collect());
    }

    /// Returns true if the text changed.
    pub fn input(&mut self, key: KeyEvent) -> bool {
        self.textarea.input(key)
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, title: &str, focused: bool) {
        let border = if focused { Color::Green } else { Color::DarkGray };
        self.textarea.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {title} "))
                .border_style(Style::default().fg(border)),
        );
        let cursor = if focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        self.textarea.set_cursor_style(cursor);
        frame.render_widget(&self.textarea, area);
    }
}

impl Default for QueryEditor {
    fn default() -> Self {
        Self::new()
    }
}

fn new_textarea(lines: Vec<String>) -> TextArea<'static> {
    let mut textarea = if lines.is_empty() {
        TextArea::default()
    } else {
        TextArea::new(lines)
    };
    textarea.set_cursor_line_style(Style::default());
    textarea.set_placeholder_text("Type a query and press Ctrl+Space");
    textarea
}
