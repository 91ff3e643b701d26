mod editor;
mod form;
mod grid;
mod help_popup;
mod prompt;
mod status_line;
mod tree;

pub use editor::QueryEditor;
pub use form::{AddDbForm, FormAction};
pub use grid::ResultGrid;
pub use help_popup::{help_rows, HelpAction, HelpPopup, HelpRow};
pub use prompt::{PathPrompt, PromptResult};
pub use status_line::{activity_span, Priority, Segment, StatusLine};
pub use tree::{DbTree, TreeAction};

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

/// A `percent_x` by `percent_y` rectangle centered in `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}

/// Modal error notification; the caller dismisses it on Enter or Esc.
pub fn render_error(frame: &mut Frame, message: &str) {
    let area = centered_rect(60, 30, frame.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Error ")
        .title_bottom(" Enter / Esc to dismiss ")
        .border_style(Style::default().fg(Color::Red));

    let text = Paragraph::new(message.to_string())
        .block(block)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(text, area);
}
