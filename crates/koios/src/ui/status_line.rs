//! Bottom status line.
//!
//! Segments are dropped lowest priority first when the terminal is too narrow. Right
//! aligned segments are always kept.

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use throbber_widgets_tui::{Throbber, ThrobberState, BRAILLE_SIX};
use unicode_width::UnicodeWidthStr;

/// Lower sorts first and is dropped last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Critical,
    High,
    Low,
}

#[derive(Debug, Clone)]
pub struct Segment {
    span: Span<'static>,
    priority: Priority,
    right: bool,
}

impl Segment {
    pub fn new(text: impl Into<String>, priority: Priority) -> Self {
        Self {
            span: Span::raw(text.into()),
            priority,
            right: false,
        }
    }

    pub fn from_span(span: Span<'static>, priority: Priority) -> Self {
        Self {
            span,
            priority,
            right: false,
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.span = self.span.style(style);
        self
    }

    pub fn right(mut self) -> Self {
        self.right = true;
        self
    }

    fn width(&self) -> usize {
        self.span.content.width()
    }
}

pub struct StatusLine {
    segments: Vec<Segment>,
    separator: Span<'static>,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLine {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            separator: Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        }
    }

    pub fn push(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn push_if(self, condition: bool, segment: impl FnOnce() -> Segment) -> Self {
        if condition {
            self.push(segment())
        } else {
            self
        }
    }

    /// Lays the segments out in `width` columns, keeping declaration order.
    pub fn build(self, width: u16) -> Line<'static> {
        let width = usize::from(width);
        let sep_width = self.separator.content.width();

        let (right, left): (Vec<Segment>, Vec<Segment>) =
            self.segments.into_iter().partition(|s| s.right);

        let right_width: usize = right.iter().map(Segment::width).sum::<usize>()
            + sep_width * right.len().saturating_sub(1);
        let mut budget = width.saturating_sub(right_width);

        // Admit left segments by priority, then emit them in their original order.
        let mut order: Vec<usize> = (0..left.len()).collect();
        order.sort_by_key(|&i| left[i].priority);
        let mut keep = vec![false; left.len()];
        let mut kept = 0usize;
        for i in order {
            let gap = if kept == 0 && right.is_empty() { 0 } else { sep_width };
            let needed = left[i].width() + gap;
            if needed <= budget {
                budget -= needed;
                keep[i] = true;
                kept += 1;
            }
        }

        let mut spans: Vec<Span<'static>> = Vec::new();
        for (segment, _) in left.into_iter().zip(keep).filter(|(_, k)| *k) {
            if !spans.is_empty() {
                spans.push(self.separator.clone());
            }
            spans.push(segment.span);
        }

        if !right.is_empty() {
            let used: usize = spans.iter().map(|s| s.content.width()).sum();
            let gap = width.saturating_sub(used + right_width);
            if gap > 0 {
                spans.push(Span::raw(" ".repeat(gap)));
            }
            for (i, segment) in right.into_iter().enumerate() {
                if i > 0 {
                    spans.push(self.separator.clone());
                }
                spans.push(segment.span);
            }
        }

        Line::from(spans)
    }
}

/// Spinner shown while background work is in flight.
pub fn activity_span(state: &ThrobberState, in_flight: usize) -> Span<'static> {
    let label = if in_flight > 1 {
        format!("Working ({in_flight})")
    } else {
        "Working".to_string()
    };

    let style = Style::default().fg(Color::Yellow);
    let symbol = Throbber::default()
        .style(style)
        .throbber_set(BRAILLE_SIX)
        .to_symbol_span(state);

    Span::styled(format!("{}{label}", symbol.content), style)
}
