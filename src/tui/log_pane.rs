//! Log pane (F12): recent tracing output inside the TUI.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use super::log_capture::LogBuffer;

/// Scrollback kept for display.
const MAX_LINES: usize = 1000;

/// Rows the pane takes when open.
pub const LOG_PANE_HEIGHT: u16 = 10;

pub struct LogPane {
    source: LogBuffer,
    lines: Vec<String>,
    pub visible: bool,
    /// Lines scrolled up from the newest.
    scroll: usize,
}

impl LogPane {
    pub fn new(source: LogBuffer) -> Self {
        Self {
            source,
            lines: Vec::new(),
            visible: false,
            scroll: 0,
        }
    }

    /// Pull new lines from the capture buffer. Runs every loop iteration,
    /// visible or not, so the buffer never fills up.
    pub fn refresh(&mut self) {
        let fresh = self.source.drain();
        if fresh.is_empty() {
            return;
        }
        self.lines.extend(fresh);
        if self.lines.len() > MAX_LINES {
            let excess = self.lines.len() - MAX_LINES;
            self.lines.drain(..excess);
        }
        self.scroll = self.scroll.min(self.lines.len().saturating_sub(1));
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        if self.visible {
            self.scroll = 0;
        }
    }

    pub fn scroll_up(&mut self, n: usize) {
        let max = self.lines.len().saturating_sub(1);
        self.scroll = (self.scroll + n).min(max);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lines.len()
    }
}

pub fn render(area: Rect, buf: &mut Buffer, pane: &LogPane) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Log (F12) ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    block.render(area, buf);
    if inner.height == 0 {
        return;
    }

    let end = pane.lines.len().saturating_sub(pane.scroll);
    let start = end.saturating_sub(inner.height as usize);
    let lines: Vec<Line> = pane.lines[start..end]
        .iter()
        .map(|l| Line::from(Span::styled(l.clone(), level_style(l))))
        .collect();

    Paragraph::new(lines).render(inner, buf);
}

/// Color by the level word the fmt layer prints.
fn level_style(line: &str) -> Style {
    let level = line
        .split_whitespace()
        .find(|w| matches!(*w, "ERROR" | "WARN" | "INFO" | "DEBUG" | "TRACE"));
    let color = match level {
        Some("ERROR") => Color::Red,
        Some("WARN") => Color::Yellow,
        Some("INFO") => Color::Green,
        Some(_) => Color::DarkGray,
        None => Color::Gray,
    };
    Style::default().fg(color)
}
