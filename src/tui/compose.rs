//! Compose box: multi-line message input, also used for the attach prompt.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::view::Composer;

/// What the box is currently editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    Message,
    /// Ctrl+O: typing the path of a file to attach.
    AttachPath,
}

impl ComposeMode {
    fn title(self) -> &'static str {
        match self {
            ComposeMode::Message => " Message ",
            ComposeMode::AttachPath => " Attach file (Enter: select, Esc: cancel) ",
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            ComposeMode::Message => "Type a message... (Enter: send, Shift+Enter: new line)",
            ComposeMode::AttachPath => "/path/to/file",
        }
    }
}

/// Rows the box needs for the given input, borders included.
pub fn height(composer: &Composer) -> u16 {
    composer.height() + 2
}

pub fn render(area: Rect, frame: &mut Frame, composer: &Composer, mode: ComposeMode, focused: bool) {
    let (border_style, border_type) = if mode == ComposeMode::AttachPath {
        (Style::default().fg(Color::Cyan), BorderType::Double)
    } else if focused {
        (Style::default().fg(Color::Yellow), BorderType::Double)
    } else {
        (Style::default().fg(Color::DarkGray), BorderType::Plain)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .title(Span::styled(mode.title(), border_style));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if composer.is_empty() {
        let hint = Line::from(Span::styled(
            mode.placeholder(),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ));
        frame.render_widget(Paragraph::new(hint), inner);
        if focused {
            frame.set_cursor_position((inner.x, inner.y));
        }
        return;
    }

    let view = Viewport::new(composer, inner.width as usize, inner.height as usize);
    let lines: Vec<Line> = composer
        .text()
        .split('\n')
        .skip(view.first_line)
        .take(inner.height as usize)
        .map(|l| Line::from(l.chars().skip(view.first_col).collect::<String>()))
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);

    if focused {
        frame.set_cursor_position((
            inner.x + view.cursor_col as u16,
            inner.y + view.cursor_line as u16,
        ));
    }
}

/// Which part of the text is visible so that the cursor always is.
#[derive(Debug, PartialEq, Eq)]
struct Viewport {
    first_line: usize,
    first_col: usize,
    /// Cursor position relative to the visible area.
    cursor_line: usize,
    cursor_col: usize,
}

impl Viewport {
    fn new(composer: &Composer, width: usize, rows: usize) -> Self {
        let (line, col) = composer.cursor_line_col();
        let first_line = line.saturating_sub(rows.saturating_sub(1));
        let first_col = (col + 1).saturating_sub(width);
        Self {
            first_line,
            first_col,
            cursor_line: line - first_line,
            cursor_col: col - first_col,
        }
    }
}
