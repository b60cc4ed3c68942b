//! Help popup (F1): keyboard shortcuts.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const KEY_COLUMN: usize = 16;

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "MESSAGES",
        &[
            ("Enter", "Send message"),
            ("Shift/Alt+Enter", "New line"),
            ("Ctrl+U", "Clear input"),
            ("Ctrl+V", "Paste (images are attached)"),
        ],
    ),
    (
        "FILES",
        &[
            ("Ctrl+O", "Attach a file by path"),
            ("Enter", "Send attached file (preview)"),
            ("Esc", "Discard attached file"),
            ("d", "Download selected file"),
        ],
    ),
    (
        "NAVIGATION",
        &[
            ("Tab", "Switch feed / input"),
            ("Up/Down", "Select message (feed)"),
            ("PgUp/PgDn", "Scroll feed"),
            ("End", "Jump to newest (feed)"),
        ],
    ),
    (
        "OTHER",
        &[
            ("F1", "Toggle this help"),
            ("F12", "Toggle log pane"),
            ("Ctrl+C, Ctrl+Q", "Quit"),
        ],
    ),
];

pub fn render(frame: &mut Frame) {
    let lines = help_lines();
    let area = frame.area();
    let width = 52.min(area.width.saturating_sub(2));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let popup = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Help ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(Span::styled(
            " any key to close ",
            Style::default().fg(Color::Gray),
        )));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn help_lines() -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, (title, keys)) in SECTIONS.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            format!(" {}", title),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )));
        for (key, desc) in keys.iter() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("   {:<width$}", key, width = KEY_COLUMN),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(*desc, Style::default().fg(Color::Gray)),
            ]));
        }
    }
    lines
}
