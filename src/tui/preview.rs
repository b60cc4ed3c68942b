//! Upload preview modal.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

use super::screen::Preview;

/// Shown instead of a thumbnail for non-images.
const FILE_ICON: [&str; 5] = [
    "+------.  ",
    "|       \\ ",
    "|  FILE  |",
    "|        |",
    "+--------+",
];

/// `sending` is set while the shown file is being uploaded; `in_flight`
/// counts every unanswered upload, including replaced selections.
pub fn render(frame: &mut Frame, preview: &Preview, sending: bool, in_flight: usize) {
    let mut lines: Vec<Line<'static>> = match (&preview.thumbnail, preview.is_image) {
        (Some(thumb), _) => thumb.lines(),
        (None, true) => vec![Line::from(Span::styled(
            "[image preview unavailable]",
            Style::default().fg(Color::DarkGray),
        ))],
        (None, false) => FILE_ICON
            .iter()
            .map(|l| Line::from(Span::styled(*l, Style::default().fg(Color::Gray))))
            .collect(),
    };

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        preview.name.clone(),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        preview.size_label.clone(),
        Style::default().fg(Color::Gray),
    )));
    lines.push(Line::from(""));
    if sending {
        let label = if in_flight > 1 {
            format!("Sending... ({} uploads in flight)", in_flight)
        } else {
            "Sending...".to_string()
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(": send   "),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(": cancel"),
    ]));

    let area = frame.area();
    let content_width = lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
    let width = (content_width + 4).max(30).min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Send file? ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block),
        popup,
    );
}
