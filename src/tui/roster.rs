//! Roster pane: who is online.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::models::PresenceEntry;

/// Width of the roster column.
pub const ROSTER_WIDTH: u16 = 24;

pub fn render(area: Rect, buf: &mut Buffer, users: &[PresenceEntry], current_user: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" Online ({}) ", users.len()),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    block.render(area, buf);

    for (row, user) in users.iter().take(inner.height as usize).enumerate() {
        let row_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        render_user(buf, row_area, user, user.username == current_user);
    }
}

/// `[A] alice       admin`
fn render_user(buf: &mut Buffer, area: Rect, user: &PresenceEntry, is_self: bool) {
    let width = area.width as usize;
    if width == 0 {
        return;
    }

    let avatar = format!("[{}] ", user.initial());
    let badge = if user.is_admin { "admin" } else { "" };

    let name_style = if is_self {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let max_name = width
        .saturating_sub(avatar.chars().count())
        .saturating_sub(if badge.is_empty() { 0 } else { badge.len() + 1 });
    let name: String = user.username.chars().take(max_name).collect();
    let pad = width
        .saturating_sub(avatar.chars().count())
        .saturating_sub(name.chars().count())
        .saturating_sub(badge.len());

    let line = Line::from(vec![
        Span::styled(avatar, Style::default().fg(Color::Yellow)),
        Span::styled(name, name_style),
        Span::raw(" ".repeat(pad)),
        Span::styled(badge, Style::default().fg(Color::Magenta)),
    ]);
    Paragraph::new(line).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    #[test]
    fn test_render_rows() {
        let users = vec![
            PresenceEntry {
                username: "alice".to_string(),
                is_admin: false,
            },
            PresenceEntry {
                username: "root".to_string(),
                is_admin: true,
            },
        ];
        let area = Rect::new(0, 0, ROSTER_WIDTH, 6);
        let mut buf = Buffer::empty(area);
        render(area, &mut buf, &users, "alice");

        assert!(row_text(&buf, 0).contains("Online (2)"));
        assert!(row_text(&buf, 1).contains("[A] alice"));
        let admin_row = row_text(&buf, 2);
        assert!(admin_row.contains("[R] root"));
        assert!(admin_row.trim_end_matches('│').trim_end().ends_with("admin"));
    }
}
