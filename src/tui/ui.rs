//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};

use crate::view::{AttachState, Severity};

use super::app::{App, Pane};
use super::compose::{self, ComposeMode};
use super::help;
use super::log_pane::{self, LOG_PANE_HEIGHT};
use super::preview;
use super::roster::{self, ROSTER_WIDTH};
use super::feed;

/// Returns status indicator symbol and color based on connection state
fn status_indicator(connected: bool) -> (&'static str, Color) {
    if connected {
        ("*", Color::Green)
    } else {
        ("o", Color::Red)
    }
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let log_height = if app.log_pane.visible {
        LOG_PANE_HEIGHT.min(area.height / 2)
    } else {
        0
    };

    // Layout: header + main content + optional log pane + status bar
    let [header_area, main_area, log_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(log_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), app);

    // Split main area: feed + input on the left, roster on the right
    let [content_area, roster_area] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(ROSTER_WIDTH)])
            .areas(main_area);

    let (input, mode) = match &app.path_prompt {
        Some(prompt) => (prompt, ComposeMode::AttachPath),
        None => (&app.composer, ComposeMode::Message),
    };
    let [feed_area, compose_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(compose::height(input)),
    ])
    .areas(content_area);

    let screen = app.view.surface();
    feed::render(
        feed_area,
        frame.buffer_mut(),
        screen,
        app.active_pane == Pane::Feed,
    );
    compose::render(
        compose_area,
        frame,
        input,
        mode,
        app.active_pane == Pane::Compose || app.path_prompt.is_some(),
    );
    roster::render(
        roster_area,
        frame.buffer_mut(),
        &screen.roster,
        app.view.current_user(),
    );

    if log_height > 0 {
        log_pane::render(log_area, frame.buffer_mut(), &app.log_pane);
    }

    render_status(status_area, frame.buffer_mut(), app);

    if let Some(ref p) = screen.preview {
        let sending = matches!(app.view.attach_state(), AttachState::Sending(_));
        preview::render(frame, p, sending, app.view.uploads_in_flight());
    }

    // Help goes on top of everything else
    if app.show_help {
        help::render(frame);
    }
}

fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let screen = app.view.surface();
    let title = Line::from(vec![
        Span::styled(
            " chatroom ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.server_label.clone(), Style::default().fg(Color::Gray)),
    ]);

    let (symbol, color) = status_indicator(screen.connected);
    let state = if screen.connected { "connected" } else { "offline" };
    let right = Line::from(vec![
        Span::styled("[F1] Help ", Style::default().fg(Color::Gray)),
        Span::styled(format!(" {} {} ", symbol, state), Style::default().fg(color)),
        Span::styled(
            format!(" {} online ", screen.online_count),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!(" {} ", app.view.current_user()),
            Style::default().fg(Color::Cyan),
        ),
    ]);

    // Right-align the status part; the title is cut first on narrow terminals.
    let padding = area
        .width
        .saturating_sub((title.width() + right.width()) as u16) as usize;
    let mut spans = title.spans;
    spans.push(Span::raw(" ".repeat(padding)));
    spans.extend(right.spans);

    Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    if let Some(n) = app.view.surface().notification.current() {
        let color = match n.severity {
            Severity::Info => Color::Green,
            Severity::Error => Color::Red,
        };
        let line = Line::from(Span::styled(
            format!(" {} ", n.text),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        Paragraph::new(line)
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
        return;
    }

    let sep = Span::styled(" | ", Style::default().fg(Color::Gray));
    let pane = match app.active_pane {
        Pane::Feed => "feed",
        Pane::Compose => "input",
    };
    let hint = |s: &'static str| Span::styled(s, Style::default().fg(Color::Gray));

    let line = Line::from(vec![
        Span::styled(format!(" Tab: {} ", pane), Style::default().fg(Color::Cyan)),
        sep.clone(),
        hint("C-o: attach"),
        sep.clone(),
        hint("C-v: paste"),
        sep.clone(),
        hint("F1: help"),
        sep,
        hint("C-q: quit"),
    ]);

    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}
