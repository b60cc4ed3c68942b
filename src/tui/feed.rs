//! Feed pane: message cards, system lines and inline images.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::view::{EntryBody, FeedEntry, HeaderOrder, MessageEntry};

use super::screen::{InlineImage, Screen};

/// Own messages are shifted right by this many columns.
const SELF_INDENT: usize = 4;

/// Narrowest card content worth drawing.
const MIN_CONTENT_WIDTH: usize = 8;

pub fn render(area: Rect, buf: &mut Buffer, screen: &Screen, focused: bool) {
    let (border_style, border_type) = if focused {
        (Style::default().fg(Color::Yellow), BorderType::Double)
    } else {
        (Style::default().fg(Color::DarkGray), BorderType::Plain)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .title(Span::styled(
            " Chat ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 || screen.feed.is_empty() {
        return;
    }

    let height = inner.height as usize;
    let width = inner.width as usize;
    let feed = &screen.feed;
    let newest_shown = feed.len() - 1 - feed.scroll_from_bottom();

    // Walk back from the newest visible entry until the pane is full.
    let mut blocks: Vec<Vec<Line<'static>>> = Vec::new();
    let mut total = 0;
    let mut oldest_shown = newest_shown;
    for idx in (0..=newest_shown).rev() {
        let lines = entry_lines(
            &feed.entries()[idx],
            screen.image(idx),
            width,
            feed.selected() == Some(idx),
        );
        total += lines.len();
        blocks.push(lines);
        oldest_shown = idx;
        if total >= height {
            break;
        }
    }

    let mut lines: Vec<Line<'static>> = blocks.into_iter().rev().flatten().collect();
    let cropped = lines.len() > height;
    if cropped {
        lines.drain(..lines.len() - height);
    }
    Paragraph::new(lines).render(inner, buf);

    let indicator_x = inner.x + inner.width.saturating_sub(1);
    let indicator = Style::default().fg(Color::DarkGray);
    if cropped || oldest_shown > 0 {
        buf[(indicator_x, inner.y)].set_char('^').set_style(indicator);
    }
    if !feed.is_at_bottom() {
        let bottom = inner.y + inner.height - 1;
        buf[(indicator_x, bottom)].set_char('v').set_style(indicator);
    }
}

/// Lines for one feed entry, including the blank separator after cards.
fn entry_lines(
    entry: &FeedEntry,
    image: Option<&InlineImage>,
    width: usize,
    selected: bool,
) -> Vec<Line<'static>> {
    match entry {
        FeedEntry::System(text) => system_lines(text, width, selected),
        FeedEntry::Message(msg) => {
            let card_width = width.saturating_sub(SELF_INDENT);
            if card_width < MIN_CONTENT_WIDTH + 4 {
                // Too narrow for a card.
                return vec![Line::from(truncate(&entry.to_string(), width))];
            }
            let mut lines = Card::new(msg, card_width, selected).lines(image);
            lines.push(Line::from(""));
            lines
        }
    }
}

fn system_lines(text: &str, width: usize, selected: bool) -> Vec<Line<'static>> {
    let mut style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC);
    if selected {
        style = style.fg(Color::Yellow);
    }

    let mut lines: Vec<Line<'static>> = wrap_text(text, width.saturating_sub(4))
        .into_iter()
        .map(|l| Line::from(Span::styled(center(&l, width), style)))
        .collect();
    lines.push(Line::from(""));
    lines
}

/// A bordered message card.
struct Card<'a> {
    msg: &'a MessageEntry,
    indent: String,
    width: usize,
    border: Style,
}

impl<'a> Card<'a> {
    fn new(msg: &'a MessageEntry, width: usize, selected: bool) -> Self {
        let border = if selected {
            Style::default().fg(Color::Yellow)
        } else if msg.is_self {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        let indent = if msg.is_self {
            " ".repeat(SELF_INDENT)
        } else {
            String::new()
        };
        Self {
            msg,
            indent,
            width,
            border,
        }
    }

    fn content_width(&self) -> usize {
        self.width - 4
    }

    fn lines(&self, image: Option<&InlineImage>) -> Vec<Line<'static>> {
        let mut lines = vec![self.top_border()];

        match &self.msg.body {
            EntryBody::Text(text) => {
                for l in wrap_text(text, self.content_width()) {
                    lines.push(self.row(vec![Span::raw(l)]));
                }
            }
            EntryBody::Image(file) => {
                let caption = Style::default().fg(Color::Cyan);
                match image {
                    Some(InlineImage::Ready(thumb)) => {
                        for l in thumb.lines() {
                            lines.push(self.row(l.spans));
                        }
                        lines.push(self.row(vec![Span::styled(
                            format!("[image] {}", file.filename),
                            caption.add_modifier(Modifier::DIM),
                        )]));
                    }
                    Some(InlineImage::Failed) => lines.push(self.row(vec![Span::styled(
                        format!("[image] {} (preview unavailable)", file.filename),
                        caption,
                    )])),
                    Some(InlineImage::Loading) | None => lines.push(self.row(vec![Span::styled(
                        format!("[image] {} (loading...)", file.filename),
                        caption,
                    )])),
                }
            }
            EntryBody::File { file, size_label } => {
                lines.push(self.row(vec![
                    Span::styled(
                        format!("[file] {}", file.filename),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled(format!("  {}", size_label), Style::default().fg(Color::Gray)),
                ]));
                lines.push(self.row(vec![Span::styled(
                    "d: download",
                    Style::default().fg(Color::DarkGray),
                )]));
            }
        }

        lines.push(Line::from(Span::styled(
            format!("{}+{}+", self.indent, "-".repeat(self.width - 2)),
            self.border,
        )));
        lines
    }

    /// `+- name [admin]  time ------+` or `+- time  name ---+` for own messages.
    fn top_border(&self) -> Line<'static> {
        let name_style = if self.msg.is_admin {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        };
        let time_style = Style::default().fg(Color::DarkGray);

        let mut header = vec![Span::styled(self.msg.sender.clone(), name_style)];
        if self.msg.is_admin {
            header.push(Span::styled(" [admin]", Style::default().fg(Color::Magenta)));
        }
        let time = Span::styled(self.msg.timestamp.clone(), time_style);
        match self.msg.header_order() {
            HeaderOrder::NameFirst => {
                header.push(Span::raw("  "));
                header.push(time);
            }
            HeaderOrder::TimeFirst => {
                header.insert(0, Span::raw("  "));
                header.insert(0, time);
            }
        }

        // "+- " + header + " " + dashes + "+"
        let room = self.width - 5;
        let header = fit_spans(header, room);
        let used: usize = header.iter().map(|s| s.content.width()).sum();

        let mut spans = vec![
            Span::raw(self.indent.clone()),
            Span::styled("+- ", self.border),
        ];
        spans.extend(header);
        spans.push(Span::styled(
            format!(" {}+", "-".repeat(room - used)),
            self.border,
        ));
        Line::from(spans)
    }

    /// `| content   |` with the content padded to the card width.
    fn row(&self, content: Vec<Span<'static>>) -> Line<'static> {
        let content = fit_spans(content, self.content_width());
        let used: usize = content.iter().map(|s| s.content.width()).sum();

        let mut spans = vec![
            Span::raw(self.indent.clone()),
            Span::styled("| ", self.border),
        ];
        spans.extend(content);
        spans.push(Span::raw(" ".repeat(self.content_width() - used)));
        spans.push(Span::styled(" |", self.border));
        Line::from(spans)
    }
}

/// Drop whatever does not fit in `width` columns.
fn fit_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Span<'static>> {
    let mut left = width;
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        if left == 0 {
            break;
        }
        let w = span.content.width();
        if w <= left {
            left -= w;
            out.push(span);
        } else {
            let cut = truncate(&span.content, left);
            left -= cut.width();
            out.push(Span::styled(cut, span.style));
        }
    }
    out
}

/// Longest prefix of `s` that fits in `width` columns.
fn truncate(s: &str, width: usize) -> String {
    let mut used = 0;
    s.chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= width
        })
        .collect()
}

fn center(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(s.width()) / 2;
    format!("{}{}", " ".repeat(pad), s)
}

/// Word-wrap to `max_width` columns. Explicit newlines are kept, blank lines
/// included; words longer than a line are split.
pub(super) fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![];
    }
    let mut result = Vec::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.width() <= max_width {
            result.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            for piece in split_word(word, max_width) {
                if current.is_empty() {
                    current = piece;
                } else if current.width() + 1 + piece.width() <= max_width {
                    current.push(' ');
                    current.push_str(&piece);
                } else {
                    result.push(std::mem::replace(&mut current, piece));
                }
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }
    result
}

fn split_word(word: &str, max_width: usize) -> Vec<String> {
    if word.width() <= max_width {
        return vec![word.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for c in word.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max_width && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used += w;
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
