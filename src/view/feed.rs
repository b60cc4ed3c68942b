//! Message feed: rendered entries and scroll state.

use std::fmt;

use crate::models::{ChatMessage, FileAttachment, MessageBody};

use super::format::format_file_size;

/// Order of the two header parts of a message entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOrder {
    /// Other people's messages: name, then time.
    NameFirst,
    /// Own messages: time, then name.
    TimeFirst,
}

/// Body of a rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    Text(String),
    /// Shown inline as an image.
    Image(FileAttachment),
    /// Generic file card with a download affordance.
    File {
        file: FileAttachment,
        size_label: String,
    },
}

/// A rendered chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub sender: String,
    pub timestamp: String,
    pub is_self: bool,
    pub is_admin: bool,
    pub body: EntryBody,
}

impl MessageEntry {
    pub fn header_order(&self) -> HeaderOrder {
        if self.is_self {
            HeaderOrder::TimeFirst
        } else {
            HeaderOrder::NameFirst
        }
    }
}

/// One line item in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEntry {
    Message(MessageEntry),
    /// Status or system notice: no sender, muted and centered.
    System(String),
}

impl FeedEntry {
    /// The file behind an image or file-card entry.
    pub fn attachment(&self) -> Option<&FileAttachment> {
        match self {
            FeedEntry::Message(MessageEntry {
                body: EntryBody::Image(file) | EntryBody::File { file, .. },
                ..
            }) => Some(file),
            _ => None,
        }
    }
}

impl fmt::Display for FeedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedEntry::System(text) => write!(f, "-- {} --", text),
            FeedEntry::Message(m) => {
                let admin = if m.is_admin { " [admin]" } else { "" };
                let header = match m.header_order() {
                    HeaderOrder::NameFirst => format!("{}{} [{}]", m.sender, admin, m.timestamp),
                    HeaderOrder::TimeFirst => format!("[{}] {}{}", m.timestamp, m.sender, admin),
                };
                match &m.body {
                    EntryBody::Text(text) => write!(f, "{}: {}", header, text),
                    EntryBody::Image(file) => {
                        write!(f, "{}: [image] {} ({})", header, file.filename, file.url)
                    }
                    EntryBody::File { file, size_label } => write!(
                        f,
                        "{}: [file] {} {} ({})",
                        header, file.filename, size_label, file.url
                    ),
                }
            }
        }
    }
}

/// Turn an inbound message into a feed entry for the given local user.
pub fn render_message(msg: &ChatMessage, current_user: &str) -> FeedEntry {
    let body = match &msg.body {
        MessageBody::Text(text) => EntryBody::Text(text.clone()),
        MessageBody::File(file) if file.is_image() => EntryBody::Image(file.clone()),
        MessageBody::File(file) => EntryBody::File {
            size_label: format_file_size(file.size),
            file: file.clone(),
        },
    };

    FeedEntry::Message(MessageEntry {
        sender: msg.sender.clone(),
        timestamp: msg.timestamp.clone(),
        is_self: msg.sender == current_user,
        is_admin: msg.is_admin,
        body,
    })
}

/// Append-only list of entries plus scroll and selection.
///
/// Scrolling is counted in entries from the bottom: 0 shows the newest entry
/// at the bottom of the pane.
#[derive(Debug, Default)]
pub struct FeedState {
    entries: Vec<FeedEntry>,
    scroll_from_bottom: usize,
    selected: Option<usize>,
}

impl FeedState {
    /// Append an entry and jump to the bottom. Returns the entry's index.
    ///
    /// The jump happens even if the user had scrolled up.
    pub fn push(&mut self, entry: FeedEntry) -> usize {
        self.entries.push(entry);
        self.scroll_from_bottom = 0;
        self.entries.len() - 1
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scroll_from_bottom(&self) -> usize {
        self.scroll_from_bottom
    }

    pub fn is_at_bottom(&self) -> bool {
        self.scroll_from_bottom == 0
    }

    /// Scroll toward older entries.
    pub fn scroll_up(&mut self, n: usize) {
        let max = self.entries.len().saturating_sub(1);
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(n).min(max);
    }

    /// Scroll toward newer entries.
    pub fn scroll_down(&mut self, n: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(n);
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&FeedEntry> {
        self.entries.get(self.selected?)
    }

    /// Move the selection one entry up, starting from the newest.
    pub fn select_previous(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let idx = match self.selected {
            Some(i) => i.saturating_sub(1),
            None => self.entries.len() - 1,
        };
        self.select(idx);
    }

    /// Move the selection one entry down; past the newest clears it.
    pub fn select_next(&mut self) {
        match self.selected {
            Some(i) if i + 1 < self.entries.len() => self.select(i + 1),
            _ => {
                self.selected = None;
                self.scroll_from_bottom = 0;
            }
        }
    }

    /// Drop the selection and show the newest entry.
    pub fn jump_to_bottom(&mut self) {
        self.selected = None;
        self.scroll_from_bottom = 0;
    }

    /// Select an entry and scroll so it sits at the bottom of the pane.
    fn select(&mut self, idx: usize) {
        self.selected = Some(idx);
        self.scroll_from_bottom = self.entries.len() - 1 - idx;
    }
}
