//! Terminal implementation of the chat surface.

use std::collections::HashMap;
use std::time::Instant;

use crate::models::PresenceEntry;
use crate::view::{
    format_file_size, ChatSurface, EntryBody, FeedEntry, FeedState, MessageEntry,
    NotificationSlot, PendingUpload, Severity, UploadSource,
};

use super::thumbnail::{Thumbnail, PREVIEW_THUMB_COLS, PREVIEW_THUMB_ROWS};

/// Inline image state of an image entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineImage {
    Loading,
    Ready(Thumbnail),
    Failed,
}

/// What the preview modal shows.
#[derive(Debug, Clone)]
pub struct Preview {
    pub name: String,
    pub size_label: String,
    pub is_image: bool,
    /// `None` for non-images and images that could not be decoded.
    pub thumbnail: Option<Thumbnail>,
}

impl Preview {
    fn of(upload: &PendingUpload) -> Self {
        let thumbnail = if upload.is_image() {
            preview_thumbnail(upload)
        } else {
            None
        };
        Self {
            name: upload.name.clone(),
            size_label: format_file_size(upload.size),
            is_image: upload.is_image(),
            thumbnail,
        }
    }
}

/// Larger files get no preview thumbnail; decoding runs on the UI task.
const PREVIEW_MAX_BYTES: u64 = 8 * 1024 * 1024;

fn preview_thumbnail(upload: &PendingUpload) -> Option<Thumbnail> {
    if upload.size > PREVIEW_MAX_BYTES {
        tracing::debug!("No preview for {}: {} bytes is too large", upload.name, upload.size);
        return None;
    }
    let decoded = match &upload.source {
        UploadSource::Bytes(data) => Thumbnail::decode(data, PREVIEW_THUMB_COLS, PREVIEW_THUMB_ROWS),
        UploadSource::Path(path) => std::fs::read(path)
            .map_err(anyhow::Error::from)
            .and_then(|data| Thumbnail::decode(&data, PREVIEW_THUMB_COLS, PREVIEW_THUMB_ROWS)),
    };
    match decoded {
        Ok(thumb) => Some(thumb),
        Err(e) => {
            tracing::debug!("No preview for {}: {:#}", upload.name, e);
            None
        }
    }
}

/// Everything the controller draws, kept for the next frame.
#[derive(Debug, Default)]
pub struct Screen {
    pub feed: FeedState,
    pub roster: Vec<PresenceEntry>,
    pub online_count: usize,
    pub connected: bool,
    pub notification: NotificationSlot,
    pub preview: Option<Preview>,
    /// Inline images by feed index.
    pub images: HashMap<usize, InlineImage>,
    /// Image entries appended since the last [`Screen::take_image_fetches`].
    image_fetches: Vec<(usize, String)>,
}

impl Screen {
    /// Image URLs the backend should fetch, by feed index.
    pub fn take_image_fetches(&mut self) -> Vec<(usize, String)> {
        std::mem::take(&mut self.image_fetches)
    }

    pub fn set_image(&mut self, entry: usize, image: InlineImage) {
        self.images.insert(entry, image);
    }

    pub fn image(&self, entry: usize) -> Option<&InlineImage> {
        self.images.get(&entry)
    }

    /// Hide the notification once expired.
    pub fn tick(&mut self, now: Instant) {
        self.notification.tick(now);
    }
}

impl ChatSurface for Screen {
    fn append_entry(&mut self, entry: FeedEntry) {
        let url = match &entry {
            FeedEntry::Message(MessageEntry {
                body: EntryBody::Image(file),
                ..
            }) => Some(file.url.clone()),
            _ => None,
        };
        let idx = self.feed.push(entry);
        if let Some(url) = url {
            self.images.insert(idx, InlineImage::Loading);
            self.image_fetches.push((idx, url));
        }
    }

    fn replace_roster(&mut self, users: &[PresenceEntry]) {
        self.roster = users.to_vec();
    }

    fn set_online_count(&mut self, count: usize) {
        self.online_count = count;
    }

    fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn show_notification(&mut self, text: &str, severity: Severity) {
        self.notification.show(text, severity, Instant::now());
    }

    fn show_preview(&mut self, upload: &PendingUpload) {
        self.preview = Some(Preview::of(upload));
    }

    fn hide_preview(&mut self) {
        self.preview = None;
    }
}
