//! Rendering interface the controller draws through.

use crate::models::PresenceEntry;

use super::attach::PendingUpload;
use super::feed::FeedEntry;
use super::notify::Severity;

/// Where the chat view is drawn.
pub trait ChatSurface {
    /// Append an entry to the end of the feed and scroll to it.
    fn append_entry(&mut self, entry: FeedEntry);

    /// Replace the whole roster.
    fn replace_roster(&mut self, users: &[PresenceEntry]);

    /// Update the online counter, if the surface has one.
    fn set_online_count(&mut self, _count: usize) {}

    /// Reflect the realtime connection state, if the surface shows it.
    fn set_connected(&mut self, _connected: bool) {}

    /// Put a message in the notification slot.
    fn show_notification(&mut self, text: &str, severity: Severity);

    /// Show the pending file before it is sent.
    fn show_preview(&mut self, upload: &PendingUpload);

    fn hide_preview(&mut self);
}
