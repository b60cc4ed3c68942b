//! Chat view controller
//!
//! Toolkit-independent core of the client: routes inbound realtime events
//! into the feed and roster, drives the attach/preview/upload flow and owns
//! the notification slot. Drawing goes through [`ChatSurface`].

mod attach;
mod controller;
mod feed;
mod format;
mod input;
mod notify;
mod surface;

pub use attach::{AttachState, ClipboardItem, PasteOutcome, PendingUpload, UploadRequest, UploadSource};
pub use controller::ChatView;
pub use feed::{EntryBody, FeedEntry, FeedState, HeaderOrder, MessageEntry};
pub use format::format_file_size;
pub use input::Composer;
pub use notify::{NotificationSlot, Severity};
pub use surface::ChatSurface;
