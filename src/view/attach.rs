//! File attach / preview / send flow.
//!
//! ```text
//! Idle --select/paste--> Previewing --confirm--> Sending --success--> Idle
//!                           |  ^                   |
//!                           |  +------failure------+
//!                           +--cancel--> Idle
//! ```
//!
//! Sending does not lock anything: confirming again while a request is in
//! flight issues another request for the same file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};

/// Where the bytes of a pending upload come from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// A file picked from disk; read when the upload starts.
    Path(PathBuf),
    /// Image data pasted from the clipboard.
    Bytes(Arc<Vec<u8>>),
}

/// A file waiting to be sent.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    /// Identifies the selection; a new select or paste gets a new id.
    pub selection: u64,
    /// Display name, also sent as the multipart filename.
    pub name: String,
    pub size: u64,
    /// Declared media type (e.g. `image/png`).
    pub media_type: String,
    pub source: UploadSource,
}

impl PendingUpload {
    /// Whether the declared media type is an image (drives the preview).
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// One item of clipboard content offered by a paste.
#[derive(Debug, Clone)]
pub struct ClipboardItem {
    pub media_type: String,
    pub data: Vec<u8>,
}

impl ClipboardItem {
    fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// What the caller should do with a paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    /// An image was attached; suppress the default paste.
    Attached,
    /// No image in the clipboard; let the default paste happen.
    Default,
}

/// A request to send a pending file to the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub id: u64,
    pub upload: PendingUpload,
}

/// Current state of the flow.
#[derive(Debug, Clone, Default)]
pub enum AttachState {
    #[default]
    Idle,
    Previewing(PendingUpload),
    Sending(PendingUpload),
}

/// Outcome of a finished upload as seen by the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finished {
    /// Success for the current selection: back to Idle.
    Cleared,
    /// Failure for the current selection: still previewing, ready to retry.
    Kept,
    /// The request belonged to a selection that was cancelled or replaced.
    Stale,
}

#[derive(Debug, Default)]
pub(crate) struct AttachFlow {
    state: AttachState,
    next_selection: u64,
    next_request: u64,
    /// Request id -> selection id, for every request still in flight.
    in_flight: HashMap<u64, u64>,
}

impl AttachFlow {
    pub fn state(&self) -> &AttachState {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingUpload> {
        match &self.state {
            AttachState::Idle => None,
            AttachState::Previewing(p) | AttachState::Sending(p) => Some(p),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start previewing a file from disk.
    pub fn select_path(&mut self, path: &Path) -> Result<PendingUpload> {
        let meta = fs::metadata(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        if !meta.is_file() {
            bail!("{} is not a file", path.display());
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(self.begin(name, meta.len(), media_type, UploadSource::Path(path.to_path_buf())))
    }

    /// Attach the first image item of a paste, if any.
    pub fn paste(&mut self, items: Vec<ClipboardItem>, now: DateTime<Local>) -> Option<PendingUpload> {
        let item = items.into_iter().find(ClipboardItem::is_image)?;
        let name = pasted_image_name(now, &item.media_type);
        let size = item.data.len() as u64;
        Some(self.begin(name, size, item.media_type, UploadSource::Bytes(Arc::new(item.data))))
    }

    fn begin(&mut self, name: String, size: u64, media_type: String, source: UploadSource) -> PendingUpload {
        self.next_selection += 1;
        let upload = PendingUpload {
            selection: self.next_selection,
            name,
            size,
            media_type,
            source,
        };
        self.state = AttachState::Previewing(upload.clone());
        upload
    }

    /// Send the pending file. Returns `None` when nothing is attached.
    pub fn confirm(&mut self) -> Option<UploadRequest> {
        let upload = self.pending()?.clone();
        self.next_request += 1;
        let id = self.next_request;
        self.in_flight.insert(id, upload.selection);
        self.state = AttachState::Sending(upload.clone());
        Some(UploadRequest { id, upload })
    }

    /// Record the outcome of request `id`.
    pub fn finish(&mut self, id: u64, success: bool) -> Finished {
        let Some(selection) = self.in_flight.remove(&id) else {
            return Finished::Stale;
        };
        if self.pending().map(|p| p.selection) != Some(selection) {
            return Finished::Stale;
        }

        if success {
            self.state = AttachState::Idle;
            return Finished::Cleared;
        }

        self.state = match std::mem::take(&mut self.state) {
            AttachState::Sending(p) => AttachState::Previewing(p),
            other => other,
        };
        Finished::Kept
    }

    /// Drop the pending file. Returns true if there was one.
    pub fn cancel(&mut self) -> bool {
        let had_pending = self.pending().is_some();
        self.state = AttachState::Idle;
        had_pending
    }
}

/// Unique name for pasted image data, e.g. `pasted-image-20240501-120000-123.png`.
pub(crate) fn pasted_image_name(now: DateTime<Local>, media_type: &str) -> String {
    let subtype = media_type
        .split_once('/')
        .map(|(_, sub)| sub)
        .unwrap_or("png");
    // image/svg+xml -> svg
    let ext = subtype.split('+').next().unwrap_or(subtype);
    format!("pasted-image-{}.{}", now.format("%Y%m%d-%H%M%S-%3f"), ext)
}
