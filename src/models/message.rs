//! Message-related models

use serde::{Deserialize, Serialize};

/// File extensions rendered inline as images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// A file shared in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Original filename as uploaded.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Extension category reported by the server (e.g. "png").
    pub filetype: String,
    /// Retrieval URL, possibly relative to the server root.
    pub url: String,
}

impl FileAttachment {
    /// Extension used for classification: the reported filetype, or the
    /// filename's extension when the server sent none.
    pub fn extension(&self) -> String {
        let ext = if self.filetype.is_empty() {
            self.filename
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .unwrap_or_default()
        } else {
            self.filetype.trim_start_matches('.')
        };
        ext.to_ascii_lowercase()
    }

    /// Whether this file renders as an inline image.
    pub fn is_image(&self) -> bool {
        is_image_extension(&self.extension())
    }
}

/// Case-insensitive check against the inline image allow-list.
pub fn is_image_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.');
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Message body: plain text or a shared file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    File(FileAttachment),
}

/// Chat message as delivered by the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sender username.
    pub sender: String,
    /// Display timestamp, pre-formatted by the server.
    pub timestamp: String,
    /// Whether the sender is a room admin.
    pub is_admin: bool,
    pub body: MessageBody,
}

/// Wire payload of the `message` event.
///
/// Text messages carry `text`; file messages carry `type: "file"` plus the
/// file descriptor fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<MessagePayload> for ChatMessage {
    fn from(p: MessagePayload) -> Self {
        let body = if p.kind.as_deref() == Some("file") {
            MessageBody::File(FileAttachment {
                filename: p.filename.unwrap_or_else(|| "file".to_string()),
                size: p.filesize.unwrap_or(0),
                filetype: p.filetype.unwrap_or_default(),
                url: p.url.unwrap_or_default(),
            })
        } else {
            MessageBody::Text(p.text.unwrap_or_default())
        };

        Self {
            sender: p.username,
            timestamp: p.timestamp,
            is_admin: p.is_admin,
            body,
        }
    }
}

/// Payload of the outbound `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingText {
    pub text: String,
}
