//! Realtime channel events

use serde::Deserialize;
use serde_json::Value;

use super::{ChatMessage, MessagePayload, OutgoingText, PresenceEntry, UserListPayload};

/// Event delivered by the realtime channel, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Namespace connect acknowledged by the server.
    Connected,
    /// Connection lost or closed.
    Disconnected,
    Message(ChatMessage),
    /// Join/leave and moderation notices broadcast to the room.
    Status(String),
    /// Replies to admin commands, addressed to this client only.
    System(String),
    /// Server-reported application error.
    Error(String),
    /// Full list of online users.
    UserList(Vec<PresenceEntry>),
}

/// `{message}` payload shared by `status`, `system` and `error`.
#[derive(Debug, Deserialize)]
struct NoticePayload {
    #[serde(default)]
    message: String,
}

impl InboundEvent {
    /// Decode a named Socket.IO event.
    ///
    /// Returns `Ok(None)` for event names this client does not handle.
    pub fn from_named(name: &str, data: Value) -> serde_json::Result<Option<Self>> {
        let event = match name {
            "message" => {
                let payload: MessagePayload = serde_json::from_value(data)?;
                InboundEvent::Message(payload.into())
            }
            "status" => InboundEvent::Status(notice_text(data)?),
            "system" => InboundEvent::System(notice_text(data)?),
            "error" => InboundEvent::Error(notice_text(data)?),
            "user_list" => {
                let payload: UserListPayload = serde_json::from_value(data)?;
                InboundEvent::UserList(payload.users)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn notice_text(data: Value) -> serde_json::Result<String> {
    // Some servers emit a bare string instead of `{message}`.
    if let Value::String(s) = data {
        return Ok(s);
    }
    let payload: NoticePayload = serde_json::from_value(data)?;
    Ok(payload.message)
}

/// Event sent to the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Message(OutgoingText),
}

impl OutboundEvent {
    /// Text message event.
    pub fn text(text: impl Into<String>) -> Self {
        OutboundEvent::Message(OutgoingText { text: text.into() })
    }

    /// Socket.IO event name.
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Message(_) => "message",
        }
    }

    /// JSON payload.
    pub fn payload(&self) -> Value {
        match self {
            OutboundEvent::Message(body) => serde_json::json!({ "text": body.text }),
        }
    }
}
