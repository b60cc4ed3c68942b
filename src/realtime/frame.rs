//! Engine.IO v4 / Socket.IO v5 text frame codec.
//!
//! Engine.IO framing (first character of each WebSocket text frame):
//!   0 - open (JSON handshake)
//!   1 - close
//!   2 - ping (server), answered with 3
//!   3 - pong
//!   4 - message (carries a Socket.IO packet)
//!   5 - upgrade
//!   6 - noop
//!
//! Socket.IO packets inside `4`:
//!   0 - connect        `40` / `40{"sid":...}`
//!   1 - disconnect     `41`
//!   2 - event          `42["name",data]`, optionally `42/ns,17["name",data]`
//!   4 - connect error  `44{"message":...}`

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Client request to join the default namespace.
pub const CONNECT: &str = "40";
/// Answer to a server ping.
pub const PONG: &str = "3";

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("unknown packet type '{0}'")]
    UnknownType(char),
    #[error("malformed event frame: {0}")]
    MalformedEvent(String),
    #[error("invalid JSON in frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine.IO handshake sent by the server right after the socket opens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Engine.IO defaults, used when the handshake leaves them out.
const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;

impl OpenInfo {
    /// How long the server may stay silent before the connection counts as
    /// dead: one ping interval plus the ping timeout.
    pub fn heartbeat_timeout(&self) -> Duration {
        let interval = match self.ping_interval {
            0 => DEFAULT_PING_INTERVAL_MS,
            ms => ms,
        };
        let timeout = match self.ping_timeout {
            0 => DEFAULT_PING_TIMEOUT_MS,
            ms => ms,
        };
        Duration::from_millis(interval + timeout)
    }
}

/// Socket.IO packet carried in an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    ConnectError(Value),
    /// Acks and binary packets; not used by this client.
    Other(String),
}

/// Decoded Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Decode one WebSocket text frame.
pub fn decode(frame: &str) -> Result<Packet, FrameError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(FrameError::Empty)?;
    let rest = chars.as_str();

    let packet = match kind {
        '0' => Packet::Open(serde_json::from_str(rest)?),
        '1' => Packet::Close,
        '2' => Packet::Ping,
        '3' => Packet::Pong,
        '4' => Packet::Message(decode_socket(rest)?),
        '5' => Packet::Upgrade,
        '6' => Packet::Noop,
        other => return Err(FrameError::UnknownType(other)),
    };
    Ok(packet)
}

fn decode_socket(packet: &str) -> Result<SocketPacket, FrameError> {
    let mut chars = packet.chars();
    let kind = chars.next().ok_or(FrameError::Empty)?;
    let body = strip_namespace_and_ack(chars.as_str());

    let decoded = match kind {
        '0' if body.is_empty() => SocketPacket::Connect(None),
        '0' => SocketPacket::Connect(Some(serde_json::from_str(body)?)),
        '1' => SocketPacket::Disconnect,
        '2' => decode_event(body)?,
        '4' if body.is_empty() => SocketPacket::ConnectError(Value::Null),
        '4' => SocketPacket::ConnectError(serde_json::from_str(body)?),
        _ => SocketPacket::Other(packet.to_string()),
    };
    Ok(decoded)
}

/// Skip an optional `/namespace,` prefix and an optional numeric ack id.
fn strip_namespace_and_ack(body: &str) -> &str {
    let body = if body.starts_with('/') {
        match body.find(',') {
            Some(pos) => &body[pos + 1..],
            None => "",
        }
    } else {
        body
    };
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(body: &str) -> Result<SocketPacket, FrameError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(mut items) = value else {
        return Err(FrameError::MalformedEvent("payload is not an array".to_string()));
    };
    if items.is_empty() {
        return Err(FrameError::MalformedEvent("missing event name".to_string()));
    }

    let name = match items.remove(0) {
        Value::String(name) => name,
        other => {
            return Err(FrameError::MalformedEvent(format!(
                "event name is not a string: {}",
                other
            )))
        }
    };
    // Extra arguments beyond the first are not used by the chat server.
    let data = if items.is_empty() {
        Value::Null
    } else {
        items.swap_remove(0)
    };

    Ok(SocketPacket::Event { name, data })
}

/// Encode a Socket.IO event for the default namespace.
pub fn encode_event(name: &str, data: &Value) -> String {
    format!("42{}", serde_json::json!([name, data]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open() {
        let packet = decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#).unwrap();
        assert_eq!(
            packet,
            Packet::Open(OpenInfo {
                sid: "abc".to_string(),
                ping_interval: 25000,
                ping_timeout: 20000,
            })
        );
    }

    #[test]
    fn test_heartbeat_timeout() {
        let info = match decode(r#"0{"sid":"x","pingInterval":200,"pingTimeout":300}"#).unwrap() {
            Packet::Open(info) => info,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(info.heartbeat_timeout(), Duration::from_millis(500));

        let info = match decode(r#"0{"sid":"x"}"#).unwrap() {
            Packet::Open(info) => info,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(info.heartbeat_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_decode_engine_control_packets() {
        assert_eq!(decode("1").unwrap(), Packet::Close);
        assert_eq!(decode("2").unwrap(), Packet::Ping);
        assert_eq!(decode("3").unwrap(), Packet::Pong);
        assert_eq!(decode("5").unwrap(), Packet::Upgrade);
        assert_eq!(decode("6").unwrap(), Packet::Noop);
    }

    #[test]
    fn test_decode_connect_ack() {
        assert_eq!(
            decode(r#"40{"sid":"xyz"}"#).unwrap(),
            Packet::Message(SocketPacket::Connect(Some(json!({"sid": "xyz"}))))
        );
        assert_eq!(
            decode("40").unwrap(),
            Packet::Message(SocketPacket::Connect(None))
        );
    }

    #[test]
    fn test_decode_event() {
        let packet = decode(r#"42["status",{"message":"bob joined"}]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Message(SocketPacket::Event {
                name: "status".to_string(),
                data: json!({"message": "bob joined"}),
            })
        );
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack_id() {
        let packet = decode(r#"42/chat,17["message",{"text":"hi"}]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Message(SocketPacket::Event {
                name: "message".to_string(),
                data: json!({"text": "hi"}),
            })
        );
    }

    #[test]
    fn test_decode_event_without_data() {
        let packet = decode(r#"42["ping_me"]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Message(SocketPacket::Event {
                name: "ping_me".to_string(),
                data: Value::Null,
            })
        );
    }

    #[test]
    fn test_decode_connect_error_and_disconnect() {
        assert_eq!(
            decode(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::Message(SocketPacket::ConnectError(json!({"message": "Not authorized"})))
        );
        assert_eq!(
            decode("41").unwrap(),
            Packet::Message(SocketPacket::Disconnect)
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode(""), Err(FrameError::Empty)));
        assert!(matches!(decode("9"), Err(FrameError::UnknownType('9'))));
        assert!(matches!(decode("42{}"), Err(FrameError::MalformedEvent(_))));
        assert!(matches!(decode("42[]"), Err(FrameError::MalformedEvent(_))));
        assert!(matches!(decode("42[1,2]"), Err(FrameError::MalformedEvent(_))));
        assert!(matches!(decode("42[nope"), Err(FrameError::Json(_))));
    }

    #[test]
    fn test_encode_event() {
        let frame = encode_event("message", &json!({"text": "hello \"world\""}));
        assert_eq!(frame, r#"42["message",{"text":"hello \"world\""}]"#);
        // Decodes back to the same event.
        assert_eq!(
            decode(&frame).unwrap(),
            Packet::Message(SocketPacket::Event {
                name: "message".to_string(),
                data: json!({"text": "hello \"world\""}),
            })
        );
    }
}
