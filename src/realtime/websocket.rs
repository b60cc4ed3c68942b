//! Socket.IO WebSocket connection and frame handling

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::frame::{self, OpenInfo, Packet, SocketPacket};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Build the Engine.IO WebSocket endpoint from the server's HTTP base URL.
pub fn socket_url(server_url: &str) -> Result<Url> {
    let mut url =
        Url::parse(server_url).with_context(|| format!("Invalid server URL '{}'", server_url))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => bail!("Unsupported server URL scheme '{}'", other),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("Cannot use scheme {} for {}", scheme, server_url))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    url.set_fragment(None);
    Ok(url)
}

pub struct RealtimeSocket {
    stream: WsStream,
    /// Server silence tolerated before the connection counts as dead.
    heartbeat_timeout: Duration,
    /// When the last frame of any kind arrived.
    last_seen: Instant,
}

impl RealtimeSocket {
    /// Open the WebSocket and complete the Engine.IO and Socket.IO handshakes.
    ///
    /// Returns once the server has acknowledged the namespace connect.
    pub async fn connect(url: &Url, cookie: Option<&str>) -> Result<Self> {
        let mut request = url
            .as_str()
            .into_client_request()
            .context("Invalid WebSocket request")?;
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie).context("Invalid session cookie")?;
            request.headers_mut().insert("Cookie", value);
        }

        tracing::info!("Connecting WebSocket to {}", url);

        let (stream, response) = connect_async(request)
            .await
            .context("WebSocket connection failed")?;

        tracing::info!("WebSocket connected (status={})", response.status());

        let mut socket = Self {
            stream,
            heartbeat_timeout: OpenInfo::default().heartbeat_timeout(),
            last_seen: Instant::now(),
        };
        let info = socket.handshake().await?;
        socket.heartbeat_timeout = info.heartbeat_timeout();
        Ok(socket)
    }

    /// Deadline after which a silent server counts as gone.
    pub fn heartbeat_deadline(&self) -> Instant {
        self.last_seen + self.heartbeat_timeout
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    async fn handshake(&mut self) -> Result<OpenInfo> {
        let info = match self.recv_packet().await? {
            Some(Packet::Open(info)) => {
                tracing::debug!(
                    "Engine.IO open: sid={} ping_interval={}ms ping_timeout={}ms",
                    info.sid,
                    info.ping_interval,
                    info.ping_timeout
                );
                info
            }
            Some(other) => bail!("Expected Engine.IO open packet, got {:?}", other),
            None => bail!("Connection closed before handshake"),
        };

        self.send_text(frame::CONNECT).await?;

        loop {
            match self.recv_packet().await? {
                Some(Packet::Message(SocketPacket::Connect(_))) => return Ok(info),
                Some(Packet::Message(SocketPacket::ConnectError(data))) => {
                    let reason = data
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("connection refused");
                    bail!("Server refused connection: {}", reason);
                }
                Some(other) => tracing::debug!("Ignoring {:?} during handshake", other),
                None => bail!("Connection closed before namespace connect"),
            }
        }
    }

    /// Send a text frame.
    pub async fn send_text(&mut self, msg: &str) -> Result<()> {
        tracing::debug!("WS send: {}", msg);
        self.stream
            .send(Message::Text(msg.to_string()))
            .await
            .context("Failed to send WebSocket message")
    }

    /// Emit a Socket.IO event.
    pub async fn emit(&mut self, name: &str, data: &Value) -> Result<()> {
        self.send_text(&frame::encode_event(name, data)).await
    }

    /// Receive the next Engine.IO packet.
    ///
    /// Server pings are answered here and not returned. Frames that fail to
    /// decode are logged and skipped. Returns `None` when the socket closes.
    /// Every frame received, pings included, moves the heartbeat deadline.
    pub async fn recv_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            let next = self.stream.next().await;
            if let Some(Ok(_)) = next {
                self.last_seen = Instant::now();
            }
            match next {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("WS recv: {}", text);

                    match frame::decode(&text) {
                        Ok(Packet::Ping) => {
                            self.send_text(frame::PONG).await?;
                        }
                        Ok(Packet::Close) => return Ok(None),
                        Ok(packet) => return Ok(Some(packet)),
                        Err(e) => tracing::warn!("Skipping undecodable frame {:?}: {}", text, e),
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .context("Failed to send pong")?;
                }
                Some(Ok(Message::Close(close_frame))) => {
                    tracing::info!("WebSocket closed: {:?}", close_frame);
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    tracing::debug!("WS frame (ignored): {:?}", other);
                }
                Some(Err(e)) => {
                    return Err(e).context("WebSocket receive error");
                }
                None => {
                    return Ok(None);
                }
            }
        }
    }

    /// Close the socket politely.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_from_http() {
        let url = socket_url("http://127.0.0.1:5000").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://127.0.0.1:5000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_from_https_with_path() {
        let url = socket_url("https://chat.example.com/app/?x=1#top").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://chat.example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_rejects_other_schemes() {
        assert!(socket_url("ftp://example.com").is_err());
        assert!(socket_url("not a url").is_err());
    }
}
