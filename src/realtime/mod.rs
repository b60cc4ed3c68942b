//! Socket.IO realtime channel client
//!
//! Connects to the chat server's Socket.IO endpoint over WebSocket and turns
//! its events into [`InboundEvent`]s, delivered in arrival order over an
//! mpsc channel. Outbound events travel the other way.

pub mod frame;
mod websocket;

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use url::Url;

use crate::models::{InboundEvent, OutboundEvent};

use frame::{Packet, SocketPacket};
pub use websocket::{socket_url, RealtimeSocket};

const INITIAL_BACKOFF_SECS: u64 = 1;
const MAX_BACKOFF_SECS: u64 = 30;

/// Handle to the background channel task. Dropping it stops the task.
pub struct RealtimeChannel {
    outbound: mpsc::UnboundedSender<OutboundEvent>,
    task: JoinHandle<()>,
}

impl RealtimeChannel {
    /// Start connecting in the background.
    ///
    /// Returns the handle and the receiver of inbound events.
    pub fn spawn(
        url: Url,
        cookie: Option<String>,
    ) -> (Self, mpsc::UnboundedReceiver<InboundEvent>) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_channel(url, cookie, inbound_tx, outbound_rx));

        (
            Self {
                outbound: outbound_tx,
                task,
            },
            inbound_rx,
        )
    }

    /// Queue an event for the server (non-blocking).
    pub fn emit(&self, event: OutboundEvent) {
        if self.outbound.send(event).is_err() {
            tracing::error!("Realtime channel task stopped -- event dropped");
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Why a connected session ended.
enum SessionEnd {
    /// The client side went away (handle or receiver dropped). Do not reconnect.
    Shutdown,
    /// Error or server-initiated close. Reconnect.
    Lost(anyhow::Error),
}

/// Connection loop with reconnection.
///
/// Reconnects with exponential backoff (1s, 2s, 4s, ... capped at 30s).
/// `Connected` is delivered once the namespace connect is acknowledged and
/// `Disconnected` when an established session ends.
async fn run_channel(
    url: Url,
    cookie: Option<String>,
    inbound_tx: mpsc::UnboundedSender<InboundEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundEvent>,
) {
    let mut backoff = INITIAL_BACKOFF_SECS;
    let mut reported_failure = false;

    loop {
        match RealtimeSocket::connect(&url, cookie.as_deref()).await {
            Ok(socket) => {
                backoff = INITIAL_BACKOFF_SECS;
                reported_failure = false;
                if inbound_tx.send(InboundEvent::Connected).is_err() {
                    return;
                }

                let end = run_session(socket, &inbound_tx, &mut outbound_rx).await;
                match end {
                    SessionEnd::Shutdown => return,
                    SessionEnd::Lost(e) => {
                        tracing::warn!("Realtime session lost: {:#}. Reconnecting in {}s...", e, backoff);
                        if inbound_tx.send(InboundEvent::Disconnected).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Realtime connect failed: {:#}. Retrying in {}s...", e, backoff);
                // Surface the first failure of a streak; the rest only go to the log.
                if !reported_failure {
                    reported_failure = true;
                    if inbound_tx.send(InboundEvent::Error(e.to_string())).is_err() {
                        return;
                    }
                }
            }
        }

        if !wait_backoff(backoff, &mut outbound_rx).await {
            return;
        }
        backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
    }
}

/// Sleep before reconnecting, dropping outbound events sent meanwhile.
///
/// Returns false if the handle was dropped.
async fn wait_backoff(secs: u64, outbound_rx: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> bool {
    let deadline = time::sleep(Duration::from_secs(secs));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return true,
            event = outbound_rx.recv() => match event {
                Some(event) => {
                    tracing::warn!("Not connected -- dropping outbound '{}' event", event.name());
                }
                None => return false,
            }
        }
    }
}

/// Pump one connected session until it ends.
///
/// A server that sends nothing (not even a ping) for longer than its
/// heartbeat timeout is treated as gone, even if the socket stays open.
async fn run_session(
    mut socket: RealtimeSocket,
    inbound_tx: &mpsc::UnboundedSender<InboundEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<OutboundEvent>,
) -> SessionEnd {
    loop {
        let deadline = socket.heartbeat_deadline();
        tokio::select! {
            packet = socket.recv_packet() => {
                match packet {
                    Ok(Some(Packet::Message(SocketPacket::Event { name, data }))) => {
                        match InboundEvent::from_named(&name, data) {
                            Ok(Some(event)) => {
                                if inbound_tx.send(event).is_err() {
                                    socket.close().await;
                                    return SessionEnd::Shutdown;
                                }
                            }
                            Ok(None) => tracing::debug!("Ignoring unhandled event '{}'", name),
                            Err(e) => tracing::warn!("Malformed '{}' payload: {}", name, e),
                        }
                    }
                    Ok(Some(Packet::Message(SocketPacket::Disconnect))) => {
                        return SessionEnd::Lost(anyhow::anyhow!("Server closed the namespace"));
                    }
                    Ok(Some(other)) => tracing::debug!("Ignoring packet {:?}", other),
                    Ok(None) => {
                        return SessionEnd::Lost(anyhow::anyhow!("WebSocket closed by server"));
                    }
                    Err(e) => return SessionEnd::Lost(e),
                }
            }
            event = outbound_rx.recv() => {
                match event {
                    Some(event) => {
                        if let Err(e) = socket.emit(event.name(), &event.payload()).await {
                            return SessionEnd::Lost(e);
                        }
                    }
                    None => {
                        socket.close().await;
                        return SessionEnd::Shutdown;
                    }
                }
            }
            _ = time::sleep_until(deadline) => {
                // Pings answered inside recv_packet may have moved the deadline.
                if socket.heartbeat_deadline() <= time::Instant::now() {
                    return SessionEnd::Lost(anyhow::anyhow!(
                        "No heartbeat from server in {:?}",
                        socket.heartbeat_timeout()
                    ));
                }
            }
        }
    }
}

/// Connect, emit a single text message, and disconnect (one-shot CLI command)
pub async fn send_once(server_url: &str, cookie: Option<&str>, text: &str) -> Result<()> {
    let url = socket_url(server_url)?;
    let mut socket = RealtimeSocket::connect(&url, cookie).await?;
    let event = OutboundEvent::text(text);
    socket.emit(event.name(), &event.payload()).await?;
    socket.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    async fn next_text(ws: &mut ServerWs) -> String {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(t))) => return t,
                Some(Ok(_)) => continue,
                other => panic!("server expected text, got {:?}", other),
            }
        }
    }

    async fn send(ws: &mut ServerWs, text: &str) {
        ws.send(Message::Text(text.to_string())).await.unwrap();
    }

    async fn recv_event(rx: &mut mpsc::UnboundedReceiver<InboundEvent>) -> InboundEvent {
        time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_channel_session_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

            send(&mut ws, r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#).await;
            assert_eq!(next_text(&mut ws).await, "40");
            send(&mut ws, r#"40{"sid":"n1"}"#).await;

            send(&mut ws, "2").await;
            assert_eq!(next_text(&mut ws).await, "3");

            send(&mut ws, r#"42["typing",{}]"#).await;
            send(&mut ws, r#"42["status",{"message":"bob joined"}]"#).await;
            send(&mut ws, r#"42["user_list",{"users":[{"username":"bob","is_admin":false}]}]"#).await;

            let emitted = next_text(&mut ws).await;
            ws.close(None).await.ok();
            emitted
        });

        let url = socket_url(&format!("http://{}", addr)).unwrap();
        let (channel, mut rx) = RealtimeChannel::spawn(url, None);

        assert_eq!(recv_event(&mut rx).await, InboundEvent::Connected);
        assert_eq!(
            recv_event(&mut rx).await,
            InboundEvent::Status("bob joined".to_string())
        );
        match recv_event(&mut rx).await {
            InboundEvent::UserList(users) => assert_eq!(users[0].username, "bob"),
            other => panic!("unexpected {:?}", other),
        }

        channel.emit(OutboundEvent::text("hello"));
        assert_eq!(server.await.unwrap(), r#"42["message",{"text":"hello"}]"#);

        assert_eq!(recv_event(&mut rx).await, InboundEvent::Disconnected);
    }

    #[tokio::test]
    async fn test_silent_server_ends_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            send(&mut ws, r#"0{"sid":"s1","pingInterval":200,"pingTimeout":200}"#).await;
            assert_eq!(next_text(&mut ws).await, "40");
            send(&mut ws, r#"40{"sid":"n1"}"#).await;

            // Regular pings keep the session alive past the 400ms timeout.
            for _ in 0..6 {
                time::sleep(Duration::from_millis(100)).await;
                send(&mut ws, "2").await;
                assert_eq!(next_text(&mut ws).await, "3");
            }

            // Then silence, with the socket held open until the client drops it.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let url = socket_url(&format!("http://{}", addr)).unwrap();
        let (_channel, mut rx) = RealtimeChannel::spawn(url, None);

        assert_eq!(recv_event(&mut rx).await, InboundEvent::Connected);
        assert!(
            time::timeout(Duration::from_millis(500), rx.recv()).await.is_err(),
            "session ended while pings were arriving"
        );
        assert_eq!(recv_event(&mut rx).await, InboundEvent::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_error_is_reported_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            send(&mut ws, r#"0{"sid":"s1","pingInterval":25000,"pingTimeout":20000}"#).await;
            assert_eq!(next_text(&mut ws).await, "40");
            send(&mut ws, r#"44{"message":"Not authorized"}"#).await;
        });

        let url = socket_url(&format!("http://{}", addr)).unwrap();
        let (_channel, mut rx) = RealtimeChannel::spawn(url, None);

        match recv_event(&mut rx).await {
            InboundEvent::Error(text) => assert!(text.contains("Not authorized"), "{}", text),
            other => panic!("unexpected {:?}", other),
        }
    }
}
