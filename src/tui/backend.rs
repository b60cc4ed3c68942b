//! HTTP worker for the TUI: uploads, inline image fetches and downloads.
//!
//! The TUI loop sends `BackendCommand`s over an mpsc channel; each command
//! runs on its own tokio task and answers with a `BackendResponse`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::api::{ChatClient, UploadError};
use crate::view::UploadRequest;

use super::thumbnail::{Thumbnail, FEED_THUMB_COLS, FEED_THUMB_ROWS};

/// Commands sent from the TUI event loop to the backend.
#[derive(Debug)]
pub enum BackendCommand {
    Upload(UploadRequest),
    /// Fetch and decode the image of feed entry `entry`.
    FetchImage { entry: usize, url: String },
    Download { url: String, filename: String },
}

/// Responses from the backend to the TUI.
pub enum BackendResponse {
    UploadFinished {
        id: u64,
        result: Result<(), UploadError>,
    },
    ImageFetched {
        entry: usize,
        result: Result<Thumbnail>,
    },
    Downloaded(Result<PathBuf>),
}

/// Handle for talking to the backend from the TUI side.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    resp_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    /// Spawn the backend task.
    pub fn start(client: ChatClient, download_dir: PathBuf) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(Arc::new(client), download_dir, cmd_rx, resp_tx));

        Self { cmd_tx, resp_rx }
    }

    /// Queue a command (non-blocking).
    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }

    /// Next response; `None` once the backend is gone. Cancel-safe, for use
    /// in `tokio::select!`.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.resp_rx.recv().await
    }
}

async fn backend_loop(
    client: Arc<ChatClient>,
    download_dir: PathBuf,
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let client = Arc::clone(&client);
        let resp_tx = resp_tx.clone();
        let download_dir = download_dir.clone();

        // One task per command; uploads may overlap.
        tokio::spawn(async move {
            let response = match cmd {
                BackendCommand::Upload(request) => {
                    tracing::info!("Uploading {} (#{})", request.upload.name, request.id);
                    let result = client.upload(&request.upload).await;
                    BackendResponse::UploadFinished {
                        id: request.id,
                        result,
                    }
                }
                BackendCommand::FetchImage { entry, url } => {
                    let result = fetch_thumbnail(&client, &url).await;
                    BackendResponse::ImageFetched { entry, result }
                }
                BackendCommand::Download { url, filename } => {
                    let result = client.download(&url, &filename, &download_dir).await;
                    BackendResponse::Downloaded(result)
                }
            };
            let _ = resp_tx.send(response);
        });
    }
}

async fn fetch_thumbnail(client: &ChatClient, url: &str) -> Result<Thumbnail> {
    let bytes = client.fetch_bytes(url).await?;
    // Decoding is CPU-bound.
    tokio::task::spawn_blocking(move || Thumbnail::decode(&bytes, FEED_THUMB_COLS, FEED_THUMB_ROWS))
        .await?
}
