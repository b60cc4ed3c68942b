//! HTTP side of the chat server: uploads and file retrieval

pub mod client;
mod upload;

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::view::{format_file_size, PendingUpload, UploadSource};

pub use client::ChatClient;
pub use upload::UploadError;

/// Upload a single file and print the outcome (one-shot CLI command)
pub async fn upload_file(config: &Config, path: &Path) -> Result<()> {
    let client = ChatClient::new(config)?;

    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Path has no file name")?;
    let upload = PendingUpload {
        selection: 0,
        media_type: mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string(),
        name,
        size: meta.len(),
        source: UploadSource::Path(path.to_path_buf()),
    };

    client
        .upload(&upload)
        .await
        .with_context(|| format!("Uploading {} failed", upload.name))?;

    println!("Uploaded {} ({})", upload.name, format_file_size(upload.size));
    Ok(())
}
