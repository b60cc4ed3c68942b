//! Multipart file upload to the server's upload endpoint.

use std::path::PathBuf;
use std::sync::Arc;

use futures::{stream, Stream};
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use super::client::ChatClient;
use crate::view::{PendingUpload, UploadSource};

/// Message shown when the server gives no reason or the request never completed.
pub const GENERIC_UPLOAD_FAILURE: &str = "File upload failed";

/// Upload bodies are streamed in chunks of this size.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// JSON body returned by the upload endpoint.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Why an upload did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The server answered `success: false`.
    #[error("{}", .0.as_deref().unwrap_or(GENERIC_UPLOAD_FAILURE))]
    Rejected(Option<String>),
    /// Non-JSON error response.
    #[error("upload rejected with HTTP {0}")]
    Status(u16),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("upload request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl UploadError {
    /// Text for the error notification: the server's reason verbatim when it
    /// gave one, otherwise a generic failure message.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Rejected(Some(reason)) => reason.clone(),
            _ => GENERIC_UPLOAD_FAILURE.to_string(),
        }
    }
}

impl ChatClient {
    /// Send a pending file as multipart field `file`.
    pub async fn upload(&self, upload: &PendingUpload) -> Result<(), UploadError> {
        let (body, len) = match upload.source {
            UploadSource::Path(ref path) => {
                let read_error = |source: std::io::Error| UploadError::Read {
                    path: path.clone(),
                    source,
                };
                let file = tokio::fs::File::open(path).await.map_err(read_error)?;
                let len = file.metadata().await.map_err(read_error)?.len();
                (reqwest::Body::wrap_stream(file_chunks(file)), len)
            }
            UploadSource::Bytes(ref data) => (
                reqwest::Body::wrap_stream(byte_chunks(Arc::clone(data))),
                data.len() as u64,
            ),
        };

        tracing::info!(
            "Uploading {} ({} bytes, {}) to {}",
            upload.name,
            len,
            upload.media_type,
            self.upload_url
        );

        let part = reqwest::multipart::Part::stream_with_length(body, len)
            .file_name(upload.name.clone())
            .mime_str(&upload.media_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .with_session(self.http.post(self.upload_url.clone()))
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!("Upload response: HTTP {} {}", status.as_u16(), body);

        match serde_json::from_str::<UploadResponse>(&body) {
            Ok(UploadResponse { success: true, .. }) => Ok(()),
            Ok(UploadResponse { error, .. }) => Err(UploadError::Rejected(error)),
            Err(_) if !status.is_success() => Err(UploadError::Status(status.as_u16())),
            Err(_) => Err(UploadError::Rejected(None)),
        }
    }
}

/// Read a file lazily, one chunk at a time.
fn file_chunks(file: tokio::fs::File) -> impl Stream<Item = std::io::Result<Vec<u8>>> {
    stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; UPLOAD_CHUNK];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some((buf, file)))
    })
}

/// Slice shared in-memory data into chunks without copying it whole.
fn byte_chunks(data: Arc<Vec<u8>>) -> impl Stream<Item = std::io::Result<Vec<u8>>> {
    let starts = (0..data.len()).step_by(UPLOAD_CHUNK);
    stream::iter(starts.map(move |start| {
        let end = (start + UPLOAD_CHUNK).min(data.len());
        Ok(data[start..end].to_vec())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// One-shot HTTP server: captures the request, answers with `status` and `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let request = read_request(&mut sock).await;
            let resp = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            request
        });

        (format!("http://{}", addr), handle)
    }

    async fn read_request(sock: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn pasted(data: &[u8]) -> PendingUpload {
        PendingUpload {
            selection: 1,
            name: "pasted-image-1.png".to_string(),
            size: data.len() as u64,
            media_type: "image/png".to_string(),
            source: UploadSource::Bytes(Arc::new(data.to_vec())),
        }
    }

    fn client_for(server: String) -> ChatClient {
        let config = Config {
            server_url: server,
            session_cookie: Some("session=abc123".to_string()),
            ..Config::default()
        };
        ChatClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_upload_success_sends_multipart_file_field() {
        let (server, handle) = serve_once("200 OK", r#"{"success": true}"#).await;
        let client = client_for(server);

        client.upload(&pasted(b"PNGDATA")).await.unwrap();

        let request = handle.await.unwrap();
        assert!(request.starts_with("POST /upload "));
        assert!(request.contains("name=\"file\""));
        assert!(request.contains("filename=\"pasted-image-1.png\""));
        assert!(request.contains("PNGDATA"));
        assert!(request.to_ascii_lowercase().contains("cookie: session=abc123"));
    }

    #[tokio::test]
    async fn test_upload_rejected_carries_server_error() {
        let (server, handle) =
            serve_once("200 OK", r#"{"success": false, "error": "disk full"}"#).await;
        let client = client_for(server);

        let err = client.upload(&pasted(b"x")).await.unwrap_err();
        assert_eq!(err.user_message(), "disk full");
        assert_eq!(err.to_string(), "disk full");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_json_error_on_http_error_status() {
        let (server, handle) =
            serve_once("400 Bad Request", r#"{"success": false, "error": "no file"}"#).await;
        let client = client_for(server);

        let err = client.upload(&pasted(b"x")).await.unwrap_err();
        assert_eq!(err.user_message(), "no file");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_non_json_error_is_generic() {
        let (server, handle) = serve_once("500 Internal Server Error", "oops").await;
        let client = client_for(server);

        let err = client.upload(&pasted(b"x")).await.unwrap_err();
        assert!(matches!(err, UploadError::Status(500)));
        assert_eq!(err.user_message(), GENERIC_UPLOAD_FAILURE);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_transport_failure() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}", addr));
        let err = client.upload(&pasted(b"x")).await.unwrap_err();
        assert!(matches!(err, UploadError::Transport(_)));
        assert_eq!(err.user_message(), GENERIC_UPLOAD_FAILURE);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let client = client_for("http://127.0.0.1:9".to_string());
        let upload = PendingUpload {
            selection: 1,
            name: "gone.txt".to_string(),
            size: 3,
            media_type: "text/plain".to_string(),
            source: UploadSource::Path(PathBuf::from("/no/such/gone.txt")),
        };
        let err = client.upload(&upload).await.unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }

    #[tokio::test]
    async fn test_upload_streams_file_from_disk() {
        let (server, handle) = serve_once("200 OK", r#"{"success": true}"#).await;
        let client = client_for(server);

        let dir = std::env::temp_dir().join(format!("chatroom-upload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("big.txt");
        let mut content = "a".repeat(3 * UPLOAD_CHUNK + 17);
        content.push_str("END-OF-FILE");
        std::fs::write(&path, &content).unwrap();

        let upload = PendingUpload {
            selection: 1,
            name: "big.txt".to_string(),
            size: content.len() as u64,
            media_type: "text/plain".to_string(),
            source: UploadSource::Path(path),
        };
        client.upload(&upload).await.unwrap();

        let request = handle.await.unwrap();
        assert!(request.contains("filename=\"big.txt\""));
        assert!(request.contains(&format!("{}END-OF-FILE", "a".repeat(3 * UPLOAD_CHUNK + 17))));
    }

    #[tokio::test]
    async fn test_byte_chunks_cover_all_data() {
        use futures::TryStreamExt;

        let data: Vec<u8> = (0..(2 * UPLOAD_CHUNK + 5)).map(|i| i as u8).collect();
        let chunks: Vec<Vec<u8>> = byte_chunks(Arc::new(data.clone()))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 5);
        assert_eq!(chunks.concat(), data);

        let empty: Vec<Vec<u8>> = byte_chunks(Arc::new(Vec::new())).try_collect().await.unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_rejected_without_reason() {
        let err = UploadError::Rejected(None);
        assert_eq!(err.user_message(), GENERIC_UPLOAD_FAILURE);
        assert_eq!(err.to_string(), GENERIC_UPLOAD_FAILURE);
    }
}
