//! HTTP client for the chat server
//!
//! Wraps reqwest::Client with the server base URL and session cookie.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use url::Url;

use crate::config::Config;

/// Client for the chat server's HTTP endpoints.
pub struct ChatClient {
    pub(super) http: reqwest::Client,
    base: Url,
    pub(super) upload_url: Url,
    cookie: Option<String>,
}

impl ChatClient {
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(&config.server_url)
            .with_context(|| format!("Invalid server URL '{}'", config.server_url))?;
        let upload_url = base
            .join(&config.upload_path)
            .with_context(|| format!("Invalid upload path '{}'", config.upload_path))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            upload_url,
            cookie: config.session_cookie.clone(),
        })
    }

    /// Resolve a URL from a message (often server-relative) against the base.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        self.base
            .join(url)
            .with_context(|| format!("Invalid file URL '{}'", url))
    }

    /// Attach the session cookie, if configured.
    pub(super) fn with_session(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.cookie {
            Some(ref cookie) => req.header(reqwest::header::COOKIE, cookie),
            None => req,
        }
    }

    /// GET a file referenced by a message and return its bytes.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.resolve(url)?;
        tracing::debug!("GET {}", url);

        let resp = self
            .with_session(self.http.get(url.clone()))
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        let resp = check_response(resp, url.as_str()).await?;

        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(bytes.to_vec())
    }

    /// Download a file into `dir`, never overwriting an existing file.
    pub async fn download(&self, url: &str, filename: &str, dir: &Path) -> Result<PathBuf> {
        let bytes = self.fetch_bytes(url).await?;

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = unique_path(dir, filename);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!("Downloaded {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        bail!(
            "HTTP {} for {}. Session may have expired -- update the session cookie.",
            status.as_u16(),
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}

/// `dir/name`, or `dir/stem (N).ext` if that already exists.
///
/// Only the final component of `filename` is used.
fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "download".to_string());

    let candidate = dir.join(&name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (name.clone(), String::new()),
    };
    (1..)
        .map(|n| dir.join(format!("{} ({}){}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn client(server: &str) -> ChatClient {
        let config = Config {
            server_url: server.to_string(),
            ..Config::default()
        };
        ChatClient::new(&config).unwrap()
    }

    #[test]
    fn test_upload_url_from_config() {
        let c = client("http://chat.local:5000/");
        assert_eq!(c.upload_url.as_str(), "http://chat.local:5000/upload");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let c = client("http://chat.local:5000");
        assert_eq!(
            c.resolve("/uploads/a.png").unwrap().as_str(),
            "http://chat.local:5000/uploads/a.png"
        );
        assert_eq!(
            c.resolve("https://cdn.example.com/x.zip").unwrap().as_str(),
            "https://cdn.example.com/x.zip"
        );
    }

    #[test]
    fn test_invalid_server_url() {
        let config = Config {
            server_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(ChatClient::new(&config).is_err());
    }

    #[test]
    fn test_unique_path_avoids_overwrite() {
        let dir = std::env::temp_dir().join(format!("chatroom-unique-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let _ = fs::remove_file(dir.join("report.pdf"));
        let _ = fs::remove_file(dir.join("report (1).pdf"));

        assert_eq!(unique_path(&dir, "report.pdf"), dir.join("report.pdf"));
        fs::write(dir.join("report.pdf"), b"x").unwrap();
        assert_eq!(unique_path(&dir, "report.pdf"), dir.join("report (1).pdf"));
    }

    #[test]
    fn test_unique_path_strips_directories() {
        let dir = std::env::temp_dir().join(format!("chatroom-strip-{}", std::process::id()));
        assert_eq!(unique_path(&dir, "../../etc/passwd"), dir.join("passwd"));
        assert_eq!(unique_path(&dir, ""), dir.join("download"));
    }
}
