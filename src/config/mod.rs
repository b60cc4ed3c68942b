//! Configuration storage

use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_UPLOAD_PATH: &str = "/upload";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat server base URL (HTTP); the WebSocket URL is derived from it
    pub server_url: String,
    /// Username this client is logged in as (marks own messages)
    pub username: Option<String>,
    /// Path of the upload endpoint, relative to `server_url`
    pub upload_path: String,
    /// Raw `Cookie` header value carrying the server session
    pub session_cookie: Option<String>,
    /// Where downloaded files go (defaults to the user's download dir)
    pub download_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            username: None,
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            session_cookie: None,
            download_dir: None,
        }
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "chatroom-tui", "chatroom-tui")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // The session cookie is a credential
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Apply per-run overrides from the command line.
    pub fn with_overrides(mut self, server: Option<String>, user: Option<String>) -> Self {
        if let Some(server) = server {
            self.server_url = server;
        }
        if let Some(user) = user {
            self.username = Some(user);
        }
        self
    }

    /// The local identity, required for anything that renders the feed.
    pub fn require_username(&self) -> Result<String> {
        self.username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .context("No username configured. Pass --user or run 'chatroom config --user NAME'.")
    }

    /// Download directory: configured, else the platform download dir, else cwd.
    pub fn download_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.download_dir {
            return dir.clone();
        }
        UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(|d| d.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file_uses_defaults() {
        let config = Config::parse("username = \"alice\"\n").unwrap();
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.upload_path, DEFAULT_UPLOAD_PATH);
        assert!(config.session_cookie.is_none());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = Config {
            server_url: "https://chat.example.com".to_string(),
            username: Some("bob".to_string()),
            upload_path: "/api/upload".to_string(),
            session_cookie: Some("session=abc".to_string()),
            download_dir: Some(PathBuf::from("/tmp/dl")),
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back = Config::parse(&text).unwrap();
        assert_eq!(back.server_url, config.server_url);
        assert_eq!(back.session_cookie, config.session_cookie);
        assert_eq!(back.download_dir, config.download_dir);
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(Some("http://h:1".into()), Some("carol".into()));
        assert_eq!(config.server_url, "http://h:1");
        assert_eq!(config.require_username().unwrap(), "carol");
    }

    #[test]
    fn test_require_username_rejects_blank() {
        let mut config = Config::default();
        assert!(config.require_username().is_err());
        config.username = Some("  ".to_string());
        assert!(config.require_username().is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        assert!(Config::parse("server_url = [").is_err());
    }
}
