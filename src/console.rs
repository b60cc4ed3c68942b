//! Line-oriented output for the `listen` command.

use anyhow::Result;

use crate::config::Config;
use crate::models::PresenceEntry;
use crate::realtime::{socket_url, RealtimeChannel};
use crate::view::{ChatSurface, ChatView, FeedEntry, PendingUpload, Severity};

/// Prints feed entries and notices to stdout, one per line.
pub struct ConsoleSurface;

impl ChatSurface for ConsoleSurface {
    fn append_entry(&mut self, entry: FeedEntry) {
        println!("{}", entry);
    }

    fn replace_roster(&mut self, users: &[PresenceEntry]) {
        println!("-- online: {} --", roster_line(users));
    }

    fn show_notification(&mut self, text: &str, severity: Severity) {
        match severity {
            Severity::Info => println!("[info] {}", text),
            Severity::Error => println!("[error] {}", text),
        }
    }

    fn show_preview(&mut self, _upload: &PendingUpload) {}

    fn hide_preview(&mut self) {}
}

/// `alice, root (admin)`, or `nobody` for an empty roster.
fn roster_line(users: &[PresenceEntry]) -> String {
    if users.is_empty() {
        return "nobody".to_string();
    }
    users
        .iter()
        .map(|u| {
            if u.is_admin {
                format!("{} (admin)", u.username)
            } else {
                u.username.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print the room's events until Ctrl+C.
pub async fn listen(config: &Config) -> Result<()> {
    let url = socket_url(&config.server_url)?;
    let (_channel, mut events) = RealtimeChannel::spawn(url, config.session_cookie.clone());
    let mut view = ChatView::new(config.username.clone().unwrap_or_default(), ConsoleSurface);

    tracing::info!("Listening on {} (Ctrl+C to stop)", config.server_url);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => view.dispatch(event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_line() {
        let users = vec![
            PresenceEntry {
                username: "alice".to_string(),
                is_admin: false,
            },
            PresenceEntry {
                username: "root".to_string(),
                is_admin: true,
            },
        ];
        assert_eq!(roster_line(&users), "alice, root (admin)");
        assert_eq!(roster_line(&[]), "nobody");
    }
}
