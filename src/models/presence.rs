//! Presence-related models

use serde::{Deserialize, Serialize};

/// One online user as reported by a `user_list` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl PresenceEntry {
    /// Single uppercase letter used as the roster avatar.
    pub fn initial(&self) -> String {
        self.username
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// Payload of the `user_list` event.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserListPayload {
    #[serde(default)]
    pub users: Vec<PresenceEntry>,
}
