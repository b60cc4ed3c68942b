//! Single-slot notification banner state.

use std::time::{Duration, Instant};

/// How long a notification stays visible after the most recent `show`.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

/// Notification class. Only affects styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// A visible notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub text: String,
    pub severity: Severity,
    shown_at: Instant,
}

impl Notification {
    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= NOTIFICATION_TTL
    }
}

/// Holds at most one notification. A new `show` replaces the current one and
/// restarts the timer; nothing is queued.
#[derive(Debug, Default)]
pub struct NotificationSlot {
    current: Option<Notification>,
}

impl NotificationSlot {
    pub fn show(&mut self, text: impl Into<String>, severity: Severity, now: Instant) {
        self.current = Some(Notification {
            text: text.into(),
            severity,
            shown_at: now,
        });
    }

    /// Hide the notification once its time is up. Returns true if it was hidden.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.current.as_ref().is_some_and(|n| n.expired(now)) {
            self.current = None;
            return true;
        }
        false
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hides_after_ttl() {
        let t0 = Instant::now();
        let mut slot = NotificationSlot::default();
        slot.show("Connected", Severity::Info, t0);

        assert!(!slot.tick(t0 + Duration::from_millis(2999)));
        assert_eq!(slot.current().unwrap().text, "Connected");

        assert!(slot.tick(t0 + NOTIFICATION_TTL));
        assert!(slot.current().is_none());
    }

    #[test]
    fn test_new_show_replaces_and_restarts_timer() {
        let t0 = Instant::now();
        let mut slot = NotificationSlot::default();
        slot.show("first", Severity::Info, t0);
        slot.show("second", Severity::Error, t0 + Duration::from_secs(2));

        let current = slot.current().unwrap();
        assert_eq!(current.text, "second");
        assert_eq!(current.severity, Severity::Error);

        // The first timer would have fired at t0+3s; the second one has not.
        assert!(!slot.tick(t0 + Duration::from_secs(4)));
        assert!(slot.tick(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_tick_on_empty_slot() {
        let mut slot = NotificationSlot::default();
        assert!(!slot.tick(Instant::now()));
    }
}
