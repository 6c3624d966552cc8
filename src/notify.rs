//! Transient, self-expiring user notifications.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use strum_macros::Display;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub expires_at: Instant,
}

/// Shared sink the controllers report operation outcomes to. Cloning yields
/// another handle to the same queue.
#[derive(Debug, Clone)]
pub struct Notifier {
    queue: Arc<Mutex<Vec<Notification>>>,
    ttl: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(message.into(), NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(message.into(), NotificationKind::Error)
    }

    fn push(&self, message: String, kind: NotificationKind) {
        self.queue.lock().push(Notification {
            message,
            kind,
            expires_at: Instant::now() + self.ttl,
        })
    }

    /// Notifications that haven't expired yet, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        let mut queue = self.queue.lock();
        let now = Instant::now();
        queue.retain(|n| n.expires_at > now);
        queue.clone()
    }

    /// Hand out the live notifications and forget about them.
    pub fn drain(&self) -> Vec<Notification> {
        let now = Instant::now();
        self.queue
            .lock()
            .drain(..)
            .filter(|n| n.expires_at > now)
            .collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.active().pop()
    }
}
