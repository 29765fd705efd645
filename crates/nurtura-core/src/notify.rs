// ── User-facing notifications ──
//
// Mutations report their outcome through a `Notifier`. The dashboard showed
// toasts; here the sink is pluggable: a broadcast channel for front ends
// that render them, or plain tracing events.

use tokio::sync::broadcast;
use tracing::{error, info};

const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Sink for mutation outcomes.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Fans notifications out to any number of receivers.
pub struct ChannelNotifier {
    tx: broadcast::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // No receivers is not an error.
        let _ = self.tx.send(notification);
    }
}

/// Emits notifications as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => info!("{}", notification.message),
            NotificationLevel::Error => error!("{}", notification.message),
        }
    }
}
