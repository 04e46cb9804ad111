use std::fmt;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    /// A precondition failed before any request was sent
    Validation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub operation: String,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.kind {
            NotificationKind::Success => "✓",
            NotificationKind::Error => "✗",
            NotificationKind::Validation => "!",
        };
        write!(f, "{} {}: {}", marker, self.operation, self.message)
    }
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, operation: &str, message: impl Into<String>) {
        let message = message.into();
        info!("{}: {}", operation, message);
        self.publish(NotificationKind::Success, operation, message);
    }

    /// Report a failed mutation with the underlying error message.
    pub fn error(&self, operation: &str, cause: impl fmt::Display) {
        let message = format!("{:#}", cause);
        error!("{} failed: {}", operation, message);
        self.publish(NotificationKind::Error, operation, message);
    }

    pub fn validation(&self, operation: &str, message: impl Into<String>) {
        let message = message.into();
        warn!("{} rejected: {}", operation, message);
        self.publish(NotificationKind::Validation, operation, message);
    }

    fn publish(&self, kind: NotificationKind, operation: &str, message: String) {
        // No receivers is fine: the log line above is the record.
        let _ = self.tx.send(Notification {
            kind,
            operation: operation.to_string(),
            message,
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
