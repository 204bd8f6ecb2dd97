//! Progress notifications
//!
//! The engine reports human-readable progress through an injected
//! [`Notifier`]. Notifications are fire-and-forget and never influence
//! control flow.

use std::sync::Arc;

use parking_lot::Mutex;
use shared::Severity;

/// Receiver of progress notifications (UI status bar, log, ...)
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Shared notifier handle passed to every engine component
pub type SharedNotifier = Arc<dyn Notifier>;

/// Notifier that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => {
                tracing::info!(target: "label_status", severity = %severity, "{}", message)
            }
            Severity::Warning => {
                tracing::warn!(target: "label_status", severity = %severity, "{}", message)
            }
            Severity::Error => {
                tracing::error!(target: "label_status", severity = %severity, "{}", message)
            }
        }
    }
}

/// One recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

/// Notifier that keeps everything it receives
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Messages recorded with the given severity, in order
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.severity == severity)
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.notices.lock().push(Notice {
            message: message.to_string(),
            severity,
        });
    }
}
