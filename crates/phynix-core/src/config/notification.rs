//! Notification configuration.

use serde::{Deserialize, Serialize};

/// Share notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Whether share notifications are sent at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Sender address recorded on outgoing notifications.
    #[serde(default = "default_from_email")]
    pub from_email: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            from_email: default_from_email(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_from_email() -> String {
    "noreply@phynixdrive.com".to_string()
}
