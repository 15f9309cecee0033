use chrono::Utc;
use parking_lot::RwLock;

use crate::{
    db::{keys, SettingsStore},
    domain::LastError,
};

/// Keeps the most recent background failure for the diagnostics view.
pub struct Diagnostics {
    last_error: RwLock<Option<LastError>>,
    settings: SettingsStore,
}

impl Diagnostics {
    pub fn new(settings: SettingsStore) -> Self {
        Self {
            last_error: RwLock::new(None),
            settings,
        }
    }

    pub async fn load(&self) {
        match self.settings.get::<LastError>(keys::LAST_ERROR).await {
            Ok(found) => *self.last_error.write() = found,
            Err(err) => {
                tracing::warn!(target: "store", error = %err, "failed to read last error");
            }
        }
    }

    /// Logs the failure, remembers it, and writes it to the store if possible.
    pub async fn record(&self, message: impl Into<String>, details: Option<String>) {
        let entry = LastError {
            message: message.into(),
            details,
            time: Utc::now(),
        };
        tracing::error!(
            target: "host",
            message = %entry.message,
            details = entry.details.as_deref().unwrap_or(""),
            "recorded error"
        );
        *self.last_error.write() = Some(entry.clone());

        if let Err(err) = self.settings.set(keys::LAST_ERROR, &entry).await {
            tracing::warn!(target: "store", error = %err, "failed to persist last error");
        }
    }

    pub fn last_error(&self) -> Option<LastError> {
        self.last_error.read().clone()
    }
}
