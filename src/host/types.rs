use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    config::AppConfig,
    db::{keys, SettingsStore, StoreError},
    domain::{PageFilter, TaskSession},
    infrastructure::diagnostics::Diagnostics,
    keywords::KeywordStore,
    lists::{CustomLists, FilterLists, HiddenItems, SharedLists},
    relevance::RelevanceEngine,
    tasks::processor::{ScanEvent, ScanSessions},
};

/// Everything a request handler can touch, built once at startup.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub settings: SettingsStore,
    pub session: Arc<TaskSession>,
    pub keywords: Arc<KeywordStore>,
    pub lists: Arc<SharedLists>,
    pub engine: Arc<RelevanceEngine>,
    pub diagnostics: Arc<Diagnostics>,
    pub scans: Arc<ScanSessions>,
    pub scan_events: mpsc::Sender<ScanEvent>,
    pub has_credential: bool,
}

impl AppState {
    /// Pulls task, toggles, lists and keywords from the store. Any failure is
    /// logged and the defaults stay in place.
    pub async fn load_essential_data(&self) {
        const ESSENTIAL: &[&str] = &[
            keys::LAST_TASK,
            keys::AUTO_CLOSE_ENABLED,
            keys::SEARCH_FILTER_ENABLED,
            keys::CHANNEL_FILTER_ENABLED,
        ];

        match self.settings.get_many(ESSENTIAL).await {
            Ok(found) => {
                for (key, value) in found {
                    self.apply_setting(&key, value);
                }
            }
            Err(err) => {
                tracing::warn!(target: "store", error = %err, "failed to load settings, using defaults");
            }
        }

        match self.read_lists().await {
            Ok(lists) => self.lists.replace(lists),
            Err(err) => {
                tracing::warn!(target: "store", error = %err, "failed to load custom lists");
            }
        }

        match self.keywords.load().await {
            Ok(count) => tracing::info!(target: "keywords", tasks = count, "keyword cache loaded"),
            Err(err) => {
                tracing::warn!(target: "store", error = %err, "failed to load keyword cache");
            }
        }

        self.diagnostics.load().await;
        tracing::info!(target: "host", task = %self.session.task(), "essential data loaded");
    }

    fn apply_setting(&self, key: &str, value: Value) {
        match key {
            keys::LAST_TASK => {
                if let Some(task) = decode::<String>(key, value) {
                    self.session.set_task(&task);
                }
            }
            keys::AUTO_CLOSE_ENABLED => {
                if let Some(enabled) = decode(key, value) {
                    self.session.set_auto_close(enabled);
                }
            }
            keys::SEARCH_FILTER_ENABLED => {
                if let Some(enabled) = decode(key, value) {
                    self.session.set_filter_enabled(PageFilter::Search, enabled);
                }
            }
            keys::CHANNEL_FILTER_ENABLED => {
                if let Some(enabled) = decode(key, value) {
                    self.session.set_filter_enabled(PageFilter::Channel, enabled);
                }
            }
            _ => {}
        }
    }

    /// Reads the list overlays from the store without applying them.
    pub async fn read_lists(&self) -> Result<FilterLists, StoreError> {
        let custom = CustomLists {
            custom_whitelist: self.settings.get(keys::CUSTOM_WHITELIST).await?.unwrap_or_default(),
            custom_blacklist: self.settings.get(keys::CUSTOM_BLACKLIST).await?.unwrap_or_default(),
            custom_mixed_domains: self
                .settings
                .get(keys::CUSTOM_MIXED_DOMAINS)
                .await?
                .unwrap_or_default(),
        };
        let hidden: HiddenItems = self
            .settings
            .get(keys::HIDDEN_DEFAULT_ITEMS)
            .await?
            .unwrap_or_default();
        Ok(FilterLists { custom, hidden })
    }

    /// Forgets every element verdict. Called when the task or a filter
    /// preference changes.
    pub fn reset_scans(&self, reason: &str) {
        let sessions = self.scans.reset_all();
        if sessions > 0 {
            tracing::info!(target: "scan", reason, sessions, "scan sessions reset");
        }
    }

    /// Writes one value; a failure is logged and handed back as a message.
    pub async fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Option<String> {
        match self.settings.set(key, value).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(target: "store", key, error = %err, "failed to persist setting");
                Some(err.to_string())
            }
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::warn!(target: "store", key, error = %err, "ignoring malformed setting");
            None
        }
    }
}
