use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use thiserror::Error;

/// Storage keys shared with the extension UI.
pub mod keys {
    pub const LAST_TASK: &str = "lastTask";
    pub const TASK_KEYWORDS: &str = "taskKeywords";
    pub const RAW_RESPONSE: &str = "rawGeminiResponse";
    pub const AUTO_CLOSE_ENABLED: &str = "autoCloseEnabled";
    pub const SEARCH_FILTER_ENABLED: &str = "searchFilterEnabled";
    pub const CHANNEL_FILTER_ENABLED: &str = "channelFilterEnabled";
    pub const CUSTOM_WHITELIST: &str = "customWhitelist";
    pub const CUSTOM_BLACKLIST: &str = "customBlacklist";
    pub const CUSTOM_MIXED_DOMAINS: &str = "customMixedDomains";
    pub const HIDDEN_DEFAULT_ITEMS: &str = "hiddenDefaultItems";
    pub const LAST_ERROR: &str = "lastError";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("stored value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// JSON values keyed by name in a single `kv` table.
#[derive(Clone)]
pub struct SettingsStore {
    pool: SqlitePool,
}

impl SettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(r#"SELECT value FROM kv WHERE key = ?1"#)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some((raw,)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_value(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Missing keys are left out of the result.
    pub async fn get_many(&self, keys: &[&str]) -> Result<Vec<(String, Value)>, StoreError> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get_value(key).await? {
                found.push((key.to_string(), value));
            }
        }
        Ok(found)
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(UPSERT).bind(key).bind(raw).execute(&self.pool).await?;
        Ok(())
    }

    /// Writes all entries or none of them.
    pub async fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            let raw = serde_json::to_string(value)?;
            sqlx::query(UPSERT).bind(*key).bind(raw).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let affected = sqlx::query(r#"DELETE FROM kv WHERE key = ?1"#)
            .bind(key)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }
}

const UPSERT: &str = r#"INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP"#;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::init_memory_pool;

    async fn store() -> SettingsStore {
        SettingsStore::new(init_memory_pool().await.unwrap())
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = store().await;
        let value: Option<String> = store.get(keys::LAST_TASK).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let store = store().await;
        store.set(keys::LAST_TASK, "learn rust").await.unwrap();
        store.set(keys::LAST_TASK, "learn go").await.unwrap();
        let value: Option<String> = store.get(keys::LAST_TASK).await.unwrap();
        assert_eq!(value.as_deref(), Some("learn go"));
    }

    #[tokio::test]
    async fn set_many_writes_every_entry() {
        let store = store().await;
        store
            .set_many(&[
                (keys::LAST_TASK, json!("learn rust")),
                (keys::TASK_KEYWORDS, json!(["rust", "cargo"])),
            ])
            .await
            .unwrap();

        let found = store
            .get_many(&[keys::LAST_TASK, keys::TASK_KEYWORDS, keys::LAST_ERROR])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        let keywords: Option<Vec<String>> = store.get(keys::TASK_KEYWORDS).await.unwrap();
        assert_eq!(keywords.unwrap(), vec!["rust", "cargo"]);
    }

    #[tokio::test]
    async fn wrong_shape_is_a_serialization_error() {
        let store = store().await;
        store.set(keys::AUTO_CLOSE_ENABLED, "yes").await.unwrap();
        let err = store.get::<bool>(keys::AUTO_CLOSE_ENABLED).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn remove_reports_whether_anything_was_deleted() {
        let store = store().await;
        store.set(keys::RAW_RESPONSE, "raw").await.unwrap();
        assert!(store.remove(keys::RAW_RESPONSE).await.unwrap());
        assert!(!store.remove(keys::RAW_RESPONSE).await.unwrap());
    }
}
