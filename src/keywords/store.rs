use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    db::{keys, SettingsStore, StoreError},
    domain::KeywordSet,
};

use super::{GeneratedKeywords, GenerationError, KeywordSource};

type KeywordMap = HashMap<String, Arc<KeywordSet>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordOrigin {
    Cached,
    Stored,
    Generated,
}

#[derive(Debug, Clone)]
pub struct KeywordLookup {
    pub keywords: Arc<KeywordSet>,
    pub origin: KeywordOrigin,
}

#[derive(Debug, Clone)]
pub struct Regenerated {
    pub keywords: Arc<KeywordSet>,
    pub raw: String,
    pub storage_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    NothingToCheck,
    InSync,
    StoreRewritten,
    MemoryLoaded,
}

/// Per-task keyword cache backed by the settings store.
///
/// Readers take a snapshot of the whole map; writers build a new map and swap
/// it in. Generation is serialised so concurrent misses for the same task
/// only reach the remote service once.
pub struct KeywordStore {
    cache: RwLock<Arc<KeywordMap>>,
    raw_response: RwLock<String>,
    dirty: AtomicBool,
    generating: Mutex<()>,
    remote_calls: AtomicU64,
    source: Arc<dyn KeywordSource>,
    settings: SettingsStore,
}

impl KeywordStore {
    pub fn new(source: Arc<dyn KeywordSource>, settings: SettingsStore) -> Self {
        Self {
            cache: RwLock::new(Arc::new(KeywordMap::new())),
            raw_response: RwLock::new(String::new()),
            dirty: AtomicBool::new(false),
            generating: Mutex::new(()),
            remote_calls: AtomicU64::new(0),
            source,
            settings,
        }
    }

    /// Replaces the in-memory state with what the store holds.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let stored: Option<HashMap<String, KeywordSet>> =
            self.settings.get(keys::TASK_KEYWORDS).await?;
        let raw: Option<String> = self.settings.get(keys::RAW_RESPONSE).await?;

        let map: KeywordMap = stored
            .unwrap_or_default()
            .into_iter()
            .map(|(task, keywords)| (task, Arc::new(keywords)))
            .collect();
        let count = map.len();
        *self.cache.write() = Arc::new(map);
        if let Some(raw) = raw {
            *self.raw_response.write() = raw;
        }
        Ok(count)
    }

    pub fn cached(&self, task: &str) -> Option<Arc<KeywordSet>> {
        self.cache.read().get(task.trim()).cloned()
    }

    pub fn raw_response(&self) -> String {
        self.raw_response.read().clone()
    }

    pub fn remote_calls(&self) -> u64 {
        self.remote_calls.load(Ordering::Relaxed)
    }

    pub async fn get_or_generate(&self, task: &str) -> Result<KeywordLookup, GenerationError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(GenerationError::MissingTask);
        }
        if let Some(keywords) = self.cached(task) {
            return Ok(lookup(keywords, KeywordOrigin::Cached));
        }

        let _guard = self.generating.lock().await;
        if let Some(keywords) = self.cached(task) {
            return Ok(lookup(keywords, KeywordOrigin::Cached));
        }

        match self.settings.get::<HashMap<String, KeywordSet>>(keys::TASK_KEYWORDS).await {
            Ok(Some(mut stored)) => {
                if let Some(keywords) = stored.remove(task).filter(|k| !k.is_empty()) {
                    let keywords = Arc::new(keywords);
                    self.insert(task, keywords.clone());
                    tracing::info!(target: "keywords", %task, count = keywords.len(), "keywords loaded from store");
                    return Ok(lookup(keywords, KeywordOrigin::Stored));
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(target: "store", error = %err, "failed to read stored keywords");
            }
        }

        let generated = self.fetch(task).await?;
        let keywords = Arc::new(generated.keywords);
        self.insert(task, keywords.clone());
        *self.raw_response.write() = generated.raw;
        if let Err(err) = self.persist().await {
            tracing::warn!(target: "store", error = %err, "keywords kept in memory only");
            self.dirty.store(true, Ordering::Release);
        }
        Ok(lookup(keywords, KeywordOrigin::Generated))
    }

    /// Drops the cached entry and asks the service again. When that fails the
    /// old set is gone from the store too, so later lookups generate afresh.
    pub async fn regenerate(&self, task: &str) -> Result<Regenerated, GenerationError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(GenerationError::MissingTask);
        }

        let _guard = self.generating.lock().await;
        self.remove(task);

        let generated = match self.fetch(task).await {
            Ok(generated) => generated,
            Err(err) => {
                if let Err(store_err) = self.forget_stored(task).await {
                    tracing::warn!(target: "store", %task, error = %store_err, "stale keywords left in store");
                    self.dirty.store(true, Ordering::Release);
                }
                return Err(err);
            }
        };
        let keywords = Arc::new(generated.keywords);
        self.insert(task, keywords.clone());
        *self.raw_response.write() = generated.raw.clone();

        let storage_error = match self.persist().await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(target: "store", error = %err, "regenerated keywords kept in memory only");
                self.dirty.store(true, Ordering::Release);
                Some(err.to_string())
            }
        };

        Ok(Regenerated {
            keywords,
            raw: generated.raw,
            storage_error,
        })
    }

    /// Brings the store and memory back in line for the current task and
    /// retries writes that failed earlier.
    pub async fn reconcile(&self, current_task: &str) -> Result<ReconcileOutcome, StoreError> {
        if self.dirty.swap(false, Ordering::AcqRel) {
            if let Err(err) = self.persist().await {
                self.dirty.store(true, Ordering::Release);
                return Err(err);
            }
            tracing::info!(target: "store", "pending keyword writes flushed");
        }

        let task = current_task.trim();
        if task.is_empty() {
            return Ok(ReconcileOutcome::NothingToCheck);
        }

        let stored: HashMap<String, KeywordSet> = self
            .settings
            .get(keys::TASK_KEYWORDS)
            .await?
            .unwrap_or_default();

        match (self.cached(task), stored.get(task)) {
            (Some(memory), Some(stored)) if memory.as_ref() == stored => Ok(ReconcileOutcome::InSync),
            (Some(_), _) => {
                tracing::warn!(target: "store", %task, "stored keywords out of date, rewriting");
                if let Err(err) = self.persist().await {
                    self.dirty.store(true, Ordering::Release);
                    return Err(err);
                }
                Ok(ReconcileOutcome::StoreRewritten)
            }
            (None, Some(stored)) if !stored.is_empty() => {
                self.insert(task, Arc::new(stored.clone()));
                tracing::info!(target: "store", %task, "keywords restored from store");
                Ok(ReconcileOutcome::MemoryLoaded)
            }
            (None, _) => Ok(ReconcileOutcome::NothingToCheck),
        }
    }

    async fn fetch(&self, task: &str) -> Result<GeneratedKeywords, GenerationError> {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        tracing::info!(target: "keywords", %task, "requesting keywords");

        match self.source.generate(task).await {
            Ok(generated) => {
                tracing::info!(
                    target: "keywords",
                    %task,
                    count = generated.keywords.len(),
                    stage = ?generated.stage,
                    "keywords generated"
                );
                Ok(generated)
            }
            Err(err) => {
                if let Some(raw) = err.raw_response() {
                    *self.raw_response.write() = raw.to_string();
                    if let Err(store_err) = self.settings.set(keys::RAW_RESPONSE, raw).await {
                        tracing::warn!(target: "store", error = %store_err, "failed to keep raw response");
                    }
                }
                tracing::error!(target: "keywords", %task, error = %err, "keyword generation failed");
                Err(err)
            }
        }
    }

    fn insert(&self, task: &str, keywords: Arc<KeywordSet>) {
        let mut cache = self.cache.write();
        let mut next = KeywordMap::clone(&cache);
        next.insert(task.to_string(), keywords);
        *cache = Arc::new(next);
    }

    fn remove(&self, task: &str) {
        let mut cache = self.cache.write();
        if cache.contains_key(task) {
            let mut next = KeywordMap::clone(&cache);
            next.remove(task);
            *cache = Arc::new(next);
        }
    }

    async fn forget_stored(&self, task: &str) -> Result<(), StoreError> {
        let mut stored: HashMap<String, KeywordSet> = self
            .settings
            .get(keys::TASK_KEYWORDS)
            .await?
            .unwrap_or_default();
        if stored.remove(task).is_some() {
            self.settings.set(keys::TASK_KEYWORDS, &stored).await?;
        }
        Ok(())
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let snapshot = self.cache.read().clone();
        let raw = self.raw_response();
        let keywords: BTreeMap<&str, &KeywordSet> = snapshot
            .iter()
            .map(|(task, keywords)| (task.as_str(), keywords.as_ref()))
            .collect();

        self.settings
            .set_many(&[
                (keys::TASK_KEYWORDS, serde_json::to_value(&keywords)?),
                (keys::RAW_RESPONSE, Value::String(raw)),
            ])
            .await
    }
}

fn lookup(keywords: Arc<KeywordSet>, origin: KeywordOrigin) -> KeywordLookup {
    KeywordLookup { keywords, origin }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::AtomicUsize, time::Duration};

    use futures::future::BoxFuture;

    use super::*;
    use crate::{db::init_memory_pool, keywords::ParseStage};

    enum Reply {
        Keywords(&'static [&'static str]),
        Garbage(&'static str),
    }

    struct StubSource {
        calls: AtomicUsize,
        reply: Reply,
    }

    impl StubSource {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl KeywordSource for StubSource {
        fn generate<'a>(
            &'a self,
            task: &'a str,
        ) -> BoxFuture<'a, Result<GeneratedKeywords, GenerationError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                match &self.reply {
                    Reply::Keywords(words) => Ok(GeneratedKeywords {
                        keywords: KeywordSet::from_raw(*words),
                        raw: format!("{task}: {words:?}"),
                        stage: ParseStage::BracketArray,
                    }),
                    Reply::Garbage(raw) => Err(GenerationError::Unparsable {
                        raw: raw.to_string(),
                    }),
                }
            })
        }
    }

    async fn settings() -> SettingsStore {
        SettingsStore::new(init_memory_pool().await.unwrap())
    }

    #[tokio::test]
    async fn miss_generates_once_then_serves_from_cache() {
        let source = StubSource::new(Reply::Keywords(&["rust", "cargo"]));
        let settings = settings().await;
        let store = KeywordStore::new(source.clone(), settings.clone());

        let first = store.get_or_generate("learn rust").await.unwrap();
        assert_eq!(first.origin, KeywordOrigin::Generated);
        let second = store.get_or_generate("  learn rust ").await.unwrap();
        assert_eq!(second.origin, KeywordOrigin::Cached);
        assert_eq!(source.calls(), 1);

        let stored: HashMap<String, Vec<String>> =
            settings.get(keys::TASK_KEYWORDS).await.unwrap().unwrap();
        assert_eq!(stored["learn rust"], vec!["rust", "cargo"]);
        let raw: String = settings.get(keys::RAW_RESPONSE).await.unwrap().unwrap();
        assert!(raw.starts_with("learn rust"));
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_remote_call() {
        let source = StubSource::new(Reply::Keywords(&["rust"]));
        let store = KeywordStore::new(source.clone(), settings().await);

        let (a, b) = tokio::join!(
            store.get_or_generate("learn rust"),
            store.get_or_generate("learn rust")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(source.calls(), 1);
        assert_eq!(store.remote_calls(), 1);
    }

    #[tokio::test]
    async fn stored_keywords_are_used_before_the_service() {
        let source = StubSource::new(Reply::Keywords(&["unused"]));
        let settings = settings().await;
        settings
            .set(
                keys::TASK_KEYWORDS,
                &serde_json::json!({"learn go": ["goroutine", "channel"]}),
            )
            .await
            .unwrap();
        let store = KeywordStore::new(source.clone(), settings);

        let found = store.get_or_generate("learn go").await.unwrap();
        assert_eq!(found.origin, KeywordOrigin::Stored);
        assert_eq!(found.keywords.len(), 2);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn regenerate_bypasses_cache() {
        let source = StubSource::new(Reply::Keywords(&["rust"]));
        let store = KeywordStore::new(source.clone(), settings().await);

        store.get_or_generate("learn rust").await.unwrap();
        let fresh = store.regenerate("learn rust").await.unwrap();
        assert_eq!(source.calls(), 2);
        assert!(fresh.storage_error.is_none());
        assert_eq!(fresh.raw, store.raw_response());
    }

    #[tokio::test]
    async fn failed_regeneration_does_not_resurrect_old_keywords() {
        let settings = settings().await;
        settings
            .set(keys::TASK_KEYWORDS, &serde_json::json!({"learn rust": ["old"], "learn go": ["goroutine"]}))
            .await
            .unwrap();
        let store = KeywordStore::new(StubSource::new(Reply::Garbage("nope")), settings.clone());
        store.load().await.unwrap();

        assert!(store.regenerate("learn rust").await.is_err());
        assert!(store.cached("learn rust").is_none());
        let stored: HashMap<String, KeywordSet> =
            settings.get(keys::TASK_KEYWORDS).await.unwrap().unwrap();
        assert!(!stored.contains_key("learn rust"));
        assert!(stored.contains_key("learn go"));

        let err = store.get_or_generate("learn rust").await.unwrap_err();
        assert!(matches!(err, GenerationError::Unparsable { .. }));
    }

    #[tokio::test]
    async fn unparsable_output_keeps_raw_response() {
        let source = StubSource::new(Reply::Garbage("[]"));
        let settings = settings().await;
        let store = KeywordStore::new(source, settings.clone());

        let err = store.get_or_generate("learn rust").await.unwrap_err();
        assert!(matches!(err, GenerationError::Unparsable { .. }));
        assert!(!err.is_configuration());
        assert_eq!(store.raw_response(), "[]");
        let raw: String = settings.get(keys::RAW_RESPONSE).await.unwrap().unwrap();
        assert_eq!(raw, "[]");
        assert!(store.cached("learn rust").is_none());
    }

    #[tokio::test]
    async fn empty_task_is_a_configuration_error() {
        let store = KeywordStore::new(StubSource::new(Reply::Keywords(&["x"])), settings().await);
        let err = store.get_or_generate("   ").await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn reconcile_rewrites_store_from_memory() {
        let settings = settings().await;
        let store = KeywordStore::new(StubSource::new(Reply::Keywords(&["rust"])), settings.clone());
        store.get_or_generate("learn rust").await.unwrap();

        settings
            .set(keys::TASK_KEYWORDS, &serde_json::json!({}))
            .await
            .unwrap();
        let outcome = store.reconcile("learn rust").await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::StoreRewritten);
        assert_eq!(store.reconcile("learn rust").await.unwrap(), ReconcileOutcome::InSync);
    }

    #[tokio::test]
    async fn reconcile_restores_memory_from_store() {
        let settings = settings().await;
        let store = KeywordStore::new(StubSource::new(Reply::Keywords(&["rust"])), settings.clone());
        settings
            .set(keys::TASK_KEYWORDS, &serde_json::json!({"learn rust": ["ownership"]}))
            .await
            .unwrap();

        let outcome = store.reconcile("learn rust").await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::MemoryLoaded);
        assert_eq!(
            store.cached("learn rust").unwrap().iter().collect::<Vec<_>>(),
            vec!["ownership"]
        );
        assert_eq!(store.reconcile("").await.unwrap(), ReconcileOutcome::NothingToCheck);
    }

    #[tokio::test]
    async fn load_reads_everything_back() {
        let settings = settings().await;
        let store = KeywordStore::new(StubSource::new(Reply::Keywords(&["rust"])), settings.clone());
        store.get_or_generate("learn rust").await.unwrap();

        let reloaded = KeywordStore::new(StubSource::new(Reply::Keywords(&["x"])), settings);
        assert_eq!(reloaded.load().await.unwrap(), 1);
        assert!(reloaded.cached("learn rust").is_some());
        assert_eq!(reloaded.raw_response(), store.raw_response());
    }
}
