use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
    task::JoinHandle,
};

use crate::{
    db::keys,
    domain::{Directive, PageFilter, SignalSource},
    infrastructure::shutdown::ShutdownListener,
    lists::{default_entries, CategoryMap, ListKind},
    relevance::PageOutcome,
    tasks::{processor::ScanEvent, scan::Candidate},
};

use super::{
    codec::{read_frame, write_frame, CodecError},
    protocol::{HostRequest, SiteInfo},
    types::AppState,
};

/// Reads requests from the browser and answers each known one exactly once.
///
/// Requests run concurrently; responses and unsolicited scan frames share
/// one outbound channel drained by [`spawn_writer`].
pub struct HostService {
    state: Arc<AppState>,
    outbound: mpsc::Sender<Value>,
}

impl HostService {
    pub fn new(state: Arc<AppState>, outbound: mpsc::Sender<Value>) -> Self {
        Self { state, outbound }
    }

    /// Returns when the browser closes the pipe, the pipe breaks, or shutdown
    /// is requested.
    pub async fn run<R>(&self, mut reader: R, mut shutdown: ShutdownListener) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        tracing::info!(target: "host", "native messaging host ready");
        loop {
            let frame = tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!(target: "host", "shutdown requested, no longer reading requests");
                    break;
                }
                frame = read_frame(&mut reader) => frame,
            };

            match frame {
                Ok(Some(frame)) => self.spawn_request(frame),
                Ok(None) => {
                    tracing::info!(target: "host", "browser closed the connection");
                    break;
                }
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(target: "host", error = %err, "dropping malformed frame");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn spawn_request(&self, frame: Value) {
        let (request_id, request) = match HostRequest::parse(frame) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(target: "host", error = %err, "unknown or malformed request ignored");
                return;
            }
        };

        let state = self.state.clone();
        let outbound = self.outbound.clone();
        tokio::spawn(async move {
            let action = request.action();
            tracing::debug!(target: "host", action, "request received");
            let response = with_request_id(handle_request(&state, request).await, request_id);
            if outbound.send(response).await.is_err() {
                tracing::warn!(target: "host", action, "response dropped, writer is gone");
            }
        });
    }
}

/// Drains the outbound channel onto the native-messaging pipe.
pub fn spawn_writer<W>(mut writer: W, mut frames: mpsc::Receiver<Value>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            match write_frame(&mut writer, &frame).await {
                Ok(()) => {}
                Err(err @ CodecError::TooLarge { .. }) => {
                    tracing::error!(target: "host", error = %err, "outbound frame dropped");
                }
                Err(err) => {
                    tracing::error!(target: "host", error = %err, "native messaging pipe closed");
                    break;
                }
            }
        }
    })
}

fn with_request_id(mut response: Value, request_id: Option<Value>) -> Value {
    if let (Some(id), Some(object)) = (request_id, response.as_object_mut()) {
        object.insert("requestId".to_string(), id);
    }
    response
}

pub async fn handle_request(state: &AppState, request: HostRequest) -> Value {
    match request {
        HostRequest::SetTask { task } => set_task(state, &task).await,
        HostRequest::GetTaskAndApiKey => json!({
            "success": true,
            "task": state.session.task(),
            "apiKey": if state.has_credential { "configured" } else { "" },
            "rawGeminiResponse": state.keywords.raw_response(),
        }),
        HostRequest::ForceGenerateKeywords { task } => force_generate(state, &task).await,
        HostRequest::CheckRelevance {
            url,
            task,
            site_info,
        } => check_relevance(state, url, task, site_info).await,
        HostRequest::CheckPageRelevance { site_info } => check_page_relevance(state, site_info).await,
        HostRequest::GetFilterLists => filter_lists(state),
        HostRequest::ReloadCustomLists => {
            let _writes = state.lists.lock_writes().await;
            match state.read_lists().await {
                Ok(lists) => {
                    state.lists.replace(lists);
                    tracing::info!(target: "lists", "custom lists reloaded");
                    json!({ "success": true })
                }
                Err(err) => {
                    tracing::warn!(target: "store", error = %err, "failed to reload custom lists");
                    json!({ "success": false, "error": err.to_string() })
                }
            }
        }
        HostRequest::SaveCustomLists {
            custom_whitelist,
            custom_blacklist,
            custom_mixed_domains,
        } => save_custom_lists(state, custom_whitelist, custom_blacklist, custom_mixed_domains).await,
        HostRequest::HideDefaultItem {
            domain,
            category,
            list_type,
        } => hide_default_item(state, &domain, &category, list_type).await,
        HostRequest::GetRawGeminiResponse => json!({
            "success": true,
            "rawGeminiResponse": state.keywords.raw_response(),
        }),
        HostRequest::SetAutoCloseEnabled { enabled } => {
            state.session.set_auto_close(enabled);
            let storage_error = state.persist(keys::AUTO_CLOSE_ENABLED, &enabled).await;
            tracing::info!(target: "host", enabled, "auto-close preference updated");
            success_with(storage_error)
        }
        HostRequest::SetFilterPreference { page_type, enabled } => {
            if state.session.set_filter_enabled(page_type, enabled) {
                state.reset_scans("filter preference changed");
            }
            let key = match page_type {
                PageFilter::Search => keys::SEARCH_FILTER_ENABLED,
                PageFilter::Channel => keys::CHANNEL_FILTER_ENABLED,
            };
            success_with(state.persist(key, &enabled).await)
        }
        HostRequest::ScanVideos {
            session_id,
            page_url,
            trigger,
            viewport,
            candidates,
        } => {
            let accepted = candidates.len();
            let event = ScanEvent {
                session_id: session_id.clone(),
                page_url,
                trigger,
                viewport,
                candidates: candidates.into_iter().map(Candidate::from).collect(),
            };
            if state.scan_events.send(event).await.is_err() {
                return json!({ "success": false, "error": "scan processor is not running" });
            }
            json!({
                "success": true,
                "accepted": accepted,
                "stats": state.scans.get(&session_id).map(|scheduler| scheduler.stats()),
            })
        }
        HostRequest::OverrideVideo {
            session_id,
            element_id,
        } => {
            let directive = state
                .scans
                .get_or_create(&session_id)
                .override_element(&element_id);
            json!({ "success": true, "id": directive.id, "directive": directive.directive })
        }
        HostRequest::ResetScan { session_id } => {
            let forgotten = state.scans.reset(&session_id).unwrap_or(0);
            tracing::info!(target: "scan", session = %session_id, forgotten, "scan session reset");
            json!({ "success": true, "forgotten": forgotten })
        }
        HostRequest::GetLastError => json!({
            "success": true,
            "lastError": state.diagnostics.last_error(),
        }),
        HostRequest::GetStats { session_id } => {
            let scans = match session_id {
                Some(id) => json!(state.scans.get(&id).map(|scheduler| scheduler.stats())),
                None => json!(state.scans.snapshot()),
            };
            json!({
                "success": true,
                "task": state.session.task(),
                "remoteCalls": state.keywords.remote_calls(),
                "scans": scans,
                "lastError": state.diagnostics.last_error(),
            })
        }
    }
}

fn success_with(storage_error: Option<String>) -> Value {
    match storage_error {
        Some(err) => json!({ "success": true, "storageError": err }),
        None => json!({ "success": true }),
    }
}

async fn set_task(state: &AppState, task: &str) -> Value {
    let task = task.trim();
    if state.session.set_task(task).is_some() {
        tracing::info!(target: "host", %task, "task changed");
        state.reset_scans("task changed");
    }
    success_with(state.persist(keys::LAST_TASK, task).await)
}

async fn force_generate(state: &AppState, task: &str) -> Value {
    let task = task.trim();
    if task.is_empty() {
        return json!({ "success": false, "error": "Please enter a task first." });
    }
    if state.session.set_task(task).is_some() {
        state.reset_scans("task changed");
    }
    let task_storage_error = state.persist(keys::LAST_TASK, task).await;

    match state.keywords.regenerate(task).await {
        Ok(regenerated) => {
            let mut response = json!({
                "success": true,
                "keywordCount": regenerated.keywords.len(),
                "rawResponse": regenerated.raw,
            });
            if let Some(err) = regenerated.storage_error.or(task_storage_error) {
                response["storageError"] = json!(err);
            }
            response
        }
        Err(err) => {
            if !err.is_configuration() {
                state
                    .diagnostics
                    .record("keyword regeneration failed", Some(err.to_string()))
                    .await;
            }
            json!({
                "success": false,
                "error": err.to_string(),
                "rawResponse": state.keywords.raw_response(),
            })
        }
    }
}

async fn check_relevance(
    state: &AppState,
    url: String,
    task: Option<String>,
    site_info: SiteInfo,
) -> Value {
    let task = task
        .filter(|task| !task.trim().is_empty())
        .unwrap_or_else(|| state.session.task());
    let signal = site_info.into_page(url).extract_signal();

    match state.engine.check_page(&task, &signal).await {
        Ok(outcome) => page_response(state, outcome, state.session.auto_close()),
        Err(err) => json!({ "success": false, "error": err.to_string() }),
    }
}

/// Content-script check for the active tab. Results computed for a task that
/// was replaced in the meantime are not applied.
async fn check_page_relevance(state: &AppState, site_info: SiteInfo) -> Value {
    if !state.session.auto_close() {
        return json!({ "success": true, "message": "Auto-close disabled" });
    }
    let Some(url) = site_info.url.clone().filter(|url| !url.trim().is_empty()) else {
        return json!({ "success": false, "error": "Missing page URL" });
    };

    let (task, stamp) = state.session.current();
    let signal = site_info.into_page(url).extract_signal();
    let outcome = match state.engine.check_page(&task, &signal).await {
        Ok(outcome) => outcome,
        Err(err) => return json!({ "success": false, "error": err.to_string() }),
    };

    if !state.session.is_current(stamp) {
        tracing::info!(target: "relevance", url = %signal.url, "task changed during check, verdict dropped");
        return json!({
            "success": false,
            "stale": true,
            "error": "Task changed while the page was being checked",
        });
    }
    page_response(state, outcome, true)
}

fn page_response(state: &AppState, outcome: PageOutcome, auto_close: bool) -> Value {
    let verdict = &outcome.verdict;
    let directive = Directive::for_page(verdict, auto_close);
    let mut response = json!({
        "success": true,
        "isRelevant": verdict.is_relevant,
        "score": verdict.score,
        "isLowConfidence": verdict.is_low_confidence,
        "matchedTerms": verdict.matched_terms,
        "matchCount": verdict.match_count,
        "source": verdict.source,
        "message": verdict.message(),
        "directive": directive,
    });
    if directive == Directive::CloseHostSurface {
        response["autoCloseDelayMs"] = json!(state.config.relevance.auto_close_delay.as_millis() as u64);
    }
    if let Some(found) = outcome.list_match {
        response["listMatch"] = json!(found);
    }
    if let Some(err) = outcome.keyword_error {
        response["keywordError"] = json!(err);
    }
    response
}

fn filter_lists(state: &AppState) -> Value {
    let lists = state.lists.snapshot();
    json!({
        "success": true,
        "defaultWhitelist": lists.visible_defaults(ListKind::Whitelist),
        "defaultBlacklist": lists.visible_defaults(ListKind::Blacklist),
        "defaultMixedDomains": lists.visible_defaults(ListKind::Mixed),
        "customWhitelist": lists.custom.custom_whitelist,
        "customBlacklist": lists.custom.custom_blacklist,
        "customMixedDomains": lists.custom.custom_mixed_domains,
        "hiddenDefaultItems": lists.hidden,
    })
}

async fn save_custom_lists(
    state: &AppState,
    whitelist: Option<CategoryMap>,
    blacklist: Option<CategoryMap>,
    mixed: Option<CategoryMap>,
) -> Value {
    let _writes = state.lists.lock_writes().await;
    let mut next = (*state.lists.snapshot()).clone();
    let mut writes = Vec::new();

    for (key, update, slot) in [
        (keys::CUSTOM_WHITELIST, whitelist, &mut next.custom.custom_whitelist),
        (keys::CUSTOM_BLACKLIST, blacklist, &mut next.custom.custom_blacklist),
        (keys::CUSTOM_MIXED_DOMAINS, mixed, &mut next.custom.custom_mixed_domains),
    ] {
        if let Some(update) = update {
            let cleaned = clean_categories(update);
            writes.push((key, json!(cleaned)));
            *slot = cleaned;
        }
    }

    if writes.is_empty() {
        return json!({ "success": false, "error": "No lists supplied" });
    }
    if let Err(err) = state.settings.set_many(&writes).await {
        tracing::warn!(target: "store", error = %err, "failed to save custom lists");
        return json!({ "success": false, "error": err.to_string() });
    }
    state.lists.replace(next);
    tracing::info!(target: "lists", updated = writes.len(), "custom lists saved");
    json!({ "success": true })
}

fn clean_categories(map: CategoryMap) -> CategoryMap {
    map.into_iter()
        .filter_map(|(category, domains)| {
            let category = category.trim().to_string();
            if category.is_empty() {
                return None;
            }
            let domains = domains
                .into_iter()
                .map(|domain| domain.trim().to_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect();
            Some((category, domains))
        })
        .collect()
}

async fn hide_default_item(state: &AppState, domain: &str, category: &str, kind: ListKind) -> Value {
    let domain = domain.trim();
    let is_default = default_entries(kind)
        .get(category)
        .is_some_and(|domains| domains.iter().any(|entry| entry == domain));
    if !is_default {
        return json!({ "success": false, "error": "Not a default list entry" });
    }

    let _writes = state.lists.lock_writes().await;
    let mut next = (*state.lists.snapshot()).clone();
    let changed = next.hidden.hide(kind, category, domain);
    if changed {
        if let Err(err) = state.settings.set(keys::HIDDEN_DEFAULT_ITEMS, &next.hidden).await {
            tracing::warn!(target: "store", error = %err, "failed to save hidden items");
            return json!({ "success": false, "error": err.to_string() });
        }
        state.lists.replace(next);
        tracing::info!(target: "lists", %domain, %category, list = ?kind, "default entry hidden");
    }
    json!({ "success": true, "changed": changed })
}
