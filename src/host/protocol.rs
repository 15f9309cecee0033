use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    domain::{GenericPage, PageFilter, ShortCard, SignalSource, VideoCard},
    lists::{CategoryMap, ListKind},
    tasks::scan::{Bounds, Candidate, ScanTrigger, Viewport},
};

/// Requests the extension can send. The `action` field selects the variant.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostRequest {
    SetTask {
        task: String,
    },
    GetTaskAndApiKey,
    ForceGenerateKeywords {
        task: String,
    },
    CheckRelevance {
        url: String,
        #[serde(default)]
        task: Option<String>,
        #[serde(default)]
        site_info: SiteInfo,
    },
    CheckPageRelevance {
        site_info: SiteInfo,
    },
    GetFilterLists,
    ReloadCustomLists,
    SaveCustomLists {
        #[serde(default)]
        custom_whitelist: Option<CategoryMap>,
        #[serde(default)]
        custom_blacklist: Option<CategoryMap>,
        #[serde(default)]
        custom_mixed_domains: Option<CategoryMap>,
    },
    HideDefaultItem {
        domain: String,
        category: String,
        list_type: ListKind,
    },
    GetRawGeminiResponse,
    SetAutoCloseEnabled {
        enabled: bool,
    },
    SetFilterPreference {
        page_type: PageFilter,
        enabled: bool,
    },
    ScanVideos {
        session_id: String,
        page_url: String,
        #[serde(default = "default_trigger")]
        trigger: ScanTrigger,
        viewport: Viewport,
        #[serde(default)]
        candidates: Vec<CandidatePayload>,
    },
    OverrideVideo {
        session_id: String,
        element_id: String,
    },
    ResetScan {
        session_id: String,
    },
    GetLastError,
    GetStats {
        #[serde(default)]
        session_id: Option<String>,
    },
}

fn default_trigger() -> ScanTrigger {
    ScanTrigger::Mutation
}

impl HostRequest {
    /// Splits a raw frame into its request id and the typed request.
    pub fn parse(frame: Value) -> Result<(Option<Value>, Self), serde_json::Error> {
        let request_id = frame.get("requestId").cloned();
        let request = serde_json::from_value(frame)?;
        Ok((request_id, request))
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::SetTask { .. } => "setTask",
            Self::GetTaskAndApiKey => "getTaskAndApiKey",
            Self::ForceGenerateKeywords { .. } => "forceGenerateKeywords",
            Self::CheckRelevance { .. } => "checkRelevance",
            Self::CheckPageRelevance { .. } => "checkPageRelevance",
            Self::GetFilterLists => "getFilterLists",
            Self::ReloadCustomLists => "reloadCustomLists",
            Self::SaveCustomLists { .. } => "saveCustomLists",
            Self::HideDefaultItem { .. } => "hideDefaultItem",
            Self::GetRawGeminiResponse => "getRawGeminiResponse",
            Self::SetAutoCloseEnabled { .. } => "setAutoCloseEnabled",
            Self::SetFilterPreference { .. } => "setFilterPreference",
            Self::ScanVideos { .. } => "scanVideos",
            Self::OverrideVideo { .. } => "overrideVideo",
            Self::ResetScan { .. } => "resetScan",
            Self::GetLastError => "getLastError",
            Self::GetStats { .. } => "getStats",
        }
    }
}

/// What a content script captured about the current page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub page_content: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

impl SiteInfo {
    pub fn into_page(self, url: String) -> GenericPage {
        GenericPage {
            url,
            title: self.title,
            content: self.page_content,
            html: self.html,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    #[default]
    Video,
    Short,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePayload {
    pub id: String,
    #[serde(default)]
    pub kind: CardKind,
    pub bounds: Bounds,
    #[serde(flatten)]
    pub card: VideoCard,
}

impl From<CandidatePayload> for Candidate {
    fn from(payload: CandidatePayload) -> Self {
        let source: Arc<dyn SignalSource> = match payload.kind {
            CardKind::Video => Arc::new(payload.card),
            CardKind::Short => Arc::new(ShortCard {
                url: payload.card.url,
                title: payload.card.title,
            }),
        };
        Candidate {
            id: payload.id,
            bounds: payload.bounds,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_id_is_split_off() {
        let frame = json!({"requestId": 7, "action": "setTask", "task": "learn rust"});
        let (id, request) = HostRequest::parse(frame).unwrap();
        assert_eq!(id, Some(json!(7)));
        assert!(matches!(request, HostRequest::SetTask { ref task } if task == "learn rust"));
        assert_eq!(request.action(), "setTask");
    }

    #[test]
    fn unknown_actions_fail_to_parse() {
        assert!(HostRequest::parse(json!({"action": "launchRockets"})).is_err());
        assert!(HostRequest::parse(json!({"task": "no action"})).is_err());
    }

    #[test]
    fn field_names_are_camel_case() {
        let frame = json!({
            "action": "setFilterPreference",
            "pageType": "channel",
            "enabled": false
        });
        let (_, request) = HostRequest::parse(frame).unwrap();
        assert!(matches!(
            request,
            HostRequest::SetFilterPreference {
                page_type: PageFilter::Channel,
                enabled: false
            }
        ));
    }

    #[test]
    fn scan_candidates_become_signal_sources() {
        let frame = json!({
            "action": "scanVideos",
            "sessionId": "tab-3",
            "pageUrl": "https://www.youtube.com/",
            "viewport": {"height": 900.0},
            "candidates": [
                {
                    "id": "v1",
                    "bounds": {"top": 0.0, "bottom": 200.0},
                    "title": "Rust ownership explained",
                    "description": "borrowing",
                    "channelName": "Crab Academy"
                },
                {
                    "id": "s1",
                    "kind": "short",
                    "bounds": {"top": 1500.0, "bottom": 1800.0},
                    "title": "60 second lifetimes",
                    "description": "ignored for shorts"
                }
            ]
        });
        let (_, request) = HostRequest::parse(frame).unwrap();
        let HostRequest::ScanVideos {
            trigger,
            candidates,
            ..
        } = request
        else {
            panic!("expected scanVideos");
        };
        assert_eq!(trigger, ScanTrigger::Mutation);

        let candidates: Vec<Candidate> = candidates.into_iter().map(Candidate::from).collect();
        let video = candidates[0].source.extract_signal();
        assert_eq!(video.title, "Rust ownership explained");
        assert_eq!(video.body_text, "borrowing");
        assert_eq!(video.channel.as_deref(), Some("Crab Academy"));
        let short = candidates[1].source.extract_signal();
        assert_eq!(short.title, "60 second lifetimes");
        assert!(short.body_text.is_empty());
    }
}
