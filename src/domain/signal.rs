use serde::Deserialize;
use url::Url;

use crate::web_content;

pub const MAX_BODY_CHARS: usize = 5_000;

#[derive(Debug, Clone, PartialEq)]
pub struct PageSignal {
    pub url: String,
    pub title: String,
    pub body_text: String,
    pub domain: String,
    /// Uploader of a video card. Never part of `body_text`.
    pub channel: Option<String>,
}

impl PageSignal {
    pub fn new(url: impl Into<String>, title: impl Into<String>, body: impl AsRef<str>) -> Self {
        let url = url.into();
        let domain = extract_domain(&url);
        Self {
            body_text: truncate_chars(body.as_ref().trim(), MAX_BODY_CHARS),
            title: title.into(),
            domain,
            url,
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: Option<&str>) -> Self {
        self.channel = channel
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        self
    }
}

/// Hostname without a leading `www.`; falls back to the raw input when it is not a URL.
pub fn extract_domain(raw_url: &str) -> String {
    match Url::parse(raw_url) {
        Ok(url) => match url.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => raw_url.to_string(),
        },
        Err(_) => raw_url.to_string(),
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// A content surface the relevance pipeline can read without knowing its markup.
pub trait SignalSource: Send + Sync {
    fn extract_signal(&self) -> PageSignal;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCard {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_name: Option<String>,
}

impl SignalSource for VideoCard {
    fn extract_signal(&self) -> PageSignal {
        PageSignal::new(
            self.url.clone().unwrap_or_default(),
            self.title.trim(),
            &self.description,
        )
        .with_channel(self.channel_name.as_deref())
    }
}

/// Short-form cards only expose a title.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortCard {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
}

impl SignalSource for ShortCard {
    fn extract_signal(&self) -> PageSignal {
        PageSignal::new(self.url.clone().unwrap_or_default(), self.title.trim(), "")
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenericPage {
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub html: Option<String>,
}

impl SignalSource for GenericPage {
    fn extract_signal(&self) -> PageSignal {
        let mut title = self.title.clone().unwrap_or_default();
        let mut body = self.content.clone().unwrap_or_default();

        if body.trim().is_empty() {
            if let Some(html) = self.html.as_deref() {
                if let Some(article) = web_content::extract_article(html, &self.url, MAX_BODY_CHARS)
                {
                    if title.trim().is_empty() {
                        title = article.title.or(article.site_name).unwrap_or_default();
                    }
                    body = article.content.unwrap_or_default();
                }
            }
        }

        PageSignal::new(self.url.clone(), title.trim(), body)
    }
}
