use dom_smoothie::{Config as ReadabilityConfig, Readability, TextMode};
use tracing::warn;
use url::Url;

use crate::domain::{signal::truncate_chars, WebContent};

/// Readable title and body of a page whose content script only sent raw
/// HTML. `None` when no article could be found.
pub fn extract_article(html: &str, page_url: &str, max_chars: usize) -> Option<WebContent> {
    let base_url = Url::parse(page_url)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"));
    let config = ReadabilityConfig {
        text_mode: TextMode::Formatted,
        ..Default::default()
    };

    let article = Readability::new(html, base_url.as_ref().map(Url::as_str), Some(config))
        .and_then(|mut reader| reader.parse())
        .map_err(|err| {
            warn!(target: "web", error = %err, url = page_url, "readability extraction failed");
        })
        .ok()?;

    Some(WebContent {
        title: non_blank(&article.title),
        site_name: article.site_name.as_deref().and_then(non_blank),
        content: non_blank(&truncate_chars(article.text_content.trim(), max_chars)),
    })
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
