use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::domain::KeywordSet;

static ARRAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid array regex"));
static DELIMITED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\n]+").expect("valid delimiter regex"));
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\s,"]+"#).expect("valid token regex"));

/// Which fallback produced the keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseStage {
    BracketArray,
    JsonObject,
    Delimited,
    Tokens,
}

/// Runs the fallbacks in order and returns the first non-empty result.
pub fn parse_keywords(raw: &str) -> Option<(KeywordSet, ParseStage)> {
    let stages: [(ParseStage, fn(&str) -> KeywordSet); 4] = [
        (ParseStage::BracketArray, bracket_array),
        (ParseStage::JsonObject, json_object),
        (ParseStage::Delimited, delimited),
        (ParseStage::Tokens, tokens),
    ];

    for (stage, parse) in stages {
        let keywords = parse(raw);
        if !keywords.is_empty() {
            tracing::debug!(
                target: "keywords",
                stage = ?stage,
                count = keywords.len(),
                "keywords extracted from response"
            );
            return Some((keywords, stage));
        }
    }
    None
}

fn bracket_array(raw: &str) -> KeywordSet {
    let Some(found) = ARRAY_RE.find(raw) else {
        return KeywordSet::default();
    };
    match serde_json::from_str::<Value>(found.as_str()) {
        Ok(Value::Array(items)) => strings_only(&items),
        _ => KeywordSet::default(),
    }
}

fn json_object(raw: &str) -> KeywordSet {
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(raw.trim()) else {
        return KeywordSet::default();
    };
    ["keywords", "result"]
        .iter()
        .find_map(|field| object.get(*field).and_then(Value::as_array))
        .map(|items| strings_only(items))
        .unwrap_or_default()
}

fn delimited(raw: &str) -> KeywordSet {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '[' | ']' | '{' | '}'))
        .collect();
    KeywordSet::from_raw(DELIMITED_RE.split(&stripped))
}

fn tokens(raw: &str) -> KeywordSet {
    KeywordSet::from_raw(
        TOKEN_RE
            .split(raw)
            .filter(|token| token.trim().chars().count() > 2),
    )
}

fn strings_only(items: &[Value]) -> KeywordSet {
    KeywordSet::from_raw(items.iter().filter_map(Value::as_str))
}
