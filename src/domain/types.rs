use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebContent {
    pub title: Option<String>,
    pub site_name: Option<String>,
    pub content: Option<String>,
}

/// Keywords generated for one task. Entries are trimmed, lowercased and never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    pub fn from_raw<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            items
                .into_iter()
                .map(|item| item.as_ref().trim().to_lowercase())
                .filter(|item| !item.is_empty())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn push(&mut self, keyword: &str) {
        let cleaned = keyword.trim().to_lowercase();
        if !cleaned.is_empty() {
            self.0.push(cleaned);
        }
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(value: Vec<String>) -> Self {
        Self::from_raw(value)
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(value: KeywordSet) -> Self {
        value.0
    }
}

/// Generation counter of the task that was current when work was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskStamp(pub u64);

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub visible: usize,
    pub offscreen: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastError {
    pub message: String,
    pub details: Option<String>,
    pub time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_set_drops_blank_entries() {
        let set = KeywordSet::from_raw(["  Python ", "", "   ", "Rust"]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["python", "rust"]);
    }

    #[test]
    fn keyword_set_deserializes_through_cleaning() {
        let set: KeywordSet = serde_json::from_str(r#"["A", " ", "b c"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["a","b c"]"#);
    }
}
