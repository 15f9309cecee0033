use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

pub mod defaults;

use defaults::{DEFAULT_BLACKLIST, DEFAULT_MIXED, DEFAULT_WHITELIST, MIXED_CATEGORY, WHITELIST_CATEGORY};

pub type CategoryMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Whitelist,
    Blacklist,
    Mixed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLists {
    #[serde(default)]
    pub custom_whitelist: CategoryMap,
    #[serde(default)]
    pub custom_blacklist: CategoryMap,
    #[serde(default)]
    pub custom_mixed_domains: CategoryMap,
}

impl CustomLists {
    fn for_kind(&self, kind: ListKind) -> &CategoryMap {
        match kind {
            ListKind::Whitelist => &self.custom_whitelist,
            ListKind::Blacklist => &self.custom_blacklist,
            ListKind::Mixed => &self.custom_mixed_domains,
        }
    }
}

/// Default entries the user hid from settings, keyed by list, then category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HiddenItems {
    #[serde(default)]
    pub whitelist: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub blacklist: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub mixed: BTreeMap<String, BTreeSet<String>>,
}

impl HiddenItems {
    fn for_kind(&self, kind: ListKind) -> &BTreeMap<String, BTreeSet<String>> {
        match kind {
            ListKind::Whitelist => &self.whitelist,
            ListKind::Blacklist => &self.blacklist,
            ListKind::Mixed => &self.mixed,
        }
    }

    /// Returns false if the entry was already hidden.
    pub fn hide(&mut self, kind: ListKind, category: &str, domain: &str) -> bool {
        let map = match kind {
            ListKind::Whitelist => &mut self.whitelist,
            ListKind::Blacklist => &mut self.blacklist,
            ListKind::Mixed => &mut self.mixed,
        };
        map.entry(category.to_string())
            .or_default()
            .insert(domain.trim().to_string())
    }

    pub fn is_hidden(&self, kind: ListKind, category: &str, domain: &str) -> bool {
        self.for_kind(kind)
            .get(category)
            .is_some_and(|domains| domains.contains(domain))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterLists {
    #[serde(flatten)]
    pub custom: CustomLists,
    #[serde(default, rename = "hiddenDefaultItems")]
    pub hidden: HiddenItems,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub category: String,
    pub pattern: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMatch {
    pub kind: ListKind,
    pub category: String,
    pub pattern: String,
}

pub fn default_entries(kind: ListKind) -> CategoryMap {
    let mut map = CategoryMap::new();
    match kind {
        ListKind::Whitelist => {
            map.insert(WHITELIST_CATEGORY.to_string(), to_owned(DEFAULT_WHITELIST));
        }
        ListKind::Blacklist => {
            for (category, domains) in DEFAULT_BLACKLIST {
                map.insert(category.to_string(), to_owned(domains));
            }
        }
        ListKind::Mixed => {
            map.insert(MIXED_CATEGORY.to_string(), to_owned(DEFAULT_MIXED));
        }
    }
    map
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Loose containment match of a full URL against domain patterns, so that
/// `google.com/search` also catches query strings and sub-paths.
pub fn is_listed<'a>(url: &str, patterns: impl IntoIterator<Item = &'a str>) -> bool {
    let url = url.to_lowercase();
    patterns.into_iter().any(|pattern| {
        let pattern = pattern.trim().to_lowercase();
        !pattern.is_empty() && url.contains(&pattern)
    })
}

impl FilterLists {
    /// Entries consulted when matching. Hidden defaults are kept unless
    /// `hidden_disables_matching` is set.
    pub fn entries(&self, kind: ListKind, hidden_disables_matching: bool) -> Vec<ListEntry> {
        let mut entries = Vec::new();
        for (category, domains) in default_entries(kind) {
            for pattern in domains {
                if hidden_disables_matching && self.hidden.is_hidden(kind, &category, &pattern) {
                    continue;
                }
                entries.push(ListEntry {
                    category: category.clone(),
                    pattern,
                    is_default: true,
                });
            }
        }
        for (category, domains) in self.custom.for_kind(kind) {
            for pattern in domains {
                entries.push(ListEntry {
                    category: category.clone(),
                    pattern: pattern.clone(),
                    is_default: false,
                });
            }
        }
        entries
    }

    /// Defaults without hidden entries, for the settings page.
    pub fn visible_defaults(&self, kind: ListKind) -> CategoryMap {
        default_entries(kind)
            .into_iter()
            .map(|(category, domains)| {
                let kept = domains
                    .into_iter()
                    .filter(|domain| !self.hidden.is_hidden(kind, &category, domain))
                    .collect::<Vec<_>>();
                (category, kept)
            })
            .collect()
    }
}

/// Read-only view over one snapshot of the lists.
#[derive(Debug, Clone)]
pub struct ListFilter {
    lists: Arc<FilterLists>,
    hidden_disables_matching: bool,
}

impl ListFilter {
    pub fn new(lists: Arc<FilterLists>, hidden_disables_matching: bool) -> Self {
        Self {
            lists,
            hidden_disables_matching,
        }
    }

    pub fn find(&self, url: &str, kind: ListKind) -> Option<ListMatch> {
        self.lists
            .entries(kind, self.hidden_disables_matching)
            .into_iter()
            .find(|entry| is_listed(url, [entry.pattern.as_str()]))
            .map(|entry| ListMatch {
                kind,
                category: entry.category,
                pattern: entry.pattern,
            })
    }

    #[cfg(test)]
    pub fn is_whitelisted(&self, url: &str) -> bool {
        self.find(url, ListKind::Whitelist).is_some()
    }

    /// Whitelist first, then blacklist, then mixed-use.
    pub fn classify(&self, url: &str) -> Option<ListMatch> {
        [ListKind::Whitelist, ListKind::Blacklist, ListKind::Mixed]
            .into_iter()
            .find_map(|kind| self.find(url, kind))
    }
}

/// Lists shared by all evaluations. Writers replace the whole snapshot and
/// hold [`SharedLists::lock_writes`] from snapshot to replace.
#[derive(Debug)]
pub struct SharedLists {
    current: RwLock<Arc<FilterLists>>,
    writes: Mutex<()>,
    hidden_disables_matching: bool,
}

impl SharedLists {
    pub fn new(lists: FilterLists, hidden_disables_matching: bool) -> Self {
        Self {
            current: RwLock::new(Arc::new(lists)),
            writes: Mutex::new(()),
            hidden_disables_matching,
        }
    }

    pub fn snapshot(&self) -> Arc<FilterLists> {
        self.current.read().clone()
    }

    pub fn filter(&self) -> ListFilter {
        ListFilter::new(self.snapshot(), self.hidden_disables_matching)
    }

    /// Serialises read-modify-persist-replace sequences across awaits.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    pub fn replace(&self, lists: FilterLists) {
        *self.current.write() = Arc::new(lists);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(hidden_disables_matching: bool) -> SharedLists {
        SharedLists::new(FilterLists::default(), hidden_disables_matching)
    }

    #[test]
    fn whitelist_matches_subdomains_and_paths() {
        let filter = shared(false).filter();
        assert!(filter.is_whitelisted("https://en.wikipedia.org/wiki/Anything"));
        assert!(filter.is_whitelisted("https://www.google.com/search?q=rust"));
        assert!(!filter.is_whitelisted("https://www.google.com/maps"));
    }

    #[test]
    fn custom_entries_extend_defaults() {
        let lists = shared(false);
        let mut custom = FilterLists::default();
        custom
            .custom
            .custom_whitelist
            .insert("WORK".to_string(), vec!["intranet.corp".to_string()]);
        lists.replace(custom);

        let filter = lists.filter();
        let found = filter
            .find("https://intranet.corp/wiki", ListKind::Whitelist)
            .unwrap();
        assert_eq!(found.category, "WORK");
        assert!(filter.is_whitelisted("https://github.com/tokio-rs"));
    }

    #[test]
    fn classify_prefers_whitelist_over_mixed() {
        let filter = shared(false).filter();
        let found = filter.classify("https://github.com/rust-lang").unwrap();
        assert_eq!(found.kind, ListKind::Whitelist);

        let found = filter.classify("https://www.netflix.com/browse").unwrap();
        assert_eq!(found.kind, ListKind::Blacklist);
        assert_eq!(found.category, "ENTERTAINMENT");

        let found = filter.classify("https://medium.com/@someone").unwrap();
        assert_eq!(found.kind, ListKind::Mixed);
    }

    #[test]
    fn hidden_defaults_still_match_unless_configured() {
        let mut lists = FilterLists::default();
        assert!(lists
            .hidden
            .hide(ListKind::Whitelist, WHITELIST_CATEGORY, "reddit.com"));
        let lists = Arc::new(lists);

        let display_only = ListFilter::new(lists.clone(), false);
        assert!(display_only.is_whitelisted("https://reddit.com/r/rust"));

        let strict = ListFilter::new(lists.clone(), true);
        assert!(!strict.is_whitelisted("https://reddit.com/r/rust"));

        let visible = lists.visible_defaults(ListKind::Whitelist);
        assert!(!visible[WHITELIST_CATEGORY].contains(&"reddit.com".to_string()));
    }

    #[test]
    fn hiding_twice_reports_no_change() {
        let mut hidden = HiddenItems::default();
        assert!(hidden.hide(ListKind::Blacklist, "GAMING", "ign.com"));
        assert!(!hidden.hide(ListKind::Blacklist, "GAMING", "ign.com"));
    }

    #[test]
    fn empty_patterns_never_match() {
        assert!(!is_listed("https://example.com", ["", "  "]));
    }

    #[test]
    fn overlays_round_trip_with_storage_field_names() {
        let json = serde_json::json!({
            "customWhitelist": {"WORK": ["intranet.corp"]},
            "hiddenDefaultItems": {"blacklist": {"GAMING": ["ign.com"]}}
        });
        let lists: FilterLists = serde_json::from_value(json).unwrap();
        assert_eq!(lists.custom.custom_whitelist["WORK"], vec!["intranet.corp"]);
        assert!(lists.hidden.is_hidden(ListKind::Blacklist, "GAMING", "ign.com"));
        assert!(lists.custom.custom_mixed_domains.is_empty());
    }
}
