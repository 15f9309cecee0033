use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::Url;

use super::types::TaskStamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFilter {
    Search,
    Channel,
}

/// Which kind of video listing a scan session is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Home,
    Search,
    Channel,
    Shorts,
    Watch,
}

impl PageKind {
    pub fn from_url(raw_url: &str) -> Self {
        let path = Url::parse(raw_url)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| raw_url.to_string());

        if path.starts_with("/results") {
            Self::Search
        } else if path.starts_with("/@")
            || path.starts_with("/channel/")
            || path.starts_with("/c/")
            || path.starts_with("/user/")
        {
            Self::Channel
        } else if path.starts_with("/shorts") {
            Self::Shorts
        } else if path.starts_with("/watch") {
            Self::Watch
        } else {
            Self::Home
        }
    }

    /// The preference that can switch filtering off for this kind of page.
    pub fn filter(self) -> Option<PageFilter> {
        match self {
            Self::Search => Some(PageFilter::Search),
            Self::Channel => Some(PageFilter::Channel),
            _ => None,
        }
    }
}

/// The user's current task and feature toggles.
///
/// Every task replacement bumps the generation, so work stamped with an older
/// generation can be recognised and dropped when it completes.
#[derive(Debug)]
pub struct TaskSession {
    inner: RwLock<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    task: String,
    generation: u64,
    auto_close: bool,
    search_filter: bool,
    channel_filter: bool,
}

impl Default for TaskSession {
    fn default() -> Self {
        Self {
            inner: RwLock::new(SessionInner {
                task: String::new(),
                generation: 0,
                auto_close: true,
                search_filter: true,
                channel_filter: true,
            }),
        }
    }
}

impl TaskSession {
    pub fn task(&self) -> String {
        self.inner.read().task.clone()
    }

    pub fn current(&self) -> (String, TaskStamp) {
        let inner = self.inner.read();
        (inner.task.clone(), TaskStamp(inner.generation))
    }

    pub fn is_current(&self, stamp: TaskStamp) -> bool {
        self.inner.read().generation == stamp.0
    }

    /// Returns `None` when the task is unchanged.
    pub fn set_task(&self, task: &str) -> Option<TaskStamp> {
        let task = task.trim();
        let mut inner = self.inner.write();
        if inner.task == task {
            return None;
        }
        inner.task = task.to_string();
        inner.generation += 1;
        Some(TaskStamp(inner.generation))
    }

    pub fn auto_close(&self) -> bool {
        self.inner.read().auto_close
    }

    pub fn set_auto_close(&self, enabled: bool) {
        self.inner.write().auto_close = enabled;
    }

    pub fn filter_enabled(&self, filter: PageFilter) -> bool {
        let inner = self.inner.read();
        match filter {
            PageFilter::Search => inner.search_filter,
            PageFilter::Channel => inner.channel_filter,
        }
    }

    /// Returns whether the value actually flipped.
    pub fn set_filter_enabled(&self, filter: PageFilter, enabled: bool) -> bool {
        let mut inner = self.inner.write();
        let slot = match filter {
            PageFilter::Search => &mut inner.search_filter,
            PageFilter::Channel => &mut inner.channel_filter,
        };
        let changed = *slot != enabled;
        *slot = enabled;
        changed
    }
}
