use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel `site_source` for operator-published entries. Manual articles
/// carry a synthetic `manual://` URL and are exempt from retention pruning.
pub const MANUAL_SOURCE: &str = "manual";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    /// Canonical absolute URL; unique across the table and the dedup key.
    pub url: String,
    pub site_source: String,
    pub tag: Option<String>,
    /// Best-effort display string captured at scrape time, not a reliable
    /// event timestamp.
    pub original_time: Option<String>,
    pub is_top: bool,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn is_manual(&self) -> bool {
        self.site_source == MANUAL_SOURCE
    }
}

/// A row accepted by the classifier, ready for insert-or-ignore.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub site_source: String,
    pub tag: String,
    pub original_time: String,
}

/// A (title, url) pair pulled off a listing page, not yet classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    pub original_time: String,
}

/// Filter + pagination for the read-side listing.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Exact tag match when set.
    pub tag: Option<String>,
    /// Case-sensitive title substring search when set.
    pub search: Option<String>,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

impl ListQuery {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            tag: None,
            search: None,
            page: page.max(1),
            per_page,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn offset(&self) -> u32 {
        (self.page.max(1) - 1) * self.per_page
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u32,
    pub total_pages: u32,
    pub page: u32,
}
