//! Job postings and the pagination contract of the job feed.

use serde::{Deserialize, Serialize};

use crate::types::{JobId, Timestamp};

/// Default number of postings requested per feed page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on a single page request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A job posting as listed on the jobs page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub posted_at: Timestamp,
}

/// Search filters applied to the job feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub remote_only: bool,
}

impl JobQuery {
    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.location.is_none() && !self.remote_only
    }
}

/// Offset-based page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
    pub query: JobQuery,
}

impl PageRequest {
    /// Build a request, clamping `limit` into `1..=MAX_PAGE_SIZE`.
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            query: JobQuery::default(),
        }
    }

    pub fn with_query(mut self, query: JobQuery) -> Self {
        self.query = query;
        self
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of matching records, when the backend reports it.
    #[serde(default)]
    pub total: Option<u64>,
    /// Offset of the next page. Authoritative when present; `None` at the
    /// end of the feed or when the backend does not report a cursor.
    #[serde(default)]
    pub next_offset: Option<u32>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: Some(0),
            next_offset: None,
        }
    }
}
