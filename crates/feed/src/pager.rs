//! Page owner for the job feed.
//!
//! [`FeedPager`] is what a jobs list hands to a [`ScrollTrigger`] as its
//! `on_load_more`: it fetches the next page from a [`JobSource`], appends
//! it, and ignores triggers that arrive while a page is still loading.
//!
//! [`ScrollTrigger`]: crate::trigger::ScrollTrigger

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use devboards_core::job::DEFAULT_PAGE_SIZE;
use devboards_core::{ApiError, JobId, JobPosting, JobQuery, Page, PageRequest};
use tokio::sync::RwLock;

use crate::error::FeedError;
use crate::trigger::TriggerOptions;

/// Backend collaborator that lists job postings page by page.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn list_jobs(&self, request: PageRequest) -> Result<Page<JobPosting>, ApiError>;
}

/// Result of a [`FeedPager::load_next`] call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page arrived; carries the number of new postings appended.
    Loaded(usize),
    /// Another page fetch was already in flight; nothing was requested.
    Busy,
    /// The feed has no more pages.
    Exhausted,
}

#[derive(Default)]
struct PagerState {
    items: Vec<JobPosting>,
    seen: HashSet<JobId>,
    next_offset: u32,
    exhausted: bool,
    total: Option<u64>,
    query: JobQuery,
    /// Bumped by `reset` so a page requested for an older query is dropped.
    generation: u64,
}

/// Accumulates feed pages with a single-flight guard.
pub struct FeedPager {
    source: Arc<dyn JobSource>,
    page_size: u32,
    loading: AtomicBool,
    state: RwLock<PagerState>,
}

/// Clears the loading flag when a fetch finishes or is abandoned.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl FeedPager {
    pub fn new(source: Arc<dyn JobSource>, page_size: u32) -> Self {
        Self {
            source,
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            loading: AtomicBool::new(false),
            state: RwLock::new(PagerState::default()),
        }
    }

    pub fn with_query(mut self, query: JobQuery) -> Self {
        self.state.get_mut().query = query;
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch and append the next page.
    ///
    /// Returns [`LoadOutcome::Busy`] without touching the source while
    /// another call is still in flight.
    pub async fn load_next(&self) -> Result<LoadOutcome, FeedError> {
        if self.loading.swap(true, Ordering::SeqCst) {
            tracing::debug!("Page load already in flight, ignoring trigger");
            return Ok(LoadOutcome::Busy);
        }
        let _guard = LoadingGuard(&self.loading);

        let (request, generation) = {
            let state = self.state.read().await;
            if state.exhausted {
                return Ok(LoadOutcome::Exhausted);
            }
            (
                PageRequest::new(state.next_offset, self.page_size).with_query(state.query.clone()),
                state.generation,
            )
        };
        let offset = request.offset;
        let limit = request.limit;

        tracing::debug!(offset, limit, "Loading feed page");
        let page = self
            .source
            .list_jobs(request)
            .await
            .map_err(|source| {
                tracing::warn!(offset, error = %source, "Feed page failed");
                FeedError::PageFailed { offset, source }
            })?;

        let mut state = self.state.write().await;
        if state.generation != generation {
            tracing::debug!(offset, "Discarding page for a superseded query");
            return Ok(LoadOutcome::Loaded(0));
        }

        let received = page.items.len() as u32;
        let mut appended = 0;
        for posting in page.items {
            if state.seen.insert(posting.id.clone()) {
                state.items.push(posting);
                appended += 1;
            }
        }

        if page.total.is_some() {
            state.total = page.total;
        }
        // The backend's cursor wins; backends may cap pages below `limit`.
        state.exhausted = match page.next_offset {
            Some(next) => next <= offset,
            None => {
                received < limit
                    || state
                        .total
                        .is_some_and(|total| u64::from(offset + received) >= total)
            }
        };
        state.next_offset = page.next_offset.unwrap_or(offset + received);

        tracing::info!(
            offset,
            appended,
            loaded = state.items.len(),
            exhausted = state.exhausted,
            "Feed page loaded",
        );
        Ok(LoadOutcome::Loaded(appended))
    }

    /// Start over with a new query. A page in flight for the old query is
    /// discarded when it lands.
    pub async fn reset(&self, query: JobQuery) {
        let mut state = self.state.write().await;
        let generation = state.generation + 1;
        *state = PagerState {
            query,
            generation,
            ..Default::default()
        };
    }

    pub async fn items(&self) -> Vec<JobPosting> {
        self.state.read().await.items.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.items.is_empty()
    }

    pub async fn is_exhausted(&self) -> bool {
        self.state.read().await.exhausted
    }

    /// Total reported by the backend, if it reports one.
    pub async fn total(&self) -> Option<u64> {
        self.state.read().await.total
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Trigger options whose callback loads the next page on the current
    /// tokio runtime.
    ///
    /// Must be called from within a runtime.
    pub fn trigger_options(self: &Arc<Self>) -> TriggerOptions {
        let pager = Arc::clone(self);
        let handle = tokio::runtime::Handle::current();
        TriggerOptions::new(move || {
            let pager = Arc::clone(&pager);
            handle.spawn(async move {
                match pager.load_next().await {
                    Ok(outcome) => tracing::debug!(?outcome, "Scroll-triggered load finished"),
                    Err(e) => tracing::warn!(error = %e, "Scroll-triggered load failed"),
                }
            });
        })
    }
}
