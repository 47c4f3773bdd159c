//! Per-surface accessor for one job's thread.
//!
//! A [`CommentThreadView`] is what a job-detail component holds. It reads
//! through the shared [`CommentStore`], fetches lazily on first use, and
//! carries a liveness token: once the component unmounts, results that
//! arrive later are dropped (`Ok(None)`) instead of being delivered. The
//! backend requests themselves are never cancelled.

use std::future::Future;

use devboards_core::{Author, Comment, CommentId, JobId};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::CommentError;
use crate::events::ThreadEvent;
use crate::store::{CommentStore, ThreadSnapshot};

/// One component's handle on a job's comment thread.
///
/// Dropping the view unmounts it.
pub struct CommentThreadView {
    store: CommentStore,
    job_id: JobId,
    alive: CancellationToken,
}

impl CommentThreadView {
    pub(crate) fn new(store: CommentStore, job_id: JobId) -> Self {
        Self {
            store,
            job_id,
            alive: CancellationToken::new(),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn is_mounted(&self) -> bool {
        !self.alive.is_cancelled()
    }

    /// Stop accepting results. Idempotent; also done on drop.
    pub fn unmount(&self) {
        if !self.alive.is_cancelled() {
            tracing::debug!(job_id = %self.job_id, "Comment view unmounted");
            self.alive.cancel();
        }
    }

    /// Current comments, without fetching.
    pub async fn comments(&self) -> Vec<Comment> {
        self.store.get_comments(&self.job_id).await
    }

    pub async fn snapshot(&self) -> ThreadSnapshot {
        self.store.snapshot(&self.job_id).await
    }

    /// Fetch the thread unless it is already loaded.
    pub async fn ensure_loaded(&self) -> Result<Option<Vec<Comment>>, CommentError> {
        if !self.is_mounted() {
            return Ok(None);
        }
        let snapshot = self.store.snapshot(&self.job_id).await;
        if snapshot.loaded {
            return Ok(Some(snapshot.comments));
        }
        self.while_mounted(self.store.fetch_comments(&self.job_id)).await
    }

    /// Fetch the thread again regardless of cache state.
    pub async fn refresh(&self) -> Result<Option<Vec<Comment>>, CommentError> {
        self.while_mounted(self.store.fetch_comments(&self.job_id)).await
    }

    pub async fn add(&self, author: Author, text: &str) -> Result<Option<Comment>, CommentError> {
        self.while_mounted(self.store.add_comment(&self.job_id, author, text))
            .await
    }

    pub async fn edit(&self, id: &CommentId, text: &str) -> Result<Option<Comment>, CommentError> {
        self.while_mounted(self.store.edit_comment(id, text)).await
    }

    pub async fn delete(&self, id: &CommentId) -> Result<Option<()>, CommentError> {
        self.while_mounted(self.store.delete_comment(id)).await
    }

    /// Events relevant to this view's thread. Callers filter with
    /// [`ThreadEvent::concerns`].
    pub fn changes(&self) -> broadcast::Receiver<ThreadEvent> {
        self.store.subscribe()
    }

    async fn while_mounted<T>(
        &self,
        operation: impl Future<Output = Result<T, CommentError>>,
    ) -> Result<Option<T>, CommentError> {
        tokio::select! {
            biased;
            _ = self.alive.cancelled() => Ok(None),
            result = operation => {
                if self.alive.is_cancelled() {
                    Ok(None)
                } else {
                    result.map(Some)
                }
            }
        }
    }
}

impl Drop for CommentThreadView {
    fn drop(&mut self) {
        self.alive.cancel();
    }
}
