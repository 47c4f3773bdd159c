//! Backend collaborator consumed by the store.

use async_trait::async_trait;
use devboards_core::{ApiError, Comment, CommentId, JobId, NewComment};

/// Data-fetching collaborator for comments.
///
/// Implemented over HTTP by `devboards-client`; tests use in-memory fakes.
#[async_trait]
pub trait CommentApi: Send + Sync {
    /// List a job's comments in chronological order.
    async fn list_comments(&self, job_id: &JobId) -> Result<Vec<Comment>, ApiError>;

    /// Create a comment and return the stored record with its real id.
    async fn create_comment(&self, job_id: &JobId, comment: &NewComment)
        -> Result<Comment, ApiError>;

    /// Replace a comment's text and return the stored record.
    async fn update_comment(&self, id: &CommentId, text: &str) -> Result<Comment, ApiError>;

    async fn delete_comment(&self, id: &CommentId) -> Result<(), ApiError>;
}
