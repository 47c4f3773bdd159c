use devboards_core::{ApiError, CommentId, JobId};

/// Typed failures surfaced by the comment store.
///
/// Every mutation failure means the optimistic change has already been
/// rolled back when the error is returned. Fetch failures leave the cache
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommentError {
    /// Local validation failed; nothing was sent to the backend.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to fetch comments for job {job_id}: {source}")]
    FetchFailed {
        job_id: JobId,
        #[source]
        source: ApiError,
    },

    #[error("Failed to add comment to job {job_id}: {source}")]
    AddFailed {
        job_id: JobId,
        #[source]
        source: ApiError,
    },

    #[error("Failed to edit comment {id}: {reason}")]
    EditFailed { id: CommentId, reason: String },

    #[error("Failed to delete comment {id}: {source}")]
    DeleteFailed {
        id: CommentId,
        #[source]
        source: ApiError,
    },

    /// No cached thread currently shows a comment with this id.
    #[error("Comment {0} not found")]
    NotFound(CommentId),

    /// The store was reset (e.g. logout) before the operation settled.
    #[error("Comment store was reset before the operation settled")]
    Reset,
}

impl CommentError {
    /// Translation key of the user-facing error indication.
    pub fn message_key(&self) -> &'static str {
        match self {
            CommentError::InvalidInput(_) => "comments.error.invalid",
            CommentError::FetchFailed { .. } => "comments.error.fetch",
            CommentError::AddFailed { .. } => "comments.error.add",
            CommentError::EditFailed { .. } => "comments.error.edit",
            CommentError::DeleteFailed { .. } => "comments.error.delete",
            CommentError::NotFound(_) => "comments.error.not_found",
            CommentError::Reset => "comments.error.reset",
        }
    }
}
