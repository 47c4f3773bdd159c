//! Comment records, author display rules, and text validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{CommentId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a comment body in characters (after trimming).
pub const MAX_COMMENT_LENGTH: usize = 2_000;

/// Display name used when an author has no usable name.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Translation key for [`ANONYMOUS_AUTHOR`].
pub const ANONYMOUS_AUTHOR_KEY: &str = "comments.anonymous";

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

/// Who wrote a comment, as shown next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar_url: None,
        }
    }

    /// Build an author from profile name parts.
    ///
    /// Either part may be empty; the joined name is trimmed once.
    pub fn from_profile(first_name: &str, last_name: &str) -> Self {
        Self::new(format!("{first_name} {last_name}").trim())
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    /// An author with no name at all.
    pub fn anonymous() -> Self {
        Self::new("")
    }

    /// Name to render, falling back to [`ANONYMOUS_AUTHOR`] when blank.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            ANONYMOUS_AUTHOR
        } else {
            name
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A single comment in a job's thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    /// Owning user; `None` for anonymous comments.
    #[serde(default)]
    pub user_id: Option<String>,
    pub author: Author,
    pub text: String,
    pub date: Timestamp,
}

impl Comment {
    /// Build the optimistic local record for a comment that has not been
    /// created on the backend yet.
    pub fn pending(author: Author, text: impl Into<String>) -> Self {
        Self {
            id: CommentId::temporary(),
            user_id: None,
            author,
            text: text.into(),
            date: chrono::Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.id.is_temporary()
    }
}

/// Payload for creating a comment on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub author: Author,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Validation functions
// ---------------------------------------------------------------------------

/// Validate a comment body and return it trimmed.
///
/// Empty or whitespace-only text is rejected, as is text longer than
/// [`MAX_COMMENT_LENGTH`] characters.
pub fn validate_comment_text(text: &str) -> Result<String, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Comment text cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_COMMENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Comment text exceeds maximum length of {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
