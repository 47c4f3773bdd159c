//! Shared domain types for the DevBoards client core.
//!
//! This crate has no internal dependencies so that the feed loader, the
//! comment store, the HTTP client and the CLI all agree on the same
//! records, identifiers, validation rules and error types.

pub mod comment;
pub mod error;
pub mod i18n;
pub mod job;
pub mod types;

pub use comment::{Author, Comment, NewComment};
pub use error::{ApiError, CoreError};
pub use i18n::Catalog;
pub use job::{JobPosting, JobQuery, Page, PageRequest};
pub use types::{CommentId, JobId, Timestamp};
