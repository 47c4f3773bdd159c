//! Comment thread store for job postings.
//!
//! The store is the single source of truth for comment threads across
//! every UI surface that shows them:
//!
//! - [`CommentStore`] owns the `job -> thread` cache, deduplicates
//!   overlapping fetches, rejects stale fetch results, and applies
//!   optimistic add/edit/delete with rollback.
//! - Mutations for one thread go through a single ordered queue drained by
//!   a background worker that talks to the [`CommentApi`].
//! - [`CommentThreadView`] is the per-component accessor with a liveness
//!   flag, so results landing after unmount are dropped.
//! - [`ThreadEvent`]s are broadcast for every visible change.

pub mod api;
pub mod error;
pub mod events;
mod queue;
pub mod store;
pub mod thread;
pub mod view;

pub use api::CommentApi;
pub use error::CommentError;
pub use events::ThreadEvent;
pub use store::{CommentStore, ThreadSnapshot};
pub use thread::IntentToken;
pub use view::CommentThreadView;
