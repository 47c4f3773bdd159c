//! Infinite-scroll plumbing for list views.
//!
//! - [`ScrollTrigger`] turns viewport crossings of a sentinel anchor into
//!   `on_load_more` calls, exactly once per crossing.
//! - [`ViewportObserver`] is the seam to the environment's intersection
//!   primitive; [`Unavailable`] and [`ManualViewport`] are provided.
//! - [`FeedPager`] owns the loaded job postings and the re-entrancy guard
//!   the trigger deliberately does not enforce.

pub mod error;
pub mod margin;
pub mod observer;
pub mod pager;
pub mod trigger;

pub use error::FeedError;
pub use margin::RootMargin;
pub use observer::{Anchor, IntersectionEntry, ManualViewport, Unavailable, ViewportObserver};
pub use pager::{FeedPager, JobSource, LoadOutcome};
pub use trigger::{ScrollTrigger, TriggerOptions};
