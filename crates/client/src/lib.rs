//! JSON/HTTP backend for the DevBoards client core.
//!
//! [`HttpBackend`] implements both data-fetching seams, the job feed's
//! [`JobSource`](devboards_feed::JobSource) and the comment store's
//! [`CommentApi`](devboards_comments::CommentApi), over the DevBoards REST
//! endpoints using [`reqwest`].

pub mod config;
pub mod error;
pub mod http;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::HttpBackend;
