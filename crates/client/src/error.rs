/// Errors raised while constructing an [`HttpBackend`](crate::HttpBackend).
///
/// Request-time failures are reported as
/// [`ApiError`](devboards_core::ApiError) so the stores stay independent of
/// the transport.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The underlying HTTP client could not be built (TLS backend, etc.).
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}
