/// Domain-level failures that never touch the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Failures reported by a backend collaborator (HTTP client, fake, ...).
///
/// Kept transport-agnostic so the stores can be driven by any
/// implementation of the collaborator traits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (network, DNS, TLS, timeout).
    #[error("Request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status code.
    #[error("Backend error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body could not be decoded into the expected record.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The collaborator is not reachable in this execution context.
    #[error("Backend unavailable")]
    Unavailable,
}

impl ApiError {
    /// Whether the backend reported that the targeted record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}
