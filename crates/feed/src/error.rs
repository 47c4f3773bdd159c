use devboards_core::ApiError;

/// Errors from the feed loader and pager.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    /// A root margin string did not parse as 1-4 `px`/`%` offsets.
    #[error("Invalid root margin '{0}'")]
    InvalidRootMargin(String),

    /// The job source failed to deliver the next page.
    #[error("Failed to load page at offset {offset}: {source}")]
    PageFailed {
        offset: u32,
        #[source]
        source: ApiError,
    },
}
