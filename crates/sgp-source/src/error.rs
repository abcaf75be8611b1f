use thiserror::Error;

/// Errors from fetching or parsing dataset pages.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The fetcher could not produce a payload for this URL.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The payload did not have the expected shape.
    #[error("malformed payload from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Result alias for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
