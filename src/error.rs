use thiserror::Error;

/// Retrieving a URL failed. Always scoped to one unit of work.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed document at {url}: {reason}")]
    MalformedDocument { url: String, reason: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::MalformedDocument { url, .. } => url,
        }
    }
}

/// A fetched page did not have the shape of a character page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no name heading found at {url}")]
    MissingName { url: String },
}

/// Failure of a single seed, candidate link or record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}
