use thiserror::Error;

/// Failure reported by a [`crate::DataSource`]. The `Display` text is what the
/// controller surfaces in its `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("server returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Misuse of the [`crate::ListController`] API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("page must be at least 1, got {0}")]
    InvalidPage(u32),
    #[error("page size must be greater than 0")]
    InvalidPageSize,
    #[error("list controller has been shut down")]
    Closed,
    #[error("list controller requires a tokio runtime")]
    NoRuntime,
}
