use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DirectoryError {
    /// Whether the caller may retry the same call later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DirectoryError::Store(_)
                | DirectoryError::StoreUnavailable(_)
                | DirectoryError::Timeout(_)
        )
    }
}
