//! Error types for Revise

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// Missing or malformed request input
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The durable revision increment failed; nothing was synchronized
    #[error("Durable write failed: {0}")]
    DurableWrite(String),

    /// Key-value synchronization failed after a successful durable write
    #[error("Cache sync failed: {0}")]
    CacheSync(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrackerError {
    /// Whether the caller is at fault (bad input or credentials)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TrackerError::Validation(_) | TrackerError::Unauthorized(_)
        )
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Cache(format!("serialization: {}", e))
    }
}
