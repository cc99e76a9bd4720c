//! Error types for the assignment snapshot store.

use thiserror::Error;

/// Result type alias for snapshot store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while loading or saving a snapshot.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open snapshot store: {0}")]
    Open(String),

    #[error("snapshot transaction failed: {0}")]
    Transaction(String),

    #[error("snapshot table unavailable: {0}")]
    Table(String),

    #[error("failed to read snapshot: {0}")]
    Read(String),

    #[error("failed to write snapshot: {0}")]
    Write(String),

    #[error("failed to encode assignment table: {0}")]
    Serialize(String),

    #[error("failed to decode assignment table: {0}")]
    Deserialize(String),
}
