// Error taxonomy for task operations

use thiserror::Error;

/// Failure reading or writing the persisted snapshot
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage backend error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize task list: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Failure talking to the remote collection
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote returned {status} for {method} {url}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("remote sync is disabled")]
    Disabled,
}

/// Every way a task operation can fail to fully apply
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task text is empty")]
    Validation,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
