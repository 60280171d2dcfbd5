use crate::task::TaskId;
use thiserror::Error;

/// Failures surfaced by the task engine.
///
/// Every variant renders as a message fit for the status line; none of them
/// are retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The server refused to start a job, or the request never reached it.
    #[error("{0}")]
    Submission(String),

    /// The server no longer knows the task id.
    #[error("Task {0} not found (maybe expired?)")]
    NotFound(TaskId),

    /// Any other HTTP or network failure while polling or cancelling.
    #[error("{0}")]
    Transport(String),

    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
