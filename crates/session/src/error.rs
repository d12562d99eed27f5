use radar_watcher::WatcherError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

/// A call to or from a host collaborator failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct TransportError {
    pub operation: &'static str,
    pub message: String,
}

impl TransportError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Watcher error: {0}")]
    Watcher(#[from] WatcherError),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
