use thiserror::Error;

pub type Result<T> = std::result::Result<T, WatcherError>;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Navigation watcher must be started inside a tokio runtime")]
    NoRuntime,

    #[error("Navigation watcher is not running")]
    NotRunning,

    #[error("{0}")]
    Other(String),
}
