use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

/// Dataset rejected by `RatingStore::load`. The store stays empty.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Dataset parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate channel id in dataset: {0}")]
    DuplicateId(String),

    #[error("Dataset entry {index} has an empty channel name")]
    EmptyName { index: usize },

    #[error("Rating store is already loaded")]
    AlreadyLoaded,
}
