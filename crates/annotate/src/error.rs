use radar_page::PageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnnotateError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotateError {
    #[error("No anchor found for {chain}")]
    AnchorNotFound { chain: String },

    #[error("Mount failed: {0}")]
    Mount(#[from] PageError),
}
