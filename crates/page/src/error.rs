use crate::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PageError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("Node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not attached to the document")]
    Detached(NodeId),

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Insertion rejected: {0}")]
    InsertRejected(String),

    #[error("{0}")]
    Other(String),
}
