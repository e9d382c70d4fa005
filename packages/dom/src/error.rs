//! Error types for the document tree

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("Malformed content: {0}")]
    MalformedContent(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Node not found")]
    NodeNotFound,
}
