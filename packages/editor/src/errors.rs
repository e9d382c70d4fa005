//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    /// Executing a command nobody registered is a wiring bug, not a runtime condition
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Document error: {0}")]
    Dom(#[from] resume_dom::DomError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
