use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Command state missing: {0}")]
    CommandState(&'static str),
}

pub type Result<T> = std::result::Result<T, CoreError>;
