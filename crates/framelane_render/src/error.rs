use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("nothing to render")]
    NothingToRender,

    #[error("render failed: {0}")]
    RenderFailed(String),

    #[error("render backend error: {0}")]
    Backend(String),

    #[error("render task aborted: {0}")]
    TaskAborted(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
