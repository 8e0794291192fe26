use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while running a pipeline stage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("paragraph of {len} chars is shorter than gram_len {gram_len}")]
    ParagraphTooShort { len: usize, gram_len: usize },
}
