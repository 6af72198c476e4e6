use thiserror::Error;

/// Top-level error type for the advlog logger.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T, E = LogError> = std::result::Result<T, E>;
