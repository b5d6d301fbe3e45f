use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptlocError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("MSG block count mismatch: {original} original vs {translated} translated")]
    StructuralMismatch { original: usize, translated: usize },

    #[error("Invalid splice spans: {0}")]
    InvalidSpans(String),

    #[error("Translation backend failed: {0}")]
    Transport(String),

    #[error("{pending} of {total} blocks were left untranslated")]
    PartialTranslation { pending: usize, total: usize },

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ScriptlocError>;
