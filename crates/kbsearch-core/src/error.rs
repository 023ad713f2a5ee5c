use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid startup parameters. Fatal; the process must not proceed.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Text extraction failed for {source_id}: {reason}")]
    Extraction { source_id: String, reason: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// A rejected request (blank query, non-positive `top_k`).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// True for errors caused by the caller rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
