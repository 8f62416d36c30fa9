use std::path::PathBuf;

use thiserror::Error;

pub type ZarrResult<T> = Result<T, ZarrError>;

#[derive(Error, Debug)]
pub enum ZarrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on {}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expected dtype {expected}, found {found}")]
    DtypeMismatch { expected: String, found: String },

    #[error("Value {value} at element {index} is outside 0..=255")]
    OutOfRange { index: usize, value: f64 },

    #[error("{0}")]
    Other(String),
}

impl ZarrError {
    pub(crate) fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            source,
        }
    }
}
