use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during Kotae core operations.
#[derive(Debug, Error)]
pub enum KotaeError {
    /// A segmented token could not be found in its source text from the
    /// current search cursor onward.
    #[error("token {token:?} cannot be found in source text at or after char offset {cursor}")]
    Alignment {
        /// The token that failed to align.
        token: String,
        /// Char offset the search started from.
        cursor: usize,
    },

    /// A corpus file could not be processed.
    #[error("failed to process corpus {path:?}: {source}")]
    Corpus {
        /// The offending corpus file.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: Box<KotaeError>,
    },

    /// The configuration was rejected before any corpus pass.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pretrained embedding line could not be parsed.
    #[error("malformed embedding line {line}: {reason}")]
    EmbeddingFormat {
        /// 1-based line number in the embedding resource.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A record store is truncated or fails its checksum.
    #[error("corrupt record store: {0}")]
    RecordFormat(String),

    /// A decoded record does not match the configured limits.
    #[error("field {field} has {actual} elements, expected {expected}")]
    ShapeMismatch {
        /// Record field name.
        field: &'static str,
        /// Element count implied by the limits.
        expected: usize,
        /// Element count found in the record.
        actual: usize,
    },

    /// A prediction references an id that has no eval record.
    #[error("no eval record for example id {0:?}")]
    UnknownExample(String),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(String),

    /// Safetensors serialization error.
    #[error("safetensors error: {0}")]
    Safetensors(String),
}

impl KotaeError {
    /// Attaches the corpus file that was being processed.
    pub fn in_corpus(self, path: impl Into<PathBuf>) -> Self {
        Self::Corpus {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

impl From<candle_core::Error> for KotaeError {
    fn from(err: candle_core::Error) -> Self {
        Self::Tensor(err.to_string())
    }
}

impl From<safetensors::SafeTensorError> for KotaeError {
    fn from(err: safetensors::SafeTensorError) -> Self {
        Self::Safetensors(err.to_string())
    }
}

/// Result type alias for Kotae operations.
pub type Result<T> = std::result::Result<T, KotaeError>;
