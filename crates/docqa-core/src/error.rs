//! Error types for docqa.

use thiserror::Error;

/// Main error type for docqa operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Content extraction failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractError),

    /// Chunking failed
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkError),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    /// Vector store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Language model generation failed
    #[error("generation error: {0}")]
    Generation(#[from] GenerateError),

    /// Caller supplied an unusable request
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Content extraction errors.
///
/// Encrypted, unreadable and empty sources are distinct variants so callers
/// can report the right failure category to the user.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("document is encrypted or password protected")]
    Encrypted,

    #[error("document could not be read: {0}")]
    Unreadable(String),

    #[error("no text could be extracted from the document")]
    NoText,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chunking errors.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Embedding errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("embedding provider timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("capability not supported: {0}")]
    Unsupported(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("request failed: {0}")]
    Request(String),
}

/// Vector store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("insert failed: {0}")]
    Insert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("persist failed: {0}")]
    Persist(String),

    #[error("store is corrupt: {0}")]
    Corrupt(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),
}

/// Generation provider errors.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("generation provider unavailable: {0}")]
    Unavailable(String),

    #[error("generation provider timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unrecognized response shape: {0}")]
    UnrecognizedShape(String),
}

/// Result type alias for docqa operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // ========== ExtractError Tests ==========

    #[test]
    fn test_extract_error_unsupported_type_display() {
        let err = ExtractError::UnsupportedType("docx".to_string());
        assert_eq!(err.to_string(), "unsupported file type: docx");
    }

    #[test]
    fn test_extract_error_categories_are_distinct() {
        let encrypted = ExtractError::Encrypted.to_string();
        let unreadable = ExtractError::Unreadable("bad xref".to_string()).to_string();
        let empty = ExtractError::NoText.to_string();

        assert!(encrypted.contains("encrypted"));
        assert!(unreadable.contains("bad xref"));
        assert!(empty.contains("no text"));
        assert_ne!(encrypted, unreadable);
        assert_ne!(unreadable, empty);
    }

    #[test]
    fn test_extract_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ExtractError = io_err.into();
        assert!(matches!(err, ExtractError::Io(_)));
    }

    // ========== ChunkError Tests ==========

    #[test]
    fn test_chunk_error_invalid_config_display() {
        let err = ChunkError::InvalidConfig("chunk_size must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: chunk_size must be at least 1"
        );
    }

    // ========== EmbedError Tests ==========

    #[test]
    fn test_embed_error_timeout_display() {
        let err = EmbedError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "embedding provider timed out after 30s");
    }

    #[test]
    fn test_embed_error_dimension_mismatch_display() {
        let err = EmbedError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 384, got 768");
    }

    // ========== StoreError Tests ==========

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::Insert("length mismatch".to_string()).to_string(),
            "insert failed: length mismatch"
        );
        assert_eq!(
            StoreError::Corrupt("lookup length 3 != index length 2".to_string()).to_string(),
            "store is corrupt: lookup length 3 != index length 2"
        );
    }

    // ========== GenerateError Tests ==========

    #[test]
    fn test_generate_error_display() {
        let err = GenerateError::UnrecognizedShape("number".to_string());
        assert_eq!(err.to_string(), "unrecognized response shape: number");
    }

    // ========== Main Error Tests ==========

    #[test]
    fn test_error_from_store_error() {
        let err: Error = StoreError::Query("empty index".to_string()).into();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(err.to_string(), "store error: query failed: empty index");
    }

    #[test]
    fn test_error_from_generate_error() {
        let err: Error = GenerateError::Unavailable("no model".to_string()).into();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_invalid_input_display() {
        let err = Error::InvalidInput("empty upload".to_string());
        assert_eq!(err.to_string(), "invalid input: empty upload");
    }
}
