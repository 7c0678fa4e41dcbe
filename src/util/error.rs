//! Error types for the model editing library.

use thiserror::Error;

/// Main error type for model operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Insert target is already linked at its cached index
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// Remove or lookup target is absent
    #[error("Object not found: {0}")]
    NotFound(String),

    /// A required cross-reference is missing
    #[error("Null object: {0}")]
    NullObject(String),

    /// Buffer or array growth failed
    #[error("Allocation failed: {0}")]
    AllocationFailure(String),

    /// Positional index out of bounds
    #[error("Index {index} out of bounds (count: {count})")]
    IndexOutOfBounds { index: usize, count: usize },

    /// Missing "PMX " signature at start of data
    #[error("Invalid PMX data: expected \"PMX \" signature")]
    InvalidSignature,

    /// Unsupported document version
    #[error("Unsupported PMX version: {0}")]
    UnsupportedVersion(f32),

    /// Data is truncated
    #[error("Unexpected end of buffer at offset {0}")]
    UnexpectedEof(usize),

    /// Invalid data structure
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// UTF-16 conversion error
    #[error("Invalid UTF-16: {0}")]
    Utf16(#[from] std::string::FromUtf16Error),

    /// Settings (de)serialization error
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an already exists error.
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists(what.into())
    }

    /// Create a null object error.
    pub fn null_object(what: impl Into<String>) -> Self {
        Self::NullObject(what.into())
    }
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;
