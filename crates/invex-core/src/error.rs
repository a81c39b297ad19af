//! Error types for the invex-core library.

use thiserror::Error;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Duplicate fingerprint store error.
    #[error("fingerprint store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a single extraction call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The input text has no non-whitespace characters.
    #[error("input contains no usable text")]
    EmptyInput,
}

/// Errors raised by a single field detector.
///
/// These never escape the field extractor; a failing detector is treated
/// as having found nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    /// A matched value could not be parsed.
    #[error("failed to parse {field} from {value:?}")]
    Parse { field: String, value: String },

    /// A matched number does not fit the decimal type.
    #[error("numeric overflow in {field}: {value:?}")]
    Overflow { field: String, value: String },
}

/// Errors from the duplicate fingerprint store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store lock was poisoned by a panicking writer.
    #[error("fingerprint store lock poisoned")]
    Poisoned,

    /// The store reached its configured capacity.
    #[error("fingerprint store is full ({0} entries)")]
    CapacityExceeded(usize),
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
