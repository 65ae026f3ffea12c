/*!
 * Error types for the lectern application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur while extracting text from a document
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// File extension is not one of the supported document types
    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),

    /// File exceeds the size ceiling for its document type
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    Oversize {
        /// Actual file size in bytes
        size: u64,
        /// Configured ceiling in bytes
        limit: u64,
    },

    /// The external extraction tool could not be started
    #[error("Extraction tool unavailable: {0}")]
    ToolUnavailable(String),

    /// The extraction tool ran but produced no usable text
    #[error("Corrupt or unreadable document: {0}")]
    CorruptContent(String),

    /// The extraction tool did not finish within the allowed time
    #[error("Extraction timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors that can occur while validating extracted text
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Extracted text was empty
    #[error("Document contains no extractable text")]
    Empty,

    /// Extracted text is below the minimum character count
    #[error("Extracted text too short: {length} characters (minimum {minimum})")]
    TooShort {
        /// Actual character count
        length: usize,
        /// Required minimum
        minimum: usize,
    },

    /// Extracted text exceeds the maximum character count
    #[error("Extracted text too long: {length} characters (maximum {maximum})")]
    TooLong {
        /// Actual character count
        length: usize,
        /// Allowed maximum
        maximum: usize,
    },
}

/// Errors that can occur when driving a speech backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// The speech engine could not be reached or started
    #[error("Speech backend unavailable: {0}")]
    Unavailable(String),

    /// A single utterance failed to synthesize
    #[error("Utterance failed: {0}")]
    UtteranceFailed(String),

    /// The bridge endpoint answered with an error status
    #[error("Bridge responded with error: {status_code} - {message}")]
    BridgeError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the bridge
        message: String,
    },

    /// Voice enumeration failed
    #[error("Voice enumeration failed: {0}")]
    VoiceEnumeration(String),
}

/// Errors that can occur in the persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// A query or statement failed
    #[error("Database operation failed: {0}")]
    OperationFailed(String),

    /// The requested row does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The database file could not be opened or created
    #[error("Database unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(error: rusqlite::Error) -> Self {
        Self::OperationFailed(error.to_string())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from document extraction
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Error from text validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Error from a speech backend
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error from the persistence layer
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
