//! Error types for conversion and settings operations

use thiserror::Error;

/// Errors that can occur while turning a page or selection into Markdown
#[derive(Debug, Error)]
pub enum ConversionError {
    /// HTML parsing failed
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Character encoding error
    #[error("Encoding error: {0}")]
    EncodingError(String),
    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Selection conversion requested with nothing selected
    #[error("No text selected")]
    NoSelection,
    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ConversionError {
    /// Get numeric error code for hosts that report failures as integers
    pub fn code(&self) -> u32 {
        match self {
            ConversionError::ParseError(_) => 1,
            ConversionError::EncodingError(_) => 2,
            ConversionError::InvalidInput(_) => 5,
            ConversionError::NoSelection => 6,
            ConversionError::InternalError(_) => 99,
        }
    }
}

/// Errors raised by settings storage backends
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Failure reported by a clipboard collaborator
#[derive(Debug, Error)]
#[error("Clipboard write failed: {0}")]
pub struct ClipboardError(pub String);
