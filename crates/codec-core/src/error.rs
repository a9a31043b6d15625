//! Error handling for the codec layer
//!
//! Errors fall into the groups the session core cares about: configuration
//! problems (unknown codec, no matching implementation), processing failures
//! reported by an implementation, and memory failures.

use softswitch_infra_common::PoolError;
use std::fmt;
use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Error type for codec operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// No codec interface is registered under this name
    #[error("Codec not found: {name}")]
    CodecNotFound { name: String },

    /// The interface exists but no implementation matches the requested rate/duration
    #[error("No implementation of codec {name} matches rate {rate:?} / {ms:?} ms")]
    NoImplementation {
        name: String,
        rate: Option<u32>,
        ms: Option<u32>,
    },

    /// The codec was destroyed or never initialized
    #[error("Codec {name} is not initialized")]
    NotInitialized { name: String },

    /// The codec was initialized without the flag for this operation
    #[error("Codec {name} was not initialized for {operation}")]
    OperationNotEnabled {
        name: String,
        operation: &'static str,
    },

    /// Encoding operation failed
    #[error("Encoding failed in {codec}: {reason}")]
    EncodingFailed { codec: String, reason: String },

    /// Decoding operation failed
    #[error("Decoding failed in {codec}: {reason}")]
    DecodingFailed { codec: String, reason: String },

    /// Output buffer too small for operation
    #[error("Buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// Input is not a whole number of samples
    #[error("Invalid frame size: {size} bytes is not a multiple of {unit}")]
    InvalidFrameSize { size: usize, unit: usize },

    /// Codec initialization failed
    #[error("Codec initialization failed: {reason}")]
    InitializationFailed { reason: String },

    /// The codec's memory pool refused an allocation
    #[error(transparent)]
    Memory(#[from] PoolError),
}

impl CodecError {
    /// Create a new codec not found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::CodecNotFound { name: name.into() }
    }

    /// Create a new encoding failed error
    pub fn encoding_failed(codec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EncodingFailed {
            codec: codec.into(),
            reason: reason.into(),
        }
    }

    /// Create a new decoding failed error
    pub fn decoding_failed(codec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DecodingFailed {
            codec: codec.into(),
            reason: reason.into(),
        }
    }

    /// Create a new initialization failed error
    pub fn initialization_failed(reason: impl Into<String>) -> Self {
        Self::InitializationFailed {
            reason: reason.into(),
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors affect one frame; the codec can be used again.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::EncodingFailed { .. }
            | Self::DecodingFailed { .. }
            | Self::BufferTooSmall { .. }
            | Self::InvalidFrameSize { .. } => true,

            Self::CodecNotFound { .. }
            | Self::NoImplementation { .. }
            | Self::NotInitialized { .. }
            | Self::OperationNotEnabled { .. }
            | Self::InitializationFailed { .. }
            | Self::Memory(_) => false,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CodecNotFound { .. }
            | Self::NoImplementation { .. }
            | Self::OperationNotEnabled { .. } => ErrorCategory::Configuration,

            Self::EncodingFailed { .. }
            | Self::DecodingFailed { .. }
            | Self::InvalidFrameSize { .. } => ErrorCategory::Processing,

            Self::BufferTooSmall { .. } | Self::Memory(_) => ErrorCategory::Memory,

            Self::NotInitialized { .. } | Self::InitializationFailed { .. } => {
                ErrorCategory::Initialization
            }
        }
    }
}

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration and lookup errors
    Configuration,
    /// Audio processing errors
    Processing,
    /// Memory management errors
    Memory,
    /// Initialization and lifetime errors
    Initialization,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Processing => write!(f, "Processing"),
            Self::Memory => write!(f, "Memory"),
            Self::Initialization => write!(f, "Initialization"),
        }
    }
}
