//! Error types for the session engine

use softswitch_codec_core::CodecError;
use softswitch_infra_common::PoolError;
use std::fmt;
use thiserror::Error;

/// Result type alias for session engine operations
pub type Result<T> = std::result::Result<T, SwitchError>;

/// Errors raised by the session engine and by endpoint routines
#[derive(Error, Debug)]
pub enum SwitchError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// No endpoint registered under this name
    #[error("Endpoint not found: {name}")]
    EndpointNotFound { name: String },

    /// No timer registered under this name
    #[error("Timer not found: {name}")]
    TimerNotFound { name: String },

    /// No dialplan registered under this name
    #[error("Dialplan not found: {name}")]
    DialplanNotFound { name: String },

    /// No application registered under this name
    #[error("Application not found: {name}")]
    ApplicationNotFound { name: String },

    /// Codec negotiation or codec lifetime error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A memory pool refused an allocation
    #[error("Memory error: {0}")]
    Memory(#[from] PoolError),

    /// An adaptive frame buffer cannot take more bytes
    #[error("Frame buffer full: {needed} bytes requested, {available} of {capacity} free")]
    BufferFull {
        needed: usize,
        available: usize,
        capacity: usize,
    },

    /// A frame does not fit the fixed scratch buffer
    #[error("Frame of {size} bytes exceeds the {capacity} byte scratch buffer")]
    Capacity { size: usize, capacity: usize },

    /// The frame's codec failed to decode it
    #[error("Codec {codec} decoder error: {source}")]
    Decode {
        codec: String,
        #[source]
        source: CodecError,
    },

    /// The session's codec failed to encode a frame
    #[error("Codec {codec} encoder error: {source}")]
    Encode {
        codec: String,
        #[source]
        source: CodecError,
    },

    /// The endpoint does not implement this routine
    #[error("Operation not supported by endpoint: {operation}")]
    Unsupported { operation: &'static str },

    /// The endpoint gave up waiting
    #[error("Operation timed out")]
    Timeout,

    /// An endpoint routine, hook or handler reported failure
    #[error("Operation failed: {0}")]
    Failed(String),

    /// A thread could not be spawned or panicked
    #[error("Thread error: {0}")]
    Thread(String),

    /// The session was already torn down
    #[error("Session {name} has been destroyed")]
    SessionDestroyed { name: String },
}

impl SwitchError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Create an unsupported-routine error
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Whether the caller may simply retry or continue with the next frame
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::Decode { .. }
                | Self::Encode { .. }
                | Self::BufferFull { .. }
                | Self::Capacity { .. }
        )
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_)
            | Self::EndpointNotFound { .. }
            | Self::TimerNotFound { .. }
            | Self::DialplanNotFound { .. }
            | Self::ApplicationNotFound { .. }
            | Self::Codec(_) => ErrorCategory::Configuration,

            Self::Memory(_) | Self::BufferFull { .. } | Self::Capacity { .. } => {
                ErrorCategory::Resource
            }

            Self::Decode { .. } | Self::Encode { .. } => ErrorCategory::Codec,

            Self::Unsupported { .. } | Self::Timeout | Self::Failed(_) => ErrorCategory::Endpoint,

            Self::Thread(_) | Self::SessionDestroyed { .. } => ErrorCategory::Lifecycle,
        }
    }
}

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Lookups and negotiation; nothing changed
    Configuration,
    /// Allocation and buffer capacity
    Resource,
    /// Encode/decode failures; the frame in flight was dropped
    Codec,
    /// Endpoint routines and hooks
    Endpoint,
    /// Threads and session teardown
    Lifecycle,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Resource => write!(f, "Resource"),
            Self::Codec => write!(f, "Codec"),
            Self::Endpoint => write!(f, "Endpoint"),
            Self::Lifecycle => write!(f, "Lifecycle"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            SwitchError::from(CodecError::not_found("G729")).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            SwitchError::from(PoolError::Destroyed { pool: "s".into() }).category(),
            ErrorCategory::Resource
        );
        assert_eq!(
            SwitchError::Encode {
                codec: "PCMU".into(),
                source: CodecError::encoding_failed("PCMU", "bad"),
            }
            .category(),
            ErrorCategory::Codec
        );
        assert_eq!(SwitchError::Timeout.category(), ErrorCategory::Endpoint);
    }

    #[test]
    fn test_decode_error_display_names_codec() {
        let err = SwitchError::Decode {
            codec: "PCMA".into(),
            source: CodecError::decoding_failed("PCMA", "truncated"),
        };
        assert!(err.to_string().starts_with("Codec PCMA decoder error"));
        assert!(err.is_recoverable());
        assert!(!SwitchError::failed("x").is_recoverable());
    }
}
