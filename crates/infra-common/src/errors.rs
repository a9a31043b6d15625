//! Error types shared by the infrastructure layer

use thiserror::Error;

/// Result type alias for infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a [`MemoryPool`](crate::memory::MemoryPool)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool (or one of its ancestors) would exceed its byte budget
    #[error("Memory pool '{pool}' exhausted: requested {requested} bytes with {used} of {limit} in use")]
    Exhausted {
        pool: String,
        requested: usize,
        used: usize,
        limit: usize,
    },

    /// The pool was already destroyed
    #[error("Memory pool '{pool}' has been destroyed")]
    Destroyed { pool: String },
}

impl PoolError {
    /// Name of the pool that refused the request
    pub fn pool(&self) -> &str {
        match self {
            Self::Exhausted { pool, .. } | Self::Destroyed { pool } => pool,
        }
    }
}

/// General infrastructure error
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The logging system could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// Memory pool failure
    #[error(transparent)]
    Pool(#[from] PoolError),
}
