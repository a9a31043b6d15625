//! # Softswitch infrastructure
//!
//! Pieces shared by every layer of the softswitch core:
//!
//! - [`memory`]: hierarchical, scope-owned memory pools
//! - [`logging`]: `tracing` subscriber setup
//! - [`errors`]: the error types those two raise

pub mod errors;
pub mod logging;
pub mod memory;

pub use errors::{Error, PoolError, Result};
pub use logging::{setup_logging, LoggingConfig};
pub use memory::{BlockId, MemoryPool};
