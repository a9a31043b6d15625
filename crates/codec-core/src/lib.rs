//! # Softswitch codec core
//!
//! The capability interface the session core uses to negotiate and drive
//! audio codecs. It does not care how a codec works internally: a codec is a
//! set of [`CodecImplementation`]s, each of which can create per-codec state
//! that encodes and decodes whole frames.
//!
//! ```rust
//! use softswitch_codec_core::{CodecFlags, CodecOutcome, CodecRegistry};
//! use softswitch_infra_common::MemoryPool;
//!
//! let registry = CodecRegistry::with_builtin();
//! let pool = MemoryPool::new("example");
//! let codec = registry.init_codec("PCMU", Some(8000), Some(20), CodecFlags::BOTH, &pool)?;
//!
//! let raw = [0u8; 320];
//! let mut encoded = [0u8; 160];
//! assert_eq!(codec.encode(None, &raw, &mut encoded)?, CodecOutcome::Processed(160));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod codecs;
pub mod error;
pub mod registry;
pub mod types;

pub use codec::Codec;
pub use error::{CodecError, ErrorCategory, Result};
pub use registry::{CodecInterface, CodecRegistry};
pub use types::{CodecBackend, CodecFlags, CodecImplementation, CodecOutcome, CodecState};
