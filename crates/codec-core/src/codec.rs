//! Negotiated codec handle

use crate::error::{CodecError, Result};
use crate::types::{CodecFlags, CodecImplementation, CodecOutcome, CodecState};
use parking_lot::Mutex;
use softswitch_infra_common::MemoryPool;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A codec bound to one implementation and its own memory pool.
///
/// Codecs are shared through `Arc`: a session only holds a reference, and the
/// same codec may be attached to several sessions. The state lock serializes
/// encode and decode calls made through different holders.
pub struct Codec {
    name: String,
    implementation: Arc<CodecImplementation>,
    flags: CodecFlags,
    pool: Arc<MemoryPool>,
    state: Mutex<Option<Box<dyn CodecState>>>,
}

impl Codec {
    pub(crate) fn new(
        name: impl Into<String>,
        implementation: Arc<CodecImplementation>,
        flags: CodecFlags,
        pool: Arc<MemoryPool>,
        state: Box<dyn CodecState>,
    ) -> Self {
        Self {
            name: name.into(),
            implementation,
            flags,
            pool,
            state: Mutex::new(Some(state)),
        }
    }

    /// Interface name the codec was requested by
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The negotiated implementation
    pub fn implementation(&self) -> &Arc<CodecImplementation> {
        &self.implementation
    }

    /// Flags the codec was initialized with
    pub fn flags(&self) -> CodecFlags {
        self.flags
    }

    /// Memory pool owned by this codec
    pub fn pool(&self) -> &Arc<MemoryPool> {
        &self.pool
    }

    /// Bytes of raw audio per frame
    pub fn native_frame_bytes(&self) -> usize {
        self.implementation.bytes_per_frame
    }

    /// Whether the codec still has live state
    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Whether both codecs run the very same implementation
    pub fn same_implementation(&self, other: &Codec) -> bool {
        Arc::ptr_eq(&self.implementation, &other.implementation)
    }

    /// Encode `decoded` into `encoded`
    ///
    /// # Errors
    ///
    /// [`CodecError::OperationNotEnabled`] without [`CodecFlags::ENCODE`],
    /// [`CodecError::NotInitialized`] after [`destroy`](Self::destroy), or
    /// whatever the implementation reports.
    pub fn encode(
        &self,
        other: Option<&CodecImplementation>,
        decoded: &[u8],
        encoded: &mut [u8],
    ) -> Result<CodecOutcome> {
        self.require(CodecFlags::ENCODE, "encoding")?;
        let mut state = self.state.lock();
        let state = state.as_mut().ok_or_else(|| self.not_initialized())?;
        state.encode(other, decoded, encoded)
    }

    /// Decode `encoded` into `decoded`
    pub fn decode(
        &self,
        other: Option<&CodecImplementation>,
        encoded: &[u8],
        decoded: &mut [u8],
    ) -> Result<CodecOutcome> {
        self.require(CodecFlags::DECODE, "decoding")?;
        let mut state = self.state.lock();
        let state = state.as_mut().ok_or_else(|| self.not_initialized())?;
        state.decode(other, encoded, decoded)
    }

    /// Tear down the implementation state and release the codec pool.
    ///
    /// Idempotent. Sessions still holding the codec must not use it afterwards.
    pub fn destroy(&self) {
        let state = self.state.lock().take();
        if let Some(mut state) = state {
            state.destroy();
            self.pool.destroy();
            debug!(codec = %self.name, "Codec destroyed");
        }
    }

    fn require(&self, flag: CodecFlags, operation: &'static str) -> Result<()> {
        if self.flags.contains(flag) {
            Ok(())
        } else {
            Err(CodecError::OperationNotEnabled {
                name: self.name.clone(),
                operation,
            })
        }
    }

    fn not_initialized(&self) -> CodecError {
        CodecError::NotInitialized {
            name: self.name.clone(),
        }
    }
}

impl Drop for Codec {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("name", &self.name)
            .field("implementation", &self.implementation)
            .field("flags", &self.flags)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
