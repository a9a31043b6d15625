//! Media frames and fixed-capacity scratch buffers

use crate::errors::{Result, SwitchError};
use bytes::Bytes;
use softswitch_codec_core::Codec;
use std::sync::Arc;

/// One unit of media payload
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Payload bytes
    pub data: Bytes,
    /// Codec the payload is encoded with; `None` for raw linear audio
    pub codec: Option<Arc<Codec>>,
    /// Samples covered by this frame
    pub timestamp_delta: u32,
    /// Endpoint specific flags, passed through untouched
    pub flags: u32,
}

impl Frame {
    /// Create a frame encoded with `codec`
    pub fn new(data: impl Into<Bytes>, codec: Option<Arc<Codec>>) -> Self {
        Self {
            data: data.into(),
            codec,
            ..Default::default()
        }
    }

    /// Create a raw linear audio frame
    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self::new(data, None)
    }

    /// Set the timestamp delta
    pub fn with_timestamp_delta(mut self, samples: u32) -> Self {
        self.timestamp_delta = samples;
        self
    }

    /// Set the flags
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Name of the payload codec
    pub fn codec_name(&self) -> Option<&str> {
        self.codec.as_deref().map(Codec::name)
    }
}

/// Fixed-capacity staging area for encode and decode output
pub(crate) struct ScratchBuffer {
    data: Box<[u8]>,
}

impl ScratchBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Reject payloads that cannot fit
    pub(crate) fn check(&self, size: usize) -> Result<()> {
        if size > self.data.len() {
            return Err(SwitchError::Capacity {
                size,
                capacity: self.data.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub(crate) fn bytes(&self, len: usize) -> Bytes {
        Bytes::copy_from_slice(&self.data[..len.min(self.data.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_rejects_oversized() {
        let scratch = ScratchBuffer::new(3200);
        assert!(scratch.check(3200).is_ok());
        assert!(matches!(
            scratch.check(3201),
            Err(SwitchError::Capacity { size: 3201, capacity: 3200 })
        ));
    }

    #[test]
    fn test_frame_builders() {
        let frame = Frame::raw(vec![1u8, 2, 3]).with_timestamp_delta(160).with_flags(4);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.timestamp_delta, 160);
        assert_eq!(frame.flags, 4);
        assert!(frame.codec_name().is_none());
    }
}
