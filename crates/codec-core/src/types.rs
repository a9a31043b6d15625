//! Core types and traits for the codec capability interface
//!
//! A codec is described by one or more [`CodecImplementation`]s (one per
//! sample rate / frame duration pair). Each implementation carries a
//! [`CodecBackend`] that creates the per-codec [`CodecState`] doing the
//! actual encode and decode work.

use crate::error::Result;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

/// Operations a codec is initialized for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CodecFlags(u32);

impl CodecFlags {
    /// No operation enabled
    pub const NONE: Self = Self(0);
    /// Encoding enabled
    pub const ENCODE: Self = Self(1 << 0);
    /// Decoding enabled
    pub const DECODE: Self = Self(1 << 1);
    /// Both directions
    pub const BOTH: Self = Self(Self::ENCODE.0 | Self::DECODE.0);

    /// Raw bit representation
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CodecFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Result of a successful encode or decode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecOutcome {
    /// `n` bytes were written to the output buffer
    Processed(usize),
    /// The codec did not transform the data; the input is already in the target format
    NoOp,
}

/// Factory for per-codec state
pub trait CodecBackend: Send + Sync {
    /// Create the state for a codec negotiated on `implementation`
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InitializationFailed`](crate::CodecError::InitializationFailed)
    /// when the implementation cannot operate with the requested flags.
    fn init(
        &self,
        implementation: &CodecImplementation,
        flags: CodecFlags,
    ) -> Result<Box<dyn CodecState>>;
}

/// Per-codec working state
///
/// `other` is the implementation on the opposite side of the conversion,
/// when there is one. Built-in codecs ignore it.
pub trait CodecState: Send {
    /// Encode raw linear audio from `decoded` into `encoded`
    fn encode(
        &mut self,
        other: Option<&CodecImplementation>,
        decoded: &[u8],
        encoded: &mut [u8],
    ) -> Result<CodecOutcome>;

    /// Decode `encoded` into raw linear audio in `decoded`
    fn decode(
        &mut self,
        other: Option<&CodecImplementation>,
        encoded: &[u8],
        decoded: &mut [u8],
    ) -> Result<CodecOutcome>;

    /// Release implementation resources
    fn destroy(&mut self) {}
}

/// One concrete variant of a codec (rate, frame duration, sizes)
#[derive(Clone)]
pub struct CodecImplementation {
    /// IANA registered name, e.g. `PCMU`
    pub iananame: String,
    /// Sample rate in Hz
    pub samples_per_second: u32,
    /// Duration of one frame in microseconds
    pub microseconds_per_frame: u32,
    /// Samples in one frame
    pub samples_per_frame: u32,
    /// Bytes of raw linear audio in one frame (the native frame size)
    pub bytes_per_frame: usize,
    /// Bytes of encoded payload in one frame
    pub encoded_bytes_per_frame: usize,
    /// Number of channels
    pub channels: u8,
    /// Backend creating the codec state
    pub backend: Arc<dyn CodecBackend>,
}

impl CodecImplementation {
    /// Frame duration in whole milliseconds
    pub fn milliseconds_per_frame(&self) -> u32 {
        self.microseconds_per_frame / 1000
    }

    /// Whether this implementation satisfies a rate / duration request.
    ///
    /// `None` matches anything.
    pub fn matches(&self, rate: Option<u32>, ms: Option<u32>) -> bool {
        rate.map_or(true, |rate| rate == self.samples_per_second)
            && ms.map_or(true, |ms| ms == self.milliseconds_per_frame())
    }
}

impl fmt::Debug for CodecImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecImplementation")
            .field("iananame", &self.iananame)
            .field("samples_per_second", &self.samples_per_second)
            .field("microseconds_per_frame", &self.microseconds_per_frame)
            .field("samples_per_frame", &self.samples_per_frame)
            .field("bytes_per_frame", &self.bytes_per_frame)
            .field("encoded_bytes_per_frame", &self.encoded_bytes_per_frame)
            .field("channels", &self.channels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let flags = CodecFlags::ENCODE | CodecFlags::DECODE;
        assert_eq!(flags, CodecFlags::BOTH);
        assert!(flags.contains(CodecFlags::DECODE));
        assert!(!CodecFlags::ENCODE.contains(CodecFlags::DECODE));
        assert!(CodecFlags::NONE.contains(CodecFlags::NONE));
    }
}
