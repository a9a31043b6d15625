//! Signed linear 16-bit PCM
//!
//! L16 is the raw format itself, so every encode and decode is a no-op.

use super::frame_implementations;
use crate::error::Result;
use crate::registry::CodecInterface;
use crate::types::{
    CodecBackend, CodecFlags, CodecImplementation, CodecOutcome, CodecState,
};
use std::sync::Arc;

struct L16Backend;

impl CodecBackend for L16Backend {
    fn init(
        &self,
        _implementation: &CodecImplementation,
        _flags: CodecFlags,
    ) -> Result<Box<dyn CodecState>> {
        Ok(Box::new(L16State))
    }
}

struct L16State;

impl CodecState for L16State {
    fn encode(
        &mut self,
        _other: Option<&CodecImplementation>,
        _decoded: &[u8],
        _encoded: &mut [u8],
    ) -> Result<CodecOutcome> {
        Ok(CodecOutcome::NoOp)
    }

    fn decode(
        &mut self,
        _other: Option<&CodecImplementation>,
        _encoded: &[u8],
        _decoded: &mut [u8],
    ) -> Result<CodecOutcome> {
        Ok(CodecOutcome::NoOp)
    }
}

/// L16 at 8 kHz and 16 kHz, 10/20/30 ms
pub fn interface() -> CodecInterface {
    let backend: Arc<dyn CodecBackend> = Arc::new(L16Backend);
    let mut implementations = frame_implementations("L16", 8000, 2, &backend);
    implementations.extend(frame_implementations("L16", 16000, 2, &backend));
    CodecInterface::new("L16", implementations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l16_is_noop() {
        let l16 = interface();
        let imp = l16.find(Some(16000), Some(30)).unwrap();
        assert_eq!(imp.bytes_per_frame, 960);
        assert_eq!(imp.encoded_bytes_per_frame, 960);

        let mut state = imp.backend.init(imp, CodecFlags::BOTH).unwrap();
        let mut out = [0u8; 4];
        assert_eq!(state.encode(None, &[1, 2, 3, 4], &mut out).unwrap(), CodecOutcome::NoOp);
        assert_eq!(out, [0u8; 4]);
    }
}
