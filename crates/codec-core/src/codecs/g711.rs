//! ITU-T G.711 μ-law (PCMU) and A-law (PCMA)
//!
//! Compression follows the ITU-T Software Tools Library reference: A-law keeps
//! the 13 most significant bits of the input and toggles the even bits,
//! μ-law keeps 14 bits, adds a bias of 33 and inverts the result. Expansion
//! goes through 256-entry tables built on first use.
//!
//! Raw audio is host-endian signed 16-bit linear PCM.

use super::frame_implementations;
use crate::error::{CodecError, Result};
use crate::registry::CodecInterface;
use crate::types::{
    CodecBackend, CodecFlags, CodecImplementation, CodecOutcome, CodecState,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

static ULAW_EXPAND: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = ulaw_expand_reference(code as u8);
    }
    table
});

static ALAW_EXPAND: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = alaw_expand_reference(code as u8);
    }
    table
});

/// Companding law
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Law {
    /// μ-law, payload name `PCMU`
    Mu,
    /// A-law, payload name `PCMA`
    A,
}

impl Law {
    /// IANA payload name
    pub fn iananame(self) -> &'static str {
        match self {
            Law::Mu => "PCMU",
            Law::A => "PCMA",
        }
    }

    /// Compress one linear sample
    pub fn compress(self, sample: i16) -> u8 {
        match self {
            Law::Mu => ulaw_compress(sample),
            Law::A => alaw_compress(sample),
        }
    }

    /// Expand one code word
    pub fn expand(self, code: u8) -> i16 {
        match self {
            Law::Mu => ULAW_EXPAND[code as usize],
            Law::A => ALAW_EXPAND[code as usize],
        }
    }
}

/// A-law compression of one 16-bit sample
pub fn alaw_compress(sample: i16) -> u8 {
    let mut ix = if sample < 0 {
        ((!sample) as u16 >> 4) as i16
    } else {
        sample >> 4
    };

    if ix > 15 {
        let mut exponent = 1;
        while ix > 16 + 15 {
            ix >>= 1;
            exponent += 1;
        }
        ix -= 16;
        ix += exponent << 4;
    }

    if sample >= 0 {
        ix |= 0x0080;
    }

    (ix ^ 0x0055) as u8
}

fn alaw_expand_reference(code: u8) -> i16 {
    let ix = (code ^ 0x55) as i16 & 0x007F;
    let exponent = ix >> 4;
    let mut mantissa = ix & 0x000F;

    if exponent > 0 {
        mantissa += 16;
    }
    mantissa = (mantissa << 4) + 0x0008;
    if exponent > 1 {
        mantissa <<= exponent - 1;
    }

    if code > 127 {
        mantissa
    } else {
        -mantissa
    }
}

/// μ-law compression of one 16-bit sample
pub fn ulaw_compress(sample: i16) -> u8 {
    let magnitude = if sample < 0 {
        ((!sample) as u16 >> 2) as i16 + 33
    } else {
        (sample >> 2) + 33
    };
    let magnitude = magnitude.min(0x1FFF);

    let mut segment = 1;
    let mut i = magnitude >> 6;
    while i != 0 {
        segment += 1;
        i >>= 1;
    }

    let high = 0x0008 - segment;
    let low = 0x000F - ((magnitude >> segment) & 0x000F);
    let mut code = (high << 4) | low;
    if sample >= 0 {
        code |= 0x0080;
    }
    code as u8
}

fn ulaw_expand_reference(code: u8) -> i16 {
    let sign = if code < 0x80 { -1 } else { 1 };
    let inverted = (!code) as i16;
    let exponent = (inverted >> 4) & 0x0007;
    let mantissa = inverted & 0x000F;
    let step = 4 << (exponent + 1);

    sign * ((0x0080 << exponent) + step * mantissa + step / 2 - 4 * 33)
}

struct G711Backend {
    law: Law,
}

impl CodecBackend for G711Backend {
    fn init(
        &self,
        _implementation: &CodecImplementation,
        _flags: CodecFlags,
    ) -> Result<Box<dyn CodecState>> {
        Ok(Box::new(G711State { law: self.law }))
    }
}

struct G711State {
    law: Law,
}

impl CodecState for G711State {
    fn encode(
        &mut self,
        _other: Option<&CodecImplementation>,
        decoded: &[u8],
        encoded: &mut [u8],
    ) -> Result<CodecOutcome> {
        if decoded.len() % 2 != 0 {
            return Err(CodecError::InvalidFrameSize {
                size: decoded.len(),
                unit: 2,
            });
        }
        let samples = decoded.len() / 2;
        if encoded.len() < samples {
            return Err(CodecError::BufferTooSmall {
                needed: samples,
                actual: encoded.len(),
            });
        }

        for (pair, out) in decoded.chunks_exact(2).zip(encoded.iter_mut()) {
            *out = self.law.compress(i16::from_ne_bytes([pair[0], pair[1]]));
        }
        Ok(CodecOutcome::Processed(samples))
    }

    fn decode(
        &mut self,
        _other: Option<&CodecImplementation>,
        encoded: &[u8],
        decoded: &mut [u8],
    ) -> Result<CodecOutcome> {
        let needed = encoded.len() * 2;
        if decoded.len() < needed {
            return Err(CodecError::BufferTooSmall {
                needed,
                actual: decoded.len(),
            });
        }

        for (code, out) in encoded.iter().zip(decoded.chunks_exact_mut(2)) {
            out.copy_from_slice(&self.law.expand(*code).to_ne_bytes());
        }
        Ok(CodecOutcome::Processed(needed))
    }
}

/// Codec interface for one companding law at 8 kHz, 10/20/30 ms
pub fn interface(law: Law) -> CodecInterface {
    let backend: Arc<dyn CodecBackend> = Arc::new(G711Backend { law });
    CodecInterface::new(
        law.iananame(),
        frame_implementations(law.iananame(), 8000, 1, &backend),
    )
}
