//! Built-in codec implementations

use crate::registry::CodecInterface;
use crate::types::{CodecBackend, CodecImplementation};
use std::sync::Arc;

pub mod g711;
pub mod l16;

/// Frame durations offered by every built-in codec, in preference order
pub const FRAME_DURATIONS_MS: [u32; 3] = [10, 20, 30];

/// All built-in codec interfaces: `L16`, `PCMU`, `PCMA`
pub fn builtin_interfaces() -> Vec<CodecInterface> {
    vec![
        l16::interface(),
        g711::interface(g711::Law::Mu),
        g711::interface(g711::Law::A),
    ]
}

/// Mono 16-bit implementations of one codec at `rate` for every frame duration.
///
/// `encoded_bytes_per_sample` is 2 for linear codecs and 1 for G.711.
pub(crate) fn frame_implementations(
    iananame: &str,
    rate: u32,
    encoded_bytes_per_sample: usize,
    backend: &Arc<dyn CodecBackend>,
) -> Vec<CodecImplementation> {
    FRAME_DURATIONS_MS
        .iter()
        .map(|ms| {
            let samples = rate / 1000 * ms;
            CodecImplementation {
                iananame: iananame.to_string(),
                samples_per_second: rate,
                microseconds_per_frame: ms * 1000,
                samples_per_frame: samples,
                bytes_per_frame: samples as usize * 2,
                encoded_bytes_per_frame: samples as usize * encoded_bytes_per_sample,
                channels: 1,
                backend: Arc::clone(backend),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let names: Vec<String> = builtin_interfaces().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["L16", "PCMU", "PCMA"]);
    }
}
