//! Byte-exact size correction by appending trailing filler.
//!
//! Encoded JPEG, PNG and WebP streams all carry an explicit logical end
//! (`FFD9`, the `IEND` chunk, the RIFF length). Decoders stop there, so bytes
//! appended after it do not change the decoded image. The filler is a two
//! byte sentinel `FF FE` followed by zeros.
//!
//! Padding only ever appends. It never truncates or rewrites the encoded
//! bytes, and it is a no-op when the buffer already meets the floor.

use tracing::warn;

use crate::constraint::BYTES_PER_KB;
use crate::encode::{EncodeOutcome, ImageFormat};

/// Leading bytes of every filler run.
pub const SENTINEL: [u8; 2] = [0xFF, 0xFE];

const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
const PNG_IEND: [u8; 8] = [0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82];

/// Number of bytes needed for `len` to reach `target_kb`.
pub fn padding_len(len: usize, target_kb: f64) -> usize {
    let target_bytes = (target_kb * BYTES_PER_KB).ceil();
    if !target_bytes.is_finite() || target_bytes <= len as f64 {
        return 0;
    }
    target_bytes as usize - len
}

/// Append filler until `bytes` is at least `target_kb` long.
///
/// # Arguments
///
/// * `bytes` - Encoded stream, consumed and returned extended
/// * `target_kb` - Size floor in kilobytes (1 KB = 1024 bytes)
///
/// # Returns
///
/// The same bytes followed by `ceil(target_kb * 1024) - len` filler bytes,
/// or the input unchanged if it is already large enough.
///
/// # Example
///
/// ```ignore
/// let padded = pad(vec![1, 2, 3], 0.00390625); // 4 bytes
/// assert_eq!(padded, vec![1, 2, 3, 0xFF]);
/// ```
pub fn pad(mut bytes: Vec<u8>, target_kb: f64) -> Vec<u8> {
    let needed = padding_len(bytes.len(), target_kb);
    if needed == 0 {
        return bytes;
    }

    bytes.reserve_exact(needed);
    let head = needed.min(SENTINEL.len());
    bytes.extend_from_slice(&SENTINEL[..head]);
    bytes.resize(bytes.len() + (needed - head), 0);
    bytes
}

/// Pad an encoder outcome, warning if its format is not known to tolerate
/// trailing bytes at this point.
pub fn pad_outcome(outcome: EncodeOutcome, target_kb: f64) -> EncodeOutcome {
    if padding_len(outcome.len(), target_kb) == 0 {
        return outcome;
    }
    if !has_logical_end(outcome.format, &outcome.bytes) {
        warn!(
            format = %outcome.format,
            "stream does not end at its terminator, trailing filler may be read by decoders"
        );
    }
    let format = outcome.format;
    EncodeOutcome::new(format, pad(outcome.into_bytes(), target_kb))
}

/// Whether `bytes` ends exactly at the format's logical terminator, so that
/// anything appended is outside the decoded stream.
pub fn has_logical_end(format: ImageFormat, bytes: &[u8]) -> bool {
    match format {
        ImageFormat::Jpeg => bytes.ends_with(&JPEG_EOI),
        ImageFormat::Png => bytes.ends_with(&PNG_IEND),
        ImageFormat::WebP => riff_len(bytes).is_some_and(|riff| riff <= bytes.len()),
    }
}

/// Total file length declared by a RIFF header (payload size + 8).
fn riff_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" {
        return None;
    }
    let size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    usize::try_from(size).ok().map(|size| size + 8)
}


// ============================================================================
// Property-based tests
// ============================================================================
