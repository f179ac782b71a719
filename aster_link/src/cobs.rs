//! Consistent-overhead byte stuffing.
//!
//! The encoded stream contains no zero bytes; a single trailing zero
//! delimits the frame, so a receiver resynchronises on any delimiter.
//! For payloads under 254 bytes the overhead is exactly one code byte
//! plus the delimiter. A flipped bit corrupts at most two decoded
//! bytes; the frame CRC is the authoritative validator.

use thiserror::Error;

/// Codec failure. Malformed *input* is not an error — the decoder
/// stops at the first embedded delimiter and leaves the rest to the
/// CRC check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CobsError {
    /// Destination buffer cannot hold the result.
    #[error("output buffer too small")]
    OutputTooSmall,
}

/// Worst-case encoded size for an `n`-byte payload, including the
/// trailing delimiter.
pub const fn max_encoded_len(n: usize) -> usize {
    n + n / 254 + 2
}

/// Stuff `src` into `dst`, appending the frame delimiter.
///
/// Returns the number of bytes written (delimiter included).
pub fn encode(src: &[u8], dst: &mut [u8]) -> Result<usize, CobsError> {
    if dst.is_empty() {
        return Err(CobsError::OutputTooSmall);
    }

    let mut code_idx = 0;
    let mut code: u8 = 1;
    let mut out = 1;

    for &byte in src {
        if byte == 0 {
            dst[code_idx] = code;
            code_idx = out;
            out += 1;
            if out > dst.len() {
                return Err(CobsError::OutputTooSmall);
            }
            code = 1;
        } else {
            if out >= dst.len() {
                return Err(CobsError::OutputTooSmall);
            }
            dst[out] = byte;
            out += 1;
            code += 1;
            if code == 0xFF {
                dst[code_idx] = code;
                code_idx = out;
                out += 1;
                if out > dst.len() {
                    return Err(CobsError::OutputTooSmall);
                }
                code = 1;
            }
        }
    }

    dst[code_idx] = code;
    if out >= dst.len() {
        return Err(CobsError::OutputTooSmall);
    }
    dst[out] = 0;
    Ok(out + 1)
}

/// Unstuff `src` (the bytes *between* delimiters) into `dst`.
///
/// Returns the number of payload bytes written. Stops quietly at an
/// embedded delimiter or truncated block; the caller's CRC check
/// rejects the damage.
pub fn decode(src: &[u8], dst: &mut [u8]) -> Result<usize, CobsError> {
    let mut out = 0;
    let mut i = 0;

    while i < src.len() {
        let code = src[i];
        if code == 0 {
            break;
        }
        i += 1;

        let run = code as usize - 1;
        let mut copied = 0;
        while copied < run && i < src.len() {
            let byte = src[i];
            if byte == 0 {
                return Ok(out);
            }
            if out >= dst.len() {
                return Err(CobsError::OutputTooSmall);
            }
            dst[out] = byte;
            out += 1;
            i += 1;
            copied += 1;
        }
        if copied < run {
            break;
        }

        if code != 0xFF && i < src.len() {
            if out >= dst.len() {
                return Err(CobsError::OutputTooSmall);
            }
            dst[out] = 0;
            out += 1;
        }
    }

    Ok(out)
}
