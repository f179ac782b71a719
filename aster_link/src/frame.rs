//! Frame build and parse.
//!
//! Decoded layout: `[cmd u8] [msg_id u8] [len u8] [data × len] [crc8]`,
//! minimum 4 bytes. The CRC covers everything before it. On the wire
//! the whole image is byte-stuffed and terminated with a single zero.

use heapless::Vec;
use static_assertions::const_assert;
use thiserror::Error;

use aster_common::consts::MAX_FRAME_PAYLOAD;

use crate::cobs::{self, CobsError};
use crate::crc::crc8;

/// Smallest valid decoded frame: cmd + id + len + crc.
pub const FRAME_MIN_DECODED: usize = 4;

/// Largest decoded frame: header + payload + crc.
pub const FRAME_MAX_DECODED: usize = MAX_FRAME_PAYLOAD + FRAME_MIN_DECODED;

/// Largest wire image of a frame, delimiter included.
pub const FRAME_MAX_WIRE: usize = cobs::max_encoded_len(FRAME_MAX_DECODED);

const_assert!(FRAME_MAX_DECODED <= 128);

/// Frame validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Decoded frame shorter than the 4-byte minimum.
    #[error("frame too short")]
    TooShort,

    /// Length field disagrees with the decoded size.
    #[error("length field {declared} does not match decoded size {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// CRC over the body does not match the trailing byte.
    #[error("crc mismatch: computed {computed:#04x}, received {received:#04x}")]
    CrcMismatch { computed: u8, received: u8 },

    /// Payload longer than [`MAX_FRAME_PAYLOAD`].
    #[error("payload exceeds {MAX_FRAME_PAYLOAD} bytes")]
    PayloadTooLong,

    /// Encode destination buffer too small.
    #[error("encode buffer too small")]
    BufferTooSmall,
}

impl From<CobsError> for FrameError {
    fn from(_: CobsError) -> Self {
        Self::BufferTooSmall
    }
}

/// A validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub cmd: u8,
    pub msg_id: u8,
    pub payload: Vec<u8, MAX_FRAME_PAYLOAD>,
}

impl Frame {
    pub fn new(cmd: u8, msg_id: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLong)?;
        Ok(Self {
            cmd,
            msg_id,
            payload,
        })
    }

    /// Parse and validate a decoded (unstuffed) frame image.
    pub fn parse(decoded: &[u8]) -> Result<Self, FrameError> {
        if decoded.len() < FRAME_MIN_DECODED {
            return Err(FrameError::TooShort);
        }
        let declared = decoded[2] as usize;
        if decoded.len() != declared + FRAME_MIN_DECODED {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: decoded.len(),
            });
        }
        let body_len = decoded.len() - 1;
        let computed = crc8(&decoded[..body_len]);
        let received = decoded[body_len];
        if computed != received {
            return Err(FrameError::CrcMismatch { computed, received });
        }
        Self::new(decoded[0], decoded[1], &decoded[3..body_len])
    }

    /// Serialize body + CRC and stuff into `out`.
    ///
    /// Returns the wire size, trailing delimiter included.
    pub fn encode_wire(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let mut body = [0u8; FRAME_MAX_DECODED];
        let len = self.payload.len();
        body[0] = self.cmd;
        body[1] = self.msg_id;
        body[2] = len as u8;
        body[3..3 + len].copy_from_slice(&self.payload);
        body[3 + len] = crc8(&body[..3 + len]);

        Ok(cobs::encode(&body[..len + FRAME_MIN_DECODED], out)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_roundtrip(frame: &Frame) -> Frame {
        let mut wire = [0u8; FRAME_MAX_WIRE];
        let written = frame.encode_wire(&mut wire).unwrap();
        assert_eq!(wire[written - 1], 0);
        assert!(wire[..written - 1].iter().all(|&b| b != 0));

        let mut decoded = [0u8; FRAME_MAX_DECODED];
        let n = cobs::decode(&wire[..written - 1], &mut decoded).unwrap();
        Frame::parse(&decoded[..n]).unwrap()
    }

    #[test]
    fn parse_roundtrips_for_all_payload_sizes() {
        for len in 0..=MAX_FRAME_PAYLOAD {
            let payload: std::vec::Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(31)).collect();
            let frame = Frame::new(0x10, 0x42, &payload).unwrap();
            assert_eq!(wire_roundtrip(&frame), frame, "payload len {len}");
        }
    }

    #[test]
    fn short_frames_are_rejected() {
        assert_eq!(Frame::parse(&[]), Err(FrameError::TooShort));
        assert_eq!(Frame::parse(&[0x14, 0x42, 0x00]), Err(FrameError::TooShort));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        // len says 2 but only 1 data byte present.
        let body = [0x10u8, 0x42, 0x02, 0x07];
        let mut framed = body.to_vec();
        framed.push(crc8(&body));
        assert_eq!(
            Frame::parse(&framed),
            Err(FrameError::LengthMismatch {
                declared: 2,
                actual: 5
            })
        );
    }

    #[test]
    fn crc_mismatch_is_rejected() {
        let frame = Frame::new(0x20, 0x07, &[]).unwrap();
        let mut wire = [0u8; FRAME_MAX_WIRE];
        let written = frame.encode_wire(&mut wire).unwrap();

        let mut decoded = [0u8; FRAME_MAX_DECODED];
        let n = cobs::decode(&wire[..written - 1], &mut decoded).unwrap();
        decoded[0] ^= 0x01; // corrupt the command byte
        let err = Frame::parse(&decoded[..n]).unwrap_err();
        assert!(matches!(err, FrameError::CrcMismatch { .. }));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let payload = [0u8; MAX_FRAME_PAYLOAD + 1];
        assert_eq!(
            Frame::new(0x10, 0x01, &payload),
            Err(FrameError::PayloadTooLong)
        );
    }

    #[test]
    fn ack_frame_wire_layout() {
        // ACK for message 0x42: cmd 0x01, some id, len 1, data [0x42].
        let frame = Frame::new(0x01, 0x99, &[0x42]).unwrap();
        let mut wire = [0u8; FRAME_MAX_WIRE];
        let written = frame.encode_wire(&mut wire).unwrap();

        let mut decoded = [0u8; FRAME_MAX_DECODED];
        let n = cobs::decode(&wire[..written - 1], &mut decoded).unwrap();
        assert_eq!(n, 5);
        assert_eq!(decoded[0], 0x01);
        assert_eq!(decoded[1], 0x99);
        assert_eq!(decoded[2], 1);
        assert_eq!(decoded[3], 0x42);
        assert_eq!(decoded[4], crc8(&decoded[..4]));
    }
}
