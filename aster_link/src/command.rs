//! Command codes and dispatch into the motion subsystem.
//!
//! The link engine has already ACKed the frame when a handler runs —
//! an ACK confirms receipt, not acceptance. Payload validation happens
//! here; a short or senseless payload is logged and dropped, and the
//! host observes silence.

use tracing::{debug, warn};

use aster_common::axis::Axis;
use aster_common::consts::NUM_AXES;
use aster_motion::MotionHandle;

use crate::engine::{CommandHandler, Response};

/// Wire command codes. All multi-byte payload fields are little-endian;
/// floats are IEEE-754 binary32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    /// Acknowledge: 1 byte, the acked message ID.
    Ack = 0x01,
    /// Absolute move: axis u8 + target i32 [arc-sec].
    MoveStatic = 0x10,
    /// Tracking rates: 3 × f32 [arc-sec/s] for X, Y, Z.
    MoveTracking = 0x11,
    /// Pause motion.
    Pause = 0x12,
    /// Resume motion (implicitly enables).
    Resume = 0x13,
    /// Disable the motor drivers.
    Stop = 0x14,
    /// Request a POSITION reply.
    GetPos = 0x20,
    /// Outbound: 3 × i32 [arc-sec].
    Position = 0x21,
    /// Outbound: periodic 19-byte telemetry record.
    Status = 0x22,
}

impl CommandCode {
    /// Convert from raw `u8`. Returns `None` for unknown codes.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Ack),
            0x10 => Some(Self::MoveStatic),
            0x11 => Some(Self::MoveTracking),
            0x12 => Some(Self::Pause),
            0x13 => Some(Self::Resume),
            0x14 => Some(Self::Stop),
            0x20 => Some(Self::GetPos),
            0x21 => Some(Self::Position),
            0x22 => Some(Self::Status),
            _ => None,
        }
    }
}

/// Translates decoded frames into motion calls and builds replies.
pub struct Dispatcher {
    motion: MotionHandle,
}

impl Dispatcher {
    pub fn new(motion: MotionHandle) -> Self {
        Self { motion }
    }

    fn move_static(&self, payload: &[u8]) {
        if payload.len() < 5 {
            warn!(len = payload.len(), "MOVE_STATIC payload too short, dropped");
            return;
        }
        let Some(axis) = Axis::from_u8(payload[0]) else {
            warn!(axis = payload[0], "MOVE_STATIC rejected: invalid axis");
            return;
        };
        let target = i32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
        if let Err(e) = self.motion.queue_static_move(axis, target) {
            warn!(?axis, target, "MOVE_STATIC rejected: {e}");
        }
    }

    fn move_tracking(&self, payload: &[u8]) {
        if payload.len() < 12 {
            warn!(len = payload.len(), "MOVE_TRACKING payload too short, dropped");
            return;
        }
        let mut rates = [0f32; NUM_AXES];
        for (i, rate) in rates.iter_mut().enumerate() {
            let off = i * 4;
            *rate = f32::from_le_bytes([
                payload[off],
                payload[off + 1],
                payload[off + 2],
                payload[off + 3],
            ]);
        }
        if let Err(e) = self.motion.start_tracking(rates) {
            warn!("MOVE_TRACKING rejected: {e}");
        }
    }

    fn position_reply(&self) -> Option<Response> {
        let mut payload = [0u8; NUM_AXES * 4];
        for axis in Axis::ALL {
            let arcsec = self.motion.position_arcsec(axis);
            payload[axis.index() * 4..axis.index() * 4 + 4]
                .copy_from_slice(&arcsec.to_le_bytes());
        }
        Response::new(CommandCode::Position, &payload)
    }
}

impl CommandHandler for Dispatcher {
    fn handle(&mut self, cmd: u8, payload: &[u8]) -> Option<Response> {
        let Some(code) = CommandCode::from_u8(cmd) else {
            warn!(cmd, "unknown command dropped");
            return None;
        };

        match code {
            // ACK frames are consumed by the link engine.
            CommandCode::Ack => None,
            CommandCode::MoveStatic => {
                self.move_static(payload);
                None
            }
            CommandCode::MoveTracking => {
                self.move_tracking(payload);
                None
            }
            CommandCode::Pause => {
                self.motion.pause();
                None
            }
            CommandCode::Resume => {
                self.motion.resume();
                None
            }
            CommandCode::Stop => {
                self.motion.set_enable(false);
                None
            }
            CommandCode::GetPos => self.position_reply(),
            CommandCode::Position | CommandCode::Status => {
                debug!(?code, "outbound-only command received, dropped");
                None
            }
        }
    }
}
