//! Periodic STATUS telemetry.
//!
//! Fixed 19-byte little-endian record, emitted every two seconds
//! through the response queue like any other reply:
//!
//! | Offset | Size | Field                        |
//! |--------|------|------------------------------|
//! | 0      | 4    | temperature °C (f32)         |
//! | 4      | 4    | X position (i32, arc-sec)    |
//! | 8      | 4    | Y position (i32, arc-sec)    |
//! | 12     | 4    | Z position (i32, arc-sec)    |
//! | 16     | 1    | enabled (0/1)                |
//! | 17     | 1    | paused (0/1)                 |
//! | 18     | 1    | fan duty percent (0..100)    |

use static_assertions::const_assert_eq;

use aster_common::clock::elapsed_us;
use aster_link::{CommandCode, Response};
use aster_motion::MotionSnapshot;

/// Size of the STATUS record on the wire.
pub const STATUS_RECORD_LEN: usize = 19;

const_assert_eq!(STATUS_RECORD_LEN, 4 + 3 * 4 + 3);

/// Environmental inputs to the STATUS record. The DS18B20 one-wire
/// sensor and the PWM fan are external collaborators; a board driver
/// implements this seam.
pub trait EnvSensors: Send {
    /// Latest temperature reading [°C].
    fn temperature_c(&mut self) -> f32;

    /// Commanded fan duty [percent].
    fn fan_duty_percent(&self) -> u8;
}

/// Fixed readings, used by tests and until a board driver exists.
/// Fan duty comes from config; there is no wire command for it.
#[derive(Debug, Clone, Copy)]
pub struct FixedEnv {
    pub temperature_c: f32,
    pub fan_duty_percent: u8,
}

impl Default for FixedEnv {
    fn default() -> Self {
        Self {
            temperature_c: 20.0,
            fan_duty_percent: 100,
        }
    }
}

impl EnvSensors for FixedEnv {
    fn temperature_c(&mut self) -> f32 {
        self.temperature_c
    }

    fn fan_duty_percent(&self) -> u8 {
        self.fan_duty_percent
    }
}

/// Assemble the STATUS record.
pub fn encode_status(
    snapshot: &MotionSnapshot,
    temperature_c: f32,
    fan_duty_percent: u8,
) -> [u8; STATUS_RECORD_LEN] {
    let mut record = [0u8; STATUS_RECORD_LEN];
    record[0..4].copy_from_slice(&temperature_c.to_le_bytes());
    for (i, position) in snapshot.positions_arcsec.iter().enumerate() {
        let off = 4 + i * 4;
        record[off..off + 4].copy_from_slice(&position.to_le_bytes());
    }
    record[16] = u8::from(snapshot.enabled);
    record[17] = u8::from(snapshot.paused);
    record[18] = fan_duty_percent;
    record
}

/// STATUS as a queueable response.
pub fn status_response(
    snapshot: &MotionSnapshot,
    env: &mut dyn EnvSensors,
) -> Option<Response> {
    let record = encode_status(snapshot, env.temperature_c(), env.fan_duty_percent());
    Response::new(CommandCode::Status, &record)
}

/// Wrap-aware periodic tick.
#[derive(Debug, Clone, Copy)]
pub struct StatusTicker {
    interval_us: u32,
    last_us: u32,
}

impl StatusTicker {
    pub fn new(interval_ms: u64, now_us: u32) -> Self {
        Self {
            interval_us: (interval_ms as u32).saturating_mul(1_000),
            last_us: now_us,
        }
    }

    /// True once per elapsed interval; re-arms itself.
    pub fn due(&mut self, now_us: u32) -> bool {
        if elapsed_us(now_us, self.last_us) >= self.interval_us {
            self.last_us = now_us;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout_is_little_endian() {
        let snapshot = MotionSnapshot {
            positions_arcsec: [1_000, -2_000, 300],
            enabled: true,
            paused: false,
        };
        let record = encode_status(&snapshot, 21.5, 100);

        assert_eq!(f32::from_le_bytes(record[0..4].try_into().unwrap()), 21.5);
        assert_eq!(i32::from_le_bytes(record[4..8].try_into().unwrap()), 1_000);
        assert_eq!(i32::from_le_bytes(record[8..12].try_into().unwrap()), -2_000);
        assert_eq!(i32::from_le_bytes(record[12..16].try_into().unwrap()), 300);
        assert_eq!(record[16], 1);
        assert_eq!(record[17], 0);
        assert_eq!(record[18], 100);
    }

    #[test]
    fn status_response_carries_the_record() {
        let snapshot = MotionSnapshot {
            positions_arcsec: [0, 0, 0],
            enabled: false,
            paused: true,
        };
        let mut env = FixedEnv::default();
        let response = status_response(&snapshot, &mut env).unwrap();
        assert_eq!(response.cmd, CommandCode::Status as u8);
        assert_eq!(response.payload.len(), STATUS_RECORD_LEN);
        assert_eq!(response.payload[17], 1);
    }

    #[test]
    fn ticker_fires_once_per_interval() {
        let mut ticker = StatusTicker::new(2_000, 0);
        assert!(!ticker.due(1_000_000));
        assert!(ticker.due(2_000_000));
        assert!(!ticker.due(2_500_000));
        assert!(ticker.due(4_100_000));
    }

    #[test]
    fn ticker_survives_timestamp_wrap() {
        let start = u32::MAX - 500_000;
        let mut ticker = StatusTicker::new(2_000, start);
        assert!(!ticker.due(start.wrapping_add(1_000_000)));
        assert!(ticker.due(start.wrapping_add(2_000_000)));
    }
}
