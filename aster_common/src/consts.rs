//! System-wide constants for the aster workspace.
//!
//! Single source of truth for all numeric limits and protocol defaults.
//! Imported by all crates — no duplication permitted.

// ─── Mechanics ──────────────────────────────────────────────────────

/// Number of controlled axes (X, Y, Z).
pub const NUM_AXES: usize = 3;

/// Motor full steps per revolution.
pub const STEPS_PER_REV: u32 = 400;

/// Driver microstepping factor.
pub const MICROSTEPPING: u32 = 16;

/// Arc-seconds in a full revolution (360 · 60 · 60).
pub const ARCSEC_PER_REV: f64 = 1_296_000.0;

/// X axis gear ratio (400:14). X is a mechanically coupled driver pair.
pub const X_GEAR_RATIO: f32 = 28.5714285714;

/// Y axis gear ratio (330:14).
pub const Y_GEAR_RATIO: f32 = 23.5714285714;

/// Z axis gear ratio (420:14).
pub const Z_GEAR_RATIO: f32 = 30.0;

// ─── Motion timing ──────────────────────────────────────────────────

/// Step pulse high time [µs]. The TMC2209 requires at least 1 µs.
pub const STEP_PULSE_US: u32 = 5;

/// Interval between step pulses in static mode [µs] (1 kHz step rate).
pub const STEP_INTERVAL_US: u32 = 1_000;

/// Settle time between a direction change and the next step [µs].
pub const DIR_SETUP_US: u32 = 1;

/// Scheduler sleep while disabled or paused [ms].
pub const IDLE_SLEEP_MS: u64 = 10;

/// Scheduler yield after a pass that emitted at least one step [µs].
pub const ACTIVE_SLEEP_US: u64 = 50;

/// Scheduler yield after a pass that emitted no step [µs].
pub const INACTIVE_SLEEP_US: u64 = 1_000;

// ─── Link protocol ──────────────────────────────────────────────────

/// Serial line rate [baud]: 8 data bits, no parity, 1 stop bit.
pub const BAUD_RATE: u32 = 9_600;

/// Time to wait for an ACK before retransmitting [ms].
pub const ACK_TIMEOUT_MS: u32 = 1_000;

/// Retransmission attempts before a message is declared lost.
pub const MAX_RETRANSMITS: u8 = 3;

/// Consecutive lost messages before the link state is reset.
pub const MAX_MISSED_ACKS: u8 = 2;

/// RX accumulator capacity [bytes]; longer frames are dropped.
pub const RX_BUFFER_SIZE: usize = 128;

/// Maximum payload of a tracked outbound message [bytes].
pub const MAX_FRAME_PAYLOAD: usize = 64;

/// Depth of the outbound response queue.
pub const RESPONSE_QUEUE_DEPTH: usize = 4;

/// Maximum payload of a queued response [bytes].
pub const MAX_RESPONSE_PAYLOAD: usize = 32;

// ─── Main loop / telemetry ──────────────────────────────────────────

/// Interval between periodic STATUS frames [ms].
pub const STATUS_INTERVAL_MS: u64 = 2_000;

/// Main-loop tick period [ms].
pub const MAIN_LOOP_SLEEP_MS: u64 = 1;
