//! Cross-core shared motion state.
//!
//! One writer per field: the link side publishes commands and gate
//! flags, the motion thread publishes positions. Every shared value is
//! a single machine word, so readers never observe a torn value; the
//! hand-off points use release/acquire ordering.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};

use aster_common::axis::Axis;
use aster_common::consts::NUM_AXES;

// ─── Command slot ───────────────────────────────────────────────────

const SLOT_VALID: u64 = 1 << 32;

/// Single-slot absolute-move mailbox, one per axis.
///
/// The valid bit and the target ride in one `AtomicU64`, so publish,
/// cancel and completion are each one atomic operation and there is no
/// separate `valid` flag to race against. Completion uses CAS so that
/// a target published while the scheduler is finishing the previous
/// move is never erased.
#[derive(Debug, Default)]
pub struct CommandSlot(AtomicU64);

impl CommandSlot {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Publish a new target [arc-sec], replacing any occupant.
    pub fn publish(&self, target_arcsec: i32) {
        self.0
            .store(SLOT_VALID | u64::from(target_arcsec as u32), Ordering::Release);
    }

    /// Cancel whatever the slot holds.
    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }

    /// Current target, if the slot is occupied.
    pub fn load(&self) -> Option<i32> {
        let v = self.0.load(Ordering::Acquire);
        if v & SLOT_VALID != 0 {
            Some(v as u32 as i32)
        } else {
            None
        }
    }

    /// Clear the slot only if it still holds `target_arcsec`.
    ///
    /// Returns `false` when a newer target was published concurrently;
    /// the newer target stays in place.
    pub fn complete(&self, target_arcsec: i32) -> bool {
        let current = SLOT_VALID | u64::from(target_arcsec as u32);
        self.0
            .compare_exchange(current, 0, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    pub fn is_occupied(&self) -> bool {
        self.0.load(Ordering::Acquire) & SLOT_VALID != 0
    }
}

// ─── Tracking record ────────────────────────────────────────────────

/// Global tracking-mode record: three f32 rate cells plus the active
/// flag. Rates are stored before the flag is released, so a reader
/// that observes `active` also observes the rates that go with it.
/// Each activation bumps an epoch counter so the scheduler can tell a
/// restarted session from a continuing one and relatch direction pins.
#[derive(Debug)]
pub struct TrackingCell {
    active: AtomicBool,
    epoch: AtomicU32,
    rates_bits: [AtomicU32; NUM_AXES],
}

impl TrackingCell {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            epoch: AtomicU32::new(0),
            rates_bits: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    /// Store per-axis rates [arc-sec/s] and activate tracking.
    pub fn start(&self, rates: [f32; NUM_AXES]) {
        for (cell, rate) in self.rates_bits.iter().zip(rates) {
            cell.store(rate.to_bits(), Ordering::Relaxed);
        }
        self.epoch.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    pub fn stop(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Rate for one axis [arc-sec/s]; sign encodes direction.
    pub fn rate(&self, axis: Axis) -> f32 {
        f32::from_bits(self.rates_bits[axis.index()].load(Ordering::Relaxed))
    }

    /// Activation generation; bumped by every [`TrackingCell::start`].
    pub fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Relaxed)
    }
}

impl Default for TrackingCell {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Shared aggregate ───────────────────────────────────────────────

/// All state shared between the link side and the motion thread.
///
/// Power-on state: drivers disabled, paused. A RESUME is required
/// before any motion.
#[derive(Debug)]
pub struct MotionShared {
    enabled: AtomicBool,
    paused: AtomicBool,
    positions: [AtomicI32; NUM_AXES],
    pub slots: [CommandSlot; NUM_AXES],
    pub tracking: TrackingCell,
}

impl MotionShared {
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            paused: AtomicBool::new(true),
            positions: [AtomicI32::new(0), AtomicI32::new(0), AtomicI32::new(0)],
            slots: [CommandSlot::new(), CommandSlot::new(), CommandSlot::new()],
            tracking: TrackingCell::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Position in microsteps. Written only by the motion thread;
    /// other readers use a relaxed load of the single word.
    pub fn position_steps(&self, axis: Axis) -> i32 {
        self.positions[axis.index()].load(Ordering::Relaxed)
    }

    /// Publish a new position count. The motion thread is the only
    /// writer in production; tests use this as the stand-in.
    pub fn store_position(&self, axis: Axis, steps: i32) {
        self.positions[axis.index()].store(steps, Ordering::Release);
    }

    /// Cancel all three static move slots.
    pub fn clear_all_slots(&self) {
        for slot in &self.slots {
            slot.clear();
        }
    }
}

impl Default for MotionShared {
    fn default() -> Self {
        Self::new()
    }
}
