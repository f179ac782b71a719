//! Command-side API of the motion subsystem.
//!
//! A [`MotionHandle`] is the only way the link dispatcher (and the
//! telemetry tick) touch motion state. Mode transitions are enforced
//! here: publishing a static move cancels tracking, starting tracking
//! clears all three command slots.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use aster_common::axis::Axis;
use aster_common::config::MountParams;
use aster_common::consts::NUM_AXES;
use aster_common::kinematics::steps_to_arcsec;

use crate::state::MotionShared;

/// Motion command rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MotionError {
    /// Motors are disabled; enable (RESUME) first.
    #[error("motors are disabled")]
    Disabled,
}

/// Telemetry view of the motion subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSnapshot {
    /// Per-axis positions [arc-sec].
    pub positions_arcsec: [i32; NUM_AXES],
    pub enabled: bool,
    pub paused: bool,
}

/// Cloneable handle used by the link side.
#[derive(Clone)]
pub struct MotionHandle {
    shared: Arc<MotionShared>,
    params: MountParams,
}

impl MotionHandle {
    pub fn new(shared: Arc<MotionShared>, params: MountParams) -> Self {
        Self { shared, params }
    }

    /// Flip the enable flag. The motion thread applies the EN pin on
    /// the next pass.
    pub fn set_enable(&self, enabled: bool) {
        self.shared.set_enabled(enabled);
        info!(enabled, "motors {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn pause(&self) {
        self.shared.set_paused(true);
        info!("motion paused");
    }

    /// Clear the pause gate; implicitly enables if disabled.
    pub fn resume(&self) {
        self.shared.set_paused(false);
        info!("motion resumed");
        if !self.shared.is_enabled() {
            self.set_enable(true);
        }
    }

    /// Publish an absolute move [arc-sec]. Cancels tracking.
    pub fn queue_static_move(&self, axis: Axis, target_arcsec: i32) -> Result<(), MotionError> {
        if !self.shared.is_enabled() {
            warn!(?axis, target_arcsec, "static move rejected: motors disabled");
            return Err(MotionError::Disabled);
        }
        if self.shared.tracking.is_active() {
            debug!("tracking cancelled by static move");
            self.shared.tracking.stop();
        }
        self.shared.slots[axis.index()].publish(target_arcsec);
        info!(?axis, target_arcsec, "static move queued");
        Ok(())
    }

    /// Start tracking at per-axis rates [arc-sec/s]. Clears all
    /// command slots.
    pub fn start_tracking(&self, rates: [f32; NUM_AXES]) -> Result<(), MotionError> {
        if !self.shared.is_enabled() {
            warn!("tracking rejected: motors disabled");
            return Err(MotionError::Disabled);
        }
        self.shared.clear_all_slots();
        self.shared.tracking.start(rates);
        info!(
            rate_x = rates[0],
            rate_y = rates[1],
            rate_z = rates[2],
            "tracking started"
        );
        Ok(())
    }

    pub fn stop_tracking(&self) {
        if self.shared.tracking.is_active() {
            self.shared.tracking.stop();
            info!("tracking stopped");
        }
    }

    /// Abandon all static moves; tracking is untouched.
    pub fn stop_all_moves(&self) {
        self.shared.clear_all_slots();
        info!("all static moves cleared");
    }

    pub fn position_steps(&self, axis: Axis) -> i32 {
        self.shared.position_steps(axis)
    }

    pub fn position_arcsec(&self, axis: Axis) -> i32 {
        steps_to_arcsec(self.position_steps(axis), self.params.gear_ratio(axis))
    }

    pub fn snapshot(&self) -> MotionSnapshot {
        let mut positions_arcsec = [0i32; NUM_AXES];
        for axis in Axis::ALL {
            positions_arcsec[axis.index()] = self.position_arcsec(axis);
        }
        MotionSnapshot {
            positions_arcsec,
            enabled: self.shared.is_enabled(),
            paused: self.shared.is_paused(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (Arc<MotionShared>, MotionHandle) {
        let shared = Arc::new(MotionShared::new());
        let handle = MotionHandle::new(shared.clone(), MountParams::default());
        (shared, handle)
    }

    #[test]
    fn moves_rejected_while_disabled() {
        let (shared, handle) = handle();
        assert_eq!(
            handle.queue_static_move(Axis::X, 1_000),
            Err(MotionError::Disabled)
        );
        assert_eq!(
            handle.start_tracking([1.0, 0.0, 0.0]),
            Err(MotionError::Disabled)
        );
        assert!(!shared.slots[Axis::X.index()].is_occupied());
        assert!(!shared.tracking.is_active());
    }

    #[test]
    fn resume_implicitly_enables() {
        let (shared, handle) = handle();
        assert!(!shared.is_enabled());
        assert!(shared.is_paused());

        handle.resume();
        assert!(shared.is_enabled());
        assert!(!shared.is_paused());
    }

    #[test]
    fn static_move_cancels_tracking() {
        let (shared, handle) = handle();
        handle.resume();

        handle.start_tracking([5.0, 0.0, 0.0]).unwrap();
        assert!(shared.tracking.is_active());

        handle.queue_static_move(Axis::Z, 250).unwrap();
        assert!(!shared.tracking.is_active());
        assert_eq!(shared.slots[Axis::Z.index()].load(), Some(250));
    }

    #[test]
    fn tracking_clears_all_slots() {
        let (shared, handle) = handle();
        handle.resume();

        for axis in Axis::ALL {
            handle.queue_static_move(axis, 100).unwrap();
        }
        handle.start_tracking([0.0, -2.5, 0.0]).unwrap();

        for axis in Axis::ALL {
            assert!(!shared.slots[axis.index()].is_occupied());
        }
        assert!(shared.tracking.is_active());
    }

    #[test]
    fn stop_all_moves_leaves_tracking_untouched() {
        let (shared, handle) = handle();
        handle.resume();

        handle.start_tracking([1.0, 1.0, 1.0]).unwrap();
        handle.stop_all_moves();
        assert!(shared.tracking.is_active());
    }

    #[test]
    fn snapshot_reports_flags_and_positions() {
        let (shared, handle) = handle();
        let snap = handle.snapshot();
        assert!(!snap.enabled);
        assert!(snap.paused);
        assert_eq!(snap.positions_arcsec, [0; NUM_AXES]);

        shared.store_position(Axis::Z, 27);
        let snap = handle.snapshot();
        // One Z step is 6.75 arc-sec: 27 steps → 182.25 → 182.
        assert_eq!(snap.positions_arcsec[Axis::Z.index()], 182);
    }
}
