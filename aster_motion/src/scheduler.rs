//! The motion worker loop.
//!
//! Runs on its own thread (the "motion core"): an unbounded loop of
//! `pass()` calls separated by short sleeps. Two mutually exclusive
//! modes: *tracking* (continuous per-axis rates) and *static*
//! (point-to-point absolute moves). The loop body is a plain function
//! of the current timestamp so tests drive it deterministically with a
//! manual clock.
//!
//! ## RT Setup
//!
//! With the `rt` feature the thread is pinned to a dedicated core and
//! scheduled SCHED_FIFO before entering the loop; without it both are
//! no-ops and the loop runs as an ordinary thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use aster_common::axis::Axis;
use aster_common::clock::{elapsed_us, Clock};
use aster_common::config::{MotionTiming, MountParams};
use aster_common::consts::{ACTIVE_SLEEP_US, IDLE_SLEEP_MS, INACTIVE_SLEEP_US, NUM_AXES};
use aster_common::kinematics::{arcsec_to_steps, steps_per_arcsec};

use crate::io::MotionIo;
use crate::state::MotionShared;

/// CPU core the motion thread is pinned to (`rt` feature).
pub const MOTION_CPU_CORE: usize = 1;

/// SCHED_FIFO priority of the motion thread (`rt` feature).
pub const MOTION_RT_PRIORITY: i32 = 80;

/// What a single scheduler pass did, which decides the following sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Disabled or paused; park and recheck.
    Parked,
    /// At least one axis stepped.
    Stepped,
    /// Work exists but every axis is waiting on a timer.
    Waiting,
    /// No tracking, no occupied slot.
    Idle,
}

/// Per-axis timing state, local to the motion thread.
#[derive(Debug, Clone, Copy, Default)]
struct AxisRuntime {
    /// Rising edge of the previous step pulse [µs].
    last_step_us: Option<u32>,
    /// Timestamp of the previous direction change [µs].
    last_dir_change_us: Option<u32>,
    /// Last commanded logical direction.
    direction: Option<bool>,
}

/// The motion scheduler: owns the pins, the per-axis timers and the
/// authoritative position counters inside [`MotionShared`].
pub struct Scheduler<I: MotionIo> {
    shared: Arc<MotionShared>,
    io: I,
    clock: Arc<dyn Clock>,
    params: MountParams,
    timing: MotionTiming,
    stop: Arc<AtomicBool>,
    axes: [AxisRuntime; NUM_AXES],
    /// EN pin state actually applied; `None` until the first pass.
    pin_enabled: Option<bool>,
    /// Tracking activation generation the direction pins were set for.
    tracking_epoch: Option<u32>,
}

impl<I: MotionIo> Scheduler<I> {
    pub fn new(
        shared: Arc<MotionShared>,
        io: I,
        clock: Arc<dyn Clock>,
        params: MountParams,
        timing: MotionTiming,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            shared,
            io,
            clock,
            params,
            timing,
            stop,
            axes: [AxisRuntime::default(); NUM_AXES],
            pin_enabled: None,
            tracking_epoch: None,
        }
    }

    /// Execute one scheduler pass at timestamp `now_us`.
    pub fn pass(&mut self, now_us: u32) -> PassOutcome {
        // Apply EN pin edges (active-low pin handled by the driver).
        let enabled = self.shared.is_enabled();
        if self.pin_enabled != Some(enabled) {
            self.io.apply_enable(enabled);
            self.pin_enabled = Some(enabled);
        }

        if !enabled || self.shared.is_paused() {
            return PassOutcome::Parked;
        }

        if self.shared.tracking.is_active() {
            self.tracking_pass(now_us)
        } else {
            self.tracking_epoch = None;
            self.static_pass(now_us)
        }
    }

    /// Continuous tracking: each axis paces itself from its rate.
    fn tracking_pass(&mut self, now_us: u32) -> PassOutcome {
        let epoch = self.shared.tracking.epoch();
        if self.tracking_epoch != Some(epoch) {
            self.begin_tracking(now_us, epoch);
        }

        let mut stepped = false;
        for axis in Axis::ALL {
            let rate = self.shared.tracking.rate(axis);
            if rate == 0.0 {
                continue;
            }

            let steps_per_sec =
                f64::from(rate.abs()) * steps_per_arcsec(self.params.gear_ratio(axis));
            if steps_per_sec <= 0.0 {
                continue;
            }
            let interval_us = (1_000_000.0 / steps_per_sec) as u32;

            let due = match self.axes[axis.index()].last_step_us {
                Some(last) => elapsed_us(now_us, last) >= interval_us,
                None => true,
            };
            if due {
                self.io.step_pulse(axis);
                let delta = if rate > 0.0 { 1 } else { -1 };
                let position = self.shared.position_steps(axis) + delta;
                self.shared.store_position(axis, position);
                self.axes[axis.index()].last_step_us = Some(now_us);
                stepped = true;
            }
        }

        if stepped {
            PassOutcome::Stepped
        } else {
            PassOutcome::Waiting
        }
    }

    /// Latch direction pins and step timers for a fresh tracking session.
    fn begin_tracking(&mut self, now_us: u32, epoch: u32) {
        for axis in Axis::ALL {
            let positive = self.shared.tracking.rate(axis) >= 0.0;
            self.io.set_direction(axis, positive);
            let runtime = &mut self.axes[axis.index()];
            runtime.direction = Some(positive);
            runtime.last_dir_change_us = Some(now_us);
            runtime.last_step_us = Some(now_us);
        }
        self.tracking_epoch = Some(epoch);
        debug!(epoch, "tracking session started");
    }

    /// Absolute moves: all occupied slots progress independently, in
    /// fixed X, Y, Z order within the pass.
    fn static_pass(&mut self, now_us: u32) -> PassOutcome {
        let mut stepped = false;
        let mut pending = false;

        for axis in Axis::ALL {
            let slot = &self.shared.slots[axis.index()];
            let Some(target_arcsec) = slot.load() else {
                continue;
            };

            let target = arcsec_to_steps(target_arcsec, self.params.gear_ratio(axis));
            let position = self.shared.position_steps(axis);
            let remaining = target - position;

            if remaining == 0 {
                if slot.complete(target_arcsec) {
                    info!(?axis, target_arcsec, "move complete");
                }
                continue;
            }
            pending = true;

            let direction = remaining >= 0;
            if self.axes[axis.index()].direction != Some(direction) {
                self.io.set_direction(axis, direction);
                let runtime = &mut self.axes[axis.index()];
                runtime.direction = Some(direction);
                runtime.last_dir_change_us = Some(now_us);
            }

            // Two independent gates: direction setup and step spacing.
            let runtime = self.axes[axis.index()];
            if let Some(changed) = runtime.last_dir_change_us {
                if elapsed_us(now_us, changed) < self.timing.dir_setup_us {
                    continue;
                }
            }
            if let Some(last) = runtime.last_step_us {
                if elapsed_us(now_us, last) < self.timing.step_interval_us {
                    continue;
                }
            }

            self.io.step_pulse(axis);
            let delta = if direction { 1 } else { -1 };
            self.shared.store_position(axis, position + delta);
            self.axes[axis.index()].last_step_us = Some(now_us);
            stepped = true;
        }

        if stepped {
            PassOutcome::Stepped
        } else if pending {
            PassOutcome::Waiting
        } else {
            PassOutcome::Idle
        }
    }

    /// Enter the worker loop until the stop flag is raised.
    pub fn run(&mut self) {
        info!("motion scheduler running");
        while !self.stop.load(Ordering::Relaxed) {
            let now = self.clock.now_us();
            match self.pass(now) {
                PassOutcome::Parked => std::thread::sleep(Duration::from_millis(IDLE_SLEEP_MS)),
                PassOutcome::Stepped => std::thread::sleep(Duration::from_micros(ACTIVE_SLEEP_US)),
                PassOutcome::Waiting | PassOutcome::Idle => {
                    std::thread::sleep(Duration::from_micros(INACTIVE_SLEEP_US))
                }
            }
        }
        info!("motion scheduler stopped");
    }

    /// Spawn the worker thread, applying RT setup when built with the
    /// `rt` feature.
    pub fn spawn(mut self) -> std::io::Result<JoinHandle<()>>
    where
        I: 'static,
    {
        std::thread::Builder::new()
            .name("aster-motion".to_string())
            .spawn(move || {
                if let Err(e) = rt_setup(MOTION_CPU_CORE, MOTION_RT_PRIORITY) {
                    warn!("running without RT scheduling: {e}");
                }
                self.run();
            })
    }
}

// ─── RT setup ───────────────────────────────────────────────────────

/// Error raised by the RT setup sequence.
#[derive(Debug, Error)]
#[error("rt setup failed: {0}")]
pub struct RtSetupError(String);

/// Pin the current thread to `cpu` and switch to SCHED_FIFO.
///
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
pub fn rt_setup(cpu: usize, priority: i32) -> Result<(), RtSetupError> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| RtSetupError(format!("CpuSet::set({cpu}): {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| RtSetupError(format!("sched_setaffinity: {e}")))?;

    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(RtSetupError(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}): {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
pub fn rt_setup(_cpu: usize, _priority: i32) -> Result<(), RtSetupError> {
    Ok(())
}
