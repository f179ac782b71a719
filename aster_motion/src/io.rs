//! Step/direction output seam.
//!
//! The scheduler talks to hardware exclusively through [`MotionIo`].
//! GPIO bring-up, the TMC2209 one-way UART configuration, fan PWM and
//! the LED live behind whatever implements this trait; the crate ships
//! the simulation driver used by tests and by the firmware binary
//! until a board driver is registered.

use std::sync::{Arc, Mutex};

use aster_common::axis::Axis;
use aster_common::clock::Clock;
use aster_common::consts::NUM_AXES;

/// Hardware seam for the motion thread.
///
/// Implementations are owned by the scheduler; nothing else touches
/// the pins (one writer per resource).
pub trait MotionIo: Send {
    /// Emit one step pulse on the axis step pin, holding it high for
    /// at least the configured pulse width before the falling edge.
    fn step_pulse(&mut self, axis: Axis);

    /// Drive the direction pin. X also drives the inverted mirror pin
    /// of its second driver.
    fn set_direction(&mut self, axis: Axis, positive: bool);

    /// Drive the driver enable pin. The physical EN input is
    /// active-low; `enabled = true` means the pin is pulled low.
    fn apply_enable(&mut self, enabled: bool);
}

// ─── Simulation driver ──────────────────────────────────────────────

/// One recorded step pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    /// Timestamp of the rising edge [µs].
    pub at_us: u32,
    /// Logical direction latched when the pulse fired.
    pub positive: bool,
}

/// One recorded direction change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirRecord {
    pub at_us: u32,
    pub positive: bool,
}

/// Everything the simulation driver observed.
#[derive(Debug, Default)]
pub struct SimEvents {
    pub steps: [Vec<StepRecord>; NUM_AXES],
    pub dir_changes: [Vec<DirRecord>; NUM_AXES],
    pub enable_edges: Vec<bool>,
}

impl SimEvents {
    /// Signed pulse count for an axis: positive minus negative steps.
    pub fn net_steps(&self, axis: Axis) -> i32 {
        self.steps[axis.index()]
            .iter()
            .map(|s| if s.positive { 1 } else { -1 })
            .sum()
    }
}

/// Records pin activity with timestamps instead of driving GPIO.
pub struct SimMotionIo {
    clock: Arc<dyn Clock>,
    events: Arc<Mutex<SimEvents>>,
    directions: [Option<bool>; NUM_AXES],
}

impl SimMotionIo {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            events: Arc::new(Mutex::new(SimEvents::default())),
            directions: [None; NUM_AXES],
        }
    }

    /// Shared handle to the recorded events, for inspection after the
    /// scheduler has consumed the driver.
    pub fn events(&self) -> Arc<Mutex<SimEvents>> {
        Arc::clone(&self.events)
    }
}

impl MotionIo for SimMotionIo {
    fn step_pulse(&mut self, axis: Axis) {
        let record = StepRecord {
            at_us: self.clock.now_us(),
            positive: self.directions[axis.index()].unwrap_or(true),
        };
        self.events.lock().expect("sim events poisoned").steps[axis.index()].push(record);
    }

    fn set_direction(&mut self, axis: Axis, positive: bool) {
        self.directions[axis.index()] = Some(positive);
        self.events.lock().expect("sim events poisoned").dir_changes[axis.index()].push(
            DirRecord {
                at_us: self.clock.now_us(),
                positive,
            },
        );
    }

    fn apply_enable(&mut self, enabled: bool) {
        self.events
            .lock()
            .expect("sim events poisoned")
            .enable_edges
            .push(enabled);
    }
}
