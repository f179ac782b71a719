//! Common re-exports for convenience.

pub use crate::axis::Axis;
pub use crate::clock::{elapsed_us, Clock, ManualClock, MonotonicClock};
pub use crate::config::{AsterConfig, ConfigError, ConfigLoader, MotionTiming, MountParams};
pub use crate::kinematics::{arcsec_to_steps, steps_per_arcsec, steps_to_arcsec};
