//! # Aster Motion
//!
//! Soft-real-time step pulse generation for the three mount axes.
//! The worker thread (the "motion core") owns the step/direction pins
//! and the authoritative position counters; everything it shares with
//! the link side is a single-word atomic published with release
//! semantics and read with acquire at the hand-off points.
//!
//! ## Structure
//!
//! - [`state`] - cross-core shared state: positions, gate flags,
//!   command-slot mailboxes, tracking record
//! - [`io`] - the step/direction output seam and its simulation driver
//! - [`scheduler`] - the worker loop (tracking and static modes)
//! - [`handle`] - the command-side API used by the link dispatcher
//!
//! No lock is held across a sleep and the motion loop never blocks on
//! the link.

pub mod handle;
pub mod io;
pub mod scheduler;
pub mod state;

pub use handle::{MotionError, MotionHandle, MotionSnapshot};
pub use scheduler::{PassOutcome, Scheduler};
pub use state::MotionShared;
