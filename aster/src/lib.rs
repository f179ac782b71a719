//! # Aster
//!
//! Firmware main for the three-axis equatorial mount controller: wires
//! the serial transport into the link engine, spawns the motion thread
//! and runs the main-loop tick with periodic STATUS telemetry.

pub mod telemetry;
pub mod transport;
