//! # Aster Link
//!
//! Reliable framed protocol over an asynchronous serial byte stream:
//! a single-outstanding stop-and-wait discipline with byte-stuffed
//! framing, CRC-8 integrity, duplicate detection by message ID, ACK +
//! timeout retransmission and a bounded outbound response queue.
//!
//! ## Structure
//!
//! - [`cobs`] - consistent-overhead byte stuffing codec
//! - [`crc`] - CRC-8 over the unframed frame body
//! - [`frame`] - frame build/parse (`cmd ‖ id ‖ len ‖ data ‖ crc`)
//! - [`engine`] - RX accumulator, pending message, retransmission,
//!   response queue, transport seam
//! - [`command`] - command codes and dispatch into the motion handle

pub mod cobs;
pub mod command;
pub mod crc;
pub mod engine;
pub mod frame;

pub use command::{CommandCode, Dispatcher};
pub use engine::{CommandHandler, LinkEngine, LinkError, LinkStats, LoopTransport, Response, Transport};
pub use frame::{Frame, FrameError};
