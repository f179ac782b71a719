//! Axis identity for the three mount axes.
//!
//! X is physically a pair of drivers sharing one step signal with an
//! inverted mirror on the second direction pin; that mapping lives in
//! the motion I/O layer, not here.

use serde::{Deserialize, Serialize};

use crate::consts::NUM_AXES;

/// Mount axis identifier. Wire encoding is the discriminant value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Axis {
    /// Right-ascension axis (dual-driver pair).
    X = 0,
    /// Declination axis.
    Y = 1,
    /// Third adjustment axis.
    Z = 2,
}

impl Axis {
    /// All axes in scheduler processing order.
    pub const ALL: [Axis; NUM_AXES] = [Axis::X, Axis::Y, Axis::Z];

    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            _ => None,
        }
    }

    /// Array index of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}
