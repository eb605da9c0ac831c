//! # Orientation
//!
//! The four physical orientations iio-sensor-proxy reports, plus the
//! table mapping each of them to a Hyprland transform index. A reading
//! we cannot act on (an unknown label) is `None`, never a fifth variant,
//! so downstream code cannot forget to filter it.

use std::str::FromStr;

use crate::error::{Error, Result};

/// A settled accelerometer orientation, in Hyprland transform order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// Screen "Up" matches gravity; transform index 0.
    Normal = 0,
    /// Left edge of the device points up.
    LeftUp = 1,
    /// Upside down.
    BottomUp = 2,
    /// Right edge of the device points up.
    RightUp = 3,
}

impl Orientation {
    /// Decode a raw `AccelerometerOrientation` label.
    ///
    /// iio-sensor-proxy emits exactly four labels; anything else is not
    /// an actionable reading. `flip_bottom_up` swaps the normal and
    /// bottom-up readings for devices mounted upside down, and never
    /// touches the sideways readings.
    pub fn from_label(label: &str, flip_bottom_up: bool) -> Option<Self> {
        match label {
            "normal" if flip_bottom_up => Some(Self::BottomUp),
            "normal" => Some(Self::Normal),
            "bottom-up" if flip_bottom_up => Some(Self::Normal),
            "bottom-up" => Some(Self::BottomUp),
            "left-up" => Some(Self::LeftUp),
            "right-up" => Some(Self::RightUp),
            _ => None,
        }
    }
}

/// Base transform value per orientation, overridable from the command line
/// for panels that are not mounted the way Hyprland expects.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransformTable([u8; 4]);

impl Default for TransformTable {
    fn default() -> Self {
        TransformTable([0, 1, 2, 3])
    }
}

impl std::ops::Index<Orientation> for TransformTable {
    type Output = u8;

    fn index(&self, orientation: Orientation) -> &u8 {
        &self.0[orientation as usize]
    }
}

impl FromStr for TransformTable {
    type Err = Error;

    /// Parse the `"0,1,2,3"` override form: single digits at fixed
    /// positions, commas in between.
    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let invalid = || Error::InvalidTransformTable(s.to_string());

        if bytes.len() != 7 {
            return Err(invalid());
        }
        if bytes[1] != b',' || bytes[3] != b',' || bytes[5] != b',' {
            return Err(invalid());
        }

        let digits = [bytes[0], bytes[2], bytes[4], bytes[6]];
        let mut table = [0u8; 4];
        for (slot, &byte) in table.iter_mut().zip(digits.iter()) {
            if !byte.is_ascii_digit() {
                return Err(invalid());
            }
            *slot = byte - b'0';
        }
        Ok(TransformTable(table))
    }
}
