//! Placement policy: which transform an orientation maps to, and which
//! master-layout orientation keyword (if any) should ride along with it.

use crate::orientation::{Orientation, TransformTable};

/// Whether transform changes also re-orient the master layout, and on
/// which side the master area sits. Fixed for the process lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayoutMode {
    Disabled,
    LeftMaster,
    RightMaster,
}

/// Everything the emitter needs for one configuration change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub transform: u8,
    pub layout: Option<&'static str>,
}

/// Resolve an orientation to its placement.
///
/// The layout keyword only has two meaningful axes: with the screen
/// upright or upside down the master column sits on the configured side,
/// and with the screen sideways it moves to top/bottom. That is why
/// Normal/BottomUp share a keyword and LeftUp/RightUp share the other.
pub fn resolve(orientation: Orientation, mode: LayoutMode, table: &TransformTable) -> Placement {
    let layout = match mode {
        LayoutMode::Disabled => None,
        LayoutMode::LeftMaster => Some(match orientation {
            Orientation::Normal | Orientation::BottomUp => "left",
            Orientation::LeftUp | Orientation::RightUp => "top",
        }),
        LayoutMode::RightMaster => Some(match orientation {
            Orientation::Normal | Orientation::BottomUp => "right",
            Orientation::LeftUp | Orientation::RightUp => "bottom",
        }),
    };

    Placement {
        transform: table[orientation],
        layout,
    }
}
