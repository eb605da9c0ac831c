//! Backends are the side-effecting end of the pipeline: something that
//! takes a resolved placement and makes the compositor match it.

use crate::policy::Placement;

pub trait TransformSink {
    /// Push one placement out to the compositor. Best-effort: the sink
    /// does not report whether the compositor accepted it.
    fn apply(&mut self, placement: &Placement);
}

pub mod hyprland;

#[cfg(test)]
pub mod dummy;
