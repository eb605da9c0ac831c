//! Dummy sink.
//!
//! This is purely for testing. It records what would have been applied.

use crate::policy::Placement;

use super::TransformSink;

#[derive(Default)]
pub struct DummySink {
    pub applied: Vec<Placement>,
}

impl TransformSink for DummySink {
    fn apply(&mut self, placement: &Placement) {
        self.applied.push(placement.clone());
    }
}
