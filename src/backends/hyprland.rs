//! Hyprland backend.
//!
//! Every applied orientation becomes exactly one `hyprctl --batch` call
//! so the monitor transform, the touch devices and the optional layout
//! keyword change together.

use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::policy::Placement;

use super::TransformSink;

// The touchscreen Hyprland knows this panel's digitizer by.
const TOUCHSCREEN_DEVICE: &str = "goodix-capacitive-touchscreen-1";

pub struct HyprlandBackend {
    output: String,
    monitor_id: String,
}

impl HyprlandBackend {
    pub fn new(output: String, monitor_id: String) -> Self {
        HyprlandBackend { output, monitor_id }
    }

    fn batch_command(&self, placement: &Placement) -> String {
        let transform = placement.transform;
        let mut batch = format!(
            "keyword monitor {},preferred,auto,1,transform,{} ; \
             keyword device[{}]:transform {} ; \
             keyword input:tablet:transform {}",
            self.output, transform, TOUCHSCREEN_DEVICE, transform, transform,
        );
        if let Some(keyword) = placement.layout {
            batch.push_str(&format!(
                " ; keyword workspace m[{}], layoutopt:orientation:{}",
                self.monitor_id, keyword,
            ));
        }
        batch
    }
}

impl TransformSink for HyprlandBackend {
    fn apply(&mut self, placement: &Placement) {
        let batch = self.batch_command(placement);
        debug!("hyprctl --batch {:?}", batch);

        // Fire and forget: hyprctl's exit status is not consulted, the
        // next sensor event supersedes a change that did not stick.
        let spawned = Command::new("hyprctl")
            .arg("--batch")
            .arg(&batch)
            .stdout(Stdio::null())
            .status();
        if let Err(e) = spawned {
            warn!("hyprctl could not be run: {}", e);
        }
    }
}

#[derive(Deserialize)]
struct Monitor {
    id: i64,
    name: String,
}

/// Look up the numeric monitor id Hyprland uses for an output name.
///
/// The workspace `m[...]` rule only accepts the id, not the name, so we
/// resolve it once at startup from the JSON monitor listing.
pub fn resolve_monitor_id(output: &str) -> Result<String> {
    let listing = Command::new("hyprctl")
        .args(&["monitors", "-j", "all"])
        .output()?;
    let monitors: Vec<Monitor> = serde_json::from_slice(&listing.stdout)?;

    monitors
        .iter()
        .find(|monitor| monitor.name == output)
        .map(|monitor| monitor.id.to_string())
        .ok_or_else(|| Error::UnknownMonitor(output.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HyprlandBackend {
        HyprlandBackend::new("eDP-1".to_string(), "0".to_string())
    }

    #[test]
    fn batch_without_layout_keyword() {
        let batch = backend().batch_command(&Placement {
            transform: 3,
            layout: None,
        });
        assert_eq!(
            batch,
            "keyword monitor eDP-1,preferred,auto,1,transform,3 ; \
             keyword device[goodix-capacitive-touchscreen-1]:transform 3 ; \
             keyword input:tablet:transform 3"
        );
    }

    #[test]
    fn batch_with_layout_keyword() {
        let batch = backend().batch_command(&Placement {
            transform: 1,
            layout: Some("top"),
        });
        assert_eq!(
            batch,
            "keyword monitor eDP-1,preferred,auto,1,transform,1 ; \
             keyword device[goodix-capacitive-touchscreen-1]:transform 1 ; \
             keyword input:tablet:transform 1 ; \
             keyword workspace m[0], layoutopt:orientation:top"
        );
    }
}
