//! Rotation lock: SIGUSR1 flips the shared unlock flag.
//!
//! There is no queueing. A signal landing while another flip is in
//! flight just flips the flag once more, so two back-to-back signals
//! cancel out; whatever the flag holds when a reading is observed wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use signal_hook::consts::SIGUSR1;
use signal_hook::iterator::Signals;
use tracing::info;

use crate::error::Result;

pub fn spawn_toggle_listener(unlocked: Arc<AtomicBool>) -> Result<()> {
    let mut signals = Signals::new(&[SIGUSR1])?;
    thread::spawn(move || {
        for _ in signals.forever() {
            let was_unlocked = unlocked.fetch_xor(true, Ordering::Relaxed);
            if was_unlocked {
                info!("rotation locked");
            } else {
                info!("rotation unlocked");
            }
        }
    });
    Ok(())
}
