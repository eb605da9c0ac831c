//! # Orientation state machine
//!
//! One cell of state (the last orientation we acted on), one shared flag
//! (the rotation lock), and the event loop that drives both. Sensor
//! bursts are settled here: a change notification only schedules an
//! authoritative re-fetch once the bus has been quiet for the settle
//! delay, because a physical rotation emits a stream of intermediate
//! readings we must not chase.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::backends::TransformSink;
use crate::orientation::{Orientation, TransformTable};
use crate::policy::{self, LayoutMode};

/// Quiescence period after a change notification before the current
/// orientation is re-fetched. Deliberately fixed, not configurable.
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);

/// What the bus reader hands the event loop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// A signal carried an orientation change. The payload is ignored on
    /// purpose: the authoritative value is re-fetched after settling, so
    /// stale or reordered signal payloads cannot misrotate the display.
    OrientationHint,
    /// The connection is gone or handed us something that is not a signal.
    Shutdown,
}

/// Where an authoritative orientation reading comes from. The real
/// implementation fetches over D-Bus; tests script this.
pub trait OrientationSource {
    /// Current orientation, or `None` when there is no actionable
    /// reading (unknown label, transient fetch failure).
    fn current_orientation(&mut self) -> Option<Orientation>;
}

/// The rotation context: sink, policy inputs and mutable state.
pub struct Rotator<S> {
    sink: S,
    table: TransformTable,
    mode: LayoutMode,
    last_applied: Option<Orientation>,
    unlocked: Arc<AtomicBool>,
}

impl<S: TransformSink> Rotator<S> {
    pub fn new(sink: S, table: TransformTable, mode: LayoutMode, unlocked: Arc<AtomicBool>) -> Self {
        Rotator {
            sink,
            table,
            mode,
            last_applied: None,
            unlocked,
        }
    }

    /// React to one settled orientation reading.
    ///
    /// Locked and duplicate readings are discarded silently; they are
    /// steady-state behavior, not errors. Accelerometers repeat the same
    /// settled value many times over.
    pub fn observe(&mut self, orientation: Orientation) {
        if !self.unlocked.load(Ordering::Relaxed) {
            debug!("rotation locked, ignoring {:?}", orientation);
            return;
        }
        if self.last_applied == Some(orientation) {
            debug!("already applied {:?}", orientation);
            return;
        }

        let placement = policy::resolve(orientation, self.mode, &self.table);
        info!("rotating to {:?} (transform {})", orientation, placement.transform);
        self.sink.apply(&placement);
        self.last_applied = Some(orientation);
    }
}

/// Drive the rotator from the bus reader until the connection ends.
///
/// Each hint (re)starts the settle window; once the window passes with
/// no further hint, one authoritative reading is fetched and observed.
/// Hints that pile up during the window therefore collapse into a
/// single fetch-and-apply cycle.
pub fn run<S, O>(rotator: &mut Rotator<S>, source: &mut O, events: &Receiver<BusEvent>)
where
    S: TransformSink,
    O: OrientationSource,
{
    loop {
        match events.recv() {
            Ok(BusEvent::OrientationHint) => loop {
                match events.recv_timeout(SETTLE_DELAY) {
                    Ok(BusEvent::OrientationHint) => continue,
                    Ok(BusEvent::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(orientation) = source.current_orientation() {
                            rotator.observe(orientation);
                        }
                        break;
                    }
                }
            },
            Ok(BusEvent::Shutdown) | Err(_) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    use crate::backends::dummy::DummySink;

    fn rotator(unlocked: Arc<AtomicBool>) -> Rotator<DummySink> {
        Rotator::new(
            DummySink::default(),
            TransformTable::default(),
            LayoutMode::Disabled,
            unlocked,
        )
    }

    #[test]
    fn startup_reading_is_applied_immediately() {
        let mut rotator = rotator(Arc::new(AtomicBool::new(true)));
        rotator.observe(Orientation::RightUp);

        assert_eq!(rotator.sink.applied.len(), 1);
        assert_eq!(rotator.sink.applied[0].transform, 3);
        assert_eq!(rotator.last_applied, Some(Orientation::RightUp));
    }

    #[test]
    fn repeated_readings_emit_once() {
        let mut rotator = rotator(Arc::new(AtomicBool::new(true)));
        rotator.observe(Orientation::LeftUp);
        rotator.observe(Orientation::LeftUp);

        assert_eq!(rotator.sink.applied.len(), 1);
    }

    #[test]
    fn locked_readings_are_discarded() {
        let unlocked = Arc::new(AtomicBool::new(true));
        let mut rotator = rotator(unlocked.clone());

        rotator.observe(Orientation::Normal);
        unlocked.store(false, Ordering::Relaxed);
        rotator.observe(Orientation::LeftUp);
        rotator.observe(Orientation::BottomUp);
        assert_eq!(rotator.sink.applied.len(), 1);

        // Unlocking lets a previously seen orientation through again,
        // as long as it is not the one we last acted on.
        unlocked.store(true, Ordering::Relaxed);
        rotator.observe(Orientation::LeftUp);
        assert_eq!(rotator.sink.applied.len(), 2);
        assert_eq!(rotator.last_applied, Some(Orientation::LeftUp));
    }

    struct ScriptedSource {
        reading: Option<Orientation>,
        fetched_at: Vec<Instant>,
    }

    impl OrientationSource for ScriptedSource {
        fn current_orientation(&mut self) -> Option<Orientation> {
            self.fetched_at.push(Instant::now());
            self.reading
        }
    }

    #[test]
    fn hint_bursts_collapse_into_one_settled_fetch() {
        let (tx, rx) = mpsc::channel();
        let sender = thread::spawn(move || {
            for _ in 0..4 {
                tx.send(BusEvent::OrientationHint).unwrap();
                thread::sleep(Duration::from_millis(10));
            }
            let last_hint = Instant::now();
            tx.send(BusEvent::OrientationHint).unwrap();
            // Keep the channel open past the settle window, then let the
            // loop observe the disconnect and return.
            thread::sleep(Duration::from_millis(500));
            last_hint
        });

        let mut rotator = rotator(Arc::new(AtomicBool::new(true)));
        let mut source = ScriptedSource {
            reading: Some(Orientation::LeftUp),
            fetched_at: Vec::new(),
        };
        run(&mut rotator, &mut source, &rx);
        let last_hint = sender.join().unwrap();

        assert_eq!(source.fetched_at.len(), 1);
        assert!(source.fetched_at[0] >= last_hint + SETTLE_DELAY);
        assert_eq!(rotator.sink.applied.len(), 1);
        assert_eq!(rotator.sink.applied[0].transform, 1);
    }

    #[test]
    fn unreadable_fetch_changes_nothing() {
        let (tx, rx) = mpsc::channel();
        tx.send(BusEvent::OrientationHint).unwrap();
        tx.send(BusEvent::Shutdown).unwrap();
        drop(tx);

        let mut rotator = rotator(Arc::new(AtomicBool::new(true)));
        let mut source = ScriptedSource {
            reading: None,
            fetched_at: Vec::new(),
        };
        run(&mut rotator, &mut source, &rx);

        assert!(rotator.sink.applied.is_empty());
        assert_eq!(rotator.last_applied, None);
    }

    #[test]
    fn shutdown_ends_the_loop() {
        let (tx, rx) = mpsc::channel();
        tx.send(BusEvent::Shutdown).unwrap();

        let mut rotator = rotator(Arc::new(AtomicBool::new(true)));
        let mut source = ScriptedSource {
            reading: Some(Orientation::Normal),
            fetched_at: Vec::new(),
        };
        run(&mut rotator, &mut source, &rx);

        assert!(source.fetched_at.is_empty());
        assert!(rotator.sink.applied.is_empty());
    }
}
