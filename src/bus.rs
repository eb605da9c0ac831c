//! # Sensor bus client
//!
//! Owns the system-bus connection to iio-sensor-proxy: claims the
//! accelerometer, fetches the orientation property on demand and pumps
//! change-notification signals into the event loop's channel.
//!
//! Fetches block with no timeout on purpose. iio-sensor-proxy is
//! expected to be always-available on the machines this daemon targets,
//! and a missed update is superseded by the next one anyway.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, info, warn};
use zbus::zvariant::OwnedValue;
use zbus::MessageType;

use crate::error::Result;
use crate::orientation::Orientation;
use crate::state::{BusEvent, OrientationSource};

pub const SERVICE: &str = "net.hadess.SensorProxy";
const OBJECT_PATH: &str = "/net/hadess/SensorProxy";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";
const ORIENTATION_PROPERTY: &str = "AccelerometerOrientation";

pub struct SensorBus {
    conn: zbus::blocking::Connection,
}

impl SensorBus {
    /// Connect to the system bus and claim the accelerometer. The claim
    /// is what makes the proxy start producing signals; failing either
    /// step leaves us with no usable connection.
    pub fn connect() -> Result<Self> {
        let conn = zbus::blocking::Connection::system()?;
        conn.call_method(
            Some(SERVICE),
            OBJECT_PATH,
            Some(SERVICE),
            "ClaimAccelerometer",
            &(),
        )?;
        Ok(SensorBus { conn })
    }

    /// Blocking fetch of the authoritative current orientation label.
    pub fn fetch_orientation(&self) -> Result<String> {
        let reply = self.conn.call_method(
            Some(SERVICE),
            OBJECT_PATH,
            Some(PROPERTIES_IFACE),
            "Get",
            &(SERVICE, ORIENTATION_PROPERTY),
        )?;
        let value: OwnedValue = reply.body()?;
        Ok(String::try_from(value)?)
    }

    /// Register for property-change signals, and for ownership changes
    /// of the sensor service's well-known name so a dead proxy shows up
    /// in the log instead of a silently idle subscription.
    pub fn subscribe(&self) -> Result<()> {
        let bus = zbus::blocking::fdo::DBusProxy::new(&self.conn)?;
        bus.add_match("type='signal',interface='org.freedesktop.DBus.Properties'")?;
        bus.add_match(
            "type='signal',sender='org.freedesktop.DBus',\
             interface='org.freedesktop.DBus',member='NameOwnerChanged',\
             arg0='net.hadess.SensorProxy'",
        )?;
        Ok(())
    }

    /// Pump incoming messages into the event loop's channel until the
    /// connection ends. Replies and errors belong to our own blocking
    /// calls and pass through untouched; any other non-signal traffic
    /// ends the subscription.
    pub fn spawn_reader(&self, events: Sender<BusEvent>) -> thread::JoinHandle<()> {
        let messages = zbus::blocking::MessageIterator::from(self.conn.clone());
        thread::spawn(move || {
            for message in messages {
                let message = match message {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("bus read failed: {}", e);
                        break;
                    }
                };
                match message.message_type() {
                    MessageType::Signal => {
                        if is_owner_change(&message) {
                            info!("sensor service owner changed");
                        }
                        if let Some(label) = decode_orientation_signal(&message) {
                            debug!("orientation change signalled: {:?}", label);
                            if events.send(BusEvent::OrientationHint).is_err() {
                                break;
                            }
                        }
                    }
                    MessageType::MethodReturn | MessageType::Error => {}
                    _ => break,
                }
            }
            let _ = events.send(BusEvent::Shutdown);
        })
    }
}

/// Pull the orientation label out of a `PropertiesChanged` signal, if
/// that is what the message is. Anything of the wrong shape is simply
/// not an orientation change.
fn decode_orientation_signal(message: &zbus::Message) -> Option<String> {
    if message.interface()?.as_str() != PROPERTIES_IFACE {
        return None;
    }
    if message.member()?.as_str() != "PropertiesChanged" {
        return None;
    }
    let (interface, changed, _invalidated): (String, HashMap<String, OwnedValue>, Vec<String>) =
        message.body().ok()?;
    orientation_change(&interface, &changed)
}

fn orientation_change(interface: &str, changed: &HashMap<String, OwnedValue>) -> Option<String> {
    if interface != SERVICE {
        return None;
    }
    let value = changed.get(ORIENTATION_PROPERTY)?;
    String::try_from(value.clone()).ok()
}

fn is_owner_change(message: &zbus::Message) -> bool {
    message
        .interface()
        .map_or(false, |i| i.as_str() == "org.freedesktop.DBus")
        && message
            .member()
            .map_or(false, |m| m.as_str() == "NameOwnerChanged")
}

/// Authoritative readings for the state machine: fetch, then decode
/// under the configured inversion policy.
pub struct SensorSource<'a> {
    bus: &'a SensorBus,
    flip_bottom_up: bool,
}

impl<'a> SensorSource<'a> {
    pub fn new(bus: &'a SensorBus, flip_bottom_up: bool) -> Self {
        SensorSource {
            bus,
            flip_bottom_up,
        }
    }
}

impl OrientationSource for SensorSource<'_> {
    fn current_orientation(&mut self) -> Option<Orientation> {
        match self.bus.fetch_orientation() {
            Ok(label) => {
                let orientation = Orientation::from_label(&label, self.flip_bottom_up);
                if orientation.is_none() {
                    debug!("not an actionable orientation: {:?}", label);
                }
                orientation
            }
            Err(e) => {
                warn!("orientation fetch failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use zbus::zvariant::Value;

    fn changed_with(key: &str, value: Value<'static>) -> HashMap<String, OwnedValue> {
        let mut changed = HashMap::new();
        changed.insert(key.to_string(), value.into());
        changed
    }

    #[test]
    fn orientation_property_is_extracted() {
        let changed = changed_with(ORIENTATION_PROPERTY, Value::from("left-up"));
        assert_eq!(
            orientation_change(SERVICE, &changed),
            Some("left-up".to_string())
        );
    }

    #[test]
    fn other_interfaces_are_ignored() {
        let changed = changed_with(ORIENTATION_PROPERTY, Value::from("left-up"));
        assert_eq!(orientation_change("org.freedesktop.UPower", &changed), None);
    }

    #[test]
    fn other_properties_on_the_sensor_interface_are_ignored() {
        let changed = changed_with("HasAccelerometer", Value::from(true));
        assert_eq!(orientation_change(SERVICE, &changed), None);
    }

    #[test]
    fn non_string_orientation_values_are_ignored() {
        let changed = changed_with(ORIENTATION_PROPERTY, Value::from(5u32));
        assert_eq!(orientation_change(SERVICE, &changed), None);
    }
}
