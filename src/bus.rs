//! # PHROM Bus
//!
//! The TMS5220/TMS6100 interface is two control lines (M0, M1) and a 4-bit
//! address/data bus (ADD1, ADD2, ADD4, ADD8). ADD8 doubles as the serial data
//! line during READ DATA and is shared by every PHROM on the bus.
//!
//! This module holds the collaborator traits the protocol handlers talk to
//! ([`DataBus`], [`EdgeTrigger`]) and their pin-level implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::pin::{DriveStrength, Pin, PinValue};
use crate::types::Nibble;

pub const PIN_M0: &str = "M0";
pub const PIN_M1: &str = "M1";
pub const ADDRESS_PINS: [&str; 4] = ["ADD1", "ADD2", "ADD4", "ADD8"];

/// Driver name used by the host controller on the shared lines
pub const HOST_DRIVER: &str = "HOST";
const PULL_UP_DRIVER: &str = "PULLUP";

pub type SharedPin = Arc<Mutex<Pin>>;

/// Lock a shared pin, recovering the guard if another holder panicked
pub fn lock_pin(pin: &SharedPin) -> MutexGuard<'_, Pin> {
    pin.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Data-line surface consumed by the protocol handlers
pub trait DataBus {
    fn drive_high(&mut self);
    fn drive_low(&mut self);
    /// Put the data line back to input (high impedance)
    fn release(&mut self);
    /// Read ADD1..ADD8 as a nibble, ADD1 least significant
    fn sample_nibble(&mut self) -> Nibble;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    /// Whether a transition `from -> to` is this edge
    pub fn matches(&self, from: bool, to: bool) -> bool {
        match self {
            Edge::Rising => !from && to,
            Edge::Falling => from && !to,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Rising => write!(f, "rising"),
            Edge::Falling => write!(f, "falling"),
        }
    }
}

/// External-interrupt style edge source for a control line
pub trait EdgeTrigger {
    /// Select which edge raises the next event
    fn set_edge(&mut self, edge: Edge);
    /// Drop an event that was latched but not yet serviced
    fn clear_pending(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlLine {
    /// READ DATA
    M0,
    /// LOAD ADDRESS
    M1,
}

impl ControlLine {
    pub fn pin_name(&self) -> &'static str {
        match self {
            ControlLine::M0 => PIN_M0,
            ControlLine::M1 => PIN_M1,
        }
    }
}

/// The shared wires of one TMS5220 speech bus.
///
/// Cloning hands out the same physical nodes, so every device and the host
/// see each other's drivers.
#[derive(Debug, Clone)]
pub struct PhromBus {
    m0: SharedPin,
    m1: SharedPin,
    add: [SharedPin; 4],
}

impl PhromBus {
    pub fn new() -> Self {
        let make = |name: &str| Arc::new(Mutex::new(Pin::new(name.to_string())));
        let bus = PhromBus {
            m0: make(PIN_M0),
            m1: make(PIN_M1),
            add: [
                make(ADDRESS_PINS[0]),
                make(ADDRESS_PINS[1]),
                make(ADDRESS_PINS[2]),
                make(ADDRESS_PINS[3]),
            ],
        };

        // The host idles both control lines low
        lock_pin(&bus.m0).set_driver(HOST_DRIVER, PinValue::Low);
        lock_pin(&bus.m1).set_driver(HOST_DRIVER, PinValue::Low);

        // An undriven data line reads as 1, which is how the host sees 0xFF
        // when no PHROM answers for the addressed bank
        lock_pin(bus.data_pin()).set_driver_with_strength(
            PULL_UP_DRIVER,
            PinValue::High,
            DriveStrength::Weak,
        );
        bus
    }

    pub fn control_pin(&self, line: ControlLine) -> &SharedPin {
        match line {
            ControlLine::M0 => &self.m0,
            ControlLine::M1 => &self.m1,
        }
    }

    /// ADD8, the serial data line during READ DATA
    pub fn data_pin(&self) -> &SharedPin {
        &self.add[3]
    }

    pub fn address_pins(&self) -> &[SharedPin; 4] {
        &self.add
    }

    pub fn get_pin(&self, name: &str) -> Option<SharedPin> {
        match name {
            PIN_M0 => Some(self.m0.clone()),
            PIN_M1 => Some(self.m1.clone()),
            _ => ADDRESS_PINS
                .iter()
                .position(|pin| *pin == name)
                .map(|index| self.add[index].clone()),
        }
    }

    pub fn pins(&self) -> HashMap<String, SharedPin> {
        let mut pins = HashMap::new();
        pins.insert(PIN_M0.to_string(), self.m0.clone());
        pins.insert(PIN_M1.to_string(), self.m1.clone());
        for (name, pin) in ADDRESS_PINS.iter().zip(self.add.iter()) {
            pins.insert(name.to_string(), pin.clone());
        }
        pins
    }

    /// Build the data-bus adapter a device uses, driving under `driver_name`
    pub fn port(&self, driver_name: &str) -> PinPort {
        PinPort {
            driver: driver_name.to_string(),
            add: self.add.clone(),
        }
    }

    pub fn control_level(&self, line: ControlLine) -> bool {
        lock_pin(self.control_pin(line)).read().is_high()
    }

    /// Host side: set a control line level
    pub fn set_control(&self, line: ControlLine, high: bool) {
        lock_pin(self.control_pin(line)).set_driver(HOST_DRIVER, PinValue::from_bool(high));
    }

    /// Host side: present an address nibble on ADD1..ADD8.
    ///
    /// The host is the bus master during LOAD ADDRESS, so it drives with
    /// more strength than a PHROM that has not yet seen the M1 edge.
    pub fn put_nibble(&self, nibble: Nibble) {
        for (pin, level) in self.add.iter().zip(nibble.lines()) {
            lock_pin(pin).set_driver_with_strength(
                HOST_DRIVER,
                PinValue::from_bool(level),
                DriveStrength::Strong,
            );
        }
    }

    /// Host side: stop driving the address lines
    pub fn release_nibble(&self) {
        for pin in &self.add {
            lock_pin(pin).remove_driver(HOST_DRIVER);
        }
    }

    /// Host side: sample the serial data line
    pub fn sample_data(&self) -> bool {
        lock_pin(self.data_pin()).read().is_high()
    }

    /// Names of the devices currently driving the data line
    pub fn data_drivers(&self) -> Vec<String> {
        let pin = lock_pin(self.data_pin());
        let mut names: Vec<String> = pin
            .get_drivers()
            .iter()
            .filter(|(_, (_, strength))| *strength >= DriveStrength::Standard)
            .map(|(name, _)| name.clone())
            .filter(|name| name != HOST_DRIVER)
            .collect();
        names.sort();
        names
    }

    /// True when two equal-strength drivers fight over any bus line
    pub fn contention(&self) -> bool {
        std::iter::once(&self.m0)
            .chain(std::iter::once(&self.m1))
            .chain(self.add.iter())
            .any(|pin| lock_pin(pin).is_contended())
    }
}

impl Default for PhromBus {
    fn default() -> Self {
        PhromBus::new()
    }
}

/// A device's view of ADD1..ADD8; it only ever drives ADD8
#[derive(Debug, Clone)]
pub struct PinPort {
    driver: String,
    add: [SharedPin; 4],
}

impl PinPort {
    fn set_data(&self, value: PinValue) {
        lock_pin(&self.add[3]).set_driver(&self.driver, value);
    }
}

impl DataBus for PinPort {
    fn drive_high(&mut self) {
        self.set_data(PinValue::High);
    }

    fn drive_low(&mut self) {
        self.set_data(PinValue::Low);
    }

    fn release(&mut self) {
        lock_pin(&self.add[3]).remove_driver(&self.driver);
    }

    fn sample_nibble(&mut self) -> Nibble {
        let level = |index: usize| lock_pin(&self.add[index]).read().is_high();
        Nibble::from_lines(level(0), level(1), level(2), level(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_bus() {
        let bus = PhromBus::new();
        assert!(!bus.control_level(ControlLine::M0));
        assert!(!bus.control_level(ControlLine::M1));
        assert!(bus.sample_data(), "pull-up holds ADD8 high");
        assert!(bus.data_drivers().is_empty());
        assert!(!bus.contention());
    }

    #[test]
    fn test_port_samples_host_nibble() {
        let bus = PhromBus::new();
        let mut port = bus.port("PHROM");

        bus.put_nibble(Nibble::new(0x9));
        assert_eq!(port.sample_nibble().value(), 0x9);

        bus.put_nibble(Nibble::new(0x6));
        assert_eq!(port.sample_nibble().value(), 0x6);
    }

    #[test]
    fn test_port_drives_and_releases_data_line() {
        let bus = PhromBus::new();
        let mut port = bus.port("PHROM");

        port.drive_low();
        assert!(!bus.sample_data());
        assert_eq!(bus.data_drivers(), vec!["PHROM".to_string()]);

        port.drive_high();
        assert!(bus.sample_data());

        port.release();
        assert!(bus.data_drivers().is_empty());
    }

    #[test]
    fn test_host_nibble_beats_device_driver() {
        let bus = PhromBus::new();
        let mut port = bus.port("PHROM");
        port.drive_low();

        bus.put_nibble(Nibble::new(0x8));
        assert!(bus.sample_data());
        assert!(!bus.contention());
    }

    #[test]
    fn test_two_devices_conflict() {
        let bus = PhromBus::new();
        let mut a = bus.port("PHROM_A");
        let mut b = bus.port("PHROM_B");

        a.drive_high();
        b.drive_low();
        assert!(bus.contention());

        b.release();
        assert!(!bus.contention());
    }

    #[test]
    fn test_edge_matches() {
        assert!(Edge::Rising.matches(false, true));
        assert!(!Edge::Rising.matches(true, false));
        assert!(Edge::Falling.matches(true, false));
        assert!(!Edge::Falling.matches(true, true));
    }
}
