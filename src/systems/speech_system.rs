use crate::bus::{ControlLine, PhromBus, SharedPin};
use crate::components::memory::bank_rom::BankRom;
use crate::components::memory::phrom::PhromDevice;
use crate::components::memory::tms6100::{DeviceState, Indicators};
use crate::error::{EmuError, Result};
use crate::types::{BankId, Nibble};

/// Where the host side of the bus believes it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Idle,
    AddressLoaded,
    Reading,
}

/// Snapshot of one PHROM for monitoring
#[derive(Debug, Clone)]
pub struct DeviceStatus {
    pub name: String,
    pub bank: BankId,
    pub state: DeviceState,
    pub indicators: Indicators,
}

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub name: String,
    pub description: String,
    pub device_count: usize,
    pub banks: Vec<BankId>,
}

/// A TMS5220-style speech bus with its PHROMs.
///
/// The host half of the protocol lives here: every control-line change is
/// applied to the shared wires and then delivered to each device in turn,
/// so by the time a host call returns every PHROM has serviced the edge.
pub struct SpeechSystem {
    name: String,
    description: String,
    bus: PhromBus,
    devices: Vec<PhromDevice>,
    phase: HostPhase,
    contention_events: usize,
}

impl SpeechSystem {
    pub fn new(name: String, description: String) -> Self {
        SpeechSystem {
            name,
            description,
            bus: PhromBus::new(),
            devices: Vec::new(),
            phase: HostPhase::Idle,
            contention_events: 0,
        }
    }

    /// Plug a PHROM onto the bus. Two devices may not answer to one bank.
    pub fn add_device(&mut self, name: String, rom: BankRom) -> Result<()> {
        let device = PhromDevice::new(name, rom, &self.bus);
        if let Some(existing) = self.devices.iter().find(|d| d.bank() == device.bank()) {
            return Err(EmuError::DuplicateBank {
                bank: device.bank().value(),
                first: existing.context().name(),
                second: device.context().name(),
            });
        }

        log::info!(
            "{}: added {} answering to bank {}",
            self.name,
            device.context().name(),
            device.bank()
        );
        self.devices.push(device);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> &PhromBus {
        &self.bus
    }

    pub fn devices(&self) -> &[PhromDevice] {
        &self.devices
    }

    pub fn device(&self, name: &str) -> Option<&PhromDevice> {
        self.devices.iter().find(|d| d.context().name() == name)
    }

    pub fn get_pin(&self, name: &str) -> Result<SharedPin> {
        self.bus.get_pin(name).ok_or_else(|| EmuError::PinNotFound {
            component: self.name.clone(),
            pin: name.to_string(),
        })
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    /// Number of host operations after which two PHROMs were found
    /// fighting over a line
    pub fn contention_events(&self) -> usize {
        self.contention_events
    }

    pub fn device_status(&self) -> Vec<DeviceStatus> {
        self.devices
            .iter()
            .map(|device| {
                let ctx = device.context();
                DeviceStatus {
                    name: ctx.name(),
                    bank: device.bank(),
                    state: ctx.state(),
                    indicators: ctx.indicators(),
                }
            })
            .collect()
    }

    pub fn get_system_info(&self) -> SystemInfo {
        SystemInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            device_count: self.devices.len(),
            banks: self.devices.iter().map(|d| d.bank()).collect(),
        }
    }

    fn set_line(&mut self, line: ControlLine, high: bool) {
        self.bus.set_control(line, high);
        for device in &self.devices {
            device.line_changed(line, high);
        }
        if self.bus.contention() {
            self.contention_events += 1;
            log::warn!(
                "{}: bus contention after {:?} -> {}",
                self.name,
                line,
                high
            );
        }
    }

    fn pulse(&mut self, line: ControlLine) {
        self.set_line(line, true);
        self.set_line(line, false);
    }

    /// Return every PHROM to its power-up state
    pub fn power_on_reset(&mut self) {
        self.bus.release_nibble();
        self.bus.set_control(ControlLine::M0, false);
        self.bus.set_control(ControlLine::M1, false);
        for device in &self.devices {
            device.context().power_on_reset();
        }
        self.phase = HostPhase::Idle;
    }

    /// Bring every PHROM back to address 0 with no load in progress.
    ///
    /// A single address nibble cancels any session and leaves the address
    /// invalid, so the following M0 pulse is always a dummy read.
    pub fn reset(&mut self) {
        self.bus.put_nibble(Nibble::new(0));
        self.pulse(ControlLine::M1);
        self.bus.release_nibble();
        self.pulse(ControlLine::M0);
        self.phase = HostPhase::Idle;
    }

    /// LOAD ADDRESS: five nibbles, least significant first, one M1 pulse each
    pub fn load_address(&mut self, address: u32) {
        for index in 0..5 {
            let nibble = Nibble::new(((address >> (4 * index)) & 0xF) as u8);
            self.bus.put_nibble(nibble);
            self.pulse(ControlLine::M1);
        }
        self.bus.release_nibble();
        self.phase = HostPhase::AddressLoaded;
        log::debug!("{}: host loaded address 0x{:05X}", self.name, address);
    }

    /// The single M0 pulse that opens a READ DATA session
    pub fn start_read(&mut self) {
        self.pulse(ControlLine::M0);
        self.phase = HostPhase::Reading;
    }

    /// One clock pulse; the bit is sampled while M0 is high
    pub fn read_bit(&mut self) -> bool {
        self.set_line(ControlLine::M0, true);
        let bit = self.bus.sample_data();
        self.set_line(ControlLine::M0, false);
        bit
    }

    /// Eight bits, LSB first. Opens a session first if one is not running.
    pub fn read_byte(&mut self) -> u8 {
        if self.phase != HostPhase::Reading {
            self.start_read();
        }

        let mut byte = 0u8;
        for bit in 0..8 {
            if self.read_bit() {
                byte |= 1 << bit;
            }
        }
        byte
    }

    pub fn read_bytes(&mut self, count: usize) -> Vec<u8> {
        (0..count).map(|_| self.read_byte()).collect()
    }

    /// Load `address` and read `count` sequential bytes from it
    pub fn read_at(&mut self, address: u32, count: usize) -> Vec<u8> {
        self.load_address(address);
        self.read_bytes(count)
    }
}
