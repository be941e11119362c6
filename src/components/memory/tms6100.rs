use crate::bus::{DataBus, Edge, EdgeTrigger};
use crate::components::memory::bank_rom::{BankDataProvider, BankRom};
use crate::types::{offset_of, BankId, Nibble, ADDRESS_MASK, NOT_MY_BANK};

/// Direction of the ADD8 pin as seen by this device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Released, // Input, high impedance
    Driven,   // Output, carrying serial data
}

/// Which M0 edge the READ DATA interrupt is armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEdge {
    AwaitingStart, // Falling edge: dummy read or start of a session
    AwaitingClock, // Rising edge: one data bit per pulse
}

impl ReadEdge {
    pub fn edge(&self) -> Edge {
        match self {
            ReadEdge::AwaitingStart => Edge::Falling,
            ReadEdge::AwaitingClock => Edge::Rising,
        }
    }
}

/// Protocol position of one emulated TMS6100
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    /// Byte address; bits 17..14 are the bank. Deliberately not re-masked while
    /// a session auto-increments, only when the next load completes.
    pub address: u32,
    /// Bank decoded from the most recent completed LOAD ADDRESS
    pub bank_select: BankId,
    /// Next nibble position (0-4) of an address load
    pub load_nibble: u8,
    pub address_valid: bool,
    pub transfer_active: bool,
    pub bit_cursor: u8,
    pub current_byte: u8,
    pub bank_owns_bus: bool,
    pub data_line: LineMode,
    pub read_edge: ReadEdge,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            address: 0,
            bank_select: BankId::default(),
            load_nibble: 0,
            address_valid: false,
            transfer_active: false,
            bit_cursor: 0,
            current_byte: 0,
            bank_owns_bus: false,
            data_line: LineMode::Released,
            read_edge: ReadEdge::AwaitingStart,
        }
    }
}

/// Status outputs, one per debug LED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Indicators {
    pub valid_address: bool,
    pub read_active: bool,
    pub bank_active: bool,
}

/// TMS6100 Voice Synthesis Memory (PHROM), 1-bit transfer mode
///
/// Hardware Architecture:
/// - 18-bit byte address loaded as five nibbles on rising M1 edges
/// - Serial data out on ADD8, LSB first, one bit per M0 pulse
/// - Up to 16 PHROMs share one bus; each answers to a single 16K bank
///   and must leave ADD8 as an input while another bank is addressed
///
/// Hardware Deviations:
/// - 4-bit transfer mode is not emulated (the TMS5220 only uses 1-bit mode)
/// - INDIRECT ADDRESS (M0 and M1 rising together) is not implemented
pub struct Tms6100<R: BankDataProvider = BankRom> {
    name: String,
    rom: R,
    state: DeviceState,
}

impl<R: BankDataProvider> Tms6100<R> {
    pub fn new(name: String, rom: R) -> Self {
        Tms6100 {
            name,
            rom,
            state: DeviceState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bank(&self) -> BankId {
        self.rom.bank_id()
    }

    pub fn rom(&self) -> &R {
        &self.rom
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn indicators(&self) -> Indicators {
        Indicators {
            valid_address: self.state.address_valid,
            read_active: self.state.transfer_active,
            bank_active: self.state.bank_owns_bus,
        }
    }

    /// Return to the power-up state: ADD8 an input, READ DATA armed for the
    /// start edge, no address loaded
    pub fn power_on_reset<B, T>(&mut self, bus: &mut B, m0: &mut T)
    where
        B: DataBus + ?Sized,
        T: EdgeTrigger + ?Sized,
    {
        self.state = DeviceState::default();
        bus.release();
        m0.set_edge(self.state.read_edge.edge());
        m0.clear_pending();
        log::debug!("{}: power-on reset", self.name);
    }

    /// LOAD ADDRESS (rising edge of M1).
    ///
    /// Always tears down a running READ DATA session before touching the
    /// address register, whatever bit of a byte the session had reached.
    pub fn load_address<B, T>(&mut self, bus: &mut B, m0: &mut T)
    where
        B: DataBus + ?Sized,
        T: EdgeTrigger + ?Sized,
    {
        self.state.transfer_active = false;
        self.state.bank_owns_bus = false;
        if self.state.data_line == LineMode::Driven {
            bus.release();
            self.state.data_line = LineMode::Released;
        }

        self.state.read_edge = ReadEdge::AwaitingStart;
        m0.set_edge(self.state.read_edge.edge());
        m0.clear_pending();

        let nibble: Nibble = bus.sample_nibble();

        if self.state.load_nibble == 0 {
            self.state.address = 0;
        }
        self.state.address |= (nibble.value() as u32) << (4 * self.state.load_nibble as u32);
        self.state.load_nibble += 1;

        log::trace!(
            "{}: address nibble {} = {} (accumulated 0x{:05X})",
            self.name,
            self.state.load_nibble - 1,
            nibble,
            self.state.address
        );

        if self.state.load_nibble > 4 {
            // 2 ignored bits, 4 bank bits, 14 offset bits
            self.state.address_valid = true;
            self.state.load_nibble = 0;
            self.state.bank_select = BankId::of_address(self.state.address);
            self.state.address &= ADDRESS_MASK;
            log::debug!(
                "{}: address 0x{:05X} loaded (bank {})",
                self.name,
                self.state.address,
                self.state.bank_select
            );
        } else {
            self.state.address_valid = false;
        }
    }

    /// READ DATA (an armed edge of M0)
    pub fn read_data<B, T>(&mut self, bus: &mut B, m0: &mut T)
    where
        B: DataBus + ?Sized,
        T: EdgeTrigger + ?Sized,
    {
        if self.state.transfer_active {
            self.clock_bit(bus);
        } else if !self.state.address_valid {
            // Dummy read: the host is resetting us
            self.state.address = 0;
            self.state.load_nibble = 0;
            log::trace!("{}: dummy read, address reset", self.name);
        } else {
            self.state.transfer_active = true;
            self.fetch_current_byte();
            self.state.bit_cursor = 0;
            self.state.read_edge = ReadEdge::AwaitingClock;
            m0.set_edge(self.state.read_edge.edge());
            log::debug!(
                "{}: read session at 0x{:05X}, {}",
                self.name,
                self.state.address,
                if self.state.bank_owns_bus {
                    "bank active"
                } else {
                    "bank inactive"
                }
            );
        }
    }

    fn clock_bit<B: DataBus + ?Sized>(&mut self, bus: &mut B) {
        // Ownership follows the bank of the byte being sent, which can change
        // at a bank boundary in the middle of a session
        match (self.state.bank_owns_bus, self.state.data_line) {
            (true, LineMode::Released) => self.state.data_line = LineMode::Driven,
            (false, LineMode::Driven) => {
                bus.release();
                self.state.data_line = LineMode::Released;
            }
            _ => {}
        }

        if self.state.bank_owns_bus {
            if self.state.current_byte & (1 << self.state.bit_cursor) != 0 {
                bus.drive_high();
            } else {
                bus.drive_low();
            }
        }

        self.state.bit_cursor += 1;

        if self.state.bit_cursor > 7 {
            self.state.bit_cursor = 0;
            let was_active = self.state.bank_owns_bus;
            self.state.address = self.state.address.wrapping_add(1);
            self.fetch_current_byte();

            if was_active != self.state.bank_owns_bus {
                log::debug!(
                    "{}: crossed to 0x{:05X}, bank {}",
                    self.name,
                    self.state.address,
                    if self.state.bank_owns_bus {
                        "active"
                    } else {
                        "inactive"
                    }
                );
            }
        }
    }

    fn fetch_current_byte(&mut self) {
        let bank = BankId::of_address(self.state.address);
        if bank == self.rom.bank_id() {
            self.state.current_byte = self.rom.read(offset_of(self.state.address));
            self.state.bank_owns_bus = true;
        } else {
            self.state.current_byte = NOT_MY_BANK;
            self.state.bank_owns_bus = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Op {
        High,
        Low,
        Release,
    }

    #[derive(Default)]
    struct TestBus {
        nibble: u8,
        ops: Vec<Op>,
    }

    impl DataBus for TestBus {
        fn drive_high(&mut self) {
            self.ops.push(Op::High);
        }
        fn drive_low(&mut self) {
            self.ops.push(Op::Low);
        }
        fn release(&mut self) {
            self.ops.push(Op::Release);
        }
        fn sample_nibble(&mut self) -> Nibble {
            Nibble::new(self.nibble)
        }
    }

    #[derive(Default)]
    struct TestTrigger {
        edge: Option<Edge>,
        clears: usize,
    }

    impl EdgeTrigger for TestTrigger {
        fn set_edge(&mut self, edge: Edge) {
            self.edge = Some(edge);
        }
        fn clear_pending(&mut self) {
            self.clears += 1;
        }
    }

    fn rom(bank: u8) -> BankRom {
        let image: Vec<u8> = (0..=255u8).collect();
        BankRom::from_image("TEST", BankId::new(bank).unwrap(), &image, 0x00).unwrap()
    }

    fn load(chip: &mut Tms6100, bus: &mut TestBus, trigger: &mut TestTrigger, address: u32) {
        for i in 0..5 {
            bus.nibble = ((address >> (4 * i)) & 0xF) as u8;
            chip.load_address(bus, trigger);
        }
    }

    #[test]
    fn test_tms6100_creation() {
        let chip = Tms6100::new("PHROM".to_string(), rom(3));
        assert_eq!(chip.name(), "PHROM");
        assert_eq!(chip.bank().value(), 3);
        assert_eq!(chip.state(), &DeviceState::default());
        assert_eq!(chip.indicators(), Indicators::default());
    }

    #[test]
    fn test_partial_load_is_invalid() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(0));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        bus.nibble = 0x5;
        for expected_index in 1..5 {
            chip.load_address(&mut bus, &mut trigger);
            assert_eq!(chip.state().load_nibble, expected_index);
            assert!(!chip.state().address_valid);
        }
        assert_eq!(chip.state().address, 0x5555);
        assert_eq!(trigger.edge, Some(Edge::Falling));
        assert_eq!(trigger.clears, 4);
    }

    #[test]
    fn test_complete_load_splits_bank() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(2));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        load(&mut chip, &mut bus, &mut trigger, 0xF_8123);
        let state = chip.state();
        assert!(state.address_valid);
        assert_eq!(state.load_nibble, 0);
        assert_eq!(state.address, 0x3_8123);
        assert_eq!(state.bank_select.value(), 0xE);
    }

    #[test]
    fn test_dummy_read_resets_load_progress() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(0));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        bus.nibble = 0x7;
        chip.load_address(&mut bus, &mut trigger);
        chip.load_address(&mut bus, &mut trigger);
        bus.ops.clear();

        chip.read_data(&mut bus, &mut trigger);
        assert_eq!(chip.state().address, 0);
        assert_eq!(chip.state().load_nibble, 0);
        assert!(!chip.state().transfer_active);
        assert!(bus.ops.is_empty());
    }

    #[test]
    fn test_start_pulse_arms_clock_edge() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(0));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        load(&mut chip, &mut bus, &mut trigger, 0x00010);
        bus.ops.clear();
        chip.read_data(&mut bus, &mut trigger);

        let state = chip.state();
        assert!(state.transfer_active);
        assert!(state.bank_owns_bus);
        assert_eq!(state.current_byte, 0x10);
        assert_eq!(state.bit_cursor, 0);
        assert_eq!(state.read_edge, ReadEdge::AwaitingClock);
        assert_eq!(trigger.edge, Some(Edge::Rising));
        assert!(bus.ops.is_empty(), "start pulse does not touch ADD8");
    }

    #[test]
    fn test_clock_pulses_shift_lsb_first() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(0));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        load(&mut chip, &mut bus, &mut trigger, 0x000A5);
        chip.read_data(&mut bus, &mut trigger);
        bus.ops.clear();

        for _ in 0..8 {
            chip.read_data(&mut bus, &mut trigger);
        }
        // 0xA5 = 1010_0101
        use Op::*;
        assert_eq!(bus.ops, vec![High, Low, High, Low, Low, High, Low, High]);
        assert_eq!(chip.state().address, 0x000A6);
        assert_eq!(chip.state().current_byte, 0xA6);
        assert_eq!(chip.state().data_line, LineMode::Driven);
    }

    #[test]
    fn test_foreign_bank_never_drives() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(2));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        load(&mut chip, &mut bus, &mut trigger, 5 << 14);
        chip.read_data(&mut bus, &mut trigger);
        assert!(!chip.state().bank_owns_bus);
        assert_eq!(chip.state().current_byte, NOT_MY_BANK);

        bus.ops.clear();
        for _ in 0..8 {
            chip.read_data(&mut bus, &mut trigger);
        }
        assert!(bus.ops.is_empty());
        assert_eq!(chip.state().data_line, LineMode::Released);
    }

    #[test]
    fn test_bank_boundary_releases_bus() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(0));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        load(&mut chip, &mut bus, &mut trigger, 0x3FFF);
        chip.read_data(&mut bus, &mut trigger);
        for _ in 0..8 {
            chip.read_data(&mut bus, &mut trigger);
        }
        assert_eq!(chip.state().address, 0x4000);
        assert!(!chip.state().bank_owns_bus);
        assert_eq!(chip.state().current_byte, NOT_MY_BANK);

        bus.ops.clear();
        chip.read_data(&mut bus, &mut trigger);
        assert_eq!(bus.ops, vec![Op::Release]);
        assert_eq!(chip.state().data_line, LineMode::Released);
    }

    #[test]
    fn test_address_grows_past_eighteen_bits() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(0xF));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        load(&mut chip, &mut bus, &mut trigger, 0x3_FFFF);
        chip.read_data(&mut bus, &mut trigger);
        for _ in 0..8 {
            chip.read_data(&mut bus, &mut trigger);
        }
        assert_eq!(chip.state().address, 0x4_0000);
        // bank bits wrap to 0 even though the register keeps growing
        assert!(!chip.state().bank_owns_bus);
    }

    #[test]
    fn test_load_address_cancels_session() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(0));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        load(&mut chip, &mut bus, &mut trigger, 0x00001);
        chip.read_data(&mut bus, &mut trigger);
        chip.read_data(&mut bus, &mut trigger);
        chip.read_data(&mut bus, &mut trigger);
        assert_eq!(chip.state().bit_cursor, 2);
        bus.ops.clear();

        bus.nibble = 0x3;
        chip.load_address(&mut bus, &mut trigger);
        let state = chip.state();
        assert!(!state.transfer_active);
        assert!(!state.bank_owns_bus);
        assert!(!state.address_valid);
        assert_eq!(state.data_line, LineMode::Released);
        assert_eq!(state.read_edge, ReadEdge::AwaitingStart);
        assert_eq!(bus.ops, vec![Op::Release]);
        assert_eq!(trigger.edge, Some(Edge::Falling));
    }

    #[test]
    fn test_power_on_reset() {
        let mut chip = Tms6100::new("PHROM".to_string(), rom(0));
        let mut bus = TestBus::default();
        let mut trigger = TestTrigger::default();

        load(&mut chip, &mut bus, &mut trigger, 0x00001);
        chip.read_data(&mut bus, &mut trigger);
        chip.read_data(&mut bus, &mut trigger);
        bus.ops.clear();

        chip.power_on_reset(&mut bus, &mut trigger);
        assert_eq!(chip.state(), &DeviceState::default());
        assert_eq!(bus.ops, vec![Op::Release]);
        assert_eq!(trigger.edge, Some(Edge::Falling));
    }
}
