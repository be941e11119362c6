//! Property-based tests for the TMS6100 protocol handlers
//!
//! These tests use property-based testing to check address accumulation,
//! serial bit order and session cancellation over arbitrary inputs.


use mocks::*;
use proptest::prelude::*;
use tms6100_emu::components::memory::{BankRom, LineMode};
use tms6100_emu::systems::SpeechSystem;
use tms6100_emu::types::{BankId, ADDRESS_MASK, BANK_SIZE};

mod proptest_helpers {
    use super::*;

    pub fn arb_nibbles() -> impl Strategy<Value = [u8; 5]> {
        prop::array::uniform5(0u8..16)
    }

    pub fn arb_address() -> impl Strategy<Value = u32> {
        0u32..=ADDRESS_MASK
    }

    pub fn arb_bank() -> impl Strategy<Value = u8> {
        0u8..16
    }
}

#[cfg(test)]
mod address_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_five_nibbles_form_address(
            nibbles in proptest_helpers::arb_nibbles(),
            bank in proptest_helpers::arb_bank()
        ) {
            let mut host = MockHost::new(MockRom::patterned(bank));
            host.send_nibbles(&nibbles);

            let raw = nibbles
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, &n)| acc | (u32::from(n) << (4 * i)));
            let state = host.chip.state();
            prop_assert!(state.address_valid);
            prop_assert_eq!(state.load_nibble, 0);
            prop_assert_eq!(state.address, raw & ADDRESS_MASK);
            prop_assert_eq!(u32::from(state.bank_select.value()), (raw >> 14) & 0xF);
        }

        #[test]
        fn test_partial_load_then_read_is_dummy(
            nibbles in prop::collection::vec(0u8..16, 0..5),
            bank in proptest_helpers::arb_bank()
        ) {
            let mut host = MockHost::new(MockRom::patterned(bank));
            host.send_nibbles(&nibbles);
            prop_assert!(!host.chip.state().address_valid);

            let ops = host.clock(1);
            prop_assert!(ops.is_empty());
            prop_assert_eq!(host.chip.state().address, 0);
            prop_assert_eq!(host.chip.state().load_nibble, 0);
            prop_assert!(!host.chip.state().transfer_active);
        }
    }
}

#[cfg(test)]
mod serial_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_bits_leave_lsb_first(
            offset in 0u16..(BANK_SIZE as u16),
            byte in any::<u8>(),
            bank in proptest_helpers::arb_bank()
        ) {
            let mut rom = MockRom::patterned(bank);
            rom.set(offset, byte);
            let mut host = MockHost::new(rom);
            let address = (u32::from(bank) << 14) | u32::from(offset);
            host.load(address);
            host.read_pulse();

            let ops = host.clock(8);
            let drives: Vec<BusOp> = ops.into_iter().filter(|op| op.is_drive()).collect();
            prop_assert_eq!(drives.len(), 8);
            prop_assert_eq!(host.bus.driven_bits(), lsb_first_bits(byte));
            prop_assert_eq!(host.chip.state().address, address + 1);
        }

        #[test]
        fn test_foreign_bank_never_drives(
            address in proptest_helpers::arb_address(),
            bank in proptest_helpers::arb_bank(),
            pulses in 1usize..40
        ) {
            prop_assume!(BankId::of_address(address).value() != bank);
            // Stay clear of the next bank so ownership cannot change mid-run
            prop_assume!((address & 0x3FFF) < 0x3FFF - 8);

            let mut host = MockHost::new(MockRom::patterned(bank));
            host.load(address);
            host.read_pulse();
            let ops = host.clock(pulses);
            prop_assert!(ops.iter().all(|op| !op.is_drive()));
            prop_assert_eq!(host.chip.rom().read_count(), 0);
        }

        #[test]
        fn test_load_cancels_at_any_point(
            offset in 0u16..0x3000,
            bits in 0usize..64,
            nibble in 0u8..16
        ) {
            let mut host = MockHost::new(MockRom::patterned(0));
            host.load(u32::from(offset));
            host.read_pulse();
            host.clock(bits);

            host.bus.clear();
            host.send_nibble(nibble);
            let state = host.chip.state();
            prop_assert!(!state.transfer_active);
            prop_assert!(!state.bank_owns_bus);
            prop_assert_eq!(state.data_line, LineMode::Released);
            prop_assert_eq!(state.load_nibble, 1);
            prop_assert!(host.bus.ops.iter().all(|op| !op.is_drive()));
        }
    }
}

#[cfg(test)]
mod wired_properties {
    use super::*;

    fn image(seed: u8) -> Vec<u8> {
        (0..BANK_SIZE)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_host_reads_match_images(
            start in 0u32..0x8000,
            count in 1usize..6
        ) {
            let low = image(7);
            let high = image(99);
            let mut system = SpeechSystem::new("Pair".to_string(), String::new());
            system
                .add_device("LOW".to_string(), BankRom::from_image("LOW", BankId::new(0).unwrap(), &low, 0).unwrap())
                .unwrap();
            system
                .add_device("HIGH".to_string(), BankRom::from_image("HIGH", BankId::new(1).unwrap(), &high, 0).unwrap())
                .unwrap();
            system.reset();

            let expected: Vec<u8> = (0..count as u32)
                .map(|i| start + i)
                .map(|a| match a >> 14 {
                    0 => low[(a & 0x3FFF) as usize],
                    1 => high[(a & 0x3FFF) as usize],
                    _ => 0xFF,
                })
                .collect();
            prop_assert_eq!(system.read_at(start, count), expected);
            prop_assert_eq!(system.contention_events(), 0);
        }
    }
}
