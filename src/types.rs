use std::fmt;

/// Number of bytes held by one PHROM bank (14-bit offset space)
pub const BANK_SIZE: usize = 0x4000;

/// Width of the address register once a load completes
pub const ADDRESS_MASK: u32 = 0x3_FFFF;

/// Bits 17..14 of the address select the bank
pub const BANK_MASK: u32 = 0x3_C000;
pub const BANK_SHIFT: u32 = 14;

/// Bits 13..0 of the address are the offset inside a bank
pub const OFFSET_MASK: u32 = 0x3FFF;

/// Byte presented when the addressed bank belongs to another device
pub const NOT_MY_BANK: u8 = 0xFF;

/// 4-bit value carried on ADD1/ADD2/ADD4/ADD8 during LOAD ADDRESS
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Nibble(u8);

impl Nibble {
    pub fn new(value: u8) -> Self {
        Nibble(value & 0x0F)
    }

    /// Assemble a nibble from the four bus lines, ADD1 being the least significant
    pub fn from_lines(add1: bool, add2: bool, add4: bool, add8: bool) -> Self {
        let mut value = 0;
        if add1 {
            value += 1;
        }
        if add2 {
            value += 2;
        }
        if add4 {
            value += 4;
        }
        if add8 {
            value += 8;
        }
        Nibble(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Line levels for ADD1, ADD2, ADD4, ADD8 in that order
    pub fn lines(&self) -> [bool; 4] {
        [
            self.0 & 0x1 != 0,
            self.0 & 0x2 != 0,
            self.0 & 0x4 != 0,
            self.0 & 0x8 != 0,
        ]
    }
}

impl fmt::Display for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl From<u8> for Nibble {
    fn from(value: u8) -> Self {
        Nibble::new(value)
    }
}

/// One of the 16 bank numbers a PHROM can answer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BankId(u8);

impl BankId {
    pub const MAX: u8 = 0x0F;

    /// Returns `None` when the value does not fit in four bits
    pub fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX {
            Some(BankId(value))
        } else {
            None
        }
    }

    /// Bank implied by bits 17..14 of an address; higher bits are ignored
    pub fn of_address(address: u32) -> Self {
        BankId(((address & BANK_MASK) >> BANK_SHIFT) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// First 18-bit address belonging to this bank
    pub fn base_address(&self) -> u32 {
        (self.0 as u32) << BANK_SHIFT
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

/// Offset of an address inside its bank (bits 13..0)
pub fn offset_of(address: u32) -> u16 {
    (address & OFFSET_MASK) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nibble_from_lines() {
        assert_eq!(Nibble::from_lines(false, false, false, false).value(), 0x0);
        assert_eq!(Nibble::from_lines(true, false, false, false).value(), 0x1);
        assert_eq!(Nibble::from_lines(false, false, false, true).value(), 0x8);
        assert_eq!(Nibble::from_lines(true, true, true, true).value(), 0xF);
        assert_eq!(Nibble::new(0xA).lines(), [false, true, false, true]);
    }

    #[test]
    fn test_nibble_masks_to_four_bits() {
        assert_eq!(Nibble::new(0x3C).value(), 0xC);
    }

    #[test]
    fn test_bank_of_address() {
        assert_eq!(BankId::of_address(0x0_8000).value(), 2);
        assert_eq!(BankId::of_address(0x3_FFFF).value(), 0xF);
        // bit 18 and above do not take part in bank selection
        assert_eq!(BankId::of_address(0x4_0000).value(), 0);
        assert_eq!(offset_of(0x0_C123), 0x0123);
    }

    #[test]
    fn test_bank_id_range() {
        assert!(BankId::new(15).is_some());
        assert!(BankId::new(16).is_none());
        assert_eq!(BankId::new(3).map(|b| b.base_address()), Some(0xC000));
    }
}
