use std::fs;
use std::path::Path;

use crate::error::{EmuError, Result};
use crate::types::{BankId, BANK_SIZE, OFFSET_MASK};

/// Read-only byte table behind one PHROM.
///
/// `read` must be total over the 14-bit offset space; the device never asks
/// for anything wider.
pub trait BankDataProvider: Send {
    fn bank_id(&self) -> BankId;
    fn read(&self, offset: u16) -> u8;
}

/// 16 KiB mask-ROM image answering to a single bank
#[derive(Debug, Clone)]
pub struct BankRom {
    bank: BankId,
    data: Box<[u8; BANK_SIZE]>,
}

impl BankRom {
    /// Erased bank (every byte `fill`)
    pub fn new(bank: BankId, fill: u8) -> Self {
        BankRom {
            bank,
            data: Box::new([fill; BANK_SIZE]),
        }
    }

    /// Copy `image` into the bank, padding the tail with `fill`
    pub fn from_image(name: &str, bank: BankId, image: &[u8], fill: u8) -> Result<Self> {
        if image.len() > BANK_SIZE {
            return Err(EmuError::ImageTooLarge {
                name: name.to_string(),
                len: image.len(),
                max: BANK_SIZE,
            });
        }

        let mut rom = BankRom::new(bank, fill);
        rom.data[..image.len()].copy_from_slice(image);
        Ok(rom)
    }

    pub fn from_file(name: &str, bank: BankId, path: &Path, fill: u8) -> Result<Self> {
        let image = fs::read(path).map_err(|source| EmuError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "Loaded {} bytes for {} (bank {}) from {}",
            image.len(),
            name,
            bank,
            path.display()
        );
        BankRom::from_image(name, bank, &image, fill)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }
}

impl BankDataProvider for BankRom {
    fn bank_id(&self) -> BankId {
        self.bank
    }

    fn read(&self, offset: u16) -> u8 {
        self.data[(offset as u32 & OFFSET_MASK) as usize]
    }
}
