pub mod bank_rom;
pub mod phrom;
pub mod tms6100;

pub use bank_rom::{BankDataProvider, BankRom};
pub use phrom::PhromDevice;
pub use tms6100::{DeviceState, Indicators, LineMode, ReadEdge, Tms6100};
