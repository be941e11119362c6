//! # TMS6100 PHROM Emulator Library
//!
//! Emulates the TMS6100 voice synthesis memory as seen from a TMS5220
//! speech processor: five-nibble address loads on M1, bit-serial reads on
//! M0, and several PHROMs sharing one bus with each answering only to its
//! own 16K bank.
//!
//! This library provides:
//! - The per-device protocol state machine ([`Tms6100`])
//! - Pin-level bus wiring with drive-strength resolution
//! - Synchronous and tokio-based interrupt delivery
//! - JSON-configurable multi-PHROM systems and a terminal monitor

pub mod bus;
pub mod component;
pub mod components;
pub mod console;
pub mod error;
pub mod interrupt;
pub mod pin;
pub mod system_config;
pub mod systems;
pub mod types;

// Re-export commonly used items for easier importing
pub use bus::{ControlLine, DataBus, Edge, EdgeTrigger, PhromBus, PinPort};
pub use component::{BaseComponent, Component};
pub use components::memory::{BankDataProvider, BankRom, PhromDevice, Tms6100};
pub use error::{EmuError, Result};
pub use interrupt::{DeviceContext, InterruptController, IrqLine};
pub use pin::{Pin, PinValue};
pub use systems::SpeechSystem;
pub use types::{BankId, Nibble};
