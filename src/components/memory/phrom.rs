use std::collections::HashMap;

use crate::bus::{ControlLine, PhromBus, PinPort, SharedPin};
use crate::component::{BaseComponent, Component};
use crate::components::memory::bank_rom::{BankDataProvider, BankRom};
use crate::components::memory::tms6100::Tms6100;
use crate::error::Result;
use crate::interrupt::{DeviceContext, Dispatch};
use crate::types::BankId;

/// A TMS6100 wired onto a [`PhromBus`].
///
/// Shares M0, M1 and ADD1..ADD8 with the host and every other PHROM on the
/// same bus, driving ADD8 under its own name.
pub struct PhromDevice {
    base: BaseComponent,
    ctx: DeviceContext<BankRom, PinPort>,
    bank: BankId,
}

impl PhromDevice {
    pub fn new(name: String, rom: BankRom, bus: &PhromBus) -> Self {
        let bank = rom.bank_id();
        let port = bus.port(&name);
        let chip = Tms6100::new(name.clone(), rom);
        let ctx = DeviceContext::with_levels(
            chip,
            port,
            bus.control_level(ControlLine::M0),
            bus.control_level(ControlLine::M1),
        );

        PhromDevice {
            base: BaseComponent::new(name, bus.pins()),
            ctx,
            bank,
        }
    }

    pub fn bank(&self) -> BankId {
        self.bank
    }

    pub fn context(&self) -> &DeviceContext<BankRom, PinPort> {
        &self.ctx
    }

    /// Forward a control-line level change seen on the shared bus
    pub fn line_changed(&self, line: ControlLine, level: bool) -> Option<Dispatch> {
        self.ctx.line_changed(line, level)
    }
}

impl Component for PhromDevice {
    fn name(&self) -> String {
        self.base.name()
    }

    fn pins(&self) -> HashMap<String, SharedPin> {
        self.base.pins()
    }

    fn get_pin(&self, name: &str) -> Result<SharedPin> {
        self.base.get_pin(name)
    }
}
