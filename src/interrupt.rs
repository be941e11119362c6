//! # Interrupt Delivery
//!
//! A real PHROM emulator services M0 and M1 from two external interrupts.
//! Here each device is wrapped in a [`DeviceContext`] that owns the chip, its
//! bus adapter and one edge detector per control line behind a single lock,
//! so a handler always runs to completion against a consistent state.
//!
//! [`InterruptController`] feeds a context from asynchronous sources: each
//! [`IrqLine`] forwards level changes and waits until the handler they
//! triggered has finished, the way a host must not start the next pulse
//! before the device has serviced the previous one.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, oneshot};

use crate::bus::{ControlLine, DataBus, Edge, EdgeTrigger, PinPort};
use crate::components::memory::bank_rom::{BankDataProvider, BankRom};
use crate::components::memory::tms6100::{DeviceState, Indicators, Tms6100};
use crate::error::{EmuError, Result};

/// Edge-detect latch for one control line (an external interrupt input)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDetector {
    line: ControlLine,
    edge: Edge,
    level: bool,
    pending: bool,
}

impl EdgeDetector {
    pub fn new(line: ControlLine, edge: Edge, level: bool) -> Self {
        EdgeDetector {
            line,
            edge,
            level,
            pending: false,
        }
    }

    pub fn line(&self) -> ControlLine {
        self.line
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn level(&self) -> bool {
        self.level
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Track a new line level, latching an event if it completes the armed edge
    pub fn observe(&mut self, level: bool) {
        if self.edge.matches(self.level, level) {
            self.pending = true;
        }
        self.level = level;
    }

    pub fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl EdgeTrigger for EdgeDetector {
    fn set_edge(&mut self, edge: Edge) {
        self.edge = edge;
    }

    fn clear_pending(&mut self) {
        self.pending = false;
    }
}

/// Which handler a line change ended up running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    LoadAddress,
    ReadData,
}

struct Attached<R: BankDataProvider, B: DataBus> {
    chip: Tms6100<R>,
    bus: B,
    m0: EdgeDetector,
    m1: EdgeDetector,
}

/// One emulated chip with its interrupt inputs, shareable between threads
pub struct DeviceContext<R: BankDataProvider = BankRom, B: DataBus = PinPort> {
    inner: Arc<Mutex<Attached<R, B>>>,
}

impl<R: BankDataProvider, B: DataBus> Clone for DeviceContext<R, B> {
    fn clone(&self) -> Self {
        DeviceContext {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: BankDataProvider, B: DataBus> DeviceContext<R, B> {
    /// Attach a chip to its bus with both control lines idle low
    pub fn new(chip: Tms6100<R>, bus: B) -> Self {
        Self::with_levels(chip, bus, false, false)
    }

    pub fn with_levels(mut chip: Tms6100<R>, mut bus: B, m0_level: bool, m1_level: bool) -> Self {
        let mut m0 = EdgeDetector::new(ControlLine::M0, Edge::Falling, m0_level);
        // LOAD ADDRESS is always taken on the rising edge of M1
        let m1 = EdgeDetector::new(ControlLine::M1, Edge::Rising, m1_level);
        chip.power_on_reset(&mut bus, &mut m0);

        DeviceContext {
            inner: Arc::new(Mutex::new(Attached { chip, bus, m0, m1 })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Attached<R, B>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver a control-line level change and run the handler it triggers.
    ///
    /// Edge detection and the handler execute under one lock acquisition.
    pub fn line_changed(&self, line: ControlLine, level: bool) -> Option<Dispatch> {
        let mut guard = self.lock();
        let Attached { chip, bus, m0, m1 } = &mut *guard;

        match line {
            ControlLine::M1 => {
                m1.observe(level);
                if m1.take_pending() {
                    chip.load_address(bus, m0);
                    return Some(Dispatch::LoadAddress);
                }
            }
            ControlLine::M0 => {
                m0.observe(level);
                if m0.take_pending() {
                    chip.read_data(bus, m0);
                    return Some(Dispatch::ReadData);
                }
            }
        }
        None
    }

    pub fn power_on_reset(&self) {
        let mut guard = self.lock();
        let Attached { chip, bus, m0, .. } = &mut *guard;
        chip.power_on_reset(bus, m0);
    }

    pub fn name(&self) -> String {
        self.lock().chip.name().to_string()
    }

    pub fn state(&self) -> DeviceState {
        self.lock().chip.state().clone()
    }

    pub fn indicators(&self) -> Indicators {
        self.lock().chip.indicators()
    }

    /// Edge the READ DATA input is currently armed for
    pub fn read_data_edge(&self) -> Edge {
        self.lock().m0.edge()
    }

    /// Run `f` against the bus adapter while holding the device lock
    pub fn with_bus<T>(&self, f: impl FnOnce(&B) -> T) -> T {
        f(&self.lock().bus)
    }
}

struct LineEvent {
    line: ControlLine,
    level: bool,
    done: oneshot::Sender<Option<Dispatch>>,
}

/// Sending half for one control line of one device
#[derive(Clone)]
pub struct IrqLine {
    line: ControlLine,
    tx: mpsc::UnboundedSender<LineEvent>,
}

impl IrqLine {
    pub fn line(&self) -> ControlLine {
        self.line
    }

    /// Change the line level and wait until the device has serviced it
    pub async fn set_level(&self, level: bool) -> Result<Option<Dispatch>> {
        let (done, serviced) = oneshot::channel();
        self.tx
            .send(LineEvent {
                line: self.line,
                level,
                done,
            })
            .map_err(|_| EmuError::ControllerStopped)?;
        serviced.await.map_err(|_| EmuError::ControllerStopped)
    }

    /// Drive a high-then-low pulse
    pub async fn pulse(&self) -> Result<()> {
        self.set_level(true).await?;
        self.set_level(false).await?;
        Ok(())
    }
}

/// Serialises asynchronous line changes into a [`DeviceContext`].
///
/// Events from both lines share one ordered queue, so the device sees them
/// in the order the host produced them.
pub struct InterruptController<R: BankDataProvider = BankRom, B: DataBus = PinPort> {
    ctx: DeviceContext<R, B>,
    rx: mpsc::UnboundedReceiver<LineEvent>,
}

impl<R: BankDataProvider, B: DataBus> InterruptController<R, B> {
    /// Returns the controller plus the M0 and M1 line handles
    pub fn new(ctx: DeviceContext<R, B>) -> (Self, IrqLine, IrqLine) {
        let (tx, rx) = mpsc::unbounded_channel();
        let m0 = IrqLine {
            line: ControlLine::M0,
            tx: tx.clone(),
        };
        let m1 = IrqLine {
            line: ControlLine::M1,
            tx,
        };
        (InterruptController { ctx, rx }, m0, m1)
    }

    pub fn context(&self) -> &DeviceContext<R, B> {
        &self.ctx
    }

    /// Service events until every [`IrqLine`] has been dropped.
    /// Returns the number of line changes handled.
    pub async fn run(mut self) -> usize {
        let mut serviced = 0;
        while let Some(event) = self.rx.recv().await {
            let dispatch = self.ctx.line_changed(event.line, event.level);
            // The sender may have given up waiting; the event still happened
            let _ = event.done.send(dispatch);
            serviced += 1;
        }
        log::debug!("{}: interrupt controller stopped after {} events", self.ctx.name(), serviced);
        serviced
    }
}
