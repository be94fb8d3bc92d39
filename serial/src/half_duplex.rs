//! Single-wire half duplex.
//!
//! The peripheral loops its receiver onto the transmit pin and a
//! direction bit decides who drives the wire. The direction must flip to
//! transmit before the data write that starts a burst and may only flip
//! back once transmit-complete has been seen, otherwise the last bit is
//! truncated or echoed into the receiver.

use core::sync::atomic::{AtomicBool, Ordering};

use common::sync::{IrqControl, IrqSpinLock};

use crate::hal::gpio::{GpioController, PullMode};
use crate::hal::serial::{Direction, SerialPeripheral};

pub struct HalfDuplexController {
    enabled: AtomicBool,
}

impl HalfDuplexController {
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Switch the peripheral to single-wire mode and hold the idle line
    /// high with a weak pull-up on `tx_pin`.
    pub fn enable<U, G, I>(&self, uart: &U, gpio: &IrqSpinLock<G, I>, tx_pin: u8)
    where
        U: SerialPeripheral,
        G: GpioController<Pin = u8>,
        I: IrqControl,
    {
        uart.set_single_wire(true);
        if let Err(err) = gpio.with(|gpio| gpio.set_pull(tx_pin, PullMode::Up)) {
            log::warn!("serial: no pull-up on tx pin {tx_pin}: {err:?}");
        }
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable<U: SerialPeripheral>(&self, uart: &U) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            uart.set_single_wire(false);
        }
    }

    /// Take the wire before a burst starts.
    pub fn begin_transmit<U: SerialPeripheral, I: IrqControl>(&self, uart: &U) {
        if self.is_enabled() {
            I::critical(|| uart.set_direction(Direction::Transmit));
        }
    }

    /// Release the wire once the last unit has left the shifter.
    pub fn end_transmit<U: SerialPeripheral, I: IrqControl>(&self, uart: &U) {
        if self.is_enabled() {
            I::critical(|| uart.set_direction(Direction::Receive));
        }
    }
}

impl Default for HalfDuplexController {
    fn default() -> Self {
        Self::new()
    }
}
