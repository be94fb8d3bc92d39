//! Interrupt-driven buffered serial channel.
//!
//! A [`Channel`] owns one peripheral together with its transmit and
//! receive rings. Foreground code queues units into the transmit ring and
//! takes them from the receive ring. [`Channel::on_interrupt`] moves
//! units between the rings and the hardware and is the only code that
//! produces into the receive ring or consumes from the transmit ring
//! while the peripheral's interrupt can run.
//!
//! ```text
//! write ──► tx ring ──► on_interrupt ──► data register ──► wire
//! wire ──► data register ──► on_interrupt ──► rx ring ──► getchar
//! ```

mod isr;
mod rx;
mod tx;


use core::sync::atomic::{AtomicBool, Ordering};

use common::sync::{IrqControl, IrqSpinLock};

use crate::flow::FlowController;
use crate::hal::gpio::{GpioController, OptionalPin};
use crate::hal::interrupt::ExecutionContext;
use crate::hal::serial::{SerialConfig, SerialError, SerialFormat, SerialPeripheral};
use crate::half_duplex::HalfDuplexController;
use crate::platform::Platform;
use crate::ring::{RingBuffer, Slot};

pub use tx::Writer;

/// Ring size used when none is given.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

pub struct Channel<
    'a,
    P: Platform,
    T: Slot = u8,
    const TX: usize = DEFAULT_BUFFER_SIZE,
    const RX: usize = DEFAULT_BUFFER_SIZE,
> {
    uart: P::Uart,
    context: P::Context,
    gpio: IrqSpinLock<P::Gpio, P::Irq>,
    tx: RingBuffer<'a, T, TX>,
    rx: RingBuffer<'a, T, RX>,
    flow: FlowController,
    half_duplex: HalfDuplexController,
    /// Driver-enable pin, high while a burst is on the wire.
    transmit_pin: OptionalPin,
    /// The transmit-enable pin and the single-wire direction are held
    /// for the current burst.
    wire_claimed: AtomicBool,
    transmitting: AtomicBool,
    nine_bit: AtomicBool,
}

impl<'a, P: Platform, T: Slot, const TX: usize, const RX: usize> Channel<'a, P, T, TX, RX> {
    pub fn new(uart: P::Uart, gpio: P::Gpio, context: P::Context) -> Self {
        Self {
            uart,
            context,
            gpio: IrqSpinLock::new(gpio),
            tx: RingBuffer::new(),
            rx: RingBuffer::new(),
            flow: FlowController::new(RX),
            half_duplex: HalfDuplexController::new(),
            transmit_pin: OptionalPin::none(),
            wire_claimed: AtomicBool::new(false),
            transmitting: AtomicBool::new(false),
            nine_bit: AtomicBool::new(false),
        }
    }

    pub fn peripheral(&self) -> &P::Uart {
        &self.uart
    }

    /// Whether the peripheral's clock is on. Every byte-path operation is
    /// a silent no-op while it is off.
    pub fn is_enabled(&self) -> bool {
        self.uart.is_enabled()
    }

    /// True from the first queued unit until transmit-complete.
    pub fn is_transmitting(&self) -> bool {
        self.transmitting.load(Ordering::Acquire)
    }

    /// Start the peripheral with a raw baud divisor, clamped to the
    /// peripheral's minimum. Both rings are emptied.
    pub fn begin(&self, divisor: u32) {
        let divisor = divisor.max(self.uart.min_divisor());
        self.tx.reset();
        self.rx.reset();
        self.transmitting.store(false, Ordering::Release);
        self.wire_claimed.store(false, Ordering::Release);
        self.uart.power_up(divisor);
        log::debug!("serial: {} up, divisor {divisor}", P::name());
    }

    /// Start the peripheral from a baud rate and frame description.
    pub fn begin_with(&self, config: SerialConfig) -> Result<(), SerialError> {
        let format = SerialFormat::try_from(config)?;
        if format.contains(SerialFormat::NINE_BIT_MODE) && T::BITS < 9 {
            return Err(SerialError::UnsupportedFormat);
        }
        let divisor = self.uart.divisor(config.baud_rate)?;
        self.begin(divisor);
        self.set_format(format);
        Ok(())
    }

    /// Wait for the last burst to finish, then stop the peripheral. Units
    /// still in the receive ring are dropped and the sender is paused.
    pub fn end(&self) {
        if !self.uart.is_enabled() {
            return;
        }
        self.wait_transmit_idle();
        self.uart.shut_down();
        self.rx.reset();
        self.flow.deassert(&self.gpio);
        log::debug!("serial: {} down", P::name());
    }

    pub fn set_format(&self, format: SerialFormat) {
        self.uart.apply_format(format);
        self.nine_bit
            .store(format.contains(SerialFormat::NINE_BIT_MODE), Ordering::Release);

        if format.contains(SerialFormat::HALF_DUPLEX) {
            self.half_duplex.enable(&self.uart, &self.gpio, P::tx_pin());
        } else {
            self.half_duplex.disable(&self.uart);
        }
        log::trace!("serial: format {:#x}", format.bits());
    }

    /// Drive `pin` high for the duration of every burst, for an RS-485
    /// transceiver's driver enable. Returns false if the pin cannot be
    /// used as an output.
    pub fn set_transmit_enable_pin(&self, pin: u8) -> bool {
        self.wait_transmit_idle();
        let configured = self.gpio.with(|gpio| {
            gpio.set_output(pin)?;
            gpio.set_low(pin)
        });
        match configured {
            Ok(()) => {
                self.transmit_pin.set(Some(pin));
                true
            }
            Err(err) => {
                log::warn!("serial: transmit enable pin {pin}: {err:?}");
                false
            }
        }
    }

    /// Use `pin` as RTS and assert it. An unusable pin turns RTS off and
    /// returns false, as does a stopped peripheral.
    pub fn set_rts_pin(&self, pin: u8) -> bool {
        if !self.uart.is_enabled() {
            return false;
        }
        match self.gpio.with(|gpio| gpio.set_output(pin)) {
            Ok(()) => {
                self.flow.set_rts_pin(Some(pin));
                self.flow.assert(&self.gpio);
                true
            }
            Err(err) => {
                log::warn!("serial: rts pin {pin}: {err:?}");
                self.flow.set_rts_pin(None);
                false
            }
        }
    }

    /// Let the peripheral hold transmission while `pin` is high.
    pub fn set_cts_pin(&self, pin: u8) -> bool {
        if !self.uart.is_enabled() {
            return false;
        }
        P::Irq::critical(|| self.uart.route_cts(pin))
    }

    /// Lend `memory` to the receive ring, or take it back with `None`.
    /// Flow-control watermarks move with the added capacity.
    ///
    /// Must not be called while units are pending in the receive ring.
    pub fn add_read_memory(&self, memory: Option<&'a mut [T]>) {
        P::Irq::critical(|| {
            let len = self.rx.install_extension(memory);
            self.flow.set_extension(len);
        });
    }

    /// Lend `memory` to the transmit ring, or take it back with `None`.
    /// Waits for the current burst to finish first.
    pub fn add_write_memory(&self, memory: Option<&'a mut [T]>) {
        self.wait_transmit_idle();
        P::Irq::critical(|| {
            self.tx.install_extension(memory);
        });
    }

    pub fn rts_watermarks(&self) -> (usize, usize) {
        (self.flow.low_watermark(), self.flow.high_watermark())
    }

    fn wait_transmit_idle(&self) {
        while self.transmitting.load(Ordering::Acquire) {
            self.context.yield_now();
        }
    }

    fn read_unit(&self) -> T {
        // The 9th bit belongs to the unit at the head of the FIFO and has
        // to be latched before the data read pops it.
        let ninth = self.nine_bit.load(Ordering::Relaxed) && self.uart.ninth_bit_received();
        let byte = self.uart.read_data();
        T::from_word(u16::from(byte) | if ninth { 0x100 } else { 0 })
    }

    /// Write one unit to the data register, taking the wire first if no
    /// one has yet for this burst.
    fn send_unit(&self, unit: T) {
        self.claim_wire();
        self.write_unit(unit);
    }

    fn write_unit(&self, unit: T) {
        let word = unit.to_word();
        if self.nine_bit.load(Ordering::Relaxed) {
            self.uart.set_ninth_bit(word & 0x100 != 0);
        }
        self.uart.write_data(word as u8);
    }

    /// Raise the transmit-enable pin and turn a single wire around to
    /// transmit. A no-op while the burst already holds the wire.
    fn claim_wire(&self) {
        if self.wire_claimed.load(Ordering::Acquire) {
            return;
        }
        P::Irq::critical(|| {
            if !self.wire_claimed.swap(true, Ordering::AcqRel) {
                self.set_transmit_pin(true);
                self.half_duplex.begin_transmit::<_, P::Irq>(&self.uart);
            }
        });
    }

    /// Undo [`claim_wire`](Self::claim_wire) once the shifter is empty.
    fn release_wire(&self) {
        P::Irq::critical(|| {
            if self.wire_claimed.swap(false, Ordering::AcqRel) {
                self.set_transmit_pin(false);
                self.half_duplex.end_transmit::<_, P::Irq>(&self.uart);
            }
        });
    }

    fn set_transmit_pin(&self, asserted: bool) {
        if let Some(pin) = self.transmit_pin.get() {
            let _ = self.gpio.with(|gpio| gpio.set_level(pin, asserted.into()));
        }
    }
}
