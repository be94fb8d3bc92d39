//! RTS flow control driven by receive-ring occupancy.
//!
//! RTS is active low: driving it low tells the sender it may transmit,
//! driving it high asks it to pause. The two decisions are taken at
//! different places. The receive interrupt only ever pauses (occupancy at
//! or above the high watermark) and the consumer only ever resumes
//! (occupancy at or below the low watermark), so the line cannot chatter
//! between the two.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use common::sync::{IrqControl, IrqSpinLock};

use crate::hal::gpio::{GpioController, OptionalPin};

/// Distance below the owned receive capacity at which the sender is paused.
pub const HIGH_WATERMARK_MARGIN: usize = 24;
/// Distance below the owned receive capacity at which the sender resumes.
pub const LOW_WATERMARK_MARGIN: usize = 38;

/// RTS state for one receive ring.
///
/// With the default margins a 64-slot ring pauses at 40 and resumes at 26.
/// Rings smaller than the margins get a resume watermark of 0 and a pause
/// watermark of at least 1: the sender is paused once any unit is waiting
/// and resumed only when the ring is empty. RTS on such a ring works as a
/// stop-and-wait handshake.
pub struct FlowController {
    low: AtomicUsize,
    high: AtomicUsize,
    base_low: usize,
    base_high: usize,
    rts: OptionalPin,
    /// RTS is high.
    paused: AtomicBool,
}

impl FlowController {
    /// Watermarks for a receive ring owning `rx_capacity` slots.
    pub const fn new(rx_capacity: usize) -> Self {
        let base_low = rx_capacity.saturating_sub(LOW_WATERMARK_MARGIN);
        let base_high = match rx_capacity.saturating_sub(HIGH_WATERMARK_MARGIN) {
            0 => 1,
            high => high,
        };
        Self {
            low: AtomicUsize::new(base_low),
            high: AtomicUsize::new(base_high),
            base_low,
            base_high,
            rts: OptionalPin::none(),
            paused: AtomicBool::new(false),
        }
    }

    pub fn low_watermark(&self) -> usize {
        self.low.load(Ordering::Relaxed)
    }

    pub fn high_watermark(&self) -> usize {
        self.high.load(Ordering::Relaxed)
    }

    /// Shift both watermarks by the length of a receive extension.
    pub fn set_extension(&self, len: usize) {
        self.low.store(self.base_low + len, Ordering::Relaxed);
        self.high.store(self.base_high + len, Ordering::Relaxed);
    }

    pub fn set_rts_pin(&self, pin: Option<u8>) {
        self.rts.set(pin);
    }

    pub fn is_enabled(&self) -> bool {
        self.rts.get().is_some()
    }

    /// Let the sender transmit.
    pub fn assert<G, I>(&self, gpio: &IrqSpinLock<G, I>)
    where
        G: GpioController<Pin = u8>,
        I: IrqControl,
    {
        self.drive(gpio, false, |_| true);
    }

    /// Ask the sender to pause.
    pub fn deassert<G, I>(&self, gpio: &IrqSpinLock<G, I>)
    where
        G: GpioController<Pin = u8>,
        I: IrqControl,
    {
        self.drive(gpio, true, |_| true);
    }

    /// Called from the receive interrupt after draining the hardware.
    pub fn on_received<G, I>(&self, occupied: usize, gpio: &IrqSpinLock<G, I>)
    where
        G: GpioController<Pin = u8>,
        I: IrqControl,
    {
        if occupied >= self.high_watermark() {
            self.drive(gpio, true, |paused| !paused);
        }
    }

    /// Called by the consumer after taking a unit.
    pub fn on_consumed<G, I>(&self, occupied: usize, gpio: &IrqSpinLock<G, I>)
    where
        G: GpioController<Pin = u8>,
        I: IrqControl,
    {
        if occupied <= self.low_watermark() {
            self.drive(gpio, false, |paused| paused);
        }
    }

    /// Drive RTS to `pause` when `needed(current)` holds. The check and the
    /// pin write happen under the GPIO lock so the interrupt and the
    /// consumer cannot interleave them.
    fn drive<G, I>(&self, gpio: &IrqSpinLock<G, I>, pause: bool, needed: impl FnOnce(bool) -> bool)
    where
        G: GpioController<Pin = u8>,
        I: IrqControl,
    {
        let Some(pin) = self.rts.get() else {
            return;
        };
        gpio.with(|gpio| {
            if needed(self.paused.load(Ordering::Relaxed)) {
                self.paused.store(pause, Ordering::Relaxed);
                let _ = gpio.set_level(pin, pause.into());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_watermarks() {
        let flow = FlowController::new(64);
        assert_eq!(flow.low_watermark(), 26);
        assert_eq!(flow.high_watermark(), 40);
        assert!(!flow.is_enabled());
    }

    #[test]
    fn test_extension_shifts_both_watermarks() {
        let flow = FlowController::new(64);
        flow.set_extension(100);
        assert_eq!(flow.low_watermark(), 126);
        assert_eq!(flow.high_watermark(), 140);
        flow.set_extension(0);
        assert_eq!(flow.low_watermark(), 26);
        assert_eq!(flow.high_watermark(), 40);
    }

    #[test]
    fn test_small_ring_keeps_a_usable_pause_watermark() {
        let flow = FlowController::new(16);
        assert_eq!(flow.low_watermark(), 0);
        assert_eq!(flow.high_watermark(), 1);

        let flow = FlowController::new(30);
        assert_eq!(flow.low_watermark(), 0);
        assert_eq!(flow.high_watermark(), 6);
    }
}
