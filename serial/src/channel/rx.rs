use super::Channel;
use crate::hal::serial::SerialPeripheral;
use crate::platform::Platform;
use crate::ring::Slot;

use common::sync::IrqControl;

impl<P: Platform, T: Slot, const TX: usize, const RX: usize> Channel<'_, P, T, TX, RX> {
    /// Units waiting in the receive ring.
    pub fn available(&self) -> usize {
        self.rx.occupied()
    }

    /// Take the oldest received unit without blocking. Resumes the sender
    /// once the ring has drained to the low watermark.
    pub fn getchar(&self) -> Option<T> {
        let unit = self.rx.pop()?;
        self.flow.on_consumed(self.rx.occupied(), &self.gpio);
        Some(unit)
    }

    pub fn peek(&self) -> Option<T> {
        self.rx.peek()
    }

    /// Take up to `buf.len()` units without blocking.
    pub fn read(&self, buf: &mut [T]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.getchar() {
                Some(unit) => *slot = unit,
                None => break,
            }
            count += 1;
        }
        count
    }

    /// Drop everything received so far, including what still sits in the
    /// hardware receive FIFO, and let the sender resume.
    pub fn clear(&self) {
        if self.uart.has_fifo() && self.uart.is_enabled() {
            P::Irq::critical(|| {
                self.uart.set_receiver_enabled(false);
                self.uart.flush_rx_fifo();
                self.uart.set_receiver_enabled(true);
            });
        }
        self.rx.clear();
        self.flow.assert(&self.gpio);
    }
}
