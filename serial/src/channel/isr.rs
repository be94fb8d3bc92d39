use core::sync::atomic::Ordering;

use common::sync::IrqControl;

use super::Channel;
use crate::hal::serial::{SerialPeripheral, Status, TxInterrupts};
use crate::platform::Platform;
use crate::ring::Slot;

impl<P: Platform, T: Slot, const TX: usize, const RX: usize> Channel<'_, P, T, TX, RX> {
    /// Service the peripheral's status interrupt.
    ///
    /// Receive is handled first, then transmit-ready while the ring is
    /// being drained, then transmit-complete once it has emptied.
    pub fn on_interrupt(&self) {
        self.receive(self.uart.status());

        // Sampled once: a unit queued after this point is picked up on the
        // next interrupt rather than racing the mode switch below.
        let mode = self.uart.tx_interrupts();
        match mode {
            TxInterrupts::Active if self.uart.status().contains(Status::TX_READY) => {
                self.transmit()
            }
            TxInterrupts::Completing if self.uart.status().contains(Status::TX_COMPLETE) => {
                self.complete_transmit()
            }
            _ => {}
        }
    }

    fn receive(&self, status: Status) {
        let pending = if self.uart.has_fifo() {
            if !status.intersects(Status::RX_READY | Status::IDLE) {
                return;
            }
            P::Irq::critical(|| {
                let count = self.uart.rx_fifo_count();
                if count == 0 {
                    // IDLE only clears on a data read, and reading the empty
                    // FIFO underruns it. Flush to recover.
                    let _ = self.uart.read_data();
                    self.uart.flush_rx_fifo();
                }
                count
            })
        } else if status.contains(Status::RX_READY) {
            1
        } else {
            0
        };
        if pending == 0 {
            return;
        }

        for _ in 0..pending {
            let unit = self.read_unit();
            // Full ring: the newest unit is lost
            let _ = self.rx.push(unit);
        }
        self.flow.on_received(self.rx.occupied(), &self.gpio);
    }

    fn transmit(&self) {
        if !self.uart.has_fifo() {
            match self.tx.pop() {
                Some(unit) => self.send_unit(unit),
                None => self.uart.set_tx_interrupts(TxInterrupts::Completing),
            }
            return;
        }

        let depth = self.uart.tx_fifo_depth();
        while self.uart.tx_fifo_count() < depth {
            match self.tx.pop() {
                Some(unit) => self.send_unit(unit),
                None => break,
            }
        }
        if self.uart.status().contains(Status::TX_READY) {
            self.uart.set_tx_interrupts(TxInterrupts::Completing);
        }
    }

    fn complete_transmit(&self) {
        if !self.tx.is_empty() {
            // Queued after the ring drained: keep the burst going
            self.uart.set_tx_interrupts(TxInterrupts::Active);
            return;
        }
        self.transmitting.store(false, Ordering::Release);
        self.release_wire();
        self.uart.set_tx_interrupts(TxInterrupts::Inactive);
    }
}
