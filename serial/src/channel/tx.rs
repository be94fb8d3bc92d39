use core::fmt;
use core::sync::atomic::Ordering;

use super::Channel;
use crate::hal::interrupt::{ExecutionContext, Preemption};
use crate::hal::serial::{SerialPeripheral, Status, TxInterrupts};
use crate::platform::Platform;
use crate::ring::Slot;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

impl<'a, P: Platform, T: Slot, const TX: usize, const RX: usize> Channel<'a, P, T, TX, RX> {
    pub fn putchar(&self, byte: u8) {
        self.write(&[byte]);
    }

    /// Queue `bytes` for transmission. Blocks while the transmit ring is
    /// full; there is no timeout.
    pub fn write(&self, bytes: &[u8]) {
        self.enqueue(bytes.iter().map(|&byte| T::from_word(byte.into())));
    }

    /// Queue one unit, including its 9th bit in 9-bit mode.
    pub fn write_slot(&self, unit: T) {
        self.write_slots(&[unit]);
    }

    pub fn write_slots(&self, units: &[T]) {
        self.enqueue(units.iter().copied());
    }

    /// Wait until the last queued unit has left the shifter.
    pub fn flush(&self) {
        if !self.uart.is_enabled() {
            return;
        }
        self.wait_transmit_idle();
    }

    /// Units that can be queued without blocking.
    pub fn write_buffer_free(&self) -> usize {
        self.tx.free()
    }

    /// Write `text`, expanding `\n` to `\r\n`.
    pub fn print(&self, text: &str) {
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                self.write(b"\r\n");
            }
            self.write(line.as_bytes());
        }
    }

    /// Two upper-case hex digits.
    pub fn phex(&self, value: u8) {
        self.write(&[
            HEX_DIGITS[usize::from(value >> 4)],
            HEX_DIGITS[usize::from(value & 0x0F)],
        ]);
    }

    pub fn phex16(&self, value: u16) {
        self.phex((value >> 8) as u8);
        self.phex(value as u8);
    }

    pub fn phex32(&self, value: u32) {
        for byte in value.to_be_bytes() {
            self.phex(byte);
        }
    }

    /// A `core::fmt::Write` adapter over this channel.
    pub fn writer(&self) -> Writer<'_, 'a, P, T, TX, RX> {
        Writer { channel: self }
    }

    fn enqueue(&self, units: impl Iterator<Item = T>) {
        if !self.uart.is_enabled() {
            return;
        }
        let mut units = units.peekable();
        if units.peek().is_none() {
            return;
        }

        // Turn the wire around early. If the previous burst completes
        // before the first push, the handler claims it again.
        self.claim_wire();

        for unit in units {
            if self.tx.is_full() {
                // Let the handler drain while we wait
                self.uart.set_tx_interrupts(TxInterrupts::Active);
                while self.tx.is_full() {
                    self.make_room();
                }
            }
            self.transmitting.store(true, Ordering::Release);
            // Only this side produces, so the slot freed above stays free
            let _ = self.tx.push(unit);
        }
        self.uart.set_tx_interrupts(TxInterrupts::Active);
    }

    /// One round of waiting for transmit ring space.
    fn make_room(&self) {
        match self.context.preemption() {
            // The handler cannot run before we return: do its work
            Preemption::Masked => {
                if self.uart.status().contains(Status::TX_READY) {
                    if let Some(unit) = self.tx.pop() {
                        self.send_unit(unit);
                    }
                }
            }
            _ => self.context.relax(),
        }
    }
}

/// Formatted output to a [`Channel`].
pub struct Writer<'c, 'a, P: Platform, T: Slot, const TX: usize, const RX: usize> {
    channel: &'c Channel<'a, P, T, TX, RX>,
}

impl<P: Platform, T: Slot, const TX: usize, const RX: usize> fmt::Write
    for Writer<'_, '_, P, T, TX, RX>
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.channel.print(s);
        Ok(())
    }
}
