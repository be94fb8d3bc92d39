//! Kinetis UART0 driver.
//!
//! On the K series UART0 has an 8-deep transmit and receive FIFO with
//! watermark interrupts. The KL parts have a single data register.

use bitflags::bitflags;

use super::gpio::{self, PCR_DSE, PCR_PE, PCR_PS, PCR_SRE, pcr_mux};
use super::mmio::{Reg8, Reg32};
use super::nvic::{IRQ_UART0_STATUS, Nvic, UART0_IRQ_PRIORITY};
use crate::hal::interrupt::{InterruptController, PriorityInterruptController};
use crate::hal::serial::{
    Direction, SerialError, SerialFormat, SerialPeripheral, Status, TxInterrupts,
};

const UART0_BASE: usize = 0x4006_A000;

// Register offsets
const BDH: usize = 0x00;
const BDL: usize = 0x01;
const C1: usize = 0x02;
const C2: usize = 0x03;
const S1: usize = 0x04;
const S2: usize = 0x05;
const C3: usize = 0x06;
const D: usize = 0x07;
const C4: usize = 0x0A;
#[cfg(feature = "kinetisk")]
const MODEM: usize = 0x0D;
#[cfg(feature = "kinetisk")]
const PFIFO: usize = 0x10;
#[cfg(feature = "kinetisk")]
const CFIFO: usize = 0x11;
#[cfg(feature = "kinetisk")]
const TWFIFO: usize = 0x13;
#[cfg(feature = "kinetisk")]
const TCFIFO: usize = 0x14;
#[cfg(feature = "kinetisk")]
const RWFIFO: usize = 0x15;
#[cfg(feature = "kinetisk")]
const RCFIFO: usize = 0x16;

const SIM_SCGC4: usize = 0x4004_8034;
const SIM_SCGC4_UART0: u32 = 1 << 10;

// C1
const C1_LOOPS: u8 = 0x80;
const C1_RSRC: u8 = 0x20;
const C1_M: u8 = 0x10;
#[cfg(feature = "kinetisk")]
const C1_ILT: u8 = 0x04;
const C1_PE: u8 = 0x02;
const C1_PT: u8 = 0x01;

// C3
const C3_R8: u8 = 0x80;
const C3_T8: u8 = 0x40;
const C3_TXDIR: u8 = 0x20;
const C3_TXINV: u8 = 0x10;

const S2_RXINV: u8 = 0x10;
const C4_M10: u8 = 0x20;
const BDH_SBNS: u8 = 0x20;

#[cfg(feature = "kinetisk")]
const PFIFO_TXFE: u8 = 0x80;
#[cfg(feature = "kinetisk")]
const PFIFO_RXFE: u8 = 0x08;
#[cfg(feature = "kinetisk")]
const CFIFO_RXFLUSH: u8 = 0x40;
#[cfg(feature = "kinetisk")]
const MODEM_TXCTSE: u8 = 0x01;

#[cfg(feature = "kinetisk")]
const FIFO_DEPTH: usize = 8;
#[cfg(feature = "kinetisl")]
const FIFO_DEPTH: usize = 1;
#[cfg(feature = "kinetisk")]
const TX_WATERMARK: u8 = 2;
#[cfg(feature = "kinetisk")]
const RX_WATERMARK: u8 = 4;

const RX_PIN: u8 = 0;
const TX_PIN: u8 = 1;

bitflags! {
    /// UART Control Register 2.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    struct Control2: u8 {
        const TIE = 0x80;
        const TCIE = 0x40;
        const RIE = 0x20;
        const ILIE = 0x10;
        const TE = 0x08;
        const RE = 0x04;
    }
}

bitflags! {
    /// UART Status Register 1.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    struct Status1: u8 {
        const TDRE = 0x80;
        const TC = 0x40;
        const RDRF = 0x20;
        const IDLE = 0x10;
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "kinetisk")] {
        const RECEIVER: Control2 = Control2::RE.union(Control2::RIE).union(Control2::ILIE);
    } else {
        const RECEIVER: Control2 = Control2::RE.union(Control2::RIE);
    }
}

const ENABLE: Control2 = Control2::TE.union(RECEIVER);

impl From<TxInterrupts> for Control2 {
    fn from(mode: TxInterrupts) -> Self {
        match mode {
            TxInterrupts::Inactive => ENABLE,
            TxInterrupts::Active => ENABLE.union(Control2::TIE),
            TxInterrupts::Completing => ENABLE.union(Control2::TCIE),
        }
    }
}

impl From<Status1> for Status {
    fn from(s1: Status1) -> Self {
        let mut status = Status::empty();
        status.set(Status::TX_READY, s1.contains(Status1::TDRE));
        status.set(Status::TX_COMPLETE, s1.contains(Status1::TC));
        status.set(Status::RX_READY, s1.contains(Status1::RDRF));
        status.set(Status::IDLE, s1.contains(Status1::IDLE));
        status
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "kinetisl")] {
        pub const DEFAULT_CLOCK_HZ: u32 = 48_000_000;
        const MIN_DIVISOR: u32 = 1;
        const MAX_DIVISOR: u32 = 0x1FFF;

        /// SBR for a x16 oversampled receiver.
        pub fn compute_divisor(clock_hz: u32, baud_rate: u32) -> Result<u32, SerialError> {
            if baud_rate == 0 {
                return Err(SerialError::InvalidConfig);
            }
            let divisor = (u64::from(clock_hz) + u64::from(baud_rate) * 8) / (u64::from(baud_rate) * 16);
            match u32::try_from(divisor) {
                Ok(divisor) if divisor <= MAX_DIVISOR => Ok(divisor.max(MIN_DIVISOR)),
                _ => Err(SerialError::InvalidConfig),
            }
        }
    } else {
        pub const DEFAULT_CLOCK_HZ: u32 = 72_000_000;
        const MIN_DIVISOR: u32 = 32;
        const MAX_DIVISOR: u32 = 0x3FFFF;

        /// SBR and the 5-bit fine adjust, in units of 1/32.
        pub fn compute_divisor(clock_hz: u32, baud_rate: u32) -> Result<u32, SerialError> {
            if baud_rate == 0 {
                return Err(SerialError::InvalidConfig);
            }
            let divisor = (u64::from(clock_hz) * 2 + u64::from(baud_rate / 2)) / u64::from(baud_rate);
            match u32::try_from(divisor) {
                Ok(divisor) if divisor <= MAX_DIVISOR => Ok(divisor.max(MIN_DIVISOR)),
                _ => Err(SerialError::InvalidConfig),
            }
        }
    }
}

/// Select one or two stop bits. A BDH change only takes effect on the
/// next BDL write, so the low divisor byte is written back unchanged.
fn set_stop_bits(bdh: Reg8, bdl: Reg8, two: bool) {
    let divisor_low = bdl.read();
    bdh.assign(BDH_SBNS, two);
    bdl.write(divisor_low);
}

#[derive(Debug)]
pub struct Uart0 {
    clock_hz: u32,
    nvic: Nvic,
}

impl Uart0 {
    /// # Safety
    ///
    /// Only one instance may drive UART0.
    pub const unsafe fn new(clock_hz: u32, nvic: Nvic) -> Self {
        Self { clock_hz, nvic }
    }

    #[inline]
    fn reg(&self, offset: usize) -> Reg8 {
        unsafe { Reg8::at(UART0_BASE + offset) }
    }

    fn control2(&self) -> Control2 {
        Control2::from_bits_retain(self.reg(C2).read())
    }

    fn status1(&self) -> Status1 {
        Status1::from_bits_retain(self.reg(S1).read())
    }

    fn clock_gate(&self) -> Reg32 {
        unsafe { Reg32::at(SIM_SCGC4) }
    }

    #[cfg(feature = "kinetisk")]
    fn write_divisor(&self, divisor: u32) {
        self.reg(BDH).write(((divisor >> 13) & 0x1F) as u8);
        self.reg(BDL).write(((divisor >> 5) & 0xFF) as u8);
        self.reg(C4).write((divisor & 0x1F) as u8);
    }

    #[cfg(feature = "kinetisl")]
    fn write_divisor(&self, divisor: u32) {
        self.reg(BDH).write(((divisor >> 8) & 0x1F) as u8);
        self.reg(BDL).write((divisor & 0xFF) as u8);
    }

    fn mux_pins(&self, alt: u32) {
        if let Ok(pcr) = gpio::pcr(RX_PIN) {
            pcr.write(PCR_PE | PCR_PS | pcr_mux(alt));
        }
        if let Ok(pcr) = gpio::pcr(TX_PIN) {
            pcr.write(PCR_DSE | PCR_SRE | pcr_mux(alt));
        }
    }
}

impl SerialPeripheral for Uart0 {
    fn tx_fifo_depth(&self) -> usize {
        FIFO_DEPTH
    }

    fn min_divisor(&self) -> u32 {
        MIN_DIVISOR
    }

    fn divisor(&self, baud_rate: u32) -> Result<u32, SerialError> {
        compute_divisor(self.clock_hz, baud_rate)
    }

    fn is_enabled(&self) -> bool {
        self.clock_gate().is_set(SIM_SCGC4_UART0)
    }

    fn power_up(&self, divisor: u32) {
        self.clock_gate().set_bits(SIM_SCGC4_UART0);
        self.mux_pins(3);
        self.write_divisor(divisor);

        #[cfg(feature = "kinetisk")]
        {
            self.reg(C1).write(C1_ILT);
            self.reg(TWFIFO).write(TX_WATERMARK);
            self.reg(RWFIFO).write(RX_WATERMARK);
            self.reg(PFIFO).write(PFIFO_TXFE | PFIFO_RXFE);
        }
        #[cfg(feature = "kinetisl")]
        self.reg(C1).write(0);

        self.reg(C2).write(ENABLE.bits());

        let mut nvic = self.nvic;
        if let Err(err) = nvic
            .set_priority(IRQ_UART0_STATUS, UART0_IRQ_PRIORITY)
            .and_then(|()| nvic.enable(IRQ_UART0_STATUS))
        {
            log::error!("uart0: cannot unmask irq {IRQ_UART0_STATUS}: {err:?}");
        }
    }

    fn shut_down(&self) {
        let mut nvic = self.nvic;
        let _ = nvic.disable(IRQ_UART0_STATUS);
        self.reg(C2).write(0);
        self.mux_pins(1);
        // Reading S1 then D clears pending status
        let _ = self.reg(S1).read();
        let _ = self.reg(D).read();
    }

    fn apply_format(&self, format: SerialFormat) {
        self.reg(C1).modify(|c1| {
            let mut c1 = c1 & !(C1_M | C1_PE | C1_PT);
            if format.contains(SerialFormat::NINE_BITS) {
                c1 |= C1_M;
            }
            if format.contains(SerialFormat::PARITY_ENABLE) {
                c1 |= C1_PE;
            }
            if format.contains(SerialFormat::PARITY_ODD) {
                c1 |= C1_PT;
            }
            c1
        });

        // 8N2: a 9-bit frame whose 9th bit is always 1
        if format.frame() == SerialFormat::FORMAT_8N2 {
            self.reg(C3).set_bits(C3_T8);
        }

        self.reg(S2)
            .assign(S2_RXINV, format.contains(SerialFormat::RX_INVERT));
        self.reg(C3)
            .assign(C3_TXINV, format.contains(SerialFormat::TX_INVERT));
        self.reg(C4)
            .assign(C4_M10, format.contains(SerialFormat::NINE_BIT_PARITY));
        set_stop_bits(
            self.reg(BDH),
            self.reg(BDL),
            format.contains(SerialFormat::TWO_STOP_BITS),
        );
    }

    fn set_single_wire(&self, enabled: bool) {
        self.reg(C1).assign(C1_LOOPS | C1_RSRC, enabled);
    }

    fn set_direction(&self, direction: Direction) {
        self.reg(C3)
            .assign(C3_TXDIR, direction == Direction::Transmit);
    }

    fn status(&self) -> Status {
        self.status1().into()
    }

    fn tx_interrupts(&self) -> TxInterrupts {
        let c2 = self.control2();
        if c2.contains(Control2::TIE) {
            TxInterrupts::Active
        } else if c2.contains(Control2::TCIE) {
            TxInterrupts::Completing
        } else {
            TxInterrupts::Inactive
        }
    }

    fn set_tx_interrupts(&self, mode: TxInterrupts) {
        self.reg(C2).write(Control2::from(mode).bits());
    }

    #[cfg(feature = "kinetisk")]
    fn rx_fifo_count(&self) -> usize {
        self.reg(RCFIFO).read() as usize
    }

    #[cfg(feature = "kinetisl")]
    fn rx_fifo_count(&self) -> usize {
        usize::from(self.status1().contains(Status1::RDRF))
    }

    #[cfg(feature = "kinetisk")]
    fn tx_fifo_count(&self) -> usize {
        self.reg(TCFIFO).read() as usize
    }

    #[cfg(feature = "kinetisl")]
    fn tx_fifo_count(&self) -> usize {
        usize::from(!self.status1().contains(Status1::TDRE))
    }

    fn ninth_bit_received(&self) -> bool {
        self.reg(C3).is_set(C3_R8)
    }

    fn read_data(&self) -> u8 {
        self.reg(D).read()
    }

    fn set_ninth_bit(&self, bit: bool) {
        self.reg(C3).assign(C3_T8, bit);
    }

    fn write_data(&self, byte: u8) {
        self.reg(D).write(byte);
    }

    fn flush_rx_fifo(&self) {
        #[cfg(feature = "kinetisk")]
        self.reg(CFIFO).write(CFIFO_RXFLUSH);
    }

    fn set_receiver_enabled(&self, enabled: bool) {
        let c2 = self.control2();
        let c2 = if enabled {
            c2.union(RECEIVER)
        } else {
            c2.difference(RECEIVER)
        };
        self.reg(C2).write(c2.bits());
    }

    #[cfg(feature = "kinetisk")]
    fn route_cts(&self, pin: u8) -> bool {
        match (pin, gpio::pcr(pin)) {
            (18 | 20, Ok(pcr)) => {
                // Weak pull keeps TX paused while CTS floats
                pcr.write(pcr_mux(3) | PCR_PE);
                self.reg(MODEM).write(MODEM_TXCTSE);
                true
            }
            _ => {
                self.reg(MODEM).clear_bits(MODEM_TXCTSE);
                false
            }
        }
    }

    // No hardware CTS on the single-register UART
    #[cfg(feature = "kinetisl")]
    fn route_cts(&self, _pin: u8) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "kinetisk")]
    #[test]
    fn test_divisor_at_115200() {
        assert_eq!(compute_divisor(DEFAULT_CLOCK_HZ, 115_200), Ok(1250));
        assert_eq!(compute_divisor(DEFAULT_CLOCK_HZ, 9_600), Ok(15_000));
    }

    #[cfg(feature = "kinetisk")]
    #[test]
    fn test_divisor_clamps_to_minimum() {
        assert_eq!(compute_divisor(DEFAULT_CLOCK_HZ, 12_000_000), Ok(MIN_DIVISOR));
    }

    #[cfg(feature = "kinetisl")]
    #[test]
    fn test_divisor_at_115200() {
        assert_eq!(compute_divisor(DEFAULT_CLOCK_HZ, 115_200), Ok(26));
    }

    #[test]
    fn test_divisor_rejects_zero_and_slow_rates() {
        assert_eq!(
            compute_divisor(DEFAULT_CLOCK_HZ, 0),
            Err(SerialError::InvalidConfig)
        );
        assert_eq!(
            compute_divisor(DEFAULT_CLOCK_HZ, 1),
            Err(SerialError::InvalidConfig)
        );
    }

    #[test]
    fn test_tx_modes_keep_receiver_on() {
        for mode in [
            TxInterrupts::Inactive,
            TxInterrupts::Active,
            TxInterrupts::Completing,
        ] {
            assert!(Control2::from(mode).contains(RECEIVER | Control2::TE));
        }
        assert!(Control2::from(TxInterrupts::Active).contains(Control2::TIE));
        assert!(!Control2::from(TxInterrupts::Completing).contains(Control2::TIE));
    }

    #[test]
    fn test_stop_bits_keep_divisor() {
        let mut regs = [0x1Au8, 0x5C];
        let (bdh, bdl) = unsafe {
            let base = regs.as_mut_ptr() as usize;
            (Reg8::at(base), Reg8::at(base + 1))
        };

        set_stop_bits(bdh, bdl, true);
        assert_eq!(regs, [0x1A | BDH_SBNS, 0x5C]);
        set_stop_bits(bdh, bdl, false);
        assert_eq!(regs, [0x1A, 0x5C]);
    }

    #[test]
    fn test_status_mapping() {
        let status = Status::from(Status1::TDRE | Status1::IDLE);
        assert_eq!(status, Status::TX_READY | Status::IDLE);
    }
}
