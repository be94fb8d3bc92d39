//! Kinetis PORT/GPIO driver for board digital pins.

use super::mmio::Reg32;
use crate::hal::gpio::{GpioController, GpioError, PullMode};

const PORT_BASE: usize = 0x4004_9000;
const PORT_STRIDE: usize = 0x1000;
const GPIO_BASE: usize = 0x400F_F000;
const GPIO_STRIDE: usize = 0x40;

// GPIO register offsets
const PSOR: usize = 0x04;
const PCOR: usize = 0x08;
const PDDR: usize = 0x14;

// Pin Control Register bits
pub const PCR_PS: u32 = 1 << 0;
pub const PCR_PE: u32 = 1 << 1;
pub const PCR_SRE: u32 = 1 << 2;
pub const PCR_DSE: u32 = 1 << 6;

pub const fn pcr_mux(alt: u32) -> u32 {
    (alt & 0b111) << 8
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Port {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
}

use Port::{A, B, C, D, E};

cfg_if::cfg_if! {
    if #[cfg(feature = "kinetisl")] {
        /// Board pin number to (port, bit).
        const PIN_MAP: &[(Port, u8)] = &[
            (B, 16), (B, 17), (D, 0), (A, 1), (A, 2), (D, 7), (D, 4), (D, 2),
            (D, 3), (C, 3), (C, 4), (C, 6), (C, 7), (C, 5), (D, 1), (C, 0),
            (B, 0), (B, 1), (B, 3), (B, 2), (D, 5), (D, 6), (C, 1), (C, 2),
            (E, 20), (E, 21), (E, 30),
        ];
    } else {
        /// Board pin number to (port, bit).
        const PIN_MAP: &[(Port, u8)] = &[
            (B, 16), (B, 17), (D, 0), (A, 12), (A, 13), (D, 7), (D, 4), (D, 2),
            (D, 3), (C, 3), (C, 4), (C, 6), (C, 7), (C, 5), (D, 1), (C, 0),
            (B, 0), (B, 1), (B, 3), (B, 2), (D, 5), (D, 6), (C, 1), (C, 2),
            (A, 5), (B, 19), (E, 1), (C, 9), (C, 8), (C, 10), (C, 11), (E, 0),
            (B, 18), (A, 4),
        ];
    }
}

/// Port and bit of a board pin.
pub fn locate(pin: u8) -> Result<(Port, u8), GpioError> {
    PIN_MAP
        .get(pin as usize)
        .copied()
        .ok_or(GpioError::InvalidPin)
}

/// Pin Control Register of a board pin.
pub fn pcr(pin: u8) -> Result<Reg32, GpioError> {
    let (port, bit) = locate(pin)?;
    Ok(unsafe { Reg32::at(PORT_BASE + port as usize * PORT_STRIDE + 4 * bit as usize) })
}

fn gpio_reg(port: Port, offset: usize) -> Reg32 {
    unsafe { Reg32::at(GPIO_BASE + port as usize * GPIO_STRIDE + offset) }
}

#[derive(Debug)]
pub struct KinetisGpio;

impl KinetisGpio {
    /// # Safety
    ///
    /// PORT and GPIO clocks must be enabled.
    pub const unsafe fn new() -> Self {
        Self
    }
}

impl GpioController for KinetisGpio {
    type Pin = u8;
    type Error = GpioError;

    fn set_output(&mut self, pin: u8) -> Result<(), GpioError> {
        let (port, bit) = locate(pin)?;
        pcr(pin)?.write(PCR_SRE | PCR_DSE | pcr_mux(1));
        gpio_reg(port, PDDR).set_bits(1 << bit);
        Ok(())
    }

    fn set_pull(&mut self, pin: u8, pull: PullMode) -> Result<(), GpioError> {
        let reg = pcr(pin)?;
        reg.modify(|value| {
            let value = value & !(PCR_PE | PCR_PS);
            match pull {
                PullMode::None => value,
                PullMode::Up => value | PCR_PE | PCR_PS,
                PullMode::Down => value | PCR_PE,
            }
        });
        Ok(())
    }

    fn set_high(&mut self, pin: u8) -> Result<(), GpioError> {
        let (port, bit) = locate(pin)?;
        gpio_reg(port, PSOR).write(1 << bit);
        Ok(())
    }

    fn set_low(&mut self, pin: u8) -> Result<(), GpioError> {
        let (port, bit) = locate(pin)?;
        gpio_reg(port, PCOR).write(1 << bit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uart_pins_locate() {
        assert_eq!(locate(0), Ok((Port::B, 16)));
        assert_eq!(locate(1), Ok((Port::B, 17)));
        assert_eq!(locate(18), Ok((Port::B, 3)));
        assert_eq!(locate(20), Ok((Port::D, 5)));
    }

    #[test]
    fn test_unknown_pin() {
        assert_eq!(locate(200), Err(GpioError::InvalidPin));
        let mut gpio = unsafe { KinetisGpio::new() };
        assert_eq!(gpio.set_output(200), Err(GpioError::InvalidPin));
    }
}
