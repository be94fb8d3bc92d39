//! NXP Kinetis (Teensy 3.x and Teensy LC) platform.

pub mod gpio;
mod mmio;
pub mod nvic;
pub mod uart0;

pub use gpio::KinetisGpio;
pub use nvic::{Nvic, set_yield_hook};
pub use uart0::Uart0;

use super::Platform;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "arm")] {
        type Irq = common::arch::arm::irq::CortexMIrq;
    } else {
        type Irq = common::sync::NoopIrq;
    }
}

/// Board pin carrying UART0 TX.
const UART0_TX_PIN: u8 = 1;

pub struct KinetisPlatform;

impl Platform for KinetisPlatform {
    type Uart = Uart0;
    type Gpio = KinetisGpio;
    type Context = Nvic;
    type Irq = Irq;

    fn name() -> &'static str {
        if cfg!(feature = "kinetisl") {
            "Kinetis KL (Teensy LC)"
        } else {
            "Kinetis K (Teensy 3.x)"
        }
    }

    fn tx_pin() -> u8 {
        UART0_TX_PIN
    }

    unsafe fn uart() -> Uart0 {
        unsafe { Uart0::new(uart0::DEFAULT_CLOCK_HZ, Nvic::new()) }
    }

    unsafe fn gpio() -> KinetisGpio {
        unsafe { KinetisGpio::new() }
    }

    fn context() -> Nvic {
        // SAFETY: the serial channel only runs in privileged mode
        unsafe { Nvic::new() }
    }
}
