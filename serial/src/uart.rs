use spin::Once;

use crate::channel::Channel;
use crate::hal::serial::{SerialConfig, SerialError};
use crate::platform::{CurrentPlatform, Platform};

/// The board's first serial port, on UART0.
pub type Serial1 = Channel<'static, CurrentPlatform>;

static SERIAL1: Once<Serial1> = Once::new();

/// The global Serial1 channel, created on first use.
pub fn serial1() -> &'static Serial1 {
    SERIAL1.call_once(|| {
        // SAFETY: this is the only place UART0 and its pins are claimed
        let (uart, gpio) = unsafe { (CurrentPlatform::uart(), CurrentPlatform::gpio()) };
        Channel::new(uart, gpio, CurrentPlatform::context())
    })
}

/// Start Serial1 with the given configuration.
///
/// Calling it again reconfigures the running port.
pub fn init_serial1(config: SerialConfig) -> Result<&'static Serial1, SerialError> {
    let serial = serial1();
    serial.begin_with(config)?;
    Ok(serial)
}

/// UART0 status interrupt, referenced by name from the vector table.
#[unsafe(no_mangle)]
pub extern "C" fn uart0_status_isr() {
    if let Some(serial) = SERIAL1.get() {
        serial.on_interrupt();
    }
}

/// Write a string to Serial1, expanding `\n` to `\r\n`.
pub fn print(s: &str) {
    serial1().print(s);
}

/// Write a formatted string to Serial1
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::uart::serial1().writer(), $($arg)*);
    }};
}

/// Write a formatted string with newline to Serial1
#[macro_export]
macro_rules! serial_println {
    () => { $crate::serial_print!("\n") };
    ($($arg:tt)*) => {{
        $crate::serial_print!($($arg)*);
        $crate::serial_print!("\n");
    }};
}
