//! Platform Abstraction Layer
//!
//! Each supported chip family bundles the pieces a serial channel needs:
//! the peripheral, a GPIO controller for the optional flow-control and
//! driver-enable pins, the execution-context query and the interrupt mask.
//!
//! # Usage
//!
//! ```no_run
//! use serial::channel::Channel;
//! use serial::platform::{CurrentPlatform, Platform};
//!
//! let uart = unsafe { CurrentPlatform::uart() };
//! let gpio = unsafe { CurrentPlatform::gpio() };
//! let channel: Channel<'static, CurrentPlatform> =
//!     Channel::new(uart, gpio, CurrentPlatform::context());
//! ```

use common::sync::IrqControl;

use crate::hal::gpio::GpioController;
use crate::hal::interrupt::ExecutionContext;
use crate::hal::serial::SerialPeripheral;

/// Platform trait - implemented by each supported platform
pub trait Platform {
    type Uart: SerialPeripheral + Send + Sync;
    type Gpio: GpioController<Pin = u8> + Send;
    type Context: ExecutionContext + Send + Sync;
    type Irq: IrqControl;

    /// Platform name for debugging
    fn name() -> &'static str;

    /// Board pin carrying the peripheral's transmit signal.
    fn tx_pin() -> u8;

    /// The serial peripheral.
    ///
    /// # Safety
    /// Only one instance may exist per hardware peripheral.
    unsafe fn uart() -> Self::Uart;

    /// The GPIO controller.
    ///
    /// # Safety
    /// Pins handed to the serial channel must not be driven elsewhere.
    unsafe fn gpio() -> Self::Gpio;

    fn context() -> Self::Context;
}

// Platform selection based on Cargo features
cfg_if::cfg_if! {
    if #[cfg(any(feature = "kinetisk", feature = "kinetisl"))] {
        pub mod kinetis;
        pub use kinetis::KinetisPlatform as CurrentPlatform;
    } else {
        compile_error!(
            "No platform selected!\n\
            Use: cargo build --features kinetisk\n\
            Or:  cargo build --features kinetisl"
        );
    }
}

// Ensure only one platform is selected
#[cfg(all(feature = "kinetisk", feature = "kinetisl"))]
compile_error!("Multiple platforms selected! Choose only one: kinetisk OR kinetisl");
