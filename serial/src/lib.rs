//! Interrupt-driven buffered serial driver
//!
//! This crate moves bytes (or 9-bit units) between application code and a
//! UART through a pair of ring buffers serviced by the peripheral's status
//! interrupt.
//!
//! # Module Organization
//!
//! - [`hal`]: Platform-independent trait definitions
//! - [`platform`]: Platform-specific drivers (SoC level)
//! - [`ring`]: Lock-free single-producer/single-consumer ring buffer
//! - [`flow`]: RTS flow control from receive-ring occupancy
//! - [`half_duplex`]: Single-wire direction switching
//! - [`channel`]: The buffered channel and its interrupt state machine
//! - [`uart`]: The board's global Serial1 instance
//!
//! # Design Principles
//!
//! 1. **Separation of Concerns**: Platform code is separate from the buffering engine
//! 2. **Zero-Cost Abstractions**: HAL traits compile to direct register access
//! 3. **Never block in the handler**: the interrupt path only drops or defers
//!
//! # Usage Example
//!
//! ```no_run
//! use serial::hal::serial::SerialConfig;
//!
//! let serial1 = serial::uart::init_serial1(SerialConfig::new_8n1(115_200))?;
//! serial1.print("Hello, world!\n");
//! serial1.flush();
//! # Ok::<(), serial::hal::serial::SerialError>(())
//! ```

#![no_std]

#[cfg(test)]
extern crate std;

pub mod channel;
pub mod flow;
pub mod hal;
pub mod half_duplex;
pub mod platform;
pub mod ring;
pub mod uart;

#[cfg(test)]
mod mock;

// Re-export commonly used types
pub use channel::Channel;
pub use hal::gpio::{GpioController, PinLevel};
pub use hal::interrupt::{ExecutionContext, Preemption};
pub use hal::serial::{SerialConfig, SerialFormat, SerialPeripheral};
pub use ring::{RingBuffer, Slot};
