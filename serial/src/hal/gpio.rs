//! GPIO (General Purpose Input/Output) Hardware Abstraction Layer.
//!
//! The serial channel only needs plain outputs (RTS, driver enable) and
//! a pull-up on the transmit pin in half-duplex mode.

use core::sync::atomic::{AtomicU16, Ordering};

/// Pin logic level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PinLevel {
    /// Logic low (0V or ground).
    Low,
    /// Logic high (VDD).
    High,
}

impl From<bool> for PinLevel {
    fn from(value: bool) -> Self {
        if value {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

impl From<PinLevel> for bool {
    fn from(level: PinLevel) -> bool {
        matches!(level, PinLevel::High)
    }
}

/// Internal pull resistor configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PullMode {
    /// No pull resistor (high impedance).
    None,
    /// Enable internal pull-up resistor.
    Up,
    /// Enable internal pull-down resistor.
    Down,
}

/// GPIO errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GpioError {
    /// The pin number does not exist on this board.
    InvalidPin,
}

/// GPIO controller trait.
///
/// # Type Parameters
///
/// - `Pin`: Platform-specific pin identifier (typically `u8`)
/// - `Error`: Error type for operations that can fail
pub trait GpioController {
    /// Platform-specific pin identifier.
    type Pin: Copy + Clone;

    /// Error type for GPIO operations.
    type Error: core::fmt::Debug;

    /// Configure a pin as a push-pull output.
    fn set_output(&mut self, pin: Self::Pin) -> Result<(), Self::Error>;

    /// Configure the internal pull resistor for a pin.
    fn set_pull(&mut self, pin: Self::Pin, pull: PullMode) -> Result<(), Self::Error>;

    /// Set a pin to logic high.
    fn set_high(&mut self, pin: Self::Pin) -> Result<(), Self::Error>;

    /// Set a pin to logic low.
    fn set_low(&mut self, pin: Self::Pin) -> Result<(), Self::Error>;

    /// Set the pin to a specific level.
    fn set_level(&mut self, pin: Self::Pin, level: PinLevel) -> Result<(), Self::Error> {
        match level {
            PinLevel::High => self.set_high(pin),
            PinLevel::Low => self.set_low(pin),
        }
    }
}

/// An optional pin number readable from interrupt context without locking.
#[derive(Debug)]
pub struct OptionalPin(AtomicU16);

impl OptionalPin {
    const NONE: u16 = u16::MAX;

    pub const fn none() -> Self {
        Self(AtomicU16::new(Self::NONE))
    }

    pub fn get(&self) -> Option<u8> {
        match self.0.load(Ordering::Acquire) {
            Self::NONE => None,
            pin => Some(pin as u8),
        }
    }

    pub fn set(&self, pin: Option<u8>) {
        self.0
            .store(pin.map_or(Self::NONE, u16::from), Ordering::Release);
    }
}

impl Default for OptionalPin {
    fn default() -> Self {
        Self::none()
    }
}
