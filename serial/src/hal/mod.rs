//! Hardware Abstraction Layer (HAL) - Platform-Independent Traits
//!
//! This module defines the traits the buffered serial channel is written
//! against. Platform code implements them; the channel never touches a
//! register address directly.
//!
//! # Design Principles
//!
//! - **Zero-cost abstractions**: Traits compile to direct hardware access
//! - **No platform leakage**: Traits must not reference platform-specific types
//!
//! # Available Interfaces
//!
//! - [`gpio`]: General Purpose Input/Output control
//! - [`serial`]: Serial peripheral capabilities and frame format
//! - [`interrupt`]: Interrupt controller and execution-context queries

pub mod gpio;
pub mod interrupt;
pub mod serial;
