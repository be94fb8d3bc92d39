//! Shared low-level primitives: interrupt masking and IRQ-safe locking.

#![no_std]

pub mod arch;
pub mod sync;
