use crate::sync::irq::IrqControl;

const PRIMASK_PM_BIT: u32 = 1 << 0;

pub struct CortexMIrq;

/// Implementation of interrupt control for Cortex-M cores.
///
/// Masks configurable-priority exceptions through PRIMASK.
///
/// # State Management
/// The `State` type is `bool`, true when interrupts were enabled before
/// `disable()` ran.
///
/// # Assembly Details
///
/// - `mrs {0}, primask`: Move PRIMASK to a general purpose register
/// - `cpsid i`: Set PRIMASK, masking every configurable interrupt
/// - `cpsie i`: Clear PRIMASK
impl IrqControl for CortexMIrq {
    type State = bool;

    #[inline(always)]
    fn disable() -> bool {
        let primask: u32;
        unsafe {
            core::arch::asm!(
                "mrs {0}, primask",
                "cpsid i",
                out(reg) primask,
                options(nostack, preserves_flags)
            );
        }
        primask & PRIMASK_PM_BIT == 0
    }

    #[inline(always)]
    fn restore(prev_enabled: bool) {
        if prev_enabled {
            unsafe {
                core::arch::asm!("cpsie i", options(nostack, preserves_flags));
            }
        }
    }
}

/// Current PRIMASK value. Non-zero means configurable interrupts are masked.
#[inline(always)]
pub fn primask() -> u32 {
    let value: u32;
    unsafe {
        core::arch::asm!("mrs {0}, primask", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

/// Current IPSR value: the active exception number, 0 in thread mode.
#[inline(always)]
pub fn ipsr() -> u32 {
    let value: u32;
    unsafe {
        core::arch::asm!("mrs {0}, ipsr", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}
