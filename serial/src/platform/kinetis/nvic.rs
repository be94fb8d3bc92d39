//! Cortex-M NVIC: line masking, priorities and the execution-priority query.

use spin::Once;

use super::mmio::Reg32;
use crate::hal::interrupt::{
    ExecutionContext, InterruptController, IrqNumber, Preemption, Priority,
    PriorityInterruptController,
};

const NVIC_ISER: usize = 0xE000_E100;
const NVIC_ICER: usize = 0xE000_E180;
const NVIC_IPR: usize = 0xE000_E400;
/// SHPR1, covering exceptions 4 to 7. SHPR2 and SHPR3 follow.
#[cfg(any(target_arch = "arm", test))]
const SCB_SHPR: usize = 0xE000_ED18;

/// Priority of the UART0 status interrupt. 0 is most urgent, 255 least.
pub const UART0_IRQ_PRIORITY: Priority = 64;

/// Execution priority reported in thread mode, below every exception.
const THREAD_PRIORITY: u32 = 256;

cfg_if::cfg_if! {
    if #[cfg(feature = "kinetisl")] {
        pub const IRQ_UART0_STATUS: IrqNumber = 12;
    } else {
        pub const IRQ_UART0_STATUS: IrqNumber = 45;
    }
}

static YIELD_HOOK: Once<fn()> = Once::new();

/// Install the cooperative scheduler's yield function. Only the first
/// call has an effect.
pub fn set_yield_hook(hook: fn()) {
    YIELD_HOOK.call_once(|| hook);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NvicError {
    InvalidIrq,
}

const MAX_IRQ: IrqNumber = 239;

fn check_irq(irq: IrqNumber) -> Result<(), NvicError> {
    if irq <= MAX_IRQ {
        Ok(())
    } else {
        Err(NvicError::InvalidIrq)
    }
}

fn bank(base: usize, irq: IrqNumber) -> (Reg32, u32) {
    let reg = unsafe { Reg32::at(base + 4 * (irq as usize / 32)) };
    (reg, 1 << (irq % 32))
}

fn priority_lane(irq: IrqNumber) -> (Reg32, u32) {
    // Word access only: Cortex-M0+ has no byte access to IPR
    let reg = unsafe { Reg32::at(NVIC_IPR + 4 * (irq as usize / 4)) };
    (reg, (irq % 4) * 8)
}

/// Register address and bit offset of a configurable system exception's
/// priority. Reset, NMI and HardFault (1 to 3) have fixed priorities.
#[cfg(any(target_arch = "arm", test))]
fn system_priority_lane(exception: u32) -> Option<(usize, u32)> {
    match exception {
        4..=15 => Some((SCB_SHPR + 4 * (exception as usize / 4 - 1), (exception % 4) * 8)),
        _ => None,
    }
}

#[cfg(target_arch = "arm")]
fn system_priority(exception: u32) -> u32 {
    match system_priority_lane(exception) {
        Some((addr, shift)) => (unsafe { Reg32::at(addr) }.read() >> shift) & 0xFF,
        None => 0,
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Nvic;

impl Nvic {
    /// # Safety
    ///
    /// The System Control Space must be accessible (privileged mode).
    pub const unsafe fn new() -> Self {
        Self
    }

    /// The NVIC execution priority of the running code: 0 while PRIMASK is
    /// set, 256 in thread mode, otherwise the active exception's priority
    /// lowered to BASEPRI when that is more urgent.
    #[cfg(target_arch = "arm")]
    pub fn execution_priority(&self) -> u32 {
        use common::arch::arm::irq::{ipsr, primask};

        #[cfg(feature = "kinetisk")]
        let faulted = special::faultmask() & 1 != 0;
        #[cfg(not(feature = "kinetisk"))]
        let faulted = false;
        if primask() & 1 != 0 || faulted {
            return 0;
        }

        let priority = match ipsr() & 0x1FF {
            0 => THREAD_PRIORITY,
            exception @ 1..=15 => system_priority(exception),
            exception => self.get_priority(exception - 16).map_or(0, u32::from),
        };

        #[cfg(feature = "kinetisk")]
        let priority = match special::basepri() & 0xFF {
            0 => priority,
            basepri => priority.min(basepri),
        };
        priority
    }

    #[cfg(not(target_arch = "arm"))]
    pub fn execution_priority(&self) -> u32 {
        THREAD_PRIORITY
    }
}

#[cfg(all(target_arch = "arm", feature = "kinetisk"))]
mod special {
    // ARMv7-M only; the Cortex-M0+ parts have neither register

    #[inline(always)]
    pub fn faultmask() -> u32 {
        let value: u32;
        unsafe {
            core::arch::asm!("mrs {0}, faultmask", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }

    #[inline(always)]
    pub fn basepri() -> u32 {
        let value: u32;
        unsafe {
            core::arch::asm!("mrs {0}, basepri", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }
}

impl InterruptController for Nvic {
    type Error = NvicError;

    fn enable(&mut self, irq: IrqNumber) -> Result<(), Self::Error> {
        check_irq(irq)?;
        let (reg, bit) = bank(NVIC_ISER, irq);
        reg.write(bit);
        Ok(())
    }

    fn disable(&mut self, irq: IrqNumber) -> Result<(), Self::Error> {
        check_irq(irq)?;
        let (reg, bit) = bank(NVIC_ICER, irq);
        reg.write(bit);
        Ok(())
    }
}

impl PriorityInterruptController for Nvic {
    fn set_priority(&mut self, irq: IrqNumber, priority: Priority) -> Result<(), Self::Error> {
        check_irq(irq)?;
        let (reg, shift) = priority_lane(irq);
        reg.modify(|value| (value & !(0xFF << shift)) | (u32::from(priority) << shift));
        Ok(())
    }

    fn get_priority(&self, irq: IrqNumber) -> Result<Priority, Self::Error> {
        check_irq(irq)?;
        let (reg, shift) = priority_lane(irq);
        Ok((reg.read() >> shift) as Priority)
    }
}

impl ExecutionContext for Nvic {
    fn preemption(&self) -> Preemption {
        classify(self.execution_priority(), UART0_IRQ_PRIORITY)
    }

    fn yield_now(&self) {
        match YIELD_HOOK.get() {
            Some(hook) => hook(),
            None => core::hint::spin_loop(),
        }
    }
}

/// Map an execution priority onto what a waiting serial call may do.
fn classify(execution_priority: u32, irq_priority: Priority) -> Preemption {
    if execution_priority <= u32::from(irq_priority) {
        Preemption::Masked
    } else if execution_priority >= THREAD_PRIORITY {
        Preemption::Cooperative
    } else {
        Preemption::Preemptible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(0, 64), Preemption::Masked);
        assert_eq!(classify(64, 64), Preemption::Masked);
        assert_eq!(classify(128, 64), Preemption::Preemptible);
        assert_eq!(classify(256, 64), Preemption::Cooperative);
    }

    #[test]
    fn test_system_exception_priority_lanes() {
        assert_eq!(system_priority_lane(2), None);
        assert_eq!(system_priority_lane(3), None);
        assert_eq!(system_priority_lane(4), Some((0xE000_ED18, 0)));
        // SVCall, PendSV and SysTick
        assert_eq!(system_priority_lane(11), Some((0xE000_ED1C, 24)));
        assert_eq!(system_priority_lane(14), Some((0xE000_ED20, 16)));
        assert_eq!(system_priority_lane(15), Some((0xE000_ED20, 24)));
        assert_eq!(system_priority_lane(16), None);
    }

    #[test]
    fn test_low_priority_pendsv_lets_uart_preempt() {
        assert_eq!(classify(0xC0, UART0_IRQ_PRIORITY), Preemption::Preemptible);
    }

    #[test]
    fn test_host_runs_in_thread_mode() {
        let nvic = unsafe { Nvic::new() };
        assert_eq!(nvic.preemption(), Preemption::Cooperative);
    }

    #[test]
    fn test_irq_range_checked() {
        let mut nvic = unsafe { Nvic::new() };
        assert_eq!(nvic.enable(240), Err(NvicError::InvalidIrq));
        assert_eq!(nvic.get_priority(240), Err(NvicError::InvalidIrq));
    }
}
