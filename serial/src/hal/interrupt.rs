//! Interrupt Controller Hardware Abstraction Layer.
//!
//! Besides masking and prioritising interrupt lines, the serial channel
//! needs one question answered while it waits for buffer space: can the
//! peripheral's handler run ahead of the current code right now?

/// Interrupt number type.
pub type IrqNumber = u32;

/// Interrupt priority level.
///
/// Lower values are more urgent, as on the NVIC.
pub type Priority = u8;

/// Interrupt controller trait.
pub trait InterruptController {
    /// Error type for interrupt controller operations.
    type Error: core::fmt::Debug;

    /// Enable (unmask) an interrupt line.
    fn enable(&mut self, irq: IrqNumber) -> Result<(), Self::Error>;

    /// Disable (mask) an interrupt line.
    fn disable(&mut self, irq: IrqNumber) -> Result<(), Self::Error>;
}

/// Extension trait for interrupt controllers with priority support.
pub trait PriorityInterruptController: InterruptController {
    /// Set the priority of an interrupt line.
    fn set_priority(&mut self, irq: IrqNumber, priority: Priority) -> Result<(), Self::Error>;

    /// Get the priority of an interrupt line.
    fn get_priority(&self, irq: IrqNumber) -> Result<Priority, Self::Error>;
}

/// How the calling code relates to the serial peripheral's interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Preemption {
    /// The handler cannot run until the caller returns: interrupts are
    /// masked, or the caller is an equal or more urgent handler. Waiting
    /// code has to service the peripheral itself.
    Masked,
    /// The caller is a less urgent handler; the serial interrupt will
    /// preempt it, so spinning is enough.
    Preemptible,
    /// Thread level under the cooperative scheduler. Waiting code should
    /// yield so other tasks run while the handler drains.
    Cooperative,
}

/// Execution-context queries used by blocking serial operations.
pub trait ExecutionContext {
    /// Classify the current context relative to the serial interrupt.
    fn preemption(&self) -> Preemption;

    /// Hand control to the cooperative dispatcher.
    fn yield_now(&self);

    /// Wait one round the way the current context allows.
    fn relax(&self) {
        match self.preemption() {
            Preemption::Cooperative => self.yield_now(),
            _ => core::hint::spin_loop(),
        }
    }
}
