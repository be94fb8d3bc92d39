use core::fmt::Debug;

/// Architecture-specific interrupt masking interface.
///
/// Implemented by the architecture layer.
pub trait IrqControl {
    /// Saved interrupt state
    type State: Copy + Debug;

    /// Disable interrupts and return the previous state.
    fn disable() -> Self::State;

    /// Restore interrupts to a previous state.
    fn restore(state: Self::State);

    /// Run `f` with interrupts disabled, restoring the previous state afterwards.
    #[inline]
    fn critical<R>(f: impl FnOnce() -> R) -> R {
        let state = Self::disable();
        let result = f();
        Self::restore(state);
        result
    }
}

/// Interrupt control for hosts without a maskable interrupt line.
///
/// Masking is a no-op, so mutual exclusion comes only from the lock itself.
#[derive(Debug, Copy, Clone)]
pub struct NoopIrq;

impl IrqControl for NoopIrq {
    type State = ();

    #[inline(always)]
    fn disable() {}

    #[inline(always)]
    fn restore(_state: ()) {}
}
