use core::{
    cell::UnsafeCell,
    marker::PhantomData,
    sync::atomic::{AtomicBool, Ordering},
};

use super::irq::IrqControl;

/// IRQ-safe spinlock.
///
/// - Disables interrupts on lock
/// - Spins until acquired
/// - Restores interrupt state on drop
///
/// On a single core the holder can never be preempted by an interrupt
/// handler that wants the same lock, so handlers may lock it too.
///
/// Not fair. Not reentrant.
pub struct IrqSpinLock<T, I: IrqControl> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
    _irq: PhantomData<I>,
}

unsafe impl<T: Send, I: IrqControl> Send for IrqSpinLock<T, I> {}
unsafe impl<T: Send, I: IrqControl> Sync for IrqSpinLock<T, I> {}

impl<T, I: IrqControl> IrqSpinLock<T, I> {
    /// Create a new IRQ-safe spinlock.
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
            _irq: PhantomData,
        }
    }

    /// Acquire the lock with interrupts disabled.
    pub fn lock(&self) -> IrqSpinLockGuard<'_, T, I> {
        let irq_state = I::disable();

        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }

        IrqSpinLockGuard {
            lock: self,
            irq_state,
        }
    }

    /// Run `f` on the protected value while holding the lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }
}

/// Guard returned by `IrqSpinLock::lock`.
///
/// Restores interrupt state on drop.
pub struct IrqSpinLockGuard<'a, T, I: IrqControl> {
    lock: &'a IrqSpinLock<T, I>,
    irq_state: I::State,
}

impl<T, I: IrqControl> core::ops::Deref for IrqSpinLockGuard<'_, T, I> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: The lock is held, so we have exclusive access
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, I: IrqControl> core::ops::DerefMut for IrqSpinLockGuard<'_, T, I> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The lock is held, so we have exclusive access
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T, I: IrqControl> Drop for IrqSpinLockGuard<'_, T, I> {
    fn drop(&mut self) {
        // Release before unmasking so a pending handler finds it free
        self.lock.locked.store(false, Ordering::Release);
        I::restore(self.irq_state);
    }
}
