pub mod irq;
pub mod irq_spinlock;
pub use irq::{IrqControl, NoopIrq};
pub use irq_spinlock::IrqSpinLock;
