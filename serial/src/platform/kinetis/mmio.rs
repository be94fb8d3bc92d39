//! Volatile register cells with bit-level helpers.

use core::ptr::{read_volatile, write_volatile};

macro_rules! register {
    ($name:ident, $ty:ty) => {
        /// Memory-mapped register at a fixed address.
        #[derive(Debug, Copy, Clone)]
        pub struct $name {
            addr: usize,
        }

        impl $name {
            /// # Safety
            ///
            /// `addr` must be a mapped device register of this width.
            pub const unsafe fn at(addr: usize) -> Self {
                Self { addr }
            }

            #[inline]
            pub fn read(self) -> $ty {
                unsafe { read_volatile(self.addr as *const $ty) }
            }

            #[inline]
            pub fn write(self, value: $ty) {
                unsafe { write_volatile(self.addr as *mut $ty, value) }
            }

            #[inline]
            pub fn modify(self, f: impl FnOnce($ty) -> $ty) {
                self.write(f(self.read()));
            }

            #[inline]
            pub fn is_set(self, mask: $ty) -> bool {
                self.read() & mask != 0
            }

            #[inline]
            pub fn set_bits(self, mask: $ty) {
                self.modify(|value| value | mask);
            }

            #[inline]
            pub fn clear_bits(self, mask: $ty) {
                self.modify(|value| value & !mask);
            }

            /// Set or clear `mask` depending on `on`.
            #[inline]
            pub fn assign(self, mask: $ty, on: bool) {
                if on {
                    self.set_bits(mask)
                } else {
                    self.clear_bits(mask)
                }
            }
        }
    };
}

register!(Reg8, u8);
register!(Reg32, u32);
