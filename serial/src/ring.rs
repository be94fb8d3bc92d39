//! Single-producer/single-consumer ring buffer with borrowed extension memory.
//!
//! The ring owns `N` slots and can be stretched at runtime by lending it
//! a caller-owned slice, which is addressed as if it were appended after
//! the owned slots. One slot is always kept free, so a ring with total
//! capacity `C` holds at most `C - 1` units.
//!
//! `head` is written only by the producer and `tail` only by the
//! consumer. Both advance *before* the slot is touched: a push stores at
//! the new head, a pop reads at the new tail.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// A unit stored in a ring: a byte, or a 9-bit word in a `u16`.
pub trait Slot: Copy + Default + Send + 'static {
    /// Data bits a slot can carry.
    const BITS: u32;

    /// Build a slot from a received word. Bits that do not fit are dropped.
    fn from_word(word: u16) -> Self;

    fn to_word(self) -> u16;
}

impl Slot for u8 {
    const BITS: u32 = 8;

    #[inline]
    fn from_word(word: u16) -> Self {
        word as u8
    }

    #[inline]
    fn to_word(self) -> u16 {
        self.into()
    }
}

impl Slot for u16 {
    const BITS: u32 = 9;

    #[inline]
    fn from_word(word: u16) -> Self {
        word & 0x1FF
    }

    #[inline]
    fn to_word(self) -> u16 {
        self
    }
}

pub struct RingBuffer<'a, T: Slot, const N: usize> {
    base: UnsafeCell<[T; N]>,
    extension: AtomicPtr<T>,
    extension_len: AtomicUsize,
    head: AtomicUsize,
    tail: AtomicUsize,
    _lent: PhantomData<&'a mut [T]>,
}

// SAFETY: every slot has exactly one writer at a time. The producer only
// writes the slot past `head` before publishing it, the consumer only
// reads slots the producer has published.
unsafe impl<T: Slot, const N: usize> Sync for RingBuffer<'_, T, N> {}

impl<'a, T: Slot, const N: usize> RingBuffer<'a, T, N> {
    pub fn new() -> Self {
        Self {
            base: UnsafeCell::new([T::default(); N]),
            extension: AtomicPtr::new(ptr::null_mut()),
            extension_len: AtomicUsize::new(0),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            _lent: PhantomData,
        }
    }

    /// Owned slots plus the installed extension.
    #[inline]
    pub fn capacity(&self) -> usize {
        N + self.extension_len.load(Ordering::Acquire)
    }

    /// Length of the installed extension, 0 when none.
    pub fn extension_len(&self) -> usize {
        self.extension_len.load(Ordering::Acquire)
    }

    #[inline]
    fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next >= self.capacity() { 0 } else { next }
    }

    /// Raw pointer to logical slot `index`: owned slots first, then the
    /// extension.
    #[inline]
    fn slot(&self, index: usize) -> *mut T {
        if index < N {
            // SAFETY: index < N is inside the owned array
            unsafe { self.base.get().cast::<T>().add(index) }
        } else {
            // SAFETY: capacity() bounds index to N + extension_len, and the
            // extension pointer is valid for extension_len slots for 'a
            unsafe { self.extension.load(Ordering::Acquire).add(index - N) }
        }
    }

    /// Producer side: store `value`, or return false when full.
    pub fn push(&self, value: T) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = self.advance(head);
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `next` is not visible to the consumer until head moves
        unsafe { ptr::write_volatile(self.slot(next), value) };
        self.head.store(next, Ordering::Release);
        true
    }

    /// Consumer side: take the oldest unit.
    pub fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        if self.head.load(Ordering::Acquire) == tail {
            return None;
        }
        let next = self.advance(tail);
        // SAFETY: the producer published `next` before moving head past it
        let value = unsafe { ptr::read_volatile(self.slot(next)) };
        self.tail.store(next, Ordering::Release);
        Some(value)
    }

    /// Consumer side: the oldest unit, left in place.
    pub fn peek(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        if self.head.load(Ordering::Acquire) == tail {
            return None;
        }
        // SAFETY: as in pop
        Some(unsafe { ptr::read_volatile(self.slot(self.advance(tail))) })
    }

    pub fn occupied(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            self.capacity() + head - tail
        }
    }

    pub fn free(&self) -> usize {
        self.capacity() - 1 - self.occupied()
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    pub fn is_full(&self) -> bool {
        self.advance(self.head.load(Ordering::Acquire)) == self.tail.load(Ordering::Acquire)
    }

    /// Consumer side: drop everything published so far.
    pub fn clear(&self) {
        self.tail
            .store(self.head.load(Ordering::Acquire), Ordering::Release);
    }

    /// Rewind both indices. Neither side may be running.
    pub fn reset(&self) {
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Release);
    }

    /// Lend `memory` to the ring as extra slots, or take the loan back with
    /// `None` (an empty slice counts as `None`). Returns the new extension
    /// length.
    ///
    /// Neither side may be running, and no unit may be pending in the
    /// extension being replaced. Indices that fall outside the new
    /// capacity rewind the ring.
    pub fn install_extension(&self, memory: Option<&'a mut [T]>) -> usize {
        let (pointer, len) = match memory {
            Some(slice) if !slice.is_empty() => (slice.as_mut_ptr(), slice.len()),
            _ => (ptr::null_mut(), 0),
        };
        self.extension.store(pointer, Ordering::Release);
        self.extension_len.store(len, Ordering::Release);

        let capacity = N + len;
        if self.head.load(Ordering::Relaxed) >= capacity
            || self.tail.load(Ordering::Relaxed) >= capacity
        {
            self.reset();
        }
        len
    }
}

impl<T: Slot, const N: usize> Default for RingBuffer<'_, T, N> {
    fn default() -> Self {
        Self::new()
    }
}
