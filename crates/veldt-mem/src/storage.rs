//! Buffer storage variants backing an [`Arena`](crate::Arena).
//!
//! The set of storage kinds is closed and chosen at construction time, so
//! the abstraction is a plain trait resolved statically through the arena's
//! type parameter. No trait objects, no runtime dispatch.
//!
//! - [`FixedStorage`]: the buffer is embedded by value with a compile-time
//!   capacity. Dropping the arena drops the buffer.
//! - [`SliceStorage`]: the buffer belongs to an external owner and the
//!   storage is a borrow of it. The arena never frees it.

/// Buffer access capability required by an arena.
///
/// A storage exposes exactly three things: the base pointer of its
/// contiguous buffer, the buffer's capacity, and a zero-fill used by hard
/// clears. Cursor bookkeeping lives in the arena, not here.
pub trait Storage {
    /// Base pointer of the buffer. Stable for as long as the storage is not
    /// moved; an arena takes ownership of its storage precisely so this
    /// holds for its whole lifetime.
    fn base(&mut self) -> *mut u8;

    /// Total buffer capacity in bytes. Never changes after construction.
    fn capacity(&self) -> usize;

    /// Zero-fills the whole buffer.
    fn wipe(&mut self);
}

/// Storage embedding its buffer by value, capacity fixed at compile time.
///
/// The buffer is 16-byte aligned, so allocations of any common alignment
/// start at offset 0 with no padding wasted.
#[derive(Debug)]
#[repr(C, align(16))]
pub struct FixedStorage<const N: usize> {
    buf: [u8; N],
}

impl<const N: usize> FixedStorage<N> {
    /// Creates a zero-initialized fixed buffer.
    #[must_use]
    pub const fn new() -> Self {
        FixedStorage { buf: [0; N] }
    }
}

impl<const N: usize> Default for FixedStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Storage for FixedStorage<N> {
    fn base(&mut self) -> *mut u8 {
        self.buf.as_mut_ptr()
    }

    fn capacity(&self) -> usize {
        N
    }

    fn wipe(&mut self) {
        self.buf.fill(0);
    }
}

/// Storage borrowing a buffer from an external owner.
///
/// The owner decides the capacity and outlives the storage; the arena is a
/// non-owning view in this configuration and never frees the bytes.
#[derive(Debug)]
pub struct SliceStorage<'b> {
    buf: &'b mut [u8],
}

impl<'b> SliceStorage<'b> {
    /// Wraps an externally owned buffer.
    #[must_use]
    pub fn new(buf: &'b mut [u8]) -> Self {
        SliceStorage { buf }
    }
}

impl Storage for SliceStorage<'_> {
    fn base(&mut self) -> *mut u8 {
        self.buf.as_mut_ptr()
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn wipe(&mut self) {
        self.buf.fill(0);
    }
}
