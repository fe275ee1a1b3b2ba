//! Typed, copyable allocator handles over a shared [`Arena`].
//!
//! An [`AllocatorView`] binds an arena to the element type it currently
//! allocates. It owns no state beyond the borrow, so it is `Copy`; many
//! views of different element types can share one arena, and
//! [`rebind`](AllocatorView::rebind) produces a view of another element
//! type over the same arena, which is what generic container protocols
//! need when they move or copy their allocator.
//!
//! The surface mirrors a generic allocator: `allocate`, `deallocate` (a
//! no-op by contract) and `reallocate`, plus the arena-specific lifecycle
//! controls (`clear`, `save_state`, `restore`) the embedding runtime uses
//! to bound allocation scopes.

use crate::arena::{Arena, Checkpoint, Epoch};
use crate::error::{Error, Result};
use crate::slot::Slot;
use crate::storage::Storage;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};

/// A non-owning typed handle over an [`Arena`].
///
/// All allocations made through a view of element type `T` are aligned to
/// `align_of::<T>()` and sized in whole elements.
///
/// # Example
///
/// ```
/// use veldt_mem::{AllocatorView, FixedArena};
///
/// let arena = FixedArena::<1024>::new_fixed();
/// let ints = AllocatorView::<u64, _>::new(&arena);
/// let bytes = ints.rebind::<u8>(); // same arena, different element type
///
/// let p = ints.allocate(4).unwrap();
/// unsafe { p.write(9) };
/// assert_eq!(ints, bytes); // equality means "same backing arena"
/// ```
pub struct AllocatorView<'a, T, S: Storage> {
    arena: &'a Arena<S>,
    _elem: PhantomData<*mut T>,
}

impl<'a, T, S: Storage> AllocatorView<'a, T, S> {
    /// Creates a view over `arena`. The arena outlives every view made
    /// from it; the borrow enforces that.
    #[must_use]
    pub const fn new(arena: &'a Arena<S>) -> Self {
        AllocatorView {
            arena,
            _elem: PhantomData,
        }
    }

    /// Rebinds this view to another element type, preserving the shared
    /// reference to the same arena.
    #[must_use]
    pub const fn rebind<U>(self) -> AllocatorView<'a, U, S> {
        AllocatorView::new(self.arena)
    }

    /// Allocates room for `count` elements of `T`.
    ///
    /// `count == 0` returns a null pointer with no side effect. Contents of
    /// the returned region are unspecified. The exhaustion-reset contract
    /// of [`Arena::alloc_raw`] applies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] when the byte size of the
    /// request exceeds the arena's total capacity (or overflows `usize`).
    pub fn allocate(&self, count: usize) -> Result<*mut T> {
        let size = mem::size_of::<T>().checked_mul(count).ok_or(
            Error::CapacityExceeded {
                requested: usize::MAX,
                capacity: self.arena.capacity(),
            },
        )?;
        self.arena
            .alloc_raw(size, mem::align_of::<T>())
            .map(|p| p.cast::<T>())
    }

    /// Allocates `count` elements and returns an epoch-tagged [`Slot`]
    /// instead of a bare pointer.
    ///
    /// The slot refuses to produce its pointer after the arena has been
    /// cleared or exhaustion-reset, which turns the "silently invalidated
    /// pointer" hazard into a checkable `None`.
    ///
    /// # Errors
    ///
    /// Same as [`allocate`](AllocatorView::allocate).
    pub fn allocate_slot(&self, count: usize) -> Result<Slot<T>> {
        let raw = self.allocate(count)?;
        // Null only for empty requests; a dangling pointer is the canonical
        // empty-slice base.
        let ptr = NonNull::new(raw).unwrap_or(NonNull::dangling());
        Ok(Slot::new(ptr, count, self.arena.epoch()))
    }

    /// Allocates one element and moves `value` into it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] when one element does not fit.
    pub fn allocate_value(&self, value: T) -> Result<*mut T> {
        let raw = self.allocate(1)?;
        // Null only when T is zero-sized; a dangling aligned pointer is
        // valid for zero-sized writes.
        let ptr = if raw.is_null() {
            NonNull::<T>::dangling().as_ptr()
        } else {
            raw
        };
        // SAFETY: `ptr` is aligned, writable and uninitialized; see above
        // for the zero-sized case.
        unsafe { ptr.write(value) };
        Ok(ptr)
    }

    /// Runs `T`'s destructor in place without reclaiming the memory: the
    /// deallocation half stays a no-op like
    /// [`deallocate`](AllocatorView::deallocate).
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live, initialized `T` previously produced by
    /// [`allocate_value`](AllocatorView::allocate_value) (or equivalent)
    /// from this arena, and must not be used after this call.
    pub unsafe fn destroy(&self, ptr: *mut T) {
        // SAFETY: forwarded to the caller's contract.
        unsafe { ptr::drop_in_place(ptr) };
    }

    /// Grows or shrinks an allocation of `old_count` elements to
    /// `new_count`, in place when `old` is the arena's most recent
    /// allocation and the space allows.
    ///
    /// On the move path the overlapping prefix of
    /// `min(old_count, new_count)` elements is preserved; on the in-place
    /// grow path, elements past `old_count` are unspecified. A null `old`
    /// behaves exactly like [`allocate`](AllocatorView::allocate).
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] when the new byte size exceeds
    /// the arena's total capacity (or overflows `usize`).
    pub fn reallocate(
        &self,
        old: *mut T,
        old_count: usize,
        new_count: usize,
    ) -> Result<*mut T> {
        let elem = mem::size_of::<T>();
        let new_size =
            elem.checked_mul(new_count)
                .ok_or(Error::CapacityExceeded {
                    requested: usize::MAX,
                    capacity: self.arena.capacity(),
                })?;
        self.arena
            .realloc_raw(
                old.cast(),
                elem.saturating_mul(old_count),
                new_size,
                mem::align_of::<T>(),
            )
            .map(|p| p.cast::<T>())
    }

    /// Does nothing. The arena never reclaims individual objects; this
    /// exists purely so the view satisfies a generic-allocator shape.
    pub fn deallocate(&self, _ptr: *mut T, _count: usize) {}

    /// See [`Arena::clear`].
    pub fn clear(&self, hard: bool) {
        self.arena.clear(hard);
    }

    /// See [`Arena::save_state`].
    #[must_use]
    pub fn save_state(&self) -> Checkpoint {
        self.arena.save_state()
    }

    /// See [`Arena::restore`].
    pub fn restore(&self, checkpoint: Checkpoint) {
        self.arena.restore(checkpoint);
    }

    /// Total capacity of the backing arena in bytes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.arena.capacity()
    }

    /// Bytes currently in use in the backing arena.
    #[must_use]
    pub fn used(&self) -> usize {
        self.arena.used()
    }

    /// The backing arena's current epoch.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.arena.epoch()
    }

    /// The backing arena.
    #[must_use]
    pub fn arena(&self) -> &'a Arena<S> {
        self.arena
    }
}

impl<T, S: Storage> Clone for AllocatorView<'_, T, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, S: Storage> Copy for AllocatorView<'_, T, S> {}

impl<T, S: Storage> fmt::Debug for AllocatorView<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocatorView")
            .field("arena", &std::ptr::from_ref(self.arena))
            .finish()
    }
}

/// Two views are equal when they reference the same arena, regardless of
/// their element types. Containers use this to decide whether storage can
/// be handed over without copying.
impl<'a, T, U, S: Storage> PartialEq<AllocatorView<'a, U, S>>
    for AllocatorView<'_, T, S>
{
    fn eq(&self, other: &AllocatorView<'a, U, S>) -> bool {
        ptr::eq(self.arena, other.arena)
    }
}

impl<T, S: Storage> Eq for AllocatorView<'_, T, S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedArena;
    use std::cell::Cell;

    #[test]
    fn test_zero_count_is_null() {
        let arena = FixedArena::<256>::new_fixed();
        let view = AllocatorView::<u32, _>::new(&arena);

        let p = view.allocate(0).unwrap();
        assert!(p.is_null());
        assert_eq!(view.used(), 0);
    }

    #[test]
    fn test_typed_allocation_is_aligned() {
        let arena = FixedArena::<256>::new_fixed();
        let bytes = AllocatorView::<u8, _>::new(&arena);
        let words = bytes.rebind::<u64>();

        bytes.allocate(3).unwrap();
        let p = words.allocate(2).unwrap();
        assert_eq!(p.addr() % mem::align_of::<u64>(), 0);
    }

    #[test]
    fn test_rebind_shares_arena() {
        let arena = FixedArena::<256>::new_fixed();
        let a = AllocatorView::<u32, _>::new(&arena);
        let b = a.rebind::<u64>();

        a.allocate(4).unwrap();
        assert_eq!(a.used(), b.used());
    }

    #[test]
    fn test_equality_is_arena_identity() {
        let arena1 = FixedArena::<256>::new_fixed();
        let arena2 = FixedArena::<256>::new_fixed();

        let a = AllocatorView::<u32, _>::new(&arena1);
        let b = a.rebind::<u64>();
        let c = AllocatorView::<u32, _>::new(&arena2);

        assert_eq!(a, b);
        assert!(a != c);
    }

    #[test]
    fn test_deallocate_is_a_no_op() {
        let arena = FixedArena::<256>::new_fixed();
        let view = AllocatorView::<u32, _>::new(&arena);

        let p = view.allocate(8).unwrap();
        let used = view.used();
        view.deallocate(p, 8);
        assert_eq!(view.used(), used);
    }

    #[test]
    fn test_allocate_value_and_destroy() {
        struct Dropper<'c>(&'c Cell<u32>);
        impl Drop for Dropper<'_> {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Cell::new(0);
        let arena = FixedArena::<256>::new_fixed();
        let view = AllocatorView::<Dropper<'_>, _>::new(&arena);

        let p = view.allocate_value(Dropper(&drops)).unwrap();
        assert_eq!(drops.get(), 0);

        // Destructor runs; memory stays claimed (deallocation is a no-op).
        let used = view.used();
        unsafe { view.destroy(p) };
        assert_eq!(drops.get(), 1);
        assert_eq!(view.used(), used);
    }

    #[test]
    fn test_reallocate_preserves_prefix_on_move() {
        let arena = FixedArena::<1024>::new_fixed();
        let view = AllocatorView::<u32, _>::new(&arena);

        let a = view.allocate(4).unwrap();
        unsafe {
            for i in 0..4 {
                a.add(i).write(i as u32);
            }
        }
        view.allocate(1).unwrap(); // `a` is no longer the last allocation

        let moved = view.reallocate(a, 4, 8).unwrap();
        assert_ne!(moved, a);
        unsafe {
            for i in 0..4 {
                assert_eq!(moved.add(i).read(), i as u32);
            }
        }
    }

    #[test]
    fn test_capacity_exceeded_surface() {
        let arena = FixedArena::<64>::new_fixed();
        let view = AllocatorView::<u64, _>::new(&arena);

        assert!(matches!(
            view.allocate(9),
            Err(Error::CapacityExceeded { requested: 72, .. })
        ));
    }

    #[test]
    fn test_zero_sized_elements() {
        let arena = FixedArena::<64>::new_fixed();
        let view = AllocatorView::<(), _>::new(&arena);

        let p = view.allocate_value(()).unwrap();
        assert!(!p.is_null());
        assert_eq!(view.used(), 0);
    }
}
