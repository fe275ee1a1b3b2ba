//! The bump-pointer arena over a [`Storage`] buffer.
//!
//! An [`Arena`] owns its storage and three pieces of cursor state: the byte
//! offset of the next free position, the most recent allocation record, and
//! the current [`Epoch`]. All mutation goes through `&self`: the cursor
//! lives in `Cell`s and the buffer behind an `UnsafeCell` so that many
//! copyable [`AllocatorView`](crate::AllocatorView)s can share one arena.
//! That interior mutability is strictly single-threaded; `Cell` makes
//! `Arena` `!Sync`, which is the concurrency contract of this allocator
//! stated in the type system. A caller who wants to share an arena across
//! threads must wrap it in a lock they own.
//!
//! # Lifecycle
//!
//! An arena is constructed once with its storage and mutated only through
//! [`alloc_raw`](Arena::alloc_raw), [`realloc_raw`](Arena::realloc_raw),
//! [`clear`](Arena::clear), [`save_state`](Arena::save_state) and
//! [`restore`](Arena::restore). The buffer is never resized or moved.
//!
//! # Epochs
//!
//! Both [`clear`](Arena::clear) and the exhaustion reset invalidate every
//! pointer the arena has handed out. Each bumps the arena's epoch, so a
//! [`Slot`](crate::Slot) or [`Checkpoint`] captured before the event can be
//! recognized as stale instead of silently reading reused memory.

use crate::align::align_forward;
use crate::error::{Error, Result};
use crate::storage::Storage;
use std::cell::{Cell, UnsafeCell};
use std::ptr;

/// Generation counter identifying one "lifetime" of an arena's contents.
///
/// The epoch advances every time the arena invalidates its allocations in
/// bulk (a `clear` or an exhaustion reset). Two pointers are only
/// comparable if they were produced in the same epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

/// A saved cursor position enabling scoped bulk reclamation.
///
/// A checkpoint is an opaque value: it records where the cursor stood and
/// in which epoch. It is not a capability; restoring a checkpoint captured
/// from a different arena is a caller error the arena cannot detect beyond
/// the epoch and bounds checks it performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    used: usize,
    epoch: Epoch,
}

/// A linear (bump-pointer) allocator over a fixed buffer.
///
/// Allocation is O(1): compute the next aligned offset, check it fits,
/// advance the cursor. There is no per-object free; see
/// [`clear`](Arena::clear) and [`restore`](Arena::restore) for the two bulk
/// reclamation paths, and the crate docs for the exhaustion-reset contract.
///
/// # Example
///
/// ```
/// use veldt_mem::{Arena, SliceStorage};
///
/// let mut buf = [0u8; 256];
/// let arena = Arena::new(SliceStorage::new(&mut buf));
///
/// let p = arena.alloc_raw(64, 1).unwrap();
/// assert!(!p.is_null());
/// assert_eq!(arena.used(), 64);
///
/// arena.clear(false);
/// assert_eq!(arena.used(), 0);
/// ```
pub struct Arena<S: Storage> {
    /// The backing buffer. `UnsafeCell` because allocation hands out raw
    /// pointers into it while the arena is shared by `&self`.
    storage: UnsafeCell<S>,
    /// Byte offset of the next free position. `0 <= used <= capacity`.
    used: Cell<usize>,
    /// Offset and size of the most recent allocation, or `None`. Only this
    /// allocation is eligible for in-place reallocation.
    last: Cell<Option<(usize, usize)>>,
    /// Current generation; see [`Epoch`].
    epoch: Cell<u64>,
}

impl<S: Storage> Arena<S> {
    /// Creates an arena over the given storage.
    #[must_use]
    pub const fn new(storage: S) -> Self {
        Arena {
            storage: UnsafeCell::new(storage),
            used: Cell::new(0),
            last: Cell::new(None),
            epoch: Cell::new(0),
        }
    }

    /// Base pointer of the backing buffer.
    fn base(&self) -> *mut u8 {
        // SAFETY: the storage is only ever accessed through this arena, and
        // the arena is !Sync, so no other reference to it can be live while
        // this short-lived one exists.
        unsafe { (*self.storage.get()).base() }
    }

    /// Total capacity of the backing buffer in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        // SAFETY: shared access, see `base`.
        unsafe { (*self.storage.get()).capacity() }
    }

    /// Bytes currently in use, including alignment padding.
    #[must_use]
    pub fn used(&self) -> usize {
        self.used.get()
    }

    /// Bytes still free from the current cursor to the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.used.get()
    }

    /// The arena's current epoch.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        Epoch(self.epoch.get())
    }

    /// Finds the aligned slot for a `size`-byte allocation starting at or
    /// after cursor position `from`. Returns `(offset, new_used)`, or
    /// `None` if the slot would run past the end of the buffer.
    ///
    /// Alignment is computed on the absolute address so the buffer itself
    /// needs no particular alignment.
    fn fit(&self, from: usize, size: usize, align: usize) -> Option<(usize, usize)> {
        let base = self.base().addr();
        let aligned = align_forward(base.wrapping_add(from), align);
        let offset = aligned.wrapping_sub(base);
        let end = offset.checked_add(size)?;
        (end <= self.capacity()).then_some((offset, end))
    }

    /// Allocates `size` bytes at the given alignment.
    ///
    /// A zero-size request returns a null pointer with no side effect. If
    /// the request does not fit in the remaining tail but would fit in an
    /// empty arena, the exhaustion policy runs: the arena clears itself,
    /// bumps its epoch and retries once from offset 0, invalidating every
    /// previously returned pointer.
    ///
    /// The returned region's contents are unspecified unless the arena was
    /// hard-cleared beforehand; reuse does not zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] when `size` (plus unavoidable
    /// base-address padding) exceeds the total capacity. No cursor position
    /// could ever satisfy such a request.
    pub fn alloc_raw(&self, size: usize, align: usize) -> Result<*mut u8> {
        if size == 0 {
            return Ok(ptr::null_mut());
        }

        let capacity = self.capacity();
        if size > capacity {
            return Err(Error::CapacityExceeded {
                requested: size,
                capacity,
            });
        }

        let (offset, end) = match self.fit(self.used.get(), size, align) {
            Some(found) => found,
            None => {
                veldt_log::debug!(
                    "arena exhausted at {}/{} bytes, resetting for a {} byte request",
                    self.used.get(),
                    capacity,
                    size
                );
                self.invalidate_all();
                self.fit(0, size, align).ok_or(Error::CapacityExceeded {
                    requested: size,
                    capacity,
                })?
            }
        };

        self.used.set(end);
        self.last.set(Some((offset, size)));
        // SAFETY: `fit` checked offset + size <= capacity, so the returned
        // pointer and the `size` bytes after it lie inside the buffer.
        Ok(unsafe { self.base().add(offset) })
    }

    /// Grows or shrinks an allocation, in place when possible.
    ///
    /// Only the most recent allocation can be resized without moving:
    /// nothing was allocated after it, so the cursor can simply retreat or
    /// advance. Shrinking it never moves data; growing it moves data only
    /// when the tail is too small. Any other pointer (or a last-allocation
    /// grow that does not fit) falls back to a fresh allocation plus a copy
    /// of `min(old_size, new_size)` bytes, leaving the old region as dead
    /// space until the next bulk reclamation.
    ///
    /// A null `old` behaves exactly like [`alloc_raw`](Arena::alloc_raw).
    /// When growing in place, bytes past the old size are unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] when `new_size` exceeds the
    /// total capacity.
    pub fn realloc_raw(
        &self,
        old: *mut u8,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Result<*mut u8> {
        if old.is_null() {
            return self.alloc_raw(new_size, align);
        }

        let capacity = self.capacity();
        if new_size > capacity {
            return Err(Error::CapacityExceeded {
                requested: new_size,
                capacity,
            });
        }

        if let Some((offset, size)) = self.last.get()
            && old.addr() == self.base().addr().wrapping_add(offset)
        {
            if new_size <= size {
                // Shrink in place: the cursor retreats, nothing moves, and
                // the freed tail is available to the next allocation.
                self.used.set(self.used.get() - (size - new_size));
                if new_size == 0 {
                    self.last.set(None);
                    return Ok(ptr::null_mut());
                }
                self.last.set(Some((offset, new_size)));
                return Ok(old);
            }

            let grown = self.used.get() + (new_size - size);
            if grown <= capacity {
                // Grow in place. The last allocation ends exactly at the
                // cursor, so advancing the cursor extends it.
                self.used.set(grown);
                self.last.set(Some((offset, new_size)));
                return Ok(old);
            }
            // Tail too small even for the last allocation; fall back to a
            // fresh allocation below.
        }

        let fresh = self.alloc_raw(new_size, align)?;
        if !fresh.is_null() {
            // SAFETY: `old` points at `old_size` live bytes inside the
            // buffer and `fresh` at `new_size` writable ones. `copy` has
            // memmove semantics, which matters because an exhaustion reset
            // during `alloc_raw` can make the regions overlap.
            unsafe { ptr::copy(old, fresh, old_size.min(new_size)) };
        }
        Ok(fresh)
    }

    /// Resets the cursor, forgetting every allocation at once.
    ///
    /// `hard = true` additionally zero-fills the buffer, for arenas that
    /// held sensitive data. This is the only bulk-reclamation operation
    /// besides [`restore`](Arena::restore); there is no per-object free.
    pub fn clear(&self, hard: bool) {
        self.invalidate_all();
        if hard {
            // SAFETY: shared access, see `base`.
            unsafe { (*self.storage.get()).wipe() };
        }
    }

    /// Cursor reset shared by `clear` and the exhaustion policy. Advancing
    /// the epoch is what lets stale handles be detected.
    fn invalidate_all(&self) {
        self.used.set(0);
        self.last.set(None);
        self.epoch.set(self.epoch.get() + 1);
    }

    /// Captures the current cursor as an opaque checkpoint.
    #[must_use]
    pub fn save_state(&self) -> Checkpoint {
        Checkpoint {
            used: self.used.get(),
            epoch: self.epoch(),
        }
    }

    /// Rolls the cursor back to a checkpoint, reclaiming everything
    /// allocated since it was captured.
    ///
    /// Only backward restores within the checkpoint's epoch are honored. A
    /// checkpoint from a previous epoch (the arena was cleared or
    /// exhaustion-reset since) or one pointing past the current cursor is a
    /// caller-logic error; both are logged and ignored rather than treated
    /// as fatal.
    pub fn restore(&self, checkpoint: Checkpoint) {
        if checkpoint.epoch != self.epoch() {
            veldt_log::warn!(
                "restore ignored: checkpoint is from a previous arena epoch"
            );
            return;
        }
        if checkpoint.used > self.used.get() {
            veldt_log::warn!(
                "restore ignored: checkpoint offset {} is past cursor {}",
                checkpoint.used,
                self.used.get()
            );
            return;
        }
        self.used.set(checkpoint.used);
        // The arena does not track enough history to know whether the
        // checkpoint still coincides with an allocation boundary, so
        // in-place reallocation eligibility is conservatively dropped.
        self.last.set(None);
    }
}

impl<const N: usize> Arena<crate::storage::FixedStorage<N>> {
    /// Creates an arena whose buffer is embedded by value.
    #[must_use]
    pub const fn new_fixed() -> Self {
        Arena::new(crate::storage::FixedStorage::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SliceStorage;

    /// Backing buffer aligned enough that offset assertions are exact.
    #[repr(align(16))]
    struct Buf<const N: usize>([u8; N]);

    fn arena_over(buf: &mut [u8]) -> Arena<SliceStorage<'_>> {
        Arena::new(SliceStorage::new(buf))
    }

    #[test]
    fn test_zero_size_is_null_and_free() {
        let mut buf = Buf([0u8; 64]);
        let arena = arena_over(&mut buf.0);

        let p = arena.alloc_raw(0, 8).unwrap();
        assert!(p.is_null());
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_offsets_are_monotonic_and_disjoint() {
        let mut buf = Buf([0u8; 256]);
        let arena = arena_over(&mut buf.0);

        let a = arena.alloc_raw(24, 8).unwrap();
        let b = arena.alloc_raw(24, 8).unwrap();
        let c = arena.alloc_raw(24, 8).unwrap();

        assert!(b.addr() >= a.addr() + 24);
        assert!(c.addr() >= b.addr() + 24);
    }

    #[test]
    fn test_returned_pointers_are_aligned() {
        let mut buf = Buf([0u8; 256]);
        let arena = arena_over(&mut buf.0);

        arena.alloc_raw(1, 1).unwrap();
        let p = arena.alloc_raw(16, 16).unwrap();
        assert_eq!(p.addr() % 16, 0);
    }

    #[test]
    fn test_capacity_bound_is_hard() {
        let mut buf = Buf([0u8; 64]);
        let arena = arena_over(&mut buf.0);

        let err = arena.alloc_raw(65, 1).unwrap_err();
        assert_eq!(
            err,
            Error::CapacityExceeded {
                requested: 65,
                capacity: 64
            }
        );

        // Still fails after the cursor has moved; no reset can help.
        arena.alloc_raw(8, 1).unwrap();
        assert!(arena.alloc_raw(65, 1).is_err());
    }

    #[test]
    fn test_exhaustion_resets_and_retries() {
        let mut buf = Buf([0u8; 64]);
        let arena = arena_over(&mut buf.0);

        arena.alloc_raw(48, 1).unwrap();
        let before = arena.epoch();

        // Does not fit the 16-byte tail, fits an empty arena.
        let p = arena.alloc_raw(32, 1).unwrap();
        assert!(!p.is_null());
        assert_eq!(arena.used(), 32);
        assert_ne!(arena.epoch(), before);
    }

    #[test]
    fn test_shrink_in_place_retreats_cursor() {
        let mut buf = Buf([0u8; 256]);
        let arena = arena_over(&mut buf.0);

        let p = arena.alloc_raw(64, 8).unwrap();
        let q = arena.realloc_raw(p, 64, 32, 8).unwrap();

        assert_eq!(p, q);
        assert_eq!(arena.used(), 32);
    }

    #[test]
    fn test_grow_in_place_keeps_pointer() {
        let mut buf = Buf([0u8; 256]);
        let arena = arena_over(&mut buf.0);

        let p = arena.alloc_raw(32, 8).unwrap();
        let q = arena.realloc_raw(p, 32, 128, 8).unwrap();

        assert_eq!(p, q);
        assert_eq!(arena.used(), 128);
    }

    #[test]
    fn test_shrink_to_zero_returns_null() {
        let mut buf = Buf([0u8; 64]);
        let arena = arena_over(&mut buf.0);

        let p = arena.alloc_raw(32, 8).unwrap();
        let q = arena.realloc_raw(p, 32, 0, 8).unwrap();

        assert!(q.is_null());
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_non_last_realloc_moves_and_copies() {
        let mut buf = Buf([0u8; 256]);
        let arena = arena_over(&mut buf.0);

        let a = arena.alloc_raw(16, 1).unwrap();
        unsafe {
            for i in 0..16 {
                a.add(i).write(i as u8);
            }
        }
        let _b = arena.alloc_raw(16, 1).unwrap();

        // `a` is no longer the most recent allocation; it must move.
        let moved = arena.realloc_raw(a, 16, 32, 1).unwrap();
        assert_ne!(moved, a);
        unsafe {
            for i in 0..16 {
                assert_eq!(moved.add(i).read(), i as u8);
            }
        }
    }

    #[test]
    fn test_realloc_null_allocates() {
        let mut buf = Buf([0u8; 64]);
        let arena = arena_over(&mut buf.0);

        let p = arena.realloc_raw(ptr::null_mut(), 0, 16, 8).unwrap();
        assert!(!p.is_null());
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let mut buf = Buf([0u8; 256]);
        let arena = arena_over(&mut buf.0);

        arena.alloc_raw(32, 8).unwrap();
        let mark = arena.save_state();

        arena.alloc_raw(32, 8).unwrap();
        arena.alloc_raw(32, 8).unwrap();
        assert_eq!(arena.used(), 96);

        arena.restore(mark);
        assert_eq!(arena.used(), 32);

        // The reclaimed space is reused.
        let p = arena.alloc_raw(32, 8).unwrap();
        assert_eq!(p.addr() % 8, 0);
        assert_eq!(arena.used(), 64);
    }

    #[test]
    fn test_forward_restore_is_ignored() {
        let mut buf = Buf([0u8; 64]);
        let arena = arena_over(&mut buf.0);

        arena.alloc_raw(32, 1).unwrap();
        let mark = arena.save_state();
        arena.clear(false);
        arena.alloc_raw(8, 1).unwrap();

        // `mark` is both forward of the cursor and from a stale epoch.
        arena.restore(mark);
        assert_eq!(arena.used(), 8);
    }

    #[test]
    fn test_stale_epoch_restore_is_ignored() {
        let mut buf = Buf([0u8; 64]);
        let arena = arena_over(&mut buf.0);

        let mark = arena.save_state();
        arena.clear(false);
        arena.alloc_raw(16, 1).unwrap();

        // Offset 0 would be "valid", but the epoch no longer matches.
        arena.restore(mark);
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn test_restore_clears_inplace_eligibility() {
        let mut buf = Buf([0u8; 256]);
        let arena = arena_over(&mut buf.0);

        let p = arena.alloc_raw(32, 8).unwrap();
        let mark = arena.save_state();
        arena.restore(mark);

        // `p` still ends at the cursor, but the record was dropped, so the
        // reallocation must take the move path.
        let q = arena.realloc_raw(p, 32, 64, 8).unwrap();
        assert_ne!(p, q);
    }

    #[test]
    fn test_hard_clear_zero_fills() {
        let mut buf = Buf([0u8; 64]);
        let arena = arena_over(&mut buf.0);

        let p = arena.alloc_raw(16, 1).unwrap();
        unsafe { p.write_bytes(0xAA, 16) };

        arena.clear(true);
        let q = arena.alloc_raw(16, 1).unwrap();
        unsafe {
            for i in 0..16 {
                assert_eq!(q.add(i).read(), 0);
            }
        }
    }

    #[test]
    fn test_fixed_arena_construction() {
        let arena = Arena::<crate::storage::FixedStorage<128>>::new_fixed();
        assert_eq!(arena.capacity(), 128);
        let p = arena.alloc_raw(64, 8).unwrap();
        assert!(!p.is_null());
    }
}
