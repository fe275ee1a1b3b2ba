//! Epoch-tagged allocation handles.
//!
//! The arena's exhaustion reset (and `clear`) invalidates every pointer it
//! has handed out without telling the holders. A [`Slot`] carries the
//! [`Epoch`](crate::Epoch) it was allocated in, and will only surrender its
//! pointer while the arena is still in that epoch. Code that holds
//! allocations across calls that might allocate should hold slots, not
//! bare pointers.

use crate::arena::{Arena, Epoch};
use crate::storage::Storage;
use std::ptr::NonNull;

/// A typed allocation handle that knows which arena epoch produced it.
///
/// # Example
///
/// ```
/// use veldt_mem::{AllocatorView, FixedArena};
///
/// let arena = FixedArena::<256>::new_fixed();
/// let view = AllocatorView::<u32, _>::new(&arena);
///
/// let slot = view.allocate_slot(4).unwrap();
/// assert!(slot.get(&arena).is_some());
///
/// arena.clear(false);
/// assert!(slot.get(&arena).is_none()); // stale epoch, pointer withheld
/// ```
#[derive(Debug)]
pub struct Slot<T> {
    ptr: NonNull<T>,
    len: usize,
    epoch: Epoch,
}

impl<T> Slot<T> {
    pub(crate) fn new(ptr: NonNull<T>, len: usize, epoch: Epoch) -> Self {
        Slot { ptr, len, epoch }
    }

    /// Number of elements in this allocation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this slot holds zero elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The epoch this slot was allocated in.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Returns the allocation's pointer while it is still valid.
    ///
    /// Yields `None` once the arena has moved past the slot's epoch (a
    /// `clear` or an exhaustion reset happened), at which point the memory
    /// may already belong to someone else. A rolled-back cursor within the
    /// same epoch is not detected; checkpoint discipline is the caller's.
    #[must_use]
    pub fn get<S: Storage>(&self, arena: &Arena<S>) -> Option<NonNull<T>> {
        (arena.epoch() == self.epoch).then_some(self.ptr)
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}
