//! Veldt memory management infrastructure.
//!
//! This crate provides the region-based ("linear") allocator the Veldt
//! runtime uses for short-lived, scope-bounded allocations: a fixed or
//! externally owned byte buffer from which fixed-alignment allocations are
//! carved by advancing a bump cursor. There is no per-object bookkeeping
//! and no per-object free; reclamation is always in bulk, either by
//! clearing the whole arena or by rolling the cursor back to a previously
//! saved checkpoint.
//!
//! # Architecture
//!
//! - [`Arena`]: the storage plus cursor state; implements the byte-level
//!   allocate / reallocate / clear / checkpoint algorithm.
//! - [`Storage`]: the closed set of buffer variants an arena can sit on,
//!   [`FixedStorage`] (buffer embedded by value) and [`SliceStorage`]
//!   (buffer owned by someone else).
//! - [`AllocatorView`]: a copyable, non-owning typed handle over an arena,
//!   shaped like a generic allocator so containers can be built over it.
//! - [`Slot`]: an epoch-tagged allocation handle that detects access to
//!   memory invalidated by a clear or an exhaustion reset.
//!
//! # The exhaustion contract
//!
//! When an allocation does not fit in the remaining tail of the buffer but
//! would fit in an empty arena, the arena **clears itself and retries
//! once**. This silently invalidates every previously returned pointer. It
//! is the documented contract of this allocator, not a bug: the arena is
//! meant for allocations bounded by one runtime step, where the reset is
//! intentional. Callers who must detect it can allocate through [`Slot`]s,
//! which refuse to produce a pointer once their epoch is stale.
//!
//! # Example
//!
//! ```
//! use veldt_mem::{AllocatorView, FixedArena};
//!
//! let arena = FixedArena::<1024>::new_fixed();
//! let ints = AllocatorView::<u64, _>::new(&arena);
//!
//! let ptr = ints.allocate(10).unwrap();
//! unsafe { ptr.write(7) };
//!
//! let mark = ints.save_state();
//! ints.allocate(20).unwrap();
//! ints.restore(mark); // everything after `mark` is reclaimed
//! ```

pub mod align;
pub mod arena;
pub mod error;
pub mod slot;
pub mod storage;
pub mod view;

pub use arena::{Arena, Checkpoint, Epoch};
pub use error::{Error, Result};
pub use slot::Slot;
pub use storage::{FixedStorage, SliceStorage, Storage};
pub use view::AllocatorView;

/// Arena over a buffer embedded by value, capacity fixed at compile time.
pub type FixedArena<const N: usize> = Arena<FixedStorage<N>>;

/// Arena over a buffer supplied by an external owner.
pub type SliceArena<'b> = Arena<SliceStorage<'b>>;
