//! Error types for the Veldt arena allocator.
//!
//! All allocation failures are synchronous and local: the arena never
//! retries transparently except for the single documented exhaustion reset,
//! which is a policy action rather than an error. An out-of-range restore
//! is likewise a logged no-op, not an `Error` variant.

use std::fmt;

/// Errors that can occur in the arena allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A single request exceeds the arena's total capacity. No reset or
    /// retry can ever satisfy it.
    CapacityExceeded {
        /// The requested allocation size in bytes.
        requested: usize,
        /// The arena's total capacity in bytes.
        capacity: usize,
    },

    /// Invalid alignment specified (not a power of two).
    InvalidAlignment {
        /// The requested alignment.
        alignment: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "Capacity exceeded: requested {requested} bytes, arena holds {capacity} bytes"
                )
            }
            Error::InvalidAlignment { alignment } => {
                write!(
                    f,
                    "Invalid alignment: {alignment} is not a power of two"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for arena operations.
pub type Result<T> = std::result::Result<T, Error>;
