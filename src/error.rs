//! Allocation failure reporting.

use core::alloc::Layout;
use core::fmt;

use crate::capacity::capacity_overflow;

/// The error type for [`try_reserve`] methods.
///
/// [`try_reserve`]: crate::hash_table::HashTable::try_reserve
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TryReserveError {
    /// The requested element count is above what a table can hold for this
    /// element size.
    CapacityOverflow,

    /// The allocator reported a failure.
    AllocError {
        /// The layout of the allocation that failed.
        layout: Layout,
    },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryReserveError::CapacityOverflow => f.write_str("hash table size overflow"),
            TryReserveError::AllocError { layout } => write!(
                f,
                "memory allocation of {} bytes (align {}) failed",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl core::error::Error for TryReserveError {}

/// Whether a failed allocation should be reported or should abort.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Fallibility {
    Fallible,
    Infallible,
}

impl Fallibility {
    #[cold]
    #[inline(never)]
    pub(crate) fn capacity_overflow(self) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::CapacityOverflow,
            Fallibility::Infallible => capacity_overflow(),
        }
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn alloc_err(self, layout: Layout) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::AllocError { layout },
            Fallibility::Infallible => alloc::alloc::handle_alloc_error(layout),
        }
    }
}
