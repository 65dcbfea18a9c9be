#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

mod capacity;
mod common;
mod control;
mod generation;
mod group;
mod layout;
mod probe;
mod reentrancy;
mod scopeguard;

pub mod error;

/// A HashMap backed by a SwissTable.
///
/// This module provides a `HashMap` that wraps a `RawHashSet` of `(K, V)`
/// pairs and provides a standard key-value map interface with configurable
/// hashers.
pub mod hash_map;

/// A hash set backed by a SwissTable.
///
/// This module provides a `HashSet` that wraps a `RawHashSet` and provides a
/// standard set interface with configurable hashers.
pub mod hash_set;

pub mod hash_table;
pub mod policy;
pub mod raw_hash_set;
pub mod sampling;

pub use error::TryReserveError;
pub use generation::Cursor;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use policy::Equivalent;
pub use raw_hash_set::RawHashSet;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is named.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when none is named.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder for the default hasher builder when neither `foldhash`
        /// nor `std` is enabled. It cannot be constructed, so a hasher must
        /// be named explicitly.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}
