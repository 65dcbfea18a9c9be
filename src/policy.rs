//! How a table finds the key inside a stored value.
//!
//! [`RawHashSet`](crate::raw_hash_set::RawHashSet) stores `P::Value` in its
//! slots and hashes and compares `P::Key`. Rust moves are bitwise, so
//! relocating a value during a resize is a plain memory copy; construction
//! and destruction are ordinary value construction and `Drop`.

use core::marker::PhantomData;

pub use equivalent::Equivalent;

/// Maps a stored value to the key it is hashed and compared by.
pub trait TablePolicy {
    /// The type the table is keyed by.
    type Key: ?Sized;
    /// The type stored in each slot.
    type Value;

    /// The key of a stored value.
    fn key(value: &Self::Value) -> &Self::Key;
}

/// Values are their own keys.
pub struct SetPolicy<T>(PhantomData<fn() -> T>);

impl<T> TablePolicy for SetPolicy<T> {
    type Key = T;
    type Value = T;

    #[inline(always)]
    fn key(value: &T) -> &T {
        value
    }
}

/// Values are `(key, mapped)` pairs.
pub struct MapPolicy<K, V>(PhantomData<fn() -> (K, V)>);

impl<K, V> TablePolicy for MapPolicy<K, V> {
    type Key = K;
    type Value = (K, V);

    #[inline(always)]
    fn key(value: &(K, V)) -> &K {
        &value.0
    }
}
