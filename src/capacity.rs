//! Capacity and growth arithmetic.
//!
//! Capacities are always of the form `2^n - 1`, so `hash & capacity` is the
//! probe start and `capacity + 1` slots fit a whole number of groups once the
//! table is at least one group wide. Growth is the number of elements a
//! capacity admits under the max load factor; it is computed with integer
//! formulas only.

use crate::control::is_empty;
use crate::group::Group;

cfg_if::cfg_if! {
    if #[cfg(feature = "density-seventy-five")] {
        /// Headroom divisor: a table keeps `capacity / MAX_LOAD_DIVISOR` slots free.
        pub(crate) const MAX_LOAD_DIVISOR: usize = 4;
    } else if #[cfg(feature = "density-ninety-three-point-seven-five")] {
        /// Headroom divisor: a table keeps `capacity / MAX_LOAD_DIVISOR` slots free.
        pub(crate) const MAX_LOAD_DIVISOR: usize = 16;
    } else {
        /// Headroom divisor: a table keeps `capacity / MAX_LOAD_DIVISOR` slots free.
        pub(crate) const MAX_LOAD_DIVISOR: usize = 8;
    }
}

/// Number of bits available for the element count on 64-bit targets.
pub(crate) const SIZE_BIT_COUNT: u32 = 47;

/// Tables of at least this capacity release their backing array on `clear`.
pub(crate) const CLEAR_REUSE_CAPACITY_LIMIT: usize = 128;

#[inline]
pub(crate) fn is_valid_capacity(capacity: usize) -> bool {
    capacity > 0 && (capacity.wrapping_add(1) & capacity) == 0
}

/// The smallest valid capacity that is at least `n`.
#[inline]
pub(crate) fn normalize_capacity(n: usize) -> usize {
    if n == 0 {
        1
    } else {
        usize::MAX >> n.leading_zeros()
    }
}

#[inline]
pub(crate) fn next_capacity(capacity: usize) -> usize {
    debug_assert!(is_valid_capacity(capacity) || capacity == 0);
    capacity * 2 + 1
}

#[inline]
const fn growth_for_width(capacity: u64, width: u64) -> u64 {
    let growth = capacity - capacity / MAX_LOAD_DIVISOR as u64;
    // A table at least one group wide must keep one slot empty, otherwise a
    // probe for a missing key would never see an empty lane.
    if capacity + 1 >= width && growth == capacity {
        capacity - 1
    } else {
        growth
    }
}

/// The number of elements a table of `capacity` may hold before it must grow.
#[inline]
pub(crate) fn capacity_to_growth(capacity: usize) -> usize {
    debug_assert!(is_valid_capacity(capacity));
    growth_for_width(capacity as u64, Group::WIDTH as u64) as usize
}

/// A lower bound on the capacity needed to hold `growth` elements. Not
/// necessarily normalized.
#[inline]
pub(crate) fn growth_to_lowerbound_capacity(growth: usize) -> usize {
    if growth == 0 {
        return 0;
    }
    growth.saturating_add((growth - 1) / (MAX_LOAD_DIVISOR - 1))
}

/// The smallest valid capacity that holds `size` elements, or 0 for 0.
#[inline]
pub(crate) fn size_to_capacity(size: usize) -> usize {
    if size == 0 {
        return 0;
    }
    let mut capacity = normalize_capacity(growth_to_lowerbound_capacity(size));
    while capacity_to_growth(capacity) < size {
        capacity = next_capacity(capacity);
    }
    capacity
}

#[inline]
fn max_valid_size_for_one_byte_slot(pointer_bytes: u32) -> u64 {
    if pointer_bytes == 8 {
        growth_for_width((1u64 << SIZE_BIT_COUNT) - 1, Group::WIDTH as u64)
    } else {
        debug_assert_eq!(pointer_bytes, 4);
        growth_for_width((1u64 << (pointer_bytes * 8 - 2)) - 1, Group::WIDTH as u64)
    }
}

/// The largest size a table of `slot_size`-byte elements may reach on a target
/// whose pointers are `pointer_bytes` wide, such that neither the element
/// count nor the byte size of the backing array overflows.
pub(crate) fn max_valid_size_for(slot_size: u64, pointer_bytes: u32) -> u64 {
    let slot_size = slot_size.max(1);
    if pointer_bytes == 8 {
        if slot_size < 1u64 << (64 - SIZE_BIT_COUNT) {
            return max_valid_size_for_one_byte_slot(8);
        }
        (1u64 << (pointer_bytes * 8 - 2)) / slot_size
    } else {
        max_valid_size_for_one_byte_slot(pointer_bytes) / slot_size
    }
}

/// Whether `size` exceeds [`max_valid_size_for`], without a division in the
/// common case.
pub(crate) fn is_above_valid_size_for(size: u64, slot_size: u64, pointer_bytes: u32) -> bool {
    let slot_size = slot_size.max(1);
    if pointer_bytes == 8 {
        if slot_size < 1u64 << (64 - SIZE_BIT_COUNT) {
            return size > max_valid_size_for_one_byte_slot(8);
        }
        size > max_valid_size_for(slot_size, 8)
    } else {
        size.checked_mul(slot_size)
            .is_none_or(|bytes| bytes > max_valid_size_for_one_byte_slot(pointer_bytes))
    }
}

#[inline]
pub(crate) fn max_valid_size(slot_size: usize) -> usize {
    max_valid_size_for(slot_size as u64, usize::BITS / 8) as usize
}

#[inline]
pub(crate) fn is_above_valid_size(size: usize, slot_size: usize) -> bool {
    is_above_valid_size_for(size as u64, slot_size as u64, usize::BITS / 8)
}

#[cold]
#[inline(never)]
pub(crate) fn capacity_overflow() -> ! {
    panic!("hash table size overflow")
}

/// Remaining growth budget, packed with a flag recording whether the table may
/// contain tombstones.
///
/// The flag lives in the top bit so that "no tombstones and some growth left",
/// the insert fast path, is a single signed comparison.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GrowthInfo(usize);

const DELETED_BIT: usize = 1 << (usize::BITS - 1);
const GROWTH_LEFT_MASK: usize = !DELETED_BIT;

impl GrowthInfo {
    #[inline]
    pub(crate) fn init_growth_left_no_deleted(&mut self, growth_left: usize) {
        debug_assert!(growth_left & DELETED_BIT == 0);
        self.0 = growth_left;
    }

    #[inline]
    pub(crate) fn overwrite_full_as_empty(&mut self) {
        self.0 += 1;
    }

    #[inline]
    pub(crate) fn overwrite_empty_as_full(&mut self) {
        debug_assert!(self.growth_left() > 0);
        self.0 -= 1;
    }

    /// Accounts for writing a full byte over `ctrl`, which must be empty or
    /// deleted. Reusing a tombstone costs no growth.
    #[inline]
    pub(crate) fn overwrite_control_as_full(&mut self, ctrl: u8) {
        if is_empty(ctrl) {
            self.overwrite_empty_as_full();
        }
    }

    #[inline]
    pub(crate) fn overwrite_full_as_deleted(&mut self) {
        self.0 |= DELETED_BIT;
    }

    #[inline]
    pub(crate) fn has_no_deleted_and_growth_left(self) -> bool {
        (self.0 as isize) > 0
    }

    #[inline]
    pub(crate) fn has_no_growth_left_and_no_deleted(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub(crate) fn has_no_deleted(self) -> bool {
        (self.0 as isize) >= 0
    }

    #[inline]
    pub(crate) fn has_no_growth_left_assuming_may_have_deleted(self) -> bool {
        self.growth_left() == 0
    }

    #[inline]
    pub(crate) fn growth_left(self) -> usize {
        self.0 & GROWTH_LEFT_MASK
    }
}

impl core::fmt::Debug for GrowthInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GrowthInfo")
            .field("growth_left", &self.growth_left())
            .field("has_deleted", &!self.has_no_deleted())
            .finish()
    }
}
