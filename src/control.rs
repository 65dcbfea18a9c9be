//! Control bytes.
//!
//! Every slot has one control byte. A full slot stores the low 7 bits of its
//! element's hash (H2); the remaining states all have the top bit set so a
//! single sign test separates full from special bytes:
//!
//! | byte        | value  |
//! |-------------|--------|
//! | `EMPTY`     | `0x80` |
//! | `DELETED`   | `0xFE` |
//! | `SENTINEL`  | `0xFF` |
//! | full        | `0x00..=0x7F` |
//!
//! The control array has `capacity + 1 + NUM_CLONED_BYTES` bytes: the slots,
//! the sentinel at index `capacity`, and a copy of the first
//! `NUM_CLONED_BYTES` slots so that a group load starting at any position
//! `<= capacity` stays in bounds and sees the wrapped-around bytes.

use crate::group::Group;

/// Marks a slot that has never held an element since the last rehash.
pub(crate) const EMPTY: u8 = 0x80;
/// Marks a tombstone: a slot that held an element that has been erased.
pub(crate) const DELETED: u8 = 0xFE;
/// Terminates the control array for iteration. Never matched by a probe.
pub(crate) const SENTINEL: u8 = 0xFF;

/// Number of control bytes mirrored after the sentinel.
pub(crate) const NUM_CLONED_BYTES: usize = Group::WIDTH - 1;

#[inline(always)]
pub(crate) fn is_full(ctrl: u8) -> bool {
    ctrl & 0x80 == 0
}

#[inline(always)]
pub(crate) fn is_empty(ctrl: u8) -> bool {
    ctrl == EMPTY
}

#[inline(always)]
pub(crate) fn is_deleted(ctrl: u8) -> bool {
    ctrl == DELETED
}

#[inline(always)]
pub(crate) fn is_empty_or_deleted(ctrl: u8) -> bool {
    (ctrl as i8) < (SENTINEL as i8)
}

/// The 7-bit fingerprint stored in the control byte of a full slot.
#[inline(always)]
pub(crate) fn h2(hash: u64) -> u8 {
    (hash & 0x7F) as u8
}

/// The probe seed, mixed with the per-table seed so that iteration order
/// differs between tables holding the same elements.
#[inline(always)]
pub(crate) fn h1(hash: u64, seed: u16) -> usize {
    ((hash >> 7) as usize) ^ seed as usize
}

/// Total number of control bytes for a table of the given capacity.
#[inline]
pub(crate) const fn num_control_bytes(capacity: usize) -> usize {
    capacity + 1 + NUM_CLONED_BYTES
}

/// Index of the cloned copy of `index`, or `index` itself when the slot is not
/// part of the cloned prefix.
#[inline(always)]
pub(crate) fn mirror_index(index: usize, capacity: usize) -> usize {
    (index.wrapping_sub(NUM_CLONED_BYTES) & capacity) + (NUM_CLONED_BYTES & capacity)
}

/// Sets the control byte at `index` and its mirror.
///
/// # Safety
///
/// `ctrl` must point to a control array for `capacity`, and `index` must be
/// less than `capacity`.
#[inline(always)]
pub(crate) unsafe fn set_ctrl(ctrl: *mut u8, capacity: usize, index: usize, value: u8) {
    debug_assert!(index < capacity);
    // SAFETY: Both `index` and its mirror are within `num_control_bytes(capacity)`.
    unsafe {
        *ctrl.add(index) = value;
        *ctrl.add(mirror_index(index, capacity)) = value;
    }
}

/// Marks every slot empty and restores the sentinel.
///
/// # Safety
///
/// `ctrl` must point to a control array for `capacity`.
pub(crate) unsafe fn reset_ctrl(ctrl: *mut u8, capacity: usize) {
    // SAFETY: The control array is exactly `num_control_bytes(capacity)` long.
    unsafe {
        core::ptr::write_bytes(ctrl, EMPTY, num_control_bytes(capacity));
        *ctrl.add(capacity) = SENTINEL;
    }
}

/// Rewrites the control array for an in-place rehash: every `DELETED` byte
/// becomes `EMPTY` and every full byte becomes `DELETED`, after which the
/// `DELETED` bytes mark exactly the elements that still need to be placed.
///
/// # Safety
///
/// `ctrl` must point to a control array for `capacity`, and `capacity` must be
/// a valid capacity of at least `Group::WIDTH - 1`.
pub(crate) unsafe fn convert_deleted_to_empty_and_full_to_deleted(ctrl: *mut u8, capacity: usize) {
    debug_assert!(capacity >= Group::WIDTH - 1);
    debug_assert_eq!(unsafe { *ctrl.add(capacity) }, SENTINEL);

    let mut pos = 0;
    while pos < capacity {
        // SAFETY: `pos < capacity` and the array has `capacity + Group::WIDTH`
        // bytes, so the whole group is in bounds.
        unsafe {
            let group = Group::load(ctrl.add(pos));
            group.convert_special_to_empty_and_full_to_deleted(ctrl.add(pos));
        }
        pos += Group::WIDTH;
    }

    // SAFETY: The cloned tail starts right after the sentinel and is
    // `NUM_CLONED_BYTES` long; it does not overlap the prefix it copies since
    // `capacity >= NUM_CLONED_BYTES`.
    unsafe {
        core::ptr::copy_nonoverlapping(ctrl, ctrl.add(capacity + 1), NUM_CLONED_BYTES);
        *ctrl.add(capacity) = SENTINEL;
    }
}
