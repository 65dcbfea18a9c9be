//! Cursor validity tracking.
//!
//! A [`Cursor`] is a detached position in a table. Positions are only stable
//! until the table moves its elements, so each table carries an identity and
//! a generation counter that is bumped whenever elements move. Cursors record
//! both, and in debug builds (or with the `generations` feature) every cursor
//! operation checks them before touching the table. Bounds and occupancy are
//! checked in every build.
//!
//! With the `generations` feature, inserts that do not resize also rehash the
//! table at random, and bump the generation otherwise, so that code relying on
//! cursor stability across inserts fails quickly instead of occasionally.

#[cfg(any(debug_assertions, feature = "generations"))]
use core::sync::atomic::AtomicU32;
#[cfg(any(debug_assertions, feature = "generations"))]
use core::sync::atomic::Ordering;

const END_INDEX: usize = usize::MAX;
const DEFAULT_INDEX: usize = usize::MAX - 1;

#[cfg(any(debug_assertions, feature = "generations"))]
static NEXT_TABLE_ID: AtomicU32 = AtomicU32::new(1);

#[cfg(any(debug_assertions, feature = "generations"))]
fn next_table_id() -> u32 {
    loop {
        let id = NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed);
        // Zero is reserved for default-constructed cursors.
        if id != 0 {
            return id;
        }
    }
}

/// A detached position in a [`HashTable`].
///
/// Cursors are plain values: they do not borrow the table, so they can be
/// held across mutations and are validated when used. A cursor is
/// invalidated when the table moves its elements (growth, in-place rehash,
/// [`clear`], [`rehash`]), or when the element it points at is erased.
/// Erasing through one cursor does not invalidate cursors to other elements.
///
/// Using an invalid cursor panics. The panic message names the failure:
/// a `default-constructed` cursor, the `end()` cursor, an `erased` element,
/// a table that was `rehashed`, or a cursor from a `different hash table`.
/// The last two are only detectable in debug builds or with the
/// `generations` feature.
///
/// [`HashTable`]: crate::hash_table::HashTable
/// [`clear`]: crate::hash_table::HashTable::clear
/// [`rehash`]: crate::hash_table::HashTable::rehash
#[derive(Clone, Copy, Debug)]
pub struct Cursor {
    pub(crate) index: usize,
    #[cfg(any(debug_assertions, feature = "generations"))]
    table_id: u32,
    #[cfg(any(debug_assertions, feature = "generations"))]
    generation: u32,
}

impl Default for Cursor {
    /// A cursor that points nowhere. Any use other than comparison with
    /// another default cursor panics.
    fn default() -> Self {
        Cursor {
            index: DEFAULT_INDEX,
            #[cfg(any(debug_assertions, feature = "generations"))]
            table_id: 0,
            #[cfg(any(debug_assertions, feature = "generations"))]
            generation: 0,
        }
    }
}

impl Cursor {
    /// Whether this is a default-constructed cursor.
    pub fn is_default(&self) -> bool {
        self.index == DEFAULT_INDEX
    }

    #[inline(always)]
    pub(crate) fn is_end(&self) -> bool {
        self.index == END_INDEX
    }
}

/// The identity and generation of one table.
#[derive(Debug)]
pub(crate) struct GenerationInfo {
    #[cfg(any(debug_assertions, feature = "generations"))]
    table_id: u32,
    #[cfg(any(debug_assertions, feature = "generations"))]
    generation: u32,
    #[cfg(feature = "generations")]
    reserved_growth: usize,
}

#[cfg(feature = "generations")]
const RESERVED_GROWTH_JUST_RAN_OUT: usize = usize::MAX;

/// A table rehashes for bug detection when a random probe offset lands in
/// the first this-many slots.
#[cfg(feature = "generations")]
const REHASH_PROBABILITY_CONSTANT: usize = 16;

impl GenerationInfo {
    pub(crate) fn new() -> Self {
        GenerationInfo {
            #[cfg(any(debug_assertions, feature = "generations"))]
            table_id: next_table_id(),
            #[cfg(any(debug_assertions, feature = "generations"))]
            generation: 0,
            #[cfg(feature = "generations")]
            reserved_growth: 0,
        }
    }

    /// Invalidates every outstanding cursor.
    #[inline]
    pub(crate) fn bump(&mut self) {
        #[cfg(any(debug_assertions, feature = "generations"))]
        {
            self.generation = self.generation.wrapping_add(1);
        }
    }

    #[inline]
    pub(crate) fn cursor(&self, index: usize) -> Cursor {
        Cursor {
            index,
            #[cfg(any(debug_assertions, feature = "generations"))]
            table_id: self.table_id,
            #[cfg(any(debug_assertions, feature = "generations"))]
            generation: self.generation,
        }
    }

    #[inline]
    pub(crate) fn end_cursor(&self) -> Cursor {
        self.cursor(END_INDEX)
    }

    /// Panics unless `cursor` points at a position of this table. The caller
    /// still has to check that the slot is occupied.
    #[track_caller]
    pub(crate) fn check_dereferenceable(&self, cursor: Cursor, operation: &str) -> usize {
        if cursor.is_default() {
            panic!("{operation} called on default-constructed cursor");
        }
        if cursor.is_end() {
            panic!("{operation} called on end() cursor");
        }
        self.check_same_table(cursor, operation);
        #[cfg(any(debug_assertions, feature = "generations"))]
        if cursor.generation != self.generation {
            panic!(
                "{operation} called on invalid cursor: the table was rehashed since the cursor \
                 was created"
            );
        }
        cursor.index
    }

    /// Panics unless `a` and `b` can be compared: both default, or both from
    /// this table at its current generation. End cursors never go stale.
    #[track_caller]
    pub(crate) fn check_comparable(&self, a: Cursor, b: Cursor) {
        match (a.is_default(), b.is_default()) {
            (true, true) => return,
            (false, false) => {}
            _ => panic!(
                "invalid cursor comparison: comparing default-constructed cursor with \
                 non-default-constructed cursor"
            ),
        }
        for cursor in [a, b] {
            self.check_same_table(cursor, "cursor comparison");
            #[cfg(any(debug_assertions, feature = "generations"))]
            if !cursor.is_end() && cursor.generation != self.generation {
                panic!(
                    "invalid cursor comparison: the table was rehashed since the cursor was \
                     created"
                );
            }
        }
    }

    #[track_caller]
    #[inline]
    fn check_same_table(&self, _cursor: Cursor, _operation: &str) {
        #[cfg(any(debug_assertions, feature = "generations"))]
        {
            if _cursor.table_id != self.table_id {
                panic!("{_operation} called with a cursor from a different hash table");
            }
        }
    }

    /// Records a reservation of room for `reservation` elements when the
    /// table holds `size`.
    #[inline]
    pub(crate) fn reset_reserved_growth(&mut self, _reservation: usize, _size: usize) {
        #[cfg(feature = "generations")]
        {
            self.reserved_growth = _reservation.saturating_sub(_size);
        }
    }

    /// Called for every insert that does not resize. Consumes reserved growth
    /// if any, and otherwise invalidates outstanding cursors.
    #[inline]
    pub(crate) fn on_insert(&mut self) {
        #[cfg(feature = "generations")]
        {
            if self.reserved_growth == RESERVED_GROWTH_JUST_RAN_OUT {
                self.reserved_growth = 0;
            }
            if self.reserved_growth > 0 {
                self.reserved_growth -= 1;
                if self.reserved_growth == 0 {
                    self.reserved_growth = RESERVED_GROWTH_JUST_RAN_OUT;
                }
            } else {
                self.bump();
            }
        }
    }

    /// Whether the next insert should rehash the table even though it has
    /// room.
    #[cfg(feature = "generations")]
    #[inline]
    pub(crate) fn should_rehash_for_bug_detection(&self, capacity: usize) -> bool {
        if self.reserved_growth == RESERVED_GROWTH_JUST_RAN_OUT {
            return true;
        }
        if self.reserved_growth > 0 {
            return false;
        }
        random_offset(capacity) < REHASH_PROBABILITY_CONSTANT
    }

    #[cfg(not(feature = "generations"))]
    #[inline(always)]
    pub(crate) fn should_rehash_for_bug_detection(&self, _capacity: usize) -> bool {
        false
    }

    #[cfg(all(test, any(debug_assertions, feature = "generations")))]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

/// A pseudo-random slot offset in `0..=capacity`.
#[cfg(feature = "generations")]
fn random_offset(capacity: usize) -> usize {
    use core::sync::atomic::AtomicU64;

    static STATE: AtomicU64 = AtomicU64::new(0x9E37_79B9_7F4A_7C15);

    // splitmix64
    let mut z = STATE.fetch_add(0x9E37_79B9_7F4A_7C15, Ordering::Relaxed);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    z as usize & capacity
}
