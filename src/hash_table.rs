//! The SwissTable engine.
//!
//! [`HashTable`] is an open-addressing table that stores values of type `V`
//! in a flat slot array next to an array of one-byte control tags. Lookups
//! hash the key once, split the hash into a probe start (H1) and a 7-bit
//! fingerprint (H2), and scan a whole group of control bytes per step for
//! matching fingerprints. The caller supplies the hash and an equality
//! predicate for every operation, and a hasher for operations that may move
//! elements.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem;
use core::mem::MaybeUninit;
use core::ptr;
use core::ptr::NonNull;

use allocator_api2::alloc::Allocator;
use allocator_api2::alloc::Global;

use crate::capacity::CLEAR_REUSE_CAPACITY_LIMIT;
use crate::capacity::GrowthInfo;
use crate::capacity::capacity_overflow;
use crate::capacity::capacity_to_growth;
use crate::capacity::is_above_valid_size;
use crate::capacity::max_valid_size;
use crate::capacity::next_capacity;
use crate::capacity::normalize_capacity;
use crate::capacity::size_to_capacity;
use crate::common::CommonFields;
use crate::common::next_seed;
use crate::control::DELETED;
use crate::control::EMPTY;
use crate::control::SENTINEL;
use crate::control::convert_deleted_to_empty_and_full_to_deleted;
use crate::control::h1;
use crate::control::h2;
use crate::control::is_deleted;
use crate::control::is_empty;
use crate::control::is_empty_or_deleted;
use crate::control::is_full;
use crate::control::num_control_bytes;
use crate::control::reset_ctrl;
use crate::control::set_ctrl;
use crate::error::Fallibility;
use crate::error::TryReserveError;
use crate::generation::Cursor;
use crate::group::BitMask;
use crate::group::Group;
use crate::group::Mask;
use crate::layout::HeapArray;
use crate::layout::SOO_CAPACITY;
use crate::layout::Storage;
use crate::layout::soo_enabled;
use crate::probe::ProbeSeq;
use crate::reentrancy::DebugReentrancy;
use crate::sampling::HashtablezInfoHandle;
use crate::sampling::SampleParams;
use crate::scopeguard::ScopeGuard;
use crate::scopeguard::guard;

type Probe = ProbeSeq<{ Group::WIDTH }>;

const _: () = assert!(Group::WIDTH <= SOO_CTRL.len());

/// Control bytes presented by an inline table: one full slot, then the
/// sentinel.
static SOO_CTRL: [u8; 16] = {
    let mut ctrl = [EMPTY; 16];
    ctrl[0] = 0;
    ctrl[1] = SENTINEL;
    ctrl
};

/// Where an insert should go, and how far from its probe start that is.
#[derive(Clone, Copy, Debug)]
struct FindInfo {
    offset: usize,
    probe_length: usize,
}

/// Finds the first empty or deleted slot on the probe sequence of `hash`.
///
/// # Safety
///
/// `ctrl` must point to a control array for `capacity` that has at least one
/// empty or deleted slot.
#[inline]
unsafe fn find_first_non_full(ctrl: *const u8, capacity: usize, seed: u16, hash: u64) -> FindInfo {
    let mut seq = Probe::new(h1(hash, seed), capacity);
    loop {
        // SAFETY: `seq.offset() <= capacity`, and a group load at any offset up
        // to `capacity` stays within the cloned tail.
        let group = unsafe { Group::load(ctrl.add(seq.offset())) };
        if let Some(lane) = group.mask_empty_or_deleted().lowest_bit_set() {
            return FindInfo {
                offset: seq.offset_at(lane),
                probe_length: seq.index(),
            };
        }
        seq.next();
        debug_assert!(seq.index() <= capacity, "full table!");
    }
}

/// Whether the slot at `index` can be marked `EMPTY` on erase instead of
/// `DELETED`.
///
/// A slot may only become empty if no probe window containing it could have
/// been seen as completely full: otherwise some lookup may have continued
/// past this group and would now stop early.
///
/// # Safety
///
/// `ctrl` must point to a control array for `capacity`, and `index` must be
/// below `capacity`.
#[inline]
unsafe fn was_never_full(ctrl: *const u8, capacity: usize, index: usize) -> bool {
    if capacity < Group::WIDTH {
        return true;
    }
    let index_before = index.wrapping_sub(Group::WIDTH) & capacity;
    // SAFETY: Both offsets are below `capacity`.
    let (empty_after, empty_before) = unsafe {
        (
            Group::load(ctrl.add(index)).mask_empty(),
            Group::load(ctrl.add(index_before)).mask_empty(),
        )
    };

    empty_before.any_bit_set()
        && empty_after.any_bit_set()
        && empty_after.trailing_zeros() + empty_before.leading_zeros() < Group::WIDTH
}

/// Index of the first full slot at or after `index`, or `capacity` if none.
///
/// # Safety
///
/// `ctrl` must point to a control array for `capacity`, and `index` must be at
/// most `capacity`.
#[inline]
unsafe fn skip_empty_or_deleted(ctrl: *const u8, capacity: usize, mut index: usize) -> usize {
    // SAFETY: `index <= capacity`, and the run of empty or deleted bytes ends
    // at the sentinel at the latest.
    unsafe {
        while index < capacity && is_empty_or_deleted(*ctrl.add(index)) {
            index += Group::load(ctrl.add(index)).count_leading_empty_or_deleted();
        }
    }
    index
}

#[inline(always)]
fn infallible<T>(result: Result<T, TryReserveError>) -> T {
    match result {
        Ok(value) => value,
        Err(_) => unreachable!("infallible allocation reported an error"),
    }
}

/// Debug statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Number of slots
    pub capacity: usize,
    /// Elements that can be inserted before the next rehash
    pub growth_left: usize,
    /// Number of slots currently occupied
    pub occupied_slots: usize,
    /// Number of tombstones
    pub deleted_slots: usize,
    /// Number of never-used slots
    pub empty_slots: usize,
    /// Whether the element lives inline in the table header
    pub inline: bool,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Total number of bytes in the backing allocation
    pub total_bytes: usize,
    /// Bytes of slots that hold no element
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Slots: {} full, {} deleted, {} empty ({} growth left)",
            self.occupied_slots, self.deleted_slots, self.empty_slots, self.growth_left
        );
        println!("Inline: {}", self.inline);
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// A SwissTable hash table.
///
/// `HashTable<V>` stores values of type `V` and provides fast insertion,
/// lookup, and removal operations. Like [`hashbrown::HashTable`], it does not
/// hash anything itself: each operation takes the 64-bit hash of the key it
/// is looking for and an equality predicate, and operations that may move
/// elements take a `hasher` that recomputes the hash of a stored value.
///
/// Small values (at most two words, at most word-aligned) are kept inline
/// while the table holds at most one element, so a table that never grows
/// past one element never allocates.
///
/// [`hashbrown::HashTable`]: https://docs.rs/hashbrown/latest/hashbrown/struct.HashTable.html
///
/// ## Performance Characteristics
///
/// - **Memory**: 1 byte of control metadata per slot, plus the size of `V`.
///   At most 7/8 of the slots are full before the table grows.
/// - **Lookups** compare up to 16 control bytes per step with SSE2 (8 with
///   the portable implementation) and touch a slot only on a fingerprint
///   match.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use swiss_hash::hash_table::Entry;
/// # use swiss_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(100);
///
/// match table.entry(hash_id(123), |p: &Person| p.id == 123, |p| hash_id(p.id)) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(table.find(hash_id(123), |p| p.id == 123).unwrap().name, "Alice");
/// ```
pub struct HashTable<V, A: Allocator = Global> {
    common: CommonFields,
    storage: Storage<V>,
    infoz: HashtablezInfoHandle,
    reentrancy: DebugReentrancy,
    alloc: A,
    _marker: PhantomData<V>,
}

// SAFETY: The table owns its elements and its allocation like a `Vec<V, A>`.
unsafe impl<V: Send, A: Allocator + Send> Send for HashTable<V, A> {}
// SAFETY: Shared access only hands out `&V` and `&A`.
unsafe impl<V: Sync, A: Allocator + Sync> Sync for HashTable<V, A> {}

impl<V, A: Allocator> Debug for HashTable<V, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;
        use alloc::string::ToString;

        let ctrl: Vec<String> = match self.storage.heap() {
            None => Vec::new(),
            Some(heap) => {
                // SAFETY: The control array of a heap table has
                // `num_control_bytes(capacity)` initialized bytes.
                let bytes = unsafe {
                    core::slice::from_raw_parts(
                        heap.ctrl(),
                        num_control_bytes(self.common.capacity),
                    )
                };
                bytes
                    .chunks(Group::WIDTH)
                    .map(|w| {
                        w.iter()
                            .map(|&b| match b {
                                EMPTY => "..".to_string(),
                                DELETED => "xx".to_string(),
                                SENTINEL => "||".to_string(),
                                _ => format!("{b:02x}"),
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect()
            }
        };

        f.debug_struct("HashTable")
            .field("ctrl", &ctrl)
            .field("inline", &self.storage.is_inline())
            .field("len", &self.common.len())
            .field("capacity", &self.common.capacity)
            .field("growth_info", &self.common.growth_info)
            .field("seed", &self.common.seed())
            .field("sampled", &self.infoz.is_sampled())
            .finish()
    }
}

impl<V: Clone, A: Allocator + Clone> Clone for HashTable<V, A> {
    fn clone(&self) -> Self {
        let infoz = self
            .infoz
            .resample(Self::sample_params(self.infoz.key_size()));
        let mut new_table = Self::from_parts(self.alloc.clone(), infoz);
        let len = self.common.len();

        match &self.storage {
            Storage::Unallocated => {}
            Storage::Inline(slot) => {
                if len == 1 {
                    // SAFETY: An inline table with one element has it
                    // initialized.
                    let value = unsafe { slot.assume_init_ref() }.clone();
                    new_table.storage = Storage::Inline(MaybeUninit::new(value));
                    new_table.common.size.set_size(1);
                }
            }
            Storage::Heap(src) => {
                let capacity = self.common.capacity;
                let heap = infallible(HeapArray::<V>::allocate(
                    &new_table.alloc,
                    capacity,
                    Fallibility::Infallible,
                ));
                new_table.storage = Storage::Heap(heap);
                new_table.common.capacity = capacity;
                new_table.common.size.set_seed(self.common.seed());

                // SAFETY: Both arrays are for `capacity`. Elements are cloned
                // into the slots their control bytes mark full; if a clone
                // panics, the ones cloned so far are dropped and the new table
                // is left empty.
                unsafe {
                    ptr::copy_nonoverlapping(src.ctrl(), heap.ctrl(), num_control_bytes(capacity));

                    let mut cloned = guard(0usize, |cloned_upto| {
                        for index in RawIter::new(heap.ctrl(), capacity, len) {
                            if index >= *cloned_upto {
                                break;
                            }
                            heap.slot(index).drop_in_place();
                        }
                        reset_ctrl(heap.ctrl(), capacity);
                    });
                    for index in RawIter::new(src.ctrl(), capacity, len) {
                        heap.slot(index).write((*src.slot(index)).clone());
                        *cloned = index + 1;
                    }
                    ScopeGuard::into_inner(cloned);
                }

                new_table.common.size.set_size(len);
                new_table.common.growth_info = self.common.growth_info;
            }
        }

        new_table
            .infoz
            .record_storage_changed(len, new_table.common.capacity);
        new_table
    }
}

impl<V, A: Allocator> Drop for HashTable<V, A> {
    fn drop(&mut self) {
        // SAFETY: Every full slot holds an initialized element, and the
        // allocation is released with the capacity it was made for.
        unsafe {
            self.drop_elements();
            if let Storage::Heap(heap) = self.storage {
                heap.deallocate(&self.alloc, self.common.capacity);
            }
        }
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table. Does not allocate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<u64> = HashTable::new();
    /// assert!(table.is_empty());
    /// // Small values live inline until a second element arrives.
    /// assert_eq!(table.capacity(), 1);
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a table that can hold at least `capacity` elements without
    /// growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert!(table.growth_left() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_key_size(capacity, size_of::<V>())
    }

    /// Creates a table that is always recorded by `sampler` while `sampler`
    /// is enabled with a sample parameter of 1, and otherwise sampled at the
    /// configured rate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_hash::hash_table::HashTable;
    /// # use swiss_hash::sampling::HashtablezSampler;
    /// #
    /// static SAMPLER: HashtablezSampler = HashtablezSampler::new();
    /// SAMPLER.set_enabled(true);
    /// SAMPLER.set_sample_parameter(1);
    ///
    /// let table: HashTable<u64> = HashTable::with_capacity_sampled_by(0, &SAMPLER);
    /// assert_eq!(SAMPLER.len(), 1);
    /// drop(table);
    /// assert_eq!(SAMPLER.len(), 0);
    /// ```
    #[cfg(feature = "sampling")]
    pub fn with_capacity_sampled_by(
        capacity: usize,
        sampler: &'static crate::sampling::HashtablezSampler,
    ) -> Self {
        let infoz = HashtablezInfoHandle::sample(sampler, Self::sample_params(size_of::<V>()));
        Self::with_capacity_and_infoz(capacity, Global, infoz)
    }

    /// Creates a table whose sample record reports a key of `key_size` bytes.
    pub(crate) fn with_capacity_and_key_size(capacity: usize, key_size: usize) -> Self {
        let infoz = HashtablezInfoHandle::sample_global(Self::sample_params(key_size));
        Self::with_capacity_and_infoz(capacity, Global, infoz)
    }
}

impl<V, A: Allocator> HashTable<V, A> {
    /// Creates an empty table backed by `alloc`. Tables with a custom
    /// allocator are never sampled.
    pub fn new_in(alloc: A) -> Self {
        Self::with_capacity_in(0, alloc)
    }

    /// Creates a table backed by `alloc` that can hold at least `capacity`
    /// elements without growing.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::with_capacity_and_infoz(capacity, alloc, HashtablezInfoHandle::none())
    }

    fn sample_params(key_size: usize) -> SampleParams {
        SampleParams {
            inline_element_size: size_of::<V>(),
            key_size,
            value_size: size_of::<V>(),
            soo_capacity: if soo_enabled::<V>() { SOO_CAPACITY } else { 0 },
        }
    }

    fn from_parts(alloc: A, infoz: HashtablezInfoHandle) -> Self {
        let storage = Storage::empty();
        let mut common = CommonFields::new(if storage.is_inline() { SOO_CAPACITY } else { 0 });
        common.size.set_has_infoz(infoz.is_sampled());
        HashTable {
            common,
            storage,
            infoz,
            reentrancy: DebugReentrancy::new(),
            alloc,
            _marker: PhantomData,
        }
    }

    fn with_capacity_and_infoz(capacity: usize, alloc: A, infoz: HashtablezInfoHandle) -> Self {
        let mut table = Self::from_parts(alloc, infoz);
        if capacity > table.growth_left() {
            if is_above_valid_size(capacity, size_of::<V>()) {
                capacity_overflow();
            }
            let new_capacity = table.min_heap_capacity(size_to_capacity(capacity));
            infallible(table.allocate_empty(new_capacity, Fallibility::Infallible));
        }
        table
            .infoz
            .record_storage_changed(0, table.common.capacity);
        table
    }

    /// Sampled tables never use inline storage, so their first allocation
    /// is the one that would follow it.
    #[inline]
    fn min_heap_capacity(&self, capacity: usize) -> usize {
        if soo_enabled::<V>() && self.common.size.has_infoz() {
            capacity.max(next_capacity(SOO_CAPACITY))
        } else {
            capacity
        }
    }

    /// Gives an empty table without a heap allocation a fresh one.
    fn allocate_empty(&mut self, capacity: usize, fallibility: Fallibility) -> Result<(), TryReserveError> {
        debug_assert_eq!(self.common.len(), 0);
        debug_assert!(self.storage.heap().is_none());
        let heap = HeapArray::<V>::allocate(&self.alloc, capacity, fallibility)?;
        self.storage = Storage::Heap(heap);
        self.common.capacity = capacity;
        self.common
            .growth_info
            .init_growth_left_no_deleted(capacity_to_growth(capacity));
        Ok(())
    }

    /// Returns a reference to the underlying allocator.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns the number of elements in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(v: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     v.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// assert_eq!(table.len(), 0);
    /// table.insert_unique(hash_u64(1), 1u64, |v| hash_u64(*v));
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.common.len()
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.common.len() == 0
    }

    /// Returns the number of slots.
    ///
    /// This is always zero, one (inline storage), or one less than a power of
    /// two. The number of elements that fit before the table grows is
    /// [`growth_left`](Self::growth_left) plus [`len`](Self::len), which is
    /// at most 7/8 of the capacity for tables wider than a group.
    pub fn capacity(&self) -> usize {
        self.common.capacity
    }

    /// Returns how many more elements can be inserted before the table must
    /// grow or rehash.
    pub fn growth_left(&self) -> usize {
        match self.storage {
            Storage::Unallocated => 0,
            Storage::Inline(_) => {
                if self.common.size.has_infoz() {
                    0
                } else {
                    SOO_CAPACITY - self.common.len()
                }
            }
            Storage::Heap(_) => self.common.growth_info.growth_left(),
        }
    }

    /// The largest number of elements a table of `V` can ever hold.
    pub fn max_size(&self) -> usize {
        max_valid_size(size_of::<V>())
    }

    /// Whether this table's statistics are being recorded by a sampler.
    pub fn is_sampled(&self) -> bool {
        self.infoz.is_sampled()
    }

    /// Finds the value matching `eq` among those with hash `hash`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(hash_str("key"), "key".to_string(), |s| hash_str(s));
    ///
    /// assert_eq!(table.find(hash_str("key"), |s| s == "key").map(String::as_str), Some("key"));
    /// assert!(table.find(hash_str("missing"), |s| s == "missing").is_none());
    /// ```
    pub fn find(&self, hash: u64, mut eq: impl FnMut(&V) -> bool) -> Option<&V> {
        self.reentrancy.check();
        let index = self.find_index(hash, &mut eq)?;
        // SAFETY: `find_index` only returns full slots.
        Some(unsafe { &*self.storage.slot(index) })
    }

    /// Finds the value matching `eq` among those with hash `hash`, for
    /// modification. The modification must not change the value's hash or
    /// its equality with other values.
    pub fn find_mut(&mut self, hash: u64, mut eq: impl FnMut(&V) -> bool) -> Option<&mut V> {
        self.reentrancy.check();
        let index = self.find_index(hash, &mut eq)?;
        // SAFETY: `find_index` only returns full slots.
        Some(unsafe { &mut *self.storage.slot_mut(index) })
    }

    /// Returns `true` if a value matching `eq` is present.
    pub fn contains(&self, hash: u64, eq: impl FnMut(&V) -> bool) -> bool {
        self.find(hash, eq).is_some()
    }

    #[inline]
    fn find_index(&self, hash: u64, eq: &mut impl FnMut(&V) -> bool) -> Option<usize> {
        match &self.storage {
            Storage::Unallocated => None,
            Storage::Inline(slot) => {
                // SAFETY: An inline table with one element has it initialized.
                (self.common.len() == 1 && eq(unsafe { slot.assume_init_ref() })).then_some(0)
            }
            Storage::Heap(heap) => {
                let heap = *heap;
                let capacity = self.common.capacity;
                let mut seq = Probe::new(h1(hash, self.common.seed()), capacity);
                let tag = h2(hash);
                loop {
                    // SAFETY: Group loads at offsets up to `capacity` are in
                    // bounds, and matching lanes are full slots below
                    // `capacity`.
                    unsafe {
                        let group = Group::load(heap.ctrl().add(seq.offset()));
                        for lane in group.match_byte(tag) {
                            let index = seq.offset_at(lane);
                            if eq(&*heap.slot(index)) {
                                return Some(index);
                            }
                        }
                        if group.mask_empty().any_bit_set() {
                            return None;
                        }
                    }
                    seq.next();
                    debug_assert!(seq.index() <= capacity, "full table!");
                }
            }
        }
    }

    /// Gets the entry for the value matching `eq` among those with hash
    /// `hash`.
    ///
    /// If the value is absent, the table is made ready to take it, which may
    /// grow or rehash the table using `hasher`, before the vacant entry is
    /// returned. The value itself is only constructed when
    /// [`VacantEntry::insert`] is called.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<(String, u32)> = HashTable::new();
    ///
    /// for word in ["a", "b", "a"] {
    ///     table
    ///         .entry(hash_str(word), |(k, _)| k == word, |(k, _)| hash_str(k))
    ///         .or_insert_with(|| (word.to_string(), 0))
    ///         .1 += 1;
    /// }
    ///
    /// assert_eq!(table.find(hash_str("a"), |(k, _)| k == "a").unwrap().1, 2);
    /// assert_eq!(table.len(), 2);
    /// ```
    pub fn entry(
        &mut self,
        hash: u64,
        mut eq: impl FnMut(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Entry<'_, V, A> {
        self.reentrancy.check();
        match self.find_index(hash, &mut eq) {
            Some(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            None => {
                let slot = self.prepare_insert(hash, &hasher);
                Entry::Vacant(VacantEntry {
                    table: self,
                    hash,
                    slot,
                })
            }
        }
    }

    /// Inserts `value`, which must not be present, and returns a reference to
    /// it.
    pub fn insert_unique(&mut self, hash: u64, value: V, hasher: impl Fn(&V) -> u64) -> &mut V {
        self.reentrancy.check();
        let slot = self.prepare_insert(hash, &hasher);
        // SAFETY: `slot` was just prepared.
        unsafe {
            let index = self.commit_insert(slot, hash, value);
            &mut *self.storage.slot_mut(index)
        }
    }

    /// Inserts `value` unless a value matching `eq` is present.
    ///
    /// Returns a cursor to the matching or inserted value, and whether the
    /// insert happened. If it did not, `value` is dropped.
    pub fn insert(
        &mut self,
        hash: u64,
        value: V,
        mut eq: impl FnMut(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> (Cursor, bool) {
        self.reentrancy.check();
        if let Some(index) = self.find_index(hash, &mut eq) {
            return (self.common.generation.cursor(index), false);
        }
        let slot = self.prepare_insert(hash, &hasher);
        // SAFETY: `slot` was just prepared.
        let index = unsafe { self.commit_insert(slot, hash, value) };
        (self.common.generation.cursor(index), true)
    }

    /// Finds the slot a new element with `hash` goes in, growing or squashing
    /// tombstones first if needed. The slot is not marked full.
    fn prepare_insert(&mut self, hash: u64, hasher: &impl Fn(&V) -> u64) -> FindInfo {
        match self.storage {
            Storage::Inline(_) if self.common.len() == 0 && !self.common.size.has_infoz() => {
                return FindInfo {
                    offset: 0,
                    probe_length: 0,
                };
            }
            Storage::Inline(_) | Storage::Unallocated => {
                let target = self.min_heap_capacity(next_capacity(self.common.capacity));
                self.resize(target, hasher);
                return self.find_first_non_full(hash);
            }
            Storage::Heap(_) => {}
        }

        let capacity = self.common.capacity;
        if self.common.generation.should_rehash_for_bug_detection(capacity) {
            let target = if self.common.growth_info.growth_left() > 0 {
                capacity
            } else {
                next_capacity(capacity)
            };
            self.resize(target, hasher);
            return self.find_first_non_full(hash);
        }

        let growth_info = self.common.growth_info;
        if growth_info.has_no_deleted_and_growth_left() {
            return self.find_first_non_full(hash);
        }
        if growth_info.has_no_growth_left_and_no_deleted() {
            self.resize(next_capacity(capacity), hasher);
            return self.find_first_non_full(hash);
        }

        let target = self.find_first_non_full(hash);
        if growth_info.has_no_growth_left_assuming_may_have_deleted() && !self.ctrl_is_deleted(target.offset) {
            self.rehash_and_grow_if_necessary(hasher);
            return self.find_first_non_full(hash);
        }
        target
    }

    #[inline]
    fn find_first_non_full(&self, hash: u64) -> FindInfo {
        let Some(heap) = self.storage.heap() else {
            unreachable!("probe on a table without slots");
        };
        // SAFETY: Callers only probe heap tables that have room.
        unsafe { find_first_non_full(heap.ctrl(), self.common.capacity, self.common.seed(), hash) }
    }

    #[inline]
    fn ctrl_is_deleted(&self, index: usize) -> bool {
        match self.storage.heap() {
            // SAFETY: `index` comes from a probe of this table.
            Some(heap) => is_deleted(unsafe { *heap.ctrl().add(index) }),
            None => false,
        }
    }

    /// Marks `slot` full for `hash` and moves `value` into it.
    ///
    /// # Safety
    ///
    /// `slot` must come from `prepare_insert` for `hash`, with no mutation of
    /// the table in between.
    unsafe fn commit_insert(&mut self, slot: FindInfo, hash: u64, value: V) -> usize {
        let index = slot.offset;
        match &mut self.storage {
            Storage::Unallocated => unreachable!("insert into a table without slots"),
            Storage::Inline(inline) => {
                debug_assert_eq!(index, 0);
                debug_assert_eq!(self.common.len(), 0);
                inline.write(value);
            }
            Storage::Heap(heap) => {
                let heap = *heap;
                // SAFETY: `index` is an empty or deleted slot below `capacity`.
                unsafe {
                    let ctrl = heap.ctrl();
                    self.common
                        .growth_info
                        .overwrite_control_as_full(*ctrl.add(index));
                    set_ctrl(ctrl, self.common.capacity, index, h2(hash));
                    heap.slot(index).write(value);
                }
            }
        }
        self.common.size.increment_size();
        self.common.generation.on_insert();
        self.infoz.record_insert(hash, slot.probe_length);
        index
    }

    /// Removes the value matching `eq` and returns it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(v: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     v.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(hash_u64(7), 7u64, |v| hash_u64(*v));
    ///
    /// assert_eq!(table.remove(hash_u64(7), |v| *v == 7), Some(7));
    /// assert_eq!(table.remove(hash_u64(7), |v| *v == 7), None);
    /// ```
    pub fn remove(&mut self, hash: u64, mut eq: impl FnMut(&V) -> bool) -> Option<V> {
        self.reentrancy.check();
        let index = self.find_index(hash, &mut eq)?;
        // SAFETY: `find_index` only returns full slots.
        Some(unsafe { self.erase_at_index(index) })
    }

    /// Removes and drops the value matching `eq`. Returns whether one was
    /// present.
    pub fn erase(&mut self, hash: u64, eq: impl FnMut(&V) -> bool) -> bool {
        self.remove(hash, eq).is_some()
    }

    /// Moves the value at `index` out and frees its slot.
    ///
    /// # Safety
    ///
    /// `index` must be a full slot.
    unsafe fn erase_at_index(&mut self, index: usize) -> V {
        // SAFETY: Guaranteed by the caller.
        let value = unsafe { self.storage.slot(index).read() };
        // SAFETY: Guaranteed by the caller.
        unsafe { self.erase_meta_only(index) };
        value
    }

    /// Marks the full slot at `index` free without touching the element.
    ///
    /// # Safety
    ///
    /// `index` must be a full slot whose element has been moved out.
    unsafe fn erase_meta_only(&mut self, index: usize) {
        self.common.size.decrement_size();
        self.infoz.record_erase();

        if let Storage::Heap(heap) = self.storage {
            let capacity = self.common.capacity;
            let ctrl = heap.ctrl();
            // SAFETY: Guaranteed by the caller.
            unsafe {
                debug_assert!(is_full(*ctrl.add(index)), "erasing a dangling slot");
                if was_never_full(ctrl, capacity, index) {
                    set_ctrl(ctrl, capacity, index, EMPTY);
                    self.common.growth_info.overwrite_full_as_empty();
                } else {
                    self.common.growth_info.overwrite_full_as_deleted();
                    set_ctrl(ctrl, capacity, index, DELETED);
                }
            }
        }
    }

    /// Retains only the values for which `f` returns `true`, and returns how
    /// many were removed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(v: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     v.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// for i in 0..10u64 {
    ///     table.insert_unique(hash_u64(i), i, |v| hash_u64(*v));
    /// }
    ///
    /// assert_eq!(table.retain(|v| *v % 2 == 0), 5);
    /// assert_eq!(table.len(), 5);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool) -> usize {
        self.reentrancy.check();
        let mut erased = 0;
        for index in self.raw_iter() {
            let keep = {
                let _reentrancy = self.reentrancy.enter();
                // SAFETY: `index` is a full slot that has not been erased.
                f(unsafe { &mut *self.storage.slot_mut(index) })
            };
            if !keep {
                // SAFETY: `index` is a full slot.
                let value = unsafe { self.erase_at_index(index) };
                let _reentrancy = self.reentrancy.enter();
                drop(value);
                erased += 1;
            }
        }
        erased
    }

    /// Removes the values for which `f` returns `true` as the returned
    /// iterator is advanced. Values not yet visited when the iterator is
    /// dropped are kept.
    pub fn extract_if<F>(&mut self, f: F) -> ExtractIf<'_, V, F, A>
    where
        F: FnMut(&mut V) -> bool,
    {
        self.reentrancy.check();
        ExtractIf {
            iter: self.raw_iter(),
            table: self,
            f,
        }
    }

    /// Removes every value, returning them in an iterator. The allocation is
    /// kept.
    ///
    /// If the iterator is leaked, the table is left empty without its
    /// allocation and the remaining values are leaked.
    pub fn drain(&mut self) -> Drain<'_, V, A> {
        self.reentrancy.check();
        let iter = self.raw_iter();
        let storage = mem::replace(&mut self.storage, Storage::Unallocated);
        let capacity = mem::replace(&mut self.common.capacity, 0);
        self.common.size.set_size(0);
        self.common.growth_info = GrowthInfo::default();
        Drain {
            table: self,
            storage,
            capacity,
            iter,
        }
    }

    /// Removes every value.
    ///
    /// Tables with fewer than 128 slots keep their allocation; larger tables
    /// release it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(v: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     v.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// for i in 0..20u64 {
    ///     table.insert_unique(hash_u64(i), i, |v| hash_u64(*v));
    /// }
    /// let capacity = table.capacity();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        self.reentrancy.check();
        if self.common.capacity == 0 {
            return;
        }

        {
            let mut this = guard(&mut *self, |this| this.clear_no_drop());
            // SAFETY: Every full slot holds an initialized element, and the
            // guard resets the metadata afterwards.
            unsafe { this.drop_elements() };
        }

        if self.storage.heap().is_some() && self.common.capacity >= CLEAR_REUSE_CAPACITY_LIMIT {
            self.release_storage();
        }
        self.common.generation.bump();
        self.common.generation.reset_reserved_growth(0, 0);
        self.infoz.record_cleared_reservation();
        self.infoz.record_storage_changed(0, self.common.capacity);
    }

    /// Drops every element without touching the metadata.
    ///
    /// # Safety
    ///
    /// The metadata must be reset before the table is used again.
    unsafe fn drop_elements(&mut self) {
        if !mem::needs_drop::<V>() || self.common.len() == 0 {
            return;
        }
        let len = self.common.len();
        let HashTable {
            common,
            storage,
            reentrancy,
            ..
        } = self;
        let _reentrancy = reentrancy.enter();
        match storage {
            Storage::Unallocated => {}
            // SAFETY: An inline table with one element has it initialized.
            Storage::Inline(slot) => unsafe { slot.assume_init_drop() },
            Storage::Heap(heap) => {
                let heap = *heap;
                // SAFETY: The control bytes mark exactly `len` full slots.
                unsafe {
                    for index in RawIter::new(heap.ctrl(), common.capacity, len) {
                        heap.slot(index).drop_in_place();
                    }
                }
            }
        }
    }

    /// Marks every slot empty without dropping anything.
    fn clear_no_drop(&mut self) {
        self.common.size.set_size(0);
        if let Storage::Heap(heap) = self.storage {
            // SAFETY: The control array is for `capacity`.
            unsafe { reset_ctrl(heap.ctrl(), self.common.capacity) };
            self.common
                .growth_info
                .init_growth_left_no_deleted(capacity_to_growth(self.common.capacity));
        }
    }

    /// Frees the backing array of an empty table and returns to the storage
    /// of a new one.
    fn release_storage(&mut self) {
        debug_assert_eq!(self.common.len(), 0);
        if let Storage::Heap(heap) = self.storage {
            log::trace!(
                "releasing backing array of capacity {}",
                self.common.capacity
            );
            // SAFETY: The array was allocated for the current capacity and is
            // replaced below.
            unsafe { heap.deallocate(&self.alloc, self.common.capacity) };
        }
        self.storage = Storage::empty();
        self.common.capacity = if self.storage.is_inline() { SOO_CAPACITY } else { 0 };
        self.common.growth_info = GrowthInfo::default();
    }

    /// Reserves room for at least `additional` more elements without
    /// growing, and suppresses bug-detection rehashes for that many inserts
    /// under the `generations` feature.
    ///
    /// # Panics
    ///
    /// Panics with `"hash table size overflow"` if the new size is above
    /// [`max_size`](Self::max_size), and aborts if the allocation fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(v: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     v.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(10, |v| hash_u64(*v));
    /// let capacity = table.capacity();
    /// for i in 0..10u64 {
    ///     table.insert_unique(hash_u64(i), i, |v| hash_u64(*v));
    /// }
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn reserve(&mut self, additional: usize, hasher: impl Fn(&V) -> u64) {
        infallible(self.reserve_inner(additional, &hasher, Fallibility::Infallible));
    }

    /// Like [`reserve`](Self::reserve), but reports failure instead of
    /// panicking or aborting.
    pub fn try_reserve(
        &mut self,
        additional: usize,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<(), TryReserveError> {
        self.reserve_inner(additional, &hasher, Fallibility::Fallible)
    }

    fn reserve_inner(
        &mut self,
        additional: usize,
        hasher: &impl Fn(&V) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        self.reentrancy.check();
        let len = self.common.len();
        let Some(target) = len.checked_add(additional) else {
            return Err(fallibility.capacity_overflow());
        };

        if target > len + self.growth_left() {
            if is_above_valid_size(target, size_of::<V>()) {
                return Err(fallibility.capacity_overflow());
            }
            let new_capacity = self.min_heap_capacity(size_to_capacity(target));
            self.resize_inner(new_capacity, hasher, fallibility)?;
        }

        self.infoz.record_reservation(target);
        self.common.generation.reset_reserved_growth(target, len);
        Ok(())
    }

    /// Rehashes the table.
    ///
    /// With `n == 0` the table is rebuilt at the smallest capacity that holds
    /// its elements, even if that is the current capacity: an empty table
    /// releases its allocation, and a table of one small element moves back
    /// inline. With `n > 0` the table grows to hold at least `n` slots if it
    /// is smaller, and is otherwise unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(v: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     v.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// for i in 0..100u64 {
    ///     table.insert_unique(hash_u64(i), i, |v| hash_u64(*v));
    /// }
    /// table.retain(|v| *v == 0);
    ///
    /// table.rehash(0, |v| hash_u64(*v));
    /// assert_eq!(table.capacity(), 1);
    /// assert_eq!(table.find(hash_u64(0), |v| *v == 0), Some(&0));
    /// ```
    pub fn rehash(&mut self, n: usize, hasher: impl Fn(&V) -> u64) {
        self.reentrancy.check();
        let len = self.common.len();

        if n == 0 {
            if self.storage.heap().is_none() {
                return;
            }
            if len == 0 {
                self.release_storage();
                self.common.generation.bump();
                self.infoz
                    .record_storage_changed(0, self.common.capacity);
                return;
            }
            if soo_enabled::<V>() && len <= SOO_CAPACITY && !self.common.size.has_infoz() {
                self.move_to_inline();
                return;
            }
            let target = self.min_heap_capacity(size_to_capacity(len));
            self.resize(target, &hasher);
            return;
        }

        let target = normalize_capacity(n | size_to_capacity(len));
        if target > self.common.capacity {
            if is_above_valid_size(capacity_to_growth(target), size_of::<V>()) {
                capacity_overflow();
            }
            self.resize(self.min_heap_capacity(target), &hasher);
            self.infoz.record_reservation(n);
        }
    }

    /// Shrinks the table to the smallest capacity that holds its elements.
    /// Does nothing if it is already that small.
    pub fn shrink_to_fit(&mut self, hasher: impl Fn(&V) -> u64) {
        self.reentrancy.check();
        if self.storage.heap().is_none() {
            return;
        }
        let len = self.common.len();
        let min_capacity = if len == 0 {
            0
        } else if soo_enabled::<V>() && len <= SOO_CAPACITY && !self.common.size.has_infoz() {
            SOO_CAPACITY
        } else {
            self.min_heap_capacity(size_to_capacity(len))
        };
        if min_capacity < self.common.capacity {
            self.rehash(0, hasher);
        }
    }

    /// Moves the only element of a heap table into inline storage.
    fn move_to_inline(&mut self) {
        debug_assert_eq!(self.common.len(), 1);
        let Some(heap) = self.storage.heap() else {
            return;
        };
        let capacity = self.common.capacity;
        // SAFETY: The table holds exactly one element, which is moved out
        // before the array is released.
        unsafe {
            let Some(index) = RawIter::new(heap.ctrl(), capacity, 1).next() else {
                unreachable!("table of one element without a full slot");
            };
            let value = heap.slot(index).read();
            heap.deallocate(&self.alloc, capacity);
            self.storage = Storage::Inline(MaybeUninit::new(value));
        }
        self.common.capacity = SOO_CAPACITY;
        self.common.growth_info = GrowthInfo::default();
        self.common.generation.bump();
        self.infoz.record_storage_changed(1, SOO_CAPACITY);
    }

    #[inline]
    fn resize(&mut self, new_capacity: usize, hasher: &impl Fn(&V) -> u64) {
        infallible(self.resize_inner(new_capacity, hasher, Fallibility::Infallible));
    }

    /// Moves every element into a new array of `new_capacity` slots.
    ///
    /// The old storage keeps ownership of the elements until every element
    /// has been placed, so a panicking hasher only frees the new array.
    fn resize_inner(
        &mut self,
        new_capacity: usize,
        hasher: &impl Fn(&V) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        let len = self.common.len();
        debug_assert!(capacity_to_growth(new_capacity) >= len);

        let new_heap = HeapArray::<V>::allocate(&self.alloc, new_capacity, fallibility)?;
        let new_seed = next_seed();
        let old_capacity = self.common.capacity;
        let mut total_probe_length = 0;

        {
            let alloc = &self.alloc;
            let new_heap = guard(new_heap, |heap| {
                // SAFETY: Allocated above for `new_capacity`; nothing was
                // moved out of the old storage yet.
                unsafe { heap.deallocate(alloc, new_capacity) }
            });
            let _reentrancy = self.reentrancy.enter();

            let mut transfer = |src: *const V| {
                // SAFETY: `src` is an initialized element; the new array has
                // room for every element of the old one.
                unsafe {
                    let hash = hasher(&*src);
                    let target = find_first_non_full(new_heap.ctrl(), new_capacity, new_seed, hash);
                    set_ctrl(new_heap.ctrl(), new_capacity, target.offset, h2(hash));
                    ptr::copy_nonoverlapping(src, new_heap.slot(target.offset), 1);
                    total_probe_length += target.probe_length;
                }
            };

            match &self.storage {
                Storage::Unallocated => {}
                Storage::Inline(slot) => {
                    if len == 1 {
                        transfer(slot.as_ptr());
                    }
                }
                Storage::Heap(old) => {
                    // SAFETY: The control bytes mark exactly `len` full slots.
                    unsafe {
                        for index in RawIter::new(old.ctrl(), old_capacity, len) {
                            transfer(old.slot(index));
                        }
                    }
                }
            }

            ScopeGuard::into_inner(new_heap);
        }

        if let Storage::Heap(old) = self.storage {
            // SAFETY: Every element was bitwise moved to the new array.
            unsafe { old.deallocate(&self.alloc, old_capacity) };
        }
        self.storage = Storage::Heap(new_heap);
        self.common.capacity = new_capacity;
        self.common.size.set_seed(new_seed);
        self.common
            .growth_info
            .init_growth_left_no_deleted(capacity_to_growth(new_capacity) - len);
        self.common.generation.bump();
        self.infoz.record_storage_changed(len, new_capacity);
        self.infoz.record_rehash(total_probe_length);

        log::trace!("resized table from {old_capacity} to {new_capacity} slots ({len} elements)");
        Ok(())
    }

    /// Called when an insert finds no growth left but the table has
    /// tombstones. Squashes the tombstones in place if the table is at most
    /// 25/32 full, and grows it otherwise.
    fn rehash_and_grow_if_necessary(&mut self, hasher: &impl Fn(&V) -> u64) {
        let capacity = self.common.capacity;
        if capacity > Group::WIDTH && (self.common.len() as u64) * 32 <= (capacity as u64) * 25 {
            self.drop_deletes_without_resize(hasher);
            // Under the 3/4 density a squash can leave the table exactly full.
            if self.common.growth_info.growth_left() > 0 {
                return;
            }
        }
        self.resize(next_capacity(capacity), hasher);
    }

    /// Rehashes in place, turning every tombstone back into an empty slot.
    ///
    /// Every full slot is first marked `DELETED` and every tombstone `EMPTY`,
    /// so that `DELETED` means "not yet placed". Each pending element then
    /// either stays put (its slot is already in the best group of its probe
    /// sequence), moves to an empty slot, or swaps with another pending
    /// element, which is then placed in turn.
    fn drop_deletes_without_resize(&mut self, hasher: &impl Fn(&V) -> u64) {
        let Some(heap) = self.storage.heap() else {
            return;
        };
        let capacity = self.common.capacity;
        debug_assert!(capacity > Group::WIDTH);
        let seed = self.common.seed();
        let ctrl = heap.ctrl();

        let HashTable {
            common,
            reentrancy,
            infoz,
            ..
        } = self;

        let mut total_probe_length = 0;
        // SAFETY: `capacity > Group::WIDTH`, and every access below is to a
        // slot below `capacity`.
        unsafe {
            convert_deleted_to_empty_and_full_to_deleted(ctrl, capacity);

            // If the hasher panics, the elements that were not placed yet are
            // dropped so that the table stays consistent.
            let placing = guard(&mut *common, |common| {
                for i in 0..capacity {
                    if is_deleted(*ctrl.add(i)) {
                        set_ctrl(ctrl, capacity, i, EMPTY);
                        heap.slot(i).drop_in_place();
                        common.size.decrement_size();
                    }
                }
                common
                    .growth_info
                    .init_growth_left_no_deleted(capacity_to_growth(capacity) - common.len());
            });
            let _reentrancy = reentrancy.enter();

            let mut i = 0;
            while i < capacity {
                if !is_deleted(*ctrl.add(i)) {
                    i += 1;
                    continue;
                }

                let hash = hasher(&*heap.slot(i));
                let target = find_first_non_full(ctrl, capacity, seed, hash);
                let new_i = target.offset;
                total_probe_length += target.probe_length;

                let probe_offset = h1(hash, seed) & capacity;
                let probe_index =
                    |pos: usize| (pos.wrapping_sub(probe_offset) & capacity) / Group::WIDTH;

                if probe_index(new_i) == probe_index(i) {
                    set_ctrl(ctrl, capacity, i, h2(hash));
                    i += 1;
                    continue;
                }

                if is_empty(*ctrl.add(new_i)) {
                    set_ctrl(ctrl, capacity, new_i, h2(hash));
                    ptr::copy_nonoverlapping(heap.slot(i), heap.slot(new_i), 1);
                    set_ctrl(ctrl, capacity, i, EMPTY);
                    i += 1;
                } else {
                    debug_assert!(is_deleted(*ctrl.add(new_i)));
                    set_ctrl(ctrl, capacity, new_i, h2(hash));
                    ptr::swap_nonoverlapping(heap.slot(i), heap.slot(new_i), 1);
                    // Slot `i` now holds the displaced element; place it next.
                }
            }

            ScopeGuard::into_inner(placing);
        }

        let tombstones = capacity_to_growth(capacity) - common.len() - common.growth_info.growth_left();
        common
            .growth_info
            .init_growth_left_no_deleted(capacity_to_growth(capacity) - common.len());
        common.generation.bump();
        infoz.record_rehash(total_probe_length);

        log::trace!("squashed {tombstones} tombstones in place at capacity {capacity}");
    }

    /// An iterator over the indices of full slots.
    #[inline]
    fn raw_iter(&self) -> RawIter {
        let len = self.common.len();
        // SAFETY: The control bytes mark exactly `len` full slots, and the
        // heap array outlives every use of the iterator by the table's
        // borrow.
        unsafe {
            match self.storage {
                Storage::Unallocated => RawIter::empty(),
                Storage::Inline(_) => RawIter::new(SOO_CTRL.as_ptr(), SOO_CAPACITY, len),
                Storage::Heap(heap) => RawIter::new(heap.ctrl(), self.common.capacity, len),
            }
        }
    }

    #[inline]
    fn slots_ptr(&self) -> *const V {
        match &self.storage {
            Storage::Unallocated => NonNull::dangling().as_ptr(),
            Storage::Inline(slot) => slot.as_ptr(),
            Storage::Heap(heap) => heap.slots(),
        }
    }

    #[inline]
    fn slots_ptr_mut(&mut self) -> *mut V {
        match &mut self.storage {
            Storage::Unallocated => NonNull::dangling().as_ptr(),
            Storage::Inline(slot) => slot.as_mut_ptr(),
            Storage::Heap(heap) => heap.slots(),
        }
    }

    /// Returns an iterator over the values in the table.
    ///
    /// The iteration order is unspecified and differs between tables with
    /// the same contents.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(v: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     v.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// for i in 1..=3u64 {
    ///     table.insert_unique(hash_u64(i), i, |v| hash_u64(*v));
    /// }
    /// assert_eq!(table.iter().sum::<u64>(), 6);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            iter: self.raw_iter(),
            slots: self.slots_ptr(),
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over mutable references to the values. The
    /// mutation must not change a value's hash or equality.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            iter: self.raw_iter(),
            slots: self.slots_ptr_mut(),
            _marker: PhantomData,
        }
    }

    /// Calls `f` with every value.
    pub fn for_each(&self, mut f: impl FnMut(&V)) {
        let _reentrancy = self.reentrancy.enter();
        let len = self.common.len();
        for value in self.iter() {
            f(value);
        }
        debug_assert_eq!(self.common.len(), len, "hash table was modified unexpectedly");
    }

    /// Calls `f` with a mutable reference to every value. The mutation must
    /// not change a value's hash or equality.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut V)) {
        let iter = self.raw_iter();
        let slots = self.slots_ptr_mut();
        let len = self.common.len();
        let _reentrancy = self.reentrancy.enter();
        for index in iter {
            // SAFETY: `index` is a full slot, and each slot is visited once.
            f(unsafe { &mut *slots.add(index) });
        }
        debug_assert_eq!(self.common.len(), len, "hash table was modified unexpectedly");
    }

    /// A cursor to the first value, or the end cursor if the table is empty.
    pub fn cursor_begin(&self) -> Cursor {
        match self.next_full_from(0) {
            Some(index) => self.common.generation.cursor(index),
            None => self.common.generation.end_cursor(),
        }
    }

    /// The cursor one past the last value.
    pub fn cursor_end(&self) -> Cursor {
        self.common.generation.end_cursor()
    }

    /// A cursor to the value matching `eq`, or the end cursor if there is
    /// none.
    pub fn find_cursor(&self, hash: u64, mut eq: impl FnMut(&V) -> bool) -> Cursor {
        self.reentrancy.check();
        match self.find_index(hash, &mut eq) {
            Some(index) => self.common.generation.cursor(index),
            None => self.common.generation.end_cursor(),
        }
    }

    /// The value at `cursor`.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is default-constructed, the end cursor, points at
    /// an erased value, or (in debug builds and with the `generations`
    /// feature) was created before the table last moved its elements or by a
    /// different table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(v: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     v.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// let (cursor, inserted) = table.insert(hash_u64(5), 5u64, |v| *v == 5, |v| hash_u64(*v));
    /// assert!(inserted);
    /// assert_eq!(*table.get_at(cursor), 5);
    ///
    /// assert_eq!(table.erase_at(cursor), 5);
    /// assert!(table.is_empty());
    /// ```
    #[track_caller]
    pub fn get_at(&self, cursor: Cursor) -> &V {
        let index = self.check_cursor(cursor, "get_at");
        // SAFETY: `check_cursor` verified that the slot is full.
        unsafe { &*self.storage.slot(index) }
    }

    /// The value at `cursor`, for modification. Panics like
    /// [`get_at`](Self::get_at).
    #[track_caller]
    pub fn get_at_mut(&mut self, cursor: Cursor) -> &mut V {
        let index = self.check_cursor(cursor, "get_at_mut");
        // SAFETY: `check_cursor` verified that the slot is full.
        unsafe { &mut *self.storage.slot_mut(index) }
    }

    /// The cursor to the value after the one at `cursor`, or the end cursor.
    /// Panics like [`get_at`](Self::get_at).
    #[track_caller]
    pub fn advance(&self, cursor: Cursor) -> Cursor {
        let index = self.check_cursor(cursor, "advance");
        match self.next_full_from(index + 1) {
            Some(next) => self.common.generation.cursor(next),
            None => self.common.generation.end_cursor(),
        }
    }

    /// Removes and returns the value at `cursor`. Cursors to other values
    /// stay valid. Panics like [`get_at`](Self::get_at).
    #[track_caller]
    pub fn erase_at(&mut self, cursor: Cursor) -> V {
        self.reentrancy.check();
        let index = self.check_cursor(cursor, "erase_at");
        // SAFETY: `check_cursor` verified that the slot is full.
        unsafe { self.erase_at_index(index) }
    }

    /// Whether two cursors of this table point at the same position.
    ///
    /// # Panics
    ///
    /// Panics if exactly one of them is default-constructed, or (in debug
    /// builds and with the `generations` feature) if either is stale or from
    /// a different table.
    #[track_caller]
    pub fn cursors_eq(&self, a: Cursor, b: Cursor) -> bool {
        self.common.generation.check_comparable(a, b);
        a.index == b.index
    }

    /// Whether `cursor` is the end cursor of this table.
    #[track_caller]
    pub fn is_end(&self, cursor: Cursor) -> bool {
        self.cursors_eq(cursor, self.cursor_end())
    }

    #[track_caller]
    fn check_cursor(&self, cursor: Cursor, operation: &str) -> usize {
        let index = self
            .common
            .generation
            .check_dereferenceable(cursor, operation);
        if !self.is_full_at(index) {
            panic!("{operation} called on invalid cursor: the element was likely erased");
        }
        index
    }

    #[inline]
    fn is_full_at(&self, index: usize) -> bool {
        match self.storage {
            Storage::Unallocated => false,
            Storage::Inline(_) => index == 0 && self.common.len() == 1,
            Storage::Heap(heap) => {
                // SAFETY: Bounds checked first.
                index < self.common.capacity && is_full(unsafe { *heap.ctrl().add(index) })
            }
        }
    }

    fn next_full_from(&self, index: usize) -> Option<usize> {
        match self.storage {
            Storage::Unallocated => None,
            Storage::Inline(_) => (index == 0 && self.common.len() == 1).then_some(0),
            Storage::Heap(heap) => {
                let capacity = self.common.capacity;
                if index >= capacity {
                    return None;
                }
                // SAFETY: `index < capacity`.
                let next = unsafe { skip_empty_or_deleted(heap.ctrl(), capacity, index) };
                (next < capacity).then_some(next)
            }
        }
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let capacity = self.common.capacity;
        let (mut occupied_slots, mut deleted_slots, mut empty_slots) = (0, 0, 0);
        let mut total_bytes = 0;

        match self.storage {
            Storage::Unallocated => {}
            Storage::Inline(_) => {
                occupied_slots = self.common.len();
                empty_slots = SOO_CAPACITY - self.common.len();
            }
            Storage::Heap(heap) => {
                for i in 0..capacity {
                    // SAFETY: `i < capacity`.
                    match unsafe { *heap.ctrl().add(i) } {
                        EMPTY => empty_slots += 1,
                        DELETED => deleted_slots += 1,
                        _ => occupied_slots += 1,
                    }
                }
                total_bytes = crate::layout::TableLayout::new::<V>(capacity)
                    .map_or(0, |layout| layout.layout.size());
            }
        }

        DebugStats {
            populated: self.common.len(),
            capacity,
            growth_left: self.growth_left(),
            occupied_slots,
            deleted_slots,
            empty_slots,
            inline: self.storage.is_inline(),
            load_factor: if capacity == 0 {
                0.0
            } else {
                self.common.len() as f64 / capacity as f64
            },
            total_bytes,
            wasted_bytes: if total_bytes == 0 {
                0
            } else {
                (capacity - occupied_slots) * size_of::<V>()
            },
        }
    }

    /// Computes a histogram of probe lengths, in groups.
    ///
    /// Bin `i` counts the values found in the `i`-th group of their probe
    /// sequence. The histogram is as long as the longest probe.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self, hasher: impl Fn(&V) -> u64) -> Vec<usize> {
        let mut hist = alloc::vec![0usize; 1];
        let Some(heap) = self.storage.heap() else {
            hist[0] = self.common.len();
            return hist;
        };

        let capacity = self.common.capacity;
        let seed = self.common.seed();
        for index in self.raw_iter() {
            // SAFETY: `index` is a full slot.
            let hash = hasher(unsafe { &*heap.slot(index) });
            let probe_offset = h1(hash, seed) & capacity;
            let mut seq = Probe::new(probe_offset, capacity);
            let mut groups = 0;
            while (index.wrapping_sub(seq.offset()) & capacity) >= Group::WIDTH {
                seq.next();
                groups += 1;
            }
            if hist.len() <= groups {
                hist.resize(groups + 1, 0);
            }
            hist[groups] += 1;
        }

        hist
    }

    /// Number of groups probed before the value matching `eq` is found, or
    /// before an empty slot proves it absent.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn num_probes(&self, hash: u64, mut eq: impl FnMut(&V) -> bool) -> usize {
        let Some(heap) = self.storage.heap() else {
            return 0;
        };
        let capacity = self.common.capacity;
        let mut seq = Probe::new(h1(hash, self.common.seed()), capacity);
        let mut probes = 0;
        loop {
            // SAFETY: Group loads at offsets up to `capacity` are in bounds.
            unsafe {
                let group = Group::load(heap.ctrl().add(seq.offset()));
                for lane in group.match_byte(h2(hash)) {
                    if eq(&*heap.slot(seq.offset_at(lane))) {
                        return probes;
                    }
                }
                if group.mask_empty().any_bit_set() {
                    return probes;
                }
            }
            seq.next();
            probes += 1;
        }
    }

    /// Pretty-prints the probe-length histogram horizontally using stdout.
    ///
    /// Requires the `std` feature, and is available in tests and with the
    /// `stats` feature.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_probe_histogram(&self, hasher: impl Fn(&V) -> u64) {
        let hist = self.probe_histogram(hasher);
        let max = *hist.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.common.len());

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let full = units / 8;
            let rem = units % 8;
            let mut bar = "█".repeat(full);
            if rem > 0 {
                let ch = match rem {
                    1 => '▏',
                    2 => '▎',
                    3 => '▍',
                    4 => '▌',
                    5 => '▋',
                    6 => '▊',
                    _ => '▉',
                };
                bar.push(ch);
            }
            bar
        };

        for (i, &count) in hist.iter().enumerate() {
            println!("{:>2} | {} ({})", i, make_bar(count), count);
        }
    }
}

impl<V, A: Allocator> IntoIterator for HashTable<V, A> {
    type IntoIter = IntoIter<V, A>;
    type Item = V;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            iter: self.raw_iter(),
            table: self,
        }
    }
}

impl<'a, V, A: Allocator> IntoIterator for &'a HashTable<V, A> {
    type IntoIter = Iter<'a, V>;
    type Item = &'a V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V, A: Allocator> IntoIterator for &'a mut HashTable<V, A> {
    type IntoIter = IterMut<'a, V>;
    type Item = &'a mut V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
///
/// # Examples
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use swiss_hash::hash_table::Entry;
/// # use swiss_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_str(s: &str) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     s.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(10);
/// let hash = hash_str("key");
///
/// match table.entry(hash, |s: &String| s == "key", |s| hash_str(s)) {
///     Entry::Vacant(entry) => {
///         entry.insert("key".to_string());
///     }
///     Entry::Occupied(entry) => {
///         println!("Key already exists with value: {}", entry.get());
///     }
/// }
/// ```
pub enum Entry<'a, V, A: Allocator = Global> {
    /// A vacant entry - the key is not present in the table
    Vacant(VacantEntry<'a, V, A>),
    /// An occupied entry - the key is present in the table
    Occupied(OccupiedEntry<'a, V, A>),
}

impl<'a, V, A: Allocator> Entry<'a, V, A> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use swiss_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// let hash = hash_str("key");
    ///
    /// let value = table
    ///     .entry(hash, |s: &String| s == "key", |s| hash_str(s))
    ///     .or_insert("key".to_string());
    /// assert_eq!(value, "key");
    /// ```
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the value returned by `default` if the entry is vacant. The
    /// closure is not called for an occupied entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Calls `f` with the value of an occupied entry.
    pub fn and_modify(mut self, f: impl FnOnce(&mut V)) -> Self {
        if let Entry::Occupied(entry) = &mut self {
            f(entry.get_mut());
        }
        self
    }
}

impl<'a, V: Default, A: Allocator> Entry<'a, V, A> {
    /// Inserts `V::default()` if the entry is vacant.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in a [`HashTable`]. The table already has room
/// for the value.
///
/// This struct is created by the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub struct VacantEntry<'a, V, A: Allocator = Global> {
    table: &'a mut HashTable<V, A>,
    hash: u64,
    slot: FindInfo,
}

impl<'a, V, A: Allocator> VacantEntry<'a, V, A> {
    /// Inserts `value` and returns a mutable reference to it.
    ///
    /// `value` must match the equality predicate and hash the entry was
    /// looked up with.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        // SAFETY: The slot was prepared by `entry`, and the table has not
        // been touched since, as the entry holds its only borrow.
        unsafe {
            let index = table.commit_insert(self.slot, self.hash, value);
            &mut *table.storage.slot_mut(index)
        }
    }

    /// Like [`insert`](Self::insert), but returns a cursor to the value.
    pub fn insert_with_cursor(self, value: V) -> Cursor {
        let table = self.table;
        // SAFETY: As in `insert`.
        let index = unsafe { table.commit_insert(self.slot, self.hash, value) };
        table.common.generation.cursor(index)
    }
}

/// A view into an occupied entry in a [`HashTable`].
///
/// This struct is created by the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub struct OccupiedEntry<'a, V, A: Allocator = Global> {
    table: &'a mut HashTable<V, A>,
    index: usize,
}

impl<'a, V, A: Allocator> OccupiedEntry<'a, V, A> {
    /// Gets a reference to the value.
    pub fn get(&self) -> &V {
        // SAFETY: The entry points at a full slot.
        unsafe { &*self.table.storage.slot(self.index) }
    }

    /// Gets a mutable reference to the value.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: The entry points at a full slot.
        unsafe { &mut *self.table.storage.slot_mut(self.index) }
    }

    /// Converts the entry into a mutable reference with the lifetime of the
    /// table borrow.
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: The entry points at a full slot.
        unsafe { &mut *self.table.storage.slot_mut(self.index) }
    }

    /// Replaces the value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }

    /// Removes the value from the table and returns it.
    pub fn remove(self) -> V {
        // SAFETY: The entry points at a full slot.
        unsafe { self.table.erase_at_index(self.index) }
    }

    /// A cursor to this value.
    pub fn cursor(&self) -> Cursor {
        self.table.common.generation.cursor(self.index)
    }
}

/// Yields the indices of full slots, a group at a time.
#[derive(Clone)]
struct RawIter {
    ctrl: *const u8,
    capacity: usize,
    pos: usize,
    current: Mask,
    remaining: usize,
}

impl RawIter {
    /// # Safety
    ///
    /// `ctrl` must point to a control array for `capacity` with exactly `len`
    /// full slots, which must stay valid while the iterator is in use.
    #[inline]
    unsafe fn new(ctrl: *const u8, capacity: usize, len: usize) -> Self {
        let current = if len == 0 {
            BitMask(0)
        } else {
            // SAFETY: Guaranteed by the caller.
            unsafe { Group::load(ctrl).mask_full() }
        };
        RawIter {
            ctrl,
            capacity,
            pos: 0,
            current,
            remaining: len,
        }
    }

    #[inline]
    fn empty() -> Self {
        RawIter {
            ctrl: ptr::null(),
            capacity: 0,
            pos: 0,
            current: BitMask(0),
            remaining: 0,
        }
    }
}

impl Iterator for RawIter {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(lane) = self.current.next() {
                let index = self.pos + lane;
                // Lanes past the sentinel are clones of earlier slots.
                if index < self.capacity {
                    self.remaining -= 1;
                    return Some(index);
                }
                continue;
            }
            self.pos += Group::WIDTH;
            debug_assert!(self.pos < self.capacity);
            // SAFETY: `pos < capacity` while full slots remain.
            self.current = unsafe { Group::load(self.ctrl.add(self.pos)).mask_full() };
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RawIter {}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V> {
    iter: RawIter,
    slots: *const V,
    _marker: PhantomData<&'a V>,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Iter {
            iter: self.iter.clone(),
            slots: self.slots,
            _marker: PhantomData,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let index = self.iter.next()?;
        // SAFETY: `index` is a full slot of the borrowed table.
        Some(unsafe { &*self.slots.add(index) })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

// SAFETY: `Iter` only hands out shared references.
unsafe impl<V: Sync> Send for Iter<'_, V> {}
// SAFETY: As above.
unsafe impl<V: Sync> Sync for Iter<'_, V> {}

/// A mutable iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter_mut`] method on [`HashTable`].
///
/// [`iter_mut`]: HashTable::iter_mut
pub struct IterMut<'a, V> {
    iter: RawIter,
    slots: *mut V,
    _marker: PhantomData<&'a mut V>,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let index = self.iter.next()?;
        // SAFETY: `index` is a full slot of the exclusively borrowed table,
        // and each slot is yielded once.
        Some(unsafe { &mut *self.slots.add(index) })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}
impl<V> FusedIterator for IterMut<'_, V> {}

// SAFETY: `IterMut` behaves like `&mut V`.
unsafe impl<V: Send> Send for IterMut<'_, V> {}
// SAFETY: As above.
unsafe impl<V: Sync> Sync for IterMut<'_, V> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V, A: Allocator = Global> {
    iter: RawIter,
    table: HashTable<V, A>,
}

impl<V, A: Allocator> Iterator for IntoIter<V, A> {
    type Item = V;

    #[inline]
    fn next(&mut self) -> Option<V> {
        let index = self.iter.next()?;
        // SAFETY: Each full slot is read once; the table forgets its
        // elements when the iterator is dropped.
        Some(unsafe { self.table.storage.slot(index).read() })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<V, A: Allocator> ExactSizeIterator for IntoIter<V, A> {}
impl<V, A: Allocator> FusedIterator for IntoIter<V, A> {}

// SAFETY: `IntoIter` owns the table and its values.
unsafe impl<V: Send, A: Allocator + Send> Send for IntoIter<V, A> {}
// SAFETY: As above.
unsafe impl<V: Sync, A: Allocator + Sync> Sync for IntoIter<V, A> {}

impl<V, A: Allocator> Drop for IntoIter<V, A> {
    fn drop(&mut self) {
        // The table forgets its elements even if a destructor panics.
        let mut this = guard(self, |this| this.table.clear_no_drop());
        while let Some(value) = this.next() {
            drop(value);
        }
    }
}

/// A draining iterator over the values of a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
/// The table is empty while the iterator is alive and keeps its allocation
/// afterwards.
///
/// [`drain`]: HashTable::drain
///
/// # Examples
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use swiss_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_str(s: &str) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     s.hash(&mut hasher);
/// #     hasher.finish()
/// # }
/// #
/// let mut table = HashTable::with_capacity(10);
/// table
///     .entry(hash_str("a"), |s: &String| s == "a", |s| hash_str(s))
///     .or_insert("a".to_string());
/// table
///     .entry(hash_str("b"), |s: &String| s == "b", |s| hash_str(s))
///     .or_insert("b".to_string());
///
/// let values: Vec<String> = table.drain().collect();
/// assert!(table.is_empty());
/// assert_eq!(values.len(), 2);
/// ```
pub struct Drain<'a, V, A: Allocator = Global> {
    table: &'a mut HashTable<V, A>,
    storage: Storage<V>,
    capacity: usize,
    iter: RawIter,
}

impl<V, A: Allocator> Drain<'_, V, A> {
    /// Puts the emptied storage back into the table.
    fn restore(&mut self) {
        if let Storage::Heap(heap) = self.storage {
            // SAFETY: The control array is for `self.capacity`.
            unsafe { reset_ctrl(heap.ctrl(), self.capacity) };
            self.table
                .common
                .growth_info
                .init_growth_left_no_deleted(capacity_to_growth(self.capacity));
        }
        self.table.storage = mem::replace(&mut self.storage, Storage::Unallocated);
        self.table.common.capacity = self.capacity;
        self.table.common.generation.bump();
        self.table
            .infoz
            .record_storage_changed(0, self.capacity);
    }
}

impl<V, A: Allocator> Iterator for Drain<'_, V, A> {
    type Item = V;

    #[inline]
    fn next(&mut self) -> Option<V> {
        let index = self.iter.next()?;
        // SAFETY: Each full slot is read once; `restore` marks them all
        // empty.
        Some(unsafe { self.storage.slot(index).read() })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<V, A: Allocator> ExactSizeIterator for Drain<'_, V, A> {}
impl<V, A: Allocator> FusedIterator for Drain<'_, V, A> {}

// SAFETY: `Drain` owns the values it yields and borrows the table
// exclusively.
unsafe impl<V: Send, A: Allocator + Send> Send for Drain<'_, V, A> {}
// SAFETY: As above.
unsafe impl<V: Sync, A: Allocator + Sync> Sync for Drain<'_, V, A> {}

impl<V, A: Allocator> Drop for Drain<'_, V, A> {
    fn drop(&mut self) {
        // Restores the table even if a value's destructor panics.
        let mut this = guard(self, |this| this.restore());
        while let Some(value) = this.next() {
            drop(value);
        }
    }
}

/// A draining, filtering iterator over the values of a [`HashTable`].
///
/// This struct is created by the [`extract_if`] method on [`HashTable`].
///
/// [`extract_if`]: HashTable::extract_if
pub struct ExtractIf<'a, V, F, A: Allocator = Global>
where
    F: FnMut(&mut V) -> bool,
{
    table: &'a mut HashTable<V, A>,
    iter: RawIter,
    f: F,
}

impl<V, F, A: Allocator> Iterator for ExtractIf<'_, V, F, A>
where
    F: FnMut(&mut V) -> bool,
{
    type Item = V;

    fn next(&mut self) -> Option<V> {
        for index in self.iter.by_ref() {
            let extract = {
                let _reentrancy = self.table.reentrancy.enter();
                // SAFETY: `index` is a full slot that has not been erased.
                (self.f)(unsafe { &mut *self.table.storage.slot_mut(index) })
            };
            if extract {
                // SAFETY: As above.
                return Some(unsafe { self.table.erase_at_index(index) });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.iter.size_hint().1)
    }
}

impl<V, F, A: Allocator> FusedIterator for ExtractIf<'_, V, F, A> where F: FnMut(&mut V) -> bool {}
