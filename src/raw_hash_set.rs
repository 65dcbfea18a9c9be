//! A [`HashTable`] bound to a hasher and a [`TablePolicy`].
//!
//! [`RawHashSet`] owns the `BuildHasher`, computes hashes from keys, and
//! supplies the engine with the equality and rehash closures it needs. The
//! user-facing [`HashSet`](crate::HashSet) and [`HashMap`](crate::HashMap)
//! are thin wrappers around it.

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use allocator_api2::alloc::Allocator;
use allocator_api2::alloc::Global;

use crate::error::TryReserveError;
use crate::generation::Cursor;
use crate::hash_table;
use crate::hash_table::HashTable;
use crate::policy::Equivalent;
use crate::policy::TablePolicy;

/// Tables at most this large have every lookup cross-checked against all of
/// their elements in debug builds.
#[cfg(debug_assertions)]
const CONSISTENCY_CHECK_MAX_CAPACITY: usize = 16;

#[inline]
fn make_hasher<P, S>(hash_builder: &S) -> impl Fn(&P::Value) -> u64 + '_
where
    P: TablePolicy,
    P::Key: Hash,
    S: BuildHasher,
{
    move |value| hash_builder.hash_one(P::key(value))
}

#[inline]
fn equivalent_key<P, Q>(key: &Q) -> impl FnMut(&P::Value) -> bool + '_
where
    P: TablePolicy,
    Q: Equivalent<P::Key> + ?Sized,
{
    move |value| key.equivalent(P::key(value))
}

/// A hash table of `P::Value` keyed by `P::Key`, hashed with `S`.
///
/// # Examples
///
/// ```rust
/// # use swiss_hash::policy::MapPolicy;
/// # use swiss_hash::raw_hash_set::RawHashSet;
/// # use swiss_hash::DefaultHashBuilder;
/// #
/// let mut table: RawHashSet<MapPolicy<&str, u32>, DefaultHashBuilder> = RawHashSet::default();
/// assert!(table.insert(("a", 1)));
/// assert!(!table.insert(("a", 2)));
/// assert_eq!(table.get("a"), Some(&("a", 1)));
/// ```
pub struct RawHashSet<P, S, A: Allocator = Global>
where
    P: TablePolicy,
{
    table: HashTable<P::Value, A>,
    hash_builder: S,
}

impl<P, S, A> Clone for RawHashSet<P, S, A>
where
    P: TablePolicy,
    P::Value: Clone,
    S: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        RawHashSet {
            table: self.table.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }
}

impl<P, S, A> Debug for RawHashSet<P, S, A>
where
    P: TablePolicy,
    P::Value: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.table.iter()).finish()
    }
}

impl<P, S, A> PartialEq for RawHashSet<P, S, A>
where
    P: TablePolicy,
    P::Key: Hash + Eq + Sized,
    P::Value: PartialEq,
    S: BuildHasher,
    A: Allocator,
{
    /// Order-independent: two tables are equal when they hold equal values,
    /// whatever their capacity, seed, or insertion history.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        // Probe the smaller-capacity table, which is cheaper to scan.
        let (outer, inner) = if self.capacity() <= other.capacity() {
            (self, other)
        } else {
            (other, self)
        };
        outer
            .iter()
            .all(|value| inner.get(P::key(value)).is_some_and(|found| found == value))
    }
}

impl<P, S, A> Eq for RawHashSet<P, S, A>
where
    P: TablePolicy,
    P::Key: Hash + Eq + Sized,
    P::Value: Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<P, S> Default for RawHashSet<P, S>
where
    P: TablePolicy,
    P::Key: Sized,
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<P, S> RawHashSet<P, S>
where
    P: TablePolicy,
    P::Key: Sized,
{
    /// Creates an empty table that hashes with `hash_builder`.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a table with room for `capacity` elements that hashes with
    /// `hash_builder`.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        RawHashSet {
            table: HashTable::with_capacity_and_key_size(capacity, size_of::<P::Key>()),
            hash_builder,
        }
    }
}

impl<P, S, A> RawHashSet<P, S, A>
where
    P: TablePolicy,
    A: Allocator,
{
    /// Creates an empty table backed by `alloc`. Never sampled.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self::with_capacity_and_hasher_in(0, hash_builder, alloc)
    }

    /// Creates a table backed by `alloc` with room for `capacity` elements.
    /// Never sampled.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self {
        RawHashSet {
            table: HashTable::with_capacity_in(capacity, alloc),
            hash_builder,
        }
    }

    /// The table's hasher.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// The underlying engine, for inspection.
    pub fn table(&self) -> &HashTable<P::Value, A> {
        &self.table
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// The largest number of elements the table can hold.
    pub fn max_size(&self) -> usize {
        self.table.max_size()
    }

    /// Removes every element. See [`HashTable::clear`].
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// An iterator over the values.
    pub fn iter(&self) -> hash_table::Iter<'_, P::Value> {
        self.table.iter()
    }

    /// A mutable iterator over the values. Callers must not change keys.
    pub(crate) fn iter_mut(&mut self) -> hash_table::IterMut<'_, P::Value> {
        self.table.iter_mut()
    }

    /// Removes every value, returning them in an iterator.
    pub fn drain(&mut self) -> hash_table::Drain<'_, P::Value, A> {
        self.table.drain()
    }

    /// Retains only the values for which `f` returns `true`, and returns how
    /// many were removed.
    pub fn retain(&mut self, f: impl FnMut(&mut P::Value) -> bool) -> usize {
        self.table.retain(f)
    }

    /// Removes the values for which `f` returns `true` as the returned
    /// iterator is advanced.
    pub fn extract_if<F>(&mut self, f: F) -> hash_table::ExtractIf<'_, P::Value, F, A>
    where
        F: FnMut(&mut P::Value) -> bool,
    {
        self.table.extract_if(f)
    }

    /// Calls `f` with every value.
    pub fn for_each(&self, f: impl FnMut(&P::Value)) {
        self.table.for_each(f);
    }

    /// A cursor to the first value, or the end cursor.
    pub fn cursor_begin(&self) -> Cursor {
        self.table.cursor_begin()
    }

    /// The end cursor.
    pub fn cursor_end(&self) -> Cursor {
        self.table.cursor_end()
    }

    /// See [`HashTable::get_at`].
    #[track_caller]
    pub fn get_at(&self, cursor: Cursor) -> &P::Value {
        self.table.get_at(cursor)
    }

    /// See [`HashTable::advance`].
    #[track_caller]
    pub fn advance(&self, cursor: Cursor) -> Cursor {
        self.table.advance(cursor)
    }

    /// See [`HashTable::is_end`].
    #[track_caller]
    pub fn is_end(&self, cursor: Cursor) -> bool {
        self.table.is_end(cursor)
    }

    /// Removes and returns the value at `cursor`. Cursors to other values
    /// stay valid.
    #[track_caller]
    pub fn erase_at(&mut self, cursor: Cursor) -> P::Value {
        self.table.erase_at(cursor)
    }
}

impl<P, S, A> RawHashSet<P, S, A>
where
    P: TablePolicy,
    P::Key: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    #[inline]
    fn hash<Q: Hash + ?Sized>(&self, key: &Q) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Checks that every element equal to `key` hashes to `hash`.
    #[cfg(debug_assertions)]
    #[track_caller]
    fn assert_hash_eq_consistent<Q>(&self, key: &Q, hash: u64)
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
        if self.table.capacity() > CONSISTENCY_CHECK_MAX_CAPACITY {
            return;
        }
        for value in self.table.iter() {
            let stored = P::key(value);
            if key.equivalent(stored) && self.hash(stored) != hash {
                panic!("hash/eq functions are inconsistent");
            }
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn assert_hash_eq_consistent<Q>(&self, _key: &Q, _hash: u64)
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
    }

    #[inline]
    #[track_caller]
    fn hash_checked<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
        let hash = self.hash(key);
        self.assert_hash_eq_consistent(key, hash);
        hash
    }

    /// Inserts `value` unless an element with the same key is present.
    /// Returns whether the insert happened.
    pub fn insert(&mut self, value: P::Value) -> bool {
        self.insert_with_cursor(value).1
    }

    /// Like [`insert`](Self::insert), but also returns a cursor to the
    /// matching or inserted element.
    pub fn insert_with_cursor(&mut self, value: P::Value) -> (Cursor, bool) {
        let hash = self.hash_checked(P::key(&value));
        match self.table.entry(
            hash,
            equivalent_key::<P, _>(P::key(&value)),
            make_hasher::<P, S>(&self.hash_builder),
        ) {
            hash_table::Entry::Occupied(entry) => (entry.cursor(), false),
            hash_table::Entry::Vacant(entry) => (entry.insert_with_cursor(value), true),
        }
    }

    /// Inserts `value`, replacing and returning the element with the same
    /// key if there is one.
    pub fn replace(&mut self, value: P::Value) -> Option<P::Value> {
        let hash = self.hash_checked(P::key(&value));
        match self.table.entry(
            hash,
            equivalent_key::<P, _>(P::key(&value)),
            make_hasher::<P, S>(&self.hash_builder),
        ) {
            hash_table::Entry::Occupied(mut entry) => Some(entry.insert(value)),
            hash_table::Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// The element with key `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&P::Value>
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
        let hash = self.hash_checked(key);
        self.table.find(hash, equivalent_key::<P, _>(key))
    }

    /// The element with key `key`, for modification. The modification must
    /// not change the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut P::Value>
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
        let hash = self.hash_checked(key);
        self.table.find_mut(hash, equivalent_key::<P, _>(key))
    }

    /// Whether an element with key `key` is present.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
        self.get(key).is_some()
    }

    /// A cursor to the element with key `key`, or the end cursor.
    pub fn find_cursor<Q>(&self, key: &Q) -> Cursor
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
        let hash = self.hash_checked(key);
        self.table.find_cursor(hash, equivalent_key::<P, _>(key))
    }

    /// Removes the element with key `key` and returns it.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<P::Value>
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
        let hash = self.hash_checked(key);
        self.table.remove(hash, equivalent_key::<P, _>(key))
    }

    /// Removes the element with key `key` as an owned node that can be
    /// moved into another table with [`insert_node`](Self::insert_node).
    pub fn extract<Q>(&mut self, key: &Q) -> Option<P::Value>
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
        self.remove(key)
    }

    /// Inserts a node taken from a table with [`extract`](Self::extract).
    ///
    /// Returns a cursor to the element with the node's key and, if that key
    /// was already present, the node itself.
    pub fn insert_node(&mut self, node: P::Value) -> (Cursor, Option<P::Value>) {
        let hash = self.hash_checked(P::key(&node));
        match self.table.entry(
            hash,
            equivalent_key::<P, _>(P::key(&node)),
            make_hasher::<P, S>(&self.hash_builder),
        ) {
            hash_table::Entry::Occupied(entry) => (entry.cursor(), Some(node)),
            hash_table::Entry::Vacant(entry) => (entry.insert_with_cursor(node), None),
        }
    }

    /// The entry for `key`. A vacant entry already has room for the new
    /// element.
    pub fn entry<Q>(&mut self, key: &Q) -> hash_table::Entry<'_, P::Value, A>
    where
        Q: Hash + Equivalent<P::Key> + ?Sized,
    {
        let hash = self.hash_checked(key);
        self.table.entry(
            hash,
            equivalent_key::<P, _>(key),
            make_hasher::<P, S>(&self.hash_builder),
        )
    }

    /// Moves every element of `other` whose key is absent from `self` into
    /// `self`. Elements whose keys are already present stay in `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_hash::policy::SetPolicy;
    /// # use swiss_hash::raw_hash_set::RawHashSet;
    /// # use swiss_hash::DefaultHashBuilder;
    /// #
    /// let mut a: RawHashSet<SetPolicy<u32>, DefaultHashBuilder> = [1, 2].into_iter().collect();
    /// let mut b: RawHashSet<SetPolicy<u32>, DefaultHashBuilder> = [2, 3].into_iter().collect();
    ///
    /// a.merge(&mut b);
    /// assert_eq!(a.len(), 3);
    /// assert_eq!(b.len(), 1);
    /// assert!(b.contains(&2));
    /// ```
    pub fn merge<S2, A2: Allocator>(&mut self, other: &mut RawHashSet<P, S2, A2>) {
        let mut cursor = other.table.cursor_begin();
        while !other.table.is_end(cursor) {
            // Erasing does not move other elements, so `next` stays valid.
            let next = other.table.advance(cursor);
            let key = P::key(other.table.get_at(cursor));
            let hash = self.hash_checked(key);
            if !self.table.contains(hash, equivalent_key::<P, _>(key)) {
                let value = other.table.erase_at(cursor);
                self.table
                    .insert_unique(hash, value, make_hasher::<P, S>(&self.hash_builder));
            }
            cursor = next;
        }
    }

    /// Reserves room for `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, make_hasher::<P, S>(&self.hash_builder));
    }

    /// Like [`reserve`](Self::reserve), but reports failure.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table
            .try_reserve(additional, make_hasher::<P, S>(&self.hash_builder))
    }

    /// See [`HashTable::rehash`].
    pub fn rehash(&mut self, n: usize) {
        self.table
            .rehash(n, make_hasher::<P, S>(&self.hash_builder));
    }

    /// Shrinks to the smallest capacity that holds the current elements.
    pub fn shrink_to_fit(&mut self) {
        self.table
            .shrink_to_fit(make_hasher::<P, S>(&self.hash_builder));
    }
}

impl<P, S, A> Extend<P::Value> for RawHashSet<P, S, A>
where
    P: TablePolicy,
    P::Key: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = P::Value>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        // Half the hint when non-empty, since duplicates are common.
        let additional = if self.is_empty() {
            lower
        } else {
            lower.div_ceil(2)
        };
        self.reserve(additional);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<P, S> FromIterator<P::Value> for RawHashSet<P, S>
where
    P: TablePolicy,
    P::Key: Hash + Eq + Sized,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = P::Value>>(iter: I) -> Self {
        let mut table = Self::with_hasher(S::default());
        table.extend(iter);
        table
    }
}

impl<P, S, A> IntoIterator for RawHashSet<P, S, A>
where
    P: TablePolicy,
    A: Allocator,
{
    type IntoIter = hash_table::IntoIter<P::Value, A>;
    type Item = P::Value;

    fn into_iter(self) -> Self::IntoIter {
        self.table.into_iter()
    }
}

impl<'a, P, S, A> IntoIterator for &'a RawHashSet<P, S, A>
where
    P: TablePolicy,
    A: Allocator,
{
    type IntoIter = hash_table::Iter<'a, P::Value>;
    type Item = &'a P::Value;

    fn into_iter(self) -> Self::IntoIter {
        self.table.iter()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::policy::MapPolicy;
    use crate::policy::SetPolicy;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type Set<T> = RawHashSet<SetPolicy<T>, SipHashBuilder>;
    type Map<K, V> = RawHashSet<MapPolicy<K, V>, SipHashBuilder>;

    #[test]
    fn insert_get_remove() {
        let mut set: Set<String> = Set::default();
        assert!(set.insert("a".to_string()));
        assert!(set.insert("b".to_string()));
        assert!(!set.insert("a".to_string()));
        assert_eq!(set.len(), 2);

        assert_eq!(set.get("a").map(String::as_str), Some("a"));
        assert!(set.contains("b"));
        assert!(!set.contains("c"));

        assert_eq!(set.remove("a"), Some("a".to_string()));
        assert_eq!(set.remove("a"), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn replace_swaps_value_with_same_key() {
        let mut map: Map<u32, &str> = Map::default();
        assert_eq!(map.replace((1, "one")), None);
        assert_eq!(map.replace((1, "uno")), Some((1, "one")));
        assert_eq!(map.get(&1), Some(&(1, "uno")));
    }

    #[test]
    fn cursor_from_insert() {
        let mut set: Set<u64> = Set::default();
        let (cursor, inserted) = set.insert_with_cursor(5);
        assert!(inserted);
        assert_eq!(*set.get_at(cursor), 5);
        let (again, inserted) = set.insert_with_cursor(5);
        assert!(!inserted);
        assert!(set.table().cursors_eq(cursor, again));

        let found = set.find_cursor(&5);
        assert_eq!(set.erase_at(found), 5);
        assert!(set.is_end(set.find_cursor(&5)));
    }

    #[test]
    fn entry_by_borrowed_key() {
        let mut map: Map<String, u32> = Map::default();
        for word in ["x", "y", "x", "x"] {
            map.entry(word)
                .or_insert_with(|| (word.to_string(), 0))
                .1 += 1;
        }
        assert_eq!(map.get("x").map(|(_, n)| *n), Some(3));
        assert_eq!(map.get("y").map(|(_, n)| *n), Some(1));
    }

    #[test]
    fn extract_and_insert_node_move_between_tables() {
        let mut a: Map<u32, String> = Map::default();
        let mut b: Map<u32, String> = Map::default();
        a.insert((1, "one".to_string()));
        b.insert((1, "uno".to_string()));

        let node = a.extract(&1).unwrap();
        assert!(a.is_empty());
        let (cursor, rejected) = b.insert_node(node);
        assert_eq!(rejected, Some((1, "one".to_string())));
        assert_eq!(b.get_at(cursor).1, "uno");

        let (cursor, rejected) = a.insert_node((2, "two".to_string()));
        assert!(rejected.is_none());
        assert_eq!(a.get_at(cursor).0, 2);
    }

    #[test]
    fn merge_moves_only_absent_keys() {
        let mut a: Map<u32, &str> = Map::default();
        let mut b: Map<u32, &str> = Map::default();
        for k in 0..50 {
            a.insert((k, "a"));
        }
        for k in 25..100 {
            b.insert((k, "b"));
        }

        a.merge(&mut b);

        assert_eq!(a.len(), 100);
        assert_eq!(b.len(), 25);
        for k in 0..50 {
            assert_eq!(a.get(&k), Some(&(k, "a")));
        }
        for k in 50..100 {
            assert_eq!(a.get(&k), Some(&(k, "b")));
        }
        for k in 25..50 {
            assert_eq!(b.get(&k), Some(&(k, "b")));
        }
    }

    #[test]
    fn equality_ignores_order_and_capacity() {
        let mut a: Set<u32> = Set::default();
        let mut b: Set<u32> = Set::default();
        for k in 0..100 {
            a.insert(k);
        }
        for k in (0..100).rev() {
            b.insert(k);
        }
        b.reserve(1000);
        assert_eq!(a, b);

        b.remove(&3);
        assert_ne!(a, b);
        b.insert(1000);
        assert_ne!(a, b);
    }

    #[test]
    fn map_equality_compares_values() {
        let mut a: Map<u32, u32> = Map::default();
        let mut b: Map<u32, u32> = Map::default();
        a.insert((1, 1));
        b.insert((1, 2));
        assert_ne!(a, b);
        b.replace((1, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn collect_extend_and_clone() {
        let mut set: Set<u32> = (0..10).collect();
        set.extend(5..20);
        assert_eq!(set.len(), 20);

        let copy = set.clone();
        assert_eq!(copy, set);

        let mut values: Vec<u32> = set.into_iter().collect();
        values.sort_unstable();
        assert_eq!(values, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn capacity_management() {
        let mut set: Set<u32> = Set::default();
        set.reserve(100);
        assert!(set.capacity() >= 100);
        for k in 0..10 {
            set.insert(k);
        }
        set.shrink_to_fit();
        assert!(set.capacity() < 100);
        set.rehash(200);
        assert!(set.capacity() >= 200);
        assert_eq!(
            set.try_reserve(usize::MAX),
            Err(TryReserveError::CapacityOverflow)
        );
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn retain_drain_and_extract_if() {
        let mut set: Set<u32> = (0..30).collect();
        assert_eq!(set.retain(|v| *v < 20), 10);
        let mut odd: Vec<u32> = set.extract_if(|v| *v % 2 == 1).collect();
        odd.sort_unstable();
        assert_eq!(odd, (0..20).filter(|v| v % 2 == 1).collect::<Vec<_>>());

        let mut sum = 0;
        set.for_each(|v| sum += *v);
        assert_eq!(sum, (0..20).filter(|v| v % 2 == 0).sum::<u32>());

        assert_eq!(set.drain().count(), 10);
        assert!(set.is_empty());
    }

    #[derive(Debug, Clone)]
    struct Inconsistent {
        id: u32,
        salt: u32,
    }

    impl PartialEq for Inconsistent {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Eq for Inconsistent {}

    impl Hash for Inconsistent {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
            self.salt.hash(state);
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "hash/eq functions are inconsistent")]
    fn inconsistent_hash_and_eq_panics() {
        let mut set: Set<Inconsistent> = Set::default();
        set.insert(Inconsistent { id: 1, salt: 1 });
        set.contains(&Inconsistent { id: 1, salt: 2 });
    }

    #[test]
    fn custom_allocator_table() {
        let mut set: RawHashSet<SetPolicy<u32>, SipHashBuilder, Global> =
            RawHashSet::with_capacity_and_hasher_in(10, SipHashBuilder::default(), Global);
        set.insert(1);
        assert!(!set.table().is_sampled());
        assert!(set.contains(&1));
    }

    #[test]
    fn debug_lists_values() {
        let mut set: Set<u32> = Set::default();
        set.insert(7);
        assert_eq!(alloc::format!("{set:?}"), "{7}");
    }
}
