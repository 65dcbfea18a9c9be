use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::ops::Index;

use allocator_api2::alloc::Allocator;
use allocator_api2::alloc::Global;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::hash_table;
use crate::policy::Equivalent;
use crate::policy::MapPolicy;
use crate::raw_hash_set::RawHashSet;

/// A hash map backed by a SwissTable.
///
/// `HashMap<K, V, S, A>` stores `(K, V)` pairs in a single flat array, hashed
/// by `K` with the builder `S`. Lookups take any borrowed form `Q` of the key
/// that implements [`Equivalent<K>`].
///
/// # Performance Characteristics
///
/// - **Memory**: one control byte per slot plus the size of `(K, V)`, at a
///   maximum load factor of 7/8. Hashes are not stored.
/// - **Lookups**: one 16-byte group match per probe step; most lookups touch
///   one group.
pub struct HashMap<K, V, S = DefaultHashBuilder, A: Allocator = Global> {
    raw: RawHashSet<MapPolicy<K, V>, S, A>,
}

impl<K, V, S, A> Clone for HashMap<K, V, S, A>
where
    K: Clone,
    V: Clone,
    S: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        HashMap {
            raw: self.raw.clone(),
        }
    }
}

impl<K, V, S, A> Debug for HashMap<K, V, S, A>
where
    K: Debug,
    V: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, A> PartialEq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K, V, S, A> Eq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates an empty map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use swiss_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 0);
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a map with room for at least `capacity` entries.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        HashMap {
            raw: RawHashSet::with_capacity_and_hasher(capacity, hash_builder),
        }
    }
}

impl<K, V, S, A: Allocator> HashMap<K, V, S, A> {
    /// Creates an empty map that allocates from `alloc`.
    ///
    /// Maps with a custom allocator are never sampled.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        HashMap {
            raw: RawHashSet::with_hasher_in(hash_builder, alloc),
        }
    }

    /// Creates a map with room for at least `capacity` entries that
    /// allocates from `alloc`.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self {
        HashMap {
            raw: RawHashSet::with_capacity_and_hasher_in(capacity, hash_builder, alloc),
        }
    }

    /// The map's hasher builder.
    pub fn hasher(&self) -> &S {
        self.raw.hasher()
    }

    /// The table behind this map, for inspection.
    pub fn raw_table(&self) -> &RawHashSet<MapPolicy<K, V>, S, A> {
        &self.raw
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the number of slots: zero, one for inline storage, or
    /// `2^k - 1`.
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Removes all entries.
    ///
    /// Small maps keep their allocation; large ones release it.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns an iterator over the entries, in no particular order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashMap;
    ///
    /// let map: HashMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
    /// let mut pairs: Vec<_> = map.iter().collect();
    /// pairs.sort();
    /// assert_eq!(pairs, [(&"a", &1), (&"b", &2)]);
    /// # }
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.raw.iter(),
        }
    }

    /// Returns an iterator over the entries with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.raw.iter_mut(),
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashMap;
    ///
    /// let mut map: HashMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
    /// for value in map.values_mut() {
    ///     *value *= 10;
    /// }
    /// assert_eq!(map["a"], 10);
    /// assert_eq!(map["b"], 20);
    /// # }
    /// ```
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Removes every entry, returning them in an iterator.
    pub fn drain(&mut self) -> Drain<'_, K, V, A> {
        Drain {
            inner: self.raw.drain(),
        }
    }

    /// Keeps only the entries for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.raw.retain(|(k, v)| f(k, v));
    }
}

impl<K, V, S, A> HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Shrinks the map to the smallest capacity that holds its entries.
    pub fn shrink_to_fit(&mut self) {
        self.raw.shrink_to_fit();
    }

    /// Reserves room for at least `additional` more entries without growing.
    pub fn reserve(&mut self, additional: usize) {
        self.raw.reserve(additional);
    }

    /// Like [`reserve`](Self::reserve), but reports failure instead of
    /// panicking.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.raw.try_reserve(additional)
    }

    /// Rebuilds the table with at least `n` slots, or the smallest size that
    /// holds the entries if `n` is zero.
    pub fn rehash(&mut self, n: usize) {
        self.raw.rehash(n);
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key was present its value is replaced and the old value is
    /// returned; the stored key is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use swiss_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.raw.entry(&key) {
            hash_table::Entry::Occupied(mut entry) => {
                Some(core::mem::replace(&mut entry.get_mut().1, value))
            }
            hash_table::Entry::Vacant(entry) => {
                entry.insert((key, value));
                None
            }
        }
    }

    /// Inserts a key-value pair only if the key is absent.
    ///
    /// Returns `false`, dropping `key` and `value`, if the key was present.
    pub fn try_insert(&mut self, key: K, value: V) -> bool {
        self.raw.insert((key, value))
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashMap;
    ///
    /// let mut map: HashMap<String, u32> = HashMap::new();
    /// map.insert("apple".to_string(), 3);
    ///
    /// assert_eq!(map.get("apple"), Some(&3));
    /// assert_eq!(map.get("pear"), None);
    /// # }
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.raw.get(key).map(|(_, v)| v)
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.raw.get(key).map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.raw.get_mut(key).map(|(_, v)| v)
    }

    /// Returns `true` if the map has an entry for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.raw.contains(key)
    }

    /// Removes the entry for `key` and returns its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.raw.remove(key).map(|(_, v)| v)
    }

    /// Removes the entry for `key` and returns the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.raw.remove(key)
    }

    /// Moves every entry of `other` whose key is absent from `self` into
    /// `self`. Entries whose keys are already present stay in `other`.
    pub fn merge<S2, A2: Allocator>(&mut self, other: &mut HashMap<K, V, S2, A2>) {
        self.raw.merge(&mut other.raw);
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// A vacant entry has already reserved room for its element, so
    /// inserting through it never rehashes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashMap;
    ///
    /// let mut counts: HashMap<char, usize> = HashMap::new();
    /// for c in "hello".chars() {
    ///     *counts.entry(c).or_insert(0) += 1;
    /// }
    ///
    /// assert_eq!(counts[&'l'], 2);
    /// assert_eq!(counts[&'h'], 1);
    /// # }
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, A> {
        match self.raw.entry(&key) {
            hash_table::Entry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            hash_table::Entry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    S: Default,
{
    /// Creates an empty map using the default hasher builder. Allocates
    /// nothing.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a map with room for at least `capacity` entries using the
    /// default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashMap;
    ///
    /// let map: HashMap<i32, i32> = HashMap::with_capacity(100);
    /// assert!(map.capacity() >= 100);
    /// # }
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, Q, V, S, A> Index<&Q> for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    Q: Hash + Equivalent<K> + ?Sized,
    S: BuildHasher,
    A: Allocator,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found in HashMap"),
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HashMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, A> Extend<(K, V)> for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Later pairs overwrite the values of earlier ones with the same key.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(if self.is_empty() {
            lower
        } else {
            lower.div_ceil(2)
        });
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S, A: Allocator> IntoIterator for HashMap<K, V, S, A> {
    type IntoIter = IntoIter<K, V, A>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.raw.into_iter(),
        }
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a HashMap<K, V, S, A> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a mut HashMap<K, V, S, A> {
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in a map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, A: Allocator = Global> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, A>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, A>),
}

impl<'a, K, V, A: Allocator> Entry<'a, K, V, A> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Self::or_insert_with), but `default` receives
    /// the key.
    pub fn or_insert_with_key<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce(&K) -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = default(&entry.key);
                entry.insert(value)
            }
        }
    }

    /// Modifies an occupied entry in place before any insert.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, A> Entry<'a, K, V, A>
where
    V: Default,
    A: Allocator,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V, A: Allocator = Global> {
    entry: hash_table::VacantEntry<'a, (K, V), A>,
    key: K,
}

impl<'a, K, V, A: Allocator> VacantEntry<'a, K, V, A> {
    /// The key that would be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key without inserting.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, A: Allocator = Global> {
    entry: hash_table::OccupiedEntry<'a, (K, V), A>,
}

impl<'a, K, V, A: Allocator> OccupiedEntry<'a, K, V, A> {
    /// The stored key.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// The stored value.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// The stored value, mutably.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Replaces the value and returns the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// Removes the entry and returns its value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry and returns its key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the entries of a `HashMap`.
pub struct Iter<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// An iterator over the entries of a `HashMap` with mutable values.
pub struct IterMut<'a, K, V> {
    inner: hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over mutable references to the values of a `HashMap`.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A draining iterator over the entries of a `HashMap`.
pub struct Drain<'a, K, V, A: Allocator = Global> {
    inner: hash_table::Drain<'a, (K, V), A>,
}

impl<K, V, A: Allocator> Iterator for Drain<'_, K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A consuming iterator over the entries of a `HashMap`.
pub struct IntoIter<K, V, A: Allocator = Global> {
    inner: hash_table::IntoIter<(K, V), A>,
}

impl<K, V, A: Allocator> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
