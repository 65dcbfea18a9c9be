use alloc::boxed::Box;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use allocator_api2::alloc::Allocator;
use allocator_api2::alloc::Global;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::hash_table;
use crate::policy::Equivalent;
use crate::policy::SetPolicy;
use crate::raw_hash_set::RawHashSet;

/// A hash set backed by a SwissTable.
///
/// `HashSet<T, S, A>` stores values of type `T` where `T` implements
/// `Hash + Eq`, hashed by the builder `S` and allocated from `A`. Lookups take
/// any borrowed form `Q` of `T` that implements [`Equivalent<T>`].
///
/// # Performance Characteristics
///
/// - **Memory**: one control byte per slot plus the size of `T`, at a maximum
///   load factor of 7/8.
/// - **Small sets**: a set that fits in one slot holds its element inline and
///   allocates nothing.
pub struct HashSet<T, S = DefaultHashBuilder, A: Allocator = Global> {
    raw: RawHashSet<SetPolicy<T>, S, A>,
}

impl<T, S, A> Clone for HashSet<T, S, A>
where
    T: Clone,
    S: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        HashSet {
            raw: self.raw.clone(),
        }
    }
}

impl<T, S, A> PartialEq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T, S, A> Eq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<T, S, A> Debug for HashSet<T, S, A>
where
    T: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.raw.fmt(f)
    }
}

impl<T, S> HashSet<T, S> {
    /// Creates an empty set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::hash::RandomState;
    ///
    /// use swiss_hash::hash_set::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// // Small values start in inline storage.
    /// assert_eq!(set.capacity(), 1);
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a set with room for at least `capacity` elements.
    ///
    /// The capacity is rounded up to the next `2^k - 1` slot count that
    /// holds `capacity` elements at the maximum load factor.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        HashSet {
            raw: RawHashSet::with_capacity_and_hasher(capacity, hash_builder),
        }
    }
}

impl<T, S, A: Allocator> HashSet<T, S, A> {
    /// Creates an empty set that allocates from `alloc`.
    ///
    /// Sets with a custom allocator are never sampled.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        HashSet {
            raw: RawHashSet::with_hasher_in(hash_builder, alloc),
        }
    }

    /// Creates a set with room for at least `capacity` elements that
    /// allocates from `alloc`.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self {
        HashSet {
            raw: RawHashSet::with_capacity_and_hasher_in(capacity, hash_builder, alloc),
        }
    }

    /// The set's hasher builder.
    pub fn hasher(&self) -> &S {
        self.raw.hasher()
    }

    /// The table behind this set, for inspection.
    pub fn raw_table(&self) -> &RawHashSet<SetPolicy<T>, S, A> {
        &self.raw
    }

    /// Returns the number of elements in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the number of slots: zero, one for inline storage, or
    /// `2^k - 1`.
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Removes all elements.
    ///
    /// Small sets keep their allocation; large ones release it.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns an iterator over the values of the set, in no particular
    /// order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.raw.iter(),
        }
    }

    /// Returns an iterator that removes and yields every value.
    ///
    /// The set is empty afterwards, even if the iterator is dropped early.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (0..4).collect();
    /// let mut values: Vec<_> = set.drain().collect();
    /// values.sort();
    ///
    /// assert_eq!(values, [0, 1, 2, 3]);
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T, A> {
        Drain {
            inner: self.raw.drain(),
        }
    }

    /// Keeps only the elements for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=6).collect();
    /// set.retain(|&x| x % 3 == 0);
    ///
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&3));
    /// assert!(set.contains(&6));
    /// # }
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.raw.retain(|v| f(v));
    }

    /// Creates an iterator that removes and yields the elements for which
    /// `f` returns `true`.
    ///
    /// Elements not yet visited when the iterator is dropped stay in the
    /// set.
    pub fn extract_if<'a, F>(&'a mut self, mut f: F) -> ExtractIf<'a, T, A>
    where
        F: FnMut(&T) -> bool + 'a,
    {
        ExtractIf {
            inner: self.raw.extract_if(Box::new(move |v: &mut T| f(v))),
        }
    }
}

impl<T, S, A> HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Shrinks the set to the smallest capacity that holds its elements.
    ///
    /// An empty set releases its allocation, and a set with one small element
    /// moves it inline.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::with_capacity(1000);
    /// set.insert(1);
    /// set.insert(2);
    /// set.shrink_to_fit();
    ///
    /// assert_eq!(set.capacity(), 3);
    /// assert_eq!(set.len(), 2);
    /// # }
    /// ```
    pub fn shrink_to_fit(&mut self) {
        self.raw.shrink_to_fit();
    }

    /// Reserves room for at least `additional` more elements without
    /// growing.
    pub fn reserve(&mut self, additional: usize) {
        self.raw.reserve(additional);
    }

    /// Like [`reserve`](Self::reserve), but reports failure instead of
    /// panicking.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.raw.try_reserve(additional)
    }

    /// Rebuilds the table with at least `n` slots, or the smallest size that
    /// holds the elements if `n` is zero.
    pub fn rehash(&mut self, n: usize) {
        self.raw.rehash(n);
    }

    /// Adds a value to the set.
    ///
    /// Returns `false`, and drops `value`, if an equal value was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert!(set.insert(37));
    /// assert!(!set.insert(37));
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        self.raw.insert(value)
    }

    /// Returns `true` if the set contains a value equivalent to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashSet;
    ///
    /// let mut set: HashSet<String> = HashSet::new();
    /// set.insert("fox".to_string());
    /// assert!(set.contains("fox"));
    /// assert!(!set.contains("dog"));
    /// # }
    /// ```
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.raw.contains(value)
    }

    /// Returns the stored value equivalent to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.raw.get(value)
    }

    /// Removes a value from the set. Returns whether it was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.raw.remove(value).is_some()
    }

    /// Removes and returns the stored value equivalent to `value`.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.raw.remove(value)
    }

    /// Adds a value to the set, replacing and returning the equal value if
    /// one was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert_eq!(set.replace(1), Some(1));
    /// assert_eq!(set.replace(2), None);
    /// assert_eq!(set.len(), 2);
    /// # }
    /// ```
    pub fn replace(&mut self, value: T) -> Option<T> {
        self.raw.replace(value)
    }

    /// Moves every value of `other` that is absent from `self` into `self`.
    /// Values already present stay in `other`.
    pub fn merge<S2, A2: Allocator>(&mut self, other: &mut HashSet<T, S2, A2>) {
        self.raw.merge(&mut other.raw);
    }

    /// Returns `true` if `self` and `other` share no elements.
    pub fn is_disjoint<S2, A2: Allocator>(&self, other: &HashSet<T, S2, A2>) -> bool
    where
        S2: BuildHasher,
    {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if every element of `self` is in `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashSet;
    ///
    /// let small: HashSet<i32> = [1, 2].into_iter().collect();
    /// let large: HashSet<i32> = [1, 2, 3].into_iter().collect();
    ///
    /// assert!(small.is_subset(&large));
    /// assert!(large.is_superset(&small));
    /// assert!(!large.is_subset(&small));
    /// # }
    /// ```
    pub fn is_subset<S2, A2: Allocator>(&self, other: &HashSet<T, S2, A2>) -> bool
    where
        S2: BuildHasher,
    {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every element of `other` is in `self`.
    pub fn is_superset<S2, A2: Allocator>(&self, other: &HashSet<T, S2, A2>) -> bool
    where
        S2: BuildHasher,
    {
        other.is_subset(self)
    }

    /// Values in `self` or `other`, each yielded once.
    pub fn union<'a>(&'a self, other: &'a HashSet<T, S, A>) -> Union<'a, T, S, A> {
        Union {
            iter: self.iter(),
            other_iter: other.iter(),
            first: self,
        }
    }

    /// Values in both `self` and `other`.
    pub fn intersection<'a>(&'a self, other: &'a HashSet<T, S, A>) -> Intersection<'a, T, S, A> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        Intersection {
            iter: small.iter(),
            other: large,
        }
    }

    /// Values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a HashSet<T, S, A>) -> Difference<'a, T, S, A> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Values in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a HashSet<T, S, A>,
    ) -> SymmetricDifference<'a, T, S, A> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }
}

impl<T, S> HashSet<T, S>
where
    S: Default,
{
    /// Creates an empty set using the default hasher builder. Allocates
    /// nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a set with room for at least `capacity` elements using the
    /// default hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S> Default for HashSet<T, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T> {
    inner: hash_table::Iter<'a, T>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T, A: Allocator = Global> {
    inner: hash_table::Drain<'a, T, A>,
}

impl<T, A: Allocator> Iterator for Drain<'_, T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, A: Allocator> ExactSizeIterator for Drain<'_, T, A> {}

/// A consuming iterator over the values of a `HashSet`.
pub struct IntoIter<T, A: Allocator = Global> {
    inner: hash_table::IntoIter<T, A>,
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, S, A: Allocator> IntoIterator for HashSet<T, S, A> {
    type IntoIter = IntoIter<T, A>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.raw.into_iter(),
        }
    }
}

impl<'a, T, S, A: Allocator> IntoIterator for &'a HashSet<T, S, A> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        HashSet {
            raw: RawHashSet::from_iter(iter),
        }
    }
}

impl<T, S, A> Extend<T> for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.raw.extend(iter);
    }
}

impl<'a, T, S, A> Extend<&'a T> for HashSet<T, S, A>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.raw.extend(iter.into_iter().copied());
    }
}

/// An iterator over the union of two sets.
pub struct Union<'a, T, S, A: Allocator = Global> {
    iter: Iter<'a, T>,
    other_iter: Iter<'a, T>,
    first: &'a HashSet<T, S, A>,
}

impl<'a, T, S, A> Iterator for Union<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(v) = self.iter.next() {
            return Some(v);
        }
        self.other_iter.by_ref().find(|v| !self.first.contains(*v))
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, T, S, A: Allocator = Global> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S, A>,
}

impl<'a, T, S, A> Iterator for Intersection<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.by_ref().find(|v| self.other.contains(*v))
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, T, S, A: Allocator = Global> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S, A>,
}

impl<'a, T, S, A> Iterator for Difference<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.by_ref().find(|v| !self.other.contains(*v))
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S, A: Allocator = Global> {
    iter: core::iter::Chain<Difference<'a, T, S, A>, Difference<'a, T, S, A>>,
}

impl<'a, T, S, A> Iterator for SymmetricDifference<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

/// An iterator that removes and yields the values of a set that satisfy a
/// predicate.
pub struct ExtractIf<'a, T, A: Allocator = Global> {
    #[allow(clippy::type_complexity)]
    inner: hash_table::ExtractIf<'a, T, Box<dyn FnMut(&mut T) -> bool + 'a>, A>,
}

impl<T, A: Allocator> Iterator for ExtractIf<'_, T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

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
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    fn set_of<T: Hash + Eq>(values: impl IntoIterator<Item = T>) -> HashSet<T, SipHashBuilder> {
        values.into_iter().collect()
    }

    #[test]
    fn test_new_allocates_nothing() {
        let set: HashSet<i32, SipHashBuilder> = HashSet::new();
        assert!(set.is_empty());
        assert_eq!(set.capacity(), 1);

        let set: HashSet<[u64; 4], SipHashBuilder> = HashSet::new();
        assert_eq!(set.capacity(), 0);

        let set = HashSet::<i32, _>::with_capacity_and_hasher(200, SipHashBuilder::default());
        assert!(set.capacity() >= 200);
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        assert!(set.insert(1));
        assert!(!set.insert(1));
        assert!(set.insert(2));
        assert_eq!(set.len(), 2);

        assert!(set.contains(&1));
        assert!(set.contains(&2));
        assert!(!set.contains(&3));
    }

    #[test]
    fn test_borrowed_lookups() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.insert("hello".to_string());
        set.insert("world".to_string());

        assert!(set.contains("hello"));
        assert_eq!(set.get("world").map(String::as_str), Some("world"));
        assert!(set.remove("hello"));
        assert!(!set.remove("hello"));
        assert_eq!(set.take("world"), Some("world".to_string()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_every_other() {
        let mut set = set_of(0..1000);

        for i in (0..1000).step_by(2) {
            assert!(set.remove(&i));
        }
        assert_eq!(set.len(), 500);

        for i in 0..1000 {
            assert_eq!(set.contains(&i), i % 2 == 1);
        }
    }

    #[test]
    fn test_replace_returns_old_value() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        assert_eq!(set.replace(vec![1, 2]), None);
        assert_eq!(set.replace(vec![1, 2]), Some(vec![1, 2]));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut set = set_of(0..3);
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(&1));

        assert!(set.insert(1));
        assert!(set.contains(&1));
    }

    #[test]
    fn test_reserve_and_shrink() {
        let mut set = HashSet::<i32, _>::with_hasher(SipHashBuilder::default());
        set.reserve(1000);
        let reserved = set.capacity();
        assert!(reserved >= 1000);

        for i in 0..1000 {
            set.insert(i);
        }
        assert_eq!(set.capacity(), reserved);

        set.retain(|v| *v < 10);
        set.shrink_to_fit();
        assert_eq!(set.capacity(), 15);
        assert_eq!(set.len(), 10);

        set.rehash(100);
        assert_eq!(set.capacity(), 127);
        assert!(set.try_reserve(usize::MAX).is_err());
    }

    #[test]
    fn test_iterators() {
        let set = set_of([1, 2, 3]);

        let mut values: Vec<i32> = set.iter().copied().collect();
        values.sort_unstable();
        assert_eq!(values, [1, 2, 3]);
        assert_eq!(set.iter().len(), 3);

        let mut values: Vec<i32> = (&set).into_iter().copied().collect();
        values.sort_unstable();
        assert_eq!(values, [1, 2, 3]);

        let mut values: Vec<i32> = set.into_iter().collect();
        values.sort_unstable();
        assert_eq!(values, [1, 2, 3]);
    }

    #[test]
    fn test_drain_and_extract_if() {
        let mut set = set_of(0..10);

        let mut even: Vec<i32> = set.extract_if(|v| v % 2 == 0).collect();
        even.sort_unstable();
        assert_eq!(even, [0, 2, 4, 6, 8]);
        assert_eq!(set.len(), 5);

        assert_eq!(set.drain().count(), 5);
        assert!(set.is_empty());
        assert_eq!(set.drain().count(), 0);
    }

    #[test]
    fn test_insert_remove_cycle() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for _ in 0..10 {
            for i in 0..50 {
                assert!(set.insert(i));
            }
            for i in 0..50 {
                assert!(set.remove(&i));
            }
            assert!(set.is_empty());
        }
        assert!(set.capacity() <= 127);
    }

    #[test]
    fn test_large_values() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for i in 0..100 {
            let large_string = "x".repeat(1000) + &i.to_string();
            assert!(set.insert(large_string.clone()));
            assert!(set.contains(&large_string))
        }

        assert_eq!(set.len(), 100);
    }

    #[test]
    fn test_equality_and_debug() {
        let a = set_of(0..20);
        let b = set_of((0..20).rev());
        assert_eq!(a, b);
        assert_ne!(a, set_of(0..19));

        let single = set_of([5]);
        assert_eq!(alloc::format!("{single:?}"), "{5}");

        let copy = a.clone();
        assert_eq!(copy, a);
    }

    #[test]
    fn test_merge() {
        let mut a = set_of([1, 2, 3]);
        let mut b = set_of([3, 4]);
        a.merge(&mut b);
        assert_eq!(a, set_of([1, 2, 3, 4]));
        assert_eq!(b, set_of([3]));
    }

    #[test]
    fn test_extend_by_reference() {
        let mut set = set_of([1]);
        set.extend(&[1, 2, 3]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_subset_relations() {
        let a = set_of([1, 2]);
        let b = set_of([1, 2, 3]);
        let c = set_of([4, 5]);

        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(a.is_subset(&a));
        assert!(b.is_superset(&a));
        assert!(a.is_disjoint(&c));
        assert!(!a.is_disjoint(&b));
    }

    #[test]
    fn test_set_operations() {
        let a = set_of([1, 2, 3]);
        let b = set_of([3, 4, 5]);

        let sorted = |it: &mut dyn Iterator<Item = &i32>| {
            let mut v: Vec<i32> = it.copied().collect();
            v.sort_unstable();
            v
        };

        assert_eq!(sorted(&mut a.union(&b)), [1, 2, 3, 4, 5]);
        assert_eq!(sorted(&mut a.intersection(&b)), [3]);
        assert_eq!(sorted(&mut a.difference(&b)), [1, 2]);
        assert_eq!(sorted(&mut a.symmetric_difference(&b)), [1, 2, 4, 5]);
    }
}
