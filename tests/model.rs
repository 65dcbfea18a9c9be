//! Random operation sequences checked against the std collections.

use std::collections::HashMap as StdHashMap;
use std::collections::HashSet as StdHashSet;
use std::hash::BuildHasher;
use std::hash::Hasher;
use std::hash::RandomState;

use proptest::prelude::*;
use swiss_hash::HashMap;
use swiss_hash::HashSet;
use swiss_hash::HashTable;

/// Hashes every key into one of sixteen values, so that every key probes from
/// the same group and most share a 7-bit tag with another.
#[derive(Clone, Default)]
struct Colliding;

struct CollidingHasher(u64);

impl Hasher for CollidingHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(u64::from(byte));
        }
    }

    fn finish(&self) -> u64 {
        self.0 % 16
    }
}

impl BuildHasher for Colliding {
    type Hasher = CollidingHasher;

    fn build_hasher(&self) -> Self::Hasher {
        CollidingHasher(0)
    }
}

#[derive(Debug, Clone)]
enum Op {
    Insert(u16, u32),
    Remove(u16),
    Get(u16),
    Upsert(u16),
    RetainBelow(u16),
    Clear,
    ShrinkToFit,
    Reserve(u8),
    Rehash(u8),
}

fn op(keys: u16) -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..keys, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        4 => (0..keys).prop_map(Op::Remove),
        3 => (0..keys).prop_map(Op::Get),
        3 => (0..keys).prop_map(Op::Upsert),
        1 => (0..keys).prop_map(Op::RetainBelow),
        1 => Just(Op::Clear),
        1 => Just(Op::ShrinkToFit),
        1 => any::<u8>().prop_map(Op::Reserve),
        1 => any::<u8>().prop_map(Op::Rehash),
    ]
}

fn check_shape(capacity: usize, len: usize) -> Result<(), TestCaseError> {
    prop_assert!(
        capacity == 0 || (capacity + 1).is_power_of_two(),
        "capacity {} is not 2^k - 1",
        capacity
    );
    prop_assert!(len <= capacity, "len {} above capacity {}", len, capacity);
    Ok(())
}

fn run_map_model<S: BuildHasher + Default>(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut map: HashMap<u16, u32, S> = HashMap::new();
    let mut model: StdHashMap<u16, u32> = StdHashMap::new();

    for op in ops {
        match op {
            Op::Insert(k, v) => {
                prop_assert_eq!(map.insert(k, v), model.insert(k, v));
            }
            Op::Remove(k) => {
                prop_assert_eq!(map.remove(&k), model.remove(&k));
            }
            Op::Get(k) => {
                prop_assert_eq!(map.get(&k), model.get(&k));
                prop_assert_eq!(map.contains_key(&k), model.contains_key(&k));
            }
            Op::Upsert(k) => {
                *map.entry(k).or_insert(0) += 1;
                *model.entry(k).or_insert(0) += 1;
            }
            Op::RetainBelow(limit) => {
                map.retain(|k, _| *k < limit);
                model.retain(|k, _| *k < limit);
            }
            Op::Clear => {
                map.clear();
                model.clear();
            }
            Op::ShrinkToFit => {
                map.shrink_to_fit();
            }
            Op::Reserve(n) => {
                let before = map.capacity();
                map.reserve(usize::from(n));
                prop_assert!(map.capacity() >= before);
            }
            Op::Rehash(n) => {
                map.rehash(usize::from(n));
            }
        }
        prop_assert_eq!(map.len(), model.len());
        check_shape(map.capacity(), map.len())?;
    }

    let mut seen: Vec<(u16, u32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
    let mut expected: Vec<(u16, u32)> = model.into_iter().collect();
    seen.sort_unstable();
    expected.sort_unstable();
    prop_assert_eq!(seen, expected);
    Ok(())
}

proptest! {
    #[test]
    fn prop_map_matches_std(ops in proptest::collection::vec(op(512), 1..400)) {
        run_map_model::<RandomState>(ops)?;
    }

    #[test]
    fn prop_map_matches_std_with_colliding_hashes(ops in proptest::collection::vec(op(64), 1..300)) {
        run_map_model::<Colliding>(ops)?;
    }

    #[test]
    fn prop_set_operations_match_std(
        a in proptest::collection::vec(0u16..200, 0..100),
        b in proptest::collection::vec(0u16..200, 0..100),
    ) {
        let set_a: HashSet<u16, RandomState> = a.iter().copied().collect();
        let set_b: HashSet<u16, RandomState> = b.iter().copied().collect();
        let std_a: StdHashSet<u16> = a.iter().copied().collect();
        let std_b: StdHashSet<u16> = b.iter().copied().collect();

        let sorted = |it: &mut dyn Iterator<Item = &u16>| {
            let mut v: Vec<u16> = it.copied().collect();
            v.sort_unstable();
            v
        };

        prop_assert_eq!(sorted(&mut set_a.union(&set_b)), sorted(&mut std_a.union(&std_b)));
        prop_assert_eq!(
            sorted(&mut set_a.intersection(&set_b)),
            sorted(&mut std_a.intersection(&std_b))
        );
        prop_assert_eq!(
            sorted(&mut set_a.difference(&set_b)),
            sorted(&mut std_a.difference(&std_b))
        );
        prop_assert_eq!(
            sorted(&mut set_a.symmetric_difference(&set_b)),
            sorted(&mut std_a.symmetric_difference(&std_b))
        );
        prop_assert_eq!(set_a.is_subset(&set_b), std_a.is_subset(&std_b));
        prop_assert_eq!(set_a.is_disjoint(&set_b), std_a.is_disjoint(&std_b));
    }

    #[test]
    fn prop_merge_moves_only_absent_keys(
        a in proptest::collection::vec(0u16..100, 0..60),
        b in proptest::collection::vec(0u16..100, 0..60),
    ) {
        let mut set_a: HashSet<u16, RandomState> = a.iter().copied().collect();
        let mut set_b: HashSet<u16, RandomState> = b.iter().copied().collect();
        let std_a: StdHashSet<u16> = a.iter().copied().collect();
        let std_b: StdHashSet<u16> = b.iter().copied().collect();

        set_a.merge(&mut set_b);

        let union: StdHashSet<u16> = std_a.union(&std_b).copied().collect();
        let shared: StdHashSet<u16> = std_a.intersection(&std_b).copied().collect();
        prop_assert_eq!(set_a.iter().copied().collect::<StdHashSet<u16>>(), union);
        prop_assert_eq!(set_b.iter().copied().collect::<StdHashSet<u16>>(), shared);
    }

    #[test]
    fn prop_cursor_erase_during_walk(keys in proptest::collection::hash_set(any::<u32>(), 0..300), modulus in 2u32..5) {
        let state = RandomState::new();
        let hasher = |v: &u32| state.hash_one(v);
        let mut table: HashTable<u32> = HashTable::new();
        for k in &keys {
            table.insert_unique(hasher(k), *k, hasher);
        }

        // Erasing never moves other elements, so the successor cursor taken
        // before an erase stays valid.
        let mut cursor = table.cursor_begin();
        while !table.is_end(cursor) {
            let next = table.advance(cursor);
            if *table.get_at(cursor) % modulus == 0 {
                table.erase_at(cursor);
            }
            cursor = next;
        }

        let expected: StdHashSet<u32> = keys.iter().copied().filter(|k| k % modulus != 0).collect();
        prop_assert_eq!(table.iter().copied().collect::<StdHashSet<u32>>(), expected);
        prop_assert_eq!(table.len(), keys.iter().filter(|k| *k % modulus != 0).count());
    }
}
