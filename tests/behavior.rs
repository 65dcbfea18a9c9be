//! Growth, tombstone and cursor behavior observed through the public API.

use std::hash::BuildHasher;
use std::hash::RandomState;

use swiss_hash::HashMap;
use swiss_hash::HashSet;
use swiss_hash::HashTable;
use test_log::test;

fn hasher(state: &RandomState) -> impl Fn(&u64) -> u64 + '_ {
    move |v| state.hash_one(v)
}

#[test]
fn capacities_double_while_growing() {
    let state = RandomState::new();
    let hash = hasher(&state);
    let mut table: HashTable<u64> = HashTable::new();
    assert_eq!(table.capacity(), 1);

    let mut capacity = table.capacity();
    for k in 0..5_000u64 {
        table.insert_unique(hash(&k), k, &hash);
        let now = table.capacity();
        if now != capacity {
            assert_eq!(now, capacity * 2 + 1, "grew from {capacity} to {now}");
            capacity = now;
        }
        assert!(table.len() <= table.capacity());
    }
    assert_eq!(table.len(), 5_000);
}

#[cfg(not(feature = "generations"))]
#[test]
fn churn_reuses_tombstones_without_growing() {
    let state = RandomState::new();
    let hash = hasher(&state);
    let mut table: HashTable<u64> = HashTable::with_capacity(800);
    for k in 0..700u64 {
        table.insert_unique(hash(&k), k, &hash);
    }
    let capacity = table.capacity();
    assert!(capacity >= 1023);

    let mut next = 700u64;
    for old in 0..20_000u64 {
        assert!(table.erase(hash(&old), |v| *v == old));
        table.insert_unique(hash(&next), next, &hash);
        next += 1;
        assert_eq!(table.len(), 700);
    }
    assert_eq!(table.capacity(), capacity);

    for k in 20_000..next {
        assert_eq!(table.find(hash(&k), |v| *v == k), Some(&k));
    }
}

#[test]
fn clear_keeps_small_tables_and_releases_large_ones() {
    let mut small: HashSet<u64, RandomState> = (0..10).collect();
    let capacity = small.capacity();
    small.clear();
    assert!(small.is_empty());
    assert_eq!(small.capacity(), capacity);

    let mut large: HashSet<u64, RandomState> = (0..1000).collect();
    assert!(large.capacity() >= 128);
    large.clear();
    assert!(large.is_empty());
    assert!(large.capacity() <= 1);

    large.insert(7);
    assert!(large.contains(&7));
}

#[test]
fn shrink_and_rehash_pick_minimal_capacities() {
    let mut map: HashMap<u64, u64, RandomState> = HashMap::with_capacity(4096);
    for k in 0..10 {
        map.insert(k, k * 2);
    }
    map.shrink_to_fit();
    assert_eq!(map.capacity(), 15);

    map.rehash(200);
    assert_eq!(map.capacity(), 255);
    for k in 0..10 {
        assert_eq!(map.get(&k), Some(&(k * 2)));
    }

    map.retain(|_, _| false);
    map.shrink_to_fit();
    assert!(map.capacity() <= 1);
}

#[test]
fn erasing_by_cursor_keeps_other_cursors_valid() {
    let state = RandomState::new();
    let hash = hasher(&state);
    let mut table: HashTable<u64> = HashTable::new();
    for k in 0..64u64 {
        table.insert_unique(hash(&k), k, &hash);
    }

    let keep = table.find_cursor(hash(&10), |v| *v == 10);
    let gone = table.find_cursor(hash(&11), |v| *v == 11);
    assert_eq!(table.erase_at(gone), 11);
    assert_eq!(*table.get_at(keep), 10);
    assert!(table.is_end(table.find_cursor(hash(&11), |v| *v == 11)));
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "the table was rehashed since the cursor was created")]
fn stale_cursor_panics_after_rehash() {
    let state = RandomState::new();
    let hash = hasher(&state);
    let mut table: HashTable<u64> = HashTable::new();
    for k in 0..8u64 {
        table.insert_unique(hash(&k), k, &hash);
    }
    let cursor = table.find_cursor(hash(&3), |v| *v == 3);
    table.rehash(0, &hash);
    let _ = table.get_at(cursor);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "called with a cursor from a different hash table")]
fn cursor_from_other_table_panics() {
    let state = RandomState::new();
    let hash = hasher(&state);
    let mut a: HashTable<u64> = HashTable::new();
    let mut b: HashTable<u64> = HashTable::new();
    for k in 0..8u64 {
        a.insert_unique(hash(&k), k, &hash);
        b.insert_unique(hash(&k), k, &hash);
    }
    let cursor = a.cursor_begin();
    let _ = b.get_at(cursor);
}

#[test]
#[should_panic(expected = "get_at called on end() cursor")]
fn end_cursor_cannot_be_dereferenced() {
    let table: HashTable<u64> = HashTable::new();
    let _ = table.get_at(table.cursor_end());
}

#[cfg(feature = "sampling")]
mod sampling {
    use std::sync::atomic::Ordering;

    use swiss_hash::HashTable;
    use swiss_hash::sampling::HashtablezSampler;
    use test_log::test;

    static SAMPLER: HashtablezSampler = HashtablezSampler::new();

    #[test]
    fn sampled_table_reports_its_shape() {
        SAMPLER.set_enabled(true);
        SAMPLER.set_sample_parameter(1);

        let mut table: HashTable<u64> = HashTable::with_capacity_sampled_by(0, &SAMPLER);
        assert!(table.is_sampled());
        for k in 0..100u64 {
            table.insert_unique(k.wrapping_mul(0x9E37_79B9_7F4A_7C15), k, |v| {
                v.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            });
        }
        let capacity = table.capacity();

        let mut records = 0;
        let dropped = SAMPLER.iterate(|info| {
            records += 1;
            assert_eq!(info.size.load(Ordering::Relaxed), 100);
            assert_eq!(info.capacity.load(Ordering::Relaxed), capacity);
            assert!(info.num_rehashes.load(Ordering::Relaxed) > 0);
            assert_eq!(info.value_size, size_of::<u64>());
        });
        assert_eq!(records, 1);
        assert_eq!(dropped, 0);

        drop(table);
        assert!(SAMPLER.is_empty());
    }
}
