use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::BenchmarkGroup;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::WallTime;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

trait KeyValuePair: Clone {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

fn sip_hash<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = SipHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

#[derive(Clone)]
struct TestItem {
    key: String,
    _value: u64,
}

impl KeyValuePair for TestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        sip_hash(&self.key)
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct SmallTestItem {
    key: u64,
}

impl KeyValuePair for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        sip_hash(&self.key)
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct LargeTestItem {
    key: String,
    _value: [u8; 256],
}

impl KeyValuePair for LargeTestItem {
    fn new(key: u64) -> Self {
        let mut value = [0u8; 256];
        for (i, byte) in value.iter_mut().enumerate() {
            *byte = ((key >> ((i % 8) * 8)) & 0xFF) as u8;
        }
        black_box(Self {
            key: format!("key_{:064b}", key),
            _value: value,
        })
    }

    fn hash_key(&self) -> u64 {
        sip_hash(&self.key)
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

/// The operations every benchmark drives, over either engine.
trait Engine<T: KeyValuePair> {
    const NAME: &'static str;

    fn with_capacity(capacity: usize) -> Self;
    fn upsert(&mut self, hash: u64, item: T);
    /// Inserts `item` if absent, removes the stored copy if present.
    fn toggle(&mut self, hash: u64, item: T);
    fn find(&self, hash: u64, item: &T) -> bool;
    fn remove(&mut self, hash: u64, item: &T) -> bool;
    fn visit_all(&self) -> usize;
    fn drain_all(&mut self) -> usize;
}

impl<T: KeyValuePair> Engine<T> for swiss_hash::HashTable<T> {
    const NAME: &'static str = "swiss_hash";

    fn with_capacity(capacity: usize) -> Self {
        swiss_hash::HashTable::with_capacity(capacity)
    }

    fn upsert(&mut self, hash: u64, item: T) {
        match self.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            swiss_hash::hash_table::Entry::Vacant(entry) => {
                black_box(entry.insert(item));
            }
            swiss_hash::hash_table::Entry::Occupied(mut entry) => {
                *entry.get_mut() = item;
            }
        }
    }

    fn toggle(&mut self, hash: u64, item: T) {
        match self.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            swiss_hash::hash_table::Entry::Vacant(entry) => {
                entry.insert(item);
            }
            swiss_hash::hash_table::Entry::Occupied(entry) => {
                black_box(entry.remove());
            }
        }
    }

    fn find(&self, hash: u64, item: &T) -> bool {
        swiss_hash::HashTable::find(self, hash, |v| v.eq_key(item)).is_some()
    }

    fn remove(&mut self, hash: u64, item: &T) -> bool {
        swiss_hash::HashTable::remove(self, hash, |v| v.eq_key(item)).is_some()
    }

    fn visit_all(&self) -> usize {
        self.iter().map(black_box).count()
    }

    fn drain_all(&mut self) -> usize {
        self.drain().map(black_box).count()
    }
}

impl<T: KeyValuePair> Engine<T> for hashbrown::HashTable<T> {
    const NAME: &'static str = "hashbrown";

    fn with_capacity(capacity: usize) -> Self {
        hashbrown::HashTable::with_capacity(capacity)
    }

    fn upsert(&mut self, hash: u64, item: T) {
        match self.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            hashbrown::hash_table::Entry::Vacant(entry) => {
                black_box(entry.insert(item));
            }
            hashbrown::hash_table::Entry::Occupied(mut entry) => {
                *entry.get_mut() = item;
            }
        }
    }

    fn toggle(&mut self, hash: u64, item: T) {
        match self.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            hashbrown::hash_table::Entry::Vacant(entry) => {
                entry.insert(item);
            }
            hashbrown::hash_table::Entry::Occupied(entry) => {
                black_box(entry.remove().0);
            }
        }
    }

    fn find(&self, hash: u64, item: &T) -> bool {
        hashbrown::HashTable::find(self, hash, |v| v.eq_key(item)).is_some()
    }

    fn remove(&mut self, hash: u64, item: &T) -> bool {
        match self.find_entry(hash, |v| v.eq_key(item)) {
            Ok(entry) => {
                black_box(entry.remove().0);
                true
            }
            Err(_) => false,
        }
    }

    fn visit_all(&self) -> usize {
        self.iter().map(black_box).count()
    }

    fn drain_all(&mut self) -> usize {
        self.drain().map(black_box).count()
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 11),
    (1 << 12),
    (1 << 13),
    (1 << 14),
    (1 << 15),
    (1 << 16),
    (1 << 17),
    (1 << 18),
];

fn new_group<'a, T>(c: &'a mut Criterion, name: &str) -> BenchmarkGroup<'a, WallTime> {
    let mut group = c.benchmark_group(format!("{}_{}", name, core::any::type_name::<T>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    group
}

fn random_items<T: KeyValuePair>(count: usize) -> Vec<(u64, T)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let item = T::new(rng.try_next_u64().unwrap_or_default());
            (item.hash_key(), item)
        })
        .collect()
}

fn sequential_items<T: KeyValuePair>(range: core::ops::Range<u64>) -> Vec<(u64, T)> {
    range
        .map(|key| {
            let item = T::new(key);
            (item.hash_key(), item)
        })
        .collect()
}

fn shuffled<T: Clone>(items: &[T]) -> Vec<T> {
    let mut items = items.to_vec();
    items.shuffle(&mut SmallRng::from_os_rng());
    items
}

fn insert_random_with<T: KeyValuePair, E: Engine<T>>(
    group: &mut BenchmarkGroup<'_, WallTime>,
    items: &[(u64, T)],
    size: usize,
    preallocate: bool,
) {
    let len = size;
    group.throughput(Throughput::Elements(len as u64));
    group.bench_function(E::NAME, |b| {
        b.iter_batched(
            || shuffled(items),
            |items| {
                let mut table = E::with_capacity(if preallocate { len } else { 0 });
                for (hash, item) in items.into_iter().take(len) {
                    table.upsert(hash, item);
                }
                black_box(table)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_random<T: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    for (name, preallocate) in [("insert_random", false), ("insert_random_preallocated", true)] {
        let mut group = new_group::<T>(c, name);
        for &size in &SIZES[..=MAX_SIZE] {
            let items = random_items::<T>(size);
            insert_random_with::<T, swiss_hash::HashTable<T>>(&mut group, &items, size, preallocate);
            insert_random_with::<T, hashbrown::HashTable<T>>(&mut group, &items, size, preallocate);
        }
        group.finish();
    }
}

fn find_with<T: KeyValuePair, E: Engine<T>>(
    group: &mut BenchmarkGroup<'_, WallTime>,
    stored: &[(u64, T)],
    probes: &[(u64, T)],
) {
    let mut table = E::with_capacity(0);
    for (hash, item) in stored.iter().cloned() {
        table.upsert(hash, item);
    }

    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function(E::NAME, |b| {
        b.iter(|| {
            let mut found = 0usize;
            for (hash, item) in probes {
                found += usize::from(table.find(*hash, item));
            }
            black_box(found)
        })
    });
}

fn bench_find<T: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    for (name, hit_percent) in [("find_hit", 100u64), ("find_miss", 0), ("find_hit_miss", 50)] {
        let mut group = new_group::<T>(c, name);
        for &size in &SIZES[..=MAX_SIZE] {
            let len = size as u64;
            let stored = sequential_items::<T>(0..len);
            let hits = len * hit_percent / 100;
            let mut probes = sequential_items::<T>(0..hits);
            probes.extend(sequential_items::<T>(len..len + (len - hits)));
            let probes = shuffled(&probes);

            find_with::<T, swiss_hash::HashTable<T>>(&mut group, &stored, &probes);
            find_with::<T, hashbrown::HashTable<T>>(&mut group, &stored, &probes);
        }
        group.finish();
    }
}

fn remove_with<T: KeyValuePair, E: Engine<T>>(
    group: &mut BenchmarkGroup<'_, WallTime>,
    items: &[(u64, T)],
) {
    group.throughput(Throughput::Elements(items.len() as u64));
    group.bench_function(E::NAME, |b| {
        b.iter_batched(
            || {
                let mut table = E::with_capacity(0);
                for (hash, item) in items.iter().cloned() {
                    table.upsert(hash, item);
                }
                (table, shuffled(items))
            },
            |(mut table, order)| {
                for (hash, item) in &order {
                    black_box(table.remove(*hash, item));
                }
                black_box(table)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove<T: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = new_group::<T>(c, "remove");
    for &size in &SIZES[..=MAX_SIZE] {
        let len = size as u64;
        let items = sequential_items::<T>(0..len);
        remove_with::<T, swiss_hash::HashTable<T>>(&mut group, &items);
        remove_with::<T, hashbrown::HashTable<T>>(&mut group, &items);
    }
    group.finish();
}

fn iterate_with<T: KeyValuePair, E: Engine<T>>(
    group: &mut BenchmarkGroup<'_, WallTime>,
    items: &[(u64, T)],
) {
    let mut table = E::with_capacity(0);
    for (hash, item) in items.iter().cloned() {
        table.upsert(hash, item);
    }
    group.throughput(Throughput::Elements(items.len() as u64));
    group.bench_function(format!("{}_iter", E::NAME), |b| {
        b.iter(|| black_box(table.visit_all()))
    });

    group.bench_function(format!("{}_drain", E::NAME), |b| {
        b.iter_batched(
            || {
                let mut table = E::with_capacity(0);
                for (hash, item) in items.iter().cloned() {
                    table.upsert(hash, item);
                }
                table
            },
            |mut table| black_box(table.drain_all()),
            BatchSize::SmallInput,
        )
    });
}

fn bench_iteration<T: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = new_group::<T>(c, "iteration");
    for &size in &SIZES[..=MAX_SIZE] {
        let len = size as u64;
        let items = sequential_items::<T>(0..len);
        iterate_with::<T, swiss_hash::HashTable<T>>(&mut group, &items);
        iterate_with::<T, hashbrown::HashTable<T>>(&mut group, &items);
    }
    group.finish();
}

fn churn_with<T: KeyValuePair, E: Engine<T>>(
    group: &mut BenchmarkGroup<'_, WallTime>,
    toggles: &[(u64, T)],
) {
    group.throughput(Throughput::Elements(toggles.len() as u64));
    group.bench_function(E::NAME, |b| {
        b.iter_batched(
            || shuffled(toggles),
            |toggles| {
                let mut table = E::with_capacity(0);
                for (hash, item) in toggles {
                    table.toggle(hash, item);
                }
                black_box(table)
            },
            BatchSize::SmallInput,
        )
    });
}

/// Every key is inserted and removed once, in random order, which leaves a
/// steady stream of tombstones behind.
fn bench_churn<T: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = new_group::<T>(c, "churn");
    for &size in &SIZES[..=MAX_SIZE] {
        let toggles = sequential_items::<T>(0..size as u64)
            .into_iter()
            .flat_map(|pair| [pair.clone(), pair])
            .collect::<Vec<_>>();
        churn_with::<T, swiss_hash::HashTable<T>>(&mut group, &toggles);
        churn_with::<T, hashbrown::HashTable<T>>(&mut group, &toggles);
    }
    group.finish();
}

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Remove,
    Find,
}

fn mixed_with<T: KeyValuePair, E: Engine<T>>(
    group: &mut BenchmarkGroup<'_, WallTime>,
    operations: &[Operation],
    key_space: usize,
) {
    const KEY_SPACE_MULTIPLIER: f32 = 2.0;

    let insert_distr = Zipf::new(key_space as f32, 1.0).unwrap();
    let find_remove_distr = Zipf::new(key_space as f32 * KEY_SPACE_MULTIPLIER, 1.0).unwrap();
    let mut rng = SmallRng::from_os_rng();

    group.throughput(Throughput::Elements(operations.len() as u64));
    group.bench_function(E::NAME, |b| {
        b.iter_batched(
            || shuffled(operations),
            |operations| {
                let mut table = E::with_capacity(0);
                for operation in operations {
                    match operation {
                        Operation::Insert => {
                            let item = T::new(rng.sample(insert_distr) as u64);
                            table.upsert(item.hash_key(), item);
                        }
                        Operation::Remove => {
                            let item = T::new(rng.sample(find_remove_distr) as u64);
                            black_box(table.remove(item.hash_key(), &item));
                        }
                        Operation::Find => {
                            let item = T::new(rng.sample(find_remove_distr) as u64);
                            black_box(table.find(item.hash_key(), &item));
                        }
                    }
                }
                black_box(table)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_mixed_zipf<T: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    for exponent in [1.0, 1.3] {
        let mut group = new_group::<T>(c, &format!("mixed_zipf_{:.01}", exponent));
        for &size in &SIZES[..=MAX_SIZE] {
            let mut rng = SmallRng::from_os_rng();
            let op_distr = Zipf::new(3.0, exponent).unwrap();
            let operations = (0..size * 3)
                .map(|_| {
                    let op_choice: f64 = rng.sample(op_distr);
                    if op_choice <= 1.0 {
                        Operation::Find
                    } else if op_choice <= 2.0 {
                        Operation::Insert
                    } else {
                        Operation::Remove
                    }
                })
                .collect::<Vec<Operation>>();

            mixed_with::<T, swiss_hash::HashTable<T>>(&mut group, &operations, size);
            mixed_with::<T, hashbrown::HashTable<T>>(&mut group, &operations, size);
        }
        group.finish();
    }
}

/// Many tables of a handful of elements each, where inline storage and small
/// capacities dominate.
fn bench_small_tables(c: &mut Criterion) {
    const TABLES: usize = 1 << 12;

    let mut group = new_group::<SmallTestItem>(c, "small_tables");
    for len in [1usize, 2, 4, 7] {
        let items = sequential_items::<SmallTestItem>(0..len as u64);
        group.throughput(Throughput::Elements((TABLES * len) as u64));

        group.bench_function(format!("swiss_hash_{len}"), |b| {
            b.iter(|| {
                let tables = (0..TABLES)
                    .map(|_| {
                        let mut table: swiss_hash::HashTable<SmallTestItem> =
                            swiss_hash::HashTable::new();
                        for (hash, item) in items.iter().cloned() {
                            Engine::upsert(&mut table, hash, item);
                        }
                        table
                    })
                    .collect::<Vec<swiss_hash::HashTable<SmallTestItem>>>();
                black_box(tables)
            })
        });

        group.bench_function(format!("hashbrown_{len}"), |b| {
            b.iter(|| {
                let tables = (0..TABLES)
                    .map(|_| {
                        let mut table: hashbrown::HashTable<SmallTestItem> =
                            hashbrown::HashTable::new();
                        for (hash, item) in items.iter().cloned() {
                            Engine::upsert(&mut table, hash, item);
                        }
                        table
                    })
                    .collect::<Vec<hashbrown::HashTable<SmallTestItem>>>();
                black_box(tables)
            })
        });
    }
    group.finish();
}

/// The set adapters, hashing with their default builders.
fn bench_set_api(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_api_u64");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in &SIZES[..=6] {
        let keys = shuffled(&(0..size as u64).collect::<Vec<_>>());
        group.throughput(Throughput::Elements(size as u64 * 2));

        group.bench_function(format!("swiss_hash_{size}"), |b| {
            b.iter(|| {
                let mut set: swiss_hash::HashSet<u64> = swiss_hash::HashSet::new();
                for key in &keys {
                    set.insert(*key);
                }
                let hits = keys.iter().filter(|k| set.contains(*k)).count();
                black_box((set, hits))
            })
        });

        group.bench_function(format!("hashbrown_{size}"), |b| {
            b.iter(|| {
                let mut set: hashbrown::HashSet<u64> = hashbrown::HashSet::new();
                for key in &keys {
                    set.insert(*key);
                }
                let hits = keys.iter().filter(|k| set.contains(*k)).count();
                black_box((set, hits))
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_mixed_zipf::<SmallTestItem, 8>,
    bench_mixed_zipf::<TestItem, 8>,
    bench_mixed_zipf::<LargeTestItem, 5>,
    bench_churn::<SmallTestItem, 8>,
    bench_churn::<TestItem, 8>,
    bench_churn::<LargeTestItem, 5>,
    bench_insert_random::<SmallTestItem, 8>,
    bench_insert_random::<TestItem, 8>,
    bench_insert_random::<LargeTestItem, 5>,
    bench_find::<SmallTestItem, 8>,
    bench_find::<TestItem, 8>,
    bench_find::<LargeTestItem, 5>,
    bench_remove::<SmallTestItem, 8>,
    bench_remove::<TestItem, 8>,
    bench_remove::<LargeTestItem, 5>,
    bench_iteration::<SmallTestItem, 8>,
    bench_iteration::<TestItem, 8>,
    bench_iteration::<LargeTestItem, 5>,
    bench_small_tables,
    bench_set_api,
);

criterion_main!(benches);
