use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use swiss_hash::HashTable;
use swiss_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Percentage of the inserted values to erase afterwards, leaving
    /// tombstones behind.
    #[arg(short = 'e', long = "erase_percent", default_value_t = 0)]
    erase_percent: u8,

    /// Reinsert this many fresh values after erasing, to show tombstone reuse.
    #[arg(short = 'r', long = "reinsert", default_value_t = 0)]
    reinsert: usize,

    /// Sample the table and print its sampler record.
    #[arg(short = 's', long = "sample", default_value_t = false)]
    sample: bool,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn insert(table: &mut HashTable<u64>, value: u64) {
    match table.entry(hash_u64(value), |&v| v == value, |&v| hash_u64(v)) {
        Entry::Vacant(entry) => {
            entry.insert(value);
        }
        Entry::Occupied(_) => {
            panic!("Value already exists in table: {}", value);
        }
    }
}

#[cfg(feature = "sampling")]
fn enable_sampling() {
    let sampler = swiss_hash::sampling::global_sampler();
    sampler.set_sample_parameter(1);
    sampler.set_enabled(true);
}

#[cfg(not(feature = "sampling"))]
fn enable_sampling() {
    println!("Built without the `sampling` feature; ignoring --sample");
}

#[cfg(feature = "sampling")]
fn print_samples() {
    use std::sync::atomic::Ordering;

    let sampler = swiss_hash::sampling::global_sampler();
    let dropped = sampler.iterate(|info| {
        println!("Sampled table:");
        println!("  capacity: {}", info.capacity.load(Ordering::Relaxed));
        println!("  size: {}", info.size.load(Ordering::Relaxed));
        println!("  erases: {}", info.num_erases.load(Ordering::Relaxed));
        println!("  rehashes: {}", info.num_rehashes.load(Ordering::Relaxed));
        println!(
            "  max probe length: {}",
            info.max_probe_length.load(Ordering::Relaxed)
        );
        println!(
            "  total probe length: {}",
            info.total_probe_length.load(Ordering::Relaxed)
        );
        println!(
            "  hash bits never set: {:#018x}",
            !info.hashes_bitwise_or.load(Ordering::Relaxed)
        );
        println!(
            "  hash bits always set: {:#018x}",
            info.hashes_bitwise_and.load(Ordering::Relaxed)
        );
        println!("  max reserve: {}", info.max_reserve.load(Ordering::Relaxed));
    });
    println!("Dropped samples: {}", dropped);
}

#[cfg(not(feature = "sampling"))]
fn print_samples() {}

fn main() {
    let args = Args::parse();

    if args.sample {
        enable_sampling();
    }

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);

    println!("Actual capacity: {}", table.capacity());
    println!("Growth left: {}", table.growth_left());
    println!("Filling table with u64 values...");

    let num_values = table.growth_left() as u64;
    for value in 0..num_values {
        insert(&mut table, value);
    }

    println!("Inserted {} values into table", table.len());
    println!(
        "Load factor: {:.2}%",
        (table.len() as f64 / table.capacity().max(1) as f64) * 100.0
    );

    if args.erase_percent > 0 {
        let percent = u64::from(args.erase_percent.min(100));
        let to_erase = num_values * percent / 100;
        for value in 0..to_erase {
            table.erase(hash_u64(value), |&v| v == value);
        }
        println!("Erased {} values", to_erase);
    }

    for value in num_values..num_values + args.reinsert as u64 {
        insert(&mut table, value);
    }
    if args.reinsert > 0 {
        println!(
            "Reinserted {} values, capacity now {}",
            args.reinsert,
            table.capacity()
        );
    }

    table.print_probe_histogram(|&v| hash_u64(v));
    table.debug_stats().print();

    if args.sample {
        print_samples();
    }
}
