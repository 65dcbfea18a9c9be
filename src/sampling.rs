//! Table sampling.
//!
//! A small random subset of tables records statistics about itself into a
//! process-wide registry: size, capacity, probe lengths, erases, rehashes and
//! the bit patterns of the hashes it has seen. The registry can be walked at
//! any time to find tables with poor hash functions or pathological growth.
//!
//! Sampling is off by default and is enabled at runtime with
//! [`HashtablezSampler::set_enabled`]. Whether a table is sampled is decided
//! once, when it is constructed, by a per-thread countdown whose stride is
//! geometrically distributed with mean [`sample_parameter`]. Without the
//! `sampling` feature the per-table handle is zero-sized and every record
//! call compiles to nothing.
//!
//! [`sample_parameter`]: HashtablezSampler::sample_parameter

#[cfg(feature = "sampling")]
pub use enabled::HashtablezInfo;
#[cfg(feature = "sampling")]
pub use enabled::HashtablezSampler;
#[cfg(feature = "sampling")]
pub use enabled::global_sampler;

#[cfg(feature = "sampling")]
pub(crate) use enabled::HashtablezInfoHandle;
#[cfg(not(feature = "sampling"))]
pub(crate) use disabled::HashtablezInfoHandle;

/// Static facts about a table recorded alongside its statistics.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SampleParams {
    pub(crate) inline_element_size: usize,
    pub(crate) key_size: usize,
    pub(crate) value_size: usize,
    pub(crate) soo_capacity: usize,
}

#[cfg(feature = "sampling")]
mod enabled {
    use std::cell::Cell;
    use std::cell::RefCell;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::PoisonError;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::AtomicU64;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Instant;
    use std::vec::Vec;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rand_distr::Distribution;
    use rand_distr::Geometric;

    use super::SampleParams;
    use crate::group::Group;

    const DEFAULT_SAMPLE_PARAMETER: usize = 1 << 10;
    const DEFAULT_MAX_SAMPLES: usize = 1 << 20;

    /// Statistics recorded by one sampled table.
    ///
    /// Probe lengths are measured in groups: an element found in the first
    /// group it probes has probe length zero.
    #[derive(Debug)]
    pub struct HashtablezInfo {
        /// Current capacity.
        pub capacity: AtomicUsize,
        /// Current number of elements.
        pub size: AtomicUsize,
        /// Erases since the last rehash.
        pub num_erases: AtomicUsize,
        /// Number of rehashes, including growth.
        pub num_rehashes: AtomicUsize,
        /// Longest probe sequence seen on insert.
        pub max_probe_length: AtomicUsize,
        /// Sum of the probe lengths of the elements currently in the table.
        pub total_probe_length: AtomicUsize,
        /// Bitwise OR of every inserted hash.
        pub hashes_bitwise_or: AtomicU64,
        /// Bitwise AND of every inserted hash.
        pub hashes_bitwise_and: AtomicU64,
        /// Bitwise XOR of every inserted hash.
        pub hashes_bitwise_xor: AtomicU64,
        /// Largest reservation requested since the last clear.
        pub max_reserve: AtomicUsize,
        /// Bytes per slot.
        pub inline_element_size: usize,
        /// Size of the key type.
        pub key_size: usize,
        /// Size of the stored value type.
        pub value_size: usize,
        /// Capacity of inline storage, or zero for tables that never use it.
        pub soo_capacity: usize,
        /// The sampling stride that selected this table.
        pub weight: usize,
        /// When the table was sampled.
        pub create_time: Instant,
        /// Position in the registry, kept current under the registry lock.
        registry_index: AtomicUsize,
    }

    impl HashtablezInfo {
        fn new(params: SampleParams, weight: usize) -> Self {
            HashtablezInfo {
                capacity: AtomicUsize::new(0),
                size: AtomicUsize::new(0),
                num_erases: AtomicUsize::new(0),
                num_rehashes: AtomicUsize::new(0),
                max_probe_length: AtomicUsize::new(0),
                total_probe_length: AtomicUsize::new(0),
                hashes_bitwise_or: AtomicU64::new(0),
                hashes_bitwise_and: AtomicU64::new(!0),
                hashes_bitwise_xor: AtomicU64::new(0),
                max_reserve: AtomicUsize::new(0),
                inline_element_size: params.inline_element_size,
                key_size: params.key_size,
                value_size: params.value_size,
                soo_capacity: params.soo_capacity,
                weight,
                create_time: Instant::now(),
                registry_index: AtomicUsize::new(usize::MAX),
            }
        }
    }

    /// A registry of sampled tables.
    ///
    /// Most programs use the process-wide [`global_sampler`]. Tests and tools
    /// that need deterministic sampling can create their own in a `static`
    /// and pass it to [`HashTable::with_capacity_sampled_by`].
    ///
    /// [`HashTable::with_capacity_sampled_by`]: crate::hash_table::HashTable::with_capacity_sampled_by
    #[derive(Debug)]
    pub struct HashtablezSampler {
        enabled: AtomicBool,
        sample_parameter: AtomicUsize,
        max_samples: AtomicUsize,
        dropped_samples: AtomicUsize,
        samples: Mutex<Vec<Arc<HashtablezInfo>>>,
    }

    impl Default for HashtablezSampler {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HashtablezSampler {
        /// Creates a disabled sampler with the default configuration.
        pub const fn new() -> Self {
            HashtablezSampler {
                enabled: AtomicBool::new(false),
                sample_parameter: AtomicUsize::new(DEFAULT_SAMPLE_PARAMETER),
                max_samples: AtomicUsize::new(DEFAULT_MAX_SAMPLES),
                dropped_samples: AtomicUsize::new(0),
                samples: Mutex::new(Vec::new()),
            }
        }

        /// Turns sampling of newly constructed tables on or off. Tables that
        /// are already sampled keep recording.
        pub fn set_enabled(&self, enabled: bool) {
            self.enabled.store(enabled, Ordering::Relaxed);
            log::debug!("hashtablez sampling enabled: {enabled}");
        }

        /// Whether newly constructed tables may be sampled.
        pub fn is_enabled(&self) -> bool {
            self.enabled.load(Ordering::Relaxed)
        }

        /// Sets the mean stride between sampled tables. `1` samples every
        /// table. Zero is treated as one.
        pub fn set_sample_parameter(&self, rate: usize) {
            self.sample_parameter.store(rate.max(1), Ordering::Relaxed);
            log::debug!("hashtablez sample parameter: {rate}");
        }

        /// The mean stride between sampled tables.
        pub fn sample_parameter(&self) -> usize {
            self.sample_parameter.load(Ordering::Relaxed)
        }

        /// Caps the number of live records. Tables selected while the cap is
        /// reached are counted in [`dropped_samples`] instead.
        ///
        /// [`dropped_samples`]: Self::dropped_samples
        pub fn set_max_samples(&self, max: usize) {
            self.max_samples.store(max, Ordering::Relaxed);
            log::debug!("hashtablez max samples: {max}");
        }

        /// The maximum number of live records.
        pub fn max_samples(&self) -> usize {
            self.max_samples.load(Ordering::Relaxed)
        }

        /// Number of tables that were selected for sampling but not recorded
        /// because the registry was full.
        pub fn dropped_samples(&self) -> usize {
            self.dropped_samples.load(Ordering::Relaxed)
        }

        /// Number of live records.
        pub fn len(&self) -> usize {
            self.lock().len()
        }

        /// Whether there are no live records.
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Calls `f` with every live record and returns the number of dropped
        /// samples.
        ///
        /// `f` runs without the registry lock held, so it may construct or
        /// drop tables.
        pub fn iterate(&self, mut f: impl FnMut(&HashtablezInfo)) -> usize {
            let snapshot: Vec<Arc<HashtablezInfo>> = self.lock().clone();
            for info in &snapshot {
                f(info);
            }
            self.dropped_samples()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<HashtablezInfo>>> {
            self.samples.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn register(&self, params: SampleParams, weight: usize) -> Option<Arc<HashtablezInfo>> {
            let mut samples = self.lock();
            if samples.len() >= self.max_samples() {
                let dropped = self.dropped_samples.fetch_add(1, Ordering::Relaxed);
                if dropped == 0 {
                    log::warn!(
                        "hashtablez registry full at {} samples; dropping new samples",
                        samples.len()
                    );
                }
                return None;
            }

            let info = Arc::new(HashtablezInfo::new(params, weight));
            info.registry_index.store(samples.len(), Ordering::Relaxed);
            samples.push(Arc::clone(&info));
            log::trace!("hashtablez registered sample ({} live)", samples.len());
            Some(info)
        }

        fn unregister(&self, info: &Arc<HashtablezInfo>) {
            let mut samples = self.lock();
            let index = info.registry_index.load(Ordering::Relaxed);
            if !samples.get(index).is_some_and(|s| Arc::ptr_eq(s, info)) {
                return;
            }
            samples.swap_remove(index);
            if let Some(moved) = samples.get(index) {
                moved.registry_index.store(index, Ordering::Relaxed);
            }
            log::trace!("hashtablez unregistered sample ({} live)", samples.len());
        }
    }

    static GLOBAL_SAMPLER: HashtablezSampler = HashtablezSampler::new();

    /// The process-wide sampler consulted by default-constructed tables.
    pub fn global_sampler() -> &'static HashtablezSampler {
        &GLOBAL_SAMPLER
    }

    std::thread_local! {
        /// Tables left to construct on this thread before the next sample.
        /// Zero means the countdown has not started.
        static NEXT_SAMPLE: Cell<usize> = const { Cell::new(0) };
        static STRIDE_RNG: RefCell<Option<SmallRng>> = const { RefCell::new(None) };
    }

    fn next_stride(sample_parameter: usize) -> usize {
        if sample_parameter <= 1 {
            return 1;
        }
        let Ok(distribution) = Geometric::new(1.0 / sample_parameter as f64) else {
            return sample_parameter;
        };
        STRIDE_RNG.with(|cell| {
            let mut rng = cell.borrow_mut();
            let rng = rng.get_or_insert_with(|| {
                SmallRng::try_from_os_rng().unwrap_or_else(|_| {
                    SmallRng::seed_from_u64(&NEXT_SAMPLE as *const _ as u64)
                })
            });
            // Failures before the first success, plus the success itself.
            (distribution.sample(rng) as usize).saturating_add(1)
        })
    }

    /// Advances this thread's countdown and returns the stride weight if
    /// the table being constructed should be sampled.
    fn should_sample(sampler: &HashtablezSampler) -> Option<usize> {
        if !sampler.is_enabled() {
            return None;
        }
        let parameter = sampler.sample_parameter();
        if parameter <= 1 {
            return Some(1);
        }
        NEXT_SAMPLE.with(|next| {
            let mut remaining = next.get();
            if remaining == 0 {
                remaining = next_stride(parameter);
            }
            if remaining > 1 {
                next.set(remaining - 1);
                return None;
            }
            let stride = next_stride(parameter);
            next.set(stride);
            Some(stride)
        })
    }

    struct Sample {
        info: Arc<HashtablezInfo>,
        sampler: &'static HashtablezSampler,
    }

    /// A table's link to its record, if it was sampled, and to the sampler
    /// its copies should consult.
    #[derive(Default)]
    pub(crate) struct HashtablezInfoHandle {
        sample: Option<Sample>,
        origin: Option<&'static HashtablezSampler>,
        key_size: usize,
    }

    impl core::fmt::Debug for HashtablezInfoHandle {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.debug_struct("HashtablezInfoHandle")
                .field("sampled", &self.sample.is_some())
                .finish()
        }
    }

    impl Drop for HashtablezInfoHandle {
        fn drop(&mut self) {
            if let Some(sample) = self.sample.take() {
                sample.sampler.unregister(&sample.info);
            }
        }
    }

    impl HashtablezInfoHandle {
        /// A handle for a table that is never sampled, nor are its copies.
        pub(crate) const fn none() -> Self {
            HashtablezInfoHandle {
                sample: None,
                origin: None,
                key_size: 0,
            }
        }

        /// Samples a new table with probability `1 / sample_parameter`.
        pub(crate) fn sample(sampler: &'static HashtablezSampler, params: SampleParams) -> Self {
            let sample = should_sample(sampler).and_then(|weight| {
                let info = sampler.register(params, weight)?;
                Some(Sample { info, sampler })
            });
            HashtablezInfoHandle {
                sample,
                origin: Some(sampler),
                key_size: params.key_size,
            }
        }

        pub(crate) fn sample_global(params: SampleParams) -> Self {
            Self::sample(global_sampler(), params)
        }

        /// Makes a fresh sampling decision for a copy of this table.
        pub(crate) fn resample(&self, params: SampleParams) -> Self {
            match self.origin {
                Some(sampler) => Self::sample(sampler, params),
                None => Self::none(),
            }
        }

        pub(crate) fn key_size(&self) -> usize {
            self.key_size
        }

        #[inline(always)]
        pub(crate) fn is_sampled(&self) -> bool {
            self.sample.is_some()
        }

        #[inline(always)]
        pub(crate) fn info(&self) -> Option<&HashtablezInfo> {
            self.sample.as_ref().map(|s| &*s.info)
        }

        #[inline]
        pub(crate) fn record_storage_changed(&self, size: usize, capacity: usize) {
            if let Some(info) = self.info() {
                info.size.store(size, Ordering::Relaxed);
                info.capacity.store(capacity, Ordering::Relaxed);
                if size == 0 {
                    info.total_probe_length.store(0, Ordering::Relaxed);
                    info.num_erases.store(0, Ordering::Relaxed);
                }
            }
        }

        #[inline]
        pub(crate) fn record_rehash(&self, total_probe_length: usize) {
            if let Some(info) = self.info() {
                info.total_probe_length
                    .store(total_probe_length / Group::WIDTH, Ordering::Relaxed);
                info.num_erases.store(0, Ordering::Relaxed);
                info.num_rehashes.fetch_add(1, Ordering::Relaxed);
            }
        }

        #[inline]
        pub(crate) fn record_reservation(&self, target_capacity: usize) {
            if let Some(info) = self.info() {
                info.max_reserve.fetch_max(target_capacity, Ordering::Relaxed);
            }
        }

        #[inline]
        pub(crate) fn record_cleared_reservation(&self) {
            if let Some(info) = self.info() {
                info.max_reserve.store(0, Ordering::Relaxed);
            }
        }

        /// `distance_from_desired` is the probe distance in slots.
        #[inline]
        pub(crate) fn record_insert(&self, hash: u64, distance_from_desired: usize) {
            if let Some(info) = self.info() {
                let probe_length = distance_from_desired / Group::WIDTH;
                info.hashes_bitwise_and.fetch_and(hash, Ordering::Relaxed);
                info.hashes_bitwise_or.fetch_or(hash, Ordering::Relaxed);
                info.hashes_bitwise_xor.fetch_xor(hash, Ordering::Relaxed);
                info.max_probe_length
                    .fetch_max(probe_length, Ordering::Relaxed);
                info.total_probe_length
                    .fetch_add(probe_length, Ordering::Relaxed);
                info.size.fetch_add(1, Ordering::Relaxed);
            }
        }

        #[inline]
        pub(crate) fn record_erase(&self) {
            if let Some(info) = self.info() {
                info.size.fetch_sub(1, Ordering::Relaxed);
                info.num_erases.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn params() -> SampleParams {
            SampleParams {
                inline_element_size: 8,
                key_size: 8,
                value_size: 8,
                soo_capacity: 1,
            }
        }

        #[test]
        fn disabled_sampler_never_samples() {
            static SAMPLER: HashtablezSampler = HashtablezSampler::new();
            SAMPLER.set_sample_parameter(1);
            for _ in 0..100 {
                assert!(!HashtablezInfoHandle::sample(&SAMPLER, params()).is_sampled());
            }
            assert!(SAMPLER.is_empty());
        }

        #[test]
        fn parameter_one_samples_everything() {
            static SAMPLER: HashtablezSampler = HashtablezSampler::new();
            SAMPLER.set_enabled(true);
            SAMPLER.set_sample_parameter(1);
            let handles: Vec<_> = (0..10)
                .map(|_| HashtablezInfoHandle::sample(&SAMPLER, params()))
                .collect();
            assert!(handles.iter().all(|h| h.is_sampled()));
            assert_eq!(SAMPLER.len(), 10);
            drop(handles);
            assert!(SAMPLER.is_empty());
        }

        #[test]
        fn max_samples_drops_excess() {
            static SAMPLER: HashtablezSampler = HashtablezSampler::new();
            SAMPLER.set_enabled(true);
            SAMPLER.set_sample_parameter(1);
            SAMPLER.set_max_samples(3);
            let handles: Vec<_> = (0..5)
                .map(|_| HashtablezInfoHandle::sample(&SAMPLER, params()))
                .collect();
            assert_eq!(handles.iter().filter(|h| h.is_sampled()).count(), 3);
            assert_eq!(SAMPLER.dropped_samples(), 2);
            let mut seen = 0;
            assert_eq!(SAMPLER.iterate(|_| seen += 1), 2);
            assert_eq!(seen, 3);
        }

        #[test]
        fn unregister_in_any_order_keeps_the_rest() {
            static SAMPLER: HashtablezSampler = HashtablezSampler::new();
            SAMPLER.set_enabled(true);
            SAMPLER.set_sample_parameter(1);
            let mut handles: Vec<_> = (0..16)
                .map(|_| HashtablezInfoHandle::sample(&SAMPLER, params()))
                .collect();

            for (i, handle) in handles.iter().enumerate() {
                handle.record_storage_changed(i, 15);
            }
            // Drop from the front, the back and the middle.
            for index in [0, 14, 5, 7, 0] {
                handles.remove(index);
            }

            let mut live: Vec<usize> = Vec::new();
            SAMPLER.iterate(|info| live.push(info.size.load(Ordering::Relaxed)));
            live.sort_unstable();
            let mut expected: Vec<usize> = handles
                .iter()
                .map(|h| h.info().unwrap().size.load(Ordering::Relaxed))
                .collect();
            expected.sort_unstable();
            assert_eq!(live, expected);
            assert_eq!(SAMPLER.len(), 11);

            drop(handles);
            assert!(SAMPLER.is_empty());
        }

        #[cfg_attr(miri, ignore)]
        #[test]
        fn sampling_rate_is_roughly_one_in_parameter() {
            static SAMPLER: HashtablezSampler = HashtablezSampler::new();
            SAMPLER.set_enabled(true);
            SAMPLER.set_sample_parameter(100);
            let mut sampled = 0usize;
            for _ in 0..100_000 {
                if HashtablezInfoHandle::sample(&SAMPLER, params()).is_sampled() {
                    sampled += 1;
                }
            }
            assert!((500..2000).contains(&sampled), "sampled {sampled}");
        }

        #[test]
        fn records_accumulate() {
            static SAMPLER: HashtablezSampler = HashtablezSampler::new();
            SAMPLER.set_enabled(true);
            SAMPLER.set_sample_parameter(1);
            let handle = HashtablezInfoHandle::sample(&SAMPLER, params());

            handle.record_storage_changed(0, 7);
            handle.record_insert(0b1100, 0);
            handle.record_insert(0b1010, 2 * Group::WIDTH);
            handle.record_reservation(10);
            handle.record_reservation(4);
            handle.record_erase();

            let info = handle.info().unwrap();
            assert_eq!(info.capacity.load(Ordering::Relaxed), 7);
            assert_eq!(info.size.load(Ordering::Relaxed), 1);
            assert_eq!(info.num_erases.load(Ordering::Relaxed), 1);
            assert_eq!(info.max_probe_length.load(Ordering::Relaxed), 2);
            assert_eq!(info.total_probe_length.load(Ordering::Relaxed), 2);
            assert_eq!(info.hashes_bitwise_and.load(Ordering::Relaxed), 0b1000);
            assert_eq!(info.hashes_bitwise_or.load(Ordering::Relaxed), 0b1110);
            assert_eq!(info.hashes_bitwise_xor.load(Ordering::Relaxed), 0b0110);
            assert_eq!(info.max_reserve.load(Ordering::Relaxed), 10);
            assert_eq!(info.soo_capacity, 1);

            handle.record_rehash(3 * Group::WIDTH);
            assert_eq!(info.total_probe_length.load(Ordering::Relaxed), 3);
            assert_eq!(info.num_erases.load(Ordering::Relaxed), 0);
            assert_eq!(info.num_rehashes.load(Ordering::Relaxed), 1);

            handle.record_cleared_reservation();
            assert_eq!(info.max_reserve.load(Ordering::Relaxed), 0);
        }
    }
}

#[cfg(not(feature = "sampling"))]
mod disabled {
    use super::SampleParams;

    /// Zero-sized stand-in used when sampling is compiled out.
    #[derive(Debug, Default)]
    pub(crate) struct HashtablezInfoHandle;

    impl HashtablezInfoHandle {
        pub(crate) const fn none() -> Self {
            HashtablezInfoHandle
        }

        #[inline(always)]
        pub(crate) fn sample_global(_params: SampleParams) -> Self {
            HashtablezInfoHandle
        }

        #[inline(always)]
        pub(crate) fn resample(&self, _params: SampleParams) -> Self {
            HashtablezInfoHandle
        }

        #[inline(always)]
        pub(crate) fn key_size(&self) -> usize {
            0
        }

        #[inline(always)]
        pub(crate) fn is_sampled(&self) -> bool {
            false
        }

        #[inline(always)]
        pub(crate) fn record_storage_changed(&self, _size: usize, _capacity: usize) {}

        #[inline(always)]
        pub(crate) fn record_rehash(&self, _total_probe_length: usize) {}

        #[inline(always)]
        pub(crate) fn record_reservation(&self, _target_capacity: usize) {}

        #[inline(always)]
        pub(crate) fn record_cleared_reservation(&self) {}

        #[inline(always)]
        pub(crate) fn record_insert(&self, _hash: u64, _distance_from_desired: usize) {}

        #[inline(always)]
        pub(crate) fn record_erase(&self) {}
    }

}
