//! Type-erased table metadata.

use core::sync::atomic::AtomicUsize;
use core::sync::atomic::Ordering;

use crate::capacity::GrowthInfo;
use crate::capacity::SIZE_BIT_COUNT;
use crate::generation::GenerationInfo;

const SEED_MASK: u64 = 0xFFFF;
const HAS_INFOZ_BIT: u64 = 1 << 16;
const SIZE_SHIFT: u32 = u64::BITS - SIZE_BIT_COUNT;

/// Element count packed with the per-table seed and the sampled flag.
///
/// ```text
/// [ size: 47 bits | has_infoz: 1 bit | seed: 16 bits ]
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TableSize(u64);

impl TableSize {
    #[inline(always)]
    pub(crate) fn size(self) -> usize {
        (self.0 >> SIZE_SHIFT) as usize
    }

    #[inline(always)]
    pub(crate) fn set_size(&mut self, size: usize) {
        debug_assert!((size as u64) < (1 << SIZE_BIT_COUNT));
        self.0 = (self.0 & ((1 << SIZE_SHIFT) - 1)) | ((size as u64) << SIZE_SHIFT);
    }

    #[inline(always)]
    pub(crate) fn increment_size(&mut self) {
        self.0 += 1 << SIZE_SHIFT;
    }

    #[inline(always)]
    pub(crate) fn decrement_size(&mut self) {
        debug_assert!(self.size() > 0);
        self.0 -= 1 << SIZE_SHIFT;
    }

    #[inline(always)]
    pub(crate) fn seed(self) -> u16 {
        (self.0 & SEED_MASK) as u16
    }

    #[inline(always)]
    pub(crate) fn set_seed(&mut self, seed: u16) {
        self.0 = (self.0 & !SEED_MASK) | seed as u64;
    }

    #[inline(always)]
    pub(crate) fn has_infoz(self) -> bool {
        self.0 & HAS_INFOZ_BIT != 0
    }

    #[inline(always)]
    pub(crate) fn set_has_infoz(&mut self, has_infoz: bool) {
        if has_infoz {
            self.0 |= HAS_INFOZ_BIT;
        } else {
            self.0 &= !HAS_INFOZ_BIT;
        }
    }
}

impl core::fmt::Debug for TableSize {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TableSize")
            .field("size", &self.size())
            .field("has_infoz", &self.has_infoz())
            .field("seed", &self.seed())
            .finish()
    }
}

static NEXT_SEED: AtomicUsize = AtomicUsize::new(0);

/// A fresh per-table seed. The stride is odd, so consecutive calls cycle
/// through every 16-bit value before repeating.
#[inline]
pub(crate) fn next_seed() -> u16 {
    NEXT_SEED.fetch_add(0xAD53, Ordering::Relaxed) as u16
}

/// The parts of a table that do not depend on the element type.
#[derive(Debug)]
pub(crate) struct CommonFields {
    pub(crate) capacity: usize,
    pub(crate) size: TableSize,
    pub(crate) growth_info: GrowthInfo,
    pub(crate) generation: GenerationInfo,
}

impl CommonFields {
    pub(crate) fn new(capacity: usize) -> Self {
        let mut size = TableSize::default();
        size.set_seed(next_seed());
        CommonFields {
            capacity,
            size,
            growth_info: GrowthInfo::default(),
            generation: GenerationInfo::new(),
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.size.size()
    }

    #[inline(always)]
    pub(crate) fn seed(&self) -> u16 {
        self.size.seed()
    }
}
