//! Triangular probe sequence.
//!
//! Starting from `h1 & mask`, the `i`-th probe is at
//! `(start + WIDTH * i * (i + 1) / 2) & mask`. With `mask + 1` a power of two
//! this visits every group-aligned offset exactly once before repeating.

#[derive(Clone, Copy, Debug)]
pub(crate) struct ProbeSeq<const WIDTH: usize> {
    mask: usize,
    offset: usize,
    index: usize,
}

impl<const WIDTH: usize> ProbeSeq<WIDTH> {
    #[inline(always)]
    pub(crate) fn new(h1: usize, mask: usize) -> Self {
        debug_assert!(mask.wrapping_add(1).is_power_of_two(), "invalid mask {mask}");
        Self {
            mask,
            offset: h1 & mask,
            index: 0,
        }
    }

    /// The current group offset.
    #[inline(always)]
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    /// The slot `lane` positions past the current offset, wrapped.
    #[inline(always)]
    pub(crate) fn offset_at(&self, lane: usize) -> usize {
        (self.offset + lane) & self.mask
    }

    /// Distance travelled so far, in slots.
    #[inline(always)]
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    #[inline(always)]
    pub(crate) fn next(&mut self) {
        self.index += WIDTH;
        self.offset = (self.offset + self.index) & self.mask;
    }
}
