//! Parallel scanning of a group of control bytes.
//!
//! A group is `Group::WIDTH` consecutive control bytes loaded at once. The
//! SSE2 implementation compares 16 bytes with one vector compare and packs the
//! result with `movemask`; the portable implementation treats 8 bytes as a
//! `u64` and uses exact zero-byte bit tricks. Both report the same lanes for
//! the same bytes, and the choice is made at compile time.

use core::fmt::Debug;

/// A set of lanes within a group, one bit (or one byte) per lane.
///
/// `SHIFT` is log2 of the number of bits per lane: 0 for `movemask` output, 3
/// for the portable implementation where each lane's flag lives in the top
/// bit of its byte.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct BitMask<const WIDTH: usize, const SHIFT: u32>(pub(crate) u64);

impl<const WIDTH: usize, const SHIFT: u32> BitMask<WIDTH, SHIFT> {
    #[inline(always)]
    pub(crate) fn any_bit_set(self) -> bool {
        self.0 != 0
    }

    #[inline(always)]
    pub(crate) fn lowest_bit_set(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.trailing_zeros())
        }
    }

    /// Number of unset lanes below the lowest set lane.
    #[inline(always)]
    pub(crate) fn trailing_zeros(self) -> usize {
        ((self.0.trailing_zeros() >> SHIFT) as usize).min(WIDTH)
    }

    /// Number of unset lanes above the highest set lane.
    #[inline(always)]
    pub(crate) fn leading_zeros(self) -> usize {
        let unused_bits = 64 - ((WIDTH as u32) << SHIFT);
        ((self.0.leading_zeros() - unused_bits) >> SHIFT) as usize
    }
}

impl<const WIDTH: usize, const SHIFT: u32> Iterator for BitMask<WIDTH, SHIFT> {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        let lane = self.lowest_bit_set()?;
        self.0 &= self.0 - 1;
        Some(lane)
    }
}

impl<const WIDTH: usize, const SHIFT: u32> Debug for BitMask<WIDTH, SHIFT> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(*self).finish()
    }
}

#[cfg_attr(
    all(
        any(target_arch = "x86", target_arch = "x86_64"),
        target_feature = "sse2",
        not(feature = "portable-group"),
        not(miri)
    ),
    allow(dead_code)
)]
pub(crate) mod generic {
    use super::BitMask;

    const LSBS: u64 = 0x0101_0101_0101_0101;
    const MSBS: u64 = 0x8080_8080_8080_8080;

    pub(crate) type Mask = BitMask<8, 3>;

    /// Eight control bytes packed little-endian into a `u64`, so lane `i` is
    /// byte `i` regardless of target endianness.
    #[derive(Clone, Copy)]
    pub(crate) struct Group(u64);

    impl Group {
        pub(crate) const WIDTH: usize = 8;

        /// # Safety
        ///
        /// `ptr` must be valid for reads of `WIDTH` bytes.
        #[inline(always)]
        pub(crate) unsafe fn load(ptr: *const u8) -> Self {
            // SAFETY: Caller guarantees `WIDTH` readable bytes; the read is
            // unaligned.
            Group(u64::from_le(unsafe { ptr.cast::<u64>().read_unaligned() }))
        }

        #[inline(always)]
        pub(crate) fn match_byte(self, byte: u8) -> Mask {
            let x = self.0 ^ (LSBS * byte as u64);
            // A byte of `x` is zero iff neither its low seven bits nor its top
            // bit are set; the addition never carries into the next byte.
            BitMask(!(((x & !MSBS).wrapping_add(!MSBS)) | x) & MSBS)
        }

        #[inline(always)]
        pub(crate) fn mask_empty(self) -> Mask {
            // EMPTY is the only byte with the top bit set and bit 1 clear.
            BitMask((self.0 & !(self.0 << 6)) & MSBS)
        }

        #[inline(always)]
        pub(crate) fn mask_full(self) -> Mask {
            BitMask((self.0 ^ MSBS) & MSBS)
        }

        #[inline(always)]
        pub(crate) fn mask_empty_or_deleted(self) -> Mask {
            // EMPTY and DELETED have the top bit set and bit 0 clear.
            BitMask((self.0 & !(self.0 << 7)) & MSBS)
        }

        #[inline(always)]
        pub(crate) fn count_leading_empty_or_deleted(self) -> usize {
            ((self.0 | !(self.0 >> 7)) & LSBS).trailing_zeros() as usize >> 3
        }

        /// # Safety
        ///
        /// `dst` must be valid for writes of `WIDTH` bytes.
        #[inline(always)]
        pub(crate) unsafe fn convert_special_to_empty_and_full_to_deleted(self, dst: *mut u8) {
            let x = self.0 & MSBS;
            let res = ((!x).wrapping_add(x >> 7)) & !LSBS;
            // SAFETY: Caller guarantees `WIDTH` writable bytes.
            unsafe { dst.cast::<u64>().write_unaligned(res.to_le()) };
        }
    }
}

#[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), target_feature = "sse2"))]
#[cfg_attr(any(feature = "portable-group", miri), allow(dead_code))]
pub(crate) mod sse2 {
    #[cfg(target_arch = "x86")]
    use core::arch::x86 as arch;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64 as arch;

    use super::BitMask;
    use crate::control::EMPTY;
    use crate::control::SENTINEL;

    pub(crate) type Mask = BitMask<16, 0>;

    #[derive(Clone, Copy)]
    pub(crate) struct Group(arch::__m128i);

    impl Group {
        pub(crate) const WIDTH: usize = 16;

        /// # Safety
        ///
        /// `ptr` must be valid for reads of `WIDTH` bytes.
        #[inline(always)]
        pub(crate) unsafe fn load(ptr: *const u8) -> Self {
            // SAFETY: Caller guarantees `WIDTH` readable bytes; `loadu` has no
            // alignment requirement.
            Group(unsafe { arch::_mm_loadu_si128(ptr.cast()) })
        }

        #[inline(always)]
        fn movemask(v: arch::__m128i) -> Mask {
            // SAFETY: SSE2 is statically enabled for this module.
            BitMask(unsafe { arch::_mm_movemask_epi8(v) } as u16 as u64)
        }

        #[inline(always)]
        pub(crate) fn match_byte(self, byte: u8) -> Mask {
            // SAFETY: SSE2 is statically enabled for this module.
            unsafe {
                let needle = arch::_mm_set1_epi8(byte as i8);
                Self::movemask(arch::_mm_cmpeq_epi8(needle, self.0))
            }
        }

        #[inline(always)]
        pub(crate) fn mask_empty(self) -> Mask {
            self.match_byte(EMPTY)
        }

        #[inline(always)]
        pub(crate) fn mask_full(self) -> Mask {
            BitMask(!Self::movemask(self.0).0 & 0xFFFF)
        }

        #[inline(always)]
        pub(crate) fn mask_empty_or_deleted(self) -> Mask {
            // SAFETY: SSE2 is statically enabled for this module.
            unsafe {
                let special = arch::_mm_set1_epi8(SENTINEL as i8);
                Self::movemask(arch::_mm_cmpgt_epi8(special, self.0))
            }
        }

        #[inline(always)]
        pub(crate) fn count_leading_empty_or_deleted(self) -> usize {
            (self.mask_empty_or_deleted().0 as u32 + 1).trailing_zeros() as usize
        }

        /// # Safety
        ///
        /// `dst` must be valid for writes of `WIDTH` bytes.
        #[inline(always)]
        pub(crate) unsafe fn convert_special_to_empty_and_full_to_deleted(self, dst: *mut u8) {
            // SAFETY: SSE2 is statically enabled; caller guarantees `WIDTH`
            // writable bytes and `storeu` has no alignment requirement.
            unsafe {
                let msbs = arch::_mm_set1_epi8(i8::MIN);
                let x126 = arch::_mm_set1_epi8(126);
                let special = arch::_mm_cmpgt_epi8(arch::_mm_setzero_si128(), self.0);
                let res = arch::_mm_or_si128(msbs, arch::_mm_andnot_si128(special, x126));
                arch::_mm_storeu_si128(dst.cast(), res);
            }
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(
        any(target_arch = "x86", target_arch = "x86_64"),
        target_feature = "sse2",
        not(feature = "portable-group"),
        not(miri)
    ))] {
        pub(crate) use sse2::Group;
        pub(crate) use sse2::Mask;
    } else {
        pub(crate) use generic::Group;
        pub(crate) use generic::Mask;
    }
}
