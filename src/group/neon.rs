//! NEON group scan for aarch64. Mirrors the SSE2 path's logic (compare,
//! then pack a per-byte match into a bitmask) using NEON's narrowing/shift
//! trick in place of `pmovmskb`, which ARM has no direct equivalent for.

use core::arch::aarch64::*;

use crate::bitmask::BitMask;
use crate::metadata::{DELETED, EMPTY};

pub(crate) const WIDTH: usize = 16;

#[derive(Copy, Clone)]
pub(crate) struct GroupImpl(uint8x16_t);

/// Packs a byte-lane all-ones/all-zeros comparison vector into one bit per
/// lane, matching `_mm_movemask_epi8`'s semantics (stride-1 BitMask): bit `k`
/// of the result corresponds to lane `k` of `cmp`.
///
/// Each lane of `cmp` is either all-ones or all-zeros. ANDing against a
/// vector of distinct power-of-two weights (`1, 2, 4, ..., 128` repeated per
/// 8-lane half) turns a matching lane into its weight and a non-matching
/// lane into zero; since the weights don't overlap, a horizontal add across
/// each half sums to the OR of the matched weights, i.e. an 8-bit movemask
/// for that half.
#[inline]
unsafe fn movemask(cmp: uint8x16_t) -> u128 {
    const WEIGHTS: [u8; 16] = [
        1, 2, 4, 8, 16, 32, 64, 128, 1, 2, 4, 8, 16, 32, 64, 128,
    ];
    let weights = vld1q_u8(WEIGHTS.as_ptr());
    let masked = vandq_u8(cmp, weights);
    let lo = vaddv_u8(vget_low_u8(masked)) as u128;
    let hi = vaddv_u8(vget_high_u8(masked)) as u128;
    lo | (hi << 8)
}

impl GroupImpl {
    #[inline]
    pub(crate) unsafe fn load(ptr: *const u8) -> Self {
        GroupImpl(vld1q_u8(ptr))
    }

    #[inline]
    pub(crate) fn match_byte(self, byte: u8) -> BitMask {
        unsafe {
            let needle = vdupq_n_u8(byte);
            let cmp = vceqq_u8(self.0, needle);
            BitMask::new(movemask(cmp), 1)
        }
    }

    #[inline]
    pub(crate) fn match_empty(self) -> BitMask {
        self.match_byte(EMPTY.0)
    }

    #[inline]
    pub(crate) fn match_deleted(self) -> BitMask {
        self.match_byte(DELETED.0)
    }

    #[inline]
    pub(crate) fn match_empty_or_deleted(self) -> BitMask {
        unsafe {
            let high_bit = vandq_u8(self.0, vdupq_n_u8(0x80));
            let is_set = vceqq_u8(high_bit, vdupq_n_u8(0x80));
            BitMask::new(movemask(is_set), 1)
        }
    }

    #[inline]
    pub(crate) fn match_full(self) -> BitMask {
        unsafe {
            let high_bit = vandq_u8(self.0, vdupq_n_u8(0x80));
            let is_clear = vceqq_u8(high_bit, vdupq_n_u8(0x00));
            BitMask::new(movemask(is_clear), 1)
        }
    }
}

pub(crate) const fn static_empty() -> &'static [u8; WIDTH] {
    const EMPTY_BYTES: [u8; 16] = [EMPTY.0; 16];
    &EMPTY_BYTES
}

// Only runs on aarch64/neon hosts; `group.rs`'s shared tests run against
// whichever backend the host actually compiles, so this backend gets its own
// odd-offset regression case rather than relying on that.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Tag;

    #[test]
    fn match_byte_reports_odd_lanes() {
        let mut bytes = [EMPTY.0; 16];
        bytes[1] = Tag::full(5).0;
        bytes[3] = Tag::full(5).0;
        bytes[15] = Tag::full(5).0;

        let group = unsafe { GroupImpl::load(bytes.as_ptr()) };
        let hits = group.match_byte(Tag::full(5).0).iter().collect::<Vec<_>>();
        assert_eq!(hits, vec![1, 3, 15]);
    }

    #[test]
    fn match_byte_reports_every_lane_independently() {
        for i in 0..16 {
            let mut bytes = [EMPTY.0; 16];
            bytes[i] = Tag::full(5).0;
            let group = unsafe { GroupImpl::load(bytes.as_ptr()) };
            assert_eq!(
                group.match_byte(Tag::full(5).0).iter().collect::<Vec<_>>(),
                vec![i],
                "lane {i} not reported"
            );
        }
    }
}
