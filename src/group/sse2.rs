//! SSE2 group scan: one 128-bit load and one `pcmpeqb`/`pmovmskb` pair per
//! comparison, covering all 16 slots of a group in a couple of instructions.
//!
//! Grounded directly on `sse2_metadata.hpp`'s `_mm_cmpeq_epi8` +
//! `_mm_movemask_epi8` pattern and `emilib3s.hpp`'s SSE2 branch (`simd_empty`/
//! `simd_delete`/`simd_filled` constant vectors compared with `_mm_cmpeq_epi8`).

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use crate::bitmask::BitMask;
use crate::metadata::{DELETED, EMPTY};

pub(crate) const WIDTH: usize = 16;

#[derive(Copy, Clone)]
pub(crate) struct GroupImpl(__m128i);

impl GroupImpl {
    #[inline]
    pub(crate) unsafe fn load(ptr: *const u8) -> Self {
        GroupImpl(_mm_loadu_si128(ptr as *const __m128i))
    }

    #[inline]
    pub(crate) fn match_byte(self, byte: u8) -> BitMask {
        unsafe {
            let needle = _mm_set1_epi8(byte as i8);
            let cmp = _mm_cmpeq_epi8(self.0, needle);
            BitMask::new(_mm_movemask_epi8(cmp) as u32 as u128, 1)
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
        // High bit set (sign byte negative) marks EMPTY/DELETED under this
        // crate's tag encoding, so a signed-byte comparison against zero
        // gives the same result as checking each byte's sign bit.
        unsafe {
            let zero = _mm_setzero_si128();
            let cmp = _mm_cmpgt_epi8(zero, self.0);
            BitMask::new(_mm_movemask_epi8(cmp) as u32 as u128, 1)
        }
    }

    #[inline]
    pub(crate) fn match_full(self) -> BitMask {
        unsafe {
            let zero = _mm_setzero_si128();
            let cmp = _mm_cmpgt_epi8(self.0, zero);
            let eq_zero = _mm_cmpeq_epi8(self.0, zero);
            let full = _mm_or_si128(cmp, eq_zero);
            BitMask::new(_mm_movemask_epi8(full) as u32 as u128, 1)
        }
    }
}

pub(crate) const fn static_empty() -> &'static [u8; WIDTH] {
    const EMPTY_BYTES: [u8; 16] = [EMPTY.0; 16];
    &EMPTY_BYTES
}
