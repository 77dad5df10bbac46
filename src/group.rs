//! The Probe Engine's SIMD group scan (spec §4.3).
//!
//! A [`Group`] is a `WIDTH`-byte run of control bytes loaded in one shot and
//! compared against a target byte (or against the EMPTY/DELETED encodings)
//! with a single vector instruction, producing a [`BitMask`] of matching
//! slots. Three hardware paths are provided (SSE2, NEON, and a portable
//! word-at-a-time SWAR fallback); exactly one is compiled in per target,
//! selected by `cfg`.
//!
//! Grounded on `sse2_metadata.hpp`/`emilib3s.hpp`'s `_mm_cmpeq_epi8` +
//! `_mm_movemask_epi8` pattern for the SSE2 path, and on the SWAR bit-hack
//! (`cmp ^ repeat(byte)`, then high-bit extraction) used by every
//! non-SIMD-capable SwissTable in the wild, including the generic fallback in
//! `musli-zerocopy`'s `swiss::raw::generic`.

use crate::bitmask::BitMask;
use crate::metadata::Tag;

cfg_if::cfg_if! {
    if #[cfg(all(target_feature = "sse2", any(target_arch = "x86", target_arch = "x86_64")))] {
        mod sse2;
        use sse2 as imp;
    } else if #[cfg(all(target_arch = "aarch64", target_feature = "neon"))] {
        mod neon;
        use neon as imp;
    } else {
        mod generic;
        use generic as imp;
    }
}

/// A loaded run of control bytes, `Group::WIDTH` bytes wide.
#[derive(Copy, Clone)]
pub struct Group(imp::GroupImpl);

impl Group {
    /// Width of a group in bytes. Fixed at 16 across all backends: the
    /// baseline chosen in spec §9 ("16 for baseline (SSE2/NEON)"). Capacity
    /// is always a multiple of this.
    pub const WIDTH: usize = imp::WIDTH;

    /// A statically allocated all-EMPTY group, used as the initial table for
    /// zero-capacity tables so `new()` never allocates (mirrors
    /// `bucket_group::empty_group()` in `simd_hash_map.hpp`).
    #[inline]
    pub(crate) const fn static_empty() -> &'static [u8; Group::WIDTH] {
        imp::static_empty()
    }

    /// Loads `WIDTH` bytes starting at `ptr`. The read may be unaligned; the
    /// table layout still reserves the sentinel tail so the load never reads
    /// out of the allocation (spec §3, "sentinel tail").
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `WIDTH` bytes.
    #[inline]
    pub(crate) unsafe fn load(ptr: *const u8) -> Self {
        Group(imp::GroupImpl::load(ptr))
    }

    /// Bitmask of slots whose control byte equals `tag` exactly (used to find
    /// `FILLED(h2)` matches for a fingerprint).
    #[inline]
    pub(crate) fn match_byte(self, tag: Tag) -> BitMask {
        self.0.match_byte(tag.0)
    }

    /// Bitmask of EMPTY slots. Any set bit here terminates an unsuccessful
    /// probe (spec §4.3).
    #[inline]
    pub(crate) fn match_empty(self) -> BitMask {
        self.0.match_empty()
    }

    /// Bitmask of DELETED (tombstone) slots.
    #[inline]
    pub(crate) fn match_deleted(self) -> BitMask {
        self.0.match_deleted()
    }

    /// Bitmask of EMPTY or DELETED slots — the complement of FILLED.
    #[inline]
    pub(crate) fn match_empty_or_deleted(self) -> BitMask {
        self.0.match_empty_or_deleted()
    }

    /// Bitmask of FILLED slots (sign bit clear), used by iteration to skip
    /// straight to occupied slots with one comparison per group.
    #[inline]
    pub(crate) fn match_full(self) -> BitMask {
        self.0.match_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{DELETED, EMPTY};

    #[test]
    fn group_width_is_sixteen() {
        assert_eq!(Group::WIDTH, 16);
    }

    #[test]
    fn match_distinguishes_empty_deleted_full() {
        let mut bytes = [EMPTY.0; 16];
        bytes[0] = DELETED.0;
        bytes[1] = Tag::full(5).0;
        bytes[2] = Tag::full(5).0;

        let group = unsafe { Group::load(bytes.as_ptr()) };
        assert_eq!(group.match_empty().iter().count(), 13);
        assert_eq!(group.match_deleted().iter().count(), 1);
        assert_eq!(group.match_full().iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            group.match_byte(Tag::full(5)).iter().collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(group.match_byte(Tag::full(6)).iter().count(), 0);
    }
}
