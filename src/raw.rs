//! `RawTable<T, A>`: the untyped storage, probe sequence, and insert/find/
//! erase/rehash engine (spec §4.1–§4.4). `map.rs`/`set.rs` build the typed
//! public API on top of this; `T` is `(K, V)` for the map and `K` for the
//! set, mirroring `simd_hash_map.hpp`'s single `bucket_group<T, Size>`
//! template used for both flavors.
//!
//! Grounded on `emilib3s.hpp`'s probe/insert/erase/rehash shape and on the
//! teacher's `shm/hashtable.rs` (`ht_lookup`/`ht_insert`/`ht_remove`) for the
//! raw-pointer, `# Safety`-documented style.

use std::alloc::Layout;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::alloc::{handle_alloc_failure, Allocator, Global};
use crate::error::TryReserveError;
use crate::group::Group;
use crate::metadata::{h1, h2, Tag, DELETED, EMPTY};

/// Default `len / capacity` ceiling before a forced rehash (spec §6,
/// `max_load_factor` default 7/8).
const MAX_LOAD_NUM: usize = 7;
const MAX_LOAD_DEN: usize = 8;

#[inline]
fn bucket_mask_to_capacity(bucket_mask: usize) -> usize {
    let buckets = bucket_mask + 1;
    (buckets * MAX_LOAD_NUM) / MAX_LOAD_DEN
}

/// Smallest bucket count (a power of two, a multiple of `Group::WIDTH`) that
/// can hold `capacity` items without exceeding the max load factor. `0` stays
/// `0` — the lazily-allocated empty table (spec §3, "Lifecycle").
///
/// Grounded on `simd_hash_map.hpp`'s `next_multiple_of` capacity rounding
/// (SUPPLEMENTED FEATURES #2 in SPEC_FULL.md).
pub(crate) fn capacity_to_buckets(capacity: usize) -> Option<usize> {
    if capacity == 0 {
        return Some(0);
    }
    let adjusted = capacity.checked_mul(MAX_LOAD_DEN)?;
    let min_buckets = adjusted / MAX_LOAD_NUM + 1;
    Some(min_buckets.max(Group::WIDTH).next_power_of_two())
}

/// Combined-allocation layout: control bytes (plus `Group::WIDTH` sentinel),
/// then the slot array, padded so the slot array starts at a valid alignment
/// for `T` (spec §4.1, "one combined allocation ... with alignment padding").
fn calculate_layout<T>(buckets: usize) -> Option<(Layout, usize)> {
    debug_assert!(buckets == 0 || buckets.is_power_of_two());
    let ctrl_len = buckets.checked_add(Group::WIDTH)?;
    let ctrl_layout = Layout::array::<u8>(ctrl_len).ok()?;
    let slots_layout = Layout::array::<T>(buckets).ok()?;
    let (combined, slots_offset) = ctrl_layout.extend(slots_layout).ok()?;
    Some((combined.pad_to_align(), slots_offset))
}

/// A group-aligned linear probe sequence (spec §4.3): `g0`, `g0 + G`,
/// `g0 + 2G`, ... wrapping at `bucket_mask`. `bucket_mask + 1` is always a
/// multiple of `Group::WIDTH`, so group alignment is preserved by wraparound.
struct ProbeSeq {
    pos: usize,
    step: u32,
}

impl ProbeSeq {
    #[inline]
    fn move_next(&mut self, bucket_mask: usize) {
        self.pos = (self.pos + Group::WIDTH) & bucket_mask;
        self.step += 1;
    }
}

/// The untyped table: control bytes plus a typed slot array, behind a single
/// allocation. Carries everything spec §3 names as per-instance table state.
pub(crate) struct RawTableInner<T, A: Allocator> {
    ctrl: NonNull<u8>,
    slots: NonNull<T>,
    /// `0` means the table has no real allocation yet (the static-empty
    /// singleton, spec §4.1: "new() never allocates"). Otherwise
    /// `bucket_mask + 1` is the real bucket count.
    bucket_mask: usize,
    items: usize,
    /// Budget of still-EMPTY slots before a forced rehash. Decremented only
    /// when an insert consumes a genuine EMPTY (not a reclaimed tombstone),
    /// so heavy erase/insert churn alone can't silently exhaust it without
    /// tripping a rehash that also clears tombstones.
    growth_left: usize,
    max_group_displacement: u32,
    alloc: A,
}

// SAFETY: `RawTableInner` behaves like a `Vec<T>` plus a byte buffer: it owns
// its `T`s and its allocator, so `Send`/`Sync` should follow `T`/`A` exactly.
unsafe impl<T: Send, A: Allocator + Send> Send for RawTableInner<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for RawTableInner<T, A> {}

impl<T, A: Allocator> RawTableInner<T, A> {
    #[inline]
    pub(crate) fn new_in(alloc: A) -> Self {
        RawTableInner {
            // Cast is sound: the static empty group is never written through,
            // only read (the table never attempts an insert while
            // `bucket_mask == 0`; see `find_or_find_insert_slot`'s callers,
            // which always `reserve(1)` first).
            ctrl: NonNull::new(Group::static_empty().as_ptr() as *mut u8).unwrap(),
            slots: NonNull::dangling(),
            bucket_mask: 0,
            items: 0,
            growth_left: 0,
            max_group_displacement: 0,
            alloc,
        }
    }

    pub(crate) fn try_with_capacity(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        let buckets = capacity_to_buckets(capacity).ok_or_else(TryReserveError::capacity_overflow)?;
        if buckets == 0 {
            return Ok(Self::new_in(alloc));
        }
        Self::try_with_buckets(buckets, alloc)
    }

    fn try_with_buckets(buckets: usize, alloc: A) -> Result<Self, TryReserveError> {
        debug_assert!(buckets.is_power_of_two() && buckets >= Group::WIDTH);
        let (layout, slots_offset) =
            calculate_layout::<T>(buckets).ok_or_else(TryReserveError::capacity_overflow)?;
        let ptr = alloc
            .allocate(layout)
            .ok_or_else(|| TryReserveError::alloc_error(layout))?;
        // SAFETY: `ptr` was just allocated with `layout`, which reserves
        // `buckets + Group::WIDTH` control bytes starting at offset 0.
        unsafe {
            ptr.as_ptr().write_bytes(EMPTY.0, buckets + Group::WIDTH);
        }
        let slots = NonNull::new(unsafe { ptr.as_ptr().add(slots_offset) } as *mut T).unwrap();
        Ok(RawTableInner {
            ctrl: ptr,
            slots,
            bucket_mask: buckets - 1,
            items: 0,
            growth_left: bucket_mask_to_capacity(buckets - 1),
            max_group_displacement: 0,
            alloc,
        })
    }

    pub(crate) fn with_capacity(capacity: usize, alloc: A) -> Self {
        match Self::try_with_capacity(capacity, alloc) {
            Ok(table) => table,
            Err(_) => {
                // Only `capacity_to_buckets` overflow can reach here without
                // a concrete `Layout`; reconstruct one purely to report it.
                handle_alloc_failure(Layout::new::<u8>())
            }
        }
    }

    #[inline]
    pub(crate) fn is_empty_singleton(&self) -> bool {
        self.bucket_mask == 0
    }

    #[inline]
    pub(crate) fn buckets(&self) -> usize {
        if self.is_empty_singleton() {
            0
        } else {
            self.bucket_mask + 1
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        bucket_mask_to_capacity(self.bucket_mask)
    }

    #[inline]
    unsafe fn ctrl(&self, index: usize) -> *mut u8 {
        self.ctrl.as_ptr().add(index)
    }

    #[inline]
    unsafe fn ctrl_tag(&self, index: usize) -> Tag {
        Tag(*self.ctrl(index))
    }

    #[inline]
    unsafe fn set_ctrl(&mut self, index: usize, tag: Tag) {
        *self.ctrl(index) = tag.0;
    }

    #[inline]
    fn probe_seq(&self, hash: u64) -> ProbeSeq {
        ProbeSeq {
            pos: h1(hash) & self.bucket_mask & !(Group::WIDTH - 1),
            step: 0,
        }
    }

    /// Lookup (spec §4.3 "Lookup"): scans at most `max_group_displacement +
    /// 1` groups. By invariant 3, any live key sharing this probe path would
    /// have been found within that many groups, so exhausting the range
    /// without a match or an EMPTY conclusively means "absent".
    pub(crate) fn find(&self, hash: u64, mut eq: impl FnMut(usize) -> bool) -> Option<usize> {
        if self.is_empty_singleton() {
            return None;
        }
        let tag = h2(hash);
        let mut probe = self.probe_seq(hash);
        for _ in 0..=self.max_group_displacement {
            unsafe {
                let group = Group::load(self.ctrl(probe.pos));
                for bit in group.match_byte(tag) {
                    let index = (probe.pos + bit) & self.bucket_mask;
                    if eq(index) {
                        return Some(index);
                    }
                }
                if group.match_empty().any_bit_set() {
                    return None;
                }
            }
            probe.move_next(self.bucket_mask);
        }
        None
    }

    /// Combined find-or-prepare-insert (spec §4.3 "Insert" steps 3–4):
    /// `Ok(index)` if `key_eq` already matches a FILLED slot, `Err(index)` for
    /// the slot to write into otherwise (tombstone reused if one was seen on
    /// the path, else the first EMPTY). Caller must have already ensured
    /// `growth_left > 0` — this never allocates.
    ///
    /// # Safety
    /// The table must not be the empty singleton.
    pub(crate) unsafe fn find_or_find_insert_slot(
        &mut self,
        hash: u64,
        mut eq: impl FnMut(usize) -> bool,
    ) -> Result<usize, usize> {
        debug_assert!(!self.is_empty_singleton());
        let tag = h2(hash);
        let mut probe = self.probe_seq(hash);
        let mut first_hole: Option<usize> = None;
        loop {
            let group = Group::load(self.ctrl(probe.pos));
            for bit in group.match_byte(tag) {
                let index = (probe.pos + bit) & self.bucket_mask;
                if eq(index) {
                    return Ok(index);
                }
            }
            if first_hole.is_none() {
                if let Some(bit) = group.match_deleted().lowest_set_bit() {
                    first_hole = Some((probe.pos + bit) & self.bucket_mask);
                }
            }
            if let Some(bit) = group.match_empty().lowest_set_bit() {
                let dst = first_hole.unwrap_or((probe.pos + bit) & self.bucket_mask);
                self.max_group_displacement = self.max_group_displacement.max(probe.step);
                return Err(dst);
            }
            probe.move_next(self.bucket_mask);
        }
    }

    /// Finds an insertion slot with no duplicate check — used for
    /// `insert_unique` (caller promises absence) and for reinsertion during
    /// rehash (where the table is freshly allocated and tombstone-free, so
    /// `first_hole` never fires there). Reclaims the first tombstone seen
    /// along the probe path exactly as `find_or_find_insert_slot` does —
    /// `allow_tombstone_reclamation` (spec §6) defaults on and doesn't need
    /// `eq`, only a scan of `match_deleted()` alongside `match_empty()`.
    ///
    /// # Safety
    /// The table must not be the empty singleton, and no live key equal to
    /// the one being inserted may already be present.
    pub(crate) unsafe fn find_insert_slot_unique(&mut self, hash: u64) -> usize {
        debug_assert!(!self.is_empty_singleton());
        let mut probe = self.probe_seq(hash);
        let mut first_hole: Option<usize> = None;
        loop {
            let group = Group::load(self.ctrl(probe.pos));
            if first_hole.is_none() {
                if let Some(bit) = group.match_deleted().lowest_set_bit() {
                    first_hole = Some((probe.pos + bit) & self.bucket_mask);
                }
            }
            if let Some(bit) = group.match_empty().lowest_set_bit() {
                let dst = first_hole.unwrap_or((probe.pos + bit) & self.bucket_mask);
                self.max_group_displacement = self.max_group_displacement.max(probe.step);
                return dst;
            }
            probe.move_next(self.bucket_mask);
        }
    }

    /// Marks `index` FILLED with `hash`'s fingerprint and bumps bookkeeping.
    /// Caller has already written the slot's value.
    ///
    /// # Safety
    /// `index` must be a hole returned by `find_or_find_insert_slot`'s `Err`
    /// arm or by `find_insert_slot_unique`, not yet re-read as EMPTY/DELETED.
    pub(crate) unsafe fn record_insert(&mut self, index: usize, hash: u64, was_empty: bool) {
        self.set_ctrl(index, h2(hash));
        self.items += 1;
        if was_empty {
            self.growth_left -= 1;
        }
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> *mut T {
        // SAFETY: caller guarantees `index < buckets()`.
        unsafe { self.slots.as_ptr().add(index) }
    }

    /// Erase (spec §4.3 "Erase" step 2): conservative tombstone rule plus the
    /// backward-in-group DELETED→EMPTY cleanup walk. Does not drop the slot's
    /// value — callers read it out first.
    ///
    /// # Safety
    /// `index` must name a currently FILLED slot.
    pub(crate) unsafe fn erase_no_drop(&mut self, index: usize) {
        let group_start = index & !(Group::WIDTH - 1);
        let group = Group::load(self.ctrl(group_start));
        if group.match_empty().any_bit_set() {
            self.set_ctrl(index, EMPTY);
            let mut i = index;
            while i > group_start {
                i -= 1;
                if self.ctrl_tag(i).is_deleted() {
                    self.set_ctrl(i, EMPTY);
                } else {
                    break;
                }
            }
            self.growth_left += 1;
        } else {
            self.set_ctrl(index, DELETED);
        }
        self.items -= 1;
    }

    /// Resets every slot to EMPTY without freeing storage (spec §4.5
    /// `clear`). Does not drop values — callers drop them first.
    pub(crate) fn clear_no_drop(&mut self) {
        if self.is_empty_singleton() {
            return;
        }
        unsafe {
            self.ctrl
                .as_ptr()
                .write_bytes(EMPTY.0, self.buckets() + Group::WIDTH);
        }
        self.items = 0;
        self.growth_left = bucket_mask_to_capacity(self.bucket_mask);
        self.max_group_displacement = 0;
    }

    /// Ensures room for `additional` more items, rehashing if needed.
    /// `hasher` recomputes a moved item's hash from its slot contents.
    pub(crate) fn reserve(&mut self, additional: usize, hasher: impl Fn(&T) -> u64) {
        if additional > self.growth_left {
            if let Err(_) = self.try_reserve_rehash(additional, hasher) {
                handle_alloc_failure(Layout::new::<u8>());
            }
        }
    }

    pub(crate) fn try_reserve(
        &mut self,
        additional: usize,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<(), TryReserveError> {
        if additional > self.growth_left {
            self.try_reserve_rehash(additional, hasher)
        } else {
            Ok(())
        }
    }

    fn try_reserve_rehash(
        &mut self,
        additional: usize,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<(), TryReserveError> {
        let new_items = self
            .items
            .checked_add(additional)
            .ok_or_else(TryReserveError::capacity_overflow)?;
        let full_capacity = bucket_mask_to_capacity(self.bucket_mask);
        // Below half the real capacity, a same-size rehash reclaims enough
        // tombstones; otherwise grow (spec §4.4 step 1 plus the Rehash
        // Controller's trigger conditions).
        if self.bucket_mask != 0 && new_items <= full_capacity / 2 {
            self.try_resize_to_buckets(self.bucket_mask + 1, hasher)
        } else {
            let target = std::cmp::max(new_items, full_capacity + 1);
            let new_buckets =
                capacity_to_buckets(target).ok_or_else(TryReserveError::capacity_overflow)?;
            self.try_resize_to_buckets(new_buckets, hasher)
        }
    }

    /// Shrinks to the smallest bucket count that fits `self.items` at the
    /// load factor, if that is smaller than the current allocation
    /// (SUPPLEMENTED FEATURES #1, `shrink_to_fit`).
    pub(crate) fn shrink_to(&mut self, min_capacity: usize, hasher: impl Fn(&T) -> u64) {
        let min_capacity = std::cmp::max(min_capacity, self.items);
        let new_buckets = match capacity_to_buckets(min_capacity) {
            Some(b) => b,
            None => return,
        };
        if new_buckets >= self.buckets() {
            return;
        }
        if self
            .try_resize_to_buckets(new_buckets, hasher)
            .is_err()
        {
            // Shrinking never needs more memory than is already in use;
            // failure here means the allocator is in a bad state, which
            // spec §7 treats as fatal everywhere else too.
            handle_alloc_failure(Layout::new::<u8>());
        }
    }

    /// Rehash Controller (spec §4.4): allocate a fresh `new_buckets`-sized
    /// table, move every FILLED slot over via a fresh (tombstone-free)
    /// insert, then free the old buffer. Used both to grow and — when
    /// `new_buckets` equals the current bucket count — to compact away
    /// tombstones; see DESIGN.md for why this crate folds the "in-place"
    /// tombstone-clearing rehash into the same always-reallocate path instead
    /// of `hashbrown`'s zero-allocation swap-chain algorithm.
    fn try_resize_to_buckets(
        &mut self,
        new_buckets: usize,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<(), TryReserveError> {
        debug_assert!(new_buckets.is_power_of_two() && new_buckets >= Group::WIDTH);
        let mut new_table = RawTableInner::<T, A>::try_with_buckets(new_buckets, self.alloc.clone())?;

        if !self.is_empty_singleton() {
            unsafe {
                for i in 0..self.buckets() {
                    if self.ctrl_tag(i).is_full() {
                        let item = self.slot(i).read();
                        let hash = hasher(&item);
                        let dst = new_table.find_insert_slot_unique(hash);
                        new_table.set_ctrl(dst, h2(hash));
                        new_table.slot(dst).write(item);
                    }
                }
            }
        }
        new_table.items = self.items;
        new_table.growth_left -= self.items;

        unsafe {
            self.free_buckets();
        }
        *self = new_table;
        Ok(())
    }

    /// Frees the control+slot buffer without dropping any slot values.
    ///
    /// # Safety
    /// Every FILLED slot's value must already be moved out or dropped.
    unsafe fn free_buckets(&mut self) {
        if self.is_empty_singleton() {
            return;
        }
        let buckets = self.buckets();
        if let Some((layout, _)) = calculate_layout::<T>(buckets) {
            self.alloc.deallocate(self.ctrl, layout);
        }
    }

    /// Drops every FILLED slot's value, then frees the buffer. Used by
    /// `RawTable`'s `Drop` impl.
    pub(crate) unsafe fn drop_all_and_free(&mut self) {
        if !self.is_empty_singleton() {
            for i in 0..self.buckets() {
                if self.ctrl_tag(i).is_full() {
                    std::ptr::drop_in_place(self.slot(i));
                }
            }
        }
        self.free_buckets();
    }

    /// Iterates every FILLED slot's index, group-at-a-time (spec §4.3
    /// "Iteration"), skipping straight past empty groups via `match_full`.
    /// Decoupled from `A`: iteration only needs the control/slot pointers
    /// and counts, not the allocator, so `map.rs`/`set.rs`'s public iterator
    /// types don't need to carry an allocator type parameter either.
    pub(crate) fn raw_iter(&self) -> RawIter<'_, T> {
        RawIter {
            ctrl: self.ctrl,
            buckets: self.buckets(),
            next_group: 0,
            current: None,
            remaining: self.items,
            marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn slots_ptr(&self) -> NonNull<T> {
        self.slots
    }
}

impl<T> RawTableInner<T, Global> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::new_in(Global)
    }
}

/// Iterates FILLED bucket indices group-at-a-time. Grounded on
/// `emilib3s.hpp`'s iterator, which advances through `_states` a SIMD word
/// at a time rather than byte-by-byte.
#[derive(Clone)]
pub(crate) struct RawIter<'a, T> {
    ctrl: NonNull<u8>,
    buckets: usize,
    next_group: usize,
    current: Option<crate::bitmask::BitMaskIter>,
    remaining: usize,
    marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for RawIter<'a, T> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if let Some(iter) = &mut self.current {
                if let Some(bit) = iter.next() {
                    let index = self.next_group - Group::WIDTH + bit;
                    self.remaining -= 1;
                    return Some(index);
                }
            }
            if self.next_group >= self.buckets {
                return None;
            }
            // SAFETY: `next_group` is a group-aligned offset within the
            // control array (plus its always-present sentinel tail), valid
            // for the lifetime `'a` this iterator borrows.
            let group = unsafe { Group::load(self.ctrl.as_ptr().add(self.next_group)) };
            self.next_group += Group::WIDTH;
            self.current = Some(group.match_full().iter());
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for RawIter<'a, T> {}

/// The typed table: owns `RawTableInner` plus the `T` marker used to drive
/// drop-check and variance.
pub(crate) struct RawTable<T, A: Allocator = Global> {
    pub(crate) inner: RawTableInner<T, A>,
    marker: PhantomData<T>,
}

impl<T> RawTable<T, Global> {
    #[inline]
    pub(crate) fn new() -> Self {
        RawTable {
            inner: RawTableInner::new(),
            marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        RawTable {
            inner: RawTableInner::with_capacity(capacity, Global),
            marker: PhantomData,
        }
    }
}

impl<T, A: Allocator> RawTable<T, A> {
    #[inline]
    pub(crate) fn new_in(alloc: A) -> Self {
        RawTable {
            inner: RawTableInner::new_in(alloc),
            marker: PhantomData,
        }
    }

    pub(crate) fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        Ok(RawTable {
            inner: RawTableInner::try_with_capacity(capacity, alloc)?,
            marker: PhantomData,
        })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    #[inline]
    pub(crate) fn find(&self, hash: u64, mut eq: impl FnMut(&T) -> bool) -> Option<&T> {
        let slots = self.inner.slots;
        let index = self
            .inner
            .find(hash, move |i| eq(unsafe { &*slots.as_ptr().add(i) }))?;
        Some(unsafe { &*self.inner.slot(index) })
    }

    #[inline]
    pub(crate) fn find_mut(&mut self, hash: u64, mut eq: impl FnMut(&T) -> bool) -> Option<&mut T> {
        let slots = self.inner.slots;
        let index = self
            .inner
            .find(hash, move |i| eq(unsafe { &*slots.as_ptr().add(i) }))?;
        Some(unsafe { &mut *self.inner.slot(index) })
    }

    /// Insert with a caller-supplied duplicate check; spec's `insert`/
    /// `insert_or_assign`/`emplace` all funnel through this. Returns the
    /// slot and whether it was freshly inserted.
    ///
    /// `eq` only ever needs to borrow the key being inserted (it is compared
    /// against already-FILLED slots during probing); `make` is called at
    /// most once, only once the destination slot is known, so it is free to
    /// move the key (and value) into the constructed `T`. Splitting the two
    /// this way — rather than taking `value: T` up front — is what lets a
    /// non-`Copy` key be both borrowed by `eq` and moved by `make` without a
    /// borrow-checker conflict.
    pub(crate) fn insert_entry(
        &mut self,
        hash: u64,
        mut eq: impl FnMut(&T) -> bool,
        make: impl FnOnce() -> T,
        hasher: impl Fn(&T) -> u64,
    ) -> (&mut T, bool) {
        self.inner.reserve(1, &hasher);
        let slots = self.inner.slots;
        let result = unsafe {
            self.inner
                .find_or_find_insert_slot(hash, move |i| eq(&*slots.as_ptr().add(i)))
        };
        match result {
            Ok(index) => (unsafe { &mut *self.inner.slot(index) }, false),
            Err(index) => {
                let was_empty = unsafe { !self.inner.ctrl_tag(index).is_deleted() };
                unsafe {
                    self.inner.slot(index).write(make());
                    self.inner.record_insert(index, hash, was_empty);
                }
                (unsafe { &mut *self.inner.slot(index) }, true)
            }
        }
    }

    /// Insert without a duplicate check (spec's `insert_unique`: "caller
    /// promises `!contains(k)`").
    ///
    /// # Safety
    /// No slot equal to `value` under the table's key-equality relation may
    /// already be present.
    pub(crate) unsafe fn insert_unique(
        &mut self,
        hash: u64,
        value: T,
        hasher: impl Fn(&T) -> u64,
    ) -> &mut T {
        self.inner.reserve(1, &hasher);
        let index = self.inner.find_insert_slot_unique(hash);
        let was_empty = !self.inner.ctrl_tag(index).is_deleted();
        self.inner.slot(index).write(value);
        self.inner.record_insert(index, hash, was_empty);
        &mut *self.inner.slot(index)
    }

    pub(crate) fn remove_entry(&mut self, hash: u64, mut eq: impl FnMut(&T) -> bool) -> Option<T> {
        let slots = self.inner.slots;
        let index = self
            .inner
            .find(hash, move |i| eq(unsafe { &*slots.as_ptr().add(i) }))?;
        unsafe {
            let value = self.inner.slot(index).read();
            self.inner.erase_no_drop(index);
            Some(value)
        }
    }

    pub(crate) fn clear(&mut self) {
        unsafe {
            for index in self.inner.raw_iter().collect::<Vec<_>>() {
                std::ptr::drop_in_place(self.inner.slot(index));
            }
        }
        self.inner.clear_no_drop();
    }

    pub(crate) fn reserve(&mut self, additional: usize, hasher: impl Fn(&T) -> u64) {
        self.inner.reserve(additional, hasher);
    }

    pub(crate) fn try_reserve(
        &mut self,
        additional: usize,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<(), TryReserveError> {
        self.inner.try_reserve(additional, hasher)
    }

    pub(crate) fn shrink_to_fit(&mut self, hasher: impl Fn(&T) -> u64) {
        self.inner.shrink_to(0, hasher);
    }

    pub(crate) fn retain(&mut self, mut f: impl FnMut(&mut T) -> bool) {
        let indices: Vec<usize> = self.inner.raw_iter().collect();
        for index in indices {
            unsafe {
                let slot = &mut *self.inner.slot(index);
                if !f(slot) {
                    std::ptr::drop_in_place(slot);
                    self.inner.erase_no_drop(index);
                }
            }
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.inner.raw_iter().map(move |i| unsafe { &*self.inner.slot(i) })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let inner = &self.inner;
        inner
            .raw_iter()
            .map(move |i| unsafe { &mut *inner.slot(i) })
    }

    /// Index-level iterator plus the raw slot pointer, used by `iter.rs` to
    /// build the named `Iter`/`IterMut`/`Keys`/`Values` wrapper types without
    /// tying them to an allocator type parameter.
    #[inline]
    pub(crate) fn raw_index_iter(&self) -> RawIter<'_, T> {
        self.inner.raw_iter()
    }

    #[inline]
    pub(crate) fn slots_ptr(&self) -> NonNull<T> {
        self.inner.slots_ptr()
    }

    /// Removes and returns every entry, eagerly (unlike `std`'s lazy `Drain`,
    /// nothing here is yielded on the fly — the whole table is decanted into
    /// a `Vec` up front and the control bytes reset to EMPTY in one pass).
    /// Simpler than a lazy drain and sufficient since spec.md does not name
    /// `drain` as part of the public contract; kept because `iter.rs`'s
    /// ambient `Drain` type needs *some* source of owned values.
    pub(crate) fn drain(&mut self) -> std::vec::IntoIter<T> {
        let indices: Vec<usize> = self.inner.raw_iter().collect();
        let values: Vec<T> = indices
            .iter()
            .map(|&i| unsafe { self.inner.slot(i).read() })
            .collect();
        self.inner.clear_no_drop();
        values.into_iter()
    }

    pub(crate) fn into_iter_values(mut self) -> std::vec::IntoIter<T> {
        let indices: Vec<usize> = self.inner.raw_iter().collect();
        // `clear_no_drop` below resets every control byte to EMPTY so
        // `Drop` doesn't see the slots we are about to move out as FILLED.
        let values: Vec<T> = indices
            .iter()
            .map(|&i| unsafe { self.inner.slot(i).read() })
            .collect();
        self.inner.clear_no_drop();
        values.into_iter()
    }
}

impl<T, A: Allocator + Clone> Clone for RawTable<T, A>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        let mut new_table = RawTable {
            inner: RawTableInner::try_with_buckets_for_clone(&self.inner),
            marker: PhantomData,
        };
        unsafe {
            for i in 0..self.inner.buckets() {
                if self.inner.ctrl_tag(i).is_full() {
                    let value = (*self.inner.slot(i)).clone();
                    new_table.inner.set_ctrl(i, self.inner.ctrl_tag(i));
                    new_table.inner.slot(i).write(value);
                }
            }
        }
        new_table.inner.items = self.inner.items;
        // The clone carries no tombstones (every slot is either the
        // original's exact FULL byte or a fresh EMPTY), so growth_left is
        // recomputed from scratch rather than copied — copying would
        // understate it by however many DELETED bytes `self` happened to
        // have outstanding.
        if !new_table.inner.is_empty_singleton() {
            new_table.inner.growth_left =
                bucket_mask_to_capacity(new_table.inner.bucket_mask) - self.inner.items;
        }
        new_table.inner.max_group_displacement = self.inner.max_group_displacement;
        new_table
    }
}

impl<T, A: Allocator> RawTableInner<T, A> {
    /// Allocates a same-shape (same bucket count, all-EMPTY) table for
    /// `Clone`, reusing `other`'s allocator. Element-wise copy is filled in
    /// by the caller (SPEC_FULL.md SUPPLEMENTED FEATURES #4 — no POD
    /// `memcpy` fast path, documented in DESIGN.md as a simplification).
    fn try_with_buckets_for_clone(other: &RawTableInner<T, A>) -> Self
    where
        A: Clone,
    {
        if other.is_empty_singleton() {
            return RawTableInner::new_in(other.alloc.clone());
        }
        match RawTableInner::try_with_buckets(other.buckets(), other.alloc.clone()) {
            Ok(table) => table,
            Err(_) => handle_alloc_failure(Layout::new::<u8>()),
        }
    }
}

impl<T, A: Allocator> Drop for RawTable<T, A> {
    fn drop(&mut self) {
        unsafe {
            self.inner.drop_all_and_free();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_u64(x: u64) -> u64 {
        // A cheap avalanche, enough for deterministic unit tests without
        // pulling in the crate's default hasher here.
        let mut h = x;
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51afd7ed558ccd);
        h ^= h >> 33;
        h
    }

    #[test]
    fn capacity_to_buckets_rounds_to_group_width_multiple() {
        assert_eq!(capacity_to_buckets(0), Some(0));
        assert_eq!(capacity_to_buckets(1), Some(16));
        assert_eq!(capacity_to_buckets(14), Some(16));
        assert_eq!(capacity_to_buckets(15), Some(32));
    }

    #[test]
    fn insert_find_erase_round_trip() {
        let mut table: RawTable<(u64, u64)> = RawTable::new();
        for k in 0u64..200 {
            let hash = hash_u64(k);
            table.insert_entry(hash, |(ek, _)| *ek == k, || (k, k * 10), |(ek, _)| hash_u64(*ek));
        }
        assert_eq!(table.len(), 200);
        for k in 0u64..200 {
            let hash = hash_u64(k);
            let found = table.find(hash, |(ek, _)| *ek == k).unwrap();
            assert_eq!(found.1, k * 10);
        }
        for k in (0u64..200).step_by(2) {
            let hash = hash_u64(k);
            assert!(table.remove_entry(hash, |(ek, _)| *ek == k).is_some());
        }
        assert_eq!(table.len(), 100);
        for k in (0u64..200).step_by(2) {
            let hash = hash_u64(k);
            assert!(table.find(hash, |(ek, _)| *ek == k).is_none());
        }
        for k in (1u64..200).step_by(2) {
            let hash = hash_u64(k);
            assert!(table.find(hash, |(ek, _)| *ek == k).is_some());
        }
    }

    #[test]
    fn duplicate_insert_does_not_grow_len() {
        let mut table: RawTable<(u64, u64)> = RawTable::new();
        let hash = hash_u64(7);
        table.insert_entry(hash, |(ek, _)| *ek == 7, || (7, 1), |(ek, _)| hash_u64(*ek));
        table.insert_entry(hash, |(ek, _)| *ek == 7, || (7, 2), |(ek, _)| hash_u64(*ek));
        assert_eq!(table.len(), 1);
        assert_eq!(table.find(hash, |(ek, _)| *ek == 7).unwrap().1, 1);
    }

    #[test]
    fn clear_drops_values_and_keeps_capacity() {
        let mut table: RawTable<(u64, u64)> = RawTable::new();
        for k in 0u64..50 {
            let hash = hash_u64(k);
            table.insert_entry(hash, |(ek, _)| *ek == k, || (k, k), |(ek, _)| hash_u64(*ek));
        }
        let cap_before = table.capacity();
        table.clear();
        assert_eq!(table.len(), 0);
        assert_eq!(table.capacity(), cap_before);
    }
}
