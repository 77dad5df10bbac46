//! `HashTable<K, V, S, A>`: the typed public map API (spec §4.5) built on
//! [`RawTable`]. Grounded on the teacher's `store.rs`, whose `CachedFunction`
//! wrapped a lower-level cache behind a small, direct method surface
//! (`get`/`set`/`len`) in the same "thin typed shell over an untyped engine"
//! shape this module follows — generalized here to the full spec contract.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FromIterator;

use crate::alloc::{Allocator, Global};
use crate::build_hasher::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::iter::{Drain, IntoIter, Iter, IterMut};
use crate::raw::RawTable;

/// A cache-friendly open-addressing hash map with SIMD-accelerated metadata
/// probing (spec §1–§4). `S` is the [`BuildHasher`]; `A` is the
/// [`Allocator`](crate::alloc::Allocator) backing the single combined
/// control+slot allocation.
pub struct HashTable<K, V, S = DefaultHashBuilder, A: Allocator = Global> {
    hash_builder: S,
    raw: RawTable<(K, V), A>,
}

impl<K, V> HashTable<K, V, DefaultHashBuilder, Global> {
    /// An empty table that allocates nothing until the first insert (spec §3
    /// "Lifecycle").
    #[inline]
    pub fn new() -> Self {
        HashTable {
            hash_builder: DefaultHashBuilder::default(),
            raw: RawTable::new(),
        }
    }

    /// An empty table pre-sized to hold `capacity` items without rehashing.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        HashTable {
            hash_builder: DefaultHashBuilder::default(),
            raw: RawTable::with_capacity(capacity),
        }
    }
}

impl<K, V> Default for HashTable<K, V, DefaultHashBuilder, Global> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashTable<K, V, S, Global> {
    #[inline]
    pub fn with_hasher(hash_builder: S) -> Self {
        HashTable {
            hash_builder,
            raw: RawTable::new(),
        }
    }

    #[inline]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        HashTable {
            hash_builder,
            raw: RawTable::with_capacity(capacity),
        }
    }
}

impl<K, V, S, A: Allocator> HashTable<K, V, S, A> {
    #[inline]
    pub fn new_in(hash_builder: S, alloc: A) -> Self {
        HashTable {
            hash_builder,
            raw: RawTable::new_in(alloc),
        }
    }

    pub fn try_with_capacity_in(
        capacity: usize,
        hash_builder: S,
        alloc: A,
    ) -> Result<Self, TryReserveError> {
        Ok(HashTable {
            hash_builder,
            raw: RawTable::try_with_capacity_in(capacity, alloc)?,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// `len() / capacity()`, or `0.0` for a still-unallocated table (spec
    /// §4.5 `load_factor()`).
    #[inline]
    pub fn load_factor(&self) -> f64 {
        let capacity = self.raw.capacity();
        if capacity == 0 {
            0.0
        } else {
            self.raw.len() as f64 / capacity as f64
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    pub fn reserve(&mut self, additional: usize)
    where
        K: Hash,
        S: BuildHasher,
    {
        let hash_builder = &self.hash_builder;
        self.raw
            .reserve(additional, |(k, _)| hash_builder.hash_one(k));
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError>
    where
        K: Hash,
        S: BuildHasher,
    {
        let hash_builder = &self.hash_builder;
        self.raw
            .try_reserve(additional, |(k, _)| hash_builder.hash_one(k))
    }

    pub fn shrink_to_fit(&mut self)
    where
        K: Hash,
        S: BuildHasher,
    {
        let hash_builder = &self.hash_builder;
        self.raw.shrink_to_fit(|(k, _)| hash_builder.hash_one(k));
    }

    /// Keeps only the entries for which `f` returns `true` (SUPPLEMENTED
    /// FEATURES #5 in SPEC_FULL.md — not named in spec.md's public contract
    /// table, present in spirit in the C++ sources' own erase-while-iterating
    /// test loops).
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.raw.retain(|(k, v)| f(k, v));
    }

    pub fn iter(&self) -> Iter<'_, (K, V)> {
        Iter::new(self.raw.raw_index_iter(), self.raw.slots_ptr())
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, (K, V)> {
        IterMut::new(self.raw.raw_index_iter(), self.raw.slots_ptr())
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    /// Removes and returns every entry (ambient `Drain`, eager — see
    /// `iter.rs`).
    pub fn drain(&mut self) -> Drain<'_, (K, V)> {
        Drain::new(self.raw.drain())
    }
}

impl<K, V, S, A> HashTable<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    #[inline]
    fn hash_of<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        self.hash_builder.hash_one(key)
    }

    /// `find(&k)` (spec §4.5). Returns a value reference rather than the
    /// spec's abstract "iterator" result; see DESIGN.md's Open Question
    /// resolution on iterator-shaped return values.
    pub fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.raw
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    pub fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.raw
            .find_mut(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key)
    }

    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_mut(key)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.raw
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(k, v)| (k, v))
    }

    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.contains(key)
    }

    /// `insert(k, v)` (spec §4.5): inserts if absent. On a duplicate key the
    /// existing value is left untouched (per the spec's "value overwritten
    /// only by `insert_or_assign`") and `v` is dropped. Returns whether the
    /// key was newly inserted, plus a reference to the slot's (old or new)
    /// value.
    ///
    /// Implemented as a `find_mut` followed, only on a miss, by
    /// `insert_unique` — rather than one combined probe — so that `key` can
    /// be borrowed by the lookup and later moved into the table without the
    /// two needs colliding in the borrow checker (the same shape
    /// `hashbrown::HashMap::insert` uses internally).
    pub fn insert(&mut self, key: K, value: V) -> (&mut V, bool) {
        let hash = self.hash_of(&key);
        match self.raw.find_mut(hash, |(k, _)| *k == key) {
            Some(slot) => (&mut slot.1, false),
            None => {
                let hash_builder = &self.hash_builder;
                let slot = unsafe {
                    self.raw
                        .insert_unique(hash, (key, value), |(k, _)| hash_builder.hash_one(k))
                };
                (&mut slot.1, true)
            }
        }
    }

    /// `insert_or_assign(k, v)` (spec §4.5): overwrites the value on a hit.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (&mut V, bool) {
        let hash = self.hash_of(&key);
        match self.raw.find_mut(hash, |(k, _)| *k == key) {
            Some(slot) => {
                slot.1 = value;
                (&mut slot.1, false)
            }
            None => {
                let hash_builder = &self.hash_builder;
                let slot = unsafe {
                    self.raw
                        .insert_unique(hash, (key, value), |(k, _)| hash_builder.hash_one(k))
                };
                (&mut slot.1, true)
            }
        }
    }

    /// `insert_unique(k, v)` (spec §4.5): skips the duplicate check entirely.
    ///
    /// # Safety
    /// The caller must ensure `!self.contains(&k)`; violating this is the UB
    /// spec §7 names for this operation.
    pub unsafe fn insert_unique(&mut self, key: K, value: V) -> &mut V {
        let hash = self.hash_of(&key);
        let hash_builder = &self.hash_builder;
        &mut self
            .raw
            .insert_unique(hash, (key, value), |(k, _)| hash_builder.hash_one(k))
            .1
    }

    /// `erase(&k)` (spec §4.5).
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove(key).is_some()
    }

    /// `remove`/`remove_entry`: same operation as `erase`, returning the
    /// removed value (ambient idiom — every Rust map of this shape names it
    /// `remove`, matching `std::collections::HashMap`).
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.raw.remove_entry(hash, |(k, _)| k.borrow() == key)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S, A: Allocator> fmt::Debug for HashTable<K, V, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter().map(|(k, v)| (k, v))).finish()
    }
}

impl<K, V, S, A> Clone for HashTable<K, V, S, A>
where
    K: Clone,
    V: Clone,
    S: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        HashTable {
            hash_builder: self.hash_builder.clone(),
            raw: self.raw.clone(),
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashTable<K, V, S, Global>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut table = HashTable::with_capacity_and_hasher(iter.size_hint().0, S::default());
        table.extend(iter);
        table
    }
}

impl<K, V, S, A> Extend<(K, V)> for HashTable<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S, A> IntoIterator for &'a HashTable<K, V, S, A>
where
    A: Allocator,
{
    type Item = &'a (K, V);
    type IntoIter = Iter<'a, (K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S, A> IntoIterator for HashTable<K, V, S, A>
where
    A: Allocator,
{
    type Item = (K, V);
    type IntoIter = IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.raw.into_iter_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_find_erase_round_trip() {
        let mut table: HashTable<String, i32> = HashTable::new();
        assert_eq!(table.insert("a".to_string(), 1).1, true);
        assert_eq!(table.insert("b".to_string(), 2).1, true);
        assert_eq!(*table.find("a").unwrap(), 1);
        assert_eq!(*table.find("b").unwrap(), 2);
        assert!(table.find("c").is_none());
        assert_eq!(table.len(), 2);

        assert!(table.erase("a"));
        assert!(!table.erase("a"));
        assert!(table.find("a").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn insert_does_not_overwrite_existing() {
        let mut table: HashTable<&str, i32> = HashTable::new();
        table.insert("k", 1);
        table.insert("k", 2);
        assert_eq!(*table.find("k").unwrap(), 1);
    }

    #[test]
    fn insert_or_assign_overwrites() {
        let mut table: HashTable<&str, i32> = HashTable::new();
        table.insert("k", 1);
        let (_, inserted) = table.insert_or_assign("k", 2);
        assert!(!inserted);
        assert_eq!(*table.find("k").unwrap(), 2);
    }

    #[test]
    fn iter_and_from_iter_round_trip() {
        let pairs: Vec<(i32, i32)> = (0..20).map(|i| (i, i * i)).collect();
        let table: HashTable<i32, i32> = pairs.iter().copied().collect();
        assert_eq!(table.len(), 20);
        let mut seen: Vec<(i32, i32)> = table.iter().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, pairs);
    }

    #[test]
    fn rehash_preserves_all_entries() {
        let mut table: HashTable<i32, i32> = HashTable::new();
        for i in 0..2000 {
            table.insert(i, i * 2);
        }
        assert_eq!(table.len(), 2000);
        for i in 0..2000 {
            assert_eq!(*table.find(&i).unwrap(), i * 2);
        }
    }
}
