//! `HashSet<K, S, A>`: the set flavor spec §2 describes as sharing layout and
//! algorithms with the map, "set omits the value field". Built atop
//! `RawTable<K, A>` exactly as `map.rs` builds `HashTable` atop
//! `RawTable<(K, V), A>` — the two modules are siblings, not one derived from
//! the other, mirroring how `emiset2s.hpp` and `emilib3s.hpp` are separate
//! headers sharing one probe/rehash design rather than a set-as-map-of-unit
//! wrapper.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FromIterator;

use crate::alloc::{Allocator, Global};
use crate::build_hasher::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::iter::{Drain, IntoIter, Iter};
use crate::raw::RawTable;

/// A cache-friendly open-addressing hash set with SIMD-accelerated metadata
/// probing (spec §1–§4, set flavor).
pub struct HashSet<K, S = DefaultHashBuilder, A: Allocator = Global> {
    hash_builder: S,
    raw: RawTable<K, A>,
}

impl<K> HashSet<K, DefaultHashBuilder, Global> {
    #[inline]
    pub fn new() -> Self {
        HashSet {
            hash_builder: DefaultHashBuilder::default(),
            raw: RawTable::new(),
        }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        HashSet {
            hash_builder: DefaultHashBuilder::default(),
            raw: RawTable::with_capacity(capacity),
        }
    }
}

impl<K> Default for HashSet<K, DefaultHashBuilder, Global> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> HashSet<K, S, Global> {
    #[inline]
    pub fn with_hasher(hash_builder: S) -> Self {
        HashSet {
            hash_builder,
            raw: RawTable::new(),
        }
    }

    #[inline]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        HashSet {
            hash_builder,
            raw: RawTable::with_capacity(capacity),
        }
    }
}

impl<K, S, A: Allocator> HashSet<K, S, A> {
    #[inline]
    pub fn new_in(hash_builder: S, alloc: A) -> Self {
        HashSet {
            hash_builder,
            raw: RawTable::new_in(alloc),
        }
    }

    pub fn try_with_capacity_in(
        capacity: usize,
        hash_builder: S,
        alloc: A,
    ) -> Result<Self, TryReserveError> {
        Ok(HashSet {
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
        self.raw.reserve(additional, |k| hash_builder.hash_one(k));
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError>
    where
        K: Hash,
        S: BuildHasher,
    {
        let hash_builder = &self.hash_builder;
        self.raw
            .try_reserve(additional, |k| hash_builder.hash_one(k))
    }

    pub fn shrink_to_fit(&mut self)
    where
        K: Hash,
        S: BuildHasher,
    {
        let hash_builder = &self.hash_builder;
        self.raw.shrink_to_fit(|k| hash_builder.hash_one(k));
    }

    pub fn retain(&mut self, mut f: impl FnMut(&K) -> bool) {
        self.raw.retain(|k| f(k));
    }

    pub fn iter(&self) -> Iter<'_, K> {
        Iter::new(self.raw.raw_index_iter(), self.raw.slots_ptr())
    }

    pub fn drain(&mut self) -> Drain<'_, K> {
        Drain::new(self.raw.drain())
    }
}

impl<K, S, A> HashSet<K, S, A>
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

    pub fn find<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.raw.find(hash, |k| k.borrow() == key)
    }

    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key)
    }

    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// `insert(k)` (spec §4.5 set flavor): returns `true` iff newly inserted.
    /// Implemented via `find` then, only on a miss, `insert_unique` — see
    /// `map.rs::insert` for why this is split in two rather than one
    /// combined probe.
    pub fn insert(&mut self, key: K) -> bool {
        let hash = self.hash_of(&key);
        if self.raw.find(hash, |k| *k == key).is_some() {
            return false;
        }
        let hash_builder = &self.hash_builder;
        unsafe {
            self.raw.insert_unique(hash, key, |k| hash_builder.hash_one(k));
        }
        true
    }

    /// `insert_unique(k)`: skips the duplicate check.
    ///
    /// # Safety
    /// The caller must ensure `!self.contains(&k)`.
    pub unsafe fn insert_unique(&mut self, key: K) -> &mut K {
        let hash = self.hash_of(&key);
        let hash_builder = &self.hash_builder;
        self.raw.insert_unique(hash, key, |k| hash_builder.hash_one(k))
    }

    /// `erase(&k)` (spec §4.5).
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove(key)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        self.raw.remove_entry(hash, |k| k.borrow() == key).is_some()
    }
}

impl<K: fmt::Debug, S, A: Allocator> fmt::Debug for HashSet<K, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, S, A> Clone for HashSet<K, S, A>
where
    K: Clone,
    S: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        HashSet {
            hash_builder: self.hash_builder.clone(),
            raw: self.raw.clone(),
        }
    }
}

/// Set equality ignoring order (ambient `PartialEq`/`Eq`, spec.md's explicit
/// Non-goal is *iteration* order, not equality; `std::collections::HashSet`
/// carries this and every set in this corpus's examples would too).
impl<K, S, A> PartialEq for HashSet<K, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|k| other.contains(k))
    }
}

impl<K, S, A> Eq for HashSet<K, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<K, S> FromIterator<K> for HashSet<K, S, Global>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut set = HashSet::with_capacity_and_hasher(iter.size_hint().0, S::default());
        set.extend(iter);
        set
    }
}

impl<K, S, A> Extend<K> for HashSet<K, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for k in iter {
            self.insert(k);
        }
    }
}

impl<'a, K, S, A> IntoIterator for &'a HashSet<K, S, A>
where
    A: Allocator,
{
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, S, A> IntoIterator for HashSet<K, S, A>
where
    A: Allocator,
{
    type Item = K;
    type IntoIter = IntoIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.raw.into_iter_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_contains_erase_round_trip() {
        let mut set: HashSet<i32> = HashSet::new();
        assert!(set.insert(1));
        assert!(set.insert(2));
        assert!(!set.insert(1));
        assert_eq!(set.len(), 2);

        assert!(set.contains(&1));
        assert!(set.erase(&1));
        assert!(!set.erase(&1));
        assert!(!set.contains(&1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn equality_ignores_order() {
        let a: HashSet<i32> = (0..50).collect();
        let b: HashSet<i32> = (0..50).rev().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn from_iter_dedups() {
        let set: HashSet<i32> = [1, 2, 2, 3, 3, 3].into_iter().collect();
        assert_eq!(set.len(), 3);
    }
}
