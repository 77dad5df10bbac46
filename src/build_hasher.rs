//! The hasher capability spec §6 names ("a function `&Key → u64` ... the
//! core treats the hash as the full entropy source"). The default
//! `BuildHasher` is `ahash`, kept from the teacher's `Cargo.toml` — the same
//! choice the teacher made for its own shared-memory cache keys
//! (`key.rs`'s `CacheKey` hashing).

/// Default [`std::hash::BuildHasher`] for [`crate::HashTable`]/[`crate::HashSet`]
/// when none is supplied. A thin re-export of `ahash::RandomState` so callers
/// don't need to depend on `ahash` directly to name the default type.
pub type DefaultHashBuilder = ahash::RandomState;
