//! A cache-friendly open-addressing hash table with SIMD-accelerated
//! metadata probing, in the SwissTable / Abseil `flat_hash_map` lineage.
//!
//! [`HashTable`] and [`HashSet`] share one storage layout, probe sequence,
//! and rehash controller ([`raw::RawTable`]) — the map simply stores `(K, V)`
//! slots where the set stores bare `K` slots. Control-byte groups are
//! scanned with SSE2 on `x86_64`, NEON on `aarch64`, and a portable SWAR
//! fallback elsewhere, selected at compile time (see `group.rs`).

mod alloc;
mod bitmask;
mod build_hasher;
mod error;
mod group;
mod iter;
mod map;
mod metadata;
mod raw;
mod set;

pub use alloc::{Allocator, Global};
pub use build_hasher::DefaultHashBuilder;
pub use error::TryReserveError;
pub use iter::{Drain, IntoIter, Iter, IterMut};
pub use map::HashTable;
pub use set::HashSet;
