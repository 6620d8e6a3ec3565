//! Hash set alias used on hot paths.
//!
//! Iteration order of the alias is **not** relied upon for determinism;
//! every caller sorts before producing links or wire buffers.

#[cfg(all(feature = "fast-hash", not(feature = "deterministic-order")))]
pub type FastSet<T> = ahash::AHashSet<T>;

#[cfg(feature = "deterministic-order")]
pub type FastSet<T> = std::collections::BTreeSet<T>;

#[cfg(not(any(feature = "fast-hash", feature = "deterministic-order")))]
pub type FastSet<T> = hashbrown::HashSet<T>;
