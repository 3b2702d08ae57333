//! collision-map: string-keyed hash tables with a pluggable index function
//! and two collision-resolution strategies.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: two interchangeable tables with the same contract, so the cost of
//!   each collision strategy can be compared under the same hash function.
//! - Layers:
//!   - HashFunction: `(key, modulus) -> index` capability supplied at
//!     construction. Reference implementations: SumOfCodes, Polynomial,
//!     Djb2; any `Fn(&str, usize) -> usize` or `BuildHasher` also works.
//!   - ChainedTable<V, H>: vector of insertion-ordered buckets.
//!   - OpenAddressingTable<V, H1, H2>: flat slot array with tombstones,
//!     probed linearly or by double hashing.
//!   - Table<V>: the shared contract, usable as `dyn Table<V>`.
//!
//! Constraints
//! - Single-threaded: tables are `!Send`/`!Sync`; callers serialize access.
//! - Capacity never drops below `MIN_CAPACITY` (8) and only ever doubles.
//! - Chaining keeps `len / capacity <= 0.7` after every insert.
//! - Open addressing keeps `(len + 1) / capacity <= 0.6` before every probe.
//! - At most one live entry per key.
//!
//! Resize
//! - Growth is inline in the triggering insert and runs to completion.
//! - Every live entry is re-placed under the new capacity; the key/value set
//!   is unchanged. For open addressing, tombstones are discarded here and
//!   nowhere else.
//! - Open addressing picks every target slot before moving anything, so a
//!   rehash that cannot place an entry fails with the table untouched.
//!
//! Failure boundaries
//! - A missing key is `None`/`false`, never an error.
//! - Unknown probing-mode names are rejected at construction
//!   (`ConfigError::UnknownProbeMode`).
//! - An open-addressing probe sequence with no free slot is an internal
//!   invariant violation (`TableError::ProbeExhausted`): `try_insert` returns
//!   it, `insert` panics with it. Linear probing cannot reach it under the
//!   load bound. Double hashing can, when the step shares a factor with the
//!   (power-of-two) capacity and the shortened cycle is full.
//!
//! Reentrancy policy
//! - Hash functions are user code invoked mid-operation. A debug-only guard
//!   panics if one of them calls back into the table it is hashing for.
//!
//! Notes and non-goals
//! - No shrinking after removals, no persistence, no iteration-order
//!   guarantees, no cryptographic hash quality.

pub mod chained;
pub mod error;
pub mod hash_function;
pub mod open_addressing;
mod reentrancy;
pub mod table;
mod table_proptest;

// Public surface
pub use chained::ChainedTable;
pub use error::{ConfigError, TableError};
pub use hash_function::{BuildHasherFn, Djb2, HashFunction, Polynomial, SumOfCodes};
pub use open_addressing::{OpenAddressingTable, ProbeMode};
pub use table::{Table, MIN_CAPACITY};
