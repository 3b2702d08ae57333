//! Pluggable index functions: `(key, modulus) -> index in [0, modulus)`.
//!
//! Tables never look inside a hash function; they only rely on it being a
//! deterministic, total function of its two inputs. The three reference
//! implementations walk the key's `char`s (Unicode scalar values), so
//! non-ASCII keys hash on code points rather than on UTF-8 bytes.

use core::hash::BuildHasher;
use hashbrown::hash_map::DefaultHashBuilder;

/// Maps a key to a bucket or home-slot index.
///
/// Implementations must return a value in `[0, modulus)` and must return the
/// same index for the same `(key, modulus)` pair for the lifetime of the
/// value. Collisions are allowed. `modulus` is never zero when called by a
/// table; callers passing zero get a panic.
pub trait HashFunction {
    fn hash(&self, key: &str, modulus: usize) -> usize;
}

impl<F> HashFunction for F
where
    F: Fn(&str, usize) -> usize,
{
    #[inline]
    fn hash(&self, key: &str, modulus: usize) -> usize {
        self(key, modulus)
    }
}

/// Calls `hash` and checks the result against the index contract.
#[inline]
pub(crate) fn checked_index<H: HashFunction>(hash: &H, key: &str, modulus: usize) -> usize {
    let idx = hash.hash(key, modulus);
    assert!(
        idx < modulus,
        "hash function returned {idx} for modulus {modulus}"
    );
    idx
}

/// Sum of character codes reduced mod `modulus`. Anagrams always collide.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SumOfCodes;

impl HashFunction for SumOfCodes {
    fn hash(&self, key: &str, modulus: usize) -> usize {
        let m = modulus as u128;
        let h = key.chars().fold(0u128, |acc, ch| (acc + ch as u128) % m);
        h as usize
    }
}

/// Polynomial rolling hash: `Σ code(key[i]) * base^i (mod modulus)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Polynomial {
    pub base: u64,
}

impl Polynomial {
    pub const DEFAULT_BASE: u64 = 31;

    pub const fn with_base(base: u64) -> Self {
        Self { base }
    }
}

impl Default for Polynomial {
    fn default() -> Self {
        Self::with_base(Self::DEFAULT_BASE)
    }
}

impl HashFunction for Polynomial {
    fn hash(&self, key: &str, modulus: usize) -> usize {
        let m = modulus as u128;
        let p = self.base as u128 % m;
        let mut h = 0u128;
        // Running power, kept reduced so the products stay inside u128.
        let mut power = 1u128 % m;
        for ch in key.chars() {
            h = (h + ch as u128 * power) % m;
            power = power * p % m;
        }
        h as usize
    }
}

/// Bernstein's djb2: `h = 5381; h = h * 33 + code(ch)`.
///
/// The recurrence is evaluated mod `modulus` at every step, which yields the
/// same residue as reducing the unbounded integer once at the end.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Djb2;

impl Djb2 {
    const SEED: u128 = 5381;
}

impl HashFunction for Djb2 {
    fn hash(&self, key: &str, modulus: usize) -> usize {
        let m = modulus as u128;
        let h = key
            .chars()
            .fold(Self::SEED % m, |h, ch| (h * 33 + ch as u128) % m);
        h as usize
    }
}

/// Adapts any [`BuildHasher`] to the index contract by reducing
/// `hash_one(key)` mod `modulus`.
///
/// The default builder is randomly seeded per instance; a table keeps the
/// same instance for its whole life, so indices stay stable across resizes.
#[derive(Clone, Debug, Default)]
pub struct BuildHasherFn<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S: BuildHasher> BuildHasherFn<S> {
    pub fn new(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<S: BuildHasher> HashFunction for BuildHasherFn<S> {
    fn hash(&self, key: &str, modulus: usize) -> usize {
        (self.hasher.hash_one(key) % modulus as u64) as usize
    }
}
