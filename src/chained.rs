//! ChainedTable: separate chaining over a vector of insertion-ordered buckets.

use crate::hash_function::{checked_index, Djb2, HashFunction};
use crate::reentrancy::AccessTracker;
use crate::table::{floor_capacity, Table, MIN_CAPACITY};
use core::fmt;
use log::debug;

/// Load factor above which an insert doubles the bucket count.
pub const MAX_LOAD_FACTOR: f64 = 0.7;

#[derive(Clone, Debug)]
pub(crate) struct Entry<V> {
    pub(crate) key: String,
    pub(crate) value: V,
}

pub(crate) type Bucket<V> = Vec<Entry<V>>;

/// String-keyed table resolving collisions by appending to per-index buckets.
///
/// `len() / capacity() <= MAX_LOAD_FACTOR` holds after every insert; the
/// table only grows, by doubling, and never shrinks after removals.
#[derive(Clone)]
pub struct ChainedTable<V, H = Djb2> {
    pub(crate) chains: Chains<V, H>,
    access: AccessTracker,
}

/// Storage and hashing state; kept apart from the access tracker so a guard
/// can stay alive across mutable calls.
#[derive(Clone)]
pub(crate) struct Chains<V, H> {
    pub(crate) buckets: Vec<Bucket<V>>,
    len: usize,
    hash: H,
}

impl<V> ChainedTable<V> {
    /// Eight buckets hashed with [`Djb2`].
    pub fn new() -> Self {
        Self::with_hasher(MIN_CAPACITY, Djb2)
    }
}

impl<V> Default for ChainedTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over live entries, in bucket order.
pub struct Iter<'a, V> {
    it: core::iter::Flatten<core::slice::Iter<'a, Bucket<V>>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| (e.key.as_str(), &e.value))
    }
}

impl<V, H> ChainedTable<V, H>
where
    H: HashFunction,
{
    /// Creates an empty table with `max(8, capacity)` buckets.
    pub fn with_hasher(capacity: usize, hash: H) -> Self {
        Self {
            chains: Chains {
                buckets: empty_buckets(floor_capacity(capacity)),
                len: 0,
                hash,
            },
            access: AccessTracker::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chains.len
    }

    pub fn is_empty(&self) -> bool {
        self.chains.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.chains.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.chains.load_factor()
    }

    pub fn hash_function(&self) -> &H {
        &self.chains.hash
    }

    /// Inserts `key` or overwrites its value in place, keeping the bucket order.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let _g = self.access.enter();
        self.chains.put(key.into(), value);
        if self.chains.load_factor() > MAX_LOAD_FACTOR {
            let doubled = self.chains.buckets.len() * 2;
            self.chains.resize(doubled);
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let _g = self.access.enter();
        let (b, pos) = self.chains.locate(key);
        pos.map(|i| &self.chains.buckets[b][i].value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let _g = self.access.enter();
        let (b, pos) = self.chains.locate(key);
        pos.map(|i| &mut self.chains.buckets[b][i].value)
    }

    pub fn contains(&self, key: &str) -> bool {
        let _g = self.access.enter();
        self.chains.locate(key).1.is_some()
    }

    /// Removes `key`; the remaining entries of its bucket keep their order.
    pub fn remove(&mut self, key: &str) -> bool {
        let _g = self.access.enter();
        match self.chains.locate(key) {
            (b, Some(i)) => {
                self.chains.buckets[b].remove(i);
                self.chains.len -= 1;
                true
            }
            (_, None) => false,
        }
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            it: self.chains.buckets.iter().flatten(),
        }
    }

    #[cfg(test)]
    fn resize(&mut self, new_capacity: usize) {
        let _g = self.access.enter();
        self.chains.resize(new_capacity);
    }
}

impl<V, H> Chains<V, H>
where
    H: HashFunction,
{
    fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    /// Bucket index and, if present, the entry's position inside the bucket.
    fn locate(&self, key: &str) -> (usize, Option<usize>) {
        let b = checked_index(&self.hash, key, self.buckets.len());
        let pos = self.buckets[b].iter().position(|e| e.key == key);
        (b, pos)
    }

    /// Overwrite-or-append without the growth check.
    fn put(&mut self, key: String, value: V) {
        match self.locate(&key) {
            (b, Some(i)) => self.buckets[b][i].value = value,
            (b, None) => {
                self.buckets[b].push(Entry { key, value });
                self.len += 1;
            }
        }
    }

    /// Rebuilds with `max(8, new_capacity)` buckets and re-inserts every
    /// entry under the new capacity.
    fn resize(&mut self, new_capacity: usize) {
        let old_capacity = self.buckets.len();
        let fresh = empty_buckets(floor_capacity(new_capacity));
        let old = core::mem::replace(&mut self.buckets, fresh);
        let expected = self.len;
        self.len = 0;
        for Entry { key, value } in old.into_iter().flatten() {
            self.put(key, value);
        }
        debug_assert_eq!(self.len, expected, "resize must preserve every entry");
        debug!(
            "chained table resized from {} to {} buckets ({} entries)",
            old_capacity,
            self.buckets.len(),
            self.len
        );
    }
}

fn empty_buckets<V>(capacity: usize) -> Vec<Bucket<V>> {
    let mut buckets = Vec::with_capacity(capacity);
    buckets.resize_with(capacity, Vec::new);
    buckets
}

impl<V, H> Table<V> for ChainedTable<V, H>
where
    H: HashFunction,
{
    fn insert(&mut self, key: String, value: V) {
        ChainedTable::insert(self, key, value)
    }

    fn get(&self, key: &str) -> Option<&V> {
        ChainedTable::get(self, key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        ChainedTable::get_mut(self, key)
    }

    fn remove(&mut self, key: &str) -> bool {
        ChainedTable::remove(self, key)
    }

    fn len(&self) -> usize {
        self.chains.len
    }

    fn capacity(&self) -> usize {
        self.chains.buckets.len()
    }

    fn contains(&self, key: &str) -> bool {
        ChainedTable::contains(self, key)
    }
}

impl<V: fmt::Debug, H: HashFunction> fmt::Debug for ChainedTable<V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
