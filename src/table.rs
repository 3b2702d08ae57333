//! The contract shared by both collision-resolution strategies.

/// Smallest capacity any table will allocate.
pub const MIN_CAPACITY: usize = 8;

/// Operations common to [`ChainedTable`](crate::ChainedTable) and
/// [`OpenAddressingTable`](crate::OpenAddressingTable).
///
/// Absence is reported as `None`/`false`; none of these operations fail in
/// the normal course of use. Traversal order of the underlying storage
/// depends on capacity and hash function and is not part of the contract.
pub trait Table<V> {
    /// Inserts `key` or overwrites the value of an existing entry in place.
    fn insert(&mut self, key: String, value: V);

    fn get(&self, key: &str) -> Option<&V>;

    fn get_mut(&mut self, key: &str) -> Option<&mut V>;

    /// Removes `key`, returning whether an entry was present.
    fn remove(&mut self, key: &str) -> bool;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Number of buckets or slots; never below [`MIN_CAPACITY`].
    fn capacity(&self) -> usize;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }
}

/// Applies the capacity floor to a requested capacity.
#[inline]
pub(crate) fn floor_capacity(requested: usize) -> usize {
    requested.max(MIN_CAPACITY)
}
