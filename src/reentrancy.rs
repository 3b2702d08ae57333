//! Debug-only guard against re-entering a table from inside a hash callback.
//!
//! Every public table operation calls the user-supplied hash function while
//! the storage may be mid-mutation (during a probe or a rehash). A hash
//! function that reaches back into the same table through a raw pointer
//! would observe that half-built state. Debug builds panic on such nested
//! entry; release builds compile the tracker to nothing.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table entry tracker. Public operations start with
/// `let _g = self.access.enter();` and never call each other while holding it.
#[derive(Debug)]
pub(crate) struct AccessTracker {
    #[cfg(debug_assertions)]
    active: Cell<bool>,
    // Tables are single-threaded; the raw pointer keeps them !Send + !Sync.
    _single_thread: PhantomData<*mut ()>,
}

impl AccessTracker {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(false),
            _single_thread: PhantomData,
        }
    }

    /// Marks the table as in use until the returned guard drops.
    ///
    /// Panics in debug builds if the table is already in use.
    #[inline]
    pub(crate) fn enter(&self) -> AccessGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.active.replace(true),
                "table re-entered while an operation was in progress (hash function called back into its table?)"
            );
            AccessGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            AccessGuard { _owner: PhantomData }
        }
    }
}

// Cloning a table yields an independent tracker that is not in use.
impl Clone for AccessTracker {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// RAII guard returned by [`AccessTracker::enter`].
pub(crate) struct AccessGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a AccessTracker,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a ()>,
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.active.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::AccessTracker;

    #[test]
    fn sequential_entries_are_fine() {
        let t = AccessTracker::new();
        {
            let _g = t.enter();
        }
        let _g = t.enter();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let t = AccessTracker::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = t.enter();
            let _inner = t.enter();
        }));
        assert!(res.is_err(), "expected nested entry to panic in debug builds");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn clone_is_not_in_use() {
        let t = AccessTracker::new();
        let _g = t.enter();
        let copy = t.clone();
        let _h = copy.enter();
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nested_entry_is_noop_in_release() {
        let t = AccessTracker::new();
        let _outer = t.enter();
        let _inner = t.enter();
    }
}
