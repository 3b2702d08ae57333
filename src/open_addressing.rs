//! OpenAddressingTable: a flat slot array probed linearly or by double hashing.
//!
//! Slots move through `Empty -> Occupied -> Tombstone -> Occupied`. A probe
//! continues past a tombstone and stops at an empty slot, so the two states
//! are kept distinct even though callers never observe either. Tombstones are
//! only reclaimed by a rehash, which happens before an insert would push
//! `(len + 1) / capacity` above [`MAX_PROBE_LOAD`].

use crate::error::{ConfigError, TableError};
use crate::hash_function::{checked_index, Djb2, HashFunction, Polynomial};
use crate::reentrancy::AccessTracker;
use crate::table::{floor_capacity, Table, MIN_CAPACITY};
use core::fmt;
use core::str::FromStr;
use log::{debug, error};

/// Pre-insert bound on `(len + 1) / capacity`.
pub const MAX_PROBE_LOAD: f64 = 0.6;

/// How successive probe attempts move through the slot array.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProbeMode {
    /// `(h1 + i) mod capacity`
    #[default]
    Linear,
    /// `(h1 + i * step) mod capacity`, with
    /// `step = h2(key, capacity - 1) mod (capacity - 1) + 1`
    Double,
}

impl ProbeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMode::Linear => "linear",
            ProbeMode::Double => "double",
        }
    }
}

impl FromStr for ProbeMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(ProbeMode::Linear),
            "double" => Ok(ProbeMode::Double),
            other => Err(ConfigError::UnknownProbeMode(other.to_string())),
        }
    }
}

impl fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Slot<V> {
    Empty,
    Occupied { key: String, value: V },
    Tombstone,
}

/// The slot indices visited for one key: `capacity` attempts starting at
/// `home`, advancing by `step`.
#[derive(Copy, Clone, Debug)]
struct Probe {
    cursor: usize,
    step: usize,
    capacity: usize,
    remaining: usize,
}

impl Iterator for Probe {
    type Item = usize;
    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let idx = self.cursor;
        self.cursor = (self.cursor + self.step) % self.capacity;
        Some(idx)
    }
}

/// String-keyed table storing entries directly in a slot array.
#[derive(Clone)]
pub struct OpenAddressingTable<V, H1 = Djb2, H2 = Polynomial> {
    pub(crate) slots: Slots<V, H1, H2>,
    access: AccessTracker,
}

#[derive(Clone)]
pub(crate) struct Slots<V, H1, H2> {
    pub(crate) slots: Vec<Slot<V>>,
    len: usize,
    tombstones: usize,
    primary: H1,
    secondary: H2,
    mode: ProbeMode,
}

impl<V> OpenAddressingTable<V> {
    /// Eight slots, linear probing over [`Djb2`]; [`Polynomial`] is kept as
    /// the (unused) secondary function.
    pub fn new() -> Self {
        Self::with_hashers(MIN_CAPACITY, Djb2, Polynomial::default(), ProbeMode::Linear)
    }
}

impl<V> Default for OpenAddressingTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over live entries, in slot order.
pub struct Iter<'a, V> {
    it: core::slice::Iter<'a, Slot<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        self.it.by_ref().find_map(|slot| match slot {
            Slot::Occupied { key, value } => Some((key.as_str(), value)),
            _ => None,
        })
    }
}

impl<V, H1, H2> OpenAddressingTable<V, H1, H2>
where
    H1: HashFunction,
    H2: HashFunction,
{
    /// Creates an empty table with `max(8, capacity)` slots.
    pub fn with_hashers(capacity: usize, primary: H1, secondary: H2, mode: ProbeMode) -> Self {
        Self {
            slots: Slots {
                slots: empty_slots(floor_capacity(capacity)),
                len: 0,
                tombstones: 0,
                primary,
                secondary,
                mode,
            },
            access: AccessTracker::new(),
        }
    }

    /// Like [`with_hashers`](Self::with_hashers), taking the probing mode by
    /// name (`"linear"` or `"double"`). Any other name is rejected.
    pub fn with_mode_name(
        capacity: usize,
        primary: H1,
        secondary: H2,
        mode: &str,
    ) -> Result<Self, ConfigError> {
        let mode = mode.parse::<ProbeMode>()?;
        Ok(Self::with_hashers(capacity, primary, secondary, mode))
    }

    pub fn len(&self) -> usize {
        self.slots.len
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.slots.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.slots.len as f64 / self.slots.slots.len() as f64
    }

    pub fn mode(&self) -> ProbeMode {
        self.slots.mode
    }

    /// Slots currently holding a deletion marker.
    pub fn tombstones(&self) -> usize {
        self.slots.tombstones
    }

    /// Distance between successive probe attempts for `key` at the current
    /// capacity: always 1 for linear probing, in `[1, capacity - 1]` for
    /// double hashing.
    pub fn probe_step(&self, key: &str) -> usize {
        let _g = self.access.enter();
        self.slots.probe(key).step
    }

    /// Inserts `key` or overwrites its value in place.
    ///
    /// # Panics
    ///
    /// Panics if the probe sequence for `key` visits only live entries with
    /// other keys. With linear probing the load bound makes this unreachable;
    /// with double hashing it needs a step sharing a factor with the
    /// capacity. See [`try_insert`](Self::try_insert).
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        if let Err(e) = self.try_insert(key, value) {
            panic!("{e}");
        }
    }

    /// Inserts `key` or overwrites its value in place, reporting probe
    /// exhaustion instead of panicking.
    ///
    /// On error the table holds exactly the entries it held before the call.
    /// It may have grown, unless the failure came from the rehash itself, in
    /// which case nothing was moved.
    pub fn try_insert(&mut self, key: impl Into<String>, value: V) -> Result<(), TableError> {
        let _g = self.access.enter();
        let key = key.into();
        let capacity = self.slots.slots.len();
        if (self.slots.len + 1) as f64 / capacity as f64 > MAX_PROBE_LOAD {
            self.slots.resize(capacity * 2)?;
        }
        self.slots.place(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let _g = self.access.enter();
        let idx = self.slots.find(key)?;
        match &self.slots.slots[idx] {
            Slot::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let _g = self.access.enter();
        let idx = self.slots.find(key)?;
        match &mut self.slots.slots[idx] {
            Slot::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        let _g = self.access.enter();
        self.slots.find(key).is_some()
    }

    /// Replaces the entry for `key` with a tombstone.
    pub fn remove(&mut self, key: &str) -> bool {
        let _g = self.access.enter();
        match self.slots.find(key) {
            Some(idx) => {
                self.slots.slots[idx] = Slot::Tombstone;
                self.slots.len -= 1;
                self.slots.tombstones += 1;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            it: self.slots.slots.iter(),
        }
    }

    #[cfg(test)]
    fn resize(&mut self, new_capacity: usize) -> Result<(), TableError> {
        let _g = self.access.enter();
        self.slots.resize(new_capacity)
    }
}

impl<V, H1, H2> Slots<V, H1, H2>
where
    H1: HashFunction,
    H2: HashFunction,
{
    fn probe(&self, key: &str) -> Probe {
        self.probe_at(key, self.slots.len())
    }

    fn probe_at(&self, key: &str, capacity: usize) -> Probe {
        let home = checked_index(&self.primary, key, capacity);
        let step = match self.mode {
            ProbeMode::Linear => 1,
            ProbeMode::Double => double_hash_step(&self.secondary, key, capacity),
        };
        Probe {
            cursor: home,
            step,
            capacity,
            remaining: capacity,
        }
    }

    /// Slot index of the live entry for `key`.
    pub(crate) fn find(&self, key: &str) -> Option<usize> {
        for idx in self.probe(key) {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied { key: k, .. } if k == key => return Some(idx),
                Slot::Occupied { .. } | Slot::Tombstone => {}
            }
        }
        None
    }

    /// Probes for `key` without the load check: overwrites a live entry in
    /// place, otherwise fills the first tombstone seen before the terminating
    /// empty slot, or the empty slot itself.
    fn place(&mut self, key: String, value: V) -> Result<(), TableError> {
        let capacity = self.slots.len();
        let mut first_tombstone = None;
        let mut target = None;
        for idx in self.probe(&key) {
            match &mut self.slots[idx] {
                Slot::Empty => {
                    target = Some(first_tombstone.unwrap_or(idx));
                    break;
                }
                Slot::Tombstone => {
                    first_tombstone.get_or_insert(idx);
                }
                Slot::Occupied { key: k, value: v } if *k == key => {
                    *v = value;
                    return Ok(());
                }
                Slot::Occupied { .. } => {}
            }
        }
        // The whole probe cycle was scanned without an empty slot; the key is
        // absent, so a tombstone on the cycle is still a valid home.
        let idx = match target.or(first_tombstone) {
            Some(idx) => idx,
            None => {
                error!(
                    "no free slot on the probe sequence for {:?} ({} live, {} tombstones, capacity {}, {} probing)",
                    key, self.len, self.tombstones, capacity, self.mode
                );
                return Err(TableError::ProbeExhausted {
                    capacity,
                    attempts: capacity,
                });
            }
        };
        if matches!(self.slots[idx], Slot::Tombstone) {
            self.tombstones -= 1;
        }
        self.slots[idx] = Slot::Occupied { key, value };
        self.len += 1;
        Ok(())
    }

    /// Rebuilds with `max(8, new_capacity)` empty slots and re-places every
    /// live entry; tombstones are dropped.
    ///
    /// Every target slot is chosen before anything moves, so a live entry
    /// whose new probe sequence has no free slot leaves the table untouched.
    fn resize(&mut self, new_capacity: usize) -> Result<(), TableError> {
        let old_capacity = self.slots.len();
        let new_capacity = floor_capacity(new_capacity);

        // plan[new] = old index of the entry that will live there
        let mut plan: Vec<Option<usize>> = vec![None; new_capacity];
        for (old_idx, slot) in self.slots.iter().enumerate() {
            let Slot::Occupied { key, .. } = slot else {
                continue;
            };
            let free = self
                .probe_at(key, new_capacity)
                .find(|&idx| plan[idx].is_none());
            match free {
                Some(idx) => plan[idx] = Some(old_idx),
                None => {
                    error!(
                        "rehash from {} to {} slots cannot place {:?} ({} probing); table left unchanged",
                        old_capacity, new_capacity, key, self.mode
                    );
                    return Err(TableError::ProbeExhausted {
                        capacity: new_capacity,
                        attempts: new_capacity,
                    });
                }
            }
        }

        let mut old = core::mem::replace(&mut self.slots, empty_slots(new_capacity));
        for (new_idx, from) in plan.into_iter().enumerate() {
            if let Some(old_idx) = from {
                self.slots[new_idx] = core::mem::replace(&mut old[old_idx], Slot::Empty);
            }
        }
        let dropped_tombstones = core::mem::take(&mut self.tombstones);
        debug!(
            "open-addressing table ({}) resized from {} to {} slots ({} entries, {} tombstones dropped)",
            self.mode, old_capacity, new_capacity, self.len, dropped_tombstones
        );
        Ok(())
    }
}

/// Double-hashing stride for `key` at `capacity`; never zero, so the probe
/// always moves.
fn double_hash_step<H: HashFunction>(secondary: &H, key: &str, capacity: usize) -> usize {
    let m = capacity - 1;
    secondary.hash(key, m) % m + 1
}

fn empty_slots<V>(capacity: usize) -> Vec<Slot<V>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || Slot::Empty);
    slots
}

impl<V, H1, H2> Table<V> for OpenAddressingTable<V, H1, H2>
where
    H1: HashFunction,
    H2: HashFunction,
{
    fn insert(&mut self, key: String, value: V) {
        OpenAddressingTable::insert(self, key, value)
    }

    fn get(&self, key: &str) -> Option<&V> {
        OpenAddressingTable::get(self, key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        OpenAddressingTable::get_mut(self, key)
    }

    fn remove(&mut self, key: &str) -> bool {
        OpenAddressingTable::remove(self, key)
    }

    fn len(&self) -> usize {
        self.slots.len
    }

    fn capacity(&self) -> usize {
        self.slots.slots.len()
    }

    fn contains(&self, key: &str) -> bool {
        OpenAddressingTable::contains(self, key)
    }
}

impl<V: fmt::Debug, H1: HashFunction, H2: HashFunction> fmt::Debug
    for OpenAddressingTable<V, H1, H2>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_function::SumOfCodes;

    /// Home slot taken from the digits after the first character ("s3" -> 3).
    fn numbered(key: &str, modulus: usize) -> usize {
        key[1..].parse::<usize>().unwrap_or(0) % modulus
    }

    fn constant(slot: usize) -> impl Fn(&str, usize) -> usize {
        move |_: &str, modulus: usize| slot % modulus
    }

    fn occupant<V, H1, H2>(t: &OpenAddressingTable<V, H1, H2>, idx: usize) -> Option<&str> {
        match &t.slots.slots[idx] {
            Slot::Occupied { key, .. } => Some(key.as_str()),
            _ => None,
        }
    }

    #[test]
    fn mode_names_parse_and_display() {
        assert_eq!("linear".parse::<ProbeMode>(), Ok(ProbeMode::Linear));
        assert_eq!("double".parse::<ProbeMode>(), Ok(ProbeMode::Double));
        assert_eq!(ProbeMode::Double.to_string(), "double");
        assert_eq!(
            "Linear".parse::<ProbeMode>(),
            Err(ConfigError::UnknownProbeMode("Linear".to_string()))
        );
    }

    /// Invariant: construction rejects unknown probing modes instead of defaulting.
    #[test]
    fn unknown_mode_fails_construction() {
        let r = OpenAddressingTable::<i32, _, _>::with_mode_name(8, Djb2, SumOfCodes, "quadratic");
        match r {
            Err(ConfigError::UnknownProbeMode(name)) => assert_eq!(name, "quadratic"),
            Ok(_) => panic!("expected construction to fail"),
        }
        let t = OpenAddressingTable::<i32, _, _>::with_mode_name(8, Djb2, SumOfCodes, "double")
            .expect("double is a valid mode");
        assert_eq!(t.mode(), ProbeMode::Double);
    }

    #[test]
    fn capacity_is_floored() {
        let t = OpenAddressingTable::<i32, _, _>::with_hashers(2, Djb2, Djb2, ProbeMode::Linear);
        assert_eq!(t.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn linear_probe_visits_consecutive_slots() {
        let t = OpenAddressingTable::<i32, _, _>::with_hashers(
            8,
            constant(6),
            Djb2,
            ProbeMode::Linear,
        );
        let order: Vec<_> = t.slots.probe("k").collect();
        assert_eq!(order, vec![6, 7, 0, 1, 2, 3, 4, 5]);
        assert_eq!(t.probe_step("k"), 1);
    }

    #[test]
    fn double_probe_advances_by_secondary_step() {
        // step = (2 mod 7) + 1 = 3
        let t = OpenAddressingTable::<i32, _, _>::with_hashers(
            8,
            constant(1),
            constant(2),
            ProbeMode::Double,
        );
        let order: Vec<_> = t.slots.probe("k").collect();
        assert_eq!(order, vec![1, 4, 7, 2, 5, 0, 3, 6]);
        assert_eq!(t.probe_step("k"), 3);
    }

    /// Invariant: an out-of-range secondary result is still reduced into [1, capacity - 1].
    #[test]
    fn secondary_result_is_reduced() {
        let wild = |_: &str, _: usize| 7usize * 1000 + 6;
        assert_eq!(double_hash_step(&wild, "k", 8), 7);
        let zero = |_: &str, _: usize| 0usize;
        assert_eq!(double_hash_step(&zero, "k", 8), 1);
    }

    /// Invariant: growth happens before probing once (len + 1) / capacity > 0.6.
    #[test]
    fn grows_before_insert_crosses_bound() {
        let mut t = OpenAddressingTable::new();
        for i in 0..4 {
            t.insert(format!("k{i}"), i);
        }
        // (3 + 1) / 8 = 0.5 allowed the fourth insert at capacity 8.
        assert_eq!(t.capacity(), 8);
        t.insert("k4", 4);
        assert_eq!(t.capacity(), 16);
        for i in 0..5 {
            assert_eq!(t.get(&format!("k{i}")), Some(&i));
        }
    }

    /// Invariant: a tombstone keeps later entries of the same probe chain reachable.
    #[test]
    fn lookups_continue_past_tombstones() {
        let mut t = OpenAddressingTable::with_hashers(8, constant(0), Djb2, ProbeMode::Linear);
        t.insert("a", 1);
        t.insert("b", 2);
        t.insert("c", 3);
        assert!(t.remove("b"));
        assert_eq!(t.tombstones(), 1);
        assert_eq!(t.get("c"), Some(&3));
        assert!(!t.contains("b"));
        assert!(!t.remove("b"));
        assert_eq!(t.len(), 2);
    }

    /// Invariant: a new key reuses the first tombstone on its probe path.
    #[test]
    fn insert_reuses_first_tombstone() {
        let mut t = OpenAddressingTable::with_hashers(8, constant(0), Djb2, ProbeMode::Linear);
        t.insert("a", 1);
        t.insert("b", 2);
        t.insert("c", 3);
        assert!(t.remove("b"));
        t.insert("d", 4);
        assert_eq!(occupant(&t, 1), Some("d"));
        assert_eq!(occupant(&t, 3), None);
        assert_eq!(t.tombstones(), 0);
        assert_eq!(t.len(), 3);
    }

    /// Invariant: updating a key found after a tombstone overwrites it in place.
    #[test]
    fn update_after_tombstone_stays_in_place() {
        let mut t = OpenAddressingTable::with_hashers(8, constant(0), Djb2, ProbeMode::Linear);
        t.insert("a", 1);
        t.insert("b", 2);
        t.insert("c", 3);
        assert!(t.remove("a"));
        t.insert("c", 30);
        assert_eq!(occupant(&t, 2), Some("c"));
        assert_eq!(occupant(&t, 0), None);
        assert_eq!(t.get("c"), Some(&30));
        assert_eq!(t.len(), 2);
        assert_eq!(t.tombstones(), 1);
    }

    /// Invariant: a table made entirely of tombstones still accepts inserts
    /// and answers misses without looping.
    #[test]
    fn all_tombstone_table_still_places() {
        let mut t = OpenAddressingTable::with_hashers(8, numbered, Djb2, ProbeMode::Linear);
        for i in 0..8 {
            let key = format!("s{i}");
            t.insert(key.clone(), i);
            assert_eq!(occupant(&t, i), Some(key.as_str()));
            assert!(t.remove(&key));
        }
        assert_eq!(t.tombstones(), 8);
        assert_eq!(t.capacity(), 8);
        assert!(!t.contains("s5"));

        t.insert("s3", 33);
        assert_eq!(occupant(&t, 3), Some("s3"));
        assert_eq!(t.get("s3"), Some(&33));
        assert_eq!(t.tombstones(), 7);
        assert_eq!(t.get("s4"), None);
    }

    /// Invariant: rehashing keeps every live entry and drops every tombstone.
    #[test]
    fn resize_drops_tombstones_and_keeps_entries() {
        let mut t = OpenAddressingTable::with_hashers(
            8,
            Djb2,
            Polynomial::default(),
            ProbeMode::Double,
        );
        for i in 0..4 {
            t.insert(format!("k{i}"), i);
        }
        assert!(t.remove("k1"));
        assert!(t.remove("k2"));
        assert_eq!(t.tombstones(), 2);

        t.resize(32).expect("rehash into 32 slots");
        assert_eq!(t.capacity(), 32);
        assert_eq!(t.tombstones(), 0);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get("k0"), Some(&0));
        assert_eq!(t.get("k3"), Some(&3));
        assert!(!t.contains("k1"));

        t.resize(1).expect("rehash into 8 slots");
        assert_eq!(t.capacity(), MIN_CAPACITY);
        assert_eq!(t.get("k3"), Some(&3));
    }

    /// A step of 4 at capacity 8 only ever visits two slots, so a third key
    /// sharing the home slot has nowhere to go.
    #[test]
    fn degenerate_double_step_reports_exhaustion() {
        // step = (3 mod 7) + 1 = 4
        let mut t = OpenAddressingTable::with_hashers(8, constant(0), constant(3), ProbeMode::Double);
        t.insert("a", 1);
        t.insert("b", 2);
        assert_eq!(t.probe_step("c"), 4);
        assert_eq!(
            t.try_insert("c", 3),
            Err(TableError::ProbeExhausted {
                capacity: 8,
                attempts: 8
            })
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t.get("a"), Some(&1));
        assert_eq!(t.get("b"), Some(&2));
        assert!(!t.contains("c"));
        // Updates along the short cycle still work.
        assert_eq!(t.try_insert("b", 20), Ok(()));
        assert_eq!(t.get("b"), Some(&20));
    }

    #[test]
    #[should_panic(expected = "probe sequence exhausted")]
    fn insert_panics_on_exhaustion() {
        let mut t = OpenAddressingTable::with_hashers(8, constant(0), constant(3), ProbeMode::Double);
        t.insert("a", 1);
        t.insert("b", 2);
        t.insert("c", 3);
    }

    #[test]
    fn iter_skips_empty_and_tombstone_slots() {
        let mut t = OpenAddressingTable::new();
        t.insert("x", 1);
        t.insert("y", 2);
        t.insert("z", 3);
        t.remove("y");
        let mut seen: Vec<_> = t.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        seen.sort();
        assert_eq!(seen, vec![("x".to_string(), 1), ("z".to_string(), 3)]);
    }

    #[test]
    fn clone_is_independent() {
        let mut t = OpenAddressingTable::new();
        t.insert("shared", 1);
        let mut copy = t.clone();
        copy.insert("shared", 2);
        copy.insert("only-copy", 3);
        assert_eq!(t.get("shared"), Some(&1));
        assert!(!t.contains("only-copy"));
        assert_eq!(copy.get("shared"), Some(&2));
    }
}
