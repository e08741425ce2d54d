//! # Index Map
//!
//! Hash map keyed by integer ids, with entries packed in a dense vector.
//!
//! ```text
//! lookup:  {17 -> 0, 4 -> 1, 9 -> 2}
//! entries: [(17, a), (4, b), (9, c)]   <- iteration walks this directly
//! ```
//!
//! Erase is a swap-removal: the last entry moves into the hole and its
//! lookup position is patched. Insert, find and erase are O(1) amortized.

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

/// Finalizer of the SplitMix64 generator.
///
/// A bijection on `u64`, so distinct keys never collide, but sequential ids
/// spread across all bits of the hash.
#[inline]
#[must_use]
pub const fn mix64(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Hasher for integer keys: a single [`mix64`] round instead of SipHash.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyHasher(u64);

impl Hasher for KeyHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(byte);
        }
        self.0 = mix64(self.0);
    }

    #[inline]
    fn write_u64(&mut self, n: u64) {
        self.0 = mix64(self.0 ^ n);
    }
}

/// An integer-keyed map with O(1) insert/find/erase and dense iteration.
#[derive(Clone, Debug)]
pub struct IndexMap<V> {
    /// Live entries, densely packed.
    entries: Vec<(u64, V)>,
    /// Key -> position in `entries`.
    lookup: HashMap<u64, usize, BuildHasherDefault<KeyHasher>>,
}

impl<V> IndexMap<V> {
    /// Creates an empty map. Does not allocate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            lookup: HashMap::default(),
        }
    }

    /// Creates an empty map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            lookup: HashMap::with_capacity_and_hasher(capacity, BuildHasherDefault::default()),
        }
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `value` under `key`.
    ///
    /// # Returns
    ///
    /// The previous value if the key was present (its position is kept).
    pub fn insert(&mut self, key: u64, value: V) -> Option<V> {
        if let Some(&position) = self.lookup.get(&key) {
            return Some(std::mem::replace(&mut self.entries[position].1, value));
        }

        self.lookup.insert(key, self.entries.len());
        self.entries.push((key, value));
        None
    }

    /// Returns the value under `key`, inserting the one built by `init` first
    /// if the key is absent.
    pub fn get_or_insert_with<F>(&mut self, key: u64, init: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let position = match self.lookup.get(&key) {
            Some(&position) => position,
            None => {
                let position = self.entries.len();
                self.entries.push((key, init()));
                self.lookup.insert(key, position);
                position
            }
        };
        &mut self.entries[position].1
    }

    /// Gets the value under `key`.
    #[inline]
    #[must_use]
    pub fn get(&self, key: u64) -> Option<&V> {
        let position = *self.lookup.get(&key)?;
        Some(&self.entries[position].1)
    }

    /// Gets the value under `key` mutably.
    #[inline]
    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        let position = *self.lookup.get(&key)?;
        Some(&mut self.entries[position].1)
    }

    /// Returns `true` if `key` is present.
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: u64) -> bool {
        self.lookup.contains_key(&key)
    }

    /// Removes the entry under `key` by swap-removal.
    ///
    /// # Returns
    ///
    /// The removed value, or None if the key was absent.
    pub fn remove(&mut self, key: u64) -> Option<V> {
        let position = self.lookup.remove(&key)?;
        let (_, value) = self.entries.swap_remove(position);

        if let Some(&(moved_key, _)) = self.entries.get(position) {
            self.lookup.insert(moved_key, position);
        }

        Some(value)
    }

    /// Returns the most recently placed entry in iteration order.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<(u64, &V)> {
        self.entries.last().map(|(key, value)| (*key, value))
    }

    /// Removes every entry, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lookup.clear();
    }

    /// Iterates over `(key, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> {
        self.entries.iter().map(|(key, value)| (*key, value))
    }

    /// Iterates over keys in dense order.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    /// Iterates over values in dense order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Iterates mutably over values in dense order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, value)| value)
    }
}

impl<V> Default for IndexMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut map = IndexMap::new();
        assert!(map.insert(7, "seven").is_none());
        assert!(map.insert(3, "three").is_none());

        assert_eq!(map.get(7), Some(&"seven"));
        assert_eq!(map.len(), 2);

        assert_eq!(map.insert(7, "SEVEN"), Some("seven"));
        assert_eq!(map.len(), 2);

        assert_eq!(map.remove(7), Some("SEVEN"));
        assert_eq!(map.remove(7), None);
        assert!(map.get(7).is_none());
        assert_eq!(map.get(3), Some(&"three"));
    }

    #[test]
    fn test_swap_removal_patches_moved_entry() {
        let mut map = IndexMap::new();
        for key in 0..5u64 {
            map.insert(key, key * 10);
        }

        // Removing the first entry moves key 4 into position 0.
        map.remove(0);
        assert_eq!(map.keys().next(), Some(4));
        assert_eq!(map.get(4), Some(&40));

        *map.get_mut(4).unwrap() += 1;
        map.remove(1);
        assert_eq!(map.get(4), Some(&41));
        assert_eq!(map.get(3), Some(&30));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_iteration_covers_live_set() {
        let mut map = IndexMap::with_capacity(64);
        for key in 0..64u64 {
            map.insert(mix64(key), key);
        }
        for key in (0..64u64).step_by(2) {
            map.remove(mix64(key));
        }

        let mut live: Vec<u64> = map.values().copied().collect();
        live.sort_unstable();
        let expected: Vec<u64> = (0..64u64).filter(|k| k % 2 == 1).collect();
        assert_eq!(live, expected);

        for value in map.values_mut() {
            *value = 0;
        }
        assert!(map.iter().all(|(_, v)| *v == 0));
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut map: IndexMap<Vec<u32>> = IndexMap::default();
        map.get_or_insert_with(9, Vec::new).push(1);
        map.get_or_insert_with(9, Vec::new).push(2);
        assert_eq!(map.get(9), Some(&vec![1, 2]));
        assert_eq!(map.last().map(|(k, _)| k), Some(9));

        map.clear();
        assert!(map.is_empty());
        assert!(map.last().is_none());
    }

    #[test]
    fn test_mix64_is_injective_on_small_keys() {
        let mut seen = std::collections::HashSet::new();
        for key in 0..10_000u64 {
            assert!(seen.insert(mix64(key)));
        }
    }
}
