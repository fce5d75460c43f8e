use std::{collections::VecDeque, hash::Hash};

/// The capacity of the acknowledgement cache of a MAC.
pub const ACK_CACHE_CAPACITY: usize = 10;

/// A fixed-capacity set that evicts its least recently used entry.
///
/// Only [`LruCache::get`] and re-insertion count as a use, [`LruCache::contains`]
/// does not change the eviction order.
#[derive(Debug, Clone)]
pub struct LruCache<K> {
    capacity: usize,
    // front: least recently used
    entries: VecDeque<K>,
}

impl<K: Eq + Hash + Clone> LruCache<K> {
    /// Creates an empty cache.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "an lru cache needs a capacity of at least one");
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Marks `key` as used, returning whether it was present.
    pub fn get(&mut self, key: &K) -> bool {
        match self.entries.iter().position(|k| k == key) {
            Some(i) => {
                if let Some(k) = self.entries.remove(i) {
                    self.entries.push_back(k);
                }
                true
            }
            None => false,
        }
    }

    /// Inserts `key` as the most recently used entry, returning the evicted
    /// entry if the cache was full.
    pub fn put(&mut self, key: K) -> Option<K> {
        if self.get(&key) {
            return None;
        }
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(key);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = LruCache::new(3);
        assert_eq!(cache.put(1), None);
        assert_eq!(cache.put(2), None);
        assert_eq!(cache.put(3), None);
        assert!(cache.get(&1));

        assert_eq!(cache.put(4), Some(2));
        assert!(!cache.contains(&2));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn contains_keeps_order() {
        let mut cache = LruCache::new(ACK_CACHE_CAPACITY);
        for i in 0..ACK_CACHE_CAPACITY {
            cache.put(i);
        }
        assert!(cache.contains(&0));
        assert_eq!(cache.put(100), Some(0));
        assert_eq!(cache.put(100), None);
        assert_eq!(cache.len(), ACK_CACHE_CAPACITY);
    }
}
