//! Bounded least-recently-used map.
//!
//! Pure bookkeeping: the map never drops a value behind the caller's back.
//! Every removal (eviction included) hands the value back so the owner can
//! release whatever it represents.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
struct Slot<V> {
    value: V,
    last_used: u64,
}

#[derive(Debug)]
pub struct BoundedLru<K, V> {
    entries: HashMap<K, Slot<V>>,
    capacity: usize,
    tick: u64,
}

impl<K: Eq + Hash + Clone, V> BoundedLru<K, V> {
    /// Create a map holding at most `capacity` entries (minimum one)
    pub fn new(capacity: usize) -> Self {
        Self { entries: HashMap::new(), capacity: capacity.max(1), tick: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up without touching recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Look up and mark as most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.next_tick();
        self.entries.get_mut(key).map(|slot| {
            slot.last_used = tick;
            &slot.value
        })
    }

    /// Insert or replace `key`, marking it most recently used.
    ///
    /// Returns every value displaced by the call: the previous value for
    /// `key`, if any, and the least recently used entry when the map was full.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        let tick = self.next_tick();
        let mut displaced = Vec::new();

        if let Some(old) = self.entries.remove(&key) {
            displaced.push((key.clone(), old.value));
        }
        while self.entries.len() >= self.capacity {
            match self.pop_lru() {
                Some(evicted) => displaced.push(evicted),
                None => break,
            }
        }

        self.entries.insert(key, Slot { value, last_used: tick });
        displaced
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|slot| slot.value)
    }

    /// Remove and return the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let key = self.entries.iter().min_by_key(|(_, slot)| slot.last_used).map(|(k, _)| k.clone())?;
        self.entries.remove(&key).map(|slot| (key, slot.value))
    }

    /// Remove every entry, oldest first
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut all: Vec<(K, Slot<V>)> = self.entries.drain().collect();
        all.sort_by_key(|(_, slot)| slot.last_used);
        all.into_iter().map(|(k, slot)| (k, slot.value)).collect()
    }

    /// Iterate values in no particular order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|slot| &slot.value)
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
