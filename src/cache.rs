//! A bounded cache of query results with first-in-first-out eviction.

use core::hash::BuildHasherDefault;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;

use seahash::SeaHasher;
use tracing::debug;

pub type QueryHasher = BuildHasherDefault<SeaHasher>;

/// Holds at most `capacity` entries keyed by query text.
///
/// Eviction follows insertion order only: a lookup never moves an entry.
/// There is no way to overwrite or remove a single entry in place; entries
/// leave the cache through eviction or [`QueryCache::clear`].
#[derive(Debug)]
pub struct QueryCache<V> {
    capacity: NonZeroUsize,
    order: VecDeque<String>,
    kept: HashMap<String, V, QueryHasher>,
}

impl<V> QueryCache<V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity.get()),
            kept: HashMap::default(),
        }
    }
    pub fn get(&self, key: &str) -> Option<&V> {
        self.kept.get(key)
    }
    pub fn contains(&self, key: &str) -> bool {
        self.kept.contains_key(key)
    }
    /// Appends `key`. A key that is already tracked is appended again, which
    /// replaces its value and makes it the newest entry.
    ///
    /// The key still takes a single slot. A plain ring of keys would hold it
    /// twice and evict it at its older position first, so re-inserting here
    /// keeps one more distinct entry alive. [`crate::table::Table`] only
    /// inserts after a miss, so it never relies on either behavior.
    pub fn insert(&mut self, key: String, value: V) {
        if self.kept.contains_key(&key) {
            self.order.retain(|k| k != &key);
        } else if self.order.len() >= self.capacity.get() {
            if let Some(oldest) = self.order.pop_front() {
                self.kept.remove(&oldest);
                debug!(query = %oldest, "evicted from query cache");
            }
        }
        self.order.push_back(key.clone());
        self.kept.insert(key, value);
    }
    pub fn clear(&mut self) {
        self.order.clear();
        self.kept.clear();
    }
    pub fn len(&self) -> usize {
        self.order.len()
    }
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }
    /// Keys from oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}
