//! # TTL Index
//!
//! Secondary map from interned key to absolute expiry in milliseconds since
//! the epoch. Expiry is lazy: nothing sweeps in the background, the store
//! consults [`TtlIndex::is_expired`] on access and deletes the key before
//! the operation proceeds.


use crate::dict::Dict;
use crate::intern::Key;

#[derive(Debug, Default)]
pub struct TtlIndex {
  map: Dict<i64>,
}

impl TtlIndex {
  pub fn new() -> Self {
    Self { map: Dict::new() }
  }

  /// Install or overwrite the absolute expiry for `key`.
  pub fn set(&mut self, key: Key, at_ms: i64) {
    self.map.put(key, at_ms);
  }

  /// The stored absolute expiry, if the key is volatile.
  pub fn get(&self, key: &[u8]) -> Option<i64> {
    self.map.get(key).copied()
  }

  /// Drop the expiry, keeping the key persistent. True when one existed.
  pub fn remove(&mut self, key: &[u8]) -> bool {
    self.map.remove(key).is_some()
  }

  pub fn is_expired(&self, key: &[u8], now_ms: i64) -> bool {
    match self.map.get(key) {
      Some(&at) => now_ms > at,
      None => false,
    }
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }

  pub fn clear(&mut self) {
    self.map.clear();
  }

  /// A uniformly random volatile key, for the volatile-only LRU sampler.
  pub fn random_key<R: rand::Rng>(&self, rng: &mut R) -> Option<&Key> {
    self.map.random_entry(rng).map(|(k, _)| k)
  }
}
