//! # Store Facade
//!
//! Ties the engine together: sixteen logical databases, the shared key
//! interner, the tiered pool, the memory budget with its eviction policy,
//! and the monotonic access counter behind the approximate LRU.
//!
//! Each database is a hash index plus a TTL index behind one mutex, so a
//! command executes atomically against its database while other
//! connections work other databases. Memory accounting is engine-wide: the
//! allocator signal of the source's store↔allocator cycle is modelled as
//! [`Db::make_room`], which every creating write consumes before it
//! installs data.


use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::dict::Dict;
use crate::error::ZedisError;
use crate::expiry::TtlIndex;
use crate::glob::glob_match;
use crate::intern::{Key, KeyInterner};
use crate::lru::{self, EvictionPolicy, LRU_SAMPLE_SIZE};
use crate::pool::{PoolStats, TieredPool};
use crate::value::{Object, Value};

/// Fixed per-entry bookkeeping charged to the memory budget on top of the
/// key bytes and the value payload.
const ENTRY_OVERHEAD: usize = 64;

#[derive(Debug)]
pub struct Db {
  index: Dict<Object>,
  ttl: TtlIndex,
  interner: Arc<KeyInterner>,
  pool: Arc<TieredPool>,
  access_counter: Arc<AtomicU64>,
  mem_used: Arc<AtomicUsize>,
  /// This database's share of `mem_used`, so FLUSHDB can give it back.
  own_mem: usize,
  policy: EvictionPolicy,
  max_memory: usize,
}

#[derive(Debug)]
pub struct Store {
  dbs: Vec<Mutex<Db>>,
  interner: Arc<KeyInterner>,
  pool: Arc<TieredPool>,
  access_counter: Arc<AtomicU64>,
  mem_used: Arc<AtomicUsize>,
}

impl Store {
  pub fn new(
    databases: usize,
    initial_capacity: usize,
    max_memory: usize,
    policy: EvictionPolicy,
  ) -> Self {
    let interner = Arc::new(KeyInterner::new(initial_capacity));
    let pool = TieredPool::new();
    let access_counter = Arc::new(AtomicU64::new(0));
    let mem_used = Arc::new(AtomicUsize::new(0));

    let dbs = (0..databases)
      .map(|_| {
        Mutex::new(Db {
          index: Dict::with_capacity(initial_capacity),
          ttl: TtlIndex::new(),
          interner: Arc::clone(&interner),
          pool: Arc::clone(&pool),
          access_counter: Arc::clone(&access_counter),
          mem_used: Arc::clone(&mem_used),
          own_mem: 0,
          policy,
          max_memory,
        })
      })
      .collect();

    Self {
      dbs,
      interner,
      pool,
      access_counter,
      mem_used,
    }
  }

  pub fn db(&self, index: usize) -> MutexGuard<'_, Db> {
    self.dbs[index].lock().unwrap()
  }

  pub fn database_count(&self) -> usize {
    self.dbs.len()
  }

  pub fn mem_used(&self) -> usize {
    self.mem_used.load(Ordering::Relaxed)
  }

  pub fn pool_stats(&self) -> PoolStats {
    self.pool.stats()
  }

  pub fn interned_keys(&self) -> usize {
    self.interner.len()
  }

  pub fn flush_all(&self) {
    for db in &self.dbs {
      db.lock().unwrap().clear();
    }
  }
}

impl Db {
  pub fn pool(&self) -> Arc<TieredPool> {
    Arc::clone(&self.pool)
  }

  pub fn len(&self) -> usize {
    self.index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.index.is_empty()
  }

  pub fn mem_used(&self) -> usize {
    self.mem_used.load(Ordering::Relaxed)
  }

  /// Load percentage of the hash index, for invariant checks.
  pub fn index_load(&self) -> (usize, usize) {
    (self.index.len(), self.index.table_len())
  }

  /// Delete `key` if its deadline passed. True when a deletion happened.
  pub fn expire_if_due(&mut self, key: &[u8], now_ms: i64) -> bool {
    if self.ttl.is_expired(key, now_ms) {
      self.remove(key);
      return true;
    }
    false
  }

  /// Plain lookup with the lazy expiry check; does not touch the LRU stamp.
  pub fn entry(&mut self, key: &[u8], now_ms: i64) -> Option<&Object> {
    self.expire_if_due(key, now_ms);
    self.index.get(key)
  }

  pub fn entry_mut(&mut self, key: &[u8], now_ms: i64) -> Option<&mut Object> {
    self.expire_if_due(key, now_ms);
    self.index.get_mut(key)
  }

  /// Read access: lazy expiry, then stamp the object from the engine-wide
  /// monotonic counter. Every successful read advances the clock.
  pub fn access(&mut self, key: &[u8], now_ms: i64) -> Option<&Object> {
    self.expire_if_due(key, now_ms);
    let counter = &self.access_counter;
    let obj = self.index.get_mut(key)?;
    obj.last_access = counter.fetch_add(1, Ordering::Relaxed) + 1;
    Some(obj)
  }

  /// Install `value` under `key`, interning the key, charging the memory
  /// budget and clearing any previous expiry. Replacement is in place.
  pub fn put(&mut self, key: &[u8], value: Value) -> Result<(), ZedisError> {
    self.put_object(key, Object::new(value))
  }

  pub fn put_object(&mut self, key: &[u8], object: Object) -> Result<(), ZedisError> {
    self.make_room()?;
    let canonical = self.interner.intern(key);
    let added = ENTRY_OVERHEAD + canonical.len() + object.value.mem_size();
    if let Some(previous) = self.index.put(canonical.clone(), object) {
      let removed = ENTRY_OVERHEAD + canonical.len() + previous.value.mem_size();
      self.charge_mem(added as isize - removed as isize);
    } else {
      self.charge_mem(added as isize);
    }
    self.ttl.remove(&canonical);
    Ok(())
  }

  /// Remove a key from the index and the TTL index together. True when the
  /// key existed.
  pub fn remove(&mut self, key: &[u8]) -> bool {
    match self.index.remove(key) {
      Some(object) => {
        let freed = ENTRY_OVERHEAD + key.len() + object.value.mem_size();
        self.charge_mem(-(freed as isize));
        self.ttl.remove(key);
        true
      },
      None => {
        self.ttl.remove(key);
        false
      },
    }
  }

  /// Detach the whole object, TTL included, e.g. for RENAME.
  pub fn take(&mut self, key: &[u8]) -> Option<(Object, Option<i64>)> {
    let object = self.index.remove(key)?;
    let freed = ENTRY_OVERHEAD + key.len() + object.value.mem_size();
    self.charge_mem(-(freed as isize));
    let expire_at = self.ttl.get(key);
    self.ttl.remove(key);
    Some((object, expire_at))
  }

  /// Handlers that grew or shrank a value in place report the change here.
  pub fn note_value_resized(&mut self, old_size: usize, new_size: usize) {
    self.charge_mem(new_size as isize - old_size as isize);
  }

  fn charge_mem(&mut self, delta: isize) {
    if delta >= 0 {
      self.own_mem += delta as usize;
      self.mem_used.fetch_add(delta as usize, Ordering::Relaxed);
    } else {
      let sub = (-delta) as usize;
      self.own_mem = self.own_mem.saturating_sub(sub);
      self.mem_used.fetch_sub(sub.min(self.mem_used.load(Ordering::Relaxed)), Ordering::Relaxed);
    }
  }

  /// Expiry for `key`: requires the key to exist. Interns the key if it is
  /// not already canonical and installs the absolute deadline.
  pub fn set_expire(&mut self, key: &[u8], at_ms: i64) -> bool {
    if !self.index.contains(key) {
      return false;
    }
    let canonical = self.interner.intern(key);
    self.ttl.set(canonical, at_ms);
    true
  }

  /// `PERSIST`: drop the expiry. True when one was dropped.
  pub fn persist(&mut self, key: &[u8]) -> bool {
    self.ttl.remove(key)
  }

  /// The stored absolute expiry, if volatile.
  pub fn expire_at(&self, key: &[u8]) -> Option<i64> {
    self.ttl.get(key)
  }

  pub fn volatile_count(&self) -> usize {
    self.ttl.len()
  }

  pub fn clear(&mut self) {
    self.index.clear();
    self.ttl.clear();
    self
      .mem_used
      .fetch_sub(self.own_mem.min(self.mem_used.load(Ordering::Relaxed)), Ordering::Relaxed);
    self.own_mem = 0;
  }

  pub fn iter(&self) -> impl Iterator<Item = (&Key, &Object)> {
    self.index.iter()
  }

  /// Keys whose deadline already passed, for sweeping before a scan.
  pub fn collect_expired(&self, now_ms: i64) -> Vec<Key> {
    self
      .index
      .iter()
      .filter(|(key, _)| self.ttl.is_expired(key, now_ms))
      .map(|(key, _)| Arc::clone(key))
      .collect()
  }

  /// Live keys matching a glob pattern, after sweeping due expiries.
  pub fn keys_matching(&mut self, pattern: &[u8], now_ms: i64) -> Vec<Key> {
    for key in self.collect_expired(now_ms) {
      self.remove(&key);
    }
    self
      .index
      .iter()
      .filter(|(key, _)| glob_match(pattern, key))
      .map(|(key, _)| Arc::clone(key))
      .collect()
  }

  pub fn random_key<R: rand::Rng>(&self, rng: &mut R) -> Option<Key> {
    self.index.random_entry(rng).map(|(key, _)| Arc::clone(key))
  }

  pub(crate) fn random_object<R: rand::Rng>(&self, rng: &mut R) -> Option<(Key, &Object)> {
    self
      .index
      .random_entry(rng)
      .map(|(key, obj)| (Arc::clone(key), obj))
  }

  pub(crate) fn random_volatile_key<R: rand::Rng>(&self, rng: &mut R) -> Option<Key> {
    self.ttl.random_key(rng).map(Arc::clone)
  }

  pub(crate) fn peek_last_access(&self, key: &[u8]) -> Option<u64> {
    self.index.get(key).map(|obj| obj.last_access)
  }

  /// The allocation-pressure signal: under `noeviction` an over-budget
  /// write fails; under the LRU policies victims are sampled and deleted
  /// until the budget is met or a sample comes back empty.
  pub fn make_room(&mut self) -> Result<(), ZedisError> {
    if self.max_memory == 0 {
      return Ok(());
    }
    match self.policy {
      EvictionPolicy::NoEviction => {
        if self.mem_used() > self.max_memory {
          return Err(ZedisError::OutOfMemory);
        }
        Ok(())
      },
      EvictionPolicy::AllKeysLru | EvictionPolicy::VolatileLru => {
        let volatile_only = self.policy == EvictionPolicy::VolatileLru;
        let mut rng = rand::thread_rng();
        while self.mem_used() > self.max_memory {
          match lru::sample_lru_key(self, LRU_SAMPLE_SIZE, volatile_only, &mut rng) {
            Some(victim) => {
              tracing::debug!(key = ?String::from_utf8_lossy(&victim), "evicting LRU victim");
              self.remove(&victim);
            },
            None => break,
          }
        }
        Ok(())
      },
    }
  }
}
