//! # Key Interner
//!
//! Canonicalises key bytes to a single shared copy per distinct content.
//! The hash index, the TTL index and every returned key slice all point at
//! the same `Arc<[u8]>`, so equality between already-seen keys reduces to a
//! pointer compare and duplicate key storage disappears.
//!
//! The set only grows; canonical keys live until store teardown drops the
//! interner itself.


use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// The canonical, shared representation of a key.
pub type Key = Arc<[u8]>;

#[derive(Debug)]
pub struct KeyInterner {
  keys: RwLock<HashSet<Key>>,
  count: AtomicU64,
}

impl KeyInterner {
  pub fn new(capacity: usize) -> Self {
    Self {
      keys: RwLock::new(HashSet::with_capacity(capacity)),
      count: AtomicU64::new(0),
    }
  }

  /// Returns the canonical copy of `bytes`, installing one on first sight.
  ///
  /// Double-checked locking: a read lock serves the common already-interned
  /// case, the write lock re-checks before inserting so concurrent callers
  /// converge on one copy.
  pub fn intern(&self, bytes: &[u8]) -> Key {
    if let Ok(guard) = self.keys.read() {
      if let Some(existing) = guard.get(bytes) {
        return Arc::clone(existing);
      }
    }

    let mut guard = self.keys.write().unwrap();
    if let Some(existing) = guard.get(bytes) {
      return Arc::clone(existing);
    }

    let canonical: Key = Arc::from(bytes);
    guard.insert(Arc::clone(&canonical));
    self.count.fetch_add(1, Ordering::Relaxed);
    canonical
  }

  /// The canonical copy if `bytes` has been interned, without installing.
  pub fn get(&self, bytes: &[u8]) -> Option<Key> {
    self.keys.read().unwrap().get(bytes).map(Arc::clone)
  }

  pub fn len(&self) -> usize {
    self.count.load(Ordering::Relaxed) as usize
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
