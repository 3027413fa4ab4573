//! # Tiered Memory Pool
//!
//! Fixed-slot buffer recycling for the three size classes short keys and
//! values overwhelmingly fall into: 32, 128 and 512 bytes. Allocations that
//! fit a class reuse a recycled slab when one is available; anything larger
//! falls through to the global allocator and is counted as a miss.
//!
//! Ownership tracking is by construction: every [`PooledBytes`] remembers
//! the class it was cut from and the pool it belongs to, so releasing a
//! buffer is an O(1) push onto the right free list. Buffers that bypassed
//! the pool are simply dropped.
//!
//! ## Thread Safety
//!
//! Free lists sit behind one mutex per class; hit/miss counters are relaxed
//! atomics so the hot path never synchronises for statistics.


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Slot sizes of the three classes, smallest first.
pub const CLASS_SIZES: [usize; 3] = [32, 128, 512];

/// Recycled slabs kept per class; beyond this the slab is returned to the
/// global allocator instead.
const FREE_LIST_CAP: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
  pub hits: u64,
  pub misses: u64,
}

#[derive(Debug)]
pub struct TieredPool {
  free_lists: [Mutex<Vec<Box<[u8]>>>; 3],
  hits: AtomicU64,
  misses: AtomicU64,
}

/// A byte buffer cut from the tiered pool (or the global allocator on a
/// miss). Dropping it routes the slab back to the owning class free list.
#[derive(Debug)]
pub struct PooledBytes {
  buf: Option<Box<[u8]>>,
  len: usize,
  class: Option<usize>,
  pool: Option<Arc<TieredPool>>,
}

impl TieredPool {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      free_lists: [
        Mutex::new(Vec::new()),
        Mutex::new(Vec::new()),
        Mutex::new(Vec::new()),
      ],
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
    })
  }

  /// Smallest class whose slot size holds `n` bytes.
  #[inline]
  fn class_for(n: usize) -> Option<usize> {
    CLASS_SIZES.iter().position(|&size| n <= size)
  }

  /// Copy `bytes` into a pool-backed buffer. Falls through to the global
  /// allocator when no class fits.
  pub fn alloc_copy(self: &Arc<Self>, bytes: &[u8]) -> PooledBytes {
    match Self::class_for(bytes.len()) {
      Some(class) => {
        self.hits.fetch_add(1, Ordering::Relaxed);
        let mut buf = {
          let mut list = self.free_lists[class].lock().unwrap();
          list.pop()
        }
        .unwrap_or_else(|| vec![0u8; CLASS_SIZES[class]].into_boxed_slice());
        buf[..bytes.len()].copy_from_slice(bytes);
        PooledBytes {
          buf: Some(buf),
          len: bytes.len(),
          class: Some(class),
          pool: Some(Arc::clone(self)),
        }
      },
      None => {
        self.misses.fetch_add(1, Ordering::Relaxed);
        PooledBytes {
          buf: Some(bytes.to_vec().into_boxed_slice()),
          len: bytes.len(),
          class: None,
          pool: None,
        }
      },
    }
  }

  fn release(&self, class: usize, slab: Box<[u8]>) {
    let mut list = self.free_lists[class].lock().unwrap();
    if list.len() < FREE_LIST_CAP {
      list.push(slab);
    }
  }

  pub fn stats(&self) -> PoolStats {
    PoolStats {
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
    }
  }

  /// Recycled slabs currently parked in the given class free list.
  pub fn free_count(&self, class: usize) -> usize {
    self.free_lists[class].lock().unwrap().len()
  }
}

impl PooledBytes {
  #[inline]
  pub fn as_slice(&self) -> &[u8] {
    // The buffer is only None transiently inside drop
    &self.buf.as_ref().unwrap()[..self.len]
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Slot capacity actually held, for memory accounting.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.buf.as_ref().map(|b| b.len()).unwrap_or(0)
  }

  /// Whether this buffer came out of a pool class (a hit).
  pub fn is_pooled(&self) -> bool {
    self.class.is_some()
  }
}

impl Drop for PooledBytes {
  fn drop(&mut self) {
    if let (Some(class), Some(pool), Some(buf)) =
      (self.class, self.pool.take(), self.buf.take())
    {
      pool.release(class, buf);
    }
  }
}

impl std::ops::Deref for PooledBytes {
  type Target = [u8];

  fn deref(&self) -> &[u8] {
    self.as_slice()
  }
}

impl PartialEq<[u8]> for PooledBytes {
  fn eq(&self, other: &[u8]) -> bool {
    self.as_slice() == other
  }
}
