//! # Approximate-LRU Sampler
//!
//! Victim selection without per-key clocks: every successful read stamps
//! its object from one engine-wide monotonic counter, and eviction draws a
//! handful of random entries and takes the smallest stamp. `volatile-lru`
//! restricts the draw to keys carrying an expiry.

mod __test__;

use serde::{Deserialize, Serialize};

use crate::intern::Key;
use crate::store::Db;

/// Entries drawn per eviction round.
pub const LRU_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionPolicy {
  #[serde(rename = "noeviction")]
  NoEviction,
  #[serde(rename = "allkeys-lru")]
  AllKeysLru,
  #[serde(rename = "volatile-lru")]
  VolatileLru,
}

impl EvictionPolicy {
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "noeviction" => Some(Self::NoEviction),
      "allkeys-lru" => Some(Self::AllKeysLru),
      "volatile-lru" => Some(Self::VolatileLru),
      _ => None,
    }
  }
}

/// Draw up to `n` random entries and return the key with the smallest
/// access stamp. `None` when the sampled population is empty.
pub fn sample_lru_key<R: rand::Rng>(
  db: &Db,
  n: usize,
  volatile_only: bool,
  rng: &mut R,
) -> Option<Key> {
  let mut best: Option<(Key, u64)> = None;
  for _ in 0..n {
    let (key, stamp) = if volatile_only {
      let key = db.random_volatile_key(rng)?;
      let stamp = db.peek_last_access(&key)?;
      (key, stamp)
    } else {
      db.random_object(rng)
        .map(|(k, obj)| (k, obj.last_access))?
    };
    match &best {
      Some((_, smallest)) if *smallest <= stamp => {},
      _ => best = Some((key, stamp)),
    }
  }
  best.map(|(key, _)| key)
}
