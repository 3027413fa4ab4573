//! # Configuration
//!
//! The knobs that reach the engine: initial hash-index capacity, memory
//! budget, eviction policy, optional password, database count, plus the
//! collaborator settings (bind address, persistence-log path, snapshot
//! directory). Loaded from a JSON file; every field has a default so a
//! partial file works.


use serde::{Deserialize, Serialize};

use crate::error::ZedisError;
use crate::lru::EvictionPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub bind: String,
  pub port: u16,
  pub databases: usize,
  pub initial_capacity: usize,
  /// Memory budget in bytes; 0 is unbounded.
  pub max_memory: usize,
  pub eviction_policy: EvictionPolicy,
  pub requirepass: Option<String>,
  pub appendonly: bool,
  pub appendfilename: String,
  pub snapshot_dir: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      bind: "127.0.0.1".to_string(),
      port: 6379,
      databases: 16,
      initial_capacity: 1024,
      max_memory: 0,
      eviction_policy: EvictionPolicy::NoEviction,
      requirepass: None,
      appendonly: false,
      appendfilename: "zedis.aof".to_string(),
      snapshot_dir: ".".to_string(),
    }
  }
}

impl Config {
  pub fn from_file(path: &str) -> Result<Self, ZedisError> {
    let data = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&data)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<(), ZedisError> {
    if self.databases == 0 || self.databases > 16 {
      return Err(ZedisError::InvalidDbIndex);
    }
    Ok(())
  }
}
