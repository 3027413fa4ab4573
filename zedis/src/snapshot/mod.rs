//! # Snapshot Writer
//!
//! Point-in-time persistence for one database: the entries are captured
//! into a plain data model, CBOR-encoded, lz4-compressed and written to a
//! timestamped file. SAVE invokes this synchronously with the client's
//! selected database.

mod __test__;

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use lz4::block::{compress, decompress, CompressionMode};
use serde::{Deserialize, Serialize};

use crate::error::ZedisError;
use crate::series::{SeriesConfig, TimeSeries};
use crate::store::Db;
use crate::value::Value;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DbSnapshot {
  pub service: String,
  pub hostname: String,
  pub pid: u32,
  pub created_at: String,
  pub db_index: usize,
  pub entries: Vec<SnapshotEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotEntry {
  pub key: Vec<u8>,
  pub expire_at_ms: Option<i64>,
  pub value: SnapshotValue,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SnapshotValue {
  Str(Vec<u8>),
  List(Vec<SnapshotCell>),
  Series {
    config: SeriesConfig,
    samples: Vec<(i64, f64)>,
  },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SnapshotCell {
  Int(i64),
  Str(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct SnapshotWriter {
  service: Cow<'static, str>,
  storage_dir: Cow<'static, str>,
}

impl SnapshotWriter {
  pub fn new(service: impl Into<String>, storage_dir: impl Into<String>) -> Self {
    Self {
      service: Cow::Owned(service.into()),
      storage_dir: Cow::Owned(storage_dir.into()),
    }
  }

  /// Materialise the database into the snapshot data model. Time series
  /// are decoded back to raw samples so the file does not depend on the
  /// chunk layout of the moment.
  pub fn capture(&self, db: &Db, db_index: usize) -> Result<DbSnapshot, ZedisError> {
    let mut entries = Vec::with_capacity(db.len());
    for (key, object) in db.iter() {
      let value = match &object.value {
        Value::Int(_) | Value::Short { .. } | Value::Str(_) => {
          match object.value.string_bytes() {
            Some(bytes) => SnapshotValue::Str(bytes),
            None => continue,
          }
        },
        Value::List(list) => SnapshotValue::List(
          list
            .iter()
            .map(|cell| match cell {
              crate::list::ListCell::Int(n) => SnapshotCell::Int(*n),
              crate::list::ListCell::Str(b) => SnapshotCell::Str(b.as_slice().to_vec()),
            })
            .collect(),
        ),
        Value::Series(series) => SnapshotValue::Series {
          config: series.config,
          samples: series
            .range(i64::MIN, i64::MAX)?
            .iter()
            .map(|s| (s.ts, s.value))
            .collect(),
        },
      };
      entries.push(SnapshotEntry {
        key: key.as_ref().to_vec(),
        expire_at_ms: db.expire_at(key),
        value,
      });
    }

    let hostname = gethostname::gethostname().to_string_lossy().into_owned();
    Ok(DbSnapshot {
      service: self.service.to_string(),
      hostname,
      pid: std::process::id(),
      created_at: Utc::now().format("%Y%m%d%H%M%S").to_string(),
      db_index,
      entries,
    })
  }

  /// Serialise to CBOR, compress, and write with a durable flush.
  pub fn write_snapshot(&self, snapshot: &DbSnapshot) -> Result<PathBuf, ZedisError> {
    let cbor = serde_cbor::to_vec(snapshot)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let compressed = compress(&cbor, Some(CompressionMode::DEFAULT), true)?;

    fs::create_dir_all(self.storage_dir.as_ref())?;
    let filename = PathBuf::from(self.storage_dir.as_ref()).join(format!(
      "{}-db{}-{}-{}.snap",
      self.service, snapshot.db_index, snapshot.pid, snapshot.created_at
    ));

    {
      let mut f = File::create(&filename)?;
      f.write_all(&compressed)?;
      f.sync_all()?;
    }

    tracing::info!(
      entries = snapshot.entries.len(),
      file = %filename.display(),
      "snapshot written"
    );
    Ok(filename)
  }

  pub fn save(&self, db: &Db, db_index: usize) -> Result<PathBuf, ZedisError> {
    let snapshot = self.capture(db, db_index)?;
    self.write_snapshot(&snapshot)
  }
}

/// Decompress and decode a snapshot file.
pub fn read_snapshot(path: &std::path::Path) -> Result<DbSnapshot, ZedisError> {
  let compressed = fs::read(path)?;
  let cbor = decompress(&compressed, None)?;
  serde_cbor::from_slice(&cbor)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

/// Rebuild a time series from snapshot samples, replaying them through the
/// normal add path so chunking and encoding re-establish themselves.
pub fn restore_series(config: SeriesConfig, samples: &[(i64, f64)]) -> TimeSeries {
  let mut series = TimeSeries::new(config);
  for &(ts, value) in samples {
    // Replay of a valid snapshot cannot violate ordering
    if series.add_sample(ts, value).is_err() {
      tracing::warn!(ts, "skipping out-of-order snapshot sample");
    }
  }
  series
}
