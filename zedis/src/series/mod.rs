//! # Time-Series Engine
//!
//! Chunked, optionally compressed series of `(i64 timestamp, f64 value)`
//! samples. Sealed chunks form an ordered head→tail run; the active tail
//! buffer is the only mutable region and always holds its samples
//! uncompressed. Sealing encodes the buffer per the series encoding
//! (Gorilla delta/XOR or flat little-endian 16-byte records) and clears it
//! for reuse.
//!
//! A chunk is also sealed early when the next timestamp would not fit the
//! Gorilla field widths (the 14-bit second delta or the 32-bit
//! delta-of-delta escape); the new chunk re-opens with a raw 64-bit
//! timestamp, keeping every chunk stream self-contained and lossless.


use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::ZedisError;
use crate::gorilla::{self, fits_dod, fits_second_delta};

pub use crate::gorilla::Sample;

/// Samples a chunk accumulates before sealing, unless configured.
pub const DEFAULT_CHUNK_SAMPLES: u32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
  Block,
  First,
  Last,
  Min,
  Max,
  Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
  Uncompressed,
  DeltaXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
  Avg,
  Sum,
  Min,
  Max,
  Range,
  Count,
  First,
  Last,
  StdP,
  StdS,
  VarP,
  VarS,
}

impl DuplicatePolicy {
  pub fn parse(bytes: &[u8]) -> Option<Self> {
    match bytes.to_ascii_uppercase().as_slice() {
      b"BLOCK" => Some(Self::Block),
      b"FIRST" => Some(Self::First),
      b"LAST" => Some(Self::Last),
      b"MIN" => Some(Self::Min),
      b"MAX" => Some(Self::Max),
      b"SUM" => Some(Self::Sum),
      _ => None,
    }
  }
}

impl Encoding {
  pub fn parse(bytes: &[u8]) -> Option<Self> {
    match bytes.to_ascii_uppercase().as_slice() {
      b"COMPRESSED" => Some(Self::DeltaXor),
      b"UNCOMPRESSED" => Some(Self::Uncompressed),
      _ => None,
    }
  }
}

impl Aggregation {
  pub fn parse(bytes: &[u8]) -> Option<Self> {
    match bytes.to_ascii_uppercase().as_slice() {
      b"AVG" => Some(Self::Avg),
      b"SUM" => Some(Self::Sum),
      b"MIN" => Some(Self::Min),
      b"MAX" => Some(Self::Max),
      b"RANGE" => Some(Self::Range),
      b"COUNT" => Some(Self::Count),
      b"FIRST" => Some(Self::First),
      b"LAST" => Some(Self::Last),
      b"STD.P" => Some(Self::StdP),
      b"STD.S" => Some(Self::StdS),
      b"VAR.P" => Some(Self::VarP),
      b"VAR.S" => Some(Self::VarS),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesConfig {
  /// Retention window in milliseconds; 0 keeps everything.
  pub retention_ms: i64,
  pub policy: DuplicatePolicy,
  pub max_chunk_samples: u32,
  pub encoding: Encoding,
  pub ignore_max_time_diff: i64,
  pub ignore_max_value_diff: f64,
}

impl Default for SeriesConfig {
  fn default() -> Self {
    Self {
      retention_ms: 0,
      policy: DuplicatePolicy::Block,
      max_chunk_samples: DEFAULT_CHUNK_SAMPLES,
      encoding: Encoding::DeltaXor,
      ignore_max_time_diff: 0,
      ignore_max_value_diff: 0.0,
    }
  }
}

#[derive(Debug)]
pub struct SealedChunk {
  pub first_ts: i64,
  pub last_ts: i64,
  pub count: u32,
  pub encoding: Encoding,
  pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct TimeSeries {
  pub config: SeriesConfig,
  chunks: VecDeque<SealedChunk>,
  active: Vec<Sample>,
  total_samples: u64,
  last_sample: Option<Sample>,
}

impl SealedChunk {
  pub fn decode(&self) -> Result<Vec<Sample>, ZedisError> {
    match self.encoding {
      Encoding::DeltaXor => gorilla::decode_samples(&self.data, self.count),
      Encoding::Uncompressed => decode_flat(&self.data, self.count),
    }
  }
}

fn encode_flat(samples: &[Sample]) -> Vec<u8> {
  let mut out = Vec::with_capacity(samples.len() * 16);
  for sample in samples {
    out.extend_from_slice(&sample.ts.to_le_bytes());
    out.extend_from_slice(&sample.value.to_bits().to_le_bytes());
  }
  out
}

fn decode_flat(data: &[u8], count: u32) -> Result<Vec<Sample>, ZedisError> {
  if data.len() != count as usize * 16 {
    return Err(ZedisError::CorruptChunk);
  }
  let mut out = Vec::with_capacity(count as usize);
  for record in data.chunks_exact(16) {
    let ts = i64::from_le_bytes(record[..8].try_into().map_err(|_| ZedisError::CorruptChunk)?);
    let bits =
      u64::from_le_bytes(record[8..].try_into().map_err(|_| ZedisError::CorruptChunk)?);
    out.push(Sample {
      ts,
      value: f64::from_bits(bits),
    });
  }
  Ok(out)
}

impl TimeSeries {
  pub fn new(config: SeriesConfig) -> Self {
    Self {
      config,
      chunks: VecDeque::new(),
      active: Vec::new(),
      total_samples: 0,
      last_sample: None,
    }
  }

  pub fn total_samples(&self) -> u64 {
    self.total_samples
  }

  pub fn last_sample(&self) -> Option<Sample> {
    self.last_sample
  }

  pub fn sealed_chunks(&self) -> impl Iterator<Item = &SealedChunk> {
    self.chunks.iter()
  }

  /// Add one sample, applying the duplicate policy at equal timestamps,
  /// the LAST-policy ignore filter, chunk sealing and retention trimming.
  pub fn add_sample(&mut self, ts: i64, value: f64) -> Result<(), ZedisError> {
    if let Some(last) = self.last_sample {
      if ts < last.ts {
        return Err(ZedisError::SampleTooOld);
      }
      if ts == last.ts {
        return self.resolve_duplicate(value);
      }
      if self.config.policy == DuplicatePolicy::Last
        && ts - last.ts <= self.config.ignore_max_time_diff
        && (value - last.value).abs() <= self.config.ignore_max_value_diff
      {
        return Ok(());
      }
    }

    self.append(ts, value);
    self.trim_retention(ts);
    Ok(())
  }

  /// Equal-timestamp resolution. The last sample always lives in the
  /// active buffer, so an adjustment rewrites it in place.
  fn resolve_duplicate(&mut self, value: f64) -> Result<(), ZedisError> {
    let last = match self.last_sample {
      Some(last) => last,
      None => return Ok(()),
    };
    match self.config.policy {
      DuplicatePolicy::Block => Err(ZedisError::DuplicateTimestamp),
      DuplicatePolicy::First => Ok(()),
      DuplicatePolicy::Last => {
        if (value - last.value).abs() <= self.config.ignore_max_value_diff {
          return Ok(());
        }
        self.rewrite_last(value);
        Ok(())
      },
      DuplicatePolicy::Min => {
        if value < last.value {
          self.rewrite_last(value);
        }
        Ok(())
      },
      DuplicatePolicy::Max => {
        if value > last.value {
          self.rewrite_last(value);
        }
        Ok(())
      },
      DuplicatePolicy::Sum => {
        self.rewrite_last(last.value + value);
        Ok(())
      },
    }
  }

  fn rewrite_last(&mut self, value: f64) {
    if let Some(tail) = self.active.last_mut() {
      tail.value = value;
      self.last_sample = Some(*tail);
    }
  }

  fn append(&mut self, ts: i64, value: f64) {
    if !self.active.is_empty()
      && (self.active.len() as u32 >= self.config.max_chunk_samples || !self.codec_fits(ts))
    {
      self.seal_active();
    }
    let sample = Sample { ts, value };
    self.active.push(sample);
    self.last_sample = Some(sample);
    self.total_samples += 1;
  }

  /// Whether appending `ts` keeps the active buffer encodable by the
  /// Gorilla field widths. Uncompressed chunks accept anything.
  fn codec_fits(&self, ts: i64) -> bool {
    if self.config.encoding != Encoding::DeltaXor {
      return true;
    }
    match self.active.len() {
      0 => true,
      1 => fits_second_delta(ts - self.active[0].ts),
      n => {
        let delta = ts - self.active[n - 1].ts;
        let prev_delta = self.active[n - 1].ts - self.active[n - 2].ts;
        fits_dod(delta - prev_delta)
      },
    }
  }

  fn seal_active(&mut self) {
    let (first, last) = match (self.active.first(), self.active.last()) {
      (Some(first), Some(last)) => (first.ts, last.ts),
      _ => return,
    };
    let data = match self.config.encoding {
      Encoding::DeltaXor => gorilla::encode_samples(&self.active),
      Encoding::Uncompressed => encode_flat(&self.active),
    };
    self.chunks.push_back(SealedChunk {
      first_ts: first,
      last_ts: last,
      count: self.active.len() as u32,
      encoding: self.config.encoding,
      data,
    });
    self.active.clear();
  }

  fn trim_retention(&mut self, now_ts: i64) {
    if self.config.retention_ms <= 0 {
      return;
    }
    let cutoff = now_ts - self.config.retention_ms;
    while let Some(front) = self.chunks.front() {
      if front.last_ts < cutoff {
        let dropped = self.chunks.pop_front();
        if let Some(chunk) = dropped {
          self.total_samples = self.total_samples.saturating_sub(chunk.count as u64);
        }
      } else {
        break;
      }
    }
  }

  /// All samples with `start <= ts <= end`, in timestamp order. Sealed
  /// chunks wholly outside the window are skipped without decoding; the
  /// active tail is read directly from its uncompressed buffer.
  pub fn range(&self, start: i64, end: i64) -> Result<Vec<Sample>, ZedisError> {
    let mut out = Vec::new();
    for chunk in &self.chunks {
      if chunk.last_ts < start {
        continue;
      }
      if chunk.first_ts > end {
        return Ok(out);
      }
      for sample in chunk.decode()? {
        if sample.ts >= start && sample.ts <= end {
          out.push(sample);
        }
      }
    }
    for sample in &self.active {
      if sample.ts >= start && sample.ts <= end {
        out.push(*sample);
      }
    }
    Ok(out)
  }

  pub fn mem_size(&self) -> usize {
    let sealed: usize = self
      .chunks
      .iter()
      .map(|c| c.data.capacity() + std::mem::size_of::<SealedChunk>())
      .sum();
    sealed + self.active.capacity() * std::mem::size_of::<Sample>()
  }
}

/// Group samples into fixed windows of `bucket` ms aligned at
/// `floor(ts / bucket) * bucket` and reduce each window.
pub fn aggregate(samples: &[Sample], bucket: i64, agg: Aggregation) -> Vec<Sample> {
  debug_assert!(bucket > 0);
  let mut out = Vec::new();
  let mut i = 0;
  while i < samples.len() {
    let bucket_start = samples[i].ts.div_euclid(bucket) * bucket;
    let mut j = i + 1;
    while j < samples.len() && samples[j].ts.div_euclid(bucket) * bucket == bucket_start {
      j += 1;
    }
    out.push(Sample {
      ts: bucket_start,
      value: reduce(&samples[i..j], agg),
    });
    i = j;
  }
  out
}

fn reduce(group: &[Sample], agg: Aggregation) -> f64 {
  let n = group.len() as f64;
  let sum: f64 = group.iter().map(|s| s.value).sum();
  match agg {
    Aggregation::Avg => sum / n,
    Aggregation::Sum => sum,
    Aggregation::Min => group.iter().map(|s| s.value).fold(f64::INFINITY, f64::min),
    Aggregation::Max => group
      .iter()
      .map(|s| s.value)
      .fold(f64::NEG_INFINITY, f64::max),
    Aggregation::Range => {
      let min = group.iter().map(|s| s.value).fold(f64::INFINITY, f64::min);
      let max = group
        .iter()
        .map(|s| s.value)
        .fold(f64::NEG_INFINITY, f64::max);
      max - min
    },
    Aggregation::Count => n,
    Aggregation::First => group[0].value,
    Aggregation::Last => group[group.len() - 1].value,
    Aggregation::VarP => variance(group, sum, false),
    Aggregation::VarS => variance(group, sum, true),
    Aggregation::StdP => variance(group, sum, false).sqrt(),
    Aggregation::StdS => variance(group, sum, true).sqrt(),
  }
}

/// Two-pass variance; the sample variants return 0 for one-element groups.
fn variance(group: &[Sample], sum: f64, sample_variance: bool) -> f64 {
  let n = group.len() as f64;
  if sample_variance && group.len() <= 1 {
    return 0.0;
  }
  let mean = sum / n;
  let squares: f64 = group.iter().map(|s| (s.value - mean).powi(2)).sum();
  if sample_variance {
    squares / (n - 1.0)
  } else {
    squares / n
  }
}
