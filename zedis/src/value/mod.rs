//! # Object Model
//!
//! The tagged value union behind every stored key, and the object wrapper
//! carrying the approximate-LRU access stamp.
//!
//! String-family encoding on SET is tiered: bytes that parse as a canonical
//! signed 64-bit decimal become `Int` (no heap), anything up to 23 bytes is
//! inlined into the object as `Short` (no heap), and everything longer goes
//! through the tiered pool as `Str`. GET re-materialises the canonical form
//! from the tag, so `SET k 41` followed by `GET k` observes `41`.


use std::sync::Arc;

use crate::list::ListValue;
use crate::pool::{PooledBytes, TieredPool};
use crate::series::TimeSeries;
use crate::util::parse_i64_strict;

/// Longest byte string stored inline inside the object.
pub const SHORT_MAX: usize = 23;

#[derive(Debug)]
pub enum Value {
  Int(i64),
  Short { len: u8, data: [u8; SHORT_MAX] },
  Str(PooledBytes),
  List(ListValue),
  Series(TimeSeries),
}

/// A borrowed view of a string-family value.
#[derive(Debug, Clone, Copy)]
pub enum StringRef<'a> {
  Bytes(&'a [u8]),
  Int(i64),
}

/// A stored entry: the value plus the monotonic stamp of its last read.
#[derive(Debug)]
pub struct Object {
  pub value: Value,
  pub last_access: u64,
}

impl Value {
  /// Tiered string encoding: `Int`, then inline `Short`, then pooled `Str`.
  pub fn encode_string(pool: &Arc<TieredPool>, bytes: &[u8]) -> Value {
    if let Some(n) = parse_i64_strict(bytes) {
      return Value::Int(n);
    }
    if bytes.len() <= SHORT_MAX {
      let mut data = [0u8; SHORT_MAX];
      data[..bytes.len()].copy_from_slice(bytes);
      return Value::Short {
        len: bytes.len() as u8,
        data,
      };
    }
    Value::Str(pool.alloc_copy(bytes))
  }

  pub fn as_string(&self) -> Option<StringRef<'_>> {
    match self {
      Value::Int(n) => Some(StringRef::Int(*n)),
      Value::Short { len, data } => Some(StringRef::Bytes(&data[..*len as usize])),
      Value::Str(bytes) => Some(StringRef::Bytes(bytes.as_slice())),
      _ => None,
    }
  }

  /// Byte length of the string-family value as GET would observe it.
  pub fn string_len(&self) -> Option<usize> {
    match self.as_string()? {
      StringRef::Bytes(b) => Some(b.len()),
      StringRef::Int(n) => {
        let mut buf = itoa::Buffer::new();
        Some(buf.format(n).len())
      },
    }
  }

  /// Owned copy of the string-family bytes, converting through a scratch
  /// buffer for the integer variant.
  pub fn string_bytes(&self) -> Option<Vec<u8>> {
    match self.as_string()? {
      StringRef::Bytes(b) => Some(b.to_vec()),
      StringRef::Int(n) => {
        let mut buf = itoa::Buffer::new();
        Some(buf.format(n).as_bytes().to_vec())
      },
    }
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Int(_) | Value::Short { .. } | Value::Str(_) => "string",
      Value::List(_) => "list",
      Value::Series(_) => "tseries",
    }
  }

  /// Approximate heap footprint attributable to this value, for the
  /// memory budget. Inline variants cost nothing beyond the object.
  pub fn mem_size(&self) -> usize {
    match self {
      Value::Int(_) | Value::Short { .. } => 0,
      Value::Str(bytes) => bytes.capacity(),
      Value::List(list) => list.mem_size(),
      Value::Series(series) => series.mem_size(),
    }
  }
}

impl Object {
  pub fn new(value: Value) -> Self {
    Self {
      value,
      last_access: 0,
    }
  }
}
