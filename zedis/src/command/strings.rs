//! String-family handlers: tiered encoding on write, canonical decimal on
//! read, arithmetic through the integer variant, expiry installation.

use crate::error::ZedisError;
use crate::resp::{format_f64, ReplyWriter};
use crate::store::{Db, Store};
use crate::util::{arg_f64, arg_i64, now_ms, parse_i64_strict};
use crate::value::{StringRef, Value};

pub(crate) fn write_string_ref(w: &mut ReplyWriter, r: StringRef) -> Result<(), ZedisError> {
  match r {
    StringRef::Bytes(b) => w.bulk(b),
    StringRef::Int(n) => w.bulk_i64(n),
  }
}

pub fn set(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let value = Value::encode_string(&db.pool(), &args[2]);
  db.put(&args[1], value)?;
  w.simple("OK")
}

pub fn get(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  match db.access(&args[1], now_ms()) {
    Some(obj) => match obj.value.as_string() {
      Some(r) => write_string_ref(w, r),
      None => Err(ZedisError::WrongType),
    },
    None => w.null_bulk(),
  }
}

pub fn del(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let now = now_ms();
  let mut removed = 0i64;
  for key in &args[1..] {
    db.expire_if_due(key, now);
    if db.remove(key) {
      removed += 1;
    }
  }
  w.int(removed)
}

pub fn incr(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  incr_by(store, db, &args[1], 1, w)
}

pub fn decr(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  incr_by(store, db, &args[1], -1, w)
}

pub fn incrby(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let delta = arg_i64(&args[2])?;
  incr_by(store, db, &args[1], delta, w)
}

pub fn decrby(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let delta = arg_i64(&args[2])?;
  incr_by(store, db, &args[1], delta.checked_neg().ok_or(ZedisError::Overflow)?, w)
}

fn incr_by(
  store: &Store,
  db: usize,
  key: &[u8],
  delta: i64,
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let now = now_ms();

  let (current, old_size, existed) = match db.entry_mut(key, now) {
    Some(obj) => {
      let current = match obj.value.as_string() {
        Some(StringRef::Int(n)) => n,
        Some(StringRef::Bytes(b)) => {
          parse_i64_strict(b).ok_or(ZedisError::NotAnInteger)?
        },
        None => return Err(ZedisError::WrongType),
      };
      (current, obj.value.mem_size(), true)
    },
    None => (0, 0, false),
  };

  let next = current.checked_add(delta).ok_or(ZedisError::Overflow)?;
  if existed {
    if let Some(obj) = db.entry_mut(key, now) {
      obj.value = Value::Int(next);
    }
    db.note_value_resized(old_size, 0);
  } else {
    db.put(key, Value::Int(next))?;
  }
  w.bulk_i64(next)
}

pub fn incrbyfloat(
  store: &Store,
  db: usize,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let delta = arg_f64(&args[2])?;
  let mut db = store.db(db);
  let now = now_ms();

  let (current, old_size, existed) = match db.entry_mut(&args[1], now) {
    Some(obj) => {
      let current = match obj.value.as_string() {
        Some(StringRef::Int(n)) => n as f64,
        Some(StringRef::Bytes(b)) => {
          let s = std::str::from_utf8(b).map_err(|_| ZedisError::NotAFloat)?;
          s.parse::<f64>().map_err(|_| ZedisError::NotAFloat)?
        },
        None => return Err(ZedisError::WrongType),
      };
      (current, obj.value.mem_size(), true)
    },
    None => (0.0, 0, false),
  };

  let next = current + delta;
  if !next.is_finite() {
    return Err(ZedisError::Overflow);
  }
  let mut scratch = [0u8; 32];
  let formatted = format_f64(next, &mut scratch).to_vec();

  let encoded = Value::encode_string(&db.pool(), &formatted);
  if existed {
    let new_size = encoded.mem_size();
    if let Some(obj) = db.entry_mut(&args[1], now) {
      obj.value = encoded;
    }
    db.note_value_resized(old_size, new_size);
  } else {
    db.put(&args[1], encoded)?;
  }
  w.bulk(&formatted)
}

pub fn append(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let now = now_ms();

  let (mut bytes, old_size, existed) = match db.entry_mut(&args[1], now) {
    Some(obj) => match obj.value.string_bytes() {
      Some(bytes) => (bytes, obj.value.mem_size(), true),
      None => return Err(ZedisError::WrongType),
    },
    None => (Vec::new(), 0, false),
  };

  bytes.extend_from_slice(&args[2]);
  let len = bytes.len();
  let encoded = Value::encode_string(&db.pool(), &bytes);
  if existed {
    let new_size = encoded.mem_size();
    if let Some(obj) = db.entry_mut(&args[1], now) {
      obj.value = encoded;
    }
    db.note_value_resized(old_size, new_size);
  } else {
    db.put(&args[1], encoded)?;
  }
  w.int(len as i64)
}

pub fn strlen(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  match db.entry(&args[1], now_ms()) {
    Some(obj) => match obj.value.string_len() {
      Some(len) => w.int(len as i64),
      None => Err(ZedisError::WrongType),
    },
    None => w.int(0),
  }
}

pub fn getset(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let now = now_ms();

  let previous = match db.entry(&args[1], now) {
    Some(obj) => match obj.value.string_bytes() {
      Some(bytes) => Some(bytes),
      None => return Err(ZedisError::WrongType),
    },
    None => None,
  };

  let value = Value::encode_string(&db.pool(), &args[2]);
  db.put(&args[1], value)?;
  match previous {
    Some(bytes) => w.bulk(&bytes),
    None => w.null_bulk(),
  }
}

pub fn mget(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let now = now_ms();
  w.array_header(args.len() - 1)?;
  for key in &args[1..] {
    match db.access(key, now).and_then(|obj| obj.value.as_string()) {
      Some(r) => write_string_ref(w, r)?,
      None => w.null_bulk()?,
    }
  }
  Ok(())
}

pub fn mset(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  if (args.len() - 1) % 2 != 0 {
    return Err(ZedisError::WrongArgCount);
  }
  let mut db = store.db(db);
  for pair in args[1..].chunks_exact(2) {
    let value = Value::encode_string(&db.pool(), &pair[1]);
    db.put(&pair[0], value)?;
  }
  w.simple("OK")
}

pub fn setex(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let seconds = arg_i64(&args[2])?;
  if seconds <= 0 {
    return Err(ZedisError::NotAnInteger);
  }
  let mut db = store.db(db);
  let value = Value::encode_string(&db.pool(), &args[3]);
  db.put(&args[1], value)?;
  db.set_expire(&args[1], now_ms() + seconds * 1000);
  w.simple("OK")
}

pub fn setnx(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  if db.entry(&args[1], now_ms()).is_some() {
    return w.int(0);
  }
  let value = Value::encode_string(&db.pool(), &args[2]);
  db.put(&args[1], value)?;
  w.int(1)
}

pub fn expire(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let seconds = arg_i64(&args[2])?;
  let now = now_ms();
  expire_generic(&mut store.db(db), &args[1], now, now.saturating_add(seconds.saturating_mul(1000)), seconds <= 0, w)
}

pub fn expireat(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let unix_seconds = arg_i64(&args[2])?;
  let now = now_ms();
  let at_ms = unix_seconds.saturating_mul(1000);
  expire_generic(&mut store.db(db), &args[1], now, at_ms, at_ms <= now, w)
}

/// A non-positive or already-past deadline deletes immediately and reports
/// 1 iff something was deleted; otherwise the deadline is installed.
fn expire_generic(
  db: &mut Db,
  key: &[u8],
  now: i64,
  at_ms: i64,
  in_past: bool,
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  db.expire_if_due(key, now);
  if in_past {
    let deleted = db.remove(key);
    return w.int(if deleted { 1 } else { 0 });
  }
  if db.set_expire(key, at_ms) {
    w.int(1)
  } else {
    w.int(0)
  }
}
