//! Key-space handlers: existence, scanning, expiry introspection, rename.

use crate::error::ZedisError;
use crate::resp::ReplyWriter;
use crate::store::Store;
use crate::util::now_ms;

pub fn exists(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let now = now_ms();
  let mut found = 0i64;
  for key in &args[1..] {
    if db.entry(key, now).is_some() {
      found += 1;
    }
  }
  w.int(found)
}

pub fn keys(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let matched = db.keys_matching(&args[1], now_ms());
  w.array_header(matched.len())?;
  for key in &matched {
    w.bulk(key)?;
  }
  Ok(())
}

/// Replies −2 for a missing key, −1 for a persistent one, and otherwise
/// the stored absolute expiry timestamp in milliseconds.
pub fn ttl(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  if db.entry(&args[1], now_ms()).is_none() {
    return w.int(-2);
  }
  match db.expire_at(&args[1]) {
    Some(at_ms) => w.int(at_ms),
    None => w.int(-1),
  }
}

pub fn persist(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  if db.entry(&args[1], now_ms()).is_none() {
    return w.int(0);
  }
  w.int(if db.persist(&args[1]) { 1 } else { 0 })
}

pub fn type_of(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  match db.entry(&args[1], now_ms()) {
    Some(obj) => {
      let name = obj.value.type_name();
      w.simple(name)
    },
    None => w.simple("none"),
  }
}

pub fn rename(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let now = now_ms();
  db.expire_if_due(&args[1], now);

  let (object, expire_at) = db.take(&args[1]).ok_or(ZedisError::NoSuchKey)?;
  db.put_object(&args[2], object)?;
  if let Some(at_ms) = expire_at {
    db.set_expire(&args[2], at_ms);
  }
  w.simple("OK")
}

pub fn randomkey(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let _ = args;
  let mut db = store.db(db);
  let now = now_ms();
  let mut rng = rand::thread_rng();

  // A few draws are enough; expired picks are deleted and retried
  for _ in 0..16 {
    match db.random_key(&mut rng) {
      Some(key) => {
        if db.expire_if_due(&key, now) {
          continue;
        }
        return w.bulk(&key);
      },
      None => break,
    }
  }
  w.null_bulk()
}
