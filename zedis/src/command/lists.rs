//! List handlers. Pushes create the list on demand, pops delete it when it
//! drains, and LRANGE streams cells straight to the writer.

use crate::error::ZedisError;
use crate::list::{ListCell, ListValue};
use crate::resp::ReplyWriter;
use crate::store::Store;
use crate::util::{arg_i64, now_ms};
use crate::value::Value;

fn write_cell(w: &mut ReplyWriter, cell: &ListCell) -> Result<(), ZedisError> {
  match cell {
    ListCell::Int(n) => w.bulk_i64(*n),
    ListCell::Str(b) => w.bulk(b.as_slice()),
  }
}

fn push(
  store: &Store,
  db: usize,
  args: &[Vec<u8>],
  front: bool,
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let now = now_ms();
  let pool = db.pool();

  match db.entry(&args[1], now) {
    Some(obj) if !matches!(obj.value, Value::List(_)) => return Err(ZedisError::WrongType),
    Some(_) => {},
    None => db.put(&args[1], Value::List(ListValue::new()))?,
  }

  let (len, old_size, new_size) = {
    let obj = db.entry_mut(&args[1], now).ok_or(ZedisError::NoSuchKey)?;
    let list = match &mut obj.value {
      Value::List(list) => list,
      _ => return Err(ZedisError::WrongType),
    };
    let old_size = list.mem_size();
    for item in &args[2..] {
      let cell = ListCell::encode(&pool, item);
      if front {
        list.push_front(cell);
      } else {
        list.push_back(cell);
      }
    }
    (list.len(), old_size, list.mem_size())
  };
  db.note_value_resized(old_size, new_size);
  w.int(len as i64)
}

pub fn lpush(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  push(store, db, args, true, w)
}

pub fn rpush(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  push(store, db, args, false, w)
}

fn pop(
  store: &Store,
  db: usize,
  args: &[Vec<u8>],
  front: bool,
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let count = match args.get(2) {
    Some(raw) => {
      let n = arg_i64(raw)?;
      if n < 0 {
        return Err(ZedisError::NotAnInteger);
      }
      Some(n as usize)
    },
    None => None,
  };

  let mut db = store.db(db);
  let now = now_ms();

  let (popped, old_size, new_size, drained) = match db.entry_mut(&args[1], now) {
    Some(obj) => {
      let list = match &mut obj.value {
        Value::List(list) => list,
        _ => return Err(ZedisError::WrongType),
      };
      let old_size = list.mem_size();
      let take = count.unwrap_or(1).min(list.len());
      let mut popped = Vec::with_capacity(take);
      for _ in 0..take {
        let cell = if front { list.pop_front() } else { list.pop_back() };
        match cell {
          Some(cell) => popped.push(cell),
          None => break,
        }
      }
      (popped, old_size, list.mem_size(), list.is_empty())
    },
    None => {
      // Absent key: null element without a count, null array with one
      return match count {
        Some(_) => w.null_array(),
        None => w.null_bulk(),
      };
    },
  };

  db.note_value_resized(old_size, new_size);
  if drained {
    db.remove(&args[1]);
  }

  match count {
    None => match popped.first() {
      Some(cell) => write_cell(w, cell),
      None => w.null_bulk(),
    },
    Some(_) => {
      if popped.is_empty() {
        return w.null_array();
      }
      w.array_header(popped.len())?;
      for cell in &popped {
        write_cell(w, cell)?;
      }
      Ok(())
    },
  }
}

pub fn lpop(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  pop(store, db, args, true, w)
}

pub fn rpop(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  pop(store, db, args, false, w)
}

pub fn llen(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  match db.entry(&args[1], now_ms()) {
    Some(obj) => match &obj.value {
      Value::List(list) => w.int(list.len() as i64),
      _ => Err(ZedisError::WrongType),
    },
    None => w.int(0),
  }
}

pub fn lindex(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let index = arg_i64(&args[2])?;
  let mut db = store.db(db);
  match db.entry(&args[1], now_ms()) {
    Some(obj) => match &obj.value {
      Value::List(list) => match list.get(index) {
        Some(cell) => write_cell(w, cell),
        None => w.null_bulk(),
      },
      _ => Err(ZedisError::WrongType),
    },
    None => w.null_bulk(),
  }
}

pub fn lset(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let index = arg_i64(&args[2])?;
  let mut db = store.db(db);
  let now = now_ms();
  let pool = db.pool();

  let (old_size, new_size) = {
    let obj = db.entry_mut(&args[1], now).ok_or(ZedisError::NoSuchKey)?;
    let list = match &mut obj.value {
      Value::List(list) => list,
      _ => return Err(ZedisError::WrongType),
    };
    let old_size = list.mem_size();
    list.set(index, ListCell::encode(&pool, &args[3]))?;
    (old_size, list.mem_size())
  };
  db.note_value_resized(old_size, new_size);
  w.simple("OK")
}

pub fn lrange(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let start = arg_i64(&args[2])?;
  let stop = arg_i64(&args[3])?;
  let mut db = store.db(db);

  let obj = match db.entry(&args[1], now_ms()) {
    Some(obj) => obj,
    None => return w.array_header(0),
  };
  let list = match &obj.value {
    Value::List(list) => list,
    _ => return Err(ZedisError::WrongType),
  };

  match list.clamp_range(start, stop) {
    Some((from, to)) => {
      w.array_header(to - from + 1)?;
      for cell in list.range(from, to) {
        write_cell(w, cell)?;
      }
      Ok(())
    },
    None => w.array_header(0),
  }
}
