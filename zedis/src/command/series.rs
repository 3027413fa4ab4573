//! Time-series handlers: creation and alteration with option parsing,
//! sample ingestion, last-sample reads and windowed range queries with
//! fixed-bucket aggregation.

use crate::error::ZedisError;
use crate::resp::ReplyWriter;
use crate::series::{
  aggregate, Aggregation, DuplicatePolicy, Encoding, SeriesConfig, TimeSeries,
};
use crate::store::Store;
use crate::util::{arg_f64, arg_i64, now_ms};
use crate::value::Value;

fn parse_options(
  args: &[Vec<u8>],
  mut config: SeriesConfig,
  allow_encoding: bool,
) -> Result<SeriesConfig, ZedisError> {
  let mut i = 0;
  while i < args.len() {
    let option = args[i].to_ascii_uppercase();
    match option.as_slice() {
      b"RETENTION" => {
        let raw = args.get(i + 1).ok_or(ZedisError::WrongArgCount)?;
        let retention = arg_i64(raw)?;
        if retention < 0 {
          return Err(ZedisError::InvalidArgument);
        }
        config.retention_ms = retention;
        i += 2;
      },
      b"ENCODING" if allow_encoding => {
        let raw = args.get(i + 1).ok_or(ZedisError::WrongArgCount)?;
        config.encoding = Encoding::parse(raw).ok_or(ZedisError::InvalidArgument)?;
        i += 2;
      },
      b"CHUNK_SIZE" => {
        let raw = args.get(i + 1).ok_or(ZedisError::WrongArgCount)?;
        let samples = arg_i64(raw)?;
        if samples <= 0 || samples > u32::MAX as i64 {
          return Err(ZedisError::InvalidArgument);
        }
        config.max_chunk_samples = samples as u32;
        i += 2;
      },
      b"DUPLICATE_POLICY" => {
        let raw = args.get(i + 1).ok_or(ZedisError::WrongArgCount)?;
        config.policy = DuplicatePolicy::parse(raw).ok_or(ZedisError::InvalidArgument)?;
        i += 2;
      },
      b"IGNORE" => {
        let time_raw = args.get(i + 1).ok_or(ZedisError::WrongArgCount)?;
        let value_raw = args.get(i + 2).ok_or(ZedisError::WrongArgCount)?;
        let time_diff = arg_i64(time_raw)?;
        let value_diff = arg_f64(value_raw)?;
        if time_diff < 0 || value_diff < 0.0 {
          return Err(ZedisError::InvalidArgument);
        }
        config.ignore_max_time_diff = time_diff;
        config.ignore_max_value_diff = value_diff;
        i += 3;
      },
      _ => return Err(ZedisError::InvalidArgument),
    }
  }
  Ok(config)
}

/// `*` means "now"; everything else is a millisecond timestamp.
fn parse_ts(raw: &[u8]) -> Result<i64, ZedisError> {
  if raw == b"*" {
    return Ok(now_ms());
  }
  arg_i64(raw)
}

pub fn create(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let config = parse_options(&args[2..], SeriesConfig::default(), true)?;
  let mut db = store.db(db);
  if db.entry(&args[1], now_ms()).is_some() {
    return Err(ZedisError::KeyExists);
  }
  db.put(&args[1], Value::Series(TimeSeries::new(config)))?;
  w.simple("OK")
}

pub fn add(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let ts = parse_ts(&args[2])?;
  let value = arg_f64(&args[3])?;

  let mut db = store.db(db);
  let now = now_ms();
  match db.entry(&args[1], now) {
    Some(obj) if !matches!(obj.value, Value::Series(_)) => return Err(ZedisError::WrongType),
    Some(_) => {},
    // TS.ADD auto-creates with default settings
    None => db.put(&args[1], Value::Series(TimeSeries::new(SeriesConfig::default())))?,
  }

  let (old_size, new_size) = {
    let obj = db.entry_mut(&args[1], now).ok_or(ZedisError::NoSuchKey)?;
    let series = match &mut obj.value {
      Value::Series(series) => series,
      _ => return Err(ZedisError::WrongType),
    };
    let old_size = series.mem_size();
    series.add_sample(ts, value)?;
    (old_size, series.mem_size())
  };
  db.note_value_resized(old_size, new_size);
  w.int(ts)
}

pub fn get(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let obj = db.entry(&args[1], now_ms()).ok_or(ZedisError::NoSuchKey)?;
  let series = match &obj.value {
    Value::Series(series) => series,
    _ => return Err(ZedisError::WrongType),
  };
  match series.last_sample() {
    Some(sample) => {
      w.array_header(2)?;
      w.int(sample.ts)?;
      w.bulk_f64(sample.value)
    },
    None => w.array_header(0),
  }
}

pub fn incrby(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  adjust_by(store, db, args, 1.0, w)
}

pub fn decrby(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  adjust_by(store, db, args, -1.0, w)
}

/// Shared TS.INCRBY/TS.DECRBY path: read the last value, shift it by the
/// signed delta, and append at the given (or current) timestamp.
fn adjust_by(
  store: &Store,
  db: usize,
  args: &[Vec<u8>],
  sign: f64,
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let delta = arg_f64(&args[2])? * sign;
  let ts = match args.get(3) {
    Some(opt) => {
      if !opt.eq_ignore_ascii_case(b"TIMESTAMP") {
        return Err(ZedisError::InvalidArgument);
      }
      parse_ts(args.get(4).ok_or(ZedisError::WrongArgCount)?)?
    },
    None => now_ms(),
  };

  let mut db = store.db(db);
  let now = now_ms();
  match db.entry(&args[1], now) {
    Some(obj) if !matches!(obj.value, Value::Series(_)) => return Err(ZedisError::WrongType),
    Some(_) => {},
    None => db.put(&args[1], Value::Series(TimeSeries::new(SeriesConfig::default())))?,
  }

  let (old_size, new_size) = {
    let obj = db.entry_mut(&args[1], now).ok_or(ZedisError::NoSuchKey)?;
    let series = match &mut obj.value {
      Value::Series(series) => series,
      _ => return Err(ZedisError::WrongType),
    };
    let base = series.last_sample().map(|s| s.value).unwrap_or(0.0);
    let old_size = series.mem_size();
    series.add_sample(ts, base + delta)?;
    (old_size, series.mem_size())
  };
  db.note_value_resized(old_size, new_size);
  w.int(ts)
}

pub fn alter(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let mut db = store.db(db);
  let obj = db.entry_mut(&args[1], now_ms()).ok_or(ZedisError::NoSuchKey)?;
  let series = match &mut obj.value {
    Value::Series(series) => series,
    _ => return Err(ZedisError::WrongType),
  };
  // Encoding is fixed at creation; everything else may change
  series.config = parse_options(&args[2..], series.config, false)?;
  w.simple("OK")
}

pub fn range(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let start = match args[2].as_slice() {
    b"-" => i64::MIN,
    raw => arg_i64(raw)?,
  };
  let end = match args[3].as_slice() {
    b"+" => i64::MAX,
    raw => arg_i64(raw)?,
  };

  let mut count: Option<usize> = None;
  let mut agg: Option<(Aggregation, i64)> = None;
  let mut i = 4;
  while i < args.len() {
    let option = args[i].to_ascii_uppercase();
    match option.as_slice() {
      b"COUNT" => {
        let raw = args.get(i + 1).ok_or(ZedisError::WrongArgCount)?;
        let n = arg_i64(raw)?;
        if n < 0 {
          return Err(ZedisError::InvalidArgument);
        }
        count = Some(n as usize);
        i += 2;
      },
      b"AGGREGATION" => {
        let kind_raw = args.get(i + 1).ok_or(ZedisError::WrongArgCount)?;
        let bucket_raw = args.get(i + 2).ok_or(ZedisError::WrongArgCount)?;
        let kind = Aggregation::parse(kind_raw).ok_or(ZedisError::InvalidArgument)?;
        let bucket = arg_i64(bucket_raw)?;
        if bucket <= 0 {
          return Err(ZedisError::InvalidArgument);
        }
        agg = Some((kind, bucket));
        i += 3;
      },
      _ => return Err(ZedisError::InvalidArgument),
    }
  }

  let mut db = store.db(db);
  let obj = db.entry(&args[1], now_ms()).ok_or(ZedisError::NoSuchKey)?;
  let series = match &obj.value {
    Value::Series(series) => series,
    _ => return Err(ZedisError::WrongType),
  };

  let mut samples = series.range(start, end)?;
  if let Some((kind, bucket)) = agg {
    samples = aggregate(&samples, bucket, kind);
  }
  if let Some(limit) = count {
    samples.truncate(limit);
  }

  w.array_header(samples.len())?;
  for sample in &samples {
    w.array_header(2)?;
    w.int(sample.ts)?;
    w.bulk_f64(sample.value)?;
  }
  Ok(())
}
