
use crate::error::ZedisError;

/// Milliseconds since the Unix epoch.
#[inline]
pub fn now_ms() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

/// Strict base-10 signed 64-bit parse, matching the canonical decimal form:
/// no leading `+`, no leading zeros, no surrounding whitespace. Returns
/// `None` for anything whose round-trip through formatting would differ
/// from the input.
pub fn parse_i64_strict(bytes: &[u8]) -> Option<i64> {
  if bytes.is_empty() || bytes.len() > 20 {
    return None;
  }
  let (neg, digits) = match bytes[0] {
    b'-' => (true, &bytes[1..]),
    _ => (false, bytes),
  };
  if digits.is_empty() {
    return None;
  }
  // "0" is canonical, "007" and "-0" are not
  if digits[0] == b'0' && (digits.len() > 1 || neg) {
    return None;
  }
  let mut acc: i64 = 0;
  for &b in digits {
    if !b.is_ascii_digit() {
      return None;
    }
    acc = acc.checked_mul(10)?;
    let d = (b - b'0') as i64;
    acc = if neg { acc.checked_sub(d)? } else { acc.checked_add(d)? };
  }
  Some(acc)
}

/// Parse a command argument as an integer, surfacing the RESP integer error.
pub fn arg_i64(bytes: &[u8]) -> Result<i64, ZedisError> {
  let s = std::str::from_utf8(bytes).map_err(|_| ZedisError::NotAnInteger)?;
  s.parse::<i64>().map_err(|_| ZedisError::NotAnInteger)
}

/// Parse a command argument as a float, surfacing the RESP float error.
pub fn arg_f64(bytes: &[u8]) -> Result<f64, ZedisError> {
  let s = std::str::from_utf8(bytes).map_err(|_| ZedisError::NotAFloat)?;
  let v = s.parse::<f64>().map_err(|_| ZedisError::NotAFloat)?;
  if v.is_nan() {
    return Err(ZedisError::NotAFloat);
  }
  Ok(v)
}
