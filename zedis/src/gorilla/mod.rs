//! # Gorilla Codec
//!
//! Bit-packed delta-of-delta timestamp and XOR float encoding for sealed
//! time-series chunks.
//!
//! ## Stream Layout
//!
//! Big-endian bit stream, byte-aligned on flush. Per chunk:
//! - Sample 1: raw 64-bit timestamp, raw 64-bit float bit pattern.
//! - Sample 2: 14-bit two's-complement delta from sample 1.
//! - Sample ≥ 3: delta-of-delta with a variable-length prefix:
//!   `0` for zero, `10`+7 bits for −63..=64, `110`+9 bits for −255..=256,
//!   `1110`+12 bits for −2047..=2048, `1111`+32 bits as the escape.
//! - Values ≥ 2: XOR against the previous value; `0` when identical,
//!   `1 0` to reuse the previous leading/trailing window, `1 1` plus a
//!   5-bit leading count and 6-bit significant-bit count to open a new one.
//!
//! Regular cadences therefore compress to one bit per timestamp and one
//! bit per unchanged value.
//!
//! The stream carries no terminator: the reader is bounded by the chunk's
//! sample count and mirrors the encoder's state, so every chunk is
//! self-contained and decodable in isolation.


use crate::error::ZedisError;

/// One time-series observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
  pub ts: i64,
  pub value: f64,
}

/// The 14-bit field for the second sample's delta.
#[inline]
pub fn fits_second_delta(delta: i64) -> bool {
  (-8192..=8191).contains(&delta)
}

/// The 32-bit escape band for a delta-of-delta. Asymmetric because bands
/// decode with the `v > 2^(n-1) ⇒ v − 2^n` rule.
#[inline]
pub fn fits_dod(dod: i64) -> bool {
  dod > -(1i64 << 31) && dod <= (1i64 << 31)
}

//
// --- Bit stream ---
//

#[derive(Debug, Default)]
pub struct BitWriter {
  bytes: Vec<u8>,
  /// Bits occupied in the last byte; 0 means byte-aligned.
  used: u8,
}

impl BitWriter {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn write_bit(&mut self, bit: bool) {
    self.write_bits(bit as u64, 1);
  }

  /// Append the low `count` bits of `value`, most significant first.
  pub fn write_bits(&mut self, value: u64, count: u8) {
    debug_assert!(count <= 64);
    let mut remaining = count;
    while remaining > 0 {
      if self.used == 0 {
        self.bytes.push(0);
      }
      let free = 8 - self.used;
      let take = free.min(remaining);
      let shift = remaining - take;
      let bits = ((value >> shift) & ((1u64 << take) - 1)) as u8;
      let last = self.bytes.last_mut().unwrap();
      *last |= bits << (free - take);
      self.used = (self.used + take) % 8;
      remaining -= take;
    }
  }

  /// Byte-aligned stream, zero-padded in the trailing byte.
  pub fn finish(self) -> Vec<u8> {
    self.bytes
  }

  pub fn bit_len(&self) -> usize {
    if self.used == 0 {
      self.bytes.len() * 8
    } else {
      (self.bytes.len() - 1) * 8 + self.used as usize
    }
  }
}

#[derive(Debug)]
pub struct BitReader<'a> {
  data: &'a [u8],
  /// Cursor in bits from the start of `data`.
  pos: usize,
}

impl<'a> BitReader<'a> {
  pub fn new(data: &'a [u8]) -> Self {
    Self { data, pos: 0 }
  }

  #[inline]
  pub fn read_bit(&mut self) -> Result<bool, ZedisError> {
    Ok(self.read_bits(1)? == 1)
  }

  /// Read `count` bits, most significant first.
  pub fn read_bits(&mut self, count: u8) -> Result<u64, ZedisError> {
    debug_assert!(count <= 64);
    let mut out = 0u64;
    let mut remaining = count;
    while remaining > 0 {
      let byte_idx = self.pos / 8;
      if byte_idx >= self.data.len() {
        return Err(ZedisError::CorruptChunk);
      }
      let bit_off = (self.pos % 8) as u8;
      let avail = 8 - bit_off;
      let take = avail.min(remaining);
      let bits = (self.data[byte_idx] >> (avail - take)) & (((1u16 << take) - 1) as u8);
      out = (out << take) | bits as u64;
      self.pos += take as usize;
      remaining -= take;
    }
    Ok(out)
  }
}

//
// --- Encoder ---
//

#[derive(Debug)]
pub struct SeriesEncoder {
  w: BitWriter,
  count: u32,
  prev_ts: i64,
  prev_delta: i64,
  prev_bits: u64,
  prev_leading: u8,
  prev_trailing: u8,
  window_valid: bool,
}

impl SeriesEncoder {
  pub fn new() -> Self {
    Self {
      w: BitWriter::new(),
      count: 0,
      prev_ts: 0,
      prev_delta: 0,
      prev_bits: 0,
      prev_leading: 0,
      prev_trailing: 0,
      window_valid: false,
    }
  }

  /// Append one sample. Callers must keep the second delta inside
  /// [`fits_second_delta`] and every delta-of-delta inside [`fits_dod`];
  /// the series engine seals a chunk rather than feeding a wider gap.
  pub fn push(&mut self, sample: Sample) {
    match self.count {
      0 => {
        self.w.write_bits(sample.ts as u64, 64);
        self.w.write_bits(sample.value.to_bits(), 64);
      },
      1 => {
        let delta = sample.ts - self.prev_ts;
        debug_assert!(fits_second_delta(delta));
        self.w.write_bits(delta as u64 & 0x3FFF, 14);
        self.prev_delta = delta;
        self.push_value(sample.value);
      },
      _ => {
        let delta = sample.ts - self.prev_ts;
        let dod = delta - self.prev_delta;
        debug_assert!(fits_dod(dod));
        if dod == 0 {
          self.w.write_bit(false);
        } else if (-63..=64).contains(&dod) {
          self.w.write_bits(0b10, 2);
          self.w.write_bits(dod as u64 & 0x7F, 7);
        } else if (-255..=256).contains(&dod) {
          self.w.write_bits(0b110, 3);
          self.w.write_bits(dod as u64 & 0x1FF, 9);
        } else if (-2047..=2048).contains(&dod) {
          self.w.write_bits(0b1110, 4);
          self.w.write_bits(dod as u64 & 0xFFF, 12);
        } else {
          self.w.write_bits(0b1111, 4);
          self.w.write_bits(dod as u64 & 0xFFFF_FFFF, 32);
        }
        self.prev_delta = delta;
        self.push_value(sample.value);
      },
    }
    self.prev_ts = sample.ts;
    if self.count == 0 {
      self.prev_bits = sample.value.to_bits();
    }
    self.count += 1;
  }

  fn push_value(&mut self, value: f64) {
    let bits = value.to_bits();
    let xor = self.prev_bits ^ bits;
    if xor == 0 {
      self.w.write_bit(false);
    } else {
      self.w.write_bit(true);
      let leading = (xor.leading_zeros() as u8).min(31);
      let trailing = xor.trailing_zeros() as u8;
      if self.window_valid && leading >= self.prev_leading && trailing >= self.prev_trailing
      {
        self.w.write_bit(false);
        let sig = 64 - self.prev_leading - self.prev_trailing;
        self.w.write_bits(xor >> self.prev_trailing, sig);
      } else {
        self.w.write_bit(true);
        let sig = 64 - leading - trailing;
        self.w.write_bits(leading as u64, 5);
        self.w.write_bits(sig as u64 & 0x3F, 6); // 64 wraps to 0
        self.w.write_bits(xor >> trailing, sig);
        self.prev_leading = leading;
        self.prev_trailing = trailing;
        self.window_valid = true;
      }
    }
    self.prev_bits = bits;
  }

  pub fn sample_count(&self) -> u32 {
    self.count
  }

  pub fn finish(self) -> Vec<u8> {
    self.w.finish()
  }
}

impl Default for SeriesEncoder {
  fn default() -> Self {
    Self::new()
  }
}

//
// --- Decoder ---
//

#[derive(Debug)]
pub struct SeriesDecoder<'a> {
  r: BitReader<'a>,
  remaining: u32,
  emitted: u32,
  prev_ts: i64,
  prev_delta: i64,
  prev_bits: u64,
  prev_leading: u8,
  prev_trailing: u8,
}

impl<'a> SeriesDecoder<'a> {
  /// `count` bounds the stream; there is no in-band terminator.
  pub fn new(data: &'a [u8], count: u32) -> Self {
    Self {
      r: BitReader::new(data),
      remaining: count,
      emitted: 0,
      prev_ts: 0,
      prev_delta: 0,
      prev_bits: 0,
      prev_leading: 0,
      prev_trailing: 0,
    }
  }

  pub fn next_sample(&mut self) -> Result<Option<Sample>, ZedisError> {
    if self.remaining == 0 {
      return Ok(None);
    }

    let ts = match self.emitted {
      0 => {
        let ts = self.r.read_bits(64)? as i64;
        self.prev_bits = self.r.read_bits(64)?;
        self.remaining -= 1;
        self.emitted += 1;
        self.prev_ts = ts;
        return Ok(Some(Sample {
          ts,
          value: f64::from_bits(self.prev_bits),
        }));
      },
      1 => {
        let raw = self.r.read_bits(14)? as i64;
        let delta = if raw >= 1 << 13 { raw - (1 << 14) } else { raw };
        self.prev_delta = delta;
        self.prev_ts + delta
      },
      _ => {
        let dod = self.read_dod()?;
        let delta = self.prev_delta + dod;
        self.prev_delta = delta;
        self.prev_ts + delta
      },
    };

    let value = self.read_value()?;
    self.prev_ts = ts;
    self.remaining -= 1;
    self.emitted += 1;
    Ok(Some(Sample { ts, value }))
  }

  fn read_dod(&mut self) -> Result<i64, ZedisError> {
    if !self.r.read_bit()? {
      return Ok(0);
    }
    // Band prefixes decode with the `v > 2^(n-1) ⇒ v − 2^n` rule, giving
    // the asymmetric ranges the encoder writes
    let (bits, half, full) = if !self.r.read_bit()? {
      (7u8, 1i64 << 6, 1i64 << 7)
    } else if !self.r.read_bit()? {
      (9, 1 << 8, 1 << 9)
    } else if !self.r.read_bit()? {
      (12, 1 << 11, 1 << 12)
    } else {
      (32, 1 << 31, 1 << 32)
    };
    let raw = self.r.read_bits(bits)? as i64;
    Ok(if raw > half { raw - full } else { raw })
  }

  fn read_value(&mut self) -> Result<f64, ZedisError> {
    if !self.r.read_bit()? {
      return Ok(f64::from_bits(self.prev_bits));
    }
    let bits = if !self.r.read_bit()? {
      let sig = 64u32
        .checked_sub(self.prev_leading as u32 + self.prev_trailing as u32)
        .filter(|s| *s > 0)
        .ok_or(ZedisError::CorruptChunk)?;
      let raw = self.r.read_bits(sig as u8)?;
      self.prev_bits ^ (raw << self.prev_trailing)
    } else {
      let leading = self.r.read_bits(5)? as u32;
      let sig_raw = self.r.read_bits(6)? as u32;
      let sig = if sig_raw == 0 { 64 } else { sig_raw };
      let trailing = 64u32
        .checked_sub(leading + sig)
        .ok_or(ZedisError::CorruptChunk)?;
      let raw = self.r.read_bits(sig as u8)?;
      self.prev_leading = leading as u8;
      self.prev_trailing = trailing as u8;
      self.prev_bits ^ (raw << trailing)
    };
    self.prev_bits = bits;
    Ok(f64::from_bits(bits))
  }
}

/// Encode a whole sample run into one self-contained chunk stream.
pub fn encode_samples(samples: &[Sample]) -> Vec<u8> {
  let mut enc = SeriesEncoder::new();
  for &sample in samples {
    enc.push(sample);
  }
  enc.finish()
}

/// Decode exactly `count` samples from a sealed chunk stream.
pub fn decode_samples(data: &[u8], count: u32) -> Result<Vec<Sample>, ZedisError> {
  let mut dec = SeriesDecoder::new(data, count);
  let mut out = Vec::with_capacity(count as usize);
  while let Some(sample) = dec.next_sample()? {
    out.push(sample);
  }
  Ok(out)
}
