//! # Heap Substrate
//!
//! A simulated, contiguous, grow-only memory region. This is the only
//! place that owns bytes; everything above it works in **offsets** from
//! the region's low end rather than native pointers.
//!
//! ```text
//!   Simulated region:
//!
//!   lo = 0                                 hi               limit
//!   ┌──────────────────────────────────────┐ - - - - - - - - ┐
//!   │            in-use bytes              │   not yet grown
//!   └──────────────────────────────────────┘ - - - - - - - - ┘
//!                                          ▲
//!                                          │
//!                            extend(n) appends here and
//!                            returns the old `hi`
//! ```
//!
//! The region only grows. `extend` rounds its argument up to a multiple
//! of 8 and fails with [`OutOfMemory`] once the configured limit would
//! be exceeded, leaving the region untouched.
//!
//! Tag and link words are 4 bytes, encoded little-endian through
//! [`Heap::word`] / [`Heap::put_word`]; payload bytes go through the
//! slice accessors. No raw pointer ever escapes this module.

use std::{error, fmt};

/// Default ceiling for the simulated region: 20 MiB.
pub const MAX_HEAP: usize = 20 * (1 << 20);

/// The substrate refused to grow the region past its configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfMemory;

impl fmt::Display for OutOfMemory {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "simulated heap limit exceeded")
  }
}

impl error::Error for OutOfMemory {}

/// The simulated heap region `[lo, hi)`.
///
/// Owned by value so that several independent heaps (and thus several
/// allocators) can coexist in one process.
pub struct Heap {
  buf: Vec<u8>,
  limit: usize,
}

impl Heap {
  /// A region bounded by [`MAX_HEAP`].
  pub fn new() -> Self {
    Self::with_limit(MAX_HEAP)
  }

  /// A region bounded by `limit` bytes.
  pub fn with_limit(limit: usize) -> Self {
    Self {
      buf: Vec::new(),
      limit,
    }
  }

  /// Grows the region by `bytes` (rounded up to a multiple of 8) and
  /// returns the offset of the first newly added byte. New bytes are
  /// zeroed.
  pub fn extend(
    &mut self,
    bytes: usize,
  ) -> Result<usize, OutOfMemory> {
    let bytes = crate::align!(bytes);
    let old_hi = self.buf.len();
    let new_hi = old_hi.checked_add(bytes).ok_or(OutOfMemory)?;

    if new_hi > self.limit {
      return Err(OutOfMemory);
    }

    self.buf.resize(new_hi, 0);
    Ok(old_hi)
  }

  /// Low bound of the region. Always zero; kept for symmetry with `hi`.
  pub fn lo(&self) -> usize {
    0
  }

  /// Current high bound of the region (one past the last valid byte).
  pub fn hi(&self) -> usize {
    self.buf.len()
  }

  /// Decodes the little-endian word at `ofs`.
  pub fn word(&self, ofs: usize) -> u32 {
    u32::from_le_bytes([
      self.buf[ofs],
      self.buf[ofs + 1],
      self.buf[ofs + 2],
      self.buf[ofs + 3],
    ])
  }

  /// Encodes `val` little-endian at `ofs`.
  pub fn put_word(
    &mut self,
    ofs: usize,
    val: u32,
  ) {
    self.buf[ofs..ofs + 4].copy_from_slice(&val.to_le_bytes());
  }

  /// Payload bytes `[ofs, ofs + len)`.
  pub fn bytes(
    &self,
    ofs: usize,
    len: usize,
  ) -> &[u8] {
    &self.buf[ofs..ofs + len]
  }

  /// Mutable payload bytes `[ofs, ofs + len)`.
  pub fn bytes_mut(
    &mut self,
    ofs: usize,
    len: usize,
  ) -> &mut [u8] {
    &mut self.buf[ofs..ofs + len]
  }

  /// Moves `len` bytes from `src` to `dst`. The ranges may overlap.
  pub fn copy_within(
    &mut self,
    src: usize,
    dst: usize,
    len: usize,
  ) {
    self.buf.copy_within(src..src + len, dst);
  }
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extend_returns_old_high_bound_and_rounds_up() {
    let mut heap = Heap::new();

    assert_eq!(heap.extend(16), Ok(0));
    assert_eq!(heap.hi(), 16);

    // 13 rounds up to 16
    assert_eq!(heap.extend(13), Ok(16));
    assert_eq!(heap.hi(), 32);
  }

  #[test]
  fn extend_past_limit_fails_and_leaves_region_unchanged() {
    let mut heap = Heap::with_limit(64);

    assert_eq!(heap.extend(48), Ok(0));
    assert_eq!(heap.extend(24), Err(OutOfMemory));
    assert_eq!(heap.hi(), 48);

    // the remaining 16 bytes are still available
    assert_eq!(heap.extend(16), Ok(48));
  }

  #[test]
  fn words_round_trip_little_endian() {
    let mut heap = Heap::new();
    heap.extend(8).unwrap();

    heap.put_word(4, 0xDEAD_BEEF);
    assert_eq!(heap.word(4), 0xDEAD_BEEF);
    assert_eq!(heap.bytes(4, 4), &[0xEF, 0xBE, 0xAD, 0xDE]);
  }

  #[test]
  fn fresh_bytes_are_zeroed() {
    let mut heap = Heap::new();
    heap.extend(32).unwrap();

    assert!(heap.bytes(0, 32).iter().all(|&b| b == 0));
  }

  #[test]
  fn copy_within_handles_overlap() {
    let mut heap = Heap::new();
    heap.extend(16).unwrap();

    heap.bytes_mut(0, 8).copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    heap.copy_within(0, 4, 8);

    assert_eq!(heap.bytes(4, 8), &[1, 2, 3, 4, 5, 6, 7, 8]);
  }
}
