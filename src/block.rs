//! Block encoding: tag words, neighbor arithmetic, free-list links.
//!
//! A block is `header | payload | footer`. The header and footer are
//! identical 4-byte tag words: the size (a multiple of 8) in the upper
//! bits, the allocation flag in bit 0, bits 1..2 reserved. `bp` always
//! names the payload offset, never the header.
//!
//! ```text
//!          hdr(bp)   bp                         ftr(heap, bp)
//!             │      │                               │
//!             ▼      ▼                               ▼
//!   ──────┬──────┬──────┬─────────────────────┬──────┬──────
//!    ...  │ size │ next │ prev │   ...         │ size │  ...
//!         │  |a  │      │      │               │  |a  │
//!   ──────┴──────┴──────┴─────────────────────┴──────┴──────
//!                 └── link words, present only while free
//! ```

use crate::heap::Heap;

/// Word size in bytes.
pub(crate) const WSIZE: usize = 4;
/// Double word size in bytes.
pub(crate) const DSIZE: usize = 8;
/// Smallest legal block: header + two link words + footer.
pub(crate) const MIN_BLOCK: usize = 16;
/// Granularity of heap extension on an allocation miss.
pub(crate) const CHUNKSIZE: usize = 4096;
/// Highest size-class index.
pub(crate) const MAX_CLASS: usize = 12;
/// Requests below this are carved from the low side of a split,
/// requests at or above it from the high side.
pub(crate) const SPLIT_PIVOT: usize = 96;
/// Payload offset of the prologue block.
pub(crate) const PROLOGUE: usize = 14 * WSIZE;

/// The null block offset. Offset 0 is scaffold padding and can never be
/// a payload, so it doubles as the absent-link sentinel.
pub const NULL: usize = 0;

/// Composes a tag word from a block size and the allocation flag.
pub(crate) fn pack(
  size: usize,
  alloc: bool,
) -> u32 {
  size as u32 | alloc as u32
}

/// Size field of a tag word.
pub(crate) fn tag_size(tag: u32) -> usize {
  (tag & !0x7) as usize
}

/// Allocation flag of a tag word.
pub(crate) fn tag_alloc(tag: u32) -> bool {
  tag & 0x1 != 0
}

/// Size field of the tag word at `p`.
pub(crate) fn get_size(
  heap: &Heap,
  p: usize,
) -> usize {
  tag_size(heap.word(p))
}

/// Allocation flag of the tag word at `p`.
pub(crate) fn get_alloc(
  heap: &Heap,
  p: usize,
) -> bool {
  tag_alloc(heap.word(p))
}

/// Header offset of the block with payload `bp`.
pub(crate) fn hdr(bp: usize) -> usize {
  bp - WSIZE
}

/// Footer offset of the block with payload `bp`.
pub(crate) fn ftr(
  heap: &Heap,
  bp: usize,
) -> usize {
  bp + get_size(heap, hdr(bp)) - DSIZE
}

/// Payload offset of the next physical block.
pub(crate) fn next_blk(
  heap: &Heap,
  bp: usize,
) -> usize {
  bp + get_size(heap, hdr(bp))
}

/// Payload offset of the previous physical block, found through its
/// footer.
pub(crate) fn prev_blk(
  heap: &Heap,
  bp: usize,
) -> usize {
  bp - get_size(heap, bp - DSIZE)
}

/// "Next" link of a free block (first payload word). A size-class head
/// word is a valid argument: the head is a degenerate node consisting of
/// nothing but a next field.
pub(crate) fn get_next(
  heap: &Heap,
  bp: usize,
) -> usize {
  heap.word(bp) as usize
}

pub(crate) fn put_next(
  heap: &mut Heap,
  bp: usize,
  ptr: usize,
) {
  heap.put_word(bp, ptr as u32);
}

/// "Prev" link of a free block (second payload word). Never valid on a
/// size-class head.
pub(crate) fn get_prev(
  heap: &Heap,
  bp: usize,
) -> usize {
  heap.word(bp + WSIZE) as usize
}

pub(crate) fn put_prev(
  heap: &mut Heap,
  bp: usize,
  ptr: usize,
) {
  heap.put_word(bp + WSIZE, ptr as u32);
}

/// Block size needed to serve a payload request: tags added, rounded up
/// to alignment, clamped to the minimum block. `None` on arithmetic
/// overflow (a request no heap could ever satisfy).
pub(crate) fn aligned_block_size(size: usize) -> Option<usize> {
  let padded = size.checked_add(DSIZE + crate::align::ALIGNMENT - 1)?;
  Some((padded & !(crate::align::ALIGNMENT - 1)).max(MIN_BLOCK))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tag_words_pack_and_unpack() {
    let tag = pack(4096, true);
    assert_eq!(tag_size(tag), 4096);
    assert!(tag_alloc(tag));

    let tag = pack(24, false);
    assert_eq!(tag_size(tag), 24);
    assert!(!tag_alloc(tag));
  }

  #[test]
  fn size_mask_ignores_low_bits() {
    // reserved bits and the allocation flag never leak into the size
    assert_eq!(tag_size(pack(64, true) | 0x6), 64);
  }

  #[test]
  fn neighbor_arithmetic_walks_both_ways() {
    let mut heap = Heap::new();
    heap.extend(48).unwrap();

    // two adjacent blocks: 24 bytes at bp = 8, 16 bytes at bp = 32
    heap.put_word(4, pack(24, true));
    heap.put_word(24, pack(24, true));
    heap.put_word(28, pack(16, false));
    heap.put_word(40, pack(16, false));

    assert_eq!(ftr(&heap, 8), 24);
    assert_eq!(next_blk(&heap, 8), 32);
    assert_eq!(prev_blk(&heap, 32), 8);
    assert_eq!(ftr(&heap, 32), 40);
  }

  #[test]
  fn link_words_live_in_the_payload() {
    let mut heap = Heap::new();
    heap.extend(32).unwrap();

    put_next(&mut heap, 8, 0x18);
    put_prev(&mut heap, 8, 0x10);

    assert_eq!(get_next(&heap, 8), 0x18);
    assert_eq!(get_prev(&heap, 8), 0x10);
    assert_eq!(heap.word(8), 0x18);
    assert_eq!(heap.word(12), 0x10);
  }

  #[test]
  fn block_size_for_request() {
    assert_eq!(aligned_block_size(1), Some(16));
    assert_eq!(aligned_block_size(8), Some(16));
    assert_eq!(aligned_block_size(9), Some(24));
    assert_eq!(aligned_block_size(16), Some(24));
    assert_eq!(aligned_block_size(120), Some(128));
    assert_eq!(aligned_block_size(usize::MAX - 4), None);
  }
}
