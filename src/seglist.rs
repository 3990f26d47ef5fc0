//! Size-segregated free-list index.
//!
//! Thirteen list heads (classes 0..=12) live in the scaffold at the low
//! end of the heap, one word per class at offset `4 * class`. Class `n`
//! holds free blocks whose size `s` satisfies `2^n <= s < 2^(n+1)`; the
//! last class is open-ended and takes everything of 4096 bytes and up.
//! The minimum block size of 16 means class 0..=3 stay empty forever
//! (the class-0 slot is physically the scaffold's padding word).
//!
//! Within a class, blocks are kept in ascending size order and doubly
//! linked through the two link words at the start of each free payload.
//! A head word is its own "next" field, so the head participates in the
//! list as a degenerate node whose prev side is never touched.

use crate::{
  block::{MAX_CLASS, NULL, WSIZE, get_next, get_prev, get_size, hdr, put_next, put_prev},
  heap::Heap,
};

/// Size class for a block of `size` bytes: the position of the highest
/// set bit, clamped to [`MAX_CLASS`].
pub(crate) fn class_of(size: usize) -> usize {
  debug_assert!(size >= 2);
  let n = (usize::BITS - 1 - size.leading_zeros()) as usize;
  n.min(MAX_CLASS)
}

/// Offset of the head word for `class`.
pub(crate) fn class_head(class: usize) -> usize {
  class * WSIZE
}

/// Splices `bp` into its size class, keeping the class ordered by
/// ascending size: walk from the head while candidates are smaller,
/// insert before the first candidate of equal or greater size.
pub(crate) fn insert(
  heap: &mut Heap,
  bp: usize,
) {
  let size = get_size(heap, hdr(bp));
  let mut prev = class_head(class_of(size));
  let mut next = get_next(heap, prev);

  while next != NULL && get_size(heap, hdr(next)) < size {
    prev = next;
    next = get_next(heap, next);
  }

  put_next(heap, prev, bp);
  put_prev(heap, bp, prev);
  put_next(heap, bp, next);
  if next != NULL {
    put_prev(heap, next, bp);
  }
}

/// Unlinks `bp` from whichever list holds it. O(1): the prev link of a
/// listed block is never null (the head counts as a node).
pub(crate) fn detach(
  heap: &mut Heap,
  bp: usize,
) {
  let next = get_next(heap, bp);
  let prev = get_prev(heap, bp);

  put_next(heap, prev, next);
  if next != NULL {
    put_prev(heap, next, prev);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::pack;

  /// Builds a bare heap holding the head words plus free blocks of the
  /// given sizes, unlinked. Returns their payload offsets.
  fn heap_with_blocks(sizes: &[usize]) -> (Heap, Vec<usize>) {
    let mut heap = Heap::new();
    heap.extend(72).unwrap();

    let mut bps = Vec::new();
    let mut at = 68;
    for &size in sizes {
      heap.extend(size).unwrap();
      heap.put_word(at, pack(size, false));
      heap.put_word(at + size - 4, pack(size, false));
      bps.push(at + 4);
      at += size;
    }
    (heap, bps)
  }

  #[test]
  fn classes_bucket_by_highest_bit() {
    assert_eq!(class_of(16), 4);
    assert_eq!(class_of(31), 4);
    assert_eq!(class_of(32), 5);
    assert_eq!(class_of(63), 5);
    assert_eq!(class_of(2048), 11);
    assert_eq!(class_of(4095), 11);
    assert_eq!(class_of(4096), 12);
    assert_eq!(class_of(1 << 20), 12);
  }

  #[test]
  fn insert_keeps_a_class_sorted_by_size() {
    let (mut heap, bps) = heap_with_blocks(&[48, 32, 40]);

    for &bp in &bps {
      insert(&mut heap, bp);
    }

    // all three land in class 5 (32..=63), smallest first
    let head = class_head(5);
    let first = get_next(&heap, head);
    let second = get_next(&heap, first);
    let third = get_next(&heap, second);

    assert_eq!(first, bps[1]); // 32
    assert_eq!(second, bps[2]); // 40
    assert_eq!(third, bps[0]); // 48
    assert_eq!(get_next(&heap, third), NULL);
    assert_eq!(get_prev(&heap, first), head);
  }

  #[test]
  fn insert_routes_to_distinct_classes() {
    let (mut heap, bps) = heap_with_blocks(&[16, 64, 4096]);

    for &bp in &bps {
      insert(&mut heap, bp);
    }

    assert_eq!(get_next(&heap, class_head(4)), bps[0]);
    assert_eq!(get_next(&heap, class_head(6)), bps[1]);
    assert_eq!(get_next(&heap, class_head(12)), bps[2]);
  }

  #[test]
  fn detach_head_middle_and_tail() {
    let (mut heap, bps) = heap_with_blocks(&[32, 40, 48]);

    for &bp in &bps {
      insert(&mut heap, bp);
    }
    let head = class_head(5);

    // middle
    detach(&mut heap, bps[1]);
    assert_eq!(get_next(&heap, head), bps[0]);
    assert_eq!(get_next(&heap, bps[0]), bps[2]);
    assert_eq!(get_prev(&heap, bps[2]), bps[0]);

    // head position
    detach(&mut heap, bps[0]);
    assert_eq!(get_next(&heap, head), bps[2]);
    assert_eq!(get_prev(&heap, bps[2]), head);

    // tail, leaving the class empty
    detach(&mut heap, bps[2]);
    assert_eq!(get_next(&heap, head), NULL);
  }
}
