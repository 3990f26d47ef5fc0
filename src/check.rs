//! Structural audits of the heap and the free lists.
//!
//! Read-only, never on an allocation path. Each audit returns the
//! number of violations it found and reports every one through the
//! logging facade, so a zero return means the structure is sound.

use log::{debug, error};

use crate::{
  block::{
    DSIZE, MAX_CLASS, NULL, PROLOGUE, ftr, get_alloc, get_next, get_prev, get_size, hdr, next_blk,
    prev_blk,
  },
  seg::SegAllocator,
  seglist,
};

impl SegAllocator {
  /// Audits the physical block sequence: prologue and epilogue tags,
  /// per-block alignment and tag agreement, and the absence of adjacent
  /// free blocks. With `verbose`, logs every block on the way.
  pub fn check_heap(&self, verbose: bool) -> usize {
    let heap = &self.heap;
    let mut errors = 0;

    if get_size(heap, hdr(PROLOGUE)) != DSIZE || !get_alloc(heap, hdr(PROLOGUE)) {
      error!("bad prologue header");
      errors += 1;
    }
    if get_size(heap, ftr(heap, PROLOGUE)) != DSIZE || !get_alloc(heap, ftr(heap, PROLOGUE)) {
      error!("bad prologue footer");
      errors += 1;
    }

    let mut bp = PROLOGUE;
    while get_size(heap, hdr(bp)) > 0 {
      if verbose {
        self.print_block(bp);
      }
      errors += self.check_block(bp);
      bp = next_blk(heap, bp);
    }

    if get_size(heap, hdr(bp)) != 0 || !get_alloc(heap, hdr(bp)) {
      error!("bad epilogue header");
      errors += 1;
    }
    if bp != heap.hi() {
      error!("epilogue is not at the end of the heap");
      errors += 1;
    }

    errors
  }

  /// Audits the free lists: link symmetry, ascending size order, class
  /// membership, no allocated block on any list, and agreement between
  /// the listed blocks and the free blocks the physical walk sees.
  pub fn check_list(&self, verbose: bool) -> usize {
    let heap = &self.heap;
    let mut errors = 0;
    let mut listed = 0usize;

    for class in 1..=MAX_CLASS {
      if verbose {
        if class == MAX_CLASS {
          debug!("size class {class}: {} and up", 1usize << class);
        } else {
          debug!("size class {class}: {} ~ {}", 1usize << class, (1usize << (class + 1)) - 1);
        }
      }

      let mut prev = seglist::class_head(class);
      let mut bp = get_next(heap, prev);
      while bp != NULL {
        if verbose {
          self.print_list_node(bp);
        }
        listed += 1;

        if get_prev(heap, bp) != prev {
          error!("{bp:#x}: prev link does not point back");
          errors += 1;
        }
        let next = get_next(heap, bp);
        if next != NULL {
          if get_prev(heap, next) != bp {
            error!("{bp:#x}: next node's prev link is broken");
            errors += 1;
          }
          if get_size(heap, hdr(bp)) > get_size(heap, hdr(next)) {
            error!("{bp:#x}: size order violated within the class");
            errors += 1;
          }
        }
        if get_alloc(heap, hdr(bp)) || get_alloc(heap, ftr(heap, bp)) {
          error!("{bp:#x}: allocated block on a free list");
          errors += 1;
        }
        if seglist::class_of(get_size(heap, hdr(bp))) != class {
          error!("{bp:#x}: block filed in the wrong size class");
          errors += 1;
        }

        prev = bp;
        bp = next;
      }
    }

    // every free block sits on exactly one list
    let mut free_blocks = 0usize;
    let mut bp = next_blk(heap, PROLOGUE);
    while get_size(heap, hdr(bp)) > 0 {
      if !get_alloc(heap, hdr(bp)) {
        free_blocks += 1;
      }
      bp = next_blk(heap, bp);
    }
    if free_blocks != listed {
      error!("{free_blocks} free blocks in the heap but {listed} on the lists");
      errors += 1;
    }

    errors
  }

  fn check_block(&self, bp: usize) -> usize {
    let heap = &self.heap;
    let mut errors = 0;

    if bp % 8 != 0 {
      error!("{bp:#x}: payload is not doubleword aligned");
      errors += 1;
    }
    if heap.word(hdr(bp)) != heap.word(ftr(heap, bp)) {
      error!("{bp:#x}: header does not match footer");
      errors += 1;
    }
    if !get_alloc(heap, hdr(bp))
      && (!get_alloc(heap, hdr(prev_blk(heap, bp))) || !get_alloc(heap, hdr(next_blk(heap, bp))))
    {
      error!("{bp:#x}: contiguous free blocks");
      errors += 1;
    }

    errors
  }

  fn print_block(&self, bp: usize) {
    let heap = &self.heap;
    debug!(
      "{bp:#x}: header: [{}/{}] footer: [{}/{}]",
      get_size(heap, hdr(bp)),
      if get_alloc(heap, hdr(bp)) { 'a' } else { 'f' },
      get_size(heap, ftr(heap, bp)),
      if get_alloc(heap, ftr(heap, bp)) { 'a' } else { 'f' },
    );
  }

  fn print_list_node(&self, bp: usize) {
    let heap = &self.heap;
    debug!(
      "{bp:#x}: header: [{}/{}] prev: [{:#x}] next: [{:#x}]",
      get_size(heap, hdr(bp)),
      if get_alloc(heap, hdr(bp)) { 'a' } else { 'f' },
      get_prev(heap, bp),
      get_next(heap, bp),
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::pack;

  #[test]
  fn fresh_allocator_audits_clean() {
    let alloc = SegAllocator::new().unwrap();
    assert_eq!(alloc.check_heap(false), 0);
    assert_eq!(alloc.check_list(false), 0);
  }

  #[test]
  fn audits_stay_clean_through_a_workout() {
    let mut alloc = SegAllocator::new().unwrap();

    let p = alloc.malloc(32).unwrap();
    let q = alloc.malloc(500).unwrap();
    let r = alloc.malloc(7).unwrap();
    alloc.free(q);
    let q2 = alloc.realloc(r, 900).unwrap();
    alloc.free(p);

    assert_eq!(alloc.check_heap(false), 0);
    assert_eq!(alloc.check_list(false), 0);
    let _ = q2;
  }

  #[test]
  fn mismatched_footer_is_reported() {
    let mut alloc = SegAllocator::new().unwrap();

    let p = alloc.malloc(40).unwrap();
    let f = ftr(&alloc.heap, p);
    alloc.heap.put_word(f, pack(8, true));

    assert!(alloc.check_heap(false) > 0);
  }

  #[test]
  fn allocated_block_on_a_list_is_reported() {
    let mut alloc = SegAllocator::new().unwrap();

    let p = alloc.malloc(40).unwrap();
    alloc.free(p);
    // flip the allocation bit without detaching
    let size = get_size(&alloc.heap, hdr(p));
    alloc.heap.put_word(hdr(p), pack(size, true));
    let f = ftr(&alloc.heap, p);
    alloc.heap.put_word(f, pack(size, true));

    assert!(alloc.check_list(false) > 0);
  }
}
