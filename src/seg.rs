//! # Segregated-List Allocator
//!
//! A dynamic storage allocator over the simulated heap substrate:
//! boundary-tagged blocks, thirteen size-segregated free lists kept in
//! ascending size order, immediate coalescing, and a split policy that
//! places small and large allocations on opposite sides of a carved
//! block.
//!
//! ## Heap Layout
//!
//! The low end of the heap is a fixed 16-word scaffold; everything after
//! it is a sequence of blocks closed off by the epilogue:
//!
//! ```text
//!    0        4                      52        56        60
//!    ┌────────┬──────────────────────┬─────────┬─────────┬─────────┬─
//!    │ padding│  class head words    │ prologue│ prologue│ block   │ ...
//!    │        │  (classes 1..=12)    │ header  │ footer  │ headers │
//!    └────────┴──────────────────────┴─────────┴─────────┴─────────┴─
//!                                              ▲                      ─┬────────┐
//!                                              │                       │epilogue│
//!                                        prologue bp = 56              │ header │
//!                                                                      └────────┘
//!                                                                      ▲
//!                                                              always at hi - 4
//! ```
//!
//! The prologue (an 8-byte allocated sentinel) and the epilogue (a
//! zero-size allocated header) make neighbor arithmetic total: walking
//! off either end of the block sequence lands on a sentinel, never
//! outside the region.
//!
//! ## Placement
//!
//! Always carving an allocation from the low side of a free block makes
//! workloads that alternate small and large requests shred the heap:
//!
//! ```text
//!    ┌─┬──────────┬─┬──────────┬─┬───────────┬─┬─────────┐
//!    │a│   free   │a│   free   │a│    free   │a│   free  │
//!    └─┴──────────┴─┴──────────┴─┴───────────┴─┴─────────┘
//! ```
//!
//! Splitting small requests off the low side and large requests off the
//! high side clusters the small blocks together and leaves the free
//! space contiguous instead:
//!
//! ```text
//!    ┌──┬──┬──┬──┬──┬──┬──────────┬────────────┬──────────┐
//!    │a │a │a │a │a │a │   free   │    free    │   free   │
//!    └──┴──┴──┴──┴──┴──┴──────────┴────────────┴──────────┘
//! ```
//!
//! The pivot between "small" and "large" is 96 bytes.
//!
//! ## Reallocation
//!
//! `realloc` prefers growing in place by absorbing a free neighbor over
//! relocating, and it never splits the block it ends up with: carving a
//! remainder off a buffer that keeps growing by a few bytes strands that
//! remainder as an unusable fragment between two versions of the same
//! object.

use log::trace;

use crate::{
  block::{
    CHUNKSIZE, DSIZE, MAX_CLASS, MIN_BLOCK, NULL, SPLIT_PIVOT, WSIZE, aligned_block_size, ftr,
    get_alloc, get_next, get_size, hdr, next_blk, pack, prev_blk,
  },
  heap::{Heap, MAX_HEAP, OutOfMemory},
  seglist,
};

/// A segregated-list allocator owning its simulated heap.
///
/// All block addresses handed out and taken back are byte offsets into
/// the heap region; [`NULL`] (offset 0) plays the role of the null
/// pointer. Payload offsets are always 8-byte aligned.
pub struct SegAllocator {
  pub(crate) heap: Heap,
}

impl SegAllocator {
  /// An allocator over a heap bounded by [`MAX_HEAP`].
  pub fn new() -> Result<Self, OutOfMemory> {
    Self::with_limit(MAX_HEAP)
  }

  /// An allocator over a heap bounded by `limit` bytes.
  ///
  /// Builds the scaffold (padding word, class head words, prologue,
  /// epilogue) and seeds the block sequence with one minimum-size free
  /// block. Fails if the limit cannot hold even that.
  pub fn with_limit(limit: usize) -> Result<Self, OutOfMemory> {
    let mut heap = Heap::with_limit(limit);
    heap.extend(16 * WSIZE)?;

    // the padding and class head words are already zero
    heap.put_word(13 * WSIZE, pack(DSIZE, true)); // prologue header
    heap.put_word(14 * WSIZE, pack(DSIZE, true)); // prologue footer
    heap.put_word(15 * WSIZE, pack(0, true)); // epilogue header

    let mut alloc = Self { heap };
    alloc.extend_heap(2 * DSIZE)?;
    Ok(alloc)
  }

  /// Allocates `size` bytes and returns the payload offset, or `None`
  /// when the request is zero-sized or the heap limit is exhausted. A
  /// failed request leaves the heap unchanged.
  pub fn malloc(
    &mut self,
    size: usize,
  ) -> Option<usize> {
    if size == 0 {
      return None;
    }
    let asize = aligned_block_size(size)?;

    if let Some(bp) = self.find_fit(asize) {
      seglist::detach(&mut self.heap, bp);
      let bp = self.place(bp, asize);
      trace!("malloc({size}) -> {bp:#x} [{asize}B block]");
      return Some(bp);
    }

    let bp = self.extend_heap(asize.max(CHUNKSIZE)).ok()?;
    seglist::detach(&mut self.heap, bp);
    let bp = self.place(bp, asize);
    trace!("malloc({size}) -> {bp:#x} [{asize}B block, heap extended]");
    Some(bp)
  }

  /// Returns the block at `bp` to the free pool, merging it with any
  /// free physical neighbor. `free(NULL)` is ignored.
  pub fn free(
    &mut self,
    bp: usize,
  ) {
    if bp == NULL {
      return;
    }

    let size = get_size(&self.heap, hdr(bp));
    self.heap.put_word(hdr(bp), pack(size, false));
    let f = ftr(&self.heap, bp);
    self.heap.put_word(f, pack(size, false));
    trace!("free({bp:#x}) [{size}B block]");

    let bp = self.coalesce(bp);
    seglist::insert(&mut self.heap, bp);
  }

  /// Resizes the allocation at `bp` to `size` bytes.
  ///
  /// `realloc(NULL, size)` behaves like `malloc(size)`; `realloc(bp, 0)`
  /// frees the block and returns `None`. Growth absorbs free neighbors
  /// in place when they cover the request, relocating (and copying the
  /// payload) only when they do not. Shrinking keeps the whole block and
  /// returns `bp` unchanged.
  pub fn realloc(
    &mut self,
    bp: usize,
    size: usize,
  ) -> Option<usize> {
    if bp == NULL {
      return if size == 0 { None } else { self.malloc(size) };
    }
    if size == 0 {
      self.free(bp);
      return None;
    }

    let old_size = get_size(&self.heap, hdr(bp));
    let asize = aligned_block_size(size)?;

    if asize <= old_size {
      // shrink or exact fit: keep the whole block
      self.realloc_place(bp);
      return Some(bp);
    }

    let prev = prev_blk(&self.heap, bp);
    let next = next_blk(&self.heap, bp);
    let prev_alloc = get_alloc(&self.heap, hdr(prev));
    let next_alloc = get_alloc(&self.heap, hdr(next));
    let mut reach = old_size;
    if !prev_alloc {
      reach += get_size(&self.heap, hdr(prev));
    }
    if !next_alloc {
      reach += get_size(&self.heap, hdr(next));
    }

    if asize > reach {
      // the neighbors cannot cover the growth: relocate
      let new_bp = self.malloc(asize)?;
      self
        .heap
        .copy_within(bp, new_bp, old_size - 2 * WSIZE);
      self.free(bp);
      trace!("realloc({bp:#x}, {size}) -> {new_bp:#x} [relocated]");
      return Some(new_bp);
    }

    if prev_alloc {
      // only the next block is absorbed: the payload stays put
      let bp = self.coalesce(bp);
      self.realloc_place(bp);
      trace!("realloc({bp:#x}, {size}) [absorbed next block]");
      return Some(bp);
    }

    // absorbing the previous block moves the base: coalesce reads the
    // neighbor links before the payload move overwrites them
    let new_bp = self.coalesce(bp);
    self
      .heap
      .copy_within(bp, new_bp, old_size.min(asize) - 2 * WSIZE);
    self.realloc_place(new_bp);
    trace!("realloc({bp:#x}, {size}) -> {new_bp:#x} [absorbed previous block]");
    Some(new_bp)
  }

  /// Caller-visible bytes of the block at `bp`.
  pub fn payload_size(&self, bp: usize) -> usize {
    get_size(&self.heap, hdr(bp)) - DSIZE
  }

  /// The first `len` payload bytes of the block at `bp`.
  pub fn payload(
    &self,
    bp: usize,
    len: usize,
  ) -> &[u8] {
    self.heap.bytes(bp, len)
  }

  /// Mutable view of the first `len` payload bytes of the block at `bp`.
  pub fn payload_mut(
    &mut self,
    bp: usize,
    len: usize,
  ) -> &mut [u8] {
    self.heap.bytes_mut(bp, len)
  }

  /// Current size of the underlying heap region in bytes.
  pub fn heap_size(&self) -> usize {
    self.heap.hi()
  }

  /// Grows the heap by `size` bytes (rounded up) and turns the new
  /// space into a free block, merged with a trailing free block if one
  /// exists and inserted into its size class. The word that used to be
  /// the epilogue becomes the new block's header.
  fn extend_heap(
    &mut self,
    size: usize,
  ) -> Result<usize, OutOfMemory> {
    let size = crate::align!(size);
    let bp = self.heap.extend(size)?;
    trace!("extend_heap: +{size}B, block at {bp:#x}");

    self.heap.put_word(hdr(bp), pack(size, false));
    let f = ftr(&self.heap, bp);
    self.heap.put_word(f, pack(size, false));
    let ep = hdr(next_blk(&self.heap, bp));
    self.heap.put_word(ep, pack(0, true)); // new epilogue header

    let bp = self.coalesce(bp);
    seglist::insert(&mut self.heap, bp);
    Ok(bp)
  }

  /// Finds a free block of at least `asize` bytes. Starts in the class
  /// the request maps to and walks upward; since classes are sorted by
  /// size, the first hit is the best fit its class can offer.
  fn find_fit(&self, asize: usize) -> Option<usize> {
    for class in seglist::class_of(asize)..=MAX_CLASS {
      let mut bp = get_next(&self.heap, seglist::class_head(class));
      while bp != NULL {
        if get_size(&self.heap, hdr(bp)) >= asize {
          return Some(bp);
        }
        bp = get_next(&self.heap, bp);
      }
    }
    None
  }

  /// Turns the detached free block at `bp` into an allocated block of
  /// `asize` bytes, splitting off the remainder when it is large enough
  /// to stand alone. Small allocations are carved from the low side,
  /// large ones from the high side; returns the allocated payload
  /// offset.
  fn place(
    &mut self,
    bp: usize,
    asize: usize,
  ) -> usize {
    let fsize = get_size(&self.heap, hdr(bp));

    if fsize - asize < MIN_BLOCK {
      // the remainder could not hold tags and links: consume whole
      self.heap.put_word(hdr(bp), pack(fsize, true));
      let f = ftr(&self.heap, bp);
      self.heap.put_word(f, pack(fsize, true));
      return bp;
    }

    if asize < SPLIT_PIVOT {
      // small request: allocated block on the low side
      self.heap.put_word(hdr(bp), pack(asize, true));
      let f = ftr(&self.heap, bp);
      self.heap.put_word(f, pack(asize, true));

      let rest = next_blk(&self.heap, bp);
      self.heap.put_word(hdr(rest), pack(fsize - asize, false));
      let rf = ftr(&self.heap, rest);
      self.heap.put_word(rf, pack(fsize - asize, false));
      seglist::insert(&mut self.heap, rest);
      bp
    } else {
      // large request: allocated block on the high side
      self.heap.put_word(hdr(bp), pack(fsize - asize, false));
      let f = ftr(&self.heap, bp);
      self.heap.put_word(f, pack(fsize - asize, false));

      let abp = next_blk(&self.heap, bp);
      self.heap.put_word(hdr(abp), pack(asize, true));
      let af = ftr(&self.heap, abp);
      self.heap.put_word(af, pack(asize, true));
      seglist::insert(&mut self.heap, bp);
      abp
    }
  }

  /// Realloc's placement: marks the whole block allocated, never
  /// splitting. See the module docs for why a remainder is not carved
  /// here.
  fn realloc_place(&mut self, bp: usize) {
    let size = get_size(&self.heap, hdr(bp));
    self.heap.put_word(hdr(bp), pack(size, true));
    let f = ftr(&self.heap, bp);
    self.heap.put_word(f, pack(size, true));
  }

  /// Merges the block at `bp` with whichever physical neighbors are
  /// free, detaching them from their lists, and rewrites the merged
  /// block's tags as free. The merged block is *not* inserted; the
  /// caller does that exactly once.
  fn coalesce(&mut self, bp: usize) -> usize {
    let prev = prev_blk(&self.heap, bp);
    let next = next_blk(&self.heap, bp);
    let prev_alloc = get_alloc(&self.heap, ftr(&self.heap, prev));
    let next_alloc = get_alloc(&self.heap, hdr(next));
    let mut size = get_size(&self.heap, hdr(bp));
    let mut bp = bp;

    if prev_alloc && next_alloc {
      // nothing to merge
    } else if prev_alloc && !next_alloc {
      seglist::detach(&mut self.heap, next);
      size += get_size(&self.heap, hdr(next));
    } else if !prev_alloc && next_alloc {
      seglist::detach(&mut self.heap, prev);
      size += get_size(&self.heap, hdr(prev));
      bp = prev;
    } else {
      seglist::detach(&mut self.heap, next);
      seglist::detach(&mut self.heap, prev);
      size += get_size(&self.heap, hdr(prev)) + get_size(&self.heap, hdr(next));
      bp = prev;
    }

    self.heap.put_word(hdr(bp), pack(size, false));
    let f = ftr(&self.heap, bp);
    self.heap.put_word(f, pack(size, false));
    bp
  }
}
