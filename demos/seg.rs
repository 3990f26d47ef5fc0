//! Walk-through of the segregated-list allocator.
//!
//! Run with logging to watch the allocator's internal moves:
//!
//! ```text
//! RUST_LOG=trace cargo run --example seg
//! ```

use segalloc::{NULL, SegAllocator};

fn banner(step: &str) {
  println!("\n==== {step} ====");
}

fn main() {
  env_logger::init();

  let mut alloc = SegAllocator::new().expect("heap substrate refused to grow");
  println!("fresh heap: {} bytes", alloc.heap_size());

  // --------------------------------------------------------------------
  // 1) A few allocations of mixed sizes. Small blocks are carved from
  //    the low side of free space, large ones from the high side.
  // --------------------------------------------------------------------
  banner("1) allocate 24, 512 and 64 bytes");
  let a = alloc.malloc(24).expect("out of memory");
  let b = alloc.malloc(512).expect("out of memory");
  let c = alloc.malloc(64).expect("out of memory");
  println!("a = {a:#x} (small, low side)");
  println!("b = {b:#x} (large, high side)");
  println!("c = {c:#x} (small, next to a)");
  println!("heap now: {} bytes", alloc.heap_size());

  // --------------------------------------------------------------------
  // 2) The payloads are ordinary byte ranges.
  // --------------------------------------------------------------------
  banner("2) write and read payloads");
  alloc.payload_mut(a, 4).copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
  println!("a[0..4] = {:02X?}", alloc.payload(a, 4));

  // --------------------------------------------------------------------
  // 3) Free the middle allocation and grow its neighbor into the hole.
  //    The growth happens in place: the payload does not move.
  // --------------------------------------------------------------------
  banner("3) free b, grow c");
  alloc.free(b);
  alloc.payload_mut(c, 8).copy_from_slice(b"PAYLOAD!");
  let c2 = alloc.realloc(c, 2000).expect("out of memory");
  println!("c grew from 64 to 2000 bytes, moved: {}", c2 != c);
  println!("c[0..8] = {:?}", std::str::from_utf8(alloc.payload(c2, 8)).unwrap());

  // --------------------------------------------------------------------
  // 4) realloc's edge cases mirror free and malloc.
  // --------------------------------------------------------------------
  banner("4) realloc edge cases");
  let d = alloc.realloc(NULL, 100).expect("out of memory");
  println!("realloc(NULL, 100) allocated d = {d:#x}");
  assert!(alloc.realloc(d, 0).is_none());
  println!("realloc(d, 0) freed it again");

  // --------------------------------------------------------------------
  // 5) The audits confirm the structure is intact.
  // --------------------------------------------------------------------
  banner("5) audit");
  let heap_errors = alloc.check_heap(false);
  let list_errors = alloc.check_list(false);
  println!("heap audit: {heap_errors} violations, list audit: {list_errors} violations");

  alloc.free(a);
  alloc.free(c2);
  println!("\nall blocks returned; final heap size {} bytes", alloc.heap_size());
}
