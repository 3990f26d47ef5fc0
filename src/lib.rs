//! # segalloc - A Segregated-List Memory Allocator
//!
//! This crate implements a classical dynamic storage allocator — init,
//! malloc, free, realloc — over a **simulated, grow-only heap region**
//! instead of a real program break. Blocks carry boundary tags on both
//! ends; free blocks are filed into size-segregated, size-ordered
//! doubly-linked lists threaded through their own payloads.
//!
//! ## Overview
//!
//! ```text
//!   Heap region (grows upward →, 20 MiB ceiling)
//!
//!   ┌──────────┬─────────┬───┬─────────┬───┬──────────────────┬───┐
//!   │ scaffold │ alloc   │ f │ alloc   │ f │      free        │ E │
//!   │ (heads,  │ block   │ r │ block   │ r │      block       │ p │
//!   │ prologue)│         │ e │         │ e │                  │ i │
//!   └──────────┴─────────┴─e─┴─────────┴─e─┴──────────────────┴───┘
//!        │          ▲      │                       ▲
//!        │          │      └── every block: header | payload | footer
//!        │     payload offsets (8-byte aligned) are what callers hold
//!        │
//!        └── thirteen size-class head words; free blocks of size s are
//!            filed under floor(log2 s), capped at class 12 (>= 4096 B)
//! ```
//!
//! Instead of native pointers, every address in the public API is a
//! **byte offset** into the owned region. Offset 0 can never be a
//! payload, so it serves as the null value ([`NULL`]). This keeps all
//! neighbor arithmetic in safe code and lets any number of independent
//! allocators coexist.
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - alignment constant and the align! macro
//!   ├── heap       - simulated grow-only heap substrate (word codec)
//!   ├── block      - boundary-tag encoding and neighbor arithmetic
//!   ├── seglist    - size-class index: ordered insert, O(1) detach
//!   ├── seg        - SegAllocator: malloc / free / realloc
//!   └── check      - structural audits of heap and free lists
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use segalloc::SegAllocator;
//!
//! let mut alloc = SegAllocator::new().expect("heap substrate refused to grow");
//!
//! let p = alloc.malloc(64).expect("out of memory");
//! alloc.payload_mut(p, 4).copy_from_slice(&[1, 2, 3, 4]);
//! assert_eq!(alloc.payload(p, 4), &[1, 2, 3, 4]);
//!
//! let p = alloc.realloc(p, 128).expect("out of memory");
//! assert_eq!(alloc.payload(p, 4), &[1, 2, 3, 4]);
//!
//! alloc.free(p);
//! ```
//!
//! ## Policies
//!
//! - **Fit**: search starts in the size class of the request and walks
//!   upward; classes are size-ordered, so the first hit is the best fit
//!   its class offers.
//! - **Split**: a remainder of at least 16 bytes is split off; requests
//!   under 96 bytes are carved from the low side of the chosen block,
//!   larger ones from the high side, which keeps small allocations
//!   clustered and free space contiguous.
//! - **Coalescing**: immediate, via boundary tags, on free and on heap
//!   extension.
//! - **Realloc**: grows in place by absorbing free neighbors when they
//!   cover the request; never splits the resulting block.
//!
//! ## Limitations
//!
//! - **Single-threaded**: one logical owner per allocator, no interior
//!   locking.
//! - **Fixed alignment**: payloads are 8-byte aligned, nothing else.
//! - **No shrinking**: the simulated region never returns memory.
//! - **Trusting**: invalid offsets, double frees and overruns are not
//!   detected at call time; the [`SegAllocator::check_heap`] and
//!   [`SegAllocator::check_list`] audits can catch the wreckage after
//!   the fact.

pub mod align;
mod block;
mod check;
mod heap;
mod seg;
mod seglist;

pub use block::NULL;
pub use heap::{Heap, MAX_HEAP, OutOfMemory};
pub use seg::SegAllocator;
