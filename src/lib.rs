//! # tagalloc - An Explicit Free List Allocator
//!
//! This crate provides a single-threaded, user-space heap allocator that
//! manages one contiguous region mapped with `mmap(2)`. Blocks carry
//! **boundary tags** (a header and a footer recording their size), available
//! blocks are kept on an **explicit free list**, and the heap grows on demand
//! by mapping more pages right above its current end.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   heap_start                                                        heap_end
//!   ▼                                                                        ▼
//!   ┌──────────────┬──────────────────────┬──────────┬───────────────────────┐
//!   │  used  104   │    available  200    │ used  48 │    available  3600    │
//!   └──────────────┴──────────────────────┴──────────┴───────────────────────┘
//!                  ▲                                 ▲
//!                  └──────── available list ─────────┘
//!
//!   Every byte of the heap belongs to exactly one block.
//!   No two neighbouring blocks are ever both available.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   tagalloc
//!   ├── align      - Alignment macro (align!)
//!   ├── block      - Header/footer layout and block state tags
//!   ├── config     - HeapConfig
//!   ├── error      - HeapError
//!   ├── region     - The mapped bytes and raw header/footer access (internal)
//!   ├── geometry   - Physical neighbours of a block (internal)
//!   ├── list       - Available/used block lists
//!   ├── heap       - Heap: init, cleanup, growth
//!   ├── alloc      - First fit, split, allocate
//!   ├── free       - Free and coalescing
//!   ├── stats      - Read-only reports
//!   └── verify     - Invariant checker
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tagalloc::{Heap, HeapConfig};
//!
//! fn main() -> Result<(), tagalloc::HeapError> {
//!     let mut heap = Heap::init(HeapConfig::default())?;
//!
//!     let ptr = heap.allocate(64) as *mut u64;
//!     unsafe { *ptr = 42 };
//!
//!     heap.free(ptr as *mut u8);
//!     heap.print_stats();
//!     heap.cleanup();
//!     Ok(())
//! }
//! ```
//!
//! ## How It Works
//!
//! Each block is a header, the payload and a footer:
//!
//! ```text
//!   Single Block:
//!   ┌──────────────────┬──────────────────────────┬───────────────┐
//!   │  Block Header    │        User Data         │  Block Footer │
//!   │  ┌────────────┐  │                          │  ┌─────────┐  │
//!   │  │ size: N    │  │   N bytes usable         │  │ size: N │  │
//!   │  │ state: a/u │  │                          │  └─────────┘  │
//!   │  └────────────┘  │                          │               │
//!   └──────────────────┴──────────────────────────┴───────────────┘
//!                      ▲
//!                      └── Pointer returned to user
//! ```
//!
//! - **allocate** walks the available list front to back and takes the first
//!   block that is large enough. Whatever it does not need is split off as a
//!   new available block.
//! - **free** puts the block back on the available list and merges it with
//!   available neighbours. The neighbour above is found from the block's own
//!   size, the one below from the footer just under its header.
//! - **append_pages** maps pages at `heap_end` and merges them into the
//!   topmost block when that one is available.
//!
//! The free-list links are not stored in the heap. Each list keeps its own
//! records keyed by block offset, which lets `free` reject pointers that do
//! not name a block in use.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Heap` is neither `Send` nor `Sync`
//! - **Grows only**: memory goes back to the OS only when the heap is dropped
//! - **Word alignment only**: no support for larger alignments
//! - **Unix-only**: Requires `libc` and `mmap`
//!
//! ## Safety
//!
//! The heap API itself is safe. Writing through the returned pointers is not:
//! writing past a block's payload corrupts the footer and header around it.

pub mod align;
mod alloc;
mod block;
mod config;
mod error;
mod free;
mod geometry;
mod heap;
mod list;
mod region;
mod stats;
mod verify;

pub use alloc::print_alloc;
pub use block::{BlockOffset, BlockState, FOOTER_BYTES, FootOffset, HEADER_BYTES, Header, OVERHEAD};
pub use config::{DEFAULT_HEAP_START, HeapConfig, system_page_bytes};
pub use error::HeapError;
pub use heap::Heap;
pub use list::{BlockList, Iter, ListSummary, Node};
pub use stats::{BlockInfo, Report, Walk};
pub use verify::Violation;
