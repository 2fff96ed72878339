//! Read-only views of the heap for debugging.
//!
//! The heap report looks like this:
//!
//! ```text
//! HEAP STATS (overhead per node: 24)
//! heap_start:  0x612000000000
//! heap_end:    0x612000001000
//! total_bytes: 4096
//! AVAILABLE LIST: {length:   1  bytes:  3976}
//!   [  0] head @ 0x612000000078 {state: a  size:  3952}
//! USED LIST: {length:   1  bytes:   120}
//!   [  0] head @ 0x612000000000 {state: u  size:    96}
//! HEAP BLOCKS:
//! [  0] @ 0x612000000000
//!   state:      u
//!   ...
//! ```

use std::fmt;

use crate::{
  block::{BlockOffset, BlockState, FOOTER_BYTES, FootOffset, HEADER_BYTES, OVERHEAD},
  heap::Heap,
  list::{BlockList, Node},
};

/// Everything known about one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  pub address: *const u8,
  pub state: BlockState,
  pub size: usize,
  /// List neighbours, if the block is linked into a list.
  pub prev: Option<Node>,
  pub next: Option<Node>,
  pub user: *const u8,
  pub footer: *const u8,
  pub footer_size: usize,
}

impl fmt::Display for BlockInfo {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let link = |node: Option<Node>| node.map_or_else(|| String::from("-"), |node| node.to_string());

    writeln!(f, "{:p}", self.address)?;
    writeln!(f, "  state:      {}", self.state)?;
    writeln!(f, "  size:       {} (total: {:#x})", self.size, self.size + OVERHEAD)?;
    writeln!(f, "  prev:       {}", link(self.prev))?;
    writeln!(f, "  next:       {}", link(self.next))?;
    writeln!(f, "  user:       {:p}", self.user)?;
    writeln!(f, "  foot:       {:p}", self.footer)?;
    writeln!(f, "  foot->size: {}", self.footer_size)
  }
}

/// Blocks in physical order, from the heap start up.
pub struct Walk<'a> {
  heap: &'a Heap,
  cursor: Option<BlockOffset>,
}

impl Iterator for Walk<'_> {
  type Item = BlockOffset;

  fn next(&mut self) -> Option<Self::Item> {
    let block = self.cursor?;
    self.cursor = self.heap.region.block_above(block);
    Some(block)
  }
}

impl Heap {
  /// Walks every block by physical adjacency.
  pub fn walk(&self) -> Walk<'_> {
    Walk {
      heap: self,
      cursor: Some(BlockOffset(0)),
    }
  }

  /// Details of `block`, or `None` when its header or footer would lie
  /// outside this heap.
  pub fn block_info(
    &self,
    block: BlockOffset,
  ) -> Option<BlockInfo> {
    if !self.region.contains(block.0, HEADER_BYTES) {
      return None;
    }

    let header = self.region.header(block);
    let foot = block.payload().checked_add(header.size).map(FootOffset)?;
    if !self.region.contains(foot.get(), FOOTER_BYTES) {
      return None;
    }

    let links = self.avail.links(block).or_else(|| self.used.links(block));

    Some(BlockInfo {
      address: self.region.address(block.0),
      state: header.state,
      size: header.size,
      prev: links.map(|(prev, _)| prev),
      next: links.map(|(_, next)| next),
      user: self.payload(block),
      footer: self.region.address(foot.get()),
      footer_size: self.region.footer_size(foot),
    })
  }

  /// Full text report of both lists and every block.
  pub fn report(&self) -> Report<'_> {
    Report { heap: self }
  }

  pub fn print_stats(&self) {
    print!("{}", self.report());
  }
}

/// Display adapter returned by [`Heap::report`].
pub struct Report<'a> {
  heap: &'a Heap,
}

impl Report<'_> {
  fn list(
    &self,
    f: &mut fmt::Formatter<'_>,
    list: &BlockList,
  ) -> fmt::Result {
    writeln!(f, "{}", list.summary())?;

    for (i, block) in list.iter().enumerate() {
      let header = self.heap.header(block);
      writeln!(
        f,
        "  [{:3}] head @ {:p} {{state: {}  size: {:5}}}",
        i,
        self.heap.region.address(block.0),
        header.state,
        header.size
      )?;
    }

    Ok(())
  }
}

impl fmt::Display for Report<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "HEAP STATS (overhead per node: {OVERHEAD})")?;
    writeln!(f, "heap_start:  {:p}", self.heap.heap_start())?;
    writeln!(f, "heap_end:    {:p}", self.heap.heap_end())?;
    writeln!(f, "total_bytes: {}", self.heap.heap_bytes())?;
    write!(f, "AVAILABLE LIST: ")?;
    self.list(f, self.heap.available())?;
    write!(f, "USED LIST: ")?;
    self.list(f, self.heap.used())?;
    writeln!(f, "HEAP BLOCKS:")?;

    for (i, block) in self.heap.walk().enumerate() {
      match self.heap.block_info(block) {
        Some(info) => write!(f, "[{i:3}] @ {info}")?,
        None => writeln!(f, "[{i:3}] @ {block} runs past the heap end")?,
      }
    }

    Ok(())
  }
}
