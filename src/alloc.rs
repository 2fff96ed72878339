use std::ptr;

use crate::{
  align::chunks_for,
  block::{BlockOffset, BlockState, FOOTER_BYTES, Header, OVERHEAD},
  heap::Heap,
  region::Region,
};

impl Region {
  /// Shrinks `block` to `size` payload bytes and turns the rest of it into a
  /// new available block directly above.
  ///
  /// ```text
  ///   before  ┌────┬──────────────────────────────────────┬────┐
  ///           │ H  │               old size               │ F  │
  ///           └────┴──────────────────────────────────────┴────┘
  ///   after   ┌────┬────────────┬────┐┌────┬──────────────┬────┐
  ///           │ H  │    size    │ F' ││ H' │  remainder   │ F  │
  ///           └────┴────────────┴────┘└────┴──────────────┴────┘
  /// ```
  ///
  /// The old footer `F` ends up as the footer of the new block. Returns the
  /// new block, or `None` without touching anything when `block` is smaller
  /// than `size + OVERHEAD`. Neither block is linked into any list.
  pub fn split_block(
    &mut self,
    block: BlockOffset,
    size: usize,
  ) -> Option<BlockOffset> {
    let header = self.header(block);
    let needed = size.checked_add(OVERHEAD)?;

    if header.size < needed {
      return None;
    }

    let old_foot = self.footer_of(block);

    self.set_header(block, Header::new(size, header.state));
    let new_foot = self.footer_of(block);
    self.set_footer_size(new_foot, size);

    let upper = BlockOffset(new_foot.0 + FOOTER_BYTES);
    let remainder = header.size - needed;
    self.set_header(upper, Header::new(remainder, BlockState::Available));
    self.set_footer_size(old_foot, remainder);

    Some(upper)
  }
}

impl Heap {
  /// First block of the available list with at least `size` payload bytes.
  pub fn find_first_avail(
    &self,
    size: usize,
  ) -> Option<BlockOffset> {
    self.avail.iter().find(|&block| {
      let header = self.region.header(block);
      header.state == BlockState::Available && header.size >= size
    })
  }

  /// Hands out a block of at least `size` bytes.
  ///
  /// Returns a pointer to the payload, or null when no available block is
  /// large enough. The heap is not grown; see
  /// [`allocate_or_grow`](Self::allocate_or_grow) for that.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    let Some(size) = self.config.request_bytes(size) else {
      return ptr::null_mut();
    };

    let Some(block) = self.find_first_avail(size) else {
      log::debug!("no available block holds {size} bytes");
      return ptr::null_mut();
    };

    let removed = self.avail.remove(block);
    debug_assert!(removed.is_some(), "first fit returned {block}, which is not available");

    let splittable = OVERHEAD
      .checked_add(self.config.min_split_remainder)
      .and_then(|extra| size.checked_add(extra))
      .is_some_and(|needed| self.region.header(block).size >= needed);

    if splittable {
      if let Some(rest) = self.region.split_block(block, size) {
        let remainder = self.region.header(rest).size;
        self.avail.add_front(rest, remainder);
        log::debug!("split {block}: {size} bytes kept, {remainder} bytes left at {rest}");
      }
    }

    let header = Header::new(self.region.header(block).size, BlockState::Used);
    self.region.set_header(block, header);
    self.used.add_front(block, header.size);

    let address = self.payload(block);
    log::debug!("allocated {} bytes at {:?}", header.size, address);

    address
  }

  /// Like [`allocate`](Self::allocate), but grows the heap by as many pages as
  /// a block of `size` bytes needs and retries once when nothing fits.
  pub fn allocate_or_grow(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    let address = self.allocate(size);
    if !address.is_null() {
      return address;
    }

    let Some(needed) = self.config.request_bytes(size).and_then(|size| size.checked_add(OVERHEAD)) else {
      return ptr::null_mut();
    };

    let pages = chunks_for(needed, self.config.page_bytes);
    if self.append_pages(pages).is_err() {
      return ptr::null_mut();
    }

    self.allocate(size)
  }
}

/// Prints one allocation together with the current end of the heap.
pub fn print_alloc(
  heap: &Heap,
  size: usize,
  address: *mut u8,
) {
  println!(
    "Allocated {} bytes, address = {:?}, heap end = {:?}",
    size,
    address,
    heap.heap_end()
  );
}
