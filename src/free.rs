use crate::{
  block::{BlockOffset, BlockState, Header},
  heap::Heap,
};

impl Heap {
  /// Returns the block behind `ptr` to the available list and coalesces it
  /// with every available block around it.
  ///
  /// `ptr` must come from [`allocate`](Self::allocate) on this heap. Null is
  /// ignored. Anything else that does not name a block currently in use, such
  /// as a second free of the same pointer, is rejected and the heap is left
  /// unchanged.
  pub fn free(
    &mut self,
    ptr: *mut u8,
  ) {
    if ptr.is_null() {
      return;
    }

    let Some(block) = self.block_of(ptr) else {
      log::error!("free of {ptr:?}, which is outside the heap");
      return;
    };

    let Some(size) = self.used.remove(block) else {
      log::error!("free of {ptr:?}, which is not an allocated block");
      return;
    };

    self.region.set_header(block, Header::new(size, BlockState::Available));
    self.avail.add_front(block, size);
    log::debug!("freed {size} bytes at {ptr:?}");

    self.merge_with_above(block);
  }

  /// Coalesces `block` with the available blocks physically next to it.
  ///
  /// Starting from `block`, every available block directly above is absorbed.
  /// If the block below is available the same is repeated from there, so it
  /// takes in the block just grown. Each step either merges or moves one
  /// block down, so the loop ends after at most as many steps as the heap
  /// has blocks.
  pub(crate) fn merge_with_above(
    &mut self,
    block: BlockOffset,
  ) {
    let mut cursor = Some(block);

    while let Some(lower) = cursor {
      if self.region.header(lower).state != BlockState::Available {
        break;
      }

      while let Some(higher) = self.region.block_above(lower) {
        if self.region.header(higher).state != BlockState::Available {
          break;
        }

        self.merge_pair(lower, higher);
      }

      cursor = self
        .region
        .block_below(lower)
        .filter(|&below| self.region.header(below).state == BlockState::Available);
    }
  }

  /// Folds `higher` into `lower`, both available and physically adjacent.
  fn merge_pair(
    &mut self,
    lower: BlockOffset,
    higher: BlockOffset,
  ) {
    let higher_size = self.avail.remove(higher);
    let lower_size = self.avail.remove(lower);
    debug_assert!(higher_size.is_some() && lower_size.is_some());

    let size = self.region.header(lower).size + self.region.header(higher).footprint();
    self.region.set_header(lower, Header::new(size, BlockState::Available));
    let foot = self.region.footer_of(lower);
    self.region.set_footer_size(foot, size);

    self.avail.add_front(lower, size);
    log::debug!("merged {higher} into {lower}, now {size} bytes");
  }
}
