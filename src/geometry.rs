//! Locating neighbouring metadata by address arithmetic.
//!
//! ```text
//!      lower block                         block
//!   ┌────────┬─────────────┬────────┐┌────────┬──────────────┬────────┐
//!   │ header │   payload   │ footer ││ header │   payload    │ footer │
//!   └────────┴─────────────┴────────┘└────────┴──────────────┴────────┘
//!   ▲                       ▲        ▲                                  ▲
//!   │                       │        │                                  │
//!   block_below(block)      │        block                   block_above(block)
//!                           └── block - FOOTER_BYTES
//! ```
//!
//! Going up only needs the block's own size. Going down needs the size of the
//! block below, which is only recorded in its footer. There is no back link
//! anywhere else.

use crate::{
  block::{BlockOffset, FOOTER_BYTES, FootOffset, HEADER_BYTES, OVERHEAD},
  region::Region,
};

impl Region {
  /// Footer of `block`, located from the size in its header.
  pub fn footer_of(
    &self,
    block: BlockOffset,
  ) -> FootOffset {
    FootOffset(block.0 + HEADER_BYTES + self.header(block).size)
  }

  /// Header of the block owning `foot`, located from the size in the footer.
  /// `None` when that size points below the heap start.
  pub fn header_of(
    &self,
    foot: FootOffset,
  ) -> Option<BlockOffset> {
    let payload = foot.0.checked_sub(self.footer_size(foot))?;
    payload.checked_sub(HEADER_BYTES).map(BlockOffset)
  }

  /// The block that starts right after `block` ends, or `None` for the
  /// topmost block.
  pub fn block_above(
    &self,
    block: BlockOffset,
  ) -> Option<BlockOffset> {
    let footprint = self.header(block).size.checked_add(OVERHEAD)?;
    let higher = block.0.checked_add(footprint)?;
    (higher < self.bytes()).then_some(BlockOffset(higher))
  }

  /// The block that ends right before `block` starts, or `None` for the
  /// bottommost block.
  pub fn block_below(
    &self,
    block: BlockOffset,
  ) -> Option<BlockOffset> {
    if block.0 <= FOOTER_BYTES {
      return None;
    }

    self.header_of(FootOffset(block.0 - FOOTER_BYTES))
  }
}
