//! Consistency checks over the whole heap.

use std::fmt;

use crate::{
  block::{BlockOffset, BlockState, OVERHEAD},
  heap::Heap,
};

/// First broken heap invariant found by [`Heap::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
  /// The two lists do not account for every heap byte.
  Accounting { avail: usize, used: usize, heap: usize },
  /// A block runs past the end of the heap.
  Overrun { block: BlockOffset },
  /// The physical walk and the lists disagree on how many blocks exist.
  Coverage { walked: usize, listed: usize },
  FooterMismatch { block: BlockOffset, header: usize, footer: usize },
  /// Two physical neighbours are both available.
  AdjacentAvailable { lower: BlockOffset, upper: BlockOffset },
  /// A block's state does not match the list it is linked into.
  Membership { block: BlockOffset, state: BlockState },
  /// A list recorded a different size than the block's header holds.
  RecordedSize { block: BlockOffset, recorded: usize, header: usize },
}

impl fmt::Display for Violation {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::Accounting { avail, used, heap } => {
        write!(f, "available {avail} + used {used} bytes != heap {heap} bytes")
      }
      Self::Overrun { block } => write!(f, "block {block} runs past the heap end"),
      Self::Coverage { walked, listed } => {
        write!(f, "walked {walked} blocks but the lists hold {listed}")
      }
      Self::FooterMismatch { block, header, footer } => {
        write!(f, "block {block} has header size {header} but footer size {footer}")
      }
      Self::AdjacentAvailable { lower, upper } => {
        write!(f, "adjacent blocks {lower} and {upper} are both available")
      }
      Self::Membership { block, state } => {
        write!(f, "block {block} in state {state} is not in the matching list")
      }
      Self::RecordedSize { block, recorded, header } => {
        write!(f, "block {block} was linked with size {recorded} but its header says {header}")
      }
    }
  }
}

impl std::error::Error for Violation {}

impl Heap {
  /// Walks the heap and both lists and reports the first broken invariant.
  pub fn check(&self) -> Result<(), Violation> {
    let heap = self.heap_bytes();

    if self.avail.bytes() + self.used.bytes() != heap {
      return Err(Violation::Accounting {
        avail: self.avail.bytes(),
        used: self.used.bytes(),
        heap,
      });
    }

    let mut walked = 0;
    let mut previous: Option<(BlockOffset, BlockState)> = None;
    let mut cursor = Some(BlockOffset(0));

    while let Some(block) = cursor {
      let header = self.region.header(block);

      let end = block.0.checked_add(header.size).and_then(|end| end.checked_add(OVERHEAD));
      if end.is_none_or(|end| end > heap) {
        return Err(Violation::Overrun { block });
      }

      let footer = self.region.footer_size(self.region.footer_of(block));
      if footer != header.size {
        return Err(Violation::FooterMismatch {
          block,
          header: header.size,
          footer,
        });
      }

      let list = match header.state {
        BlockState::Available => &self.avail,
        BlockState::Used => &self.used,
        state => return Err(Violation::Membership { block, state }),
      };
      let Some(recorded) = list.recorded_size(block) else {
        return Err(Violation::Membership {
          block,
          state: header.state,
        });
      };
      if recorded != header.size {
        return Err(Violation::RecordedSize {
          block,
          recorded,
          header: header.size,
        });
      }

      if let Some((lower, BlockState::Available)) = previous {
        if header.state == BlockState::Available {
          return Err(Violation::AdjacentAvailable { lower, upper: block });
        }
      }

      walked += 1;
      previous = Some((block, header.state));
      cursor = self.region.block_above(block);
    }

    let listed = self.avail.len() + self.used.len();
    if walked != listed {
      return Err(Violation::Coverage { walked, listed });
    }

    Ok(())
  }
}
