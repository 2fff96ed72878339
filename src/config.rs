use crate::{
  block::OVERHEAD,
  error::HeapError,
};

/// Preferred address of the heap. Growth maps new pages directly above the
/// current end, so the heap should start somewhere with room above it.
#[cfg(target_pointer_width = "64")]
pub const DEFAULT_HEAP_START: usize = 0x0000_6120_0000_0000;
#[cfg(not(target_pointer_width = "64"))]
pub const DEFAULT_HEAP_START: usize = 0x4000_0000;

const FALLBACK_PAGE_BYTES: usize = 4096;

/// Size of an OS page, as reported by `sysconf(_SC_PAGESIZE)`.
pub fn system_page_bytes() -> usize {
  let bytes = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

  if bytes > 0 {
    bytes as usize
  } else {
    FALLBACK_PAGE_BYTES
  }
}

/// Settings consumed by [`Heap::init`](crate::Heap::init).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
  /// Address the heap is asked to start at.
  pub heap_start: usize,
  /// Granularity of heap growth.
  pub page_bytes: usize,
  /// Size of the heap right after initialization.
  pub initial_bytes: usize,
  /// Round every request up to the machine word so that headers, and the
  /// pointers handed out, stay naturally aligned.
  pub align_requests: bool,
  /// Payload bytes a remainder needs before it is split off as its own block.
  pub min_split_remainder: usize,
}

impl Default for HeapConfig {
  fn default() -> Self {
    let page_bytes = system_page_bytes();

    Self {
      heap_start: DEFAULT_HEAP_START,
      page_bytes,
      initial_bytes: page_bytes,
      align_requests: true,
      min_split_remainder: 0,
    }
  }
}

impl HeapConfig {
  pub fn with_heap_start(
    mut self,
    heap_start: usize,
  ) -> Self {
    self.heap_start = heap_start;
    self
  }

  pub fn with_initial_bytes(
    mut self,
    initial_bytes: usize,
  ) -> Self {
    self.initial_bytes = initial_bytes;
    self
  }

  /// Sizes the initial heap in pages. A count too large to express in bytes
  /// saturates, and [`validate`](Self::validate) rejects it.
  pub fn with_initial_pages(
    mut self,
    pages: usize,
  ) -> Self {
    self.initial_bytes = pages.saturating_mul(self.page_bytes);
    self
  }

  pub fn with_page_bytes(
    mut self,
    page_bytes: usize,
  ) -> Self {
    self.page_bytes = page_bytes;
    self
  }

  /// Hands out exactly the requested number of bytes, without word rounding.
  pub fn with_exact_sizes(mut self) -> Self {
    self.align_requests = false;
    self
  }

  pub fn with_min_split_remainder(
    mut self,
    min_split_remainder: usize,
  ) -> Self {
    self.min_split_remainder = min_split_remainder;
    self
  }

  /// Checks that a heap can be built from these settings.
  pub fn validate(&self) -> Result<(), HeapError> {
    if self.initial_bytes < OVERHEAD {
      return Err(HeapError::TooSmall {
        bytes: self.initial_bytes,
        overhead: OVERHEAD,
      });
    }

    let system = system_page_bytes();
    if self.page_bytes == 0 || self.page_bytes % system != 0 {
      return Err(HeapError::PageSize {
        page_bytes: self.page_bytes,
        system_page_bytes: system,
      });
    }

    if self.initial_bytes % self.page_bytes != 0 {
      return Err(HeapError::NotPageMultiple {
        bytes: self.initial_bytes,
        page_bytes: self.page_bytes,
      });
    }

    Ok(())
  }

  /// Request size after the rounding policy is applied.
  pub(crate) fn request_bytes(
    &self,
    size: usize,
  ) -> Option<usize> {
    if !self.align_requests {
      return Some(size);
    }

    size.checked_add(std::mem::size_of::<usize>() - 1).map(|_| crate::align!(size))
  }
}
