use std::{error, fmt};

/// Errors reported by heap initialization and growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  /// The requested heap cannot hold even one block's metadata.
  TooSmall { bytes: usize, overhead: usize },
  /// The requested heap does not end on a page boundary, so it could never
  /// be grown contiguously.
  NotPageMultiple { bytes: usize, page_bytes: usize },
  /// The growth unit is not a whole number of OS pages, so pages mapped on
  /// growth would not line up with the heap end.
  PageSize { page_bytes: usize, system_page_bytes: usize },
  /// The OS refused the initial mapping.
  Map { bytes: usize, errno: i32 },
  /// Additional pages could not be mapped directly above the heap.
  Growth { pages: usize },
}

impl fmt::Display for HeapError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::TooSmall { bytes, overhead } => {
        write!(f, "heap size {bytes} too small for a block overhead {overhead}")
      }
      Self::NotPageMultiple { bytes, page_bytes } => {
        write!(f, "heap size {bytes} is not a multiple of the page size {page_bytes}")
      }
      Self::PageSize {
        page_bytes,
        system_page_bytes,
      } => {
        write!(f, "page size {page_bytes} is not a multiple of the OS page size {system_page_bytes}")
      }
      Self::Map { bytes, errno } => {
        write!(f, "unable to mmap() {bytes} heap bytes (errno {errno})")
      }
      Self::Growth { pages } => write!(f, "unable to mmap() additional {pages} pages"),
    }
  }
}

impl error::Error for HeapError {}

#[cfg(test)]
mod tests {
  use test_log::test;

  use super::*;

  #[test]
  fn test_messages() {
    assert_eq!(
      "heap size 8 too small for a block overhead 24",
      HeapError::TooSmall { bytes: 8, overhead: 24 }.to_string()
    );
    assert_eq!(
      "unable to mmap() additional 3 pages",
      HeapError::Growth { pages: 3 }.to_string()
    );
    assert_eq!(
      "page size 2048 is not a multiple of the OS page size 4096",
      HeapError::PageSize {
        page_bytes: 2048,
        system_page_bytes: 4096
      }
      .to_string()
    );
  }
}
