/// Rounds `value` up to a multiple of `to`, which must be a power of two.
///
/// With a single argument the value is rounded up to the machine word, which
/// is the natural alignment of a block header.
///
/// # Examples
///
/// ```rust
/// use tagalloc::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
///
/// assert_eq!(align!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align!($value, ::core::mem::size_of::<usize>())
  };
  ($value:expr, $to:expr) => {
    ($value + $to - 1) & !($to - 1)
  };
}

/// Number of `unit`-sized chunks needed to hold `bytes`.
pub(crate) fn chunks_for(
  bytes: usize,
  unit: usize,
) -> usize {
  bytes.div_ceil(unit)
}

#[cfg(test)]
mod tests {
  use std::mem;

  use test_log::test;

  use super::chunks_for;

  #[test]
  fn test_align_to_word() {
    let word = mem::size_of::<usize>();

    for i in 0..10 {
      let sizes = (word * i + 1)..=(word * (i + 1));
      let expected = word * (i + 1);

      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }

    assert_eq!(0, align!(0usize));
  }

  #[test]
  fn test_align_to_page() {
    assert_eq!(4096, align!(1usize, 4096));
    assert_eq!(4096, align!(4096usize, 4096));
    assert_eq!(8192, align!(4097usize, 4096));
  }

  #[test]
  fn test_chunks_for() {
    assert_eq!(0, chunks_for(0, 4096));
    assert_eq!(1, chunks_for(1, 4096));
    assert_eq!(1, chunks_for(4096, 4096));
    assert_eq!(2, chunks_for(4097, 4096));
  }
}
