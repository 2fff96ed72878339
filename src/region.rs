//! The bytes backing the heap.
//!
//! A [`Region`] knows where the heap starts and how many bytes it spans, and
//! it is the only place that touches those bytes. Every header and footer
//! access is bounds checked against the region and performed unaligned, so a
//! corrupted size can at worst trip an assertion, never read outside the
//! mapping.

use std::{io, mem::size_of, ptr};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};

use crate::{
  block::{BlockOffset, FootOffset, Header, RawFooter, RawHeader},
  error::HeapError,
};

#[cfg(target_os = "linux")]
const MAP_EXACT: libc::c_int = libc::MAP_FIXED_NOREPLACE;
#[cfg(not(target_os = "linux"))]
const MAP_EXACT: libc::c_int = 0;

/// Who releases the bytes once the region goes away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Backing {
  /// Anonymous mapping owned by the region; unmapped on drop.
  Mapped,
  /// Memory owned by someone else.
  Borrowed,
}

#[derive(Debug)]
pub(crate) struct Region {
  start: *mut u8,
  bytes: usize,
  backing: Backing,
}

/// Asks the OS for `bytes` of anonymous read/write memory near `hint`.
///
/// Returns the address the OS picked, which may differ from `hint`.
unsafe fn map_anonymous(
  hint: usize,
  bytes: usize,
  extra_flags: libc::c_int,
) -> Result<*mut u8, i32> {
  let address = unsafe {
    mmap(
      hint as *mut c_void,
      bytes,
      PROT_READ | PROT_WRITE,
      MAP_PRIVATE | MAP_ANONYMOUS | extra_flags,
      -1,
      0,
    )
  };

  if address == MAP_FAILED {
    return Err(io::Error::last_os_error().raw_os_error().unwrap_or(0));
  }

  Ok(address as *mut u8)
}

impl Region {
  /// Maps a fresh region of `bytes`, preferably starting at `hint`.
  pub fn map(
    hint: usize,
    bytes: usize,
  ) -> Result<Self, HeapError> {
    let start = unsafe { map_anonymous(hint, bytes, 0) }.map_err(|errno| HeapError::Map { bytes, errno })?;

    if start as usize != hint {
      log::warn!(
        "heap mapped at {:?} instead of {:#x}; growth may not be contiguous",
        start,
        hint
      );
    }

    Ok(Self {
      start,
      bytes,
      backing: Backing::Mapped,
    })
  }

  /// Wraps memory the caller owns.
  ///
  /// # Safety
  ///
  /// `start` must be valid for reads and writes of `bytes` bytes for as long
  /// as the region is alive, and nothing else may access that memory
  /// meanwhile.
  pub unsafe fn from_raw_parts(
    start: *mut u8,
    bytes: usize,
  ) -> Self {
    Self {
      start,
      bytes,
      backing: Backing::Borrowed,
    }
  }

  /// Maps `bytes` more directly above the current end.
  ///
  /// A mapping the OS placed anywhere else is released again and reported as
  /// a failure; on failure the region is unchanged. Borrowed memory never
  /// grows.
  pub fn extend(
    &mut self,
    bytes: usize,
  ) -> Result<(), i32> {
    if self.backing == Backing::Borrowed {
      return Err(0);
    }

    let end = self.end() as usize;
    let address = unsafe { map_anonymous(end, bytes, MAP_EXACT) }?;

    if address as usize != end {
      unsafe { munmap(address as *mut c_void, bytes) };
      return Err(0);
    }

    self.bytes += bytes;
    Ok(())
  }

  pub fn start(&self) -> *mut u8 {
    self.start
  }

  /// One past the last byte of the region.
  pub fn end(&self) -> *mut u8 {
    self.start.wrapping_add(self.bytes)
  }

  pub fn bytes(&self) -> usize {
    self.bytes
  }

  /// Absolute address of the byte at `offset`.
  pub fn address(
    &self,
    offset: usize,
  ) -> *mut u8 {
    self.start.wrapping_add(offset)
  }

  /// Offset of `address` inside the region, if it lies inside.
  pub fn offset_of(
    &self,
    address: *const u8,
  ) -> Option<usize> {
    let offset = (address as usize).checked_sub(self.start as usize)?;
    (offset < self.bytes).then_some(offset)
  }

  /// Whether `len` bytes starting at `offset` lie inside the region.
  pub fn contains(
    &self,
    offset: usize,
    len: usize,
  ) -> bool {
    offset.checked_add(len).is_some_and(|end| end <= self.bytes)
  }

  fn check(
    &self,
    offset: usize,
    len: usize,
  ) {
    assert!(
      self.contains(offset, len),
      "access of {len} bytes at offset {offset:#x} outside a heap of {:#x} bytes",
      self.bytes
    );
  }

  pub fn header(
    &self,
    block: BlockOffset,
  ) -> Header {
    self.check(block.0, size_of::<RawHeader>());
    let raw = unsafe { ptr::read_unaligned(self.address(block.0) as *const RawHeader) };
    raw.into()
  }

  pub fn set_header(
    &mut self,
    block: BlockOffset,
    header: Header,
  ) {
    self.check(block.0, size_of::<RawHeader>());
    unsafe { ptr::write_unaligned(self.address(block.0) as *mut RawHeader, header.into()) };
  }

  pub fn footer_size(
    &self,
    foot: FootOffset,
  ) -> usize {
    self.check(foot.0, size_of::<RawFooter>());
    unsafe { ptr::read_unaligned(self.address(foot.0) as *const RawFooter) }.size
  }

  pub fn set_footer_size(
    &mut self,
    foot: FootOffset,
    size: usize,
  ) {
    self.check(foot.0, size_of::<RawFooter>());
    unsafe { ptr::write_unaligned(self.address(foot.0) as *mut RawFooter, RawFooter { size }) };
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    if self.backing == Backing::Mapped {
      unsafe { munmap(self.start as *mut c_void, self.bytes) };
    }
  }
}

/// Word-aligned scratch memory for exercising layout code without `mmap`.
#[cfg(test)]
pub(crate) struct Scratch {
  words: Vec<u64>,
}

#[cfg(test)]
impl Scratch {
  pub fn new(bytes: usize) -> Self {
    Self {
      words: vec![0; bytes.div_ceil(8)],
    }
  }

  pub fn region(&mut self) -> Region {
    let bytes = self.words.len() * 8;
    unsafe { Region::from_raw_parts(self.words.as_mut_ptr() as *mut u8, bytes) }
  }
}
