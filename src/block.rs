use std::{fmt, mem};

/// State tag stored in every block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockState {
  Available = b'a',
  Used = b'u',
  Begin = b'B',
  End = b'E',
  Uninitialized = b'?',
}

impl BlockState {
  /// Decodes a raw tag. Anything unrecognised is `Uninitialized`.
  pub fn from_tag(tag: u8) -> Self {
    match tag {
      b'a' => Self::Available,
      b'u' => Self::Used,
      b'B' => Self::Begin,
      b'E' => Self::End,
      _ => Self::Uninitialized,
    }
  }

  pub fn tag(self) -> u8 {
    self as u8
  }
}

impl fmt::Display for BlockState {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{}", self.tag() as char)
  }
}

/// Header as it is laid out at the low address of a block.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct RawHeader {
  pub size: usize,
  pub tag: u8,
}

/// Footer as it is laid out at the high end of a block's payload.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct RawFooter {
  pub size: usize,
}

pub const HEADER_BYTES: usize = mem::size_of::<RawHeader>();
pub const FOOTER_BYTES: usize = mem::size_of::<RawFooter>();

/// Bytes of metadata each block carries besides its payload.
pub const OVERHEAD: usize = HEADER_BYTES + FOOTER_BYTES;

/// Decoded block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
  pub size: usize,
  pub state: BlockState,
}

impl Header {
  pub fn new(
    size: usize,
    state: BlockState,
  ) -> Self {
    Self { size, state }
  }

  /// Size of the whole block, metadata included.
  pub fn footprint(&self) -> usize {
    self.size + OVERHEAD
  }
}

impl From<RawHeader> for Header {
  fn from(raw: RawHeader) -> Self {
    Self::new(raw.size, BlockState::from_tag(raw.tag))
  }
}

impl From<Header> for RawHeader {
  fn from(header: Header) -> Self {
    Self {
      size: header.size,
      tag: header.state.tag(),
    }
  }
}

/// Byte offset of a block header from the start of the heap.
///
/// This is the identity of a block: both block lists key their records by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockOffset(pub(crate) usize);

impl BlockOffset {
  pub fn get(self) -> usize {
    self.0
  }

  /// Offset of the first payload byte.
  pub fn payload(self) -> usize {
    self.0 + HEADER_BYTES
  }
}

impl fmt::Display for BlockOffset {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "+{:#x}", self.0)
  }
}

/// Byte offset of a block footer from the start of the heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FootOffset(pub(crate) usize);

impl FootOffset {
  pub fn get(self) -> usize {
    self.0
  }
}
