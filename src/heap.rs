use crate::{
  block::{BlockOffset, BlockState, FootOffset, HEADER_BYTES, Header, OVERHEAD},
  config::HeapConfig,
  error::HeapError,
  list::BlockList,
  region::Region,
};

/// The heap control structure.
///
/// Owns the mapped region and the two block lists. Every block of the region
/// is linked into exactly one of `avail` or `used`, the one matching the state
/// in its header.
pub struct Heap {
  pub(crate) region: Region,
  pub(crate) avail: BlockList,
  pub(crate) used: BlockList,
  pub(crate) config: HeapConfig,
}

impl Heap {
  /// Maps the initial heap and makes all of it one available block.
  pub fn init(config: HeapConfig) -> Result<Self, HeapError> {
    config.validate()?;

    let region = Region::map(config.heap_start, config.initial_bytes)?;
    let heap = Self::install(region, config);

    log::info!(
      "heap initialized at {:?}..{:?} ({} bytes, overhead per block {})",
      heap.heap_start(),
      heap.heap_end(),
      heap.heap_bytes(),
      OVERHEAD
    );

    Ok(heap)
  }

  /// Builds a heap over memory the caller already owns.
  ///
  /// Such a heap cannot grow, and its memory is left alone on drop.
  ///
  /// # Safety
  ///
  /// `start` must be valid for reads and writes of `bytes` bytes for the
  /// whole life of the heap, and nothing else may touch that memory meanwhile.
  pub unsafe fn from_raw_parts(
    start: *mut u8,
    bytes: usize,
    config: HeapConfig,
  ) -> Result<Self, HeapError> {
    if bytes < OVERHEAD {
      return Err(HeapError::TooSmall {
        bytes,
        overhead: OVERHEAD,
      });
    }

    let region = unsafe { Region::from_raw_parts(start, bytes) };
    Ok(Self::install(region, config))
  }

  /// Lays a single available block over the whole of `region`.
  fn install(
    mut region: Region,
    config: HeapConfig,
  ) -> Self {
    let block = BlockOffset(0);
    let size = region.bytes() - OVERHEAD;

    region.set_header(block, Header::new(size, BlockState::Available));
    region.set_footer_size(FootOffset(HEADER_BYTES + size), size);

    Self {
      region,
      avail: BlockList::seeded(block, size),
      used: BlockList::new(),
      config,
    }
  }

  /// Releases the heap mapping. Dropping the heap does the same.
  pub fn cleanup(self) {
    log::info!(
      "releasing heap at {:?} ({} bytes, {} blocks still in use)",
      self.heap_start(),
      self.heap_bytes(),
      self.used.len()
    );
  }

  /// Grows the heap by `pages` pages mapped directly above its current end.
  ///
  /// The new space becomes an available block, merged with the block below
  /// it when that one is available too.
  pub fn append_pages(
    &mut self,
    pages: usize,
  ) -> Result<(), HeapError> {
    let failed = || {
      log::error!("Unable to mmap() additional {pages} pages");
      HeapError::Growth { pages }
    };

    let new_bytes = match pages.checked_mul(self.config.page_bytes) {
      Some(bytes) if bytes >= OVERHEAD => bytes,
      _ => return Err(failed()),
    };

    let block = BlockOffset(self.region.bytes());
    if let Err(errno) = self.region.extend(new_bytes) {
      log::debug!("mmap() at {:?} failed (errno {errno})", self.heap_end());
      return Err(failed());
    }

    let size = new_bytes - OVERHEAD;
    self.region.set_header(block, Header::new(size, BlockState::Available));
    self.region.set_footer_size(FootOffset(block.payload() + size), size);
    self.avail.add_front(block, size);

    log::debug!("appended {pages} pages, heap now {} bytes", self.heap_bytes());

    match self.region.block_below(block) {
      Some(below) if self.region.header(below).state == BlockState::Available => self.merge_with_above(below),
      _ => {}
    }

    Ok(())
  }

  pub fn heap_start(&self) -> *mut u8 {
    self.region.start()
  }

  /// One past the last heap byte.
  pub fn heap_end(&self) -> *mut u8 {
    self.region.end()
  }

  pub fn heap_bytes(&self) -> usize {
    self.region.bytes()
  }

  pub fn available(&self) -> &BlockList {
    &self.avail
  }

  pub fn used(&self) -> &BlockList {
    &self.used
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  /// Decoded header of `block`.
  ///
  /// # Panics
  ///
  /// If the header would lie outside the heap. Use
  /// [`block_info`](Self::block_info) for offsets of unknown origin.
  pub fn header(
    &self,
    block: BlockOffset,
  ) -> Header {
    self.region.header(block)
  }

  /// Block owning the payload pointer `ptr`, if `ptr` lies inside the heap.
  pub fn block_of(
    &self,
    ptr: *const u8,
  ) -> Option<BlockOffset> {
    let payload = self.region.offset_of(ptr)?;
    payload.checked_sub(HEADER_BYTES).map(BlockOffset)
  }

  /// Payload pointer handed out for `block`.
  pub fn payload(
    &self,
    block: BlockOffset,
  ) -> *mut u8 {
    self.region.address(block.payload())
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use test_log::test;

  use super::*;
  use crate::config::DEFAULT_HEAP_START;

  /// Config with a preferred address no other test asks for, so parallel
  /// tests that grow their heap do not run into each other.
  pub(crate) fn isolated_config(slot: usize) -> HeapConfig {
    HeapConfig::default().with_heap_start(DEFAULT_HEAP_START + (slot + 1) * 0x1_0000_0000)
  }

  #[test]
  fn test_init_installs_one_available_block() {
    let heap = Heap::init(HeapConfig::default().with_initial_pages(2)).unwrap();
    let bytes = heap.heap_bytes();

    assert_eq!(2 * heap.config().page_bytes, bytes);
    assert_eq!(heap.heap_end(), heap.heap_start().wrapping_add(bytes));
    assert_eq!(1, heap.available().len());
    assert_eq!(bytes, heap.available().bytes());
    assert!(heap.used().is_empty());

    let block = heap.available().iter().next().unwrap();
    assert_eq!(BlockOffset(0), block);
    assert_eq!(Header::new(bytes - OVERHEAD, BlockState::Available), heap.header(block));
    assert_eq!(bytes - OVERHEAD, heap.region.footer_size(heap.region.footer_of(block)));
    assert_eq!(Ok(()), heap.check());

    heap.cleanup();
  }

  #[test]
  fn test_init_rejects_heap_smaller_than_overhead() {
    let result = Heap::init(HeapConfig::default().with_initial_bytes(OVERHEAD - 1));

    assert!(matches!(result, Err(HeapError::TooSmall { .. })));
  }

  #[test]
  fn test_init_prefers_configured_address() {
    let config = isolated_config(0);
    let heap = Heap::init(config.clone()).unwrap();

    assert_eq!(config.heap_start, heap.heap_start() as usize);
  }

  #[test]
  fn test_append_pages_extends_heap() {
    let mut heap = Heap::init(isolated_config(1)).unwrap();
    let page = heap.config().page_bytes;

    // Occupy the whole initial block so the new pages cannot merge.
    let ptr = heap.allocate(page - OVERHEAD);
    assert!(!ptr.is_null());
    assert!(heap.available().is_empty());

    heap.append_pages(3).unwrap();

    assert_eq!(4 * page, heap.heap_bytes());
    assert_eq!(1, heap.available().len());
    let block = heap.available().iter().next().unwrap();
    assert_eq!(BlockOffset(page), block);
    assert_eq!(3 * page - OVERHEAD, heap.header(block).size);
    assert_eq!(Ok(()), heap.check());
  }

  #[test]
  fn test_append_pages_merges_with_available_block_below() {
    let mut heap = Heap::init(isolated_config(2)).unwrap();
    let page = heap.config().page_bytes;

    heap.append_pages(1).unwrap();

    assert_eq!(2 * page, heap.heap_bytes());
    assert_eq!(1, heap.available().len());
    assert_eq!(2 * page - OVERHEAD, heap.header(BlockOffset(0)).size);
    assert_eq!(Ok(()), heap.check());
  }

  #[test]
  fn test_append_pages_fails_when_end_is_taken() {
    let mut heap = Heap::init(isolated_config(3)).unwrap();
    let page = heap.config().page_bytes;

    // Someone else's page right above the heap.
    let blocker = Region::map(heap.heap_end() as usize, page).unwrap();
    assert_eq!(heap.heap_end(), blocker.start());

    assert_eq!(Err(HeapError::Growth { pages: 2 }), heap.append_pages(2));
    assert_eq!(page, heap.heap_bytes());
    assert_eq!(1, heap.available().len());
    assert_eq!(Ok(()), heap.check());

    drop(blocker);
  }

  #[test]
  fn test_repeated_growth_stays_contiguous() {
    let mut heap = Heap::init(isolated_config(5)).unwrap();
    let page = heap.config().page_bytes;

    heap.append_pages(1).unwrap();
    heap.append_pages(1).unwrap();
    heap.append_pages(2).unwrap();

    assert_eq!(5 * page, heap.heap_bytes());
    assert_eq!(1, heap.available().len());
    assert_eq!(5 * page - OVERHEAD, heap.header(BlockOffset(0)).size);
    assert_eq!(Ok(()), heap.check());
  }

  #[test]
  fn test_init_rejects_growth_unit_below_os_page() {
    let page = crate::config::system_page_bytes();
    let config = isolated_config(6).with_page_bytes(page / 2);

    assert!(matches!(Heap::init(config), Err(HeapError::PageSize { .. })));
  }

  #[test]
  fn test_append_zero_pages_fails() {
    let mut heap = Heap::init(isolated_config(4)).unwrap();

    assert_eq!(Err(HeapError::Growth { pages: 0 }), heap.append_pages(0));
    assert_eq!(Ok(()), heap.check());
  }

  #[test]
  fn test_heap_over_borrowed_memory() {
    let mut words = vec![0u64; 64];
    let bytes = words.len() * 8;
    let mut heap =
      unsafe { Heap::from_raw_parts(words.as_mut_ptr() as *mut u8, bytes, HeapConfig::default()) }.unwrap();

    assert_eq!(bytes - OVERHEAD, heap.header(BlockOffset(0)).size);
    assert!(!heap.allocate(100).is_null());
    assert!(heap.allocate(bytes).is_null());
    assert!(heap.append_pages(1).is_err());
    assert_eq!(Ok(()), heap.check());

    drop(heap);
    drop(words);
  }

  #[test]
  fn test_heap_over_tiny_memory_is_rejected() {
    let mut words = [0u64; 2];

    let result = unsafe { Heap::from_raw_parts(words.as_mut_ptr() as *mut u8, 16, HeapConfig::default()) };

    assert!(matches!(result, Err(HeapError::TooSmall { bytes: 16, .. })));
  }

  #[test]
  fn test_block_of_payload() {
    let mut heap = Heap::init(HeapConfig::default()).unwrap();
    let ptr = heap.allocate(32);
    let block = heap.block_of(ptr).unwrap();

    assert_eq!(ptr, heap.payload(block));
    assert_eq!(None, heap.block_of(heap.heap_end()));
    assert_eq!(None, heap.block_of(heap.heap_start()));
  }
}
