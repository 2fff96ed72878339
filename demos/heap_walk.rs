use std::io::Read;

use tagalloc::{Heap, HeapConfig, print_alloc};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect the mapping with tools like `pmap` or
/// `gdb` between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  env_logger::init();

  // Exact sizes so the block sizes below match the requests byte for byte.
  let mut heap = Heap::init(HeapConfig::default().with_exact_sizes())?;

  println!("[start] PID = {}", std::process::id());
  heap.print_stats();
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Three allocations, carved one after the other from the single
  //    available block.
  // --------------------------------------------------------------------
  let sizes = [100, 200, 50];
  let mut blocks = Vec::new();

  for size in sizes {
    let address = heap.allocate(size);
    print_alloc(&heap, size, address);
    blocks.push(address);
  }

  unsafe { std::ptr::write_bytes(blocks[1], 0xAB, sizes[1]) };
  println!("\n[1] Allocated {sizes:?}, filled the second block with 0xAB");
  heap.print_stats();
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Free the middle block. Its neighbours are in use, so it stays on
  //    its own at the front of the available list.
  // --------------------------------------------------------------------
  heap.free(blocks[1]);
  println!("\n[2] Freed block at {:?}", blocks[1]);
  heap.print_stats();
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) First fit reuses the freed block and splits what is left over.
  // --------------------------------------------------------------------
  let reused = heap.allocate(150);
  print_alloc(&heap, 150, reused);
  println!(
    "[3] reused the freed block? {}",
    if reused == blocks[1] { "Yes" } else { "No" }
  );
  heap.print_stats();
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Too large for the heap: grow it by whole pages and retry.
  // --------------------------------------------------------------------
  let big = 3 * heap.config().page_bytes;
  println!("\n[4] allocate({big}) without growth = {:?}", heap.allocate(big));
  let address = heap.allocate_or_grow(big);
  print_alloc(&heap, big, address);
  heap.print_stats();
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Free everything. The heap collapses back into one available block.
  // --------------------------------------------------------------------
  for address in [blocks[0], reused, blocks[2], address] {
    heap.free(address);
  }

  println!("\n[5] Freed everything");
  heap.print_stats();
  heap.check()?;
  heap.cleanup();

  Ok(())
}
