//! Sentinel-bounded doubly linked block lists.
//!
//! The links are not threaded through the heap. Each list keeps an arena of
//! records keyed by block offset, so membership can be checked without
//! trusting anything written in heap memory.
//!
//! ```text
//!   ┌───────┐   ┌──────────┐   ┌──────────┐   ┌─────┐
//!   │ begin │ → │ +0x1a0   │ → │ +0x0     │ → │ end │
//!   │       │ ← │ size 104 │ ← │ size 400 │ ← │     │
//!   └───────┘   └──────────┘   └──────────┘   └─────┘
//! ```

use std::{collections::HashMap, fmt};

use crate::block::{BlockOffset, OVERHEAD};

/// A position in a block list: one of the two sentinels or a member block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Node {
  Begin,
  End,
  Block(BlockOffset),
}

impl fmt::Display for Node {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Node::Begin => f.write_str("begin"),
      Node::End => f.write_str("end"),
      Node::Block(block) => write!(f, "{block}"),
    }
  }
}

#[derive(Clone, Copy, Debug)]
struct Record {
  prev: Node,
  next: Node,
  size: usize,
}

/// Count and byte total of a list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListSummary {
  pub length: usize,
  pub bytes: usize,
}

impl fmt::Display for ListSummary {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{{length: {:3}  bytes: {:5}}}", self.length, self.bytes)
  }
}

#[derive(Debug)]
pub struct BlockList {
  first: Node,
  last: Node,
  records: HashMap<BlockOffset, Record>,
  length: usize,
  bytes: usize,
}

impl Default for BlockList {
  fn default() -> Self {
    Self::new()
  }
}

impl BlockList {
  /// An empty list: `begin` links straight to `end`.
  pub fn new() -> Self {
    Self {
      first: Node::End,
      last: Node::Begin,
      records: HashMap::new(),
      length: 0,
      bytes: 0,
    }
  }

  /// A list holding exactly `block`, built without going through
  /// [`add_front`](Self::add_front).
  pub(crate) fn seeded(
    block: BlockOffset,
    size: usize,
  ) -> Self {
    let mut list = Self::new();

    list.records.insert(
      block,
      Record {
        prev: Node::Begin,
        next: Node::End,
        size,
      },
    );
    list.first = Node::Block(block);
    list.last = Node::Block(block);
    list.length = 1;
    list.bytes = size + OVERHEAD;

    list
  }

  pub fn len(&self) -> usize {
    self.length
  }

  pub fn is_empty(&self) -> bool {
    self.length == 0
  }

  /// Sum of `size + OVERHEAD` over every member.
  pub fn bytes(&self) -> usize {
    self.bytes
  }

  pub fn summary(&self) -> ListSummary {
    ListSummary {
      length: self.length,
      bytes: self.bytes,
    }
  }

  pub fn contains(
    &self,
    block: BlockOffset,
  ) -> bool {
    self.records.contains_key(&block)
  }

  /// Payload size `block` had when it was linked.
  pub fn recorded_size(
    &self,
    block: BlockOffset,
  ) -> Option<usize> {
    self.records.get(&block).map(|record| record.size)
  }

  /// `(prev, next)` of a member.
  pub fn links(
    &self,
    block: BlockOffset,
  ) -> Option<(Node, Node)> {
    self.records.get(&block).map(|record| (record.prev, record.next))
  }

  /// Points `lower.next` at `upper` and `upper.prev` at `lower`.
  fn join(
    &mut self,
    lower: Node,
    upper: Node,
  ) {
    match lower {
      Node::Begin => self.first = upper,
      Node::Block(block) => {
        if let Some(record) = self.records.get_mut(&block) {
          record.next = upper;
        }
      }
      Node::End => {}
    }

    match upper {
      Node::End => self.last = lower,
      Node::Block(block) => {
        if let Some(record) = self.records.get_mut(&block) {
          record.prev = lower;
        }
      }
      Node::Begin => {}
    }
  }

  /// Links `block` right after `begin`. Does not look at or change the
  /// block's state.
  pub fn add_front(
    &mut self,
    block: BlockOffset,
    size: usize,
  ) {
    debug_assert!(!self.contains(block), "block {block} is already linked");

    let next = self.first;
    self.records.insert(
      block,
      Record {
        prev: Node::Begin,
        next,
        size,
      },
    );
    self.join(Node::Begin, Node::Block(block));
    self.join(Node::Block(block), next);

    self.length += 1;
    self.bytes += size + OVERHEAD;
  }

  /// Unlinks `block` and returns the size it was linked with.
  ///
  /// Returns `None`, leaving the list untouched, when `block` is not a member.
  pub fn remove(
    &mut self,
    block: BlockOffset,
  ) -> Option<usize> {
    let record = self.records.remove(&block)?;
    self.join(record.prev, record.next);

    self.length -= 1;
    self.bytes -= record.size + OVERHEAD;

    Some(record.size)
  }

  /// Members from front to back.
  pub fn iter(&self) -> Iter<'_> {
    Iter {
      list: self,
      cursor: self.first,
    }
  }
}

pub struct Iter<'a> {
  list: &'a BlockList,
  cursor: Node,
}

impl Iterator for Iter<'_> {
  type Item = BlockOffset;

  fn next(&mut self) -> Option<Self::Item> {
    let Node::Block(block) = self.cursor else {
      return None;
    };

    self.cursor = self.list.records.get(&block).map_or(Node::End, |record| record.next);
    Some(block)
  }
}

impl<'a> IntoIterator for &'a BlockList {
  type Item = BlockOffset;
  type IntoIter = Iter<'a>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

#[cfg(test)]
mod tests {
  use test_log::test;

  use super::*;

  fn members(list: &BlockList) -> Vec<usize> {
    list.iter().map(BlockOffset::get).collect()
  }

  /// Walks from `end` back to `begin` through the `prev` links.
  fn members_backwards(list: &BlockList) -> Vec<usize> {
    let mut out = Vec::new();
    let mut cursor = list.last;

    while let Node::Block(block) = cursor {
      out.push(block.get());
      cursor = list.links(block).unwrap().0;
    }

    out
  }

  #[test]
  fn test_new_list_is_empty() {
    let list = BlockList::new();

    assert!(list.is_empty());
    assert_eq!(0, list.bytes());
    assert_eq!(Node::End, list.first);
    assert_eq!(Node::Begin, list.last);
    assert_eq!(None, list.iter().next());
  }

  #[test]
  fn test_add_front_orders_newest_first() {
    let mut list = BlockList::new();

    list.add_front(BlockOffset(0), 100);
    list.add_front(BlockOffset(200), 50);
    list.add_front(BlockOffset(400), 0);

    assert_eq!(vec![400, 200, 0], members(&list));
    assert_eq!(vec![0, 200, 400], members_backwards(&list));
    assert_eq!(3, list.len());
    assert_eq!(150 + 3 * OVERHEAD, list.bytes());
    assert_eq!(Some((Node::Begin, Node::Block(BlockOffset(200)))), list.links(BlockOffset(400)));
    assert_eq!(Some((Node::Block(BlockOffset(200)), Node::End)), list.links(BlockOffset(0)));
  }

  #[test]
  fn test_remove_relinks_neighbours() {
    let mut list = BlockList::new();

    list.add_front(BlockOffset(0), 100);
    list.add_front(BlockOffset(200), 50);
    list.add_front(BlockOffset(400), 0);

    assert_eq!(Some(50), list.remove(BlockOffset(200)));
    assert_eq!(vec![400, 0], members(&list));
    assert_eq!(vec![0, 400], members_backwards(&list));

    assert_eq!(Some(0), list.remove(BlockOffset(400)));
    assert_eq!(Some(100), list.remove(BlockOffset(0)));
    assert!(list.is_empty());
    assert_eq!(0, list.bytes());
    assert_eq!(Node::End, list.first);
    assert_eq!(Node::Begin, list.last);
  }

  #[test]
  fn test_remove_non_member_is_rejected() {
    let mut list = BlockList::new();
    list.add_front(BlockOffset(0), 100);

    assert_eq!(None, list.remove(BlockOffset(8)));
    assert_eq!(1, list.len());
    assert_eq!(100 + OVERHEAD, list.bytes());
  }

  #[test]
  fn test_seeded_matches_add_front() {
    let seeded = BlockList::seeded(BlockOffset(0), 4072);
    let mut added = BlockList::new();
    added.add_front(BlockOffset(0), 4072);

    assert_eq!(added.summary(), seeded.summary());
    assert_eq!(added.links(BlockOffset(0)), seeded.links(BlockOffset(0)));
    assert_eq!(members(&added), members(&seeded));
  }

  #[test]
  fn test_sentinels_and_summary_display() {
    assert_eq!("begin", Node::Begin.to_string());
    assert_eq!("end", Node::End.to_string());
    assert_eq!("+0x1a0", Node::Block(BlockOffset(0x1a0)).to_string());

    let summary = ListSummary { length: 2, bytes: 3400 };
    assert_eq!("{length:   2  bytes:  3400}", summary.to_string());
  }
}
