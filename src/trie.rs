//! 16-ary prefix trie over the nibble alphabet.
//!
//! Nodes live in an arena and link to each other by index. Each node keeps
//! its parent index, its slot in the parent, and its live child count, which
//! is exactly what upward pruning needs after a delete.

use crate::error::Result;
use crate::util::{self, FANOUT};
use std::num::NonZeroU32;

type NodeId = u32;

/// The root always occupies slot 0 of the arena and is never recycled, so a
/// child link can never be 0.
const ROOT: NodeId = 0;

struct Node<V> {
  children: [Option<NonZeroU32>; FANOUT],
  parent: NodeId,
  /// Position of this node in its parent's `children`.
  slot: u8,
  /// Number of `Some` entries in `children`.
  child_count: u8,
  value: Option<V>,
}

impl<V> Node<V> {
  fn new(parent: NodeId, slot: u8) -> Self {
    Self {
      children: [None; FANOUT],
      parent,
      slot,
      child_count: 0,
      value: None,
    }
  }

  #[inline]
  fn is_leaf(&self) -> bool {
    self.child_count == 0
  }

  #[inline]
  fn child(&self, slot: u8) -> Option<NodeId> {
    self.children[slot as usize].map(NonZeroU32::get)
  }
}

/// A prefix trie keyed by strings over `0-9A-F`, storing one `V` per key.
pub struct PrefixTrie<V> {
  nodes: Vec<Node<V>>,
  free_list: Vec<NodeId>,
  len: usize,
}

impl<V> PrefixTrie<V> {
  pub fn new() -> Self {
    Self {
      nodes: vec![Node::new(ROOT, 0)],
      free_list: Vec::new(),
      len: 0,
    }
  }

  /// Number of keys holding a value.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Number of live nodes, root included.
  pub fn node_count(&self) -> usize {
    self.nodes.len() - self.free_list.len()
  }

  pub fn get(&self, key: &str) -> Option<&V> {
    let id = self.find(key)?;
    self.nodes[id as usize].value.as_ref()
  }

  pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
    let id = self.find(key)?;
    self.nodes[id as usize].value.as_mut()
  }

  /// Stores `value` under `key`, creating the path as needed.
  ///
  /// Returns `true` if the key had no value before, `false` on overwrite.
  pub fn put(&mut self, key: &str, value: V) -> Result<bool> {
    util::validate_key(key)?;

    let mut node = ROOT;
    for b in key.bytes() {
      // validated above
      let slot = util::slot_of(b).unwrap_or_default();
      node = match self.nodes[node as usize].child(slot) {
        Some(child) => child,
        None => self.attach(node, slot),
      };
    }

    let prev = self.nodes[node as usize].value.replace(value);
    if prev.is_none() {
      self.len += 1;
    }
    Ok(prev.is_none())
  }

  /// Clears the value under `key` and prunes every ancestor left without
  /// value and children.
  ///
  /// Returns `false` if the path for `key` does not exist.
  pub fn delete(&mut self, key: &str) -> bool {
    let Some(mut node) = self.find(key) else {
      return false;
    };
    if node == ROOT {
      return false;
    }

    if self.nodes[node as usize].value.take().is_some() {
      self.len -= 1;
    }

    while node != ROOT {
      let current = &self.nodes[node as usize];
      if current.value.is_some() || !current.is_leaf() {
        break;
      }

      let (parent, slot) = (current.parent, current.slot);
      self.release(node);

      let parent_node = &mut self.nodes[parent as usize];
      parent_node.children[slot as usize] = None;
      parent_node.child_count -= 1;
      node = parent;
    }

    true
  }

  /// Visits every stored `(key, value)` pair depth-first, parents before
  /// children and children in alphabet order. The first error returned by
  /// `visitor` aborts the walk.
  pub fn walk<F>(&self, mut visitor: F) -> Result<()>
  where
    F: FnMut(&str, &V) -> Result<()>,
  {
    let mut path = String::new();
    self.walk_from(ROOT, &mut path, &mut visitor)
  }

  /// Drops every node at once, leaving an empty root.
  ///
  /// Returns the number of keys released.
  pub fn free_all(&mut self) -> usize {
    let released = self.len;
    self.nodes.clear();
    self.nodes.shrink_to_fit();
    self.free_list.clear();
    self.free_list.shrink_to_fit();
    self.nodes.push(Node::new(ROOT, 0));
    self.len = 0;
    released
  }

  fn walk_from<F>(&self, root: NodeId, path: &mut String, visitor: &mut F) -> Result<()>
  where
    F: FnMut(&str, &V) -> Result<()>,
  {
    if let Some(value) = &self.nodes[root as usize].value {
      visitor(path.as_str(), value)?;
    }

    // One frame per node on the current path: (node, next slot to visit).
    // Depth is bounded by key length, so this stays off the call stack.
    let mut stack: Vec<(NodeId, u8)> = vec![(root, 0)];

    while let Some(frame) = stack.last_mut() {
      let (id, start) = *frame;
      let node = &self.nodes[id as usize];
      let next = (start..FANOUT as u8).find_map(|slot| node.child(slot).map(|child| (slot, child)));

      let Some((slot, child)) = next else {
        stack.pop();
        if stack.is_empty() {
          break;
        }
        path.pop();
        continue;
      };

      frame.1 = slot + 1;
      path.push(util::symbol_of(slot));
      if let Some(value) = &self.nodes[child as usize].value {
        visitor(path.as_str(), value)?;
      }
      stack.push((child, 0));
    }
    Ok(())
  }

  fn find(&self, key: &str) -> Option<NodeId> {
    let mut node = ROOT;
    for b in key.bytes() {
      let slot = util::slot_of(b)?;
      node = self.nodes[node as usize].child(slot)?;
    }
    Some(node)
  }

  fn attach(&mut self, parent: NodeId, slot: u8) -> NodeId {
    let fresh = Node::new(parent, slot);
    let id = match self.free_list.pop() {
      Some(id) => {
        self.nodes[id as usize] = fresh;
        id
      }
      None => {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(fresh);
        id
      }
    };

    let parent_node = &mut self.nodes[parent as usize];
    // Arena ids start at 1 for every non-root node.
    parent_node.children[slot as usize] = NonZeroU32::new(id);
    parent_node.child_count += 1;
    id
  }

  fn release(&mut self, id: NodeId) {
    let node = &mut self.nodes[id as usize];
    node.value = None;
    node.children = [None; FANOUT];
    node.child_count = 0;
    self.free_list.push(id);
  }
}

impl<V> Default for PrefixTrie<V> {
  fn default() -> Self {
    Self::new()
  }
}
