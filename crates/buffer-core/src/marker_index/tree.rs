//! Node arena and treap rotations for the marker index.
//!
//! Each node stores its position relative to its nearest *left ancestor* (the closest ancestor
//! whose right subtree contains the node), so shifting everything after a point only touches one
//! node. Besides the ids of markers starting or ending at the node, every node caches two sets:
//!
//! - `left_marker_ids`: markers spanning from the left ancestor's position to this node.
//! - `right_marker_ids`: markers starting in `(left ancestor, node]` and spanning to the right
//!   ancestor's position.
//!
//! Rotations rewrite both the relative extents and these cached sets.

use super::MarkerId;
use crate::point::Point;
use std::collections::HashSet;
use std::ops::{Index, IndexMut};

pub(crate) type NodeId = usize;

/// Priority of a node that has not been placed in the heap order yet.
pub(crate) const UNASSIGNED_PRIORITY: u32 = 0;

#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) left_extent: Point,
    pub(crate) left_marker_ids: HashSet<MarkerId>,
    pub(crate) right_marker_ids: HashSet<MarkerId>,
    pub(crate) start_marker_ids: HashSet<MarkerId>,
    pub(crate) end_marker_ids: HashSet<MarkerId>,
    pub(crate) priority: u32,
}

impl Node {
    pub(crate) fn is_marker_endpoint(&self) -> bool {
        !self.start_marker_ids.is_empty() || !self.end_marker_ids.is_empty()
    }
}

/// Arena-backed treap. Lower priorities sit closer to the root.
#[derive(Debug, Clone, Default)]
pub(crate) struct MarkerTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    pub(crate) root: Option<NodeId>,
}

impl Index<NodeId> for MarkerTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for MarkerTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}

impl MarkerTree {
    pub(crate) fn alloc(&mut self, parent: Option<NodeId>, left_extent: Point) -> NodeId {
        let node = Node {
            parent,
            left_extent,
            ..Node::default()
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id] = Node::default();
        self.free.push(id);
    }

    /// Number of live nodes.
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Absolute position of `id`, summing left extents up to the root.
    pub(crate) fn node_position(&self, id: NodeId) -> Point {
        let mut position = self[id].left_extent;
        let mut current = id;
        while let Some(parent) = self[current].parent {
            if self[parent].right == Some(current) {
                position = self[parent].left_extent.traverse(position);
            }
            current = parent;
        }
        position
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        match parent {
            Some(parent) if self[parent].left == Some(old) => self[parent].left = Some(new),
            Some(parent) => self[parent].right = Some(new),
            None => self.root = Some(new),
        }
    }

    pub(crate) fn bubble_up(&mut self, id: NodeId) {
        while let Some(parent) = self[id].parent {
            if self[id].priority >= self[parent].priority {
                break;
            }
            if self[parent].left == Some(id) {
                self.rotate_right(id);
            } else {
                self.rotate_left(id);
            }
        }
    }

    pub(crate) fn bubble_down(&mut self, id: NodeId) {
        loop {
            let left_priority = self[id].left.map_or(u32::MAX, |left| self[left].priority);
            let right_priority = self[id].right.map_or(u32::MAX, |right| self[right].priority);
            let priority = self[id].priority;

            if left_priority < right_priority && left_priority < priority {
                if let Some(left) = self[id].left {
                    self.rotate_right(left);
                }
            } else if right_priority < priority {
                if let Some(right) = self[id].right {
                    self.rotate_left(right);
                }
            } else {
                break;
            }
        }
    }

    /// `pivot` is its parent's right child; the pivot moves up and the parent becomes its left
    /// child.
    fn rotate_left(&mut self, pivot: NodeId) {
        let Some(root) = self[pivot].parent else {
            return;
        };
        let grandparent = self[root].parent;
        self.replace_child(grandparent, root, pivot);
        self[pivot].parent = grandparent;

        let inner = self[pivot].left;
        self[root].right = inner;
        if let Some(inner) = inner {
            self[inner].parent = Some(root);
        }
        self[pivot].left = Some(root);
        self[root].parent = Some(pivot);

        self[pivot].left_extent = self[root].left_extent.traverse(self[pivot].left_extent);

        let spanning: Vec<MarkerId> = self[root].right_marker_ids.iter().copied().collect();
        self[pivot].right_marker_ids.extend(spanning);

        let pivot_left = std::mem::take(&mut self[pivot].left_marker_ids);
        let mut kept = HashSet::with_capacity(pivot_left.len());
        for id in pivot_left {
            if self[root].left_marker_ids.remove(&id) {
                kept.insert(id);
            } else {
                self[root].right_marker_ids.insert(id);
            }
        }
        self[pivot].left_marker_ids = kept;
    }

    /// `pivot` is its parent's left child; the pivot moves up and the parent becomes its right
    /// child.
    fn rotate_right(&mut self, pivot: NodeId) {
        let Some(root) = self[pivot].parent else {
            return;
        };
        let grandparent = self[root].parent;
        self.replace_child(grandparent, root, pivot);
        self[pivot].parent = grandparent;

        let inner = self[pivot].right;
        self[root].left = inner;
        if let Some(inner) = inner {
            self[inner].parent = Some(root);
        }
        self[pivot].right = Some(root);
        self[root].parent = Some(pivot);

        self[root].left_extent = self[root].left_extent.traversal(self[pivot].left_extent);

        let spanning: Vec<MarkerId> = self[root]
            .left_marker_ids
            .iter()
            .copied()
            .filter(|id| !self[pivot].start_marker_ids.contains(id))
            .collect();
        self[pivot].left_marker_ids.extend(spanning);

        let pivot_right = std::mem::take(&mut self[pivot].right_marker_ids);
        let mut kept = HashSet::with_capacity(pivot_right.len());
        for id in pivot_right {
            if self[root].right_marker_ids.remove(&id) {
                kept.insert(id);
            } else {
                self[root].left_marker_ids.insert(id);
            }
        }
        self[pivot].right_marker_ids = kept;
    }

    /// Rotate `id` down to a leaf, unlink it and return its slot to the arena.
    pub(crate) fn delete_node(&mut self, id: NodeId) {
        self[id].priority = u32::MAX;
        self.bubble_down(id);

        match self[id].parent {
            Some(parent) if self[parent].left == Some(id) => self[parent].left = None,
            Some(parent) => self[parent].right = None,
            None => self.root = None,
        }
        self.release(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tree: &mut MarkerTree, parent: NodeId, left_extent: Point, right: bool) -> NodeId {
        let id = tree.alloc(Some(parent), left_extent);
        if right {
            tree[parent].right = Some(id);
        } else {
            tree[parent].left = Some(id);
        }
        id
    }

    #[test]
    fn test_positions_survive_rotations() {
        // 5 at the root, 2 on its left, 9 on its right.
        let mut tree = MarkerTree::default();
        let root = tree.alloc(None, Point::new(0, 5));
        tree.root = Some(root);
        let left = leaf(&mut tree, root, Point::new(0, 2), false);
        let right = leaf(&mut tree, root, Point::new(0, 4), true);
        tree[root].priority = 10;
        tree[left].priority = 20;
        tree[right].priority = 30;

        assert_eq!(tree.node_position(root), Point::new(0, 5));
        assert_eq!(tree.node_position(left), Point::new(0, 2));
        assert_eq!(tree.node_position(right), Point::new(0, 9));

        tree[right].priority = 1;
        tree.bubble_up(right);
        assert_eq!(tree.root, Some(right));
        assert_eq!(tree.node_position(root), Point::new(0, 5));
        assert_eq!(tree.node_position(left), Point::new(0, 2));
        assert_eq!(tree.node_position(right), Point::new(0, 9));

        tree[left].priority = 0;
        tree.bubble_up(left);
        assert_eq!(tree.root, Some(left));
        assert_eq!(tree.node_position(root), Point::new(0, 5));
        assert_eq!(tree.node_position(right), Point::new(0, 9));
    }

    #[test]
    fn test_delete_node_reuses_slot() {
        let mut tree = MarkerTree::default();
        let root = tree.alloc(None, Point::new(1, 0));
        tree.root = Some(root);
        let child = leaf(&mut tree, root, Point::new(0, 3), true);
        tree[root].priority = 5;
        tree[child].priority = 7;

        tree.delete_node(root);
        assert_eq!(tree.root, Some(child));
        assert_eq!(tree.node_position(child), Point::new(1, 3));
        assert_eq!(tree.node_count(), 1);

        let reused = tree.alloc(None, Point::ZERO);
        assert_eq!(reused, root);
    }
}
