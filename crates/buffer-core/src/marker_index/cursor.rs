//! Root-to-leaf walks over the marker tree.
//!
//! A [`Cursor`] tracks the absolute position of the node it sits on together with the positions
//! of its nearest left and right ancestors, which bound every position in the node's subtree.
//! It holds no borrow of the tree, so mutating walks take the tree as an argument.

use super::MarkerId;
use super::tree::{MarkerTree, NodeId};
use crate::point::Point;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Endpoints sharing one position, as reported by boundary walks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Boundary {
    /// Position of the boundary.
    pub position: Point,
    /// Markers starting here.
    pub starting: HashSet<MarkerId>,
    /// Markers ending here.
    pub ending: HashSet<MarkerId>,
}

#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    node: Option<NodeId>,
    node_position: Point,
    left_ancestor_position: Point,
    right_ancestor_position: Point,
    left_ancestor_stack: Vec<Point>,
    right_ancestor_stack: Vec<Point>,
}

impl Cursor {
    pub(crate) fn new() -> Self {
        Self {
            node: None,
            node_position: Point::ZERO,
            left_ancestor_position: Point::ZERO,
            right_ancestor_position: Point::MAX,
            left_ancestor_stack: Vec::new(),
            right_ancestor_stack: Vec::new(),
        }
    }

    fn reset(&mut self, tree: &MarkerTree) {
        self.node = tree.root;
        self.node_position = tree.root.map_or(Point::ZERO, |root| tree[root].left_extent);
        self.left_ancestor_position = Point::ZERO;
        self.right_ancestor_position = Point::MAX;
        self.left_ancestor_stack.clear();
        self.right_ancestor_stack.clear();
    }

    fn push_ancestors(&mut self) {
        self.left_ancestor_stack.push(self.left_ancestor_position);
        self.right_ancestor_stack.push(self.right_ancestor_position);
    }

    fn descend_left(&mut self, tree: &MarkerTree) {
        let Some(left) = self.node.and_then(|node| tree[node].left) else {
            return;
        };
        self.push_ancestors();
        self.right_ancestor_position = self.node_position;
        self.node = Some(left);
        self.node_position = self.left_ancestor_position.traverse(tree[left].left_extent);
    }

    fn descend_right(&mut self, tree: &MarkerTree) {
        let Some(right) = self.node.and_then(|node| tree[node].right) else {
            return;
        };
        self.push_ancestors();
        self.left_ancestor_position = self.node_position;
        self.node = Some(right);
        self.node_position = self.left_ancestor_position.traverse(tree[right].left_extent);
    }

    fn ascend(&mut self, tree: &MarkerTree) {
        let Some(node) = self.node else {
            return;
        };
        match tree[node].parent {
            Some(parent) => {
                self.node_position = if tree[parent].left == Some(node) {
                    self.right_ancestor_position
                } else {
                    self.left_ancestor_position
                };
                self.left_ancestor_position = self.left_ancestor_stack.pop().unwrap_or(Point::ZERO);
                self.right_ancestor_position =
                    self.right_ancestor_stack.pop().unwrap_or(Point::MAX);
                self.node = Some(parent);
            }
            None => {
                self.node = None;
                self.node_position = Point::ZERO;
                self.left_ancestor_position = Point::ZERO;
                self.right_ancestor_position = Point::MAX;
            }
        }
    }

    fn move_to_successor(&mut self, tree: &MarkerTree) {
        let Some(node) = self.node else {
            return;
        };
        if tree[node].right.is_some() {
            self.descend_right(tree);
            while self.node.is_some_and(|node| tree[node].left.is_some()) {
                self.descend_left(tree);
            }
        } else {
            while let Some(node) = self.node {
                match tree[node].parent {
                    Some(parent) if tree[parent].right == Some(node) => self.ascend(tree),
                    _ => break,
                }
            }
            self.ascend(tree);
        }
    }

    fn seek_to_first_node_gte(&mut self, tree: &MarkerTree, position: Point) {
        self.reset(tree);
        while let Some(node) = self.node {
            match position.cmp(&self.node_position) {
                Ordering::Equal => break,
                Ordering::Less if tree[node].left.is_some() => self.descend_left(tree),
                Ordering::Greater if tree[node].right.is_some() => self.descend_right(tree),
                _ => break,
            }
        }
        if self.node.is_some() && self.node_position < position {
            self.move_to_successor(tree);
        }
    }

    fn mark_right(&self, tree: &mut MarkerTree, id: MarkerId, start: Point, end: Point) {
        if let Some(node) = self.node
            && self.left_ancestor_position < start
            && start <= self.node_position
            && self.right_ancestor_position <= end
        {
            tree[node].right_marker_ids.insert(id);
        }
    }

    fn mark_left(&self, tree: &mut MarkerTree, id: MarkerId, start: Point, end: Point) {
        if let Some(node) = self.node
            && !self.node_position.is_zero()
            && start <= self.left_ancestor_position
            && self.node_position <= end
        {
            tree[node].left_marker_ids.insert(id);
        }
    }

    fn insert_left_child(&self, tree: &mut MarkerTree, node: NodeId, position: Point) -> NodeId {
        let child = tree.alloc(Some(node), position.traversal(self.left_ancestor_position));
        tree[node].left = Some(child);
        child
    }

    fn insert_right_child(&self, tree: &mut MarkerTree, node: NodeId, position: Point) -> NodeId {
        let child = tree.alloc(Some(node), position.traversal(self.node_position));
        tree[node].right = Some(child);
        child
    }

    fn insert_root(tree: &mut MarkerTree, position: Point) -> NodeId {
        let root = tree.alloc(None, position);
        tree.root = Some(root);
        root
    }

    /// Find or create the node at `start`, recording `id` in the right-spanning sets along the
    /// way.
    pub(crate) fn insert_marker_start(
        &mut self,
        tree: &mut MarkerTree,
        id: MarkerId,
        start: Point,
        end: Point,
    ) -> NodeId {
        self.reset(tree);
        while let Some(node) = self.node {
            match start.cmp(&self.node_position) {
                Ordering::Equal => {
                    self.mark_right(tree, id, start, end);
                    return node;
                }
                Ordering::Less => {
                    self.mark_right(tree, id, start, end);
                    if tree[node].left.is_none() {
                        self.insert_left_child(tree, node, start);
                        self.descend_left(tree);
                        self.mark_right(tree, id, start, end);
                        return self.node.unwrap_or(node);
                    }
                    self.descend_left(tree);
                }
                Ordering::Greater => {
                    if tree[node].right.is_none() {
                        self.insert_right_child(tree, node, start);
                        self.descend_right(tree);
                        self.mark_right(tree, id, start, end);
                        return self.node.unwrap_or(node);
                    }
                    self.descend_right(tree);
                }
            }
        }
        Self::insert_root(tree, start)
    }

    /// Find or create the node at `end`, recording `id` in the left-spanning sets along the way.
    pub(crate) fn insert_marker_end(
        &mut self,
        tree: &mut MarkerTree,
        id: MarkerId,
        start: Point,
        end: Point,
    ) -> NodeId {
        self.reset(tree);
        while let Some(node) = self.node {
            match end.cmp(&self.node_position) {
                Ordering::Equal => {
                    self.mark_left(tree, id, start, end);
                    return node;
                }
                Ordering::Less => {
                    if tree[node].left.is_none() {
                        self.insert_left_child(tree, node, end);
                        self.descend_left(tree);
                        self.mark_left(tree, id, start, end);
                        return self.node.unwrap_or(node);
                    }
                    self.descend_left(tree);
                }
                Ordering::Greater => {
                    self.mark_left(tree, id, start, end);
                    if tree[node].right.is_none() {
                        self.insert_right_child(tree, node, end);
                        self.descend_right(tree);
                        self.mark_left(tree, id, start, end);
                        return self.node.unwrap_or(node);
                    }
                    self.descend_right(tree);
                }
            }
        }
        Self::insert_root(tree, end)
    }

    /// Find or create a node at `position` without touching any marker sets.
    pub(crate) fn insert_boundary(&mut self, tree: &mut MarkerTree, position: Point) -> NodeId {
        self.reset(tree);
        while let Some(node) = self.node {
            match position.cmp(&self.node_position) {
                Ordering::Equal => return node,
                Ordering::Less => match tree[node].left {
                    Some(_) => self.descend_left(tree),
                    None => return self.insert_left_child(tree, node, position),
                },
                Ordering::Greater => match tree[node].right {
                    Some(_) => self.descend_right(tree),
                    None => return self.insert_right_child(tree, node, position),
                },
            }
        }
        Self::insert_root(tree, position)
    }

    fn check_intersection(
        &self,
        tree: &MarkerTree,
        start: Point,
        end: Point,
        result: &mut HashSet<MarkerId>,
    ) {
        let Some(node) = self.node else {
            return;
        };
        let node = &tree[node];
        if self.left_ancestor_position <= end && start <= self.node_position {
            result.extend(node.left_marker_ids.iter().copied());
        }
        if start <= self.node_position && self.node_position <= end {
            result.extend(node.start_marker_ids.iter().copied());
            result.extend(node.end_marker_ids.iter().copied());
        }
        if self.node_position <= end && start <= self.right_ancestor_position {
            result.extend(node.right_marker_ids.iter().copied());
        }
    }

    pub(crate) fn find_intersecting(
        &mut self,
        tree: &MarkerTree,
        start: Point,
        end: Point,
        result: &mut HashSet<MarkerId>,
    ) {
        self.reset(tree);
        while let Some(node) = self.node {
            if start < self.node_position {
                if tree[node].left.is_none() {
                    break;
                }
                self.check_intersection(tree, start, end, result);
                self.descend_left(tree);
            } else {
                if tree[node].right.is_none() {
                    break;
                }
                self.check_intersection(tree, start, end, result);
                self.descend_right(tree);
            }
        }

        while self.node.is_some() {
            self.check_intersection(tree, start, end, result);
            self.move_to_successor(tree);
            if self.node_position > end {
                break;
            }
        }
    }

    pub(crate) fn find_contained_in(
        &mut self,
        tree: &MarkerTree,
        start: Point,
        end: Point,
        result: &mut HashSet<MarkerId>,
    ) {
        self.seek_to_first_node_gte(tree, start);
        let mut started = HashSet::new();
        while let Some(node) = self.node {
            if self.node_position > end {
                break;
            }
            started.extend(tree[node].start_marker_ids.iter().copied());
            result.extend(
                tree[node]
                    .end_marker_ids
                    .iter()
                    .filter(|id| started.contains(id))
                    .copied(),
            );
            self.move_to_successor(tree);
        }
    }

    /// Collect the ids starting (or ending, if `ending`) at nodes within `[start, end]`.
    pub(crate) fn find_endpoints_in(
        &mut self,
        tree: &MarkerTree,
        start: Point,
        end: Point,
        ending: bool,
        result: &mut HashSet<MarkerId>,
    ) {
        self.seek_to_first_node_gte(tree, start);
        while let Some(node) = self.node {
            if self.node_position > end {
                break;
            }
            let ids = if ending {
                &tree[node].end_marker_ids
            } else {
                &tree[node].start_marker_ids
            };
            result.extend(ids.iter().copied());
            self.move_to_successor(tree);
        }
    }

    pub(crate) fn boundaries_after(
        &mut self,
        tree: &MarkerTree,
        start: Point,
        max_count: usize,
    ) -> Vec<Boundary> {
        self.seek_to_first_node_gte(tree, start);
        let mut boundaries = Vec::new();
        while let Some(node) = self.node {
            if boundaries.len() >= max_count {
                break;
            }
            boundaries.push(Boundary {
                position: self.node_position,
                starting: tree[node].start_marker_ids.clone(),
                ending: tree[node].end_marker_ids.clone(),
            });
            self.move_to_successor(tree);
        }
        boundaries
    }

    /// Every marker's endpoints, gathered by an in-order walk.
    pub(crate) fn endpoints(
        &mut self,
        tree: &MarkerTree,
    ) -> (HashMap<MarkerId, Point>, HashMap<MarkerId, Point>) {
        let mut starts = HashMap::new();
        let mut ends = HashMap::new();
        self.reset(tree);
        while self.node.is_some_and(|node| tree[node].left.is_some()) {
            self.descend_left(tree);
        }
        while let Some(node) = self.node {
            for &id in &tree[node].start_marker_ids {
                starts.insert(id, self.node_position);
            }
            for &id in &tree[node].end_marker_ids {
                ends.insert(id, self.node_position);
            }
            self.move_to_successor(tree);
        }
        (starts, ends)
    }
}
