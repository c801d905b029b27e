//! Treap primitives for [`super::Patch`].
//!
//! Nodes are ordered by sequence; nothing is keyed by absolute position. Each node records the
//! *gap* of unchanged text since the end of the previous change. Unchanged text has the same
//! extent in both coordinate spaces, so one gap positions the change in old and new space at
//! once, and split/merge keep both orderings consistent without extra bookkeeping.

use crate::point::Point;
use crate::text::Text;

pub(crate) type Link = Option<Box<Node>>;

/// A pair of old-space and new-space points (or extents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) old: Point,
    pub(crate) new: Point,
}

impl Span {
    pub(crate) fn new(old: Point, new: Point) -> Self {
        Self { old, new }
    }

    /// The same extent in both spaces.
    pub(crate) fn uniform(extent: Point) -> Self {
        Self::new(extent, extent)
    }

    pub(crate) fn then(self, extent: Span) -> Span {
        Span::new(self.old.traverse(extent.old), self.new.traverse(extent.new))
    }
}

/// Absolute start and end of one change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bounds {
    pub(crate) start: Span,
    pub(crate) end: Span,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    left: Link,
    right: Link,
    priority: u32,
    pub(crate) gap: Point,
    pub(crate) old_extent: Point,
    pub(crate) new_extent: Point,
    pub(crate) old_text: Option<Text>,
    pub(crate) new_text: Option<Text>,
    span: Span,
    count: usize,
}

impl Node {
    pub(crate) fn new(
        gap: Point,
        old_extent: Point,
        new_extent: Point,
        old_text: Option<Text>,
        new_text: Option<Text>,
        priority: u32,
    ) -> Box<Node> {
        let mut node = Box::new(Node {
            left: None,
            right: None,
            priority,
            gap,
            old_extent,
            new_extent,
            old_text,
            new_text,
            span: Span::default(),
            count: 0,
        });
        node.update();
        node
    }

    pub(crate) fn left(&self) -> &Link {
        &self.left
    }

    pub(crate) fn right(&self) -> &Link {
        &self.right
    }

    fn update(&mut self) {
        self.span = span(&self.left)
            .then(Span::uniform(self.gap))
            .then(Span::new(self.old_extent, self.new_extent))
            .then(span(&self.right));
        self.count = count(&self.left) + 1 + count(&self.right);
    }

    /// Absolute bounds of this node's change, given the end of everything before its subtree.
    pub(crate) fn bounds(&self, base: Span) -> Bounds {
        let start = base.then(span(&self.left)).then(Span::uniform(self.gap));
        Bounds {
            start,
            end: start.then(Span::new(self.old_extent, self.new_extent)),
        }
    }

    /// Swap old and new space throughout the subtree.
    pub(crate) fn invert(&mut self) {
        std::mem::swap(&mut self.old_extent, &mut self.new_extent);
        std::mem::swap(&mut self.old_text, &mut self.new_text);
        std::mem::swap(&mut self.span.old, &mut self.span.new);
        if let Some(left) = self.left.as_mut() {
            left.invert();
        }
        if let Some(right) = self.right.as_mut() {
            right.invert();
        }
    }
}

/// Total old and new extent covered by a subtree, measured from the change before it.
pub(crate) fn span(link: &Link) -> Span {
    link.as_ref().map_or(Span::default(), |node| node.span)
}

pub(crate) fn count(link: &Link) -> usize {
    link.as_ref().map_or(0, |node| node.count)
}

pub(crate) fn leftmost(link: &Link) -> Option<&Node> {
    let mut node = link.as_deref()?;
    while let Some(left) = node.left.as_deref() {
        node = left;
    }
    Some(node)
}

/// Concatenate two sequences. Every change in `left` precedes every change in `right`.
pub(crate) fn merge(left: Link, right: Link) -> Link {
    match (left, right) {
        (None, right) => right,
        (left, None) => left,
        (Some(mut left), Some(mut right)) => {
            if left.priority >= right.priority {
                left.right = merge(left.right.take(), Some(right));
                left.update();
                Some(left)
            } else {
                right.left = merge(Some(left), right.left.take());
                right.update();
                Some(right)
            }
        }
    }
}

/// Split a sequence into the longest prefix whose changes satisfy `goes_left` and the rest.
///
/// `base` is the end of everything preceding `link`; `goes_left` must hold for a prefix of the
/// sequence only.
pub(crate) fn split<F>(link: Link, base: Span, goes_left: &F) -> (Link, Link)
where
    F: Fn(&Bounds) -> bool,
{
    let Some(mut node) = link else {
        return (None, None);
    };
    let bounds = node.bounds(base);
    if goes_left(&bounds) {
        let (inner, rest) = split(node.right.take(), bounds.end, goes_left);
        node.right = inner;
        node.update();
        (Some(node), rest)
    } else {
        let (prefix, inner) = split(node.left.take(), base, goes_left);
        node.left = inner;
        node.update();
        (prefix, Some(node))
    }
}

/// Split off the first `index` changes.
pub(crate) fn split_at(link: Link, index: usize) -> (Link, Link) {
    let Some(mut node) = link else {
        return (None, None);
    };
    let left_count = count(&node.left);
    if index <= left_count {
        let (prefix, inner) = split_at(node.left.take(), index);
        node.left = inner;
        node.update();
        (prefix, Some(node))
    } else {
        let (inner, rest) = split_at(node.right.take(), index - left_count - 1);
        node.right = inner;
        node.update();
        (Some(node), rest)
    }
}

/// Overwrite the gap of the first change in a sequence.
pub(crate) fn set_first_gap(node: &mut Node, gap: Point) {
    match node.left.as_deref_mut() {
        Some(left) => set_first_gap(left, gap),
        None => node.gap = gap,
    }
    node.update();
}

/// Visit every node in order along with its absolute bounds.
pub(crate) fn walk<F>(link: &Link, base: Span, visit: &mut F)
where
    F: FnMut(&Node, Bounds),
{
    let Some(node) = link.as_deref() else {
        return;
    };
    let bounds = node.bounds(base);
    walk(&node.left, base, visit);
    visit(node, bounds);
    walk(&node.right, bounds.end, visit);
}

/// Detach every node, in order.
pub(crate) fn flatten(link: Link, out: &mut Vec<Box<Node>>) {
    let Some(mut node) = link else {
        return;
    };
    flatten(node.left.take(), out);
    let right = node.right.take();
    node.update();
    out.push(node);
    flatten(right, out);
}

/// Build a perfectly balanced tree from nodes in order.
///
/// `priorities` must hold one value per node; the largest values are placed nearest the root.
pub(crate) fn build_balanced(nodes: Vec<Box<Node>>, mut priorities: Vec<u32>) -> Link {
    let len = nodes.len();
    let mut nodes = nodes.into_iter();
    let mut root = build_from(&mut nodes, len);

    priorities.sort_unstable_by(|a, b| b.cmp(a));
    let mut priorities = priorities.into_iter();
    let mut level: Vec<&mut Node> = root.as_deref_mut().into_iter().collect();
    while !level.is_empty() {
        let mut next = Vec::with_capacity(level.len() * 2);
        for node in level {
            let Node {
                left,
                right,
                priority,
                ..
            } = node;
            *priority = priorities.next().unwrap_or(0);
            next.extend(left.as_deref_mut());
            next.extend(right.as_deref_mut());
        }
        level = next;
    }
    root
}

fn build_from(nodes: &mut std::vec::IntoIter<Box<Node>>, len: usize) -> Link {
    if len == 0 {
        return None;
    }
    let left_len = len / 2;
    let left = build_from(nodes, left_len);
    let mut node = nodes.next()?;
    node.left = left;
    node.right = build_from(nodes, len - left_len - 1);
    node.update();
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(gap: u32, old: u32, new: u32, priority: u32) -> Box<Node> {
        Node::new(
            Point::new(0, gap),
            Point::new(0, old),
            Point::new(0, new),
            None,
            None,
            priority,
        )
    }

    fn starts(link: &Link) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        walk(link, Span::default(), &mut |_, bounds| {
            out.push((bounds.start.old.column, bounds.start.new.column));
        });
        out
    }

    #[test]
    fn test_merge_and_split_preserve_positions() {
        // Changes at old 2..4 -> new 2..3, old 6..6 -> new 5..8, old 10..11 -> new 12..12.
        let mut link = None;
        for (gap, old, new, priority) in [(2, 2, 1, 5), (2, 0, 3, 9), (4, 1, 0, 1)] {
            link = merge(link, Some(change(gap, old, new, priority)));
        }
        assert_eq!(starts(&link), vec![(2, 2), (6, 5), (10, 12)]);
        assert_eq!(count(&link), 3);
        assert_eq!(span(&link), Span::new(Point::new(0, 11), Point::new(0, 12)));

        let (before, after) = split(link, Span::default(), &|bounds: &Bounds| {
            bounds.start.new < Point::new(0, 5)
        });
        assert_eq!(count(&before), 1);
        assert_eq!(count(&after), 2);
        assert_eq!(leftmost(&after).map(|node| node.gap), Some(Point::new(0, 2)));

        let joined = merge(before, after);
        assert_eq!(starts(&joined), vec![(2, 2), (6, 5), (10, 12)]);
    }

    #[test]
    fn test_split_at_and_set_first_gap() {
        let mut link = None;
        for priority in [3, 7, 5, 1] {
            link = merge(link, Some(change(1, 1, 1, priority)));
        }
        let (head, mut tail) = split_at(link, 1);
        assert_eq!(count(&head), 1);
        assert_eq!(count(&tail), 3);
        if let Some(tail) = tail.as_deref_mut() {
            set_first_gap(tail, Point::new(0, 10));
        }
        let joined = merge(head, tail);
        assert_eq!(
            starts(&joined),
            vec![(1, 1), (12, 12), (14, 14), (16, 16)]
        );
    }

    #[test]
    fn test_build_balanced_keeps_order_and_heap() {
        let nodes: Vec<Box<Node>> = (0..10).map(|_| change(1, 0, 2, 0)).collect();
        let root = build_balanced(nodes, (0..10).map(|p| p * 3).collect());
        assert_eq!(count(&root), 10);
        let expected: Vec<(u32, u32)> = (0..10).map(|i| (1 + i, 1 + 3 * i)).collect();
        assert_eq!(starts(&root), expected);

        fn check_heap(link: &Link) -> usize {
            let Some(node) = link.as_deref() else {
                return 0;
            };
            for child in [node.left(), node.right()] {
                if let Some(child) = child.as_deref() {
                    assert!(child.priority <= node.priority);
                }
            }
            1 + check_heap(node.left()).max(check_heap(node.right()))
        }
        assert!(check_heap(&root) <= 4);
    }

    #[test]
    fn test_invert_swaps_spaces() {
        let mut node = change(2, 3, 1, 1);
        node.invert();
        assert_eq!(node.old_extent, Point::new(0, 1));
        assert_eq!(node.new_extent, Point::new(0, 3));
        assert_eq!(node.span, Span::new(Point::new(0, 3), Point::new(0, 5)));
    }
}
