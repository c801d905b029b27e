//! Patch: a coalesced list of old → new text changes.
//!
//! A [`Patch`] records which regions of an *old* document were replaced by which regions of a
//! *new* document. Changes never overlap and are ordered identically in both coordinate spaces,
//! so any change can be found by either its old or its new position in `O(log n)`.
//!
//! Edits are recorded with [`Patch::splice`] (new-space coordinates, the usual "the user just
//! typed" case) or [`Patch::splice_old`] (old-space coordinates, used to rebase a patch onto an
//! edited baseline). Changes that end up touching are merged when the patch was created with
//! [`PatchOptions::merges_adjacent_changes`].
//!
//! # Example
//!
//! ```rust
//! use buffer_core::{Patch, Point, Text};
//!
//! let mut patch = Patch::new();
//! patch
//!     .splice(Point::new(0, 0), Point::ZERO, Point::new(0, 3), Some(Text::new()), Some(Text::from("abc")))
//!     .unwrap();
//! patch
//!     .splice(Point::new(0, 3), Point::ZERO, Point::new(0, 2), Some(Text::new()), Some(Text::from("de")))
//!     .unwrap();
//!
//! let changes = patch.get_changes();
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].new_end, Point::new(0, 5));
//! assert_eq!(changes[0].new_text, Some(Text::from("abcde")));
//! ```

mod node;

pub(crate) use node::Node;

use crate::error::PatchError;
use crate::point::Point;
use crate::text::Text;
use node::{
    Bounds, Link, Span, build_balanced, count, flatten, leftmost, merge, set_first_gap, span,
    split, split_at, walk,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One recorded replacement, in absolute coordinates of both spaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Change {
    /// Start of the replaced region in the old document.
    pub old_start: Point,
    /// End of the replaced region in the old document.
    pub old_end: Point,
    /// Start of the replacement in the new document.
    pub new_start: Point,
    /// End of the replacement in the new document.
    pub new_end: Point,
    /// The replaced text, when known.
    pub old_text: Option<Text>,
    /// The replacement text, when known.
    pub new_text: Option<Text>,
}

impl Change {
    fn from_node(node: &Node, bounds: Bounds) -> Self {
        Self {
            old_start: bounds.start.old,
            old_end: bounds.end.old,
            new_start: bounds.start.new,
            new_end: bounds.end.new,
            old_text: node.old_text.clone(),
            new_text: node.new_text.clone(),
        }
    }

    fn old_extent(&self) -> Point {
        self.old_end.traversal(self.old_start)
    }

    fn new_extent(&self) -> Point {
        self.new_end.traversal(self.new_start)
    }
}

/// Construction-time policy for a [`Patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// Combine changes whose boundaries touch into a single change.
    pub merges_adjacent_changes: bool,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            merges_adjacent_changes: true,
        }
    }
}

/// Shape of the underlying tree, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLayout {
    /// Absolute old-space start of this node's change.
    pub old_start: Point,
    /// Absolute old-space end of this node's change.
    pub old_end: Point,
    /// Absolute new-space start of this node's change.
    pub new_start: Point,
    /// Absolute new-space end of this node's change.
    pub new_end: Point,
    /// Left subtree.
    pub left: Option<Box<TreeLayout>>,
    /// Right subtree.
    pub right: Option<Box<TreeLayout>>,
}

#[derive(Debug, Clone, Copy)]
enum Space {
    Old,
    New,
}

impl Space {
    fn pick(self, span: Span) -> Point {
        match self {
            Space::Old => span.old,
            Space::New => span.new,
        }
    }
}

/// Treap of non-overlapping changes between an old and a new document.
#[derive(Debug, Clone)]
pub struct Patch {
    root: Link,
    options: PatchOptions,
    rng: StdRng,
}

impl Default for Patch {
    fn default() -> Self {
        Self::new()
    }
}

/// Slice a retained text, distinguishing "no text retained" from "cannot slice here".
fn slice_text(
    text: Option<&Text>,
    slice: impl FnOnce(&Text) -> Option<Text>,
) -> Result<Option<Text>, PatchError> {
    match text {
        None => Ok(None),
        Some(text) => slice(text).map(Some).ok_or(PatchError::DoesNotApply),
    }
}

/// Join text pieces; the result is only known if every piece is.
fn concat_texts(pieces: impl IntoIterator<Item = Option<Text>>) -> Option<Text> {
    let mut joined = Text::new();
    for piece in pieces {
        joined.push_text(&piece?);
    }
    Some(joined)
}

/// Old text of the region `[start, ...)` replaced by a splice over `participants`: the parts of
/// `deleted_text` covering unchanged regions interleaved with each participant's old text.
fn combined_old_text(
    participants: &[Change],
    start: Point,
    deleted_text: Option<Text>,
) -> Result<Option<Text>, PatchError> {
    let Some(mut remaining) = deleted_text else {
        return Ok(None);
    };
    let mut position = start;
    let mut combined = Text::new();
    let mut complete = true;

    for change in participants {
        if change.new_start > position {
            let unchanged = change.new_start.traversal(position);
            let piece = remaining.prefix(unchanged).ok_or(PatchError::DoesNotApply)?;
            remaining = remaining.suffix(unchanged).ok_or(PatchError::DoesNotApply)?;
            combined.push_text(&piece);
            position = change.new_start;
        }
        match &change.old_text {
            Some(old_text) => combined.push_text(old_text),
            None => complete = false,
        }
        let consumed = change.new_end.traversal(position).min(remaining.extent());
        remaining = remaining.suffix(consumed).ok_or(PatchError::DoesNotApply)?;
        position = change.new_end;
    }
    combined.push_text(&remaining);
    Ok(complete.then_some(combined))
}

/// Fold the changes overlapping a splice into one change.
fn fold_participants(
    participants: &[Change],
    before_end: Span,
    start: Point,
    deletion_end: Point,
    insertion_end: Point,
    deleted_text: Option<Text>,
    inserted_text: Option<Text>,
) -> Result<Change, PatchError> {
    let unchanged_to_old = |new: Point| before_end.old.traverse(new.traversal(before_end.new));

    let (Some(first), Some(last)) = (participants.first(), participants.last()) else {
        return Ok(Change {
            old_start: unchanged_to_old(start),
            old_end: unchanged_to_old(deletion_end),
            new_start: start,
            new_end: insertion_end,
            old_text: deleted_text,
            new_text: inserted_text,
        });
    };

    let old_start = if start < first.new_start {
        unchanged_to_old(start)
    } else {
        first.old_start
    };
    let (old_end, new_end) = if deletion_end > last.new_end {
        (
            last.old_end.traverse(deletion_end.traversal(last.new_end)),
            insertion_end,
        )
    } else {
        (
            last.old_end,
            insertion_end.traverse(last.new_end.traversal(deletion_end)),
        )
    };

    let prefix = if start > first.new_start {
        let extent = start.traversal(first.new_start);
        slice_text(first.new_text.as_ref(), |text| text.prefix(extent))?
    } else {
        Some(Text::new())
    };
    let suffix = if last.new_end > deletion_end {
        let extent = deletion_end.traversal(last.new_start);
        slice_text(last.new_text.as_ref(), |text| text.suffix(extent))?
    } else {
        Some(Text::new())
    };
    let old_text = combined_old_text(participants, start, deleted_text)?;

    Ok(Change {
        old_start,
        old_end,
        new_start: start.min(first.new_start),
        new_end,
        old_text,
        new_text: concat_texts([prefix, inserted_text, suffix]),
    })
}

impl Patch {
    /// Create an empty patch that merges adjacent changes.
    pub fn new() -> Self {
        Self::with_options(PatchOptions::default())
    }

    /// Create an empty patch with explicit options. Priorities are seeded from the thread-local
    /// generator.
    pub fn with_options(options: PatchOptions) -> Self {
        Self::from_rng(options, StdRng::seed_from_u64(rand::random()))
    }

    /// Create an empty patch whose tree shape is reproducible for a given seed.
    pub fn with_seed(options: PatchOptions, seed: u64) -> Self {
        Self::from_rng(options, StdRng::seed_from_u64(seed))
    }

    fn from_rng(options: PatchOptions, rng: StdRng) -> Self {
        Self {
            root: None,
            options,
            rng,
        }
    }

    /// Clone with a priority stream of its own, derived from this one.
    fn fork(&self) -> Patch {
        let mut forked = self.clone();
        forked.rng = StdRng::seed_from_u64(forked.rng.r#gen());
        forked
    }

    pub(crate) fn from_nodes(options: PatchOptions, nodes: Vec<Box<Node>>) -> Self {
        let mut patch = Self::with_options(options);
        let priorities = (0..nodes.len()).map(|_| patch.next_priority()).collect();
        patch.root = build_balanced(nodes, priorities);
        patch
    }

    /// Visit every node in order.
    pub(crate) fn for_each_node(&self, mut visit: impl FnMut(&Node)) {
        walk(&self.root, Span::default(), &mut |node, _| visit(node));
    }

    fn next_priority(&mut self) -> u32 {
        self.rng.r#gen()
    }

    /// The options this patch was created with.
    pub fn options(&self) -> PatchOptions {
        self.options
    }

    /// Record that, in new-space coordinates, `deletion_extent` worth of text at `new_start` was
    /// replaced by `insertion_extent` worth of text.
    ///
    /// Every change touched by the edited region is folded into one change. Fails without
    /// modifying the patch if a text payload does not match its extent or a retained text cannot
    /// be cut at the edit boundaries.
    pub fn splice(
        &mut self,
        new_start: Point,
        deletion_extent: Point,
        insertion_extent: Point,
        deleted_text: Option<Text>,
        inserted_text: Option<Text>,
    ) -> Result<(), PatchError> {
        self.splice_change(
            new_start,
            deletion_extent,
            insertion_extent,
            deleted_text,
            inserted_text,
            false,
        )
    }

    fn splice_change(
        &mut self,
        start: Point,
        deletion_extent: Point,
        insertion_extent: Point,
        deleted_text: Option<Text>,
        inserted_text: Option<Text>,
        drop_noop: bool,
    ) -> Result<(), PatchError> {
        if deletion_extent.is_zero() && insertion_extent.is_zero() {
            return Ok(());
        }
        if deleted_text
            .as_ref()
            .is_some_and(|text| text.extent() != deletion_extent)
            || inserted_text
                .as_ref()
                .is_some_and(|text| text.extent() != insertion_extent)
        {
            return Err(PatchError::DoesNotApply);
        }

        let deletion_end = start.traverse(deletion_extent);
        let insertion_end = start.traverse(insertion_extent);
        let merges = self.options.merges_adjacent_changes;

        let (before, rest) = split(self.root.take(), Span::default(), &|bounds: &Bounds| {
            if merges {
                bounds.end.new < start
            } else {
                bounds.end.new <= start
            }
        });
        let before_end = span(&before);
        let (middle, after) = split(rest, before_end, &|bounds: &Bounds| {
            if merges {
                bounds.start.new <= deletion_end
            } else {
                bounds.start.new < deletion_end
            }
        });
        let middle_end = before_end.then(span(&middle));

        let mut participants = Vec::with_capacity(count(&middle));
        walk(&middle, before_end, &mut |node, bounds| {
            participants.push(Change::from_node(node, bounds));
        });

        let combined = match fold_participants(
            &participants,
            before_end,
            start,
            deletion_end,
            insertion_end,
            deleted_text,
            inserted_text,
        ) {
            Ok(combined) => combined,
            Err(error) => {
                self.root = merge(merge(before, middle), after);
                return Err(error);
            }
        };

        let is_noop = (combined.old_extent().is_zero() && combined.new_extent().is_zero())
            || (drop_noop && combined.old_text.is_some() && combined.old_text == combined.new_text);
        let (replacement, end) = if is_noop {
            (None, before_end)
        } else {
            let node = Node::new(
                combined.old_start.traversal(before_end.old),
                combined.old_extent(),
                combined.new_extent(),
                combined.old_text,
                combined.new_text,
                self.next_priority(),
            );
            let end = Span::new(combined.old_end, combined.new_end);
            (Some(node), end)
        };

        let mut after = after;
        if let Some(first) = after.as_deref_mut() {
            let next_start = middle_end.old.traverse(leftmost_gap(first));
            set_first_gap(first, next_start.traversal(end.old));
        }

        log::trace!(
            "patch splice at {start} ({deletion_extent} -> {insertion_extent}): merged {} changes",
            participants.len()
        );
        self.root = merge(merge(before, replacement), after);
        Ok(())
    }

    /// Record that, in old-space coordinates, `deletion_extent` worth of the old document at
    /// `old_start` was replaced by `insertion_extent` worth of text.
    ///
    /// Changes inside the edited region are discarded and later changes move with the edit.
    pub fn splice_old(
        &mut self,
        old_start: Point,
        deletion_extent: Point,
        insertion_extent: Point,
    ) {
        if self.root.is_none() {
            return;
        }
        let deletion_end = old_start.traverse(deletion_extent);
        let insertion_end = old_start.traverse(insertion_extent);

        let (before, rest) = split(self.root.take(), Span::default(), &|bounds: &Bounds| {
            bounds.end.old <= old_start
        });
        let before_end = span(&before);
        let (discarded, mut after) = split(rest, before_end, &|bounds: &Bounds| {
            bounds.start.old < deletion_end || bounds.start.old <= old_start
        });
        let discarded_end = before_end.then(span(&discarded));

        let mut adjacent = false;
        if let Some(first) = after.as_deref_mut() {
            let next_start = discarded_end.old.traverse(leftmost_gap(first));
            let shifted = insertion_end.traverse(next_start.traversal(deletion_end));
            let gap = shifted.traversal(before_end.old);
            set_first_gap(first, gap);
            adjacent = gap.is_zero() && before.is_some();
        }

        log::trace!(
            "patch splice_old at {old_start} ({deletion_extent} -> {insertion_extent}): dropped {} changes",
            count(&discarded)
        );

        if adjacent && self.options.merges_adjacent_changes {
            let keep = count(&before).saturating_sub(1);
            let (head, last) = split_at(before, keep);
            let (first, tail) = split_at(after, 1);
            let joined = match (last, first) {
                (Some(last), Some(first)) => Some(Node::new(
                    last.gap,
                    last.old_extent.traverse(first.old_extent),
                    last.new_extent.traverse(first.new_extent),
                    concat_texts([last.old_text, first.old_text]),
                    concat_texts([last.new_text, first.new_text]),
                    self.next_priority(),
                )),
                (last, first) => merge(last, first),
            };
            self.root = merge(merge(head, joined), tail);
        } else {
            self.root = merge(before, after);
        }
    }

    /// All changes in order.
    pub fn get_changes(&self) -> Vec<Change> {
        let mut changes = Vec::with_capacity(count(&self.root));
        walk(&self.root, Span::default(), &mut |node, bounds| {
            changes.push(Change::from_node(node, bounds));
        });
        changes
    }

    fn changes_in_range(&self, space: Space, start: Point, end: Point) -> Vec<Change> {
        fn collect(
            link: &Link,
            base: Span,
            space: Space,
            start: Point,
            end: Point,
            out: &mut Vec<Change>,
        ) {
            let Some(node) = link.as_deref() else {
                return;
            };
            let bounds = node.bounds(base);
            let (node_start, node_end) = (space.pick(bounds.start), space.pick(bounds.end));
            if node_end > start {
                collect(node.left(), base, space, start, end, out);
            }
            if node_end > start && node_start < end {
                out.push(Change::from_node(node, bounds));
            }
            if node_start < end {
                collect(node.right(), bounds.end, space, start, end, out);
            }
        }

        let mut changes = Vec::new();
        collect(&self.root, Span::default(), space, start, end, &mut changes);
        changes
    }

    /// Changes overlapping `(start, end)` in old-space coordinates.
    pub fn grab_changes_in_old_range(&self, start: Point, end: Point) -> Vec<Change> {
        self.changes_in_range(Space::Old, start, end)
    }

    /// Changes overlapping `(start, end)` in new-space coordinates.
    pub fn grab_changes_in_new_range(&self, start: Point, end: Point) -> Vec<Change> {
        self.changes_in_range(Space::New, start, end)
    }

    fn change_starting_before(&self, space: Space, position: Point) -> Option<Change> {
        let mut found = None;
        let mut link = &self.root;
        let mut base = Span::default();
        while let Some(node) = link.as_deref() {
            let bounds = node.bounds(base);
            if space.pick(bounds.start) <= position {
                found = Some((node, bounds));
                base = bounds.end;
                link = node.right();
            } else {
                link = node.left();
            }
        }
        found.map(|(node, bounds)| Change::from_node(node, bounds))
    }

    /// The last change starting at or before `position` in old space.
    pub fn grab_change_starting_before_old_position(&self, position: Point) -> Option<Change> {
        self.change_starting_before(Space::Old, position)
    }

    /// The last change starting at or before `position` in new space.
    pub fn grab_change_starting_before_new_position(&self, position: Point) -> Option<Change> {
        self.change_starting_before(Space::New, position)
    }

    /// Number of recorded changes.
    pub fn get_change_count(&self) -> usize {
        count(&self.root)
    }

    /// The smallest change spanning every recorded change (without texts).
    pub fn get_bounds(&self) -> Option<Change> {
        let first = leftmost(&self.root)?;
        let end = span(&self.root);
        Some(Change {
            old_start: first.gap,
            old_end: end.old,
            new_start: first.gap,
            new_end: end.new,
            old_text: None,
            new_text: None,
        })
    }

    /// A structurally independent deep copy.
    pub fn copy(&self) -> Patch {
        self.fork()
    }

    /// The patch that undoes this one: old and new space swap roles.
    pub fn invert(&self) -> Patch {
        let mut inverted = self.fork();
        if let Some(root) = inverted.root.as_deref_mut() {
            root.invert();
        }
        inverted
    }

    /// Apply `other` on top of this patch, so that this patch describes both edits.
    ///
    /// `left_to_right` walks `other` front to back splicing at new-space positions; otherwise it
    /// walks back to front splicing at old-space positions. Leaves `self` untouched on failure.
    pub fn combine(&mut self, other: &Patch, left_to_right: bool) -> Result<(), PatchError> {
        let changes = other.get_changes();
        let mut combined = self.clone();
        let mut apply = |change: &Change, position: Point| {
            combined.splice_change(
                position,
                change.old_extent(),
                change.new_extent(),
                change.old_text.clone(),
                change.new_text.clone(),
                true,
            )
        };
        if left_to_right {
            for change in &changes {
                apply(change, change.new_start)?;
            }
        } else {
            for change in changes.iter().rev() {
                apply(change, change.old_start)?;
            }
        }
        *self = combined;
        Ok(())
    }

    /// Fold a sequence of patches into one, alternating the combination direction at every
    /// step starting with left to right.
    pub fn compose<'a>(patches: impl IntoIterator<Item = &'a Patch>) -> Result<Patch, PatchError> {
        let mut result = Patch::new();
        let mut left_to_right = true;
        for patch in patches {
            result.combine(patch, left_to_right)?;
            left_to_right = !left_to_right;
        }
        Ok(result)
    }

    /// Rebuild the tree perfectly balanced.
    pub fn rebalance(&mut self) {
        let mut nodes = Vec::with_capacity(count(&self.root));
        flatten(self.root.take(), &mut nodes);
        log::debug!("rebalancing patch with {} changes", nodes.len());
        let priorities = (0..nodes.len()).map(|_| self.next_priority()).collect();
        self.root = build_balanced(nodes, priorities);
    }

    /// Height of the underlying tree.
    pub fn depth(&self) -> usize {
        fn depth(link: &Link) -> usize {
            link.as_deref()
                .map_or(0, |node| 1 + depth(node.left()).max(depth(node.right())))
        }
        depth(&self.root)
    }

    /// Shape of the underlying tree with absolute coordinates on every node.
    pub fn tree_layout(&self) -> Option<TreeLayout> {
        fn layout(link: &Link, base: Span) -> Option<Box<TreeLayout>> {
            let node = link.as_deref()?;
            let bounds = node.bounds(base);
            Some(Box::new(TreeLayout {
                old_start: bounds.start.old,
                old_end: bounds.end.old,
                new_start: bounds.start.new,
                new_end: bounds.end.new,
                left: layout(node.left(), base),
                right: layout(node.right(), bounds.end),
            }))
        }
        layout(&self.root, Span::default()).map(|layout| *layout)
    }
}

fn leftmost_gap(node: &Node) -> Point {
    let mut node = node;
    while let Some(left) = node.left().as_deref() {
        node = left;
    }
    node.gap
}
