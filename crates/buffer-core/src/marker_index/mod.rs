//! Marker index: many ranges over a `(row, column)` space, kept valid across text edits.
//!
//! Markers are stored as endpoints in a treap (`tree`) whose nodes hold positions relative to
//! their left ancestor. An edit ([`MarkerIndex::splice`]) lifts out the markers touching the
//! edited region, shifts everything after it by adjusting a single node, and puts the touched
//! markers back at their new ranges. The four invalidation sets returned by a splice tell the
//! caller which markers need attention.
//!
//! # Example
//!
//! ```rust
//! use buffer_core::{MarkerIndex, Point};
//!
//! let mut index = MarkerIndex::with_seed(7);
//! index.insert(1, Point::new(0, 0), Point::new(0, 5)).unwrap();
//!
//! // Insert three characters at column 2.
//! let result = index.splice(Point::new(0, 2), Point::ZERO, Point::new(0, 3));
//! assert_eq!(index.get_end(1), Some(Point::new(0, 8)));
//! assert!(result.surround.contains(&1));
//! ```

mod cursor;
mod tree;

pub use cursor::Boundary;

use crate::error::MarkerIndexError;
use crate::point::Point;
use crate::range::Range;
use cursor::Cursor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tree::{MarkerTree, NodeId, UNASSIGNED_PRIORITY};

/// Caller-chosen marker identifier.
pub type MarkerId = u32;

/// Whether each endpoint of a marker is pushed forward by an edit starting exactly at it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Exclusivity {
    /// The start moves past text inserted or replaced at the start position.
    pub start: bool,
    /// The end moves past text inserted at the end position. Replacements starting at the end
    /// leave it in place.
    pub end: bool,
}

impl Exclusivity {
    /// Both endpoints set to `exclusive`.
    pub const fn both(exclusive: bool) -> Self {
        Self {
            start: exclusive,
            end: exclusive,
        }
    }
}

/// Markers affected by a [`MarkerIndex::splice`], grouped by how they relate to the edited
/// region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpliceResult {
    /// Every marker sharing at least one point with the edited region.
    pub touch: HashSet<MarkerId>,
    /// Markers lying entirely within the replaced region.
    pub inside: HashSet<MarkerId>,
    /// Markers crossing one edge of the replaced region.
    pub overlap: HashSet<MarkerId>,
    /// Markers that still span the whole region after the edit.
    pub surround: HashSet<MarkerId>,
}

impl SpliceResult {
    /// Returns `true` if no marker was affected.
    pub fn is_empty(&self) -> bool {
        self.touch.is_empty()
    }
}

/// Result of [`MarkerIndex::find_boundaries_after`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryQuery {
    /// Markers that started before the query position and are still open at it, ordered by
    /// range and then id.
    pub containing_start: Vec<MarkerId>,
    /// Endpoint positions at or after the query position, in order.
    pub boundaries: Vec<Boundary>,
}

#[derive(Debug, Clone, Copy)]
struct MarkerEntry {
    start_node: NodeId,
    end_node: NodeId,
    exclusivity: Exclusivity,
}

/// Interval index over [`Point`] ranges keyed by [`MarkerId`].
#[derive(Debug, Clone)]
pub struct MarkerIndex {
    tree: MarkerTree,
    markers: HashMap<MarkerId, MarkerEntry>,
    rng: StdRng,
}

impl Default for MarkerIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// New position of a marker endpoint after `[start, old_end]` is replaced by `[start, new_end]`.
///
/// An endpoint sitting exactly at `start` stays there unless `moves_at_start` is set.
fn shift_endpoint(
    point: Point,
    start: Point,
    old_end: Point,
    new_end: Point,
    moves_at_start: bool,
) -> Point {
    match point.cmp(&start) {
        Ordering::Less => point,
        Ordering::Equal if moves_at_start => new_end,
        Ordering::Equal => start,
        Ordering::Greater if point < old_end => new_end,
        Ordering::Greater => new_end.traverse(point.traversal(old_end)),
    }
}

impl MarkerIndex {
    /// Create an empty index with an entropy-seeded priority generator.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create an empty index whose tree shape is reproducible for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            tree: MarkerTree::default(),
            markers: HashMap::new(),
            rng,
        }
    }

    fn next_priority(&mut self) -> u32 {
        self.rng.gen_range(1..u32::MAX)
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Returns `true` if the index holds no markers.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Add a marker covering `[start, end]`.
    ///
    /// Fails without touching the index if `id` is already present or `start > end`.
    pub fn insert(
        &mut self,
        id: MarkerId,
        start: Point,
        end: Point,
    ) -> Result<(), MarkerIndexError> {
        if self.markers.contains_key(&id) {
            return Err(MarkerIndexError::DuplicateId(id));
        }
        if start > end {
            return Err(MarkerIndexError::InvertedRange { start, end });
        }
        self.attach(id, start, end, Exclusivity::default());
        Ok(())
    }

    fn attach(&mut self, id: MarkerId, start: Point, end: Point, exclusivity: Exclusivity) {
        let mut cursor = Cursor::new();
        let start_node = cursor.insert_marker_start(&mut self.tree, id, start, end);
        let end_node = cursor.insert_marker_end(&mut self.tree, id, start, end);

        self.tree[start_node].start_marker_ids.insert(id);
        self.tree[end_node].end_marker_ids.insert(id);

        for node in [start_node, end_node] {
            if self.tree[node].priority == UNASSIGNED_PRIORITY {
                self.tree[node].priority = self.next_priority();
                self.tree.bubble_up(node);
            }
        }

        self.markers.insert(
            id,
            MarkerEntry {
                start_node,
                end_node,
                exclusivity,
            },
        );
    }

    /// Remove a marker. Returns `false` if it was not present.
    pub fn remove(&mut self, id: MarkerId) -> bool {
        self.detach(id).is_some()
    }

    fn detach(&mut self, id: MarkerId) -> Option<MarkerEntry> {
        let entry = self.markers.remove(&id)?;

        let mut node = Some(entry.start_node);
        while let Some(current) = node {
            self.tree[current].right_marker_ids.remove(&id);
            node = self.tree[current].parent;
        }
        let mut node = Some(entry.end_node);
        while let Some(current) = node {
            self.tree[current].left_marker_ids.remove(&id);
            node = self.tree[current].parent;
        }

        self.tree[entry.start_node].start_marker_ids.remove(&id);
        self.tree[entry.end_node].end_marker_ids.remove(&id);

        if !self.tree[entry.start_node].is_marker_endpoint() {
            self.tree.delete_node(entry.start_node);
        }
        if entry.end_node != entry.start_node && !self.tree[entry.end_node].is_marker_endpoint() {
            self.tree.delete_node(entry.end_node);
        }
        Some(entry)
    }

    /// Returns `true` if a marker with `id` exists.
    pub fn has(&self, id: MarkerId) -> bool {
        self.markers.contains_key(&id)
    }

    /// Make both endpoints of a marker exclusive (or not). Unknown ids are ignored.
    pub fn set_exclusive(&mut self, id: MarkerId, exclusive: bool) {
        self.set_exclusivity(id, Exclusivity::both(exclusive));
    }

    /// Set the exclusivity of each endpoint of a marker. Unknown ids are ignored.
    pub fn set_exclusivity(&mut self, id: MarkerId, exclusivity: Exclusivity) {
        if let Some(entry) = self.markers.get_mut(&id) {
            entry.exclusivity = exclusivity;
        }
    }

    /// Current exclusivity of a marker.
    pub fn exclusivity(&self, id: MarkerId) -> Option<Exclusivity> {
        self.markers.get(&id).map(|entry| entry.exclusivity)
    }

    /// Start point of a marker.
    pub fn get_start(&self, id: MarkerId) -> Option<Point> {
        let entry = self.markers.get(&id)?;
        Some(self.tree.node_position(entry.start_node))
    }

    /// End point of a marker.
    pub fn get_end(&self, id: MarkerId) -> Option<Point> {
        let entry = self.markers.get(&id)?;
        Some(self.tree.node_position(entry.end_node))
    }

    /// Range of a marker.
    pub fn get_range(&self, id: MarkerId) -> Option<Range> {
        let entry = self.markers.get(&id)?;
        Some(Range {
            start: self.tree.node_position(entry.start_node),
            end: self.tree.node_position(entry.end_node),
        })
    }

    /// Order two markers by start, then by end. `None` if either id is unknown.
    pub fn compare(&self, a: MarkerId, b: MarkerId) -> Option<Ordering> {
        let a = self.get_range(a)?;
        let b = self.get_range(b)?;
        Some(a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)))
    }

    /// Markers sharing at least one point with `[start, end]`.
    pub fn find_intersecting(&self, start: Point, end: Point) -> HashSet<MarkerId> {
        let mut result = HashSet::new();
        Cursor::new().find_intersecting(&self.tree, start, end, &mut result);
        result
    }

    /// Markers whose range contains all of `[start, end]`.
    pub fn find_containing(&self, start: Point, end: Point) -> HashSet<MarkerId> {
        let containing_start = self.find_intersecting(start, start);
        if start == end {
            return containing_start;
        }
        let containing_end = self.find_intersecting(end, end);
        containing_start
            .into_iter()
            .filter(|id| containing_end.contains(id))
            .collect()
    }

    /// Markers whose range lies within `[start, end]`.
    pub fn find_contained_in(&self, start: Point, end: Point) -> HashSet<MarkerId> {
        let mut result = HashSet::new();
        Cursor::new().find_contained_in(&self.tree, start, end, &mut result);
        result
    }

    /// Markers starting within `[start, end]`.
    pub fn find_starting_in(&self, start: Point, end: Point) -> HashSet<MarkerId> {
        let mut result = HashSet::new();
        Cursor::new().find_endpoints_in(&self.tree, start, end, false, &mut result);
        result
    }

    /// Markers starting exactly at `position`.
    pub fn find_starting_at(&self, position: Point) -> HashSet<MarkerId> {
        self.find_starting_in(position, position)
    }

    /// Markers ending within `[start, end]`.
    pub fn find_ending_in(&self, start: Point, end: Point) -> HashSet<MarkerId> {
        let mut result = HashSet::new();
        Cursor::new().find_endpoints_in(&self.tree, start, end, true, &mut result);
        result
    }

    /// Markers ending exactly at `position`.
    pub fn find_ending_at(&self, position: Point) -> HashSet<MarkerId> {
        self.find_ending_in(position, position)
    }

    /// Markers open at `start`, followed by up to `max_count` endpoint positions from `start`
    /// onwards.
    pub fn find_boundaries_after(&self, start: Point, max_count: usize) -> BoundaryQuery {
        let mut containing_start: Vec<(Range, MarkerId)> = self
            .find_intersecting(start, start)
            .into_iter()
            .filter_map(|id| Some((self.get_range(id)?, id)))
            .filter(|(range, _)| range.start < start)
            .collect();
        containing_start.sort_by(|(a, a_id), (b, b_id)| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.end.cmp(&b.end))
                .then_with(|| a_id.cmp(b_id))
        });

        BoundaryQuery {
            containing_start: containing_start.into_iter().map(|(_, id)| id).collect(),
            boundaries: Cursor::new().boundaries_after(&self.tree, start, max_count),
        }
    }

    /// Snapshot of every marker's range.
    pub fn dump(&self) -> HashMap<MarkerId, Range> {
        let (starts, ends) = Cursor::new().endpoints(&self.tree);
        starts
            .into_iter()
            .map(|(id, start)| {
                let end = ends.get(&id).copied().unwrap_or(start);
                (id, Range { start, end })
            })
            .collect()
    }

    /// Replace `old_extent` worth of content at `start` with `new_extent` worth of content,
    /// moving every affected marker and reporting how each one related to the edit.
    pub fn splice(&mut self, start: Point, old_extent: Point, new_extent: Point) -> SpliceResult {
        let mut result = SpliceResult::default();
        if self.tree.root.is_none() || (old_extent.is_zero() && new_extent.is_zero()) {
            return result;
        }

        let old_end = start.traverse(old_extent);
        let new_end = start.traverse(new_extent);
        let replaces = start < old_end;
        let inserts = old_extent.is_zero();

        let mut relocated = Vec::new();
        for id in self.find_intersecting(start, old_end) {
            let (Some(old), Some(exclusivity)) = (self.get_range(id), self.exclusivity(id)) else {
                continue;
            };
            let new_start = shift_endpoint(old.start, start, old_end, new_end, exclusivity.start);
            // Ends at the edit start only follow an insertion, or their own moved start.
            let start_moved = old.start == start && exclusivity.start;
            let new_finish = shift_endpoint(
                old.end,
                start,
                old_end,
                new_end,
                (inserts && exclusivity.end) || start_moved,
            );

            let inside = replaces && start <= old.start && old.end <= old_end;
            let surround = old.start <= start
                && old_end <= old.end
                && new_start <= start
                && new_end <= new_finish;
            let overlap = old.start < old_end && start < old.end && !inside && !surround;

            result.touch.insert(id);
            if inside {
                result.inside.insert(id);
            }
            if surround {
                result.surround.insert(id);
            }
            if overlap {
                result.overlap.insert(id);
            }
            relocated.push((id, new_start, new_finish, exclusivity));
        }

        for &(id, ..) in &relocated {
            self.detach(id);
        }
        self.shift_after(old_end, new_end);
        for (id, new_start, new_finish, exclusivity) in relocated {
            self.attach(id, new_start, new_finish, exclusivity);
        }

        log::trace!(
            "marker splice at {start} ({old_extent} -> {new_extent}): {} touched, {} inside, {} overlap, {} surround",
            result.touch.len(),
            result.inside.len(),
            result.overlap.len(),
            result.surround.len()
        );
        result
    }

    /// Move every node after `old_end` so that `old_end` lands on `new_end`.
    ///
    /// No node may sit in `[start, old_end]` and no marker may span `old_end` when this runs.
    fn shift_after(&mut self, old_end: Point, new_end: Point) {
        if old_end == new_end || self.tree.root.is_none() {
            return;
        }
        let boundary = Cursor::new().insert_boundary(&mut self.tree, old_end);
        let priority = self.tree[boundary].priority;
        self.tree[boundary].priority = UNASSIGNED_PRIORITY;
        self.tree.bubble_up(boundary);
        self.tree[boundary].left_extent = new_end;

        if self.tree[boundary].is_marker_endpoint() {
            self.tree[boundary].priority = priority;
            self.tree.bubble_down(boundary);
        } else {
            self.tree.delete_node(boundary);
        }
    }
}
