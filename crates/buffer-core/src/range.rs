//! Closed `[start, end]` ranges of [`Point`]s.

use crate::point::Point;

/// A range of points with `start <= end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range {
    /// First point of the range.
    pub start: Point,
    /// Last point of the range.
    pub end: Point,
}

impl Range {
    /// Create a range, swapping the endpoints if they are given in reverse order.
    pub fn new(start: Point, end: Point) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Returns `true` if the range covers no text.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The extent from `start` to `end`.
    pub fn extent(&self) -> Point {
        self.end.traversal(self.start)
    }

    /// Returns `true` if `point` lies within the range (endpoints included).
    pub fn contains_point(&self, point: Point) -> bool {
        self.start <= point && point <= self.end
    }

    /// Returns `true` if `other` lies within the range (endpoints included).
    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns `true` if the two ranges share at least one point.
    pub fn intersects(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl From<(Point, Point)> for Range {
    fn from((start, end): (Point, Point)) -> Self {
        Range::new(start, end)
    }
}
