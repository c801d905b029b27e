//! Two-dimensional text coordinates.
//!
//! A [`Point`] addresses a location in a document as a `(row, column)` pair. Columns are
//! measured in whatever unit the caller uses for lines (typically UTF-16 code units).
//!
//! Points double as *extents*: the distance covered by a run of text. Moving from a point by an
//! extent ([`Point::traverse`]) carries across rows the way text does: an extent spanning a line
//! break resets the column.

use std::cmp::Ordering;
use std::fmt;

/// A `(row, column)` coordinate or extent.
///
/// Arithmetic saturates at [`Point::MAX`], which stands in for "unbounded".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// Zero-based row.
    pub row: u32,
    /// Zero-based column within the row.
    pub column: u32,
}

impl Point {
    /// The origin (also the empty extent).
    pub const ZERO: Point = Point { row: 0, column: 0 };

    /// The saturating sentinel used for unbounded positions.
    pub const MAX: Point = Point {
        row: u32::MAX,
        column: u32::MAX,
    };

    /// Create a point from a row and a column.
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Returns `true` for the origin / empty extent.
    pub fn is_zero(self) -> bool {
        self.row == 0 && self.column == 0
    }

    /// Move from `self` by `extent`.
    ///
    /// An extent with no rows only advances the column; otherwise the rows are added and the
    /// column becomes the extent's column.
    pub fn traverse(self, extent: Point) -> Point {
        if extent.row == 0 {
            Point::new(self.row, self.column.saturating_add(extent.column))
        } else {
            Point::new(self.row.saturating_add(extent.row), extent.column)
        }
    }

    /// The extent that leads from `start` to `self`.
    ///
    /// Inverse of [`Point::traverse`]: `start.traverse(self.traversal(start)) == self` whenever
    /// `start <= self`. Saturates at zero otherwise.
    pub fn traversal(self, start: Point) -> Point {
        if self.row == start.row {
            Point::new(0, self.column.saturating_sub(start.column))
        } else if self.row > start.row {
            Point::new(self.row - start.row, self.column)
        } else {
            Point::ZERO
        }
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

impl From<(u32, u32)> for Point {
    fn from((row, column): (u32, u32)) -> Self {
        Point::new(row, column)
    }
}
