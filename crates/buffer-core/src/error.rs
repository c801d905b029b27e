//! Error types for marker index, patch and decoding failures.

use crate::marker_index::MarkerId;
use crate::point::Point;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`crate::MarkerIndex`] mutations.
pub enum MarkerIndexError {
    #[error("marker {0} is already present")]
    /// `insert` was given an id that is already in the index.
    DuplicateId(MarkerId),

    #[error("marker range is inverted: start {start} is after end {end}")]
    /// `insert` was given a start point after its end point.
    InvertedRange {
        /// The requested start.
        start: Point,
        /// The requested end.
        end: Point,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`crate::Patch`] edits.
pub enum PatchError {
    #[error("Patch does not apply")]
    /// The edit cannot be reconciled with the changes already recorded.
    DoesNotApply,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced while decoding a serialized [`crate::Patch`].
pub enum DecodeError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    /// The buffer ended in the middle of a record.
    Truncated {
        /// Bytes required by the next field.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    #[error("unsupported serialization version {0}")]
    /// The header names a format version this build cannot read.
    UnsupportedVersion(u32),

    #[error("malformed patch data: {0}")]
    /// A record is structurally invalid.
    Malformed(&'static str),

    #[error("{0} trailing bytes after the last change")]
    /// Bytes remained after the declared number of changes.
    TrailingBytes(usize),
}
