#![warn(missing_docs)]
//! Buffer Core - range tracking and edit bookkeeping for text buffers
//!
//! # Overview
//!
//! `buffer-core` holds the two data structures a text buffer needs to keep positions and edits
//! straight while the text changes underneath them. Both work purely in `(row, column)`
//! coordinates and never see the buffer contents.
//!
//! - [`MarkerIndex`]: many ranges (markers) kept valid across edits, with fast spatial queries
//!   and an invalidation report for every edit.
//! - [`Patch`]: a compact, coalesced record of old → new changes that can be inverted,
//!   composed with other patches and serialized.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │  MarkerIndex                 │   │  Patch                       │
//! │  treap of marker endpoints   │   │  treap of changes            │
//! │  (relative left extents)     │   │  (gap + old/new extents)     │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                └────────────┬─────────────────────┘
//!                  Point / Range / Text (UTF-16)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use buffer_core::{MarkerIndex, Patch, Point, Text};
//!
//! // Track a range and shift it with an edit.
//! let mut index = MarkerIndex::with_seed(1);
//! index.insert(1, Point::new(0, 4), Point::new(0, 8)).unwrap();
//! index.splice(Point::new(0, 0), Point::ZERO, Point::new(0, 2));
//! assert_eq!(index.get_start(1), Some(Point::new(0, 6)));
//!
//! // Record the same edit in a patch.
//! let mut patch = Patch::new();
//! patch
//!     .splice(Point::new(0, 0), Point::ZERO, Point::new(0, 2), Some(Text::new()), Some(Text::from("//")))
//!     .unwrap();
//! let bytes = patch.serialize();
//! assert_eq!(Patch::deserialize(&bytes).unwrap().get_changes(), patch.get_changes());
//! ```
//!
//! # Module Description
//!
//! - [`point`] - `(row, column)` positions and extent arithmetic
//! - [`range`] - closed ranges of points
//! - [`text`] - UTF-16 text payloads with line-aware slicing
//! - [`marker_index`] - marker index and splice invalidation
//! - [`patch`] - change lists, composition and inversion
//! - [`serialization`] - binary encoding of patches
//! - [`error`] - error types

pub mod error;
pub mod marker_index;
pub mod patch;
pub mod point;
pub mod range;
pub mod serialization;
pub mod text;

pub use error::{DecodeError, MarkerIndexError, PatchError};
pub use marker_index::{
    Boundary, BoundaryQuery, Exclusivity, MarkerId, MarkerIndex, SpliceResult,
};
pub use patch::{Change, Patch, PatchOptions, TreeLayout};
pub use point::Point;
pub use range::Range;
pub use text::Text;
