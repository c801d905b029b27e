#![warn(missing_docs)]
//! Buffer Core Host - a loosely-typed surface over `buffer-core`
//!
//! Scripting hosts hand over plain values: points as `{row, column}` objects, ids as numbers,
//! texts as strings or `null`. This crate validates those values at the boundary, forwards to
//! [`buffer_core`] and converts results back into JSON values. A rejected argument never
//! reaches the wrapped structure.
//!
//! ```rust
//! use buffer_core_host::HostMarkerIndex;
//! use serde_json::json;
//!
//! let mut index = HostMarkerIndex::new();
//! index
//!     .insert(&json!(1), &json!({ "row": 0, "column": 0 }), &json!({ "row": 0, "column": 5 }))
//!     .unwrap();
//! let result = index
//!     .splice(
//!         &json!({ "row": 0, "column": 2 }),
//!         &json!({ "row": 0, "column": 0 }),
//!         &json!({ "row": 0, "column": 3 }),
//!     )
//!     .unwrap();
//! assert_eq!(result["surround"], json!([1]));
//! ```
//!
//! # Module Description
//!
//! - [`convert`] - value ⇄ point / range / change conversions
//! - [`marker_index`] - [`HostMarkerIndex`]
//! - [`patch`] - [`HostPatch`]
//! - [`error`] - [`HostError`]

pub mod convert;
pub mod error;
pub mod marker_index;
pub mod patch;

pub use error::{HostError, HostResult};
pub use marker_index::HostMarkerIndex;
pub use patch::HostPatch;
