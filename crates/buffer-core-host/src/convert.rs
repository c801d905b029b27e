//! Conversions between loosely-typed host values and `buffer-core` types.
//!
//! Points arrive as objects with numeric `row` and `column` members. A coordinate may also be
//! the string `"Infinity"` (or any number too large for `u32`), which maps to the saturating
//! maximum. Points leave as `{row, column}` with plain integers, so the maximum comes back as
//! `4294967295`.

use crate::error::{HostError, HostResult};
use buffer_core::{Change, MarkerId, Point, PatchOptions, Range, Text, TreeLayout};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};

fn coordinate_from_value(value: &Value, what: &str) -> HostResult<u32> {
    match value {
        Value::Number(number) => {
            if let Some(n) = number.as_u64() {
                return Ok(u32::try_from(n).unwrap_or(u32::MAX));
            }
            match number.as_f64() {
                Some(n) if n >= 0.0 && n.fract() == 0.0 => {
                    Ok(if n >= u32::MAX as f64 { u32::MAX } else { n as u32 })
                }
                _ => Err(HostError::type_error(format!(
                    "{what}: Expected a non-negative integer value, got {number}"
                ))),
            }
        }
        Value::String(text) if text == "Infinity" => Ok(u32::MAX),
        other => Err(HostError::type_error(format!(
            "{what}: Expected a non-negative integer value, got {other}"
        ))),
    }
}

/// Read a `{row, column}` object.
pub fn point_from_value(value: &Value, name: &str) -> HostResult<Point> {
    let (Some(row), Some(column)) = (value.get("row"), value.get("column")) else {
        return Err(HostError::type_error(format!(
            "{name}: Expected an object with 'row' and 'column' properties."
        )));
    };
    Ok(Point::new(
        coordinate_from_value(row, &format!("{name}.row"))?,
        coordinate_from_value(column, &format!("{name}.column"))?,
    ))
}

/// Read a `{start, end}` object of points.
pub fn range_from_value(value: &Value, name: &str) -> HostResult<Range> {
    let (Some(start), Some(end)) = (value.get("start"), value.get("end")) else {
        return Err(HostError::type_error(format!(
            "{name}: Expected an object with 'start' and 'end' properties."
        )));
    };
    Ok(Range {
        start: point_from_value(start, &format!("{name}.start"))?,
        end: point_from_value(end, &format!("{name}.end"))?,
    })
}

/// Read a marker id: a non-negative integer that fits in `u32`.
pub fn id_from_value(value: &Value) -> HostResult<MarkerId> {
    let id = match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                .map(|n| n as u64)
        }),
        _ => None,
    };
    id.and_then(|id| MarkerId::try_from(id).ok())
        .ok_or_else(|| {
            HostError::type_error(format!("id: Expected a non-negative integer value, got {value}"))
        })
}

/// Read optional text: `null` or a missing argument means "not retained".
pub fn text_from_value(value: Option<&Value>, name: &str) -> HostResult<Option<Text>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(Text::from(text.as_str()))),
        Some(other) => Err(HostError::type_error(format!(
            "{name} must be a string or null, got {other}"
        ))),
    }
}

/// A point as it crosses the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointRecord {
    /// Zero-based row.
    pub row: u32,
    /// Zero-based column.
    pub column: u32,
}

impl From<Point> for PointRecord {
    fn from(point: Point) -> Self {
        Self {
            row: point.row,
            column: point.column,
        }
    }
}

/// Write a point as `{row, column}`.
pub fn point_to_value(point: Point) -> Value {
    json!(PointRecord::from(point))
}

/// Write a range as `{start, end}`.
pub fn range_to_value(range: Range) -> Value {
    json!({ "start": point_to_value(range.start), "end": point_to_value(range.end) })
}

/// Write a set of ids as an ascending array.
pub fn ids_to_value(ids: &HashSet<MarkerId>) -> Value {
    let mut ids: Vec<MarkerId> = ids.iter().copied().collect();
    ids.sort_unstable();
    json!(ids)
}

/// Write a range snapshot as an object keyed by decimal id.
pub fn ranges_to_value(ranges: &HashMap<MarkerId, Range>) -> Value {
    let mut ids: Vec<MarkerId> = ranges.keys().copied().collect();
    ids.sort_unstable();
    let map: Map<String, Value> = ids
        .into_iter()
        .filter_map(|id| Some((id.to_string(), range_to_value(*ranges.get(&id)?))))
        .collect();
    Value::Object(map)
}

/// A patch change as it crosses the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Start in the old document.
    pub old_start: PointRecord,
    /// End in the old document.
    pub old_end: PointRecord,
    /// Start in the new document.
    pub new_start: PointRecord,
    /// End in the new document.
    pub new_end: PointRecord,
    /// Replaced text, when retained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_text: Option<String>,
    /// Replacement text, when retained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_text: Option<String>,
}

impl From<&Change> for ChangeRecord {
    fn from(change: &Change) -> Self {
        Self {
            old_start: change.old_start.into(),
            old_end: change.old_end.into(),
            new_start: change.new_start.into(),
            new_end: change.new_end.into(),
            old_text: change.old_text.as_ref().map(Text::to_string_lossy),
            new_text: change.new_text.as_ref().map(Text::to_string_lossy),
        }
    }
}

/// Write a change as a camelCase record.
pub fn change_to_value(change: &Change) -> Value {
    serde_json::to_value(ChangeRecord::from(change)).unwrap_or(Value::Null)
}

/// Write a sequence of changes as an array.
pub fn changes_to_value(changes: &[Change]) -> Value {
    Value::Array(changes.iter().map(change_to_value).collect())
}

/// Options record accepted by the patch constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatchOptionsRecord {
    /// Combine changes whose boundaries touch.
    pub merge_adjacent_changes: bool,
}

impl Default for PatchOptionsRecord {
    fn default() -> Self {
        Self {
            merge_adjacent_changes: true,
        }
    }
}

impl From<PatchOptionsRecord> for PatchOptions {
    fn from(record: PatchOptionsRecord) -> Self {
        PatchOptions {
            merges_adjacent_changes: record.merge_adjacent_changes,
        }
    }
}

/// Read the patch options record; `null` selects the defaults.
pub fn patch_options_from_value(value: &Value) -> HostResult<PatchOptions> {
    if value.is_null() {
        return Ok(PatchOptions::default());
    }
    serde_json::from_value::<PatchOptionsRecord>(value.clone())
        .map(PatchOptions::from)
        .map_err(|error| HostError::type_error(format!("invalid patch options: {error}")))
}

/// Write the tree shape as nested `{oldStart, oldEnd, newStart, newEnd, left, right}` objects.
pub fn tree_layout_to_value(layout: Option<&TreeLayout>) -> Value {
    let Some(layout) = layout else {
        return Value::Null;
    };
    json!({
        "oldStart": point_to_value(layout.old_start),
        "oldEnd": point_to_value(layout.old_end),
        "newStart": point_to_value(layout.new_start),
        "newEnd": point_to_value(layout.new_end),
        "left": tree_layout_to_value(layout.left.as_deref()),
        "right": tree_layout_to_value(layout.right.as_deref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_point_from_value() {
        assert_eq!(
            point_from_value(&json!({ "row": 2, "column": 7 }), "p").unwrap(),
            Point::new(2, 7)
        );
        assert_eq!(
            point_from_value(&json!({ "row": 1.0, "column": "Infinity" }), "p").unwrap(),
            Point::new(1, u32::MAX)
        );
        assert_eq!(
            point_from_value(&json!({ "row": 1e12, "column": 5_000_000_000u64 }), "p").unwrap(),
            Point::MAX
        );
    }

    #[test]
    fn test_point_from_value_rejects_bad_shapes() {
        for value in [
            json!(null),
            json!([1, 2]),
            json!({ "row": 1 }),
            json!({ "row": -1, "column": 0 }),
            json!({ "row": 1.5, "column": 0 }),
            json!({ "row": "1", "column": 0 }),
        ] {
            assert!(matches!(
                point_from_value(&value, "p"),
                Err(HostError::Type(_))
            ));
        }
    }

    #[test]
    fn test_type_error_messages() {
        assert_eq!(
            point_from_value(&json!({ "row": 1 }), "start").unwrap_err().to_string(),
            "start: Expected an object with 'row' and 'column' properties."
        );
        assert_eq!(
            id_from_value(&json!(-1)).unwrap_err().to_string(),
            "id: Expected a non-negative integer value, got -1"
        );
    }

    #[test]
    fn test_points_go_out_as_records() {
        assert_eq!(
            point_to_value(Point::new(3, 9)),
            json!({ "row": 3, "column": 9 })
        );
        assert_eq!(
            point_to_value(Point::MAX),
            json!({ "row": 4294967295u32, "column": 4294967295u32 })
        );
        assert_eq!(
            range_to_value(Range::new(Point::ZERO, Point::new(0, 2))),
            json!({ "start": { "row": 0, "column": 0 }, "end": { "row": 0, "column": 2 } })
        );
    }

    #[test]
    fn test_id_from_value() {
        assert_eq!(id_from_value(&json!(42)).unwrap(), 42);
        assert_eq!(id_from_value(&json!(3.0)).unwrap(), 3);
        assert!(id_from_value(&json!(-1)).is_err());
        assert!(id_from_value(&json!(2.5)).is_err());
        assert!(id_from_value(&json!(5_000_000_000u64)).is_err());
        assert!(id_from_value(&json!("7")).is_err());
    }

    #[test]
    fn test_change_record_uses_camel_case_and_omits_missing_text() {
        let change = Change {
            old_start: Point::new(0, 1),
            old_end: Point::new(0, 2),
            new_start: Point::new(0, 1),
            new_end: Point::new(0, 4),
            old_text: None,
            new_text: Some(Text::from("abc")),
        };
        assert_eq!(
            change_to_value(&change),
            json!({
                "oldStart": { "row": 0, "column": 1 },
                "oldEnd": { "row": 0, "column": 2 },
                "newStart": { "row": 0, "column": 1 },
                "newEnd": { "row": 0, "column": 4 },
                "newText": "abc",
            })
        );
    }

    #[test]
    fn test_patch_options_defaults() {
        assert!(patch_options_from_value(&json!(null)).unwrap().merges_adjacent_changes);
        assert!(patch_options_from_value(&json!({})).unwrap().merges_adjacent_changes);
        assert!(
            !patch_options_from_value(&json!({ "mergeAdjacentChanges": false }))
                .unwrap()
                .merges_adjacent_changes
        );
        assert!(patch_options_from_value(&json!({ "mergeAdjacentChanges": 1 })).is_err());
    }

    #[test]
    fn test_ids_and_ranges_are_sorted() {
        let ids: HashSet<MarkerId> = [9, 2, 5].into_iter().collect();
        assert_eq!(ids_to_value(&ids), json!([2, 5, 9]));

        let ranges: HashMap<MarkerId, Range> = [
            (10, Range::new(Point::new(0, 0), Point::new(0, 1))),
            (2, Range::new(Point::new(1, 0), Point::new(1, 1))),
        ]
        .into_iter()
        .collect();
        let value = ranges_to_value(&ranges);
        assert_eq!(value["2"]["start"], json!({ "row": 1, "column": 0 }));
        assert_eq!(value["10"]["end"], json!({ "row": 0, "column": 1 }));
    }
}
