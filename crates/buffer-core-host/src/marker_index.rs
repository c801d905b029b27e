//! Host wrapper around [`MarkerIndex`].

use crate::convert::{
    id_from_value, ids_to_value, point_from_value, point_to_value, range_from_value,
    range_to_value, ranges_to_value,
};
use crate::error::{HostError, HostResult};
use buffer_core::{MarkerIndex, MarkerIndexError, Point, Range};
use serde_json::{Value, json};
use std::cmp::Ordering;

/// Query window: either `(range, null)`, `(point, null)` or `(point, point)`.
fn window_from_values(start: &Value, end: &Value) -> HostResult<(Point, Point)> {
    if end.is_null() {
        if start.get("start").is_some() {
            let range = range_from_value(start, "range")?;
            return Ok((range.start, range.end));
        }
        let point = point_from_value(start, "start")?;
        return Ok((point, point));
    }
    Ok((point_from_value(start, "start")?, point_from_value(end, "end")?))
}

/// [`MarkerIndex`] taking and returning JSON values.
#[derive(Debug, Clone, Default)]
pub struct HostMarkerIndex {
    index: MarkerIndex,
}

impl HostMarkerIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with a reproducible tree shape.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            index: MarkerIndex::with_seed(seed),
        }
    }

    /// The wrapped index.
    pub fn inner(&self) -> &MarkerIndex {
        &self.index
    }

    /// Add a marker. Re-inserting an existing id is ignored.
    pub fn insert(&mut self, id: &Value, start: &Value, end: &Value) -> HostResult<()> {
        let id = id_from_value(id)?;
        let start = point_from_value(start, "start")?;
        let end = point_from_value(end, "end")?;
        match self.index.insert(id, start, end) {
            Ok(()) => Ok(()),
            Err(MarkerIndexError::DuplicateId(id)) => {
                log::debug!("ignoring duplicate insert of marker {id}");
                Ok(())
            }
            Err(error) => Err(HostError::type_error(error.to_string())),
        }
    }

    /// Returns `true` if the marker exists.
    pub fn has(&self, id: &Value) -> HostResult<bool> {
        Ok(self.index.has(id_from_value(id)?))
    }

    /// Remove a marker. Returns `false` if it did not exist.
    pub fn remove(&mut self, id: &Value) -> HostResult<bool> {
        Ok(self.index.remove(id_from_value(id)?))
    }

    /// Set both endpoints of a marker exclusive (or not).
    pub fn set_exclusive(&mut self, id: &Value, exclusive: &Value) -> HostResult<()> {
        let id = id_from_value(id)?;
        let exclusive = exclusive
            .as_bool()
            .ok_or_else(|| {
                HostError::type_error(format!("exclusive must be a boolean, got {exclusive}"))
            })?;
        self.index.set_exclusive(id, exclusive);
        Ok(())
    }

    /// `-1`, `0` or `1` ordering markers by start then end. Unknown markers compare as an empty
    /// range at the origin.
    pub fn compare(&self, a: &Value, b: &Value) -> HostResult<i32> {
        let range = |id: &Value| -> HostResult<Range> {
            Ok(self.index.get_range(id_from_value(id)?).unwrap_or_default())
        };
        let (a, b) = (range(a)?, range(b)?);
        Ok(match a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        })
    }

    /// Start of a marker, or `null`.
    pub fn get_start(&self, id: &Value) -> HostResult<Value> {
        let id = id_from_value(id)?;
        Ok(self.index.get_start(id).map_or(Value::Null, point_to_value))
    }

    /// End of a marker, or `null`.
    pub fn get_end(&self, id: &Value) -> HostResult<Value> {
        let id = id_from_value(id)?;
        Ok(self.index.get_end(id).map_or(Value::Null, point_to_value))
    }

    /// Range of a marker, or `null`.
    pub fn get_range(&self, id: &Value) -> HostResult<Value> {
        let id = id_from_value(id)?;
        Ok(self.index.get_range(id).map_or(Value::Null, range_to_value))
    }

    /// Ids of markers intersecting the window.
    pub fn find_intersecting(&self, start: &Value, end: &Value) -> HostResult<Value> {
        let (start, end) = window_from_values(start, end)?;
        Ok(ids_to_value(&self.index.find_intersecting(start, end)))
    }

    /// Ids of markers containing the window.
    pub fn find_containing(&self, start: &Value, end: &Value) -> HostResult<Value> {
        let (start, end) = window_from_values(start, end)?;
        Ok(ids_to_value(&self.index.find_containing(start, end)))
    }

    /// Ids of markers contained in the window.
    pub fn find_contained_in(&self, start: &Value, end: &Value) -> HostResult<Value> {
        let (start, end) = window_from_values(start, end)?;
        Ok(ids_to_value(&self.index.find_contained_in(start, end)))
    }

    /// Ids of markers starting in the window.
    pub fn find_starting_in(&self, start: &Value, end: &Value) -> HostResult<Value> {
        let (start, end) = window_from_values(start, end)?;
        Ok(ids_to_value(&self.index.find_starting_in(start, end)))
    }

    /// Ids of markers starting at a point.
    pub fn find_starting_at(&self, position: &Value) -> HostResult<Value> {
        let position = point_from_value(position, "position")?;
        Ok(ids_to_value(&self.index.find_starting_at(position)))
    }

    /// Ids of markers ending in the window.
    pub fn find_ending_in(&self, start: &Value, end: &Value) -> HostResult<Value> {
        let (start, end) = window_from_values(start, end)?;
        Ok(ids_to_value(&self.index.find_ending_in(start, end)))
    }

    /// Ids of markers ending at a point.
    pub fn find_ending_at(&self, position: &Value) -> HostResult<Value> {
        let position = point_from_value(position, "position")?;
        Ok(ids_to_value(&self.index.find_ending_at(position)))
    }

    /// `{containingStart, boundaries: [{position, starting, ending}]}` from `start` onwards.
    pub fn find_boundaries_after(&self, start: &Value, max_count: &Value) -> HostResult<Value> {
        let start = point_from_value(start, "start")?;
        let max_count = max_count
            .as_u64()
            .ok_or_else(|| {
                HostError::type_error(format!(
                    "maxCount must be a non-negative integer, got {max_count}"
                ))
            })?;
        let query = self
            .index
            .find_boundaries_after(start, usize::try_from(max_count).unwrap_or(usize::MAX));
        let boundaries: Vec<Value> = query
            .boundaries
            .iter()
            .map(|boundary| {
                json!({
                    "position": point_to_value(boundary.position),
                    "starting": ids_to_value(&boundary.starting),
                    "ending": ids_to_value(&boundary.ending),
                })
            })
            .collect();
        Ok(json!({
            "containingStart": query.containing_start,
            "boundaries": boundaries,
        }))
    }

    /// Apply an edit; returns `{touch, inside, overlap, surround}` id arrays.
    pub fn splice(
        &mut self,
        start: &Value,
        old_extent: &Value,
        new_extent: &Value,
    ) -> HostResult<Value> {
        let start = point_from_value(start, "start")?;
        let old_extent = point_from_value(old_extent, "oldExtent")?;
        let new_extent = point_from_value(new_extent, "newExtent")?;
        let result = self.index.splice(start, old_extent, new_extent);
        Ok(json!({
            "touch": ids_to_value(&result.touch),
            "inside": ids_to_value(&result.inside),
            "overlap": ids_to_value(&result.overlap),
            "surround": ids_to_value(&result.surround),
        }))
    }

    /// Every marker's range, keyed by decimal id.
    pub fn dump(&self) -> Value {
        ranges_to_value(&self.index.dump())
    }
}
