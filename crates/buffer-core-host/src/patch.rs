//! Host wrapper around [`Patch`].

use crate::convert::{
    change_to_value, changes_to_value, patch_options_from_value, point_from_value,
    text_from_value, tree_layout_to_value,
};
use crate::error::HostResult;
use buffer_core::Patch;
use serde_json::Value;

/// [`Patch`] taking and returning JSON values.
#[derive(Debug, Clone, Default)]
pub struct HostPatch {
    patch: Patch,
}

impl From<Patch> for HostPatch {
    fn from(patch: Patch) -> Self {
        Self { patch }
    }
}

impl HostPatch {
    /// Create an empty patch from an options record such as `{mergeAdjacentChanges: false}`.
    /// `null` selects the defaults.
    pub fn new(options: &Value) -> HostResult<Self> {
        Ok(Patch::with_options(patch_options_from_value(options)?).into())
    }

    /// The wrapped patch.
    pub fn inner(&self) -> &Patch {
        &self.patch
    }

    /// Record a new-space edit. Texts may be strings, `null` or omitted.
    pub fn splice(
        &mut self,
        start: &Value,
        deletion_extent: &Value,
        insertion_extent: &Value,
        deleted_text: Option<&Value>,
        inserted_text: Option<&Value>,
    ) -> HostResult<()> {
        let start = point_from_value(start, "start")?;
        let deletion_extent = point_from_value(deletion_extent, "deletionExtent")?;
        let insertion_extent = point_from_value(insertion_extent, "insertionExtent")?;
        let deleted_text = text_from_value(deleted_text, "deletedText")?;
        let inserted_text = text_from_value(inserted_text, "insertedText")?;
        self.patch.splice(
            start,
            deletion_extent,
            insertion_extent,
            deleted_text,
            inserted_text,
        )?;
        Ok(())
    }

    /// Record an old-space edit.
    pub fn splice_old(
        &mut self,
        start: &Value,
        deletion_extent: &Value,
        insertion_extent: &Value,
    ) -> HostResult<()> {
        let start = point_from_value(start, "start")?;
        let deletion_extent = point_from_value(deletion_extent, "deletionExtent")?;
        let insertion_extent = point_from_value(insertion_extent, "insertionExtent")?;
        self.patch.splice_old(start, deletion_extent, insertion_extent);
        Ok(())
    }

    /// All changes as an array of change records.
    pub fn get_changes(&self) -> Value {
        changes_to_value(&self.patch.get_changes())
    }

    /// Changes overlapping an old-space window.
    pub fn get_changes_in_old_range(&self, start: &Value, end: &Value) -> HostResult<Value> {
        let start = point_from_value(start, "start")?;
        let end = point_from_value(end, "end")?;
        Ok(changes_to_value(&self.patch.grab_changes_in_old_range(start, end)))
    }

    /// Changes overlapping a new-space window.
    pub fn get_changes_in_new_range(&self, start: &Value, end: &Value) -> HostResult<Value> {
        let start = point_from_value(start, "start")?;
        let end = point_from_value(end, "end")?;
        Ok(changes_to_value(&self.patch.grab_changes_in_new_range(start, end)))
    }

    /// The last change starting at or before an old-space position, or `null`.
    pub fn change_for_old_position(&self, position: &Value) -> HostResult<Value> {
        let position = point_from_value(position, "position")?;
        Ok(self
            .patch
            .grab_change_starting_before_old_position(position)
            .map_or(Value::Null, |change| change_to_value(&change)))
    }

    /// The last change starting at or before a new-space position, or `null`.
    pub fn change_for_new_position(&self, position: &Value) -> HostResult<Value> {
        let position = point_from_value(position, "position")?;
        Ok(self
            .patch
            .grab_change_starting_before_new_position(position)
            .map_or(Value::Null, |change| change_to_value(&change)))
    }

    /// An independent copy.
    pub fn copy(&self) -> HostPatch {
        self.patch.copy().into()
    }

    /// The patch undoing this one.
    pub fn invert(&self) -> HostPatch {
        self.patch.invert().into()
    }

    /// Number of changes.
    pub fn get_change_count(&self) -> usize {
        self.patch.get_change_count()
    }

    /// The change spanning every change, or `null`.
    pub fn get_bounds(&self) -> Value {
        self.patch
            .get_bounds()
            .map_or(Value::Null, |change| change_to_value(&change))
    }

    /// Rebuild the tree balanced.
    pub fn rebalance(&mut self) {
        self.patch.rebalance();
    }

    /// Fold patches into one, alternating direction at every step.
    pub fn compose(patches: &[HostPatch]) -> HostResult<HostPatch> {
        Ok(Patch::compose(patches.iter().map(HostPatch::inner))?.into())
    }

    /// Encode into bytes.
    pub fn serialize(&self) -> Vec<u8> {
        self.patch.serialize()
    }

    /// Decode bytes produced by [`HostPatch::serialize`].
    pub fn deserialize(bytes: &[u8]) -> HostResult<HostPatch> {
        Ok(Patch::deserialize(bytes)?.into())
    }

    /// Tree shape with absolute positions, for debugging.
    pub fn get_json(&self) -> Value {
        tree_layout_to_value(self.patch.tree_layout().as_ref())
    }
}
