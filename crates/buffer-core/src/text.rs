//! Owned UTF-16 text payloads.
//!
//! Patches may retain the text they replaced and the text they inserted. The payload is kept as
//! UTF-16 code units because row/column extents are measured in code units per line.

use crate::point::Point;
use std::fmt;

const NEWLINE: u16 = b'\n' as u16;

/// An immutable-by-convention sequence of UTF-16 code units.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Text {
    units: Vec<u16>,
}

impl Text {
    /// Create an empty text.
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Wrap raw UTF-16 code units.
    pub fn from_utf16(units: Vec<u16>) -> Self {
        Self { units }
    }

    /// The raw code units.
    pub fn as_utf16(&self) -> &[u16] {
        &self.units
    }

    /// Number of code units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if the text holds no code units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The extent covered by this text: newline count and the length of the last line.
    pub fn extent(&self) -> Point {
        let mut row = 0u32;
        let mut last_line_start = 0usize;
        for (offset, &unit) in self.units.iter().enumerate() {
            if unit == NEWLINE {
                row = row.saturating_add(1);
                last_line_start = offset + 1;
            }
        }
        let column = (self.units.len() - last_line_start).min(u32::MAX as usize) as u32;
        Point::new(row, column)
    }

    /// Code unit offset of `extent`, or `None` if it does not land inside the text.
    fn offset_for_extent(&self, extent: Point) -> Option<usize> {
        let mut line_start = 0usize;
        if extent.row > 0 {
            let mut row = 0u32;
            let mut found = false;
            for (offset, &unit) in self.units.iter().enumerate() {
                if unit == NEWLINE {
                    row += 1;
                    if row == extent.row {
                        line_start = offset + 1;
                        found = true;
                        break;
                    }
                }
            }
            if !found {
                return None;
            }
        }

        let line_len = self.units[line_start..]
            .iter()
            .position(|&unit| unit == NEWLINE)
            .unwrap_or(self.units.len() - line_start);
        let column = extent.column as usize;
        (column <= line_len).then_some(line_start + column)
    }

    /// The leading part of the text covering `extent`.
    pub fn prefix(&self, extent: Point) -> Option<Text> {
        let offset = self.offset_for_extent(extent)?;
        Some(Text::from_utf16(self.units[..offset].to_vec()))
    }

    /// The part of the text that follows `extent`.
    pub fn suffix(&self, extent: Point) -> Option<Text> {
        let offset = self.offset_for_extent(extent)?;
        Some(Text::from_utf16(self.units[offset..].to_vec()))
    }

    /// Append another text.
    pub fn push_text(&mut self, other: &Text) {
        self.units.extend_from_slice(&other.units);
    }

    /// Decode to a `String`, replacing unpaired surrogates.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Self {
            units: value.encode_utf16().collect(),
        }
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Text::from(value.as_str())
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}
