//! Binary encoding of [`Patch`].
//!
//! All integers are little-endian.
//!
//! ```text
//! header:  version: u32 | flags: u32 | change count: u32
//! change:  gap.row: u32 | gap.column: u32
//!          old_extent.row: u32 | old_extent.column: u32
//!          new_extent.row: u32 | new_extent.column: u32
//!          old text | new text
//! text:    tag: u8 (0 = absent, 1 = present) [ length: u32 | length × u16 code units ]
//! ```
//!
//! `flags` bit 0 stores [`PatchOptions::merges_adjacent_changes`]. Changes are written in order;
//! the tree shape is not stored and decoding builds a balanced tree.

use crate::error::DecodeError;
use crate::patch::{Node, Patch, PatchOptions};
use crate::point::Point;
use crate::text::Text;

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

const FLAG_MERGES_ADJACENT_CHANGES: u32 = 1;

const TEXT_ABSENT: u8 = 0;
const TEXT_PRESENT: u8 = 1;

/// Smallest possible encoded change: three points plus two absent-text tags.
const MIN_CHANGE_LEN: usize = 6 * 4 + 2;

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_point(buf: &mut Vec<u8>, point: Point) {
    write_u32(buf, point.row);
    write_u32(buf, point.column);
}

fn write_text(buf: &mut Vec<u8>, text: Option<&Text>) {
    let Some(text) = text else {
        buf.push(TEXT_ABSENT);
        return;
    };
    buf.push(TEXT_PRESENT);
    let units = text.as_utf16();
    write_u32(buf, units.len() as u32);
    for unit in units {
        buf.extend_from_slice(&unit.to_le_bytes());
    }
}

/// Bounds-checked reader over an encoded buffer.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::Truncated { needed, remaining });
        }
        let bytes = &self.data[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_point(&mut self) -> Result<Point, DecodeError> {
        let row = self.read_u32()?;
        let column = self.read_u32()?;
        Ok(Point::new(row, column))
    }

    fn read_text(&mut self) -> Result<Option<Text>, DecodeError> {
        match self.read_u8()? {
            TEXT_ABSENT => Ok(None),
            TEXT_PRESENT => {
                let len = self.read_u32()? as usize;
                let needed = len
                    .checked_mul(2)
                    .ok_or(DecodeError::Malformed("text length overflows"))?;
                let units = self
                    .take(needed)?
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                Ok(Some(Text::from_utf16(units)))
            }
            _ => Err(DecodeError::Malformed("unknown text tag")),
        }
    }
}

fn read_change(reader: &mut Reader<'_>) -> Result<Box<Node>, DecodeError> {
    let gap = reader.read_point()?;
    let old_extent = reader.read_point()?;
    let new_extent = reader.read_point()?;
    let old_text = reader.read_text()?;
    let new_text = reader.read_text()?;

    if old_extent.is_zero() && new_extent.is_zero() {
        return Err(DecodeError::Malformed("change replaces nothing with nothing"));
    }
    if old_text.as_ref().is_some_and(|text| text.extent() != old_extent) {
        return Err(DecodeError::Malformed("old text does not match its extent"));
    }
    if new_text.as_ref().is_some_and(|text| text.extent() != new_extent) {
        return Err(DecodeError::Malformed("new text does not match its extent"));
    }
    Ok(Node::new(gap, old_extent, new_extent, old_text, new_text, 0))
}

fn decode(bytes: &[u8]) -> Result<Patch, DecodeError> {
    let mut reader = Reader::new(bytes);
    let version = reader.read_u32()?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let flags = reader.read_u32()?;
    if flags & !FLAG_MERGES_ADJACENT_CHANGES != 0 {
        return Err(DecodeError::Malformed("unknown flag bits"));
    }
    let options = PatchOptions {
        merges_adjacent_changes: flags & FLAG_MERGES_ADJACENT_CHANGES != 0,
    };

    let declared = reader.read_u32()? as usize;
    let mut nodes = Vec::with_capacity(declared.min(reader.remaining() / MIN_CHANGE_LEN));
    for _ in 0..declared {
        nodes.push(read_change(&mut reader)?);
    }
    if reader.remaining() > 0 {
        return Err(DecodeError::TrailingBytes(reader.remaining()));
    }
    Ok(Patch::from_nodes(options, nodes))
}

impl Patch {
    /// Encode the patch into a self-contained byte buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12 + self.get_change_count() * MIN_CHANGE_LEN);
        write_u32(&mut buf, FORMAT_VERSION);
        let flags = if self.options().merges_adjacent_changes {
            FLAG_MERGES_ADJACENT_CHANGES
        } else {
            0
        };
        write_u32(&mut buf, flags);
        write_u32(&mut buf, self.get_change_count() as u32);
        self.for_each_node(|node| {
            write_point(&mut buf, node.gap);
            write_point(&mut buf, node.old_extent);
            write_point(&mut buf, node.new_extent);
            write_text(&mut buf, node.old_text.as_ref());
            write_text(&mut buf, node.new_text.as_ref());
        });
        buf
    }

    /// Decode a buffer produced by [`Patch::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Patch, DecodeError> {
        decode(bytes).inspect_err(|error| {
            log::debug!("failed to decode patch ({} bytes): {error}", bytes.len());
        })
    }
}
