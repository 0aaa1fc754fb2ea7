// SPDX-License-Identifier: LGPL-3.0-or-later OR MPL-2.0
// This file is a part of `glyph-pager`.
//
// `glyph-pager` is free software: you can redistribute it and/or modify it under the
// terms of either:
//
// * GNU Lesser General Public License as published by the Free Software Foundation, either
//   version 3 of the License, or (at your option) any later version.
// * Mozilla Public License as published by the Mozilla Foundation, version 2.
//
// `glyph-pager` is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR
// PURPOSE. See the GNU Lesser General Public License or the Mozilla Public License for more
// details.
//
// You should have received a copy of the GNU Lesser General Public License and the Mozilla
// Public License along with `glyph-pager`. If not, see <https://www.gnu.org/licenses/>.

//! The list of free space in the texture pages of a font.
//!
//! Every page is split into rows of the same height, and rows are split into slots of
//! varying width. After loading three glyphs, the first page looks like this:
//!
//! ```text
//! +---+---+---+---------------------+
//! | A | B | C |  free space row 0   |
//! +---+---+---+---------------------+
//! | free space row 1                |
//! +---------------------------------+
//! ```
//!
//! Releasing `B` frees a small hole between `A` and `C`. Releasing `C` afterwards merges the
//! hole, `C` and the rest of the row into one entry again. The list is kept sorted by
//! `(texture, row, x)`, so only the direct neighbors of an entry ever need to be checked.

use std::cmp::Ordering;
use std::slice;

/// A horizontal run of pixels in one row of one texture page.
///
/// This describes both the space occupied by a glyph and unallocated space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphSlot {
    /// The index of the page.
    pub texture_id: u32,

    /// The row within the page.
    pub row: u32,

    /// The first column of the slot.
    pub x_offset: u32,

    /// The number of columns, including padding.
    pub width: u32,
}

impl GlyphSlot {
    /// The column just past the end of this slot.
    pub fn end(&self) -> u32 {
        self.x_offset + self.width
    }

    /// Whether the two slots share any pixels.
    pub fn overlaps(&self, other: &GlyphSlot) -> bool {
        self.texture_id == other.texture_id
            && self.row == other.row
            && self.x_offset < other.end()
            && other.x_offset < self.end()
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.texture_id, self.row, self.x_offset)
    }
}

impl PartialOrd for GlyphSlot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GlyphSlot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key()
            .cmp(&other.key())
            .then(self.width.cmp(&other.width))
    }
}

/// Free space, sorted by position and maximally coalesced.
#[derive(Debug, Default, Clone)]
pub(crate) struct FreeSpaceList {
    entries: Vec<GlyphSlot>,
}

impl FreeSpaceList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add the rows of a freshly created page.
    ///
    /// Returns the index of the first entry that was added.
    pub(crate) fn push_page(&mut self, texture_id: u32, size: u32, row_height: u32) -> usize {
        debug_assert!(self
            .entries
            .last()
            .map_or(true, |last| last.texture_id < texture_id));

        let start = self.entries.len();
        let rows = if row_height == 0 { 0 } else { size / row_height };
        self.entries.extend((0..rows).map(|row| GlyphSlot {
            texture_id,
            row,
            x_offset: 0,
            width: size,
        }));

        start
    }

    /// Carve `width` columns out of the first entry, at or after `start`, that is wide
    /// enough.
    ///
    /// The front of the entry is handed out and the rest stays free.
    pub(crate) fn find_fit(&mut self, width: u32, start: usize) -> Option<GlyphSlot> {
        let index = start
            + self
                .entries
                .get(start..)?
                .iter()
                .position(|entry| entry.width >= width)?;

        let entry = &mut self.entries[index];
        if entry.width == width {
            return Some(self.entries.remove(index));
        }

        let slot = GlyphSlot { width, ..*entry };
        entry.x_offset += width;
        entry.width -= width;
        Some(slot)
    }

    /// Return a slot to the free list, merging it with its neighbors.
    ///
    /// # Panics
    ///
    /// Panics if the slot overlaps free space, which means it was freed twice or was never
    /// allocated.
    pub(crate) fn insert(&mut self, slot: GlyphSlot) {
        debug_assert!(slot.width > 0, "zero-width slot cannot be freed");

        let key = slot.key();
        let k = self.entries.partition_point(|entry| entry.key() <= key);

        // ... [k - 1] [k] ...
        //            ^
        //          insert
        let merge_left = k > 0 && can_merge(&self.entries[k - 1], &slot);
        let merge_right = k < self.entries.len() && can_merge(&slot, &self.entries[k]);

        match (merge_left, merge_right) {
            (true, true) => {
                let right = self.entries.remove(k);
                let left = &mut self.entries[k - 1];
                left.width = right.end() - left.x_offset;
            }
            (true, false) => {
                self.entries[k - 1].width += slot.width;
            }
            (false, true) => {
                let right = &mut self.entries[k];
                right.x_offset = slot.x_offset;
                right.width += slot.width;
            }
            (false, false) => self.entries.insert(k, slot),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter(&self) -> slice::Iter<'_, GlyphSlot> {
        self.entries.iter()
    }

    /// The sum of all free widths.
    pub(crate) fn total_width(&self) -> u64 {
        self.entries.iter().map(|entry| entry.width as u64).sum()
    }

    /// The free width in one row of one page.
    pub(crate) fn row_free_width(&self, texture_id: u32, row: u32) -> u32 {
        self.entries
            .iter()
            .filter(|entry| entry.texture_id == texture_id && entry.row == row)
            .map(|entry| entry.width)
            .sum()
    }
}

/// Whether `right` starts exactly where `left` ends.
fn can_merge(left: &GlyphSlot, right: &GlyphSlot) -> bool {
    if left.texture_id != right.texture_id || left.row != right.row {
        return false;
    }

    if left.end() > right.x_offset {
        panic!("free space overlaps: {left:?} and {right:?}");
    }

    left.end() == right.x_offset
}
