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

//! Shaped strings and the geometry needed to draw them.

use super::allocator::PADDING;
use super::free_list::GlyphSlot;
use super::gpu_backend::Vertex;

use piet::kurbo::{Point, Rect};

/// Identifies one font object for as long as it lives.
///
/// A font object that is evicted and then created again gets a new identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub(crate) u64);

/// A reference to one glyph in the atlas.
///
/// Every `ShapedGlyph` handed out holds a reference that must be given back with
/// `release` once the draw using it is retired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    /// The font object the glyph lives in.
    pub font: FontId,

    /// The character of the glyph that was handed out.
    ///
    /// This is U+FFFD if the requested character could not be loaded.
    pub character: char,

    /// The space in the atlas, including padding.
    pub slot: GlyphSlot,

    /// The horizontal advance in pixels.
    pub advance: f32,
}

/// A string turned into glyphs of one font.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub(crate) font: FontId,
    pub(crate) glyphs: Vec<ShapedGlyph>,
    pub(crate) page_size: u32,
    pub(crate) row_height: u32,
}

/// The geometry of every glyph in a run that lives on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageBatch {
    /// The page to bind while drawing.
    pub texture_id: u32,

    /// Four vertices per glyph.
    pub vertices: Vec<Vertex>,

    /// Two triangles per glyph.
    pub indices: Vec<u32>,
}

impl TextRun {
    /// The font object the glyphs live in.
    pub fn font(&self) -> FontId {
        self.font
    }

    /// The glyphs, in string order.
    pub fn glyphs(&self) -> &[ShapedGlyph] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// The total advance of the run.
    pub fn width(&self) -> f32 {
        self.glyphs.iter().map(|glyph| glyph.advance).sum()
    }

    /// The height of one line, padding included.
    pub fn height(&self) -> u32 {
        self.row_height
    }

    /// The normalized texture coordinates of a glyph's slot, padding included.
    pub fn uv_rect(&self, glyph: &ShapedGlyph) -> Rect {
        let size = self.page_size as f64;
        let slot = &glyph.slot;
        let top = (slot.row * self.row_height) as f64;

        Rect::new(
            slot.x_offset as f64 / size,
            top / size,
            slot.end() as f64 / size,
            (top + self.row_height as f64) / size,
        )
    }

    /// Build the quads for drawing the run with its top left corner at `origin`.
    ///
    /// Quads are grouped by page, so that each page needs a single draw call. Pages are
    /// returned in ascending order.
    pub fn batches(&self, origin: Point, color: piet::Color) -> Vec<PageBatch> {
        let (r, g, b, a) = color.as_rgba8();
        let color = [r, g, b, a];
        let cast = |x: f64| x as f32;

        let mut batches: Vec<PageBatch> = Vec::new();
        let mut pen = origin.x;

        for glyph in &self.glyphs {
            let texture_id = glyph.slot.texture_id;
            let index = match batches.binary_search_by_key(&texture_id, |b| b.texture_id) {
                Ok(index) => index,
                Err(index) => {
                    batches.insert(
                        index,
                        PageBatch {
                            texture_id,
                            ..PageBatch::default()
                        },
                    );
                    index
                }
            };
            let batch = &mut batches[index];

            // The quad includes the padding, so that sampling at the edges stays clean.
            let pos = Rect::new(
                pen - PADDING as f64,
                origin.y,
                pen - PADDING as f64 + glyph.slot.width as f64,
                origin.y + self.row_height as f64,
            );
            let uv = self.uv_rect(glyph);

            let base = batch.vertices.len() as u32;
            batch.vertices.extend([
                Vertex {
                    pos: [cast(pos.x0), cast(pos.y0)],
                    uv: [cast(uv.x0), cast(uv.y0)],
                    color,
                },
                Vertex {
                    pos: [cast(pos.x1), cast(pos.y0)],
                    uv: [cast(uv.x1), cast(uv.y0)],
                    color,
                },
                Vertex {
                    pos: [cast(pos.x1), cast(pos.y1)],
                    uv: [cast(uv.x1), cast(uv.y1)],
                    color,
                },
                Vertex {
                    pos: [cast(pos.x0), cast(pos.y1)],
                    uv: [cast(uv.x0), cast(uv.y1)],
                    color,
                },
            ]);
            batch
                .indices
                .extend([base, base + 1, base + 2, base, base + 2, base + 3]);

            pen += glyph.advance as f64;
        }

        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(texture_id: u32, row: u32, x_offset: u32, width: u32) -> ShapedGlyph {
        ShapedGlyph {
            font: FontId(0),
            character: 'a',
            slot: GlyphSlot {
                texture_id,
                row,
                x_offset,
                width,
            },
            advance: (width - 2) as f32,
        }
    }

    fn run(glyphs: Vec<ShapedGlyph>) -> TextRun {
        TextRun {
            font: FontId(0),
            glyphs,
            page_size: 128,
            row_height: 16,
        }
    }

    #[test]
    fn uv_rect_covers_the_padded_slot() {
        let run = run(vec![glyph(0, 2, 64, 32)]);
        let uv = run.uv_rect(&run.glyphs()[0]);
        assert_eq!(uv, Rect::new(0.5, 0.25, 0.75, 0.375));
    }

    #[test]
    fn width_sums_advances() {
        let run = run(vec![glyph(0, 0, 0, 5), glyph(0, 0, 5, 7)]);
        assert_eq!(run.width(), 8.0);
        assert_eq!(run.len(), 2);
    }

    #[test]
    fn batches_group_by_page() {
        let run = run(vec![glyph(1, 0, 0, 10), glyph(0, 0, 0, 10), glyph(1, 0, 10, 10)]);
        let batches = run.batches(Point::ZERO, piet::Color::WHITE);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].texture_id, 0);
        assert_eq!(batches[0].vertices.len(), 4);
        assert_eq!(batches[1].texture_id, 1);
        assert_eq!(batches[1].vertices.len(), 8);
        assert_eq!(batches[1].indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn quads_follow_the_pen() {
        let run = run(vec![glyph(0, 0, 0, 10), glyph(0, 0, 10, 6)]);
        let batches = run.batches(Point::new(100.0, 50.0), piet::Color::BLACK);
        let vertices = &batches[0].vertices;

        assert_eq!(vertices[0].pos, [99.0, 50.0]);
        assert_eq!(vertices[2].pos, [109.0, 66.0]);

        // The second glyph starts one advance later.
        assert_eq!(vertices[4].pos, [107.0, 50.0]);
        assert_eq!(vertices[4].color, [0, 0, 0, 255]);
    }
}
