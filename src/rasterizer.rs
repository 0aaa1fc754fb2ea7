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

//! Turning characters into coverage bitmaps.

use crate::descriptor::FontDescriptor;

use zeno::{Command, Fill, Mask, PathData, Point};

use std::slice;

/// The character that every font falls back to.
pub const REPLACEMENT_CHARACTER: char = '\u{FFFD}';

/// An 8-bit coverage image of a single glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    /// Width of the image in pixels.
    pub width: u32,

    /// Height of the image in pixels.
    pub height: u32,

    /// The horizontal advance of the glyph in pixels.
    pub advance: f32,

    /// Row-major coverage values, `width * height` long.
    pub data: Vec<u8>,
}

impl GlyphBitmap {
    /// A fully transparent bitmap.
    pub fn empty(width: u32, height: u32, advance: f32) -> Self {
        Self {
            width,
            height,
            advance,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Whether the image holds `width * height` pixels and has a usable advance.
    pub fn is_well_formed(&self) -> bool {
        self.advance.is_finite()
            && self.advance >= 0.0
            && self.data.len() as u64 >= self.width as u64 * self.height as u64
    }

    /// Get the coverage at the given pixel, or zero if it lies outside of the image.
    pub fn coverage(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }

        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .unwrap_or(0)
    }
}

/// Something that can rasterize the glyphs of one font.
pub trait Rasterizer {
    /// Rasterize `character` with an em square of `pixels_per_em` pixels.
    ///
    /// Returns `None` if the font has no glyph for the character.
    fn rasterize(&mut self, character: char, pixels_per_em: u32) -> Option<GlyphBitmap>;

    /// An estimate of how many glyphs the font contains.
    ///
    /// This is used to size the texture pages.
    fn glyph_count(&self) -> usize;
}

impl<R: Rasterizer + ?Sized> Rasterizer for Box<R> {
    fn rasterize(&mut self, character: char, pixels_per_em: u32) -> Option<GlyphBitmap> {
        (**self).rasterize(character, pixels_per_em)
    }

    fn glyph_count(&self) -> usize {
        (**self).glyph_count()
    }
}

/// Creates a rasterizer for a font descriptor.
///
/// This is where the font file matching and loading happens. It is implemented for closures.
pub trait FontLoader {
    /// The rasterizer type being created.
    type Rasterizer: Rasterizer;

    /// Load the font described by `font`.
    fn load(&mut self, font: &FontDescriptor) -> Self::Rasterizer;
}

impl<R: Rasterizer, F: FnMut(&FontDescriptor) -> R> FontLoader for F {
    type Rasterizer = R;

    fn load(&mut self, font: &FontDescriptor) -> Self::Rasterizer {
        (self)(font)
    }
}

/// Draw the box that stands in for U+FFFD when the font doesn't have it.
///
/// The box is half an em wide with a half-transparent one pixel border.
pub fn replacement_box(pixels_per_em: u32) -> GlyphBitmap {
    const EDGE: u8 = 127;

    let width = ((pixels_per_em + 1) / 2).max(1);
    let height = pixels_per_em.max(1);
    let mut bitmap = GlyphBitmap::empty(width, height, width as f32);

    for (y, row) in bitmap.data.chunks_mut(width as usize).enumerate() {
        if y == 0 || y + 1 == height as usize {
            row.fill(EDGE);
        } else {
            row[0] = EDGE;
            row[width as usize - 1] = EDGE;
        }
    }

    bitmap
}

/// The vector outline of a glyph.
///
/// Coordinates are in em units: the em square spans `0.0..=1.0` on both axes with the Y axis
/// pointing down.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphOutline {
    /// The path of the glyph.
    pub commands: Vec<Command>,

    /// The horizontal advance, in em units.
    pub advance: f32,
}

/// A rasterizer that fills outlines provided by a closure, using `zeno`.
pub struct OutlineRasterizer<F> {
    /// Produces the outline for a character.
    outlines: F,

    /// The number of glyphs the outline source reports.
    glyph_count: usize,
}

impl<F: FnMut(char) -> Option<GlyphOutline>> OutlineRasterizer<F> {
    /// Create a new outline rasterizer.
    pub fn new(glyph_count: usize, outlines: F) -> Self {
        Self {
            outlines,
            glyph_count,
        }
    }
}

impl<F: FnMut(char) -> Option<GlyphOutline>> Rasterizer for OutlineRasterizer<F> {
    fn rasterize(&mut self, character: char, pixels_per_em: u32) -> Option<GlyphBitmap> {
        let outline = (self.outlines)(character)?;

        let scale = pixels_per_em as f32;
        let width = (outline.advance * scale).ceil().max(1.0) as u32;
        let height = pixels_per_em.max(1);

        let mut bitmap = GlyphBitmap::empty(width, height, outline.advance * scale);
        Mask::new(ScaledPath {
            commands: &outline.commands,
            scale,
        })
        .size(width, height)
        .style(Fill::NonZero)
        .render_into(&mut bitmap.data, None);

        Some(bitmap)
    }

    fn glyph_count(&self) -> usize {
        self.glyph_count
    }
}

/// Feeds an em-unit path to `zeno` in pixel units.
struct ScaledPath<'a> {
    commands: &'a [Command],
    scale: f32,
}

impl<'a> PathData for ScaledPath<'a> {
    type Commands = ScaledCommands<'a>;

    fn commands(&self) -> Self::Commands {
        ScaledCommands {
            inner: self.commands.iter(),
            scale: self.scale,
        }
    }
}

#[derive(Clone)]
struct ScaledCommands<'a> {
    inner: slice::Iter<'a, Command>,
    scale: f32,
}

impl Iterator for ScaledCommands<'_> {
    type Item = Command;

    fn next(&mut self) -> Option<Self::Item> {
        let scale = self.scale;
        let sc = |p: Point| Point::new(p.x * scale, p.y * scale);

        self.inner.next().map(|command| match *command {
            Command::MoveTo(p) => Command::MoveTo(sc(p)),
            Command::LineTo(p) => Command::LineTo(sc(p)),
            Command::QuadTo(c, p) => Command::QuadTo(sc(c), sc(p)),
            Command::CurveTo(c1, c2, p) => Command::CurveTo(sc(c1), sc(c2), sc(p)),
            Command::Close => Command::Close,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeno::PathBuilder;

    #[test]
    fn replacement_box_has_a_border() {
        let bitmap = replacement_box(10);
        assert_eq!((bitmap.width, bitmap.height), (5, 10));
        assert_eq!(bitmap.advance, 5.0);

        assert_eq!(bitmap.coverage(0, 0), 127);
        assert_eq!(bitmap.coverage(4, 9), 127);
        assert_eq!(bitmap.coverage(0, 5), 127);
        assert_eq!(bitmap.coverage(2, 5), 0);
        assert_eq!(bitmap.coverage(5, 5), 0);
    }

    #[test]
    fn malformed_bitmaps_are_detected() {
        assert!(GlyphBitmap::empty(4, 4, 4.0).is_well_formed());
        assert!(!GlyphBitmap::empty(4, 4, f32::INFINITY).is_well_formed());
        assert!(!GlyphBitmap::empty(4, 4, f32::NAN).is_well_formed());
        assert!(!GlyphBitmap::empty(4, 4, -1.0).is_well_formed());

        let mut short = GlyphBitmap::empty(4, 4, 4.0);
        short.data.truncate(15);
        assert!(!short.is_well_formed());
    }

    #[test]
    fn replacement_box_never_collapses() {
        let bitmap = replacement_box(1);
        assert_eq!((bitmap.width, bitmap.height), (1, 1));
        assert_eq!(bitmap.data, vec![127]);
    }

    #[test]
    fn outline_rasterizer_fills_a_square() {
        let mut rasterizer = OutlineRasterizer::new(1, |ch: char| {
            if ch != 'x' {
                return None;
            }

            let mut commands: Vec<Command> = Vec::new();
            commands
                .move_to([0.0, 0.0])
                .line_to([1.0, 0.0])
                .line_to([1.0, 1.0])
                .line_to([0.0, 1.0])
                .close();

            Some(GlyphOutline {
                commands,
                advance: 1.0,
            })
        });

        assert!(rasterizer.rasterize('y', 16).is_none());

        let bitmap = rasterizer.rasterize('x', 16).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (16, 16));
        assert_eq!(bitmap.data.len(), 256);
        assert_eq!(bitmap.coverage(8, 8), 255);
        assert_eq!(rasterizer.glyph_count(), 1);
    }
}
