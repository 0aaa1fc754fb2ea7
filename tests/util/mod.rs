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

//! Helpers shared by the integration tests.

#![allow(dead_code)]

use glyph_pager::piet::InterpolationMode;
use glyph_pager::{GlyphBitmap, GpuContext, Rasterizer, SubtextureWrite, TextureWrite};

use std::fmt;

/// Install a subscriber that prints to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

#[derive(Debug)]
pub struct Refused;

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("out of texture memory")
    }
}

impl std::error::Error for Refused {}

/// A texture with its contents kept in memory.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: usize,
    pub size: (u32, u32),
    pub pixels: Vec<u8>,
    pub deleted: bool,
}

/// A GPU context that keeps every texture in memory.
#[derive(Debug, Default)]
pub struct RecordingContext {
    pub pages: Vec<Page>,
    pub texture_limit: Option<usize>,
    pub max_size: Option<(u32, u32)>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_pages(&self) -> usize {
        self.pages.iter().filter(|page| !page.deleted).count()
    }

    /// The coverage at a point of a page.
    pub fn pixel(&self, texture: usize, x: u32, y: u32) -> u8 {
        let page = &self.pages[texture];
        page.pixels[(y * page.size.0 + x) as usize]
    }
}

impl GpuContext for RecordingContext {
    type Device = ();
    type Queue = ();
    type Texture = usize;
    type Error = Refused;

    fn create_texture(
        &mut self,
        _device: &(),
        _interpolation: InterpolationMode,
    ) -> Result<usize, Refused> {
        if let Some(limit) = self.texture_limit {
            if self.live_pages() >= limit {
                return Err(Refused);
            }
        }

        let id = self.pages.len();
        self.pages.push(Page {
            id,
            size: (0, 0),
            pixels: Vec::new(),
            deleted: false,
        });
        Ok(id)
    }

    fn write_texture(&mut self, write: TextureWrite<'_, Self>) {
        let page = &mut self.pages[*write.texture];
        assert!(!page.deleted);
        assert_eq!(write.format, glyph_pager::piet::ImageFormat::Grayscale);

        let (width, height) = write.size;
        page.size = write.size;
        page.pixels = match write.data {
            Some(data) => data.to_vec(),
            None => vec![0; (width * height) as usize],
        };
    }

    fn write_subtexture(&mut self, write: SubtextureWrite<'_, Self>) {
        let page = &mut self.pages[*write.texture];
        assert!(!page.deleted);

        let (x, y) = write.offset;
        let (width, height) = write.size;
        assert!(x + width <= page.size.0 && y + height <= page.size.1);

        for row in 0..height {
            let src = &write.data[(row * width) as usize..][..width as usize];
            let dst = ((y + row) * page.size.0 + x) as usize;
            page.pixels[dst..dst + width as usize].copy_from_slice(src);
        }
    }

    fn delete_texture(&mut self, _device: &(), texture: usize) {
        let page = &mut self.pages[texture];
        assert!(!page.deleted, "texture {} deleted twice", texture);
        page.deleted = true;
    }

    fn max_texture_size(&mut self, _device: &()) -> (u32, u32) {
        self.max_size.unwrap_or((8192, 8192))
    }
}

/// Draws every glyph as a solid block of its advance, except for a few missing characters.
pub struct SolidRasterizer {
    pub missing: &'static str,
    pub glyph_count: usize,
}

impl SolidRasterizer {
    pub fn new() -> Self {
        Self {
            missing: "",
            glyph_count: 256,
        }
    }
}

impl Rasterizer for SolidRasterizer {
    fn rasterize(&mut self, character: char, pixels_per_em: u32) -> Option<GlyphBitmap> {
        if self.missing.contains(character) {
            return None;
        }

        let width = match character {
            ' ' => 2,
            'i' | 'l' => 1,
            'm' | 'w' => pixels_per_em,
            _ => (pixels_per_em + 1) / 2,
        };

        Some(GlyphBitmap {
            width,
            height: pixels_per_em,
            advance: width as f32,
            data: vec![200; (width * pixels_per_em) as usize],
        })
    }

    fn glyph_count(&self) -> usize {
        self.glyph_count
    }
}
