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

//! The glyphs of one font at one size.

use super::allocator::{GlyphSpaceAllocator, PADDING};
use super::config::AtlasConfig;
use super::descriptor::FontDescriptor;
use super::free_list::GlyphSlot;
use super::gpu_backend::GpuContext;
use super::lifecycle::{GlyphLifecycleCache, GlyphRecord};
use super::rasterizer::{replacement_box, GlyphBitmap, Rasterizer, REPLACEMENT_CHARACTER};
use super::text::{FontId, ShapedGlyph, TextRun};
use super::ResultExt;

use std::fmt;

/// A snapshot of how a font object uses its pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasStats {
    /// The number of pages created so far.
    pub pages: usize,

    /// The width and height of every page.
    pub page_size: u32,

    /// Glyphs with outstanding references, the replacement glyph included.
    pub active: usize,

    /// Glyphs waiting to be reused or reclaimed.
    pub idle: usize,

    /// The number of entries in the free list.
    pub free_entries: usize,

    /// The summed width of every free entry.
    pub free_width: u64,
}

/// A rasterizer together with the atlas space of its glyphs.
pub struct FontObject<C: GpuContext + ?Sized, R> {
    /// The identifier handed out with every glyph.
    id: FontId,

    /// The font and size this object renders.
    descriptor: FontDescriptor,

    /// The glyph size, clamped so that a row fits into a page.
    pixels_per_em: u32,

    /// Produces glyph bitmaps.
    rasterizer: R,

    /// The loaded glyphs.
    glyphs: GlyphLifecycleCache,

    /// The pages the glyphs live in.
    space: GlyphSpaceAllocator<C>,
}

impl<C: GpuContext + ?Sized, R> fmt::Debug for FontObject<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontObject")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("glyphs", &self.glyphs)
            .field("space", &self.space)
            .finish_non_exhaustive()
    }
}

impl<C: GpuContext + ?Sized, R: Rasterizer> FontObject<C, R> {
    /// Create the font object and load its replacement glyph.
    ///
    /// The first page is created right away. If that fails, or the replacement glyph does not
    /// fit into it, everything is released again and an error is returned.
    pub(crate) fn new(
        id: FontId,
        descriptor: FontDescriptor,
        rasterizer: R,
        config: &AtlasConfig,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
    ) -> Result<Self, piet::Error> {
        let (max_width, max_height) = context.max_texture_size(device);
        let max_size = max_width.min(max_height);
        let pixels_per_em = descriptor
            .pixels_per_em()
            .min(max_size.saturating_sub(2 * PADDING))
            .max(1);
        if pixels_per_em < descriptor.pixels_per_em() {
            tracing::warn!(
                "{} is too large for {}x{} pages, rendering at {}px",
                descriptor,
                max_size,
                max_size,
                pixels_per_em
            );
        }
        let page_size = config.page_size(rasterizer.glyph_count(), pixels_per_em, max_size);

        let mut font = Self {
            id,
            descriptor,
            pixels_per_em,
            rasterizer,
            glyphs: GlyphLifecycleCache::new(config.idle_capacity),
            space: GlyphSpaceAllocator::new(page_size, pixels_per_em, config.max_pages),
        };

        if let Err(e) = font.load_replacement(context, device, queue) {
            font.space.destroy(context, device);
            return Err(e);
        }

        tracing::debug!(
            "loaded font {} with {}x{} pages",
            font.descriptor,
            page_size,
            page_size
        );

        Ok(font)
    }

    fn load_replacement(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
    ) -> Result<(), piet::Error> {
        if self.space.reserve_page(context, device, queue).piet_err()?.is_none() {
            return Err(piet::Error::BackendError(
                "no glyph page can be created".into(),
            ));
        }

        let pixels_per_em = self.pixels_per_em;
        let bitmap = match self.rasterizer.rasterize(REPLACEMENT_CHARACTER, pixels_per_em) {
            Some(bitmap) if bitmap.is_well_formed() => bitmap,
            _ => replacement_box(pixels_per_em),
        };

        let record = self
            .load_bitmap(context, device, queue, REPLACEMENT_CHARACTER, &bitmap)
            .ok_or_else(|| {
                piet::Error::BackendError("no space for the replacement glyph".into())
            })?;
        self.glyphs.pin_replacement(record);

        Ok(())
    }

    /// Find space for a bitmap and upload it.
    fn load_bitmap(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        character: char,
        bitmap: &GlyphBitmap,
    ) -> Option<GlyphRecord> {
        // Float to int casts saturate.
        let inner_width = (bitmap.advance.ceil() as u32).max(1);
        let width = inner_width.saturating_add(2 * PADDING);

        let glyphs = &mut self.glyphs;
        let slot = self.space.allocate(context, device, queue, width, |free| {
            glyphs.purge(true, free);
        })?;

        self.space.upload(context, device, queue, slot, bitmap);
        Some(GlyphRecord::new(character, slot, bitmap.advance))
    }

    /// Take a reference to the glyph of a character, loading it if needed.
    ///
    /// If the character can't be loaded, a reference to the replacement glyph is returned
    /// instead.
    pub fn acquire(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        character: char,
    ) -> ShapedGlyph {
        if let Some(record) = self.glyphs.reuse(character) {
            return self.shaped(record);
        }

        let bitmap = match self.rasterizer.rasterize(character, self.pixels_per_em) {
            Some(bitmap) if bitmap.is_well_formed() => bitmap,
            Some(_) => {
                tracing::warn!(
                    "{} produced a malformed bitmap for {:?}",
                    self.descriptor,
                    character
                );
                let record = self.glyphs.replacement();
                return self.shaped(record);
            }
            None => {
                tracing::debug!("{} has no glyph for {:?}", self.descriptor, character);
                let record = self.glyphs.replacement();
                return self.shaped(record);
            }
        };

        match self.load_bitmap(context, device, queue, character, &bitmap) {
            Some(record) => {
                let record = self.glyphs.insert(record);
                self.shaped(record)
            }
            None => {
                tracing::warn!(
                    "out of glyph space in {}, drawing {:?} as a replacement",
                    self.descriptor,
                    character
                );
                let record = self.glyphs.replacement();
                self.shaped(record)
            }
        }
    }

    /// Turn every character of a string into a glyph.
    pub fn shape_string(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        text: &str,
    ) -> TextRun {
        let glyphs = text
            .chars()
            .map(|character| self.acquire(context, device, queue, character))
            .collect();

        TextRun {
            font: self.id,
            glyphs,
            page_size: self.space.page_size(),
            row_height: self.space.row_height(),
        }
    }
}

impl<C: GpuContext + ?Sized, R> FontObject<C, R> {
    fn shaped(&self, record: GlyphRecord) -> ShapedGlyph {
        ShapedGlyph {
            font: self.id,
            character: record.character,
            slot: record.slot,
            advance: record.advance,
        }
    }

    /// Give back a reference taken by `acquire`.
    ///
    /// # Panics
    ///
    /// Panics if the glyph belongs to another font, or if it has no references left.
    pub fn release(&mut self, glyph: &ShapedGlyph) {
        assert_eq!(
            glyph.font, self.id,
            "glyph {:?} released into the wrong font",
            glyph.character
        );

        self.glyphs
            .release(glyph.character, self.space.free_mut());
    }

    /// Give back every reference held by a run.
    pub fn release_run(&mut self, run: TextRun) {
        for glyph in &run.glyphs {
            self.release(glyph);
        }
    }

    /// Reclaim the space of idle glyphs.
    ///
    /// With `partial` only the older half is reclaimed. Returns the number of glyphs
    /// reclaimed.
    pub fn purge(&mut self, partial: bool) -> usize {
        self.glyphs.purge(partial, self.space.free_mut())
    }

    pub fn id(&self) -> FontId {
        self.id
    }

    pub fn descriptor(&self) -> &FontDescriptor {
        &self.descriptor
    }

    /// The size glyphs are rasterized at.
    ///
    /// This is smaller than the size of the descriptor if a glyph row wouldn't fit into the
    /// largest texture.
    pub fn pixels_per_em(&self) -> u32 {
        self.pixels_per_em
    }

    /// The width and height of every page.
    pub fn page_size(&self) -> u32 {
        self.space.page_size()
    }

    /// The height of a glyph row, padding included.
    pub fn row_height(&self) -> u32 {
        self.space.row_height()
    }

    /// The GPU texture of a page.
    pub fn page(&self, texture_id: u32) -> Option<&C::Texture> {
        self.space.page(texture_id)
    }

    /// The references held on a character, or `None` if it isn't loaded.
    pub fn reference_count(&self, character: char) -> Option<u32> {
        self.glyphs.reference_count(character)
    }

    /// Whether a character is loaded but unreferenced.
    pub fn is_idle(&self, character: char) -> bool {
        self.glyphs.is_idle(character)
    }

    /// The age of an idle character. Lower ages are reclaimed first.
    pub fn aging_key(&self, character: char) -> Option<u16> {
        self.glyphs.aging_key(character)
    }

    /// The free space of every page, in `(texture_id, row, x_offset)` order.
    pub fn free_slots(&self) -> impl Iterator<Item = GlyphSlot> + '_ {
        self.space.free().iter().copied()
    }

    /// The slots of every loaded glyph, in no particular order.
    pub fn loaded_slots(&self) -> impl Iterator<Item = GlyphSlot> + '_ {
        self.glyphs.slots()
    }

    pub fn stats(&self) -> AtlasStats {
        let free = self.space.free();
        AtlasStats {
            pages: self.space.page_count(),
            page_size: self.space.page_size(),
            active: self.glyphs.active_len(),
            idle: self.glyphs.idle_len(),
            free_entries: free.len(),
            free_width: free.total_width(),
        }
    }

    /// Release the pages of this font.
    pub(crate) fn destroy(self, context: &mut C, device: &C::Device) {
        tracing::debug!("unloading font {}", self.descriptor);
        self.space.destroy(context, device);
    }
}
