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

//! Packs glyph slots into the texture pages of one font.

use super::free_list::{FreeSpaceList, GlyphSlot};
use super::gpu_backend::GpuContext;
use super::rasterizer::GlyphBitmap;
use super::resources::Texture;

use std::fmt;

/// The pixels of padding on each side of a glyph.
pub(crate) const PADDING: u32 = 1;

/// Owns the pages of one font and hands out space in them.
pub(crate) struct GlyphSpaceAllocator<C: GpuContext + ?Sized> {
    /// The pages, indexed by `GlyphSlot::texture_id`.
    pages: Vec<Texture<C>>,

    /// Space in `pages` that no glyph occupies.
    free: FreeSpaceList,

    /// Width and height of every page.
    page_size: u32,

    /// The pixels per em of the font.
    pixels_per_em: u32,

    /// The most pages this allocator may create.
    max_pages: usize,

    /// Reusable buffer for padded glyph images.
    scratch: Vec<u8>,
}

impl<C: GpuContext + ?Sized> fmt::Debug for GlyphSpaceAllocator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphSpaceAllocator")
            .field("pages", &self.pages.len())
            .field("free", &self.free.len())
            .field("page_size", &self.page_size)
            .field("pixels_per_em", &self.pixels_per_em)
            .finish_non_exhaustive()
    }
}

impl<C: GpuContext + ?Sized> GlyphSpaceAllocator<C> {
    /// Create an allocator without any pages.
    pub(crate) fn new(page_size: u32, pixels_per_em: u32, max_pages: usize) -> Self {
        Self {
            pages: Vec::new(),
            free: FreeSpaceList::new(),
            page_size,
            pixels_per_em,
            max_pages,
            scratch: Vec::new(),
        }
    }

    pub(crate) fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The height of a row, which is one em plus padding.
    pub(crate) fn row_height(&self) -> u32 {
        self.pixels_per_em + 2 * PADDING
    }

    pub(crate) fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn page(&self, texture_id: u32) -> Option<&C::Texture> {
        self.pages
            .get(texture_id as usize)
            .map(|page| page.resource())
    }

    pub(crate) fn free(&self) -> &FreeSpaceList {
        &self.free
    }

    pub(crate) fn free_mut(&mut self) -> &mut FreeSpaceList {
        &mut self.free
    }

    /// Find a slot of `width` columns.
    ///
    /// First the free list is searched. If it has no room, `reclaim` is given the chance to
    /// return idle space and the list is searched again. If there is still no room, a new
    /// page is created and searched.
    ///
    /// Widths larger than a page are clamped to the page width.
    pub(crate) fn allocate(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        width: u32,
        reclaim: impl FnOnce(&mut FreeSpaceList),
    ) -> Option<GlyphSlot> {
        let width = width.clamp(1, self.page_size.max(1));

        if let Some(slot) = self.free.find_fit(width, 0) {
            return Some(slot);
        }

        reclaim(&mut self.free);
        if let Some(slot) = self.free.find_fit(width, 0) {
            return Some(slot);
        }

        let start = self.add_page(context, device, queue)?;
        self.free.find_fit(width, start)
    }

    /// Create a new page and add its rows to the free list.
    ///
    /// Returns the index of the first free entry of the new page, or `None` if the page limit
    /// was reached.
    pub(crate) fn reserve_page(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
    ) -> Result<Option<usize>, C::Error> {
        if self.pages.len() >= self.max_pages {
            return Ok(None);
        }

        let page = Texture::new(context, device, queue, self.page_size)?;
        let texture_id = self.pages.len() as u32;
        self.pages.push(page);

        tracing::info!(
            "created glyph page {} ({}x{}) for {}px glyphs",
            texture_id,
            self.page_size,
            self.page_size,
            self.pixels_per_em
        );

        Ok(Some(self.free.push_page(
            texture_id,
            self.page_size,
            self.row_height(),
        )))
    }

    fn add_page(&mut self, context: &mut C, device: &C::Device, queue: &C::Queue) -> Option<usize> {
        match self.reserve_page(context, device, queue) {
            Ok(Some(start)) => Some(start),
            Ok(None) => {
                tracing::warn!("glyph page limit of {} reached", self.max_pages);
                None
            }
            Err(e) => {
                tracing::warn!("failed to create glyph page: {}", e);
                None
            }
        }
    }

    /// Write a glyph image into its slot, surrounded by transparent padding.
    ///
    /// The image is clipped to the slot.
    pub(crate) fn upload(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        slot: GlyphSlot,
        bitmap: &GlyphBitmap,
    ) {
        let row_height = self.row_height();
        let page = match self.pages.get(slot.texture_id as usize) {
            Some(page) => page,
            None => {
                tracing::warn!("slot {:?} refers to a missing page", slot);
                return;
            }
        };

        let stride = slot.width as usize;
        self.scratch.clear();
        self.scratch.resize(stride * row_height as usize, 0);

        let inner_width = slot.width.saturating_sub(2 * PADDING).min(bitmap.width) as usize;
        let inner_height = self.pixels_per_em.min(bitmap.height) as usize;
        for y in 0..inner_height {
            let src = match bitmap
                .data
                .get(y * bitmap.width as usize..)
                .and_then(|row| row.get(..inner_width))
            {
                Some(src) => src,
                None => break,
            };
            let dst = (y + PADDING as usize) * stride + PADDING as usize;
            self.scratch[dst..dst + inner_width].copy_from_slice(src);
        }

        debug_assert!(page.size() == self.page_size);
        page.write_subtexture(
            context,
            device,
            queue,
            (slot.x_offset, slot.row * row_height),
            (slot.width, row_height),
            &self.scratch,
        );
    }

    /// Release every page.
    pub(crate) fn destroy(self, context: &mut C, device: &C::Device) {
        let count = self.pages.len();
        for page in self.pages {
            page.delete(context, device);
        }

        tracing::debug!("released {} glyph pages", count);
    }
}
