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

//! Defines the texture page wrapper.

use super::gpu_backend::{GpuContext, SubtextureWrite, TextureWrite};

use std::fmt;

use piet::{ImageFormat, InterpolationMode};

/// A square, single-channel texture that glyphs are packed into.
pub(crate) struct Texture<C: GpuContext + ?Sized> {
    resource: C::Texture,

    /// Width and height of the page.
    size: u32,
}

impl<C: GpuContext + ?Sized> fmt::Debug for Texture<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl<C: GpuContext + ?Sized> Texture<C> {
    /// Create a new page and fill it with transparent pixels.
    pub(crate) fn new(
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        size: u32,
    ) -> Result<Self, C::Error> {
        let resource = context.create_texture(device, InterpolationMode::Bilinear)?;

        context.write_texture(TextureWrite {
            device,
            queue,
            texture: &resource,
            size: (size, size),
            format: ImageFormat::Grayscale,
            data: None,
        });

        Ok(Self { resource, size })
    }

    pub(crate) fn resource(&self) -> &C::Texture {
        &self.resource
    }

    pub(crate) fn size(&self) -> u32 {
        self.size
    }

    pub(crate) fn write_subtexture(
        &self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        offset: (u32, u32),
        size: (u32, u32),
        data: &[u8],
    ) {
        debug_assert_eq!(data.len(), size.0 as usize * size.1 as usize);
        debug_assert!(offset.0 + size.0 <= self.size && offset.1 + size.1 <= self.size);

        context.write_subtexture(SubtextureWrite {
            device,
            queue,
            offset,
            size,
            format: ImageFormat::Grayscale,
            data,
            texture: &self.resource,
        });
    }

    /// Release the GPU texture.
    pub(crate) fn delete(self, context: &mut C, device: &C::Device) {
        context.delete_texture(device, self.resource);
    }
}
