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

//! Defines the GPU backend that texture pages are created on.

use piet::InterpolationMode;

use std::error::Error;

/// The backend that owns the GPU textures backing the glyph pages.
pub trait GpuContext {
    /// A "device" that can be used to create textures.
    ///
    /// This corresponds to [`Device`] in [`wgpu`] and nothing in particular in [`glow`].
    ///
    /// [`Device`]: https://docs.rs/wgpu/latest/wgpu/struct.Device.html
    /// [`wgpu`]: https://crates.io/crates/wgpu
    /// [`glow`]: https://crates.io/crates/glow
    type Device;

    /// A "queue" that uploads are pushed into.
    ///
    /// This corresponds to [`Queue`] in [`wgpu`] and nothing in particular in [`glow`].
    ///
    /// [`Queue`]: https://docs.rs/wgpu/latest/wgpu/struct.Queue.html
    /// [`wgpu`]: https://crates.io/crates/wgpu
    /// [`glow`]: https://crates.io/crates/glow
    type Queue;

    /// The type associated with a GPU texture.
    type Texture;

    /// The error type associated with this GPU context.
    type Error: Error + 'static;

    /// Create a new texture.
    fn create_texture(
        &mut self,
        device: &Self::Device,
        interpolation: InterpolationMode,
    ) -> Result<Self::Texture, Self::Error>;

    /// Write an image to a texture, replacing its storage.
    fn write_texture(&mut self, texture_write: TextureWrite<'_, Self>);

    /// Write a sub-image to a texture.
    fn write_subtexture(&mut self, subtexture_write: SubtextureWrite<'_, Self>);

    /// Delete a texture.
    fn delete_texture(&mut self, device: &Self::Device, texture: Self::Texture);

    /// Get the maximum texture size.
    fn max_texture_size(&mut self, device: &Self::Device) -> (u32, u32);
}

/// The data necessary to write an image into a texture.
pub struct TextureWrite<'a, C: GpuContext + ?Sized> {
    /// The device to render onto.
    pub device: &'a C::Device,

    /// The queue to push the operation into.
    pub queue: &'a C::Queue,

    /// The texture to write into.
    pub texture: &'a C::Texture,

    /// The size of the image.
    pub size: (u32, u32),

    /// The format of the image.
    pub format: piet::ImageFormat,

    /// The data to write.
    ///
    /// This is `None` if you want to write only zeroes.
    pub data: Option<&'a [u8]>,
}

/// The data necessary to write an image into a portion of a texture.
pub struct SubtextureWrite<'a, C: GpuContext + ?Sized> {
    /// The device to render onto.
    pub device: &'a C::Device,

    /// The queue to push the operation into.
    pub queue: &'a C::Queue,

    /// The texture to write into.
    pub texture: &'a C::Texture,

    /// The offset to start writing at.
    pub offset: (u32, u32),

    /// The size of the image.
    pub size: (u32, u32),

    /// The format of the image.
    pub format: piet::ImageFormat,

    /// The data to write.
    pub data: &'a [u8],
}

impl<C: GpuContext + ?Sized> GpuContext for &mut C {
    type Device = C::Device;
    type Queue = C::Queue;
    type Texture = C::Texture;
    type Error = C::Error;

    fn create_texture(
        &mut self,
        device: &Self::Device,
        interpolation: InterpolationMode,
    ) -> Result<Self::Texture, Self::Error> {
        (**self).create_texture(device, interpolation)
    }

    fn write_texture(&mut self, texture_write: TextureWrite<'_, Self>) {
        // Convert type from &C to C
        let TextureWrite {
            device,
            queue,
            texture,
            size,
            format,
            data,
        } = texture_write;

        (**self).write_texture(TextureWrite {
            device,
            queue,
            texture,
            size,
            format,
            data,
        })
    }

    fn write_subtexture(&mut self, subtexture_write: SubtextureWrite<'_, Self>) {
        // Convert type from &C to C
        let SubtextureWrite {
            device,
            queue,
            texture,
            offset,
            size,
            format,
            data,
        } = subtexture_write;

        (**self).write_subtexture(SubtextureWrite {
            device,
            queue,
            texture,
            offset,
            size,
            format,
            data,
        })
    }

    fn delete_texture(&mut self, device: &Self::Device, texture: Self::Texture) {
        (**self).delete_texture(device, texture)
    }

    fn max_texture_size(&mut self, device: &Self::Device) -> (u32, u32) {
        (**self).max_texture_size(device)
    }
}

/// The vertex type emitted for glyph quads.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// The position of the vertex.
    pub pos: [f32; 2],

    /// The coordinate of the vertex in the texture.
    pub uv: [f32; 2],

    /// The color of the vertex, in four SRGB channels.
    pub color: [u8; 4],
}
