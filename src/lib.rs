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

//! A glyph atlas that pages in textures on demand and evicts what goes unused.
//!
//! Glyphs are rasterized the first time they are needed and packed into rows of fixed-size
//! square texture pages, so that a GPU renderer can draw any string with one draw call per
//! page. Every glyph handed out is reference counted. Glyphs nobody holds are kept around
//! in case they are needed again, and are reclaimed oldest first once space runs out. Whole
//! fonts are unloaded when they go unused for a while.
//!
//! To use, implement the [`GpuContext`] trait on a type that represents an active GPU
//! context and provide a [`FontLoader`] that creates a [`Rasterizer`] for a font. Then use
//! a [`FontObjectCache`] to turn strings into [`TextRun`]s, and draw the [`PageBatch`]es
//! of every run. Once a draw is retired, give the run back with
//! [`FontObjectCache::release_run`].
//!
//! There is always a glyph to draw: characters that can't be rasterized, or that don't fit
//! anymore, are drawn with the replacement glyph of their font.
//!
//! Note that this crate uses thread-unsafe primitives. Text rendering usually happens on the
//! thread that owns the GPU context anyways.

#![forbid(unsafe_code, rust_2018_idioms)]

mod allocator;
mod cache;
mod config;
mod descriptor;
mod font;
mod free_list;
mod gpu_backend;
mod lifecycle;
mod rasterizer;
mod resources;
mod text;

pub use piet;
pub use zeno;

pub use cache::{FontHandle, FontObjectCache};
pub use config::AtlasConfig;
pub use descriptor::{FontDescriptor, DEFAULT_SIZE, MIN_SIZE};
pub use font::{AtlasStats, FontObject};
pub use free_list::GlyphSlot;
pub use gpu_backend::{GpuContext, SubtextureWrite, TextureWrite, Vertex};
pub use rasterizer::{
    replacement_box, FontLoader, GlyphBitmap, GlyphOutline, OutlineRasterizer, Rasterizer,
    REPLACEMENT_CHARACTER,
};
pub use text::{FontId, PageBatch, ShapedGlyph, TextRun};

use piet::Error as Pierror;

use std::error::Error as StdError;
use std::fmt;

trait ResultExt<T, E: StdError + 'static> {
    fn piet_err(self) -> Result<T, Pierror>;
}

impl<T, E: StdError + 'static> ResultExt<T, E> for Result<T, E> {
    fn piet_err(self) -> Result<T, Pierror> {
        self.map_err(|e| Pierror::BackendError(Box::new(LibraryError(e))))
    }
}

struct LibraryError<E>(E);

impl<E: fmt::Debug> fmt::Debug for LibraryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<E: fmt::Display> fmt::Display for LibraryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<E: StdError> StdError for LibraryError<E> {}
