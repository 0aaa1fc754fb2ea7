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

//! Keeps the font objects that were used recently.

use super::config::AtlasConfig;
use super::descriptor::FontDescriptor;
use super::font::FontObject;
use super::gpu_backend::GpuContext;
use super::rasterizer::FontLoader;
use super::text::{FontId, ShapedGlyph, TextRun};

use ahash::RandomState;
use hashbrown::hash_map::{Entry, HashMap};
use web_time::Instant;

use std::fmt;

/// A font in the cache, as returned by [`FontObjectCache::get_font`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontHandle {
    id: FontId,
    descriptor: FontDescriptor,
}

impl FontHandle {
    /// The font object that was current when the handle was made.
    pub fn id(&self) -> FontId {
        self.id
    }

    pub fn descriptor(&self) -> &FontDescriptor {
        &self.descriptor
    }
}

struct CachedFont<C: GpuContext + ?Sized, R> {
    font: FontObject<C, R>,
    last_access: Instant,
}

/// Maps font descriptors to font objects, unloading the ones that go unused.
///
/// Every access counts as a use. At most once per maintenance interval, the fonts that have
/// not been used for longer than the time to live are destroyed along with their pages.
/// Glyphs that are still held when their font is unloaded can be released without effect.
pub struct FontObjectCache<C: GpuContext + ?Sized, L: FontLoader> {
    /// The loaded fonts.
    fonts: HashMap<FontDescriptor, CachedFont<C, L::Rasterizer>, RandomState>,

    /// The descriptor of every loaded font object.
    ids: HashMap<FontId, FontDescriptor, RandomState>,

    /// Creates rasterizers for fonts that aren't loaded.
    loader: L,

    config: AtlasConfig,

    /// The identifier of the next font object.
    next_id: u64,

    /// The last time the fonts were swept.
    last_maintenance: Option<Instant>,
}

impl<C: GpuContext + ?Sized, L: FontLoader> fmt::Debug for FontObjectCache<C, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontObjectCache")
            .field("fonts", &self.fonts.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .field("last_maintenance", &self.last_maintenance)
            .finish_non_exhaustive()
    }
}

impl<C: GpuContext + ?Sized, L: FontLoader> FontObjectCache<C, L> {
    /// Create an empty cache.
    pub fn new(loader: L, config: AtlasConfig) -> Self {
        Self {
            fonts: HashMap::with_hasher(RandomState::new()),
            ids: HashMap::with_hasher(RandomState::new()),
            loader,
            config,
            next_id: 0,
            last_maintenance: None,
        }
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Get a font, loading it if it isn't cached.
    pub fn get_font(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        descriptor: &FontDescriptor,
    ) -> Result<FontHandle, piet::Error> {
        self.get_font_at(context, device, queue, descriptor, Instant::now())
    }

    /// Get a font as if it were currently `now`.
    pub fn get_font_at(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        descriptor: &FontDescriptor,
        now: Instant,
    ) -> Result<FontHandle, piet::Error> {
        let font = self.access(context, device, queue, descriptor, now)?;
        Ok(FontHandle {
            id: font.id(),
            descriptor: font.descriptor().clone(),
        })
    }

    /// Turn a string into glyphs of a font.
    ///
    /// If the font was unloaded since the handle was made, it is loaded again. Every glyph of
    /// the run must be given back with [`release_run`](Self::release_run).
    pub fn shape_string(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        font: &FontHandle,
        text: &str,
    ) -> Result<TextRun, piet::Error> {
        self.shape_string_at(context, device, queue, font, text, Instant::now())
    }

    /// Turn a string into glyphs as if it were currently `now`.
    pub fn shape_string_at(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        font: &FontHandle,
        text: &str,
        now: Instant,
    ) -> Result<TextRun, piet::Error> {
        let font = self.access(context, device, queue, &font.descriptor, now)?;
        Ok(font.shape_string(context, device, queue, text))
    }

    /// Give back a glyph.
    ///
    /// Nothing happens if its font has been unloaded.
    pub fn release(&mut self, glyph: &ShapedGlyph) {
        let cached = self
            .ids
            .get(&glyph.font)
            .and_then(|descriptor| self.fonts.get_mut(descriptor));

        match cached {
            Some(cached) => cached.font.release(glyph),
            None => tracing::trace!("dropping release of {:?} into an unloaded font", glyph),
        }
    }

    /// Give back every glyph of a run.
    pub fn release_run(&mut self, run: TextRun) {
        let descriptor = match self.ids.get(&run.font()) {
            Some(descriptor) => descriptor,
            None => {
                tracing::trace!("dropping release of {} glyphs into an unloaded font", run.len());
                return;
            }
        };

        if let Some(cached) = self.fonts.get_mut(descriptor) {
            cached.font.release_run(run);
        }
    }

    /// Unload every font that has gone unused for longer than the time to live.
    ///
    /// Returns the number of fonts unloaded.
    pub fn maintain(&mut self, context: &mut C, device: &C::Device, now: Instant) -> usize {
        self.sweep(context, device, now, None)
    }

    /// The font object loaded for a descriptor.
    ///
    /// This does not count as a use.
    pub fn font(&self, descriptor: &FontDescriptor) -> Option<&FontObject<C, L::Rasterizer>> {
        self.fonts.get(descriptor).map(|cached| &cached.font)
    }

    /// The font object loaded for a descriptor.
    ///
    /// This does not count as a use.
    pub fn font_mut(
        &mut self,
        descriptor: &FontDescriptor,
    ) -> Option<&mut FontObject<C, L::Rasterizer>> {
        self.fonts.get_mut(descriptor).map(|cached| &mut cached.font)
    }

    pub fn contains(&self, descriptor: &FontDescriptor) -> bool {
        self.fonts.contains_key(descriptor)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Unload every font.
    pub fn clear(&mut self, context: &mut C, device: &C::Device) {
        self.ids.clear();
        for (_, cached) in self.fonts.drain() {
            cached.font.destroy(context, device);
        }
    }

    fn access(
        &mut self,
        context: &mut C,
        device: &C::Device,
        queue: &C::Queue,
        descriptor: &FontDescriptor,
        now: Instant,
    ) -> Result<&mut FontObject<C, L::Rasterizer>, piet::Error> {
        if self.maintenance_due(now) {
            self.sweep(context, device, now, Some(descriptor));
        }

        let cached = match self.fonts.entry(descriptor.clone()) {
            Entry::Occupied(o) => o.into_mut(),
            Entry::Vacant(v) => {
                let id = FontId(self.next_id);
                let rasterizer = self.loader.load(descriptor);
                let font = FontObject::new(
                    id,
                    descriptor.clone(),
                    rasterizer,
                    &self.config,
                    context,
                    device,
                    queue,
                )?;

                self.next_id += 1;
                self.ids.insert(id, descriptor.clone());
                v.insert(CachedFont {
                    font,
                    last_access: now,
                })
            }
        };

        cached.last_access = now;
        Ok(&mut cached.font)
    }

    fn maintenance_due(&self, now: Instant) -> bool {
        match self.last_maintenance {
            None => true,
            Some(last) => match now.checked_duration_since(last) {
                Some(elapsed) => elapsed >= self.config.maintenance_interval,

                // The clock went backwards.
                None => true,
            },
        }
    }

    fn sweep(
        &mut self,
        context: &mut C,
        device: &C::Device,
        now: Instant,
        keep: Option<&FontDescriptor>,
    ) -> usize {
        self.last_maintenance = Some(now);

        let ttl = self.config.font_ttl;
        let expired: Vec<FontDescriptor> = self
            .fonts
            .iter()
            .filter(|(descriptor, cached)| {
                // Fonts used "in the future" are stale once the clock has gone backwards.
                Some(*descriptor) != keep
                    && now
                        .checked_duration_since(cached.last_access)
                        .map_or(true, |idle| idle > ttl)
            })
            .map(|(descriptor, _)| descriptor.clone())
            .collect();

        for descriptor in &expired {
            if let Some(cached) = self.fonts.remove(descriptor) {
                self.ids.remove(&cached.font.id());
                cached.font.destroy(context, device);
            }
        }

        if !expired.is_empty() {
            tracing::debug!(
                "unloaded {} unused fonts, {} left",
                expired.len(),
                self.fonts.len()
            );
        }

        expired.len()
    }
}
