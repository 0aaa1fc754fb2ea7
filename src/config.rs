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

//! Tunables for the atlas.

use std::time::Duration;

/// Tuning parameters shared by every font object in a cache.
///
/// None of these change the semantics of the atlas, only how much memory it is allowed to hold
/// on to and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasConfig {
    /// The smallest page size that will be chosen.
    pub min_page_size: u32,

    /// The largest page size that will be chosen.
    ///
    /// The GPU's maximum texture size caps this as well.
    pub max_page_size: u32,

    /// The maximum number of pages a single font may own.
    pub max_pages: usize,

    /// When the idle set of a font reaches this size, releasing another glyph purges the
    /// older half first.
    pub idle_capacity: usize,

    /// How long a font object may go without being accessed before it is evicted.
    pub font_ttl: Duration,

    /// The minimum time between two eviction sweeps.
    pub maintenance_interval: Duration,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            min_page_size: 128,
            max_page_size: 128,
            max_pages: 256,
            idle_capacity: 18384,
            font_ttl: Duration::from_secs(1),
            maintenance_interval: Duration::from_secs(1),
        }
    }
}

impl AtlasConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the smallest page size.
    pub fn min_page_size(mut self, size: u32) -> Self {
        self.min_page_size = size;
        self
    }

    /// Set the largest page size.
    pub fn max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }

    /// Set the page limit per font.
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    /// Set the idle capacity per font.
    pub fn idle_capacity(mut self, capacity: usize) -> Self {
        self.idle_capacity = capacity;
        self
    }

    /// Set the time-to-live of an unused font object.
    pub fn font_ttl(mut self, ttl: Duration) -> Self {
        self.font_ttl = ttl;
        self
    }

    /// Set the minimum time between eviction sweeps.
    pub fn maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    /// Choose the page size for a font.
    ///
    /// This is the smallest power of two, starting at `min_page_size`, that can hold
    /// `glyph_count` square glyphs of `ppem` pixels, capped at `max_page_size` and at
    /// `gpu_max`. Pages are grown past `max_page_size` when a single row wouldn't fit.
    pub(crate) fn page_size(&self, glyph_count: usize, ppem: u32, gpu_max: u32) -> u32 {
        let needed = (glyph_count as u64).saturating_mul(ppem as u64 * ppem as u64);
        let cap = self.max_page_size.min(gpu_max).max(1);

        let mut size = self.min_page_size.max(1);
        while size < cap && (size as u64) * (size as u64) < needed {
            size = size.saturating_mul(2);
        }
        size = size.min(cap);

        // A page must hold at least one row, even past `max_page_size`.
        let row_height = ppem.saturating_add(2);
        let gpu_max = gpu_max.max(1);
        while size < row_height && size < gpu_max {
            size = size.saturating_mul(2);
        }

        size.min(gpu_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_capped_by_default() {
        let config = AtlasConfig::default();
        assert_eq!(config.page_size(30_000, 20, 8192), 128);
        assert_eq!(config.page_size(1, 8, 8192), 128);
    }

    #[test]
    fn page_size_grows_in_powers_of_two() {
        let config = AtlasConfig::default().max_page_size(4096);

        // 100 glyphs of 20px need 40_000 pixels, 256 * 256 is the first to fit.
        assert_eq!(config.page_size(100, 20, 8192), 256);
        assert_eq!(config.page_size(10, 20, 8192), 128);
        assert_eq!(config.page_size(1_000_000, 64, 8192), 4096);
    }

    #[test]
    fn large_fonts_get_at_least_one_row() {
        let config = AtlasConfig::default();
        assert_eq!(config.page_size(1, 126, 8192), 128);
        assert_eq!(config.page_size(1, 127, 8192), 256);
        assert_eq!(config.page_size(1, 600, 8192), 1024);
        assert_eq!(config.page_size(1, 600, 512), 512);
    }

    #[test]
    fn page_size_respects_gpu_limit() {
        let config = AtlasConfig::default().max_page_size(4096);
        assert_eq!(config.page_size(1_000_000, 64, 1024), 1024);
    }
}
