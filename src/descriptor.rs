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

//! Font descriptors, the keys of the font object cache.

use std::fmt;
use std::rc::Rc;

/// The size used when a descriptor does not carry a usable one.
pub const DEFAULT_SIZE: u32 = 20;

/// The smallest size a descriptor built with [`FontDescriptor::new`] can have.
pub const MIN_SIZE: u32 = 6;

/// A font family paired with a pixel size, such as `"Arial(Bold) 20"`.
///
/// The descriptor is treated as an opaque key; the family is whatever precedes the first
/// space and the size is the last whitespace-separated token.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontDescriptor(Rc<str>);

impl FontDescriptor {
    /// Build a normalized descriptor from a family name and a size.
    ///
    /// Non-positive sizes fall back to [`DEFAULT_SIZE`], and tiny sizes are raised to
    /// [`MIN_SIZE`].
    pub fn new(family: &str, size: i32) -> Self {
        let size = if size <= 0 {
            DEFAULT_SIZE
        } else {
            (size as u32).max(MIN_SIZE)
        };

        let family = family.trim();
        let family = family.split(' ').next().unwrap_or_default();
        Self(format!("{family} {size}").into())
    }

    /// Use an already existing descriptor string as-is.
    pub fn from_raw(descriptor: &str) -> Self {
        Self(descriptor.into())
    }

    /// The family part of this descriptor, i.e. `"Arial"`.
    pub fn family(&self) -> &str {
        let s = &*self.0;
        let s = match s.find(' ') {
            Some(pos) => &s[..pos],
            None => s,
        };
        s.trim()
    }

    /// The size in pixels per em.
    pub fn pixels_per_em(&self) -> u32 {
        let s = self.0.trim();
        let s = match s.rfind(' ') {
            Some(pos) => &s[pos + 1..],
            None => s,
        };

        match s.parse::<i32>() {
            Ok(size) if size > 0 => size as u32,
            _ => DEFAULT_SIZE,
        }
    }

    /// The descriptor string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FontDescriptor {
    fn from(descriptor: &str) -> Self {
        Self::from_raw(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_family_and_size() {
        let font = FontDescriptor::from_raw("Arial(Bold) 24");
        assert_eq!(font.family(), "Arial(Bold)");
        assert_eq!(font.pixels_per_em(), 24);
    }

    #[test]
    fn unparsable_size_uses_default() {
        assert_eq!(FontDescriptor::from_raw("Monospace").pixels_per_em(), 20);
        assert_eq!(FontDescriptor::from_raw("Monospace big").pixels_per_em(), 20);
        assert_eq!(FontDescriptor::from_raw("Monospace -3").pixels_per_em(), 20);
    }

    #[test]
    fn new_normalizes_size() {
        assert_eq!(FontDescriptor::new("Default", 0).as_str(), "Default 20");
        assert_eq!(FontDescriptor::new("Default", 3).as_str(), "Default 6");
        assert_eq!(FontDescriptor::new("Default", 16).as_str(), "Default 16");
    }

    #[test]
    fn new_keeps_first_word_of_family() {
        let font = FontDescriptor::new("  Arial Bold ", 12);
        assert_eq!(font.as_str(), "Arial 12");
        assert_eq!(font, FontDescriptor::from_raw("Arial 12"));
    }
}
