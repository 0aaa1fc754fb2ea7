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

//! Reference counting and aging of the glyphs of one font.
//!
//! A glyph is active while something holds a reference to it. When the last reference is
//! released it becomes idle and is stamped with the current idle counter. Idle glyphs can be
//! revived by acquiring them again; otherwise they are reclaimed, oldest first, whenever the
//! allocator runs out of space or the idle set grows too large.

use super::free_list::{FreeSpaceList, GlyphSlot};
use super::rasterizer::REPLACEMENT_CHARACTER;

use ahash::RandomState;
use hashbrown::hash_map::{Entry, HashMap};

/// A glyph that has space in a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GlyphRecord {
    /// The character this glyph was rasterized for.
    pub(crate) character: char,

    /// Where the glyph lives.
    pub(crate) slot: GlyphSlot,

    /// The horizontal advance of the glyph in pixels.
    pub(crate) advance: f32,

    /// The number of outstanding references.
    references: u32,

    /// The idle counter value at the time the glyph became idle.
    age: u16,
}

impl GlyphRecord {
    pub(crate) fn new(character: char, slot: GlyphSlot, advance: f32) -> Self {
        Self {
            character,
            slot,
            advance,
            references: 0,
            age: 0,
        }
    }
}

/// The active and idle glyphs of one font.
#[derive(Debug)]
pub(crate) struct GlyphLifecycleCache {
    /// Glyphs with at least one reference.
    active: HashMap<char, GlyphRecord, RandomState>,

    /// Glyphs without references, waiting to be reused or reclaimed.
    idle: IdleSet,
}

#[derive(Debug)]
struct IdleSet {
    glyphs: HashMap<char, GlyphRecord, RandomState>,

    /// The age given to the next glyph that becomes idle.
    counter: u16,

    /// The size at which the older half is purged before adding more.
    capacity: usize,
}

impl GlyphLifecycleCache {
    pub(crate) fn new(idle_capacity: usize) -> Self {
        Self {
            active: HashMap::with_hasher(RandomState::new()),
            idle: IdleSet {
                glyphs: HashMap::with_hasher(RandomState::new()),
                counter: 0,
                capacity: idle_capacity,
            },
        }
    }

    /// Add the replacement glyph, holding a reference that is never released.
    pub(crate) fn pin_replacement(&mut self, record: GlyphRecord) {
        debug_assert_eq!(record.character, REPLACEMENT_CHARACTER);
        self.active.insert(
            REPLACEMENT_CHARACTER,
            GlyphRecord {
                references: 1,
                ..record
            },
        );
    }

    /// Take a reference to an already loaded glyph.
    ///
    /// Idle glyphs are moved back into the active set.
    pub(crate) fn reuse(&mut self, character: char) -> Option<GlyphRecord> {
        if let Some(record) = self.idle.glyphs.remove(&character) {
            tracing::trace!("reviving idle glyph {:?}", character);
            let record = GlyphRecord {
                references: 1,
                ..record
            };
            self.active.insert(character, record);
            return Some(record);
        }

        let record = self.active.get_mut(&character)?;
        record.references += 1;
        Some(*record)
    }

    /// Take a reference to the replacement glyph.
    pub(crate) fn replacement(&mut self) -> GlyphRecord {
        match self.active.get_mut(&REPLACEMENT_CHARACTER) {
            Some(record) => {
                record.references += 1;
                *record
            }
            None => unreachable!("the replacement glyph is pinned"),
        }
    }

    /// Add a freshly loaded glyph with one reference.
    pub(crate) fn insert(&mut self, record: GlyphRecord) -> GlyphRecord {
        debug_assert!(!self.idle.glyphs.contains_key(&record.character));

        match self.active.entry(record.character) {
            Entry::Occupied(_) => panic!("glyph {:?} is already loaded", record.character),
            Entry::Vacant(v) => *v.insert(GlyphRecord {
                references: 1,
                ..record
            }),
        }
    }

    /// Drop a reference to a glyph.
    ///
    /// The glyph becomes idle when its last reference is released.
    ///
    /// # Panics
    ///
    /// Panics if the glyph has no references left to release.
    pub(crate) fn release(&mut self, character: char, free: &mut FreeSpaceList) {
        let mut entry = match self.active.entry(character) {
            Entry::Occupied(o) => o,
            Entry::Vacant(_) => panic!("over-release {:?}: glyph is not active", character),
        };

        let floor = if character == REPLACEMENT_CHARACTER { 1 } else { 0 };
        let record = entry.get_mut();
        if record.references <= floor {
            panic!("over-release {:?}", character);
        }

        record.references -= 1;
        if record.references == 0 {
            let record = entry.remove();
            self.idle.put(record, free);
        }
    }

    /// Reclaim the oldest half of the idle glyphs, rounded up, or all of them if `partial`
    /// is false.
    ///
    /// Returns the number of glyphs reclaimed.
    pub(crate) fn purge(&mut self, partial: bool, free: &mut FreeSpaceList) -> usize {
        self.idle.purge(partial, free)
    }

    pub(crate) fn active_len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn idle_len(&self) -> usize {
        self.idle.glyphs.len()
    }

    /// The references held on a loaded glyph.
    pub(crate) fn reference_count(&self, character: char) -> Option<u32> {
        match self.active.get(&character) {
            Some(record) => Some(record.references),
            None => self.idle.glyphs.get(&character).map(|_| 0),
        }
    }

    pub(crate) fn is_idle(&self, character: char) -> bool {
        self.idle.glyphs.contains_key(&character)
    }

    /// The age of an idle glyph.
    pub(crate) fn aging_key(&self, character: char) -> Option<u16> {
        self.idle.glyphs.get(&character).map(|record| record.age)
    }

    /// Every slot held by a loaded glyph, active or idle.
    pub(crate) fn slots(&self) -> impl Iterator<Item = GlyphSlot> + '_ {
        self.active
            .values()
            .chain(self.idle.glyphs.values())
            .map(|record| record.slot)
    }

    #[cfg(test)]
    fn set_idle_counter(&mut self, counter: u16) {
        self.idle.counter = counter;
    }
}

impl IdleSet {
    fn put(&mut self, mut record: GlyphRecord, free: &mut FreeSpaceList) {
        debug_assert_eq!(record.references, 0);

        // Bound the idle set for callers that churn through glyphs without drawing.
        if self.glyphs.len() >= self.capacity {
            tracing::debug!("idle set reached {} glyphs, purging", self.glyphs.len());
            self.purge(true, free);
        }

        // Coarsen the ages instead of wrapping around.
        if self.counter == u16::MAX {
            tracing::debug!("idle counter overflow, rescaling {} ages", self.glyphs.len());
            for glyph in self.glyphs.values_mut() {
                glyph.age /= 4;
            }
            self.counter /= 4;
        }

        record.age = self.counter;
        self.counter += 1;
        self.glyphs.insert(record.character, record);
    }

    fn purge(&mut self, partial: bool, free: &mut FreeSpaceList) -> usize {
        if self.glyphs.is_empty() {
            return 0;
        }

        let mut ordered: Vec<GlyphRecord> = self.glyphs.drain().map(|(_, glyph)| glyph).collect();
        ordered.sort_by_key(|glyph| (glyph.age, glyph.character));

        let count = if partial {
            (ordered.len() + 1) / 2
        } else {
            ordered.len()
        };

        // Put back the survivors.
        let survivors = ordered.split_off(count);
        self.glyphs
            .extend(survivors.into_iter().map(|glyph| (glyph.character, glyph)));

        for glyph in ordered {
            free.insert(glyph.slot);
        }

        tracing::trace!("reclaimed {} idle glyphs, {} left", count, self.glyphs.len());
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A cache holding `chars`, each in its own 10 pixel wide slot of row 0.
    fn loaded(chars: &str, capacity: usize) -> (GlyphLifecycleCache, FreeSpaceList) {
        let mut cache = GlyphLifecycleCache::new(capacity);
        let mut free = FreeSpaceList::new();
        free.push_page(0, 128, 128);

        for ch in chars.chars() {
            let slot = free.find_fit(10, 0).unwrap();
            cache.insert(GlyphRecord::new(ch, slot, 8.0));
        }

        (cache, free)
    }

    #[test]
    fn references_are_counted() {
        let (mut cache, mut free) = loaded("a", 16);
        assert_eq!(cache.reference_count('a'), Some(1));

        cache.reuse('a').unwrap();
        assert_eq!(cache.reference_count('a'), Some(2));

        cache.release('a', &mut free);
        assert_eq!(cache.reference_count('a'), Some(1));
        assert_eq!(cache.idle_len(), 0);

        cache.release('a', &mut free);
        assert_eq!(cache.reference_count('a'), Some(0));
        assert_eq!(cache.idle_len(), 1);
        assert_eq!(cache.active_len(), 0);
    }

    #[test]
    fn idle_glyphs_are_revived() {
        let (mut cache, mut free) = loaded("a", 16);
        cache.release('a', &mut free);
        assert_eq!(cache.aging_key('a'), Some(0));

        let record = cache.reuse('a').unwrap();
        assert_eq!(record.references, 1);
        assert_eq!(cache.aging_key('a'), None);
        assert_eq!(cache.idle_len(), 0);

        // Reviving cancels the reclaim.
        assert_eq!(cache.purge(false, &mut free), 0);
        assert_eq!(cache.reference_count('a'), Some(1));
    }

    #[test]
    fn unknown_glyphs_are_not_reused() {
        let (mut cache, _) = loaded("a", 16);
        assert!(cache.reuse('b').is_none());
    }

    #[test]
    #[should_panic(expected = "over-release")]
    fn over_release_panics() {
        let (mut cache, mut free) = loaded("a", 16);
        cache.release('a', &mut free);
        cache.release('a', &mut free);
    }

    #[test]
    #[should_panic(expected = "over-release")]
    fn replacement_pin_cannot_be_released() {
        let mut cache = GlyphLifecycleCache::new(16);
        let mut free = FreeSpaceList::new();
        free.push_page(0, 128, 128);
        let slot = free.find_fit(10, 0).unwrap();
        cache.pin_replacement(GlyphRecord::new(REPLACEMENT_CHARACTER, slot, 5.0));

        cache.replacement();
        cache.release(REPLACEMENT_CHARACTER, &mut free);
        assert_eq!(cache.reference_count(REPLACEMENT_CHARACTER), Some(1));

        cache.release(REPLACEMENT_CHARACTER, &mut free);
    }

    #[test]
    fn partial_purge_reclaims_oldest_half() {
        let (mut cache, mut free) = loaded("ABC", 16);
        for ch in "ABC".chars() {
            cache.release(ch, &mut free);
        }

        assert_eq!(cache.purge(true, &mut free), 2);
        assert_eq!(cache.idle_len(), 1);
        assert_eq!(cache.reference_count('A'), None);
        assert_eq!(cache.reference_count('B'), None);
        assert_eq!(cache.reference_count('C'), Some(0));

        // A and B were adjacent at the start of the row.
        assert_eq!(free.iter().next().map(|slot| slot.width), Some(20));
    }

    #[test]
    fn purge_order_follows_release_order() {
        let (mut cache, mut free) = loaded("ABC", 16);
        for ch in "CAB".chars() {
            cache.release(ch, &mut free);
        }

        assert_eq!(cache.purge(true, &mut free), 2);
        assert_eq!(cache.reference_count('B'), Some(0));
        assert_eq!(cache.reference_count('C'), None);
        assert_eq!(cache.reference_count('A'), None);
    }

    #[test]
    fn active_glyphs_survive_purge() {
        let (mut cache, mut free) = loaded("ABCD", 16);
        cache.release('A', &mut free);
        cache.release('C', &mut free);

        assert_eq!(cache.purge(false, &mut free), 2);
        assert_eq!(cache.reference_count('B'), Some(1));
        assert_eq!(cache.reference_count('D'), Some(1));
        assert_eq!(cache.active_len(), 2);
        assert_eq!(cache.idle_len(), 0);
    }

    #[test]
    fn full_idle_set_is_purged_on_release() {
        let (mut cache, mut free) = loaded("abcde", 4);
        for ch in "abcd".chars() {
            cache.release(ch, &mut free);
        }
        assert_eq!(cache.idle_len(), 4);

        // The set is full, so the two oldest go before `e` is added.
        cache.release('e', &mut free);
        assert_eq!(cache.idle_len(), 3);
        assert_eq!(cache.aging_key('a'), None);
        assert_eq!(cache.aging_key('b'), None);
        assert!(cache.aging_key('c').is_some());
        assert!(cache.aging_key('e').is_some());
    }

    #[test]
    fn counter_overflow_rescales_ages() {
        let (mut cache, mut free) = loaded("xyz", 16);
        cache.set_idle_counter(u16::MAX - 2);

        cache.release('x', &mut free);
        cache.release('y', &mut free);
        assert_eq!(cache.aging_key('x'), Some(u16::MAX - 2));
        assert_eq!(cache.aging_key('y'), Some(u16::MAX - 1));

        cache.release('z', &mut free);
        let (x, y, z) = (
            cache.aging_key('x').unwrap(),
            cache.aging_key('y').unwrap(),
            cache.aging_key('z').unwrap(),
        );
        assert!(x <= y && y <= z);
        assert_eq!(z, u16::MAX / 4);

        // The oldest still goes first.
        assert_eq!(cache.purge(true, &mut free), 2);
        assert_eq!(cache.aging_key('x'), None);
        assert_eq!(cache.aging_key('z'), Some(z));
    }
}
