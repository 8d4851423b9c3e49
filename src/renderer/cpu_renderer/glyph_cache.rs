use std::borrow::Cow;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use crate::font::{Face, GlyphBox};
use crate::glyph_id::GlyphId;

#[derive(Default, Clone, Copy)]
struct Links {
    newer: Option<usize>,
    older: Option<usize>,
}

/// Fixed-size blocks of coverage data with least-recently-used eviction.
struct BlockAtlas {
    capacity: usize,
    block_size: usize,
    data: Vec<u8>,

    links: Vec<Links>,
    newest: Option<usize>,
    oldest: Option<usize>,
    slots: HashMap<GlyphId, (usize, usize), fxhash::FxBuildHasher>,
    free: Vec<usize>,
    owners: Vec<Option<GlyphId>>,
}

impl BlockAtlas {
    fn new(capacity: NonZeroUsize, block_size: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        let block_size = block_size.get();

        Self {
            capacity,
            block_size,
            data: vec![0; capacity * block_size],
            links: vec![Links::default(); capacity],
            newest: None,
            oldest: None,
            slots: HashMap::with_capacity_and_hasher(capacity, fxhash::FxBuildHasher::default()),
            free: (0..capacity).collect(),
            owners: vec![None; capacity],
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free = (0..self.capacity).collect();
        self.owners.fill(None);
        self.links.fill(Links::default());
        self.newest = None;
        self.oldest = None;
    }

    /// Returns exactly the bytes that were stored for `key`.
    fn get_or_rasterize(&mut self, key: &GlyphId, f: impl FnOnce() -> Vec<u8>) -> &[u8] {
        if let Some(&(index, len)) = self.slots.get(key) {
            self.touch(index);

            let start = index * self.block_size;
            return &self.data[start..start + len];
        }

        let rasterized = f();
        let len = rasterized.len().min(self.block_size);
        let slot = self.claim_slot(*key, len);

        let start = slot * self.block_size;
        self.data[start..start + len].copy_from_slice(&rasterized[..len]);
        &self.data[start..start + len]
    }
}

/// internal helpers
impl BlockAtlas {
    fn link_newest(&mut self, slot: usize, key: GlyphId, len: usize) {
        self.links[slot].newer = None;
        self.links[slot].older = self.newest;
        self.slots.insert(key, (slot, len));
        self.owners[slot] = Some(key);

        if let Some(previous) = self.newest {
            self.links[previous].newer = Some(slot);
        }

        self.newest = Some(slot);
        if self.oldest.is_none() {
            self.oldest = Some(slot);
        }
    }

    /// Takes a free slot, or evicts the least recently used one.
    fn claim_slot(&mut self, key: GlyphId, len: usize) -> usize {
        let slot = match (self.free.pop(), self.oldest) {
            (Some(empty), _) => empty,
            (None, Some(oldest)) => {
                if let Some(next_oldest) = self.links[oldest].newer {
                    self.links[next_oldest].older = None;
                    self.oldest = Some(next_oldest);
                } else {
                    // single block
                    self.newest = None;
                    self.oldest = None;
                }

                if let Some(old_key) = self.owners[oldest].take() {
                    self.slots.remove(&old_key);
                }

                oldest
            }
            // capacity is non-zero, so a full atlas always has an oldest block
            (None, None) => 0,
        };

        self.link_newest(slot, key, len);
        slot
    }

    fn touch(&mut self, slot: usize) {
        let older = self.links[slot].older;
        let Some(newer) = self.links[slot].newer else {
            return;
        };

        self.links[newer].older = older;
        match older {
            Some(older) => self.links[older].newer = Some(newer),
            None => self.oldest = Some(newer),
        }

        if let Some(previous) = self.newest {
            self.links[previous].newer = Some(slot);
        }
        self.links[slot].older = self.newest;
        self.links[slot].newer = None;
        self.newest = Some(slot);
    }
}

/// A rasterized glyph. Glyphs larger than every block are rasterized on
/// demand and handed out owned.
pub struct GlyphCacheItem<'a> {
    pub glyph: GlyphBox,
    pub data: Cow<'a, [u8]>,
}

/// Coverage masks keyed by [`GlyphId`], bucketed by bitmap size.
pub struct GlyphCache {
    /// Ascending block size.
    atlases: Vec<BlockAtlas>,
}

impl Default for GlyphCache {
    /// Small glyphs are plentiful, large ones rare.
    fn default() -> Self {
        let config = [(32 * 32, 1024), (64 * 64, 512), (128 * 128, 128), (256 * 256, 32)];
        let config: Vec<(NonZeroUsize, NonZeroUsize)> = config
            .iter()
            .filter_map(|&(block, capacity)| {
                Some((NonZeroUsize::new(block)?, NonZeroUsize::new(capacity)?))
            })
            .collect();
        Self::new(&config)
    }
}

impl GlyphCache {
    /// `tiers` lists `(block size in bytes, number of blocks)`.
    pub fn new(tiers: &[(NonZeroUsize, NonZeroUsize)]) -> Self {
        let mut tiers = tiers.to_vec();
        tiers.sort_by_key(|&(block_size, _)| block_size);

        Self {
            atlases: tiers
                .into_iter()
                .map(|(block_size, capacity)| BlockAtlas::new(capacity, block_size))
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        self.atlases.iter_mut().for_each(BlockAtlas::clear);
    }

    pub fn get(&mut self, glyph_id: &GlyphId, face: &dyn Face) -> GlyphCacheItem<'_> {
        let ch = glyph_id.ch();
        let px = glyph_id.font_size() as f32;

        let glyph = face.glyph_box(ch, px);
        let area = glyph.width * glyph.height;
        if area == 0 {
            return GlyphCacheItem {
                glyph,
                data: Cow::Borrowed(&[]),
            };
        }

        match self.atlases.iter_mut().find(|atlas| atlas.block_size >= area) {
            Some(atlas) => {
                let data = atlas.get_or_rasterize(glyph_id, || face.rasterize(ch, px).1);
                GlyphCacheItem {
                    glyph,
                    data: Cow::Borrowed(data),
                }
            }
            None => GlyphCacheItem {
                glyph,
                data: Cow::Owned(face.rasterize(ch, px).1),
            },
        }
    }
}
