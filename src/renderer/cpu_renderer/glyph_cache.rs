use std::borrow::Cow;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use crate::face::{Face, RasterizedGlyph};
use crate::glyph_id::GlyphId;

#[derive(Default, Clone, Copy, Debug, PartialEq)]
struct LruNode {
    newer: Option<usize>,
    older: Option<usize>,
}

/// Placement of the coverage stored in one slot.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
struct SlotMetrics {
    width: usize,
    height: usize,
    xmin: i32,
    ymin: i32,
}

impl SlotMetrics {
    fn len(&self) -> usize {
        self.width * self.height
    }
}

/// Fixed number of equally sized coverage slots with least-recently-used eviction.
struct VecAtlas {
    capacity: usize,
    block_size: usize,
    data: Vec<u8>,
    metrics: Vec<SlotMetrics>,

    lru_nodes: Vec<LruNode>,
    lru_head: Option<usize>,
    lru_tail: Option<usize>,
    lru_map: HashMap<GlyphId, usize, fxhash::FxBuildHasher>,
    lru_empties: Vec<usize>,
    lru_keys: Vec<Option<GlyphId>>,
}

impl VecAtlas {
    fn new(capacity: NonZeroUsize, block_size: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        let block_size = block_size.get();

        Self {
            capacity,
            block_size,
            data: vec![0; capacity * block_size],
            metrics: vec![SlotMetrics::default(); capacity],
            lru_nodes: vec![LruNode::default(); capacity],
            lru_head: None,
            lru_tail: None,
            lru_map: HashMap::with_capacity_and_hasher(capacity, fxhash::FxBuildHasher::default()),
            lru_empties: (0..capacity).collect(),
            lru_keys: vec![None; capacity],
        }
    }

    fn clear(&mut self) {
        self.lru_map.clear();
        self.lru_empties = (0..self.capacity).collect();
        self.lru_keys.fill(None);
        self.lru_nodes.fill(LruNode::default());
        self.lru_head = None;
        self.lru_tail = None;
    }

    fn len(&self) -> usize {
        self.lru_map.len()
    }

    fn contains(&self, key: &GlyphId) -> bool {
        self.lru_map.contains_key(key)
    }

    /// Marks `key` as most recently used and returns its slot.
    fn touch(&mut self, key: &GlyphId) -> Option<usize> {
        let index = *self.lru_map.get(key)?;
        if self.lru_head != Some(index) {
            self.unlink(index);
            self.attach_to_head(index);
        }
        Some(index)
    }

    /// Stores a glyph in a free slot, evicting the least recently used one if
    /// the atlas is full. `glyph.coverage` must fit in a block.
    fn insert(&mut self, key: GlyphId, glyph: &RasterizedGlyph) -> usize {
        debug_assert!(!self.contains(&key), "glyph {key:?} already cached");
        debug_assert!(glyph.coverage.len() <= self.block_size);

        let index = match (self.lru_empties.pop(), self.lru_tail) {
            (Some(index), _) => index,
            (None, Some(tail)) => {
                self.unlink(tail);
                if let Some(old_key) = self.lru_keys[tail].take() {
                    self.lru_map.remove(&old_key);
                }
                tail
            }
            (None, None) => unreachable!("a full atlas always has a tail"),
        };

        let from = index * self.block_size;
        self.data[from..from + glyph.coverage.len()].copy_from_slice(&glyph.coverage);
        self.metrics[index] = SlotMetrics {
            width: glyph.width,
            height: glyph.height,
            xmin: glyph.xmin,
            ymin: glyph.ymin,
        };

        self.lru_map.insert(key, index);
        self.lru_keys[index] = Some(key);
        self.attach_to_head(index);
        index
    }

    fn item(&self, index: usize) -> GlyphCacheItem<'_> {
        let metrics = self.metrics[index];
        let from = index * self.block_size;
        GlyphCacheItem {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            data: Cow::Borrowed(&self.data[from..from + metrics.len()]),
        }
    }
}

/// internal helpers
impl VecAtlas {
    fn unlink(&mut self, index: usize) {
        let LruNode { newer, older } = self.lru_nodes[index];
        match newer {
            Some(newer) => self.lru_nodes[newer].older = older,
            None => self.lru_head = older,
        }
        match older {
            Some(older) => self.lru_nodes[older].newer = newer,
            None => self.lru_tail = newer,
        }
        self.lru_nodes[index] = LruNode::default();
    }

    fn attach_to_head(&mut self, index: usize) {
        self.lru_nodes[index] = LruNode {
            newer: None,
            older: self.lru_head,
        };
        if let Some(old_head) = self.lru_head {
            self.lru_nodes[old_head].newer = Some(index);
        }

        self.lru_head = Some(index);
        if self.lru_tail.is_none() {
            self.lru_tail = Some(index);
        }
    }
}

/// Coverage of one glyph, either borrowed from the cache or freshly
/// rasterized when it was too large for any atlas.
#[derive(Debug)]
pub struct GlyphCacheItem<'a> {
    pub width: usize,
    pub height: usize,
    pub xmin: i32,
    pub ymin: i32,
    pub data: Cow<'a, [u8]>,
}

/// Rasterized glyph cache made of size-bucketed LRU atlases.
///
/// A glyph goes into the atlas with the smallest block that can hold its
/// coverage. Glyphs larger than every block are rasterized on every request.
pub struct GlyphCache {
    /// must be sorted by block size
    caches: Vec<VecAtlas>,
}

impl Default for GlyphCache {
    fn default() -> Self {
        const BUCKETS: [(usize, usize); 3] = [(32 * 32, 512), (64 * 64, 256), (128 * 128, 64)];
        let buckets: Vec<(NonZeroUsize, NonZeroUsize)> = BUCKETS
            .iter()
            .filter_map(|&(block, capacity)| {
                Some((NonZeroUsize::new(block)?, NonZeroUsize::new(capacity)?))
            })
            .collect();
        Self::new(&buckets)
    }
}

impl GlyphCache {
    /// Creates a cache from `(block size in bytes, slot count)` pairs.
    pub fn new(blocksize_capacity: &[(NonZeroUsize, NonZeroUsize)]) -> Self {
        let mut sorted = blocksize_capacity.to_vec();
        sorted.sort_by_key(|(block_size, _)| *block_size);

        let caches = sorted
            .into_iter()
            .map(|(block_size, capacity)| VecAtlas::new(capacity, block_size))
            .collect();

        Self { caches }
    }

    pub fn clear(&mut self) {
        for cache in &mut self.caches {
            cache.clear();
        }
    }

    /// Number of glyphs currently cached.
    pub fn len(&self) -> usize {
        self.caches.iter().map(VecAtlas::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the coverage of `glyph_id`, rasterizing it with `face` on a miss.
    ///
    /// `None` when the face cannot rasterize the glyph.
    pub fn get(&mut self, glyph_id: &GlyphId, face: &dyn Face) -> Option<GlyphCacheItem<'_>> {
        if let Some(position) = self.caches.iter().position(|cache| cache.contains(glyph_id)) {
            let cache = &mut self.caches[position];
            let index = cache.touch(glyph_id)?;
            return Some(cache.item(index));
        }

        let glyph = face.rasterize(glyph_id.glyph_index(), glyph_id.font_size())?;
        match self
            .caches
            .iter_mut()
            .find(|cache| cache.block_size >= glyph.coverage.len())
        {
            Some(cache) => {
                let index = cache.insert(*glyph_id, &glyph);
                Some(cache.item(index))
            }
            None => {
                log::trace!(
                    "glyph {:?} ({}x{}) is larger than every cache block",
                    glyph_id,
                    glyph.width,
                    glyph.height
                );
                Some(GlyphCacheItem {
                    width: glyph.width,
                    height: glyph.height,
                    xmin: glyph.xmin,
                    ymin: glyph.ymin,
                    data: Cow::Owned(glyph.coverage),
                })
            }
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::FaceId;
    use crate::face::testing::TestFace;

    fn make_key(face_id: FaceId, glyph: u32) -> GlyphId {
        GlyphId::new(face_id, glyph, 12.0)
    }

    fn coverage(value: u8) -> RasterizedGlyph {
        RasterizedGlyph {
            width: 1,
            height: 1,
            xmin: 0,
            ymin: 0,
            coverage: vec![value],
        }
    }

    fn atlas(capacity: usize, block_size: usize) -> VecAtlas {
        VecAtlas::new(
            NonZeroUsize::new(capacity).unwrap(),
            NonZeroUsize::new(block_size).unwrap(),
        )
    }

    #[test]
    fn atlas_insert_then_touch() {
        let face = FaceId::next();
        let mut atlas = atlas(2, 4);
        let key1 = make_key(face, 1);

        // empties are [0, 1], the last one is used first
        let glyph = RasterizedGlyph {
            width: 2,
            height: 2,
            xmin: -1,
            ymin: 3,
            coverage: vec![1, 2, 3, 4],
        };
        let index = atlas.insert(key1, &glyph);
        assert_eq!(index, 1);
        assert_eq!(atlas.lru_head, Some(1));
        assert_eq!(atlas.lru_tail, Some(1));

        let index = atlas.touch(&key1).unwrap();
        let item = atlas.item(index);
        assert_eq!(item.data.as_ref(), &[1, 2, 3, 4]);
        assert_eq!((item.xmin, item.ymin), (-1, 3));
        assert_eq!(atlas.len(), 1);
    }

    #[test]
    fn atlas_evicts_least_recent() {
        let face = FaceId::next();
        let mut atlas = atlas(2, 1);
        let key1 = make_key(face, 1);
        let key2 = make_key(face, 2);
        let key3 = make_key(face, 3);

        atlas.insert(key1, &coverage(1));
        atlas.insert(key2, &coverage(2));
        assert_eq!(atlas.lru_head, Some(0));
        assert_eq!(atlas.lru_tail, Some(1));
        assert_eq!(atlas.lru_nodes[0], LruNode { newer: None, older: Some(1) });
        assert_eq!(atlas.lru_nodes[1], LruNode { newer: Some(0), older: None });

        // key1 sits at the tail in slot 1
        atlas.insert(key3, &coverage(3));
        assert_eq!(atlas.len(), 2);
        assert!(!atlas.contains(&key1));
        assert!(atlas.contains(&key2));
        assert!(atlas.contains(&key3));

        assert_eq!(atlas.lru_head, Some(1));
        assert_eq!(atlas.lru_tail, Some(0));
        assert_eq!(atlas.lru_keys[1], Some(key3));
        assert_eq!(atlas.item(1).data.as_ref(), &[3]);
    }

    #[test]
    fn touch_moves_tail_to_head() {
        let face = FaceId::next();
        let mut atlas = atlas(3, 1);
        let key1 = make_key(face, 1);
        let key2 = make_key(face, 2);
        let key3 = make_key(face, 3);

        atlas.insert(key1, &coverage(1)); // slot 2
        atlas.insert(key2, &coverage(2)); // slot 1
        atlas.insert(key3, &coverage(3)); // slot 0

        assert_eq!(atlas.touch(&key1), Some(2));

        let head = atlas.lru_head.unwrap();
        let tail = atlas.lru_tail.unwrap();
        assert_eq!(head, 2);
        assert_eq!(tail, 1);
        let middle = atlas.lru_nodes[head].older.unwrap();
        assert_eq!(middle, 0);
        assert_eq!(atlas.lru_keys[middle], Some(key3));

        // the next insert evicts key2, not key1
        atlas.insert(make_key(face, 4), &coverage(4));
        assert!(atlas.contains(&key1));
        assert!(!atlas.contains(&key2));
    }

    #[test]
    fn atlas_with_one_slot() {
        let face = FaceId::next();
        let mut atlas = atlas(1, 1);
        let key1 = make_key(face, 1);
        let key2 = make_key(face, 2);

        atlas.insert(key1, &coverage(1));
        atlas.insert(key2, &coverage(2));
        assert_eq!(atlas.lru_head, Some(0));
        assert_eq!(atlas.lru_tail, Some(0));
        assert!(atlas.contains(&key2));
        assert!(!atlas.contains(&key1));

        atlas.clear();
        assert_eq!(atlas.len(), 0);
        assert_eq!(atlas.lru_head, None);
    }

    #[test]
    fn buckets_are_sorted_by_block_size() {
        let config = vec![
            (NonZeroUsize::new(20).unwrap(), NonZeroUsize::new(50).unwrap()),
            (NonZeroUsize::new(10).unwrap(), NonZeroUsize::new(100).unwrap()),
        ];

        let cache = GlyphCache::new(&config);
        assert_eq!(cache.caches.len(), 2);
        assert_eq!(cache.caches[0].block_size, 10);
        assert_eq!(cache.caches[1].block_size, 20);
    }

    #[test]
    fn cache_rasterizes_once() {
        let face = TestFace::new().handle();
        let mut cache = GlyphCache::default();
        let key = make_key(face.id(), 'a' as u32);

        let item = cache.get(&key, face.as_ref()).unwrap();
        assert_eq!((item.width, item.height), (2, 2));
        assert!(matches!(item.data, Cow::Borrowed(_)));
        assert_eq!(cache.len(), 1);

        cache.get(&key, face.as_ref()).unwrap();
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn oversized_glyph_is_not_cached() {
        let face = TestFace::new().handle();
        let config = [(NonZeroUsize::new(1).unwrap(), NonZeroUsize::new(4).unwrap())];
        let mut cache = GlyphCache::new(&config);

        let item = cache
            .get(&make_key(face.id(), 'a' as u32), face.as_ref())
            .unwrap();
        assert!(matches!(item.data, Cow::Owned(_)));
        assert_eq!(item.data.len(), 4);
        assert!(cache.is_empty());
    }
}
