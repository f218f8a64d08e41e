mod glyph_cache;

use euclid::default::Box2D;

use crate::face::FaceHandle;
use crate::geometry::{Rect, point2};
use crate::glyph_id::GlyphId;
use crate::surface::{PositionedGlyph, Surface};

pub use glyph_cache::{GlyphCache, GlyphCacheItem};

/// Simple L8 bitmap produced by [`BitmapSurface`].
///
/// Pixels are arranged in row-major order with the origin at the top-left.
/// Each pixel stores a single 8-bit coverage value where `0` represents
/// transparent/empty and `255` is fully opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        let len = width.saturating_mul(height);
        Self {
            width,
            height,
            pixels: vec![0; len],
        }
    }

    /// Coverage at `(x, y)`, or `None` outside the bitmap.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Adds coverage to a pixel, saturating at 255. Out of bounds writes are ignored.
    fn accumulate(&mut self, x: usize, y: usize, alpha: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let pixel = &mut self.pixels[y * self.width + x];
        *pixel = pixel.saturating_add(alpha);
    }

    fn bounds(&self) -> Box2D<i32> {
        let width = i32::try_from(self.width).unwrap_or(i32::MAX);
        let height = i32::try_from(self.height).unwrap_or(i32::MAX);
        Box2D::new(point2(0, 0), point2(width, height))
    }
}

/// CPU [`Surface`] that rasterizes glyphs into a [`Bitmap`] through a
/// [`GlyphCache`].
///
/// `save`/`restore` keep a stack of clip boxes. The active font is not part of
/// the saved state.
pub struct BitmapSurface {
    bitmap: Bitmap,
    cache: GlyphCache,
    clip: Box2D<i32>,
    clip_stack: Vec<Box2D<i32>>,
    font: Option<(FaceHandle, f32)>,
}

impl BitmapSurface {
    /// Creates a surface over a cleared `width` x `height` bitmap.
    pub fn new(width: usize, height: usize, cache: GlyphCache) -> Self {
        let bitmap = Bitmap::new(width, height);
        Self {
            clip: bitmap.bounds(),
            bitmap,
            cache,
            clip_stack: Vec::new(),
            font: None,
        }
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn into_bitmap(self) -> Bitmap {
        self.bitmap
    }

    /// Clears the pixels. The glyph cache is kept.
    pub fn clear(&mut self) {
        self.bitmap.pixels.fill(0);
    }

    /// Returns a reference to the underlying glyph cache.
    pub fn cache(&self) -> &GlyphCache {
        &self.cache
    }

    /// Returns a mutable reference to the underlying glyph cache.
    pub fn cache_mut(&mut self) -> &mut GlyphCache {
        &mut self.cache
    }
}

impl Surface for BitmapSurface {
    fn save(&mut self) {
        self.clip_stack.push(self.clip);
    }

    fn restore(&mut self) {
        match self.clip_stack.pop() {
            Some(clip) => self.clip = clip,
            None => log::warn!("BitmapSurface::restore called without a matching save"),
        }
    }

    fn clip_to_rect(&mut self, rect: &Rect) {
        self.clip = self
            .clip
            .intersection(&rect.to_box2d())
            .unwrap_or_else(Box2D::zero);
    }

    fn set_font(&mut self, face: &FaceHandle, font_size: f32) {
        self.font = Some((FaceHandle::clone(face), font_size));
    }

    fn draw_glyphs(&mut self, glyphs: &[PositionedGlyph]) {
        let Self {
            bitmap,
            cache,
            clip,
            font,
            ..
        } = self;

        let Some((face, font_size)) = font else {
            log::warn!("draw_glyphs called before set_font; {} glyphs dropped", glyphs.len());
            return;
        };
        if clip.is_empty() {
            return;
        }

        for glyph in glyphs {
            let key = GlyphId::new(face.id(), glyph.glyph, *font_size);
            let Some(cached) = cache.get(&key, &**face) else {
                continue;
            };
            if cached.width == 0 || cached.height == 0 {
                continue;
            }

            // coverage rows run top to bottom; ymin is the bitmap's bottom edge
            let left = glyph.position.x.round() as i32 + cached.xmin;
            let top = glyph.position.y.round() as i32 - (cached.ymin + cached.height as i32);

            for row in 0..cached.height {
                let y = top + row as i32;
                for col in 0..cached.width {
                    let alpha = cached.data[row * cached.width + col];
                    if alpha == 0 {
                        continue;
                    }

                    let x = left + col as i32;
                    if !clip.contains(point2(x, y)) {
                        continue;
                    }
                    bitmap.accumulate(x as usize, y as usize, alpha);
                }
            }
        }
    }
}
