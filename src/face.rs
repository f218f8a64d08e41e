//! Boundary to the font/shaping backend.
//!
//! The layout engine never talks to a font library directly. It asks a
//! [`Face`] for extents and shaped glyphs, and hands the same face to the
//! drawing [`Surface`](crate::surface::Surface) when painting.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

mod fontdue_face;
#[cfg(test)]
pub(crate) mod testing;

pub use fontdue_face::FontdueFace;

/// Shared, reference-counted font face.
///
/// Blocks of a [`TextLayout`](crate::text::TextLayout) keep a clone of the
/// handle, so the face lives at least as long as any text that uses it.
pub type FaceHandle = Arc<dyn Face>;

/// Process-unique identity of a face instance.
///
/// Used to decide when the active font of a surface has to change and as part
/// of glyph cache keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(u64);

impl FaceId {
    /// Allocates a fresh id. Ids are never reused within a process.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Vertical metrics of a face at a given size, in device units.
///
/// `descent` is positive below the baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FontExtents {
    pub ascent: f32,
    pub descent: f32,
    pub height: f32,
    pub max_x_advance: f32,
    pub max_y_advance: f32,
}

/// One glyph as returned by [`Face::shape`], in font units.
///
/// `cluster` is the byte offset, inside the shaped text, of the first
/// character this glyph represents. Offsets follow the usual font convention
/// of a y axis pointing up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapedGlyph {
    pub codepoint: u32,
    pub cluster: u32,
    pub x_advance: f32,
    pub y_advance: f32,
    pub x_offset: f32,
    pub y_offset: f32,
}

/// Coverage bitmap of a single glyph.
///
/// `xmin`/`ymin` locate the bottom-left corner of the bitmap relative to the
/// pen position on the baseline (y up). `coverage` is row-major, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterizedGlyph {
    pub width: usize,
    pub height: usize,
    pub xmin: i32,
    pub ymin: i32,
    pub coverage: Vec<u8>,
}

/// A font face usable by the layout engine.
pub trait Face: Send + Sync {
    fn id(&self) -> FaceId;

    /// Design units per em. Shaping output is scaled by `font_size / units_per_em`.
    fn units_per_em(&self) -> f32;

    /// Extents at `font_size`, in device units.
    fn font_extents(&self, font_size: f32) -> FontExtents;

    /// Shapes `text` left to right.
    ///
    /// Returns [`LayoutError::ResourceUnavailable`](crate::error::LayoutError::ResourceUnavailable)
    /// when this face has no usable shaping implementation.
    fn shape(&self, text: &str) -> Result<Vec<ShapedGlyph>>;

    /// Whether [`Self::shape`] can work at all. A block whose face answers
    /// `false` is left out of the layout, even if it holds nothing to shape.
    fn can_shape(&self) -> bool {
        true
    }

    /// Rasterizes a glyph for CPU drawing. Faces that cannot rasterize return `None`.
    fn rasterize(&self, _glyph: u32, _font_size: f32) -> Option<RasterizedGlyph> {
        None
    }
}
