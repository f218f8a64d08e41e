//! Boundary to the drawing backend.

use crate::face::FaceHandle;
use crate::geometry::{Point, Rect};

/// A glyph ready to paint.
///
/// `position` is the pen position on the baseline in surface coordinates
/// (y down). The layout has already applied alignment, line offsets and
/// shaping offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionedGlyph {
    pub glyph: u32,
    pub position: Point,
}

/// Something glyphs can be painted onto.
///
/// [`TextLayout`](crate::text::TextLayout) wraps each drawing pass in
/// `save`/`restore`, clips to the target rect unless asked not to, and calls
/// `set_font` only when the face differs from the previous run's. The font
/// size is the same for every run of one pass.
pub trait Surface {
    fn save(&mut self);

    fn restore(&mut self);

    /// Intersects the current clip with `rect`.
    fn clip_to_rect(&mut self, rect: &Rect);

    fn set_font(&mut self, face: &FaceHandle, font_size: f32);

    /// Paints glyphs with the active font.
    fn draw_glyphs(&mut self, glyphs: &[PositionedGlyph]);
}
