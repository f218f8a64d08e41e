use crate::face::FaceId;

pub const SUB_PIXEL_QUANTIZE: f32 = 256f32;

/// Cache key for one rasterized glyph: face, glyph index and quantized size.
///
/// The same glyph is not guaranteed to receive the same `GlyphId` across program runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphId {
    face_id: FaceId,
    glyph_index: u32,
    font_size: u32, // font size * SUB_PIXEL_QUANTIZE as u32
}

impl GlyphId {
    pub fn new(face_id: FaceId, glyph_index: u32, font_size: f32) -> Self {
        Self {
            face_id,
            glyph_index,
            font_size: (font_size * SUB_PIXEL_QUANTIZE).round() as u32,
        }
    }

    pub fn face_id(&self) -> FaceId {
        self.face_id
    }

    pub fn glyph_index(&self) -> u32 {
        self.glyph_index
    }

    pub fn font_size(&self) -> f32 {
        self.font_size as f32 / SUB_PIXEL_QUANTIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_within_a_quantum_share_a_key() {
        let face = FaceId::next();
        let a = GlyphId::new(face, 7, 12.0);
        let b = GlyphId::new(face, 7, 12.0 + 0.4 / SUB_PIXEL_QUANTIZE);
        let c = GlyphId::new(face, 7, 12.5);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(c.font_size(), 12.5);
    }
}
