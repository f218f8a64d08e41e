use crate::error::{LayoutError, Result};

use super::{Face, FaceId, FontExtents, RasterizedGlyph, ShapedGlyph};

/// [`Face`] implementation backed by `fontdue`.
///
/// Shaping is a direct character map lookup with pair kerning: every `char`
/// produces one glyph whose cluster is the char's byte offset. There is no
/// glyph substitution, which is enough for simple left-to-right scripts.
pub struct FontdueFace {
    id: FaceId,
    font: fontdue::Font,
    max_advance: f32,
}

impl FontdueFace {
    /// Wraps an already parsed font.
    pub fn new(font: fontdue::Font) -> Self {
        let units_per_em = font.units_per_em();
        let max_advance = (0..font.glyph_count())
            .map(|glyph| font.metrics_indexed(glyph, units_per_em).advance_width)
            .fold(0.0, f32::max);

        Self {
            id: FaceId::next(),
            font,
            max_advance,
        }
    }

    /// Parses a font file (or one face of a collection) from memory.
    pub fn from_bytes(data: &[u8], collection_index: u32) -> Result<Self, &'static str> {
        let font = fontdue::Font::from_bytes(
            data,
            fontdue::FontSettings {
                collection_index,
                ..Default::default()
            },
        )?;
        Ok(Self::new(font))
    }

    /// The underlying `fontdue` font.
    pub fn font(&self) -> &fontdue::Font {
        &self.font
    }
}

impl Face for FontdueFace {
    fn id(&self) -> FaceId {
        self.id
    }

    fn units_per_em(&self) -> f32 {
        self.font.units_per_em()
    }

    fn font_extents(&self, font_size: f32) -> FontExtents {
        let Some(metrics) = self.font.horizontal_line_metrics(font_size) else {
            return FontExtents::default();
        };

        FontExtents {
            ascent: metrics.ascent,
            descent: -metrics.descent,
            height: metrics.new_line_size,
            max_x_advance: self.max_advance * font_size / self.font.units_per_em(),
            max_y_advance: 0.0,
        }
    }

    fn can_shape(&self) -> bool {
        // vertical-only fonts have no horizontal layout to offer
        self.font
            .horizontal_line_metrics(self.font.units_per_em())
            .is_some()
    }

    fn shape(&self, text: &str) -> Result<Vec<ShapedGlyph>> {
        let units_per_em = self.font.units_per_em();
        if !self.can_shape() {
            return Err(LayoutError::ResourceUnavailable {
                face: self.id,
                reason: "font has no horizontal metrics",
            });
        }

        let mut glyphs: Vec<ShapedGlyph> = Vec::with_capacity(text.len());
        let mut previous: Option<u16> = None;

        for (offset, ch) in text.char_indices() {
            let glyph_index = self.font.lookup_glyph_index(ch);
            let metrics = self.font.metrics_indexed(glyph_index, units_per_em);

            if let (Some(left), Some(last)) = (previous, glyphs.last_mut()) {
                let kerning = self
                    .font
                    .horizontal_kern_indexed(left, glyph_index, units_per_em)
                    .unwrap_or(0.0);
                last.x_advance += kerning;
            }

            glyphs.push(ShapedGlyph {
                codepoint: glyph_index as u32,
                cluster: offset as u32,
                x_advance: metrics.advance_width,
                y_advance: 0.0,
                x_offset: 0.0,
                y_offset: 0.0,
            });
            previous = Some(glyph_index);
        }

        Ok(glyphs)
    }

    fn rasterize(&self, glyph: u32, font_size: f32) -> Option<RasterizedGlyph> {
        let glyph_index = u16::try_from(glyph).ok()?;
        let (metrics, coverage) = self.font.rasterize_indexed(glyph_index, font_size);

        Some(RasterizedGlyph {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            coverage,
        })
    }
}
