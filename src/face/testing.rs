//! Deterministic face used by the unit tests.

use std::sync::Arc;

use crate::error::{LayoutError, Result};

use super::{Face, FaceHandle, FaceId, FontExtents, RasterizedGlyph, ShapedGlyph};

pub(crate) const LIGATURE_FI: u32 = 0xFB01;
pub(crate) const COMBINING_MARK: u32 = 0x0301;

/// Monospace face: every char advances `advance` design units out of 1000.
pub(crate) struct TestFace {
    id: FaceId,
    advance: f32,
    height_em: f32,
    ligatures: bool,
    marked: Option<char>,
    shapeable: bool,
}

impl TestFace {
    pub fn new() -> Self {
        Self {
            id: FaceId::next(),
            advance: 500.0,
            height_em: 1.0,
            ligatures: false,
            marked: None,
            shapeable: true,
        }
    }

    pub fn with_advance(mut self, advance: f32) -> Self {
        self.advance = advance;
        self
    }

    pub fn with_height(mut self, height_em: f32) -> Self {
        self.height_em = height_em;
        self
    }

    /// Shapes "fi" into a single glyph covering two bytes.
    pub fn with_ligatures(mut self) -> Self {
        self.ligatures = true;
        self
    }

    /// Follows every `ch` with a zero-width mark glyph sharing its cluster.
    pub fn with_mark_on(mut self, ch: char) -> Self {
        self.marked = Some(ch);
        self
    }

    pub fn unshapeable(mut self) -> Self {
        self.shapeable = false;
        self
    }

    pub fn handle(self) -> FaceHandle {
        Arc::new(self)
    }
}

impl Face for TestFace {
    fn id(&self) -> FaceId {
        self.id
    }

    fn units_per_em(&self) -> f32 {
        1000.0
    }

    fn font_extents(&self, font_size: f32) -> FontExtents {
        FontExtents {
            ascent: 0.8 * font_size,
            descent: 0.2 * font_size,
            height: self.height_em * font_size,
            max_x_advance: self.advance / 1000.0 * font_size,
            max_y_advance: 0.0,
        }
    }

    fn can_shape(&self) -> bool {
        self.shapeable
    }

    fn shape(&self, text: &str) -> Result<Vec<ShapedGlyph>> {
        if !self.shapeable {
            return Err(LayoutError::ResourceUnavailable {
                face: self.id,
                reason: "test face without shaper",
            });
        }

        let mut glyphs = Vec::new();
        let mut chars = text.char_indices();
        while let Some((offset, ch)) = chars.next() {
            let codepoint = if self.ligatures && ch == 'f' && text[offset..].starts_with("fi") {
                chars.next();
                LIGATURE_FI
            } else {
                ch as u32
            };
            glyphs.push(ShapedGlyph {
                codepoint,
                cluster: offset as u32,
                x_advance: self.advance,
                y_advance: 0.0,
                x_offset: 0.0,
                y_offset: 0.0,
            });
            if self.marked == Some(ch) {
                glyphs.push(ShapedGlyph {
                    codepoint: COMBINING_MARK,
                    cluster: offset as u32,
                    x_advance: 0.0,
                    y_advance: 0.0,
                    x_offset: 0.0,
                    y_offset: 0.0,
                });
            }
        }
        Ok(glyphs)
    }

    fn rasterize(&self, glyph: u32, _font_size: f32) -> Option<RasterizedGlyph> {
        if glyph == ' ' as u32 {
            return Some(RasterizedGlyph {
                width: 0,
                height: 0,
                xmin: 0,
                ymin: 0,
                coverage: Vec::new(),
            });
        }
        Some(RasterizedGlyph {
            width: 2,
            height: 2,
            xmin: 0,
            ymin: 0,
            coverage: vec![200; 4],
        })
    }
}
