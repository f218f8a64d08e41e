use std::ops::Range;
use std::sync::Arc;

use crate::error::Result;
use crate::face::{FaceHandle, FaceId};
use crate::format::{TextFormat, TextLayoutConfig};
use crate::geometry::{Point, Rect, point2, rect};
use crate::surface::{PositionedGlyph, Surface};

use super::line::{BreakPolicy, Line, LineBreaker, partition_paragraphs};
use super::run::{CharWidths, Runs, resolve_advance, shape_blocks};
use super::store::{Block, TextStore};

/// Lays out runs of styled text and measures or paints them.
///
/// Text is appended with [`Self::add_text`]. Runs, lines and per-byte rects
/// are derived state: [`Self::perform`] rebuilds them only when text was added
/// or removed, or when the font size, the wrap width or one of
/// [`TextFormat::LAYOUT_BITS`] changed since the last call.
///
/// A layout is meant to be owned by one caller. Faces are shared through
/// [`FaceHandle`] and may be used by many layouts at once.
pub struct TextLayout {
    config: TextLayoutConfig,
    store: TextStore,
    blocks: Vec<Block>,
    runs: Runs,
    lines: Vec<Line>,

    font_size: f32,
    line_width: f32,
    layout_bits: TextFormat,
    line_height: f32,
    ascent: f32,
    dirty: bool,
}

/// Geometry of one laid-out line, relative to the top-left of the text block.
#[derive(Clone, Debug, PartialEq)]
pub struct LineInfo {
    /// Bytes shown on this line. A terminating newline is not included.
    pub text_range: Range<usize>,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayout {
    /// Creates an empty layout with the default configuration.
    pub fn new() -> Self {
        Self::with_config(TextLayoutConfig::default())
    }

    pub fn with_config(config: TextLayoutConfig) -> Self {
        Self {
            config,
            store: TextStore::default(),
            blocks: Vec::new(),
            runs: Runs::default(),
            lines: Vec::new(),
            font_size: 0.0,
            line_width: 0.0,
            layout_bits: TextFormat::empty(),
            line_height: 0.0,
            ascent: 0.0,
            dirty: true,
        }
    }

    pub fn config(&self) -> &TextLayoutConfig {
        &self.config
    }

    /// Replaces the configuration. The next `perform` rebuilds if it changed.
    pub fn set_config(&mut self, config: TextLayoutConfig) {
        if config != self.config {
            self.config = config;
            self.dirty = true;
        }
    }
}

/// Text input and raw buffers
impl TextLayout {
    /// Drops all text and derived state.
    ///
    /// Releases this layout's references to every face it was given.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.store.clear();
        self.runs.clear();
        self.lines.clear();
        self.dirty = true;
    }

    /// Appends `length` bytes of `text` (all of it for `None`) drawn with `face`.
    ///
    /// A length past the end is clamped, and a length inside a multi-byte
    /// character is moved back to that character's start. Nothing is recorded
    /// for empty input.
    pub fn add_text(&mut self, face: &FaceHandle, text: &str, length: Option<usize>) -> Result<()> {
        let mut len = length.unwrap_or(text.len()).min(text.len());
        while !text.is_char_boundary(len) {
            len -= 1;
        }
        if len == 0 {
            return Ok(());
        }

        self.blocks.try_reserve(1)?;
        let offset = self.store.append(&text.as_bytes()[..len])?;
        self.blocks.push(Block::new(Arc::clone(face), offset, len));
        self.dirty = true;
        Ok(())
    }

    /// All text added since the last reset, in insertion order.
    pub fn text_buffer(&self) -> &[u8] {
        self.store.bytes()
    }

    /// One rect per byte of [`Self::text_buffer`], as of the last rebuild.
    ///
    /// Rects are relative to the top-left of the text block, before alignment.
    /// Bytes of blocks that could not be shaped keep an empty rect.
    pub fn rect_buffer(&self) -> &[Rect] {
        self.store.rects()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }
}

/// Results of the last rebuild
impl TextLayout {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Shared height of every line.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn lines(&self) -> impl Iterator<Item = LineInfo> + '_ {
        self.lines.iter().enumerate().map(|(index, line)| {
            let mut runs = self.runs.iter_range(line.begin, line.end);
            let text_range = match runs.next() {
                Some(first) => {
                    let start = self.runs.get(first).global_offset(&self.blocks);
                    let last = self.runs.get(runs.last().unwrap_or(first));
                    let mut end = last.global_offset(&self.blocks) + last.text_len;
                    if last.split_char == b'\n' {
                        end -= 1;
                    }
                    start..end
                }
                None => 0..0,
            };

            LineInfo {
                text_range,
                top: index as f32 * self.line_height,
                width: line.width,
                height: self.line_height,
            }
        })
    }
}

/// Measuring and drawing
impl TextLayout {
    /// Lays out the text and then measures and/or draws it.
    ///
    /// With [`TextFormat::CALCRECT`] the aligned bounding box of the text is
    /// written back into `rect`. With [`TextFormat::DRAWTEXT`] the glyphs are
    /// painted onto `surface`, aligned inside the original `rect`.
    ///
    /// # Panics
    /// Panics if `font_size` is not positive, or if `rect` is `None` without
    /// [`TextFormat::SINGLELINE`].
    pub fn perform(
        &mut self,
        font_size: f32,
        surface: Option<&mut dyn Surface>,
        rect: Option<&mut Rect>,
        format: TextFormat,
    ) -> Result<()> {
        let bounds = match rect.as_deref() {
            Some(rect) => *rect,
            None => {
                assert!(
                    format.contains(TextFormat::SINGLELINE),
                    "a target rect is required unless SINGLELINE is set"
                );
                Rect::zero()
            }
        };

        self.update(font_size, &bounds, format)?;

        if format.contains(TextFormat::DRAWTEXT) {
            match surface {
                Some(surface) => self.paint(surface, &bounds, format)?,
                None => log::warn!("DRAWTEXT requested without a surface."),
            }
        }

        if format.contains(TextFormat::CALCRECT)
            && let Some(rect) = rect
        {
            *rect = self.bounding_box(&bounds, format);
        }

        Ok(())
    }

    /// Returns the bounding box of the text aligned inside `bounds`.
    pub fn measure(&mut self, font_size: f32, bounds: Rect, format: TextFormat) -> Result<Rect> {
        self.update(font_size, &bounds, format)?;
        Ok(self.bounding_box(&bounds, format))
    }

    /// Paints the text onto `surface`, aligned inside `bounds`.
    pub fn draw(
        &mut self,
        font_size: f32,
        surface: &mut dyn Surface,
        bounds: Rect,
        format: TextFormat,
    ) -> Result<()> {
        self.update(font_size, &bounds, format)?;
        self.paint(surface, &bounds, format)
    }

    /// Rebuilds derived state if anything it depends on changed.
    fn update(&mut self, font_size: f32, bounds: &Rect, format: TextFormat) -> Result<()> {
        assert!(font_size > 0.0, "font size must be positive, got {font_size}");

        let layout_bits = format.layout_bits();
        let line_width = if layout_bits.contains(TextFormat::SINGLELINE) {
            0.0
        } else {
            bounds.size.width as f32
        };

        if self.dirty
            || font_size != self.font_size
            || line_width != self.line_width
            || layout_bits != self.layout_bits
        {
            self.font_size = font_size;
            self.line_width = line_width;
            self.layout_bits = layout_bits;
            self.rebuild()?;
        }
        Ok(())
    }

    fn tab_stop(&self) -> Option<f32> {
        self.layout_bits
            .contains(TextFormat::EXPANDTABS)
            .then_some(self.config.tab_width * self.font_size)
    }

    /// Discards runs and lines and computes them again from the blocks.
    ///
    /// The layout stays dirty if any stage fails.
    fn rebuild(&mut self) -> Result<()> {
        self.dirty = true;
        self.runs.clear();
        self.lines.clear();

        // Stage 1: shape every block into runs cut at control characters.
        shape_blocks(&mut self.blocks, &self.store, self.font_size, &mut self.runs)?;
        self.update_line_metrics();

        // Stage 2: paragraphs at newlines, then wrap to the target width.
        let single_line = self.layout_bits.contains(TextFormat::SINGLELINE);
        partition_paragraphs(&self.runs, single_line, &mut self.lines)?;
        if !single_line {
            let policy = if self.layout_bits.contains(TextFormat::WORDBREAK) {
                BreakPolicy::Word
            } else {
                BreakPolicy::Char
            };
            let tab_stop = self.tab_stop();
            LineBreaker {
                runs: &mut self.runs,
                blocks: &mut self.blocks,
                store: &self.store,
                max_width: self.line_width,
                policy,
                word_separators: &self.config.word_separators,
                tab_stop,
            }
            .break_lines(&mut self.lines)?;
        }

        // Stage 3: per-byte rects and line widths.
        self.place_characters();

        self.dirty = false;
        log::debug!(
            "Text layout rebuilt: {} blocks, {} runs, {} lines at {}px",
            self.blocks.len(),
            self.runs.len(),
            self.lines.len(),
            self.font_size
        );
        Ok(())
    }

    /// Line height and ascent shared by all lines: the largest over every
    /// face that contributed runs.
    fn update_line_metrics(&mut self) {
        let mut height = 0.0f32;
        let mut ascent = 0.0f32;

        for block in self.blocks.iter().filter(|block| block.shaped) {
            let extents = block.face.font_extents(self.font_size);
            height = height.max(extents.height);
            ascent = ascent.max(extents.ascent);
        }

        self.line_height = height * self.config.line_height_scale;
        self.ascent = ascent;
    }

    fn place_characters(&mut self) {
        let tab_stop = self.tab_stop();
        let line_height = self.line_height;
        let (bytes, rects) = self.store.parts_mut();
        rects.fill(Rect::zero());

        for (line_index, line) in self.lines.iter_mut().enumerate() {
            let y = line_index as f32 * line_height;
            let mut pen_x = 0.0f32;

            let mut current = line.begin;
            while let Some(run_index) = current {
                if current == line.end {
                    break;
                }
                let run = self.runs.get_mut(run_index);
                run.x = pen_x;
                let run = *run;

                let base = run.global_offset(&self.blocks);
                let widths = CharWidths::new(run.glyphs(&self.blocks), run.text_len);
                for (local, shaped) in widths.enumerate() {
                    let advance = resolve_advance(bytes[base + local], shaped, pen_x, tab_stop);
                    rects[base + local] = rect(
                        pen_x.round() as i32,
                        y.round() as i32,
                        advance.round() as i32,
                        line_height.round() as i32,
                    );
                    pen_x += advance;
                }

                current = run.next;
            }

            line.width = pen_x;
        }
    }

    fn bounding_box(&self, bounds: &Rect, format: TextFormat) -> Rect {
        let width = self.lines.iter().map(|line| line.width).fold(0.0, f32::max);
        let height = self.lines.len() as f32 * self.line_height;

        let x = bounds.origin.x as f32
            + format
                .horizontal_align()
                .offset(bounds.size.width as f32, width);
        let y = bounds.origin.y as f32
            + format
                .vertical_align()
                .offset(bounds.size.height as f32, height);

        rect(
            x.round() as i32,
            y.round() as i32,
            width.ceil() as i32,
            height.ceil() as i32,
        )
    }

    fn paint(&self, surface: &mut dyn Surface, bounds: &Rect, format: TextFormat) -> Result<()> {
        surface.save();
        if !format.contains(TextFormat::NOCLIP) {
            surface.clip_to_rect(bounds);
        }
        let result = self.paint_lines(surface, bounds, format);
        surface.restore();
        result
    }

    fn paint_lines(
        &self,
        surface: &mut dyn Surface,
        bounds: &Rect,
        format: TextFormat,
    ) -> Result<()> {
        let total_height = self.lines.len() as f32 * self.line_height;
        let top = bounds.origin.y as f32
            + format
                .vertical_align()
                .offset(bounds.size.height as f32, total_height);
        let horizontal_align = format.horizontal_align();

        let mut active_face: Option<FaceId> = None;
        let mut positions: Vec<PositionedGlyph> = Vec::new();

        for (line_index, line) in self.lines.iter().enumerate() {
            let left = bounds.origin.x as f32
                + horizontal_align.offset(bounds.size.width as f32, line.width);
            let baseline = top + line_index as f32 * self.line_height + self.ascent;

            for run_index in self.runs.iter_range(line.begin, line.end) {
                let run = self.runs.get(run_index);
                let glyphs = run.glyphs(&self.blocks);
                if glyphs.is_empty() {
                    continue;
                }

                let face = &self.blocks[run.block].face;
                if active_face != Some(face.id()) {
                    surface.set_font(face, self.font_size);
                    active_face = Some(face.id());
                }

                positions.clear();
                positions.try_reserve(glyphs.len())?;
                let mut pen: Point = point2(left + run.x, baseline);
                for glyph in glyphs {
                    // shaping offsets point up, the surface y axis points down
                    positions.push(PositionedGlyph {
                        glyph: glyph.codepoint,
                        position: point2(pen.x + glyph.x_offset, pen.y - glyph.y_offset),
                    });
                    pen.x += glyph.x_advance;
                    pen.y -= glyph.y_advance;
                }
                surface.draw_glyphs(&positions);
            }
        }

        Ok(())
    }
}
