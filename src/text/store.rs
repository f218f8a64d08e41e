use std::ops::Range;

use crate::error::Result;
use crate::face::FaceHandle;
use crate::geometry::Rect;

use super::run::Glyph;

/// Append-only text bytes plus one result rectangle per byte.
///
/// Both buffers always have the same length.
#[derive(Default)]
pub(crate) struct TextStore {
    bytes: Vec<u8>,
    rects: Vec<Rect>,
}

impl TextStore {
    /// Appends `text` and returns the offset it was stored at.
    ///
    /// Both buffers are reserved before either is written, so an allocation
    /// failure leaves the store untouched.
    pub fn append(&mut self, text: &[u8]) -> Result<usize> {
        self.bytes.try_reserve(text.len())?;
        self.rects.try_reserve(text.len())?;

        let offset = self.bytes.len();
        self.bytes.extend_from_slice(text);
        self.rects.resize(self.bytes.len(), Rect::zero());
        Ok(offset)
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.rects.clear();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Text for reading alongside rects for writing.
    pub fn parts_mut(&mut self) -> (&[u8], &mut [Rect]) {
        (&self.bytes, &mut self.rects)
    }
}

/// One inserted fragment of text bound to one face.
///
/// Blocks live in insertion order in the layout's block vector. The glyph
/// buffer is derived state: it is cleared and refilled on every rebuild.
pub(crate) struct Block {
    pub face: FaceHandle,
    pub text_offset: usize,
    pub text_len: usize,
    pub glyphs: Vec<Glyph>,
    /// Whether the last rebuild produced runs for this block.
    pub shaped: bool,
}

impl Block {
    pub fn new(face: FaceHandle, text_offset: usize, text_len: usize) -> Self {
        Self {
            face,
            text_offset,
            text_len,
            glyphs: Vec::new(),
            shaped: false,
        }
    }

    /// Range of this block's bytes in the [`TextStore`].
    pub fn text_range(&self) -> Range<usize> {
        self.text_offset..self.text_offset + self.text_len
    }
}
