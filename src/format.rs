use std::collections::HashSet;

bitflags::bitflags! {
    /// Flags accepted by [`TextLayout::perform`](crate::text::TextLayout::perform).
    ///
    /// `LEFT` and `TOP` are the empty set. `CALCRECT` and `DRAWTEXT` are
    /// independent and may both be set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TextFormat: u32 {
        const LEFT = 0;
        const TOP = 0;
        const RIGHT = 1 << 0;
        const BOTTOM = 1 << 1;
        const CENTER = 1 << 2;
        const VCENTER = 1 << 3;
        const WORDBREAK = 1 << 4;
        const SINGLELINE = 1 << 5;
        const EXPANDTABS = 1 << 6;
        const NOCLIP = 1 << 7;
        const CALCRECT = 1 << 8;
        const DRAWTEXT = 1 << 9;
    }
}

impl Default for TextFormat {
    fn default() -> Self {
        Self::empty()
    }
}

impl TextFormat {
    /// Bits that change run/line structure. A change in any of these forces
    /// the derived state to be rebuilt.
    pub const LAYOUT_BITS: Self = Self::EXPANDTABS
        .union(Self::WORDBREAK)
        .union(Self::SINGLELINE);

    pub fn layout_bits(self) -> Self {
        self & Self::LAYOUT_BITS
    }

    /// `CENTER` wins over `RIGHT` when both are set.
    pub fn horizontal_align(self) -> HorizontalAlign {
        if self.contains(Self::CENTER) {
            HorizontalAlign::Center
        } else if self.contains(Self::RIGHT) {
            HorizontalAlign::Right
        } else {
            HorizontalAlign::Left
        }
    }

    /// `VCENTER` wins over `BOTTOM` when both are set.
    pub fn vertical_align(self) -> VerticalAlign {
        if self.contains(Self::VCENTER) {
            VerticalAlign::Middle
        } else if self.contains(Self::BOTTOM) {
            VerticalAlign::Bottom
        } else {
            VerticalAlign::Top
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Horizontal justification applied to each line independently.
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

impl HorizontalAlign {
    /// Offset that places `content` inside `available` space.
    pub fn offset(self, available: f32, content: f32) -> f32 {
        match self {
            HorizontalAlign::Left => 0.0,
            HorizontalAlign::Center => (available - content) / 2.0,
            HorizontalAlign::Right => available - content,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Vertical alignment strategy for the entire block of text.
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl VerticalAlign {
    /// Offset that places `content` inside `available` space.
    pub fn offset(self, available: f32, content: f32) -> f32 {
        match self {
            VerticalAlign::Top => 0.0,
            VerticalAlign::Middle => (available - content) / 2.0,
            VerticalAlign::Bottom => available - content,
        }
    }
}

/// Configuration knobs that are not part of the per-call format flags.
///
/// Changing the configuration of a [`TextLayout`](crate::text::TextLayout)
/// marks it dirty, so the next `perform` rebuilds runs and lines.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLayoutConfig {
    /// Multiplier applied to the shared line height.
    pub line_height_scale: f32,
    /// Distance between tab stops in ems. Only used with [`TextFormat::EXPANDTABS`].
    pub tab_width: f32,
    /// Bytes after which a word break may occur.
    pub word_separators: HashSet<u8, fxhash::FxBuildHasher>,
}

impl Default for TextLayoutConfig {
    fn default() -> Self {
        let mut word_separators = HashSet::with_hasher(fxhash::FxBuildHasher::default());
        word_separators.insert(b' ');
        word_separators.insert(b'\t');

        Self {
            line_height_scale: 1.0,
            tab_width: 4.0,
            word_separators,
        }
    }
}
