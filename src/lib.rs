//! # Kumihan
//!
//! A text layout engine: shaping, line breaking and glyph placement for runs
//! of styled text.
//!
//! ## Overview
//!
//! Text is appended to a [`TextLayout`] in blocks, each bound to a shared
//! font [`Face`]. A single [`TextLayout::perform`] call shapes the blocks,
//! breaks them into lines for a target rectangle and then measures the result
//! ([`TextFormat::CALCRECT`]), paints it onto a [`Surface`]
//! ([`TextFormat::DRAWTEXT`]), or both. Every byte of text gets a rectangle,
//! readable through [`TextLayout::rect_buffer`], for hit testing and caret
//! placement.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kumihan::{FontStorage, TextFormat, TextLayout, fontdb};
//! use kumihan::geometry::rect;
//! use kumihan::renderer::{BitmapSurface, GlyphCache};
//!
//! // 1. Load fonts and pick a face
//! let mut fonts = FontStorage::new();
//! fonts.load_system_fonts();
//! let query = fontdb::Query {
//!     families: &[fontdb::Family::SansSerif],
//!     weight: fontdb::Weight::NORMAL,
//!     stretch: fontdb::Stretch::Normal,
//!     style: fontdb::Style::Normal,
//! };
//! let (_, face) = fonts.query(&query).unwrap();
//!
//! // 2. Add text
//! let mut layout = TextLayout::new();
//! layout.add_text(&face, "Hello, layout!", None).unwrap();
//!
//! // 3. Measure and draw in one pass
//! let mut bounds = rect(0, 0, 320, 120);
//! let mut surface = BitmapSurface::new(320, 120, GlyphCache::default());
//! layout
//!     .perform(
//!         24.0,
//!         Some(&mut surface),
//!         Some(&mut bounds),
//!         TextFormat::WORDBREAK | TextFormat::CALCRECT | TextFormat::DRAWTEXT,
//!     )
//!     .unwrap();
//! ```
//!
//! ## Features
//!
//! *   **Pluggable faces**: anything implementing [`Face`] can shape; a `fontdue` backend is built in.
//! *   **Line breaking**: newline paragraphs, word or character wrapping, optional tab stops.
//! *   **Incremental**: runs and lines are only rebuilt when text or layout-affecting inputs change.
//! *   **CPU drawing**: [`renderer::BitmapSurface`] rasterizes into an 8-bit coverage bitmap.

pub mod error;
pub mod face;
pub mod font_storage;
pub mod format;
pub mod geometry;
pub mod glyph_id;
pub mod renderer;
pub mod surface;
pub mod text;

// common re-exports
pub use error::{LayoutError, Result};
pub use face::{Face, FaceHandle, FaceId, FontdueFace};
pub use font_storage::FontStorage;
pub use format::{HorizontalAlign, TextFormat, TextLayoutConfig, VerticalAlign};
pub use glyph_id::GlyphId;
pub use surface::{PositionedGlyph, Surface};
pub use text::{LineInfo, TextLayout};

// re-export dependencies
pub use euclid;
pub use fontdb;
pub use fontdue;
