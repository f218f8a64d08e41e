//! Drawing backends implementing [`Surface`](crate::surface::Surface).

pub mod cpu_renderer;

pub use cpu_renderer::{Bitmap, BitmapSurface, GlyphCache, GlyphCacheItem};
