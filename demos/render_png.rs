use std::num::NonZeroUsize;

use image::{ImageBuffer, Luma};
use kumihan::{
    FaceHandle, TextFormat, TextLayout,
    font_storage::FontStorage,
    fontdb::{self, Family, Query},
    geometry::rect,
    renderer::{BitmapSurface, GlyphCache},
};

const WIDTH: usize = 480;
const HEIGHT: usize = 320;

fn pick_system_face(font_storage: &mut FontStorage) -> FaceHandle {
    font_storage.load_system_fonts();
    assert!(
        !font_storage.is_empty(),
        "system fonts are required for the text rendering demo"
    );

    const FAMILIES: &[Family<'_>] = &[Family::SansSerif];
    let query = Query {
        families: FAMILIES,
        weight: fontdb::Weight::NORMAL,
        stretch: fontdb::Stretch::Normal,
        style: fontdb::Style::Normal,
    };

    if let Some((_, face)) = font_storage.query(&query) {
        return face;
    }

    let ids: Vec<fontdb::ID> = font_storage.faces().map(|face| face.id).collect();
    ids.into_iter()
        .find_map(|id| font_storage.face(id))
        .expect("no usable fonts registered in FontStorage")
}

#[allow(clippy::unwrap_used)]
fn main() {
    let mut font_storage = FontStorage::new();
    let face = pick_system_face(&mut font_storage);

    let mut layout = TextLayout::new();
    layout
        .add_text(
            &face,
            "BitmapSurface text rendering demo.\n\
             Lines wrap at word separators and\ttabs\tline\tup.\n\
             The same layout is measured and drawn in one call.",
            None,
        )
        .unwrap();

    let cache_config = [
        (
            NonZeroUsize::new(1024).unwrap(), // Block size (e.g. 32x32)
            NonZeroUsize::new(1024).unwrap(), // Capacity
        ),
        (
            NonZeroUsize::new(4096).unwrap(), // Block size (e.g. 64x64)
            NonZeroUsize::new(256).unwrap(),  // Capacity
        ),
    ];
    let mut surface = BitmapSurface::new(WIDTH, HEIGHT, GlyphCache::new(&cache_config));

    let mut bounds = rect(16, 16, WIDTH as i32 - 32, HEIGHT as i32 - 32);
    let format = TextFormat::WORDBREAK
        | TextFormat::EXPANDTABS
        | TextFormat::VCENTER
        | TextFormat::CALCRECT
        | TextFormat::DRAWTEXT;

    let timer = std::time::Instant::now();
    layout
        .perform(28.0, Some(&mut surface), Some(&mut bounds), format)
        .unwrap();
    let elapsed = timer.elapsed();

    println!(
        "Layout: {} bytes, {} lines, text box {:?} (elapsed: {:.2?})",
        layout.len(),
        layout.line_count(),
        bounds,
        elapsed
    );
    for line in layout.lines() {
        println!(
            "  top={:>6.1} width={:>6.1} {:?}",
            line.top,
            line.width,
            String::from_utf8_lossy(&layout.text_buffer()[line.text_range])
        );
    }

    let bitmap = surface.into_bitmap();

    // Ensure debug directory exists
    std::fs::create_dir_all("debug").expect("failed to create debug directory");

    let img_buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_raw(bitmap.width as u32, bitmap.height as u32, bitmap.pixels)
            .expect("bitmap dimensions must match pixel buffer length");

    img_buffer
        .save("debug/render_png.png")
        .expect("failed to save debug image");

    println!("Saved debug image to debug/render_png.png");
}
