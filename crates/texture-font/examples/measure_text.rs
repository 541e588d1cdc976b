//! Measure and lay out text with a font file from disk.
//!
//! Run with:
//! ```
//! cargo run --example measure_text -- path/to/font.ttf [pixel-size] [text]
//! ```

use texture_font::{
    Color, FontDescriptor, FontOptions, HeadlessTexture, TextGeometry, TextureFont,
};

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: measure_text <font-file> [pixel-size] [text]");
        std::process::exit(2);
    };
    let pixel_size = args
        .next()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(16.0);
    let text = args
        .next()
        .unwrap_or_else(|| "The quick brown fox\njumps over #f80the lazy dog".to_string());

    let data = std::fs::read(&path).expect("Failed to read font file");
    let family = std::path::Path::new(&path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let descriptor = FontDescriptor::new(family, pixel_size);

    let mut font = TextureFont::load(data, &descriptor, HeadlessTexture::new(), FontOptions::default())
        .expect("Failed to load font");
    println!(
        "line height {:.1}, ascent {:.1}, descender {:.1}, {} glyphs prebaked",
        font.height(),
        font.ascent(),
        font.descender(),
        font.glyph_count()
    );

    let size = font.measure_string(&text);
    println!("extent: {:.1} x {:.1}", size.width, size.height);

    let count = texture_font::code_points(text.as_bytes()).count();
    for index in [0, count / 2, count] {
        let pos = font.measure_character_pos(&text, index);
        let picked = font.pick_character(&text, pos.x, pos.y);
        println!("caret {index:>3} at ({:.1}, {:.1}) picks {picked}", pos.x, pos.y);
    }

    let mut geometry = TextGeometry::new();
    let color = font.create_markup_geometry(&mut geometry, &text, 0.0, 0.0, Color::WHITE);
    println!(
        "{} quads, {} indices, final color {:?}, bounds {:?}",
        geometry.quad_count(),
        geometry.indices().len(),
        color,
        geometry.bounds()
    );

    let atlas = font.atlas();
    let stats = font.atlas_stats();
    println!(
        "atlas {}x{} ({:.1}% used), {} placements, {} growths, {} uploads",
        atlas.width(),
        atlas.height(),
        atlas.usage() * 100.0,
        stats.placements,
        stats.growths,
        stats.uploads
    );
}
