use fude::{
    BoundingBoxStyle, FontPaths, OverlayConfig, OverlaySystem,
    emoji::PngDirEmoji,
    image::{Rgba, RgbaImage},
    text::{Dialect, HorizontalAlign, TextBox, VerticalAlign},
};

/// Usage: `cargo run --example overlay [font.ttf] [emoji_png_dir]`
///
/// Without arguments the system sans-serif faces are used and emoji are
/// drawn with the text face.
#[allow(clippy::unwrap_used)]
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let paths = FontPaths {
        regular: args.next().map(Into::into),
        ..Default::default()
    };

    let system = OverlaySystem::from_font_paths(&paths);
    if let Some(dir) = args.next() {
        system.set_emoji_provider(PngDirEmoji::new(dir));
    }

    let config = OverlayConfig {
        text: "# Release notes\n\
               - **Faster** font fitting\n\
               - *Italic* and __underlined__ runs\n\
               - Ships with `emoji` support 🚀 #rustlang"
            .to_string(),
        dialect: Dialect::MarkdownExtended,
        text_box: TextBox::new(40, 40, 560, 320, 24),
        max_font_size: 48,
        horizontal_align: HorizontalAlign::Left,
        vertical_align: VerticalAlign::Middle,
        bold_font_color: "#1F2937".to_string(),
        italic_font_color: "#6B21A8".to_string(),
        bounding_box: Some(BoundingBoxStyle {
            color: "#2563EB".to_string(),
            line_width: 2,
            background: Some("#F8FAFC".to_string()),
            background_opacity: 0.9,
            ..Default::default()
        }),
        ..Default::default()
    };

    let mut images = vec![
        RgbaImage::from_pixel(640, 400, Rgba([230, 230, 230, 255])),
        RgbaImage::from_pixel(640, 400, Rgba([40, 44, 52, 255])),
    ];

    let timer = std::time::Instant::now();
    let report = system.overlay(&mut images, &config);
    let elapsed = timer.elapsed();

    println!(
        "font_size={:?} strategy={:?} (elapsed: {:.2?})",
        report.font_size, report.strategy, elapsed
    );
    println!("hashtags: {}", report.hashtags_summary());
    println!("emojis: {}", report.emojis_summary());
    println!("info: {}", report.processing_info());

    // Ensure debug directory exists
    std::fs::create_dir_all("debug").expect("failed to create debug directory");

    for (index, image) in images.iter().enumerate() {
        let path = format!("debug/overlay_{index}.png");
        image.save(&path).expect("failed to save debug image");
        println!("Saved debug image to {path}");
    }
}
