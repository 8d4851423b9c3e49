//! Synthetic faces with exact metrics for unit tests.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::font::{Face, FontProvider, FontStyle, GlyphBox, LineMetrics};

/// Every glyph is a solid block: `px / 2` wide and `0.7 * px` tall, sitting
/// on the baseline. Spaces advance `0.3 * px` and have no ink.
pub(crate) struct BlockFace;

impl Face for BlockFace {
    fn glyph_box(&self, ch: char, px: f32) -> GlyphBox {
        if ch.is_whitespace() {
            return GlyphBox {
                advance: px * 3.0 / 10.0,
                ..Default::default()
            };
        }
        let advance = px / 2.0;
        GlyphBox {
            xmin: 0,
            ymin: 0,
            width: advance as usize,
            height: (px * 7.0 / 10.0) as usize,
            advance,
        }
    }

    fn rasterize(&self, ch: char, px: f32) -> (GlyphBox, Vec<u8>) {
        let glyph = self.glyph_box(ch, px);
        (glyph, vec![255; glyph.width * glyph.height])
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: px * 8.0 / 10.0,
            descent: -px * 2.0 / 10.0,
            line_gap: 0.0,
        }
    }
}

pub(crate) struct BlockFonts {
    face: Option<Arc<dyn Face>>,
    color: bool,
}

impl Default for BlockFonts {
    fn default() -> Self {
        Self {
            face: Some(Arc::new(BlockFace)),
            color: false,
        }
    }
}

impl BlockFonts {
    pub(crate) fn missing() -> Self {
        Self {
            face: None,
            color: false,
        }
    }

    pub(crate) fn color() -> Self {
        Self {
            color: true,
            ..Self::default()
        }
    }
}

impl FontProvider for BlockFonts {
    fn face(&mut self, _style: FontStyle) -> Option<Arc<dyn Face>> {
        self.face.clone()
    }

    fn is_color_font(&self, _style: FontStyle) -> bool {
        self.color
    }
}

/// `size` x `size` transparent bitmap with an opaque `w` x `h` block at `(x, y)`.
pub(crate) fn emoji_bitmap(size: u32, x: u32, y: u32, w: u32, h: u32) -> RgbaImage {
    let mut bitmap = RgbaImage::new(size, size);
    for py in y..y + h {
        for px in x..x + w {
            bitmap.put_pixel(px, py, Rgba([250, 200, 0, 255]));
        }
    }
    bitmap
}
