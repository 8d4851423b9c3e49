mod glyph_cache;

use euclid::default::Box2D;
use image::Rgba;

use crate::color::StyleColors;
use crate::emoji;
use crate::error::Result;
use crate::font::FontHandle;
use crate::glyph_id::GlyphId;
use crate::renderer::Canvas;
use crate::text::{
    FitResult, GlyphMetrics, HorizontalAlign, RunStyle, TextBox, VerticalAlign, place_lines,
};

pub use glyph_cache::{GlyphCache, GlyphCacheItem};

/// Error indicator fill and border.
pub const ERROR_FILL: Rgba<u8> = Rgba([255, 200, 200, 180]);
pub const ERROR_BORDER: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const ERROR_BORDER_WIDTH: u32 = 2;
const ERROR_FONT_SIZE: u32 = 12;
const ERROR_MESSAGE_LIMIT: usize = 50;

/// Where and how a fit result is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    pub text_box: TextBox,
    pub horizontal_align: HorizontalAlign,
    pub vertical_align: VerticalAlign,
    pub line_height_ratio: f32,
    pub colors: StyleColors,
}

/// CPU-based renderer that rasterizes glyphs using a cache.
pub struct CpuRenderer {
    cache: GlyphCache,
    warned_color_font: bool,
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self::new(GlyphCache::default())
    }
}

impl CpuRenderer {
    /// Creates a renderer from the provided cache.
    pub fn new(cache: GlyphCache) -> Self {
        Self {
            cache,
            warned_color_font: false,
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Draws `fit` onto `canvas`.
    ///
    /// Widths come from `metrics`, the same instance that produced `fit`, so
    /// alignment and every advance agree with what the wrapper measured. A
    /// result without a font size is drawn as an error indicator.
    pub fn render(
        &mut self,
        canvas: &mut Canvas<'_>,
        fit: &FitResult,
        params: &RenderParams,
        metrics: &mut GlyphMetrics<'_>,
    ) -> Result<()> {
        if fit.font_size.is_none() {
            let message = fit
                .warnings
                .last()
                .map(String::as_str)
                .unwrap_or("Text rendering failed");
            self.draw_error_indicator(canvas, &params.text_box, message, metrics);
            return Ok(());
        }

        let widths = fit
            .lines
            .iter()
            .map(|line| line.width(metrics))
            .collect::<Result<Vec<u32>>>()?;
        let placed = place_lines(
            &fit.lines,
            &widths,
            &params.text_box,
            params.horizontal_align,
            params.vertical_align,
            params.line_height_ratio,
        );

        for placement in placed {
            let line = &fit.lines[placement.index];
            let mut x = placement.origin.x;
            let y = placement.origin.y;

            for fragment in &line.fragments {
                let size = fragment.font_size.unwrap_or(line.font_size);
                let width = metrics.measure(&fragment.style, size, &fragment.text)?;
                if fragment.text.is_empty() {
                    continue;
                }

                let font = metrics.resolve_font(&fragment.style, size)?;
                let color = params.colors.resolve(&fragment.style);
                if !self.warned_color_font && metrics.is_color_font(&fragment.style) {
                    log::debug!(
                        "Color font selected for {:?}; drawing it as plain coverage",
                        font.style
                    );
                    self.warned_color_font = true;
                }

                if metrics.emoji_enabled() && emoji::has_emoji(&fragment.text) {
                    let mut segment_x = x;
                    for segment in emoji::split_by_emoji(&fragment.text) {
                        let segment_width = metrics.measure(&fragment.style, size, segment.text)?;
                        let bitmap = if segment.is_emoji {
                            metrics.emoji_bitmap(segment.text, size)
                        } else {
                            None
                        };
                        match bitmap {
                            Some(bitmap) => {
                                // bottom-aligned to the nominal size, never above the line
                                let emoji_y = y.max(y + size as i32 - bitmap.height() as i32);
                                canvas.draw_image(&bitmap, segment_x, emoji_y);
                            }
                            None => self.draw_text(canvas, &font, segment.text, segment_x, y, color),
                        }
                        segment_x += segment_width as i32;
                    }
                } else {
                    self.draw_text(canvas, &font, &fragment.text, x, y, color);
                }

                if width > 0 && !fragment.is_whitespace() {
                    draw_decorations(canvas, &font, &fragment.style, x, y, width, color);
                }

                x += width as i32;
            }
        }

        Ok(())
    }

    fn draw_text(
        &mut self,
        canvas: &mut Canvas<'_>,
        font: &FontHandle,
        text: &str,
        x: i32,
        y: i32,
        color: Rgba<u8>,
    ) {
        let baseline = y + font.line_metrics().ascent.round() as i32;

        for (ch, pen) in font.face.pen_positions(text, font.px()) {
            if ch.is_whitespace() {
                continue;
            }

            let glyph_id = GlyphId::new(font.style, ch, font.size);
            let item = self.cache.get(&glyph_id, font.face.as_ref());
            if item.glyph.width == 0 || item.glyph.height == 0 {
                continue;
            }

            let glyph_x = x + (pen + item.glyph.xmin as f32).floor() as i32;
            let glyph_y = baseline - (item.glyph.ymin + item.glyph.height as i32);
            canvas.draw_coverage(
                glyph_x,
                glyph_y,
                item.glyph.width,
                item.glyph.height,
                &item.data,
                color,
            );
        }
    }

    /// Translucent red box with a red border over the padded text area, with
    /// the message on top when a face is available.
    pub fn draw_error_indicator(
        &mut self,
        canvas: &mut Canvas<'_>,
        text_box: &TextBox,
        message: &str,
        metrics: &mut GlyphMetrics<'_>,
    ) {
        let area = text_box.content_rect();
        canvas.fill_rect(area, ERROR_FILL);
        canvas.stroke_rect(area, ERROR_BORDER, ERROR_BORDER_WIDTH);

        let message = shorten_message(message);
        let style = RunStyle::default();
        let Ok(font) = metrics.resolve_font(&style, ERROR_FONT_SIZE) else {
            log::debug!("No face for the error message; drawing the indicator only");
            return;
        };
        let width = metrics
            .measure(&style, ERROR_FONT_SIZE, &message)
            .unwrap_or(0) as i32;
        let height = font.text_height() as i32;

        let x = area.min.x + ((area.width() - width) / 2).max(0);
        let y = area.min.y + ((area.height() - height) / 2).max(0);
        self.draw_text(canvas, &font, &message, x, y, ERROR_BORDER);
    }
}

fn shorten_message(message: &str) -> String {
    if message.chars().count() > ERROR_MESSAGE_LIMIT {
        let head: String = message.chars().take(ERROR_MESSAGE_LIMIT - 3).collect();
        format!("{head}...")
    } else {
        message.to_string()
    }
}

/// Underline sits at the bottom of the text height, strikethrough halfway.
fn draw_decorations(
    canvas: &mut Canvas<'_>,
    font: &FontHandle,
    style: &RunStyle,
    x: i32,
    y: i32,
    width: u32,
    color: Rgba<u8>,
) {
    let text_height = font.text_height() as i32;
    let end = x + width as i32;

    if style.underline {
        canvas.hline(x, end, y + text_height, color);
    }
    if style.strikethrough {
        canvas.hline(x, end, y + text_height / 2, color);
    }
}

/// Background then border, both over the padded text area.
pub fn draw_bounding_box(
    canvas: &mut Canvas<'_>,
    text_box: &TextBox,
    border: Rgba<u8>,
    line_width: u32,
    background: Option<Rgba<u8>>,
) {
    let area: Box2D<i32> = text_box.content_rect();
    if let Some(background) = background {
        canvas.fill_rect(area, background);
    }
    if line_width > 0 {
        canvas.stroke_rect(area, border, line_width);
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BlockFonts, emoji_bitmap};
    use crate::text::{FitRequest, FitStrategy, Line, MetricsCache, StyledRun, find_fitting_size};
    use image::RgbaImage;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn params(text_box: TextBox) -> RenderParams {
        RenderParams {
            text_box,
            horizontal_align: HorizontalAlign::Left,
            vertical_align: VerticalAlign::Top,
            line_height_ratio: 1.0,
            colors: StyleColors::default(),
        }
    }

    fn single_line(runs: Vec<StyledRun>, size: u32) -> FitResult {
        FitResult {
            font_size: Some(size),
            lines: vec![Line {
                fragments: runs.into_iter().map(|r| r.fragment(&r.text, size)).collect(),
                font_size: size,
            }],
            total_height: size,
            warnings: Vec::new(),
            strategy: FitStrategy::Normal,
        }
    }

    #[test]
    fn glyphs_land_on_the_baseline() {
        let mut fonts = BlockFonts::default();
        let mut cache = MetricsCache::new();
        let mut metrics = GlyphMetrics::new(&mut fonts, &mut cache);
        let mut image = RgbaImage::from_pixel(40, 40, WHITE);
        let mut renderer = CpuRenderer::default();

        let fit = single_line(vec![StyledRun::plain("ab")], 10);
        let mut canvas = Canvas::new(&mut image);
        renderer
            .render(&mut canvas, &fit, &params(TextBox::new(0, 0, 40, 40, 0)), &mut metrics)
            .unwrap();

        // ascent 8, glyph 7 tall sitting on the baseline: rows 1..8, columns 0..10
        assert_eq!(*image.get_pixel(0, 1), BLACK);
        assert_eq!(*image.get_pixel(9, 7), BLACK);
        assert_eq!(*image.get_pixel(0, 0), WHITE);
        assert_eq!(*image.get_pixel(10, 4), WHITE);
        assert_eq!(*image.get_pixel(0, 8), WHITE);
    }

    #[test]
    fn underline_and_strike_positions() {
        let mut fonts = BlockFonts::default();
        let mut cache = MetricsCache::new();
        let mut metrics = GlyphMetrics::new(&mut fonts, &mut cache);
        let mut image = RgbaImage::from_pixel(40, 40, WHITE);
        let mut renderer = CpuRenderer::default();

        let style = RunStyle {
            underline: true,
            strikethrough: true,
            ..Default::default()
        };
        let fit = single_line(
            vec![StyledRun::new("ab", style), StyledRun::new(" ", style)],
            10,
        );
        let mut canvas = Canvas::new(&mut image);
        renderer
            .render(&mut canvas, &fit, &params(TextBox::new(0, 0, 40, 40, 0)), &mut metrics)
            .unwrap();

        // text height is 10: underline on row 10, strike on row 5
        assert_eq!(*image.get_pixel(3, 10), BLACK);
        assert_eq!(*image.get_pixel(9, 10), BLACK);
        assert_eq!(*image.get_pixel(3, 5), BLACK);
        // the whitespace run after "ab" carries no decoration
        assert_eq!(*image.get_pixel(11, 10), WHITE);
    }

    #[test]
    fn emoji_advance_matches_measurement() {
        let mut fonts = BlockFonts::default();
        let mut cache = MetricsCache::new();
        let mut provider = |_: &str, size: u32| Some(emoji_bitmap(size, 4, 0, 6, 20));
        let mut metrics =
            GlyphMetrics::new(&mut fonts, &mut cache).with_emoji_provider(&mut provider);
        let mut image = RgbaImage::from_pixel(60, 40, WHITE);
        let mut renderer = CpuRenderer::default();

        let fit = single_line(vec![StyledRun::plain("😀a")], 20);
        assert_eq!(fit.lines[0].width(&mut metrics).unwrap(), 6 + 10);

        let mut canvas = Canvas::new(&mut image);
        renderer
            .render(&mut canvas, &fit, &params(TextBox::new(0, 0, 60, 40, 0)), &mut metrics)
            .unwrap();

        // emoji occupies columns 0..6, the glyph starts right after it
        assert_eq!(image.get_pixel(0, 10)[2], 0);
        assert_ne!(*image.get_pixel(0, 10), WHITE);
        assert_eq!(*image.get_pixel(6, 15), BLACK);
        assert_eq!(*image.get_pixel(16, 15), WHITE);
    }

    #[test]
    fn missing_size_draws_the_error_indicator() {
        let mut fonts = BlockFonts::missing();
        let mut cache = MetricsCache::new();
        let mut metrics = GlyphMetrics::new(&mut fonts, &mut cache);
        let mut image = RgbaImage::from_pixel(50, 50, WHITE);
        let mut renderer = CpuRenderer::default();

        let request = FitRequest::new(30, 30, 12);
        let fit = find_fitting_size(&mut metrics, "hello", &request);
        assert!(fit.font_size.is_none());

        let mut canvas = Canvas::new(&mut image);
        renderer
            .render(&mut canvas, &fit, &params(TextBox::new(10, 10, 30, 30, 0)), &mut metrics)
            .unwrap();

        assert_eq!(*image.get_pixel(10, 10), ERROR_BORDER);
        assert_eq!(*image.get_pixel(11, 25), ERROR_BORDER);
        let inside = image.get_pixel(25, 25);
        assert_eq!(inside[0], 255);
        assert!(inside[1] < 255 && inside[1] >= 200);
        assert_eq!(*image.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn long_error_messages_are_shortened() {
        let message = "x".repeat(80);
        let short = shorten_message(&message);
        assert_eq!(short.chars().count(), 50);
        assert!(short.ends_with("..."));
        assert_eq!(shorten_message("brief"), "brief");
    }

    #[test]
    fn bounding_box_paints_the_padded_area() {
        let mut image = RgbaImage::from_pixel(30, 30, WHITE);
        let mut canvas = Canvas::new(&mut image);
        let text_box = TextBox::new(0, 0, 30, 30, 5);
        draw_bounding_box(
            &mut canvas,
            &text_box,
            Rgba([255, 0, 0, 255]),
            1,
            Some(Rgba([0, 0, 255, 255])),
        );
        assert_eq!(*image.get_pixel(5, 5), Rgba([255, 0, 0, 255]));
        assert_eq!(*image.get_pixel(15, 15), Rgba([0, 0, 255, 255]));
        assert_eq!(*image.get_pixel(2, 2), WHITE);
    }

    #[test]
    fn fitted_markup_renders_in_bold_color() {
        let mut fonts = BlockFonts::default();
        let mut cache = MetricsCache::new();
        let mut metrics = GlyphMetrics::new(&mut fonts, &mut cache);
        let mut image = RgbaImage::from_pixel(100, 100, WHITE);
        let mut renderer = CpuRenderer::default();

        let request = FitRequest::new(100, 100, 10);
        let fit = find_fitting_size(&mut metrics, "<b>ab</b>", &request);

        let mut render_params = params(TextBox::new(0, 0, 100, 100, 0));
        render_params.colors.bold = Rgba([200, 0, 0, 255]);
        let mut canvas = Canvas::new(&mut image);
        renderer.render(&mut canvas, &fit, &render_params, &mut metrics).unwrap();

        assert_eq!(*image.get_pixel(1, 4), Rgba([200, 0, 0, 255]));
    }
}
