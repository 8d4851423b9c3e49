use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::color::{StyleColors, parse_hex_color, with_opacity};
use crate::emoji::{self, EmojiBitmapProvider};
use crate::font::{FontPaths, FontProvider, StyledFonts};
use crate::renderer::{Canvas, CpuRenderer, RenderParams, draw_bounding_box};
use crate::text::{
    Dialect, FitRequest, FitResult, FitStrategy, GlyphMetrics, HorizontalAlign, MetricsCache,
    TextBox, VerticalAlign, extract_hashtags, find_fitting_size,
};

/// Font size bounds accepted from callers.
pub const MIN_FONT_SIZE: u32 = 1;
pub const MAX_FONT_SIZE: u32 = 256;
/// Line height ratios below this are raised to it.
pub const MIN_LINE_HEIGHT_RATIO: f32 = 1.0;
/// Bounding box border width bounds.
pub const MIN_BORDER_WIDTH: u32 = 1;
pub const MAX_BORDER_WIDTH: u32 = 10;

/// Outline and optional fill drawn behind the text.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBoxStyle {
    pub color: String,
    pub line_width: u32,
    pub opacity: f32,
    pub background: Option<String>,
    pub background_opacity: f32,
}

impl Default for BoundingBoxStyle {
    fn default() -> Self {
        Self {
            color: "#FF0000".to_string(),
            line_width: 3,
            opacity: 1.0,
            background: Some("#FFFFFF".to_string()),
            background_opacity: 1.0,
        }
    }
}

/// Everything one overlay call needs besides the images and the fonts.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverlayConfig {
    pub text: String,
    pub dialect: Dialect,
    pub text_box: TextBox,
    pub max_font_size: u32,
    pub min_font_size: u32,
    pub horizontal_align: HorizontalAlign,
    pub vertical_align: VerticalAlign,
    pub line_height_ratio: f32,
    pub font_color: String,
    pub italic_font_color: String,
    pub bold_font_color: String,
    /// `None` uses the default hashtag blue.
    pub hashtag_color: Option<String>,
    pub bounding_box: Option<BoundingBoxStyle>,
    pub hashtags: bool,
    pub emoji: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            dialect: Dialect::Tags,
            text_box: TextBox::default(),
            max_font_size: 30,
            min_font_size: crate::text::fit::DEFAULT_MIN_FONT_SIZE,
            horizontal_align: HorizontalAlign::Center,
            vertical_align: VerticalAlign::Middle,
            line_height_ratio: 1.2,
            font_color: "#000000".to_string(),
            italic_font_color: "#000000".to_string(),
            bold_font_color: "#000000".to_string(),
            hashtag_color: Some("#0066CC".to_string()),
            bounding_box: None,
            hashtags: true,
            emoji: true,
        }
    }
}

/// What happened during an overlay call. Produced on every call, whatever
/// went wrong.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayReport {
    pub font_size: Option<u32>,
    pub strategy: FitStrategy,
    pub hashtags: Vec<String>,
    pub emojis: Vec<String>,
    pub warnings: Vec<String>,
}

impl OverlayReport {
    pub fn hashtags_summary(&self) -> String {
        if self.hashtags.is_empty() {
            "None".to_string()
        } else {
            self.hashtags.join(", ")
        }
    }

    pub fn emojis_summary(&self) -> String {
        if self.emojis.is_empty() {
            "None".to_string()
        } else {
            self.emojis.join(", ")
        }
    }

    /// Detected features and warnings joined with ` | `.
    pub fn processing_info(&self) -> String {
        let mut parts = Vec::new();
        if !self.hashtags.is_empty() {
            parts.push(format!(
                "Found {} hashtags: {}",
                self.hashtags.len(),
                self.hashtags.join(", ")
            ));
        }
        if !self.emojis.is_empty() {
            parts.push(format!(
                "Found {} emojis: {}",
                self.emojis.len(),
                self.emojis.join(", ")
            ));
        }
        parts.extend(self.warnings.iter().cloned());

        if parts.is_empty() {
            "No issues detected".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

/// High-level entry point: fits styled text into a box and draws it onto
/// images.
///
/// Fonts, the emoji source, the measurement cache and the renderer each sit
/// behind a `Mutex`, so one system can be shared between threads. An overlay
/// call holds all of them for its duration.
///
/// The fields are public to allow direct access to the underlying pieces
/// when necessary.
pub struct OverlaySystem {
    pub fonts: Mutex<Box<dyn FontProvider + Send>>,
    pub emoji_provider: Mutex<Option<Box<dyn EmojiBitmapProvider + Send>>>,
    pub metrics_cache: Mutex<MetricsCache>,
    pub renderer: Mutex<CpuRenderer>,
}

impl OverlaySystem {
    pub fn new(fonts: impl FontProvider + Send + 'static) -> Self {
        Self {
            fonts: Mutex::new(Box::new(fonts)),
            emoji_provider: Mutex::new(None),
            metrics_cache: Mutex::new(MetricsCache::new()),
            renderer: Mutex::new(CpuRenderer::default()),
        }
    }

    /// System fonts, overridden per style by `paths`.
    pub fn from_font_paths(paths: &FontPaths) -> Self {
        Self::new(StyledFonts::from_paths(paths))
    }

    /// Replaces the font provider and drops everything measured with the
    /// old one.
    pub fn set_fonts(&self, fonts: impl FontProvider + Send + 'static) {
        *self.fonts.lock() = Box::new(fonts);
        self.clear_caches();
    }

    pub fn set_emoji_provider(&self, provider: impl EmojiBitmapProvider + Send + 'static) {
        *self.emoji_provider.lock() = Some(Box::new(provider));
        self.metrics_cache.lock().clear();
    }

    /// Drops memoized widths, emoji bitmaps and rasterized glyphs.
    pub fn clear_caches(&self) {
        self.metrics_cache.lock().clear();
        self.renderer.lock().clear_cache();
    }
}

/// fitting and drawing
impl OverlaySystem {
    /// Runs the fit search alone.
    pub fn fit(&self, markup: &str, request: &FitRequest, emoji: bool) -> FitResult {
        let mut fonts = self.fonts.lock();
        let mut emoji_provider = self.emoji_provider.lock();
        let mut cache = self.metrics_cache.lock();

        let mut metrics = GlyphMetrics::new(&mut **fonts, &mut cache).with_emoji(emoji);
        if let Some(provider) = emoji_provider.as_mut() {
            metrics = metrics.with_emoji_provider(&mut **provider);
        }
        find_fitting_size(&mut metrics, markup, request)
    }

    /// Fits `config.text` once and draws it onto every image.
    ///
    /// Never fails: problems are logged, reported as warnings and, when no
    /// layout could be produced at all, drawn as an error indicator.
    pub fn overlay(&self, images: &mut [RgbaImage], config: &OverlayConfig) -> OverlayReport {
        let mut warnings = Vec::new();

        let hashtags = if config.hashtags {
            extract_hashtags(&config.text)
        } else {
            Vec::new()
        };
        let emojis = if config.emoji {
            emoji::extract_emojis(&config.text)
        } else {
            Vec::new()
        };

        let (text_box, box_warnings) = config.text_box.clamped();
        warnings.extend(box_warnings);

        let max_size = config.max_font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        if max_size != config.max_font_size {
            warnings.push(format!(
                "Font size {} out of range, using {max_size}",
                config.max_font_size
            ));
        }
        let min_size = config.min_font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        if min_size != config.min_font_size {
            warnings.push(format!(
                "Minimum font size {} out of range, using {min_size}",
                config.min_font_size
            ));
        }

        let line_height_ratio = if config.line_height_ratio.is_finite()
            && config.line_height_ratio >= MIN_LINE_HEIGHT_RATIO
        {
            config.line_height_ratio
        } else {
            warnings.push(format!(
                "Line height ratio {} too small, using {MIN_LINE_HEIGHT_RATIO}",
                config.line_height_ratio
            ));
            MIN_LINE_HEIGHT_RATIO
        };

        let colors = resolve_colors(config, &mut warnings);

        let request = FitRequest {
            width_budget: text_box.effective_width(),
            height_budget: text_box.effective_height(),
            line_height_ratio,
            max_size,
            min_size,
            dialect: config.dialect,
            detect_hashtags: config.hashtags,
        };
        let params = RenderParams {
            text_box,
            horizontal_align: config.horizontal_align,
            vertical_align: config.vertical_align,
            line_height_ratio,
            colors,
        };
        let bounding_box = config
            .bounding_box
            .as_ref()
            .map(|style| resolve_bounding_box(style, &mut warnings));

        let mut fonts = self.fonts.lock();
        let mut emoji_provider = self.emoji_provider.lock();
        let mut cache = self.metrics_cache.lock();
        let mut renderer = self.renderer.lock();

        let mut metrics = GlyphMetrics::new(&mut **fonts, &mut cache).with_emoji(config.emoji);
        if let Some(provider) = emoji_provider.as_mut() {
            metrics = metrics.with_emoji_provider(&mut **provider);
        }

        let fit = find_fitting_size(&mut metrics, &config.text, &request);
        warnings.extend(fit.warnings.iter().cloned());
        log::debug!(
            "Fitted {:?} at {:?} into {} line(s)",
            fit.strategy,
            fit.font_size,
            fit.lines.len()
        );

        for (index, image) in images.iter_mut().enumerate() {
            let mut canvas = Canvas::new(image);
            if let Some((border, line_width, background)) = bounding_box {
                draw_bounding_box(&mut canvas, &text_box, border, line_width, background);
            }
            if let Err(e) = renderer.render(&mut canvas, &fit, &params, &mut metrics) {
                let message = format!("Rendering failed on image {index}: {e}");
                log::warn!("{message}");
                warnings.push(message);
            }
        }

        OverlayReport {
            font_size: fit.font_size,
            strategy: fit.strategy,
            hashtags,
            emojis,
            warnings,
        }
    }
}

fn color_or(hex: &str, fallback: Rgba<u8>, warnings: &mut Vec<String>) -> Rgba<u8> {
    match parse_hex_color(hex) {
        Ok(color) => color,
        Err(e) => {
            log::warn!("{e}");
            warnings.push(e.to_string());
            fallback
        }
    }
}

fn resolve_colors(config: &OverlayConfig, warnings: &mut Vec<String>) -> StyleColors {
    let black = Rgba([0, 0, 0, 255]);
    StyleColors {
        regular: color_or(&config.font_color, black, warnings),
        italic: color_or(&config.italic_font_color, black, warnings),
        bold: color_or(&config.bold_font_color, black, warnings),
        hashtag: config
            .hashtag_color
            .as_deref()
            .map(|hex| color_or(hex, crate::color::DEFAULT_HASHTAG_COLOR, warnings)),
    }
}

fn resolve_bounding_box(
    style: &BoundingBoxStyle,
    warnings: &mut Vec<String>,
) -> (Rgba<u8>, u32, Option<Rgba<u8>>) {
    let border = with_opacity(
        color_or(&style.color, Rgba([255, 0, 0, 255]), warnings),
        style.opacity,
    );
    let background = style.background.as_deref().map(|hex| {
        with_opacity(
            color_or(hex, Rgba([255, 255, 255, 255]), warnings),
            style.background_opacity,
        )
    });

    let line_width = style.line_width.clamp(MIN_BORDER_WIDTH, MAX_BORDER_WIDTH);
    if line_width != style.line_width {
        warnings.push(format!(
            "Bounding box line width {} out of range, using {line_width}",
            style.line_width
        ));
    }
    (border, line_width, background)
}
