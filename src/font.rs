//! Styled font resolution.
//!
//! The layout and rendering code only ever talks to a [`Face`]: something that
//! can report metrics for a character and rasterize it into an 8-bit coverage
//! mask. `fontdue::Font` is the production implementation; tests plug in
//! synthetic faces with exact, integer metrics.

use std::{path::PathBuf, sync::Arc};

use crate::error::{Error, Result};
use crate::font_storage::FontStorage;
use crate::text::RunStyle;

/// Placement and advance of a single glyph, in pixels.
///
/// `ymin` is the offset of the bitmap's bottom edge from the baseline,
/// positive upwards, the way `fontdue` reports it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphBox {
    pub xmin: i32,
    pub ymin: i32,
    pub width: usize,
    pub height: usize,
    pub advance: f32,
}

/// Vertical metrics of a face at a given pixel size. `descent` is negative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

pub trait Face: Send + Sync {
    fn glyph_box(&self, ch: char, px: f32) -> GlyphBox;

    /// Coverage mask of `width * height` bytes, row-major, top row first.
    fn rasterize(&self, ch: char, px: f32) -> (GlyphBox, Vec<u8>);

    fn line_metrics(&self, px: f32) -> LineMetrics;

    fn kern(&self, _left: char, _right: char, _px: f32) -> f32 {
        0.0
    }

    /// Pen position of every character of `text`, kerning applied.
    fn pen_positions(&self, text: &str, px: f32) -> Vec<(char, f32)> {
        let mut pen = 0.0;
        let mut prev = None;
        let mut positions = Vec::with_capacity(text.len());

        for ch in text.chars() {
            if let Some(prev) = prev {
                pen += self.kern(prev, ch, px);
            }
            positions.push((ch, pen));
            pen += self.glyph_box(ch, px).advance;
            prev = Some(ch);
        }

        positions
    }

    /// Horizontal extent of `text`: the larger of the final pen position and
    /// the right edge of the last inked glyph.
    fn text_width(&self, text: &str, px: f32) -> f32 {
        let mut right: f32 = 0.0;
        let mut pen_end: f32 = 0.0;

        for (ch, pen) in self.pen_positions(text, px) {
            let glyph = self.glyph_box(ch, px);
            if glyph.width > 0 {
                right = right.max(pen + glyph.xmin as f32 + glyph.width as f32);
            }
            pen_end = pen + glyph.advance;
        }

        right.max(pen_end).max(0.0)
    }
}

impl Face for fontdue::Font {
    fn glyph_box(&self, ch: char, px: f32) -> GlyphBox {
        let metrics = self.metrics(ch, px);
        GlyphBox {
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            width: metrics.width,
            height: metrics.height,
            advance: metrics.advance_width,
        }
    }

    fn rasterize(&self, ch: char, px: f32) -> (GlyphBox, Vec<u8>) {
        let (metrics, coverage) = fontdue::Font::rasterize(self, ch, px);
        let glyph = GlyphBox {
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            width: metrics.width,
            height: metrics.height,
            advance: metrics.advance_width,
        };
        (glyph, coverage)
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        match self.horizontal_line_metrics(px) {
            Some(metrics) => LineMetrics {
                ascent: metrics.ascent,
                descent: metrics.descent,
                line_gap: metrics.line_gap,
            },
            // vertical-only fonts
            None => LineMetrics {
                ascent: px * 0.8,
                descent: -px * 0.2,
                line_gap: 0.0,
            },
        }
    }

    fn kern(&self, left: char, right: char, px: f32) -> f32 {
        self.horizontal_kern(left, right, px).unwrap_or(0.0)
    }
}

/// The three face slots a caller can configure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontStyle {
    #[default]
    Regular,
    Italic,
    Bold,
}

impl FontStyle {
    pub const ALL: [FontStyle; 3] = [FontStyle::Regular, FontStyle::Italic, FontStyle::Bold];

    /// Bold > italic > regular. There is no bold-italic slot.
    pub fn for_run(style: &RunStyle) -> Self {
        if style.bold {
            FontStyle::Bold
        } else if style.italic {
            FontStyle::Italic
        } else {
            FontStyle::Regular
        }
    }

    fn slot(self) -> usize {
        match self {
            FontStyle::Regular => 0,
            FontStyle::Italic => 1,
            FontStyle::Bold => 2,
        }
    }
}

/// A face bound to a style and an integer pixel size.
#[derive(Clone)]
pub struct FontHandle {
    pub style: FontStyle,
    pub size: u32,
    pub face: Arc<dyn Face>,
}

impl std::fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontHandle")
            .field("style", &self.style)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl FontHandle {
    pub fn px(&self) -> f32 {
        self.size as f32
    }

    /// Width of `text` rounded up to whole pixels.
    pub fn width(&self, text: &str) -> u32 {
        self.face.text_width(text, self.px()).ceil() as u32
    }

    pub fn line_metrics(&self) -> LineMetrics {
        self.face.line_metrics(self.px())
    }

    /// Ascent to descent, rounded up. Decorations are positioned from this.
    pub fn text_height(&self) -> u32 {
        let metrics = self.line_metrics();
        (metrics.ascent - metrics.descent).ceil().max(0.0) as u32
    }
}

/// Source of faces for the style slots.
pub trait FontProvider {
    fn face(&mut self, style: FontStyle) -> Option<Arc<dyn Face>>;

    /// Color (bitmap) fonts are rendered as plain coverage; callers may want
    /// to know when that happens.
    fn is_color_font(&self, _style: FontStyle) -> bool {
        false
    }

    fn font(&mut self, style: FontStyle, size: u32) -> Result<FontHandle> {
        let face = self.face(style).ok_or(Error::FontUnavailable(style))?;
        Ok(FontHandle { style, size, face })
    }
}

/// Optional font file per style slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontPaths {
    pub regular: Option<PathBuf>,
    pub italic: Option<PathBuf>,
    pub bold: Option<PathBuf>,
}

impl FontPaths {
    pub fn get(&self, style: FontStyle) -> Option<&PathBuf> {
        match style {
            FontStyle::Regular => self.regular.as_ref(),
            FontStyle::Italic => self.italic.as_ref(),
            FontStyle::Bold => self.bold.as_ref(),
        }
    }
}

/// [`FontProvider`] over a [`FontStorage`].
///
/// A slot without an explicitly loaded face resolves to a system sans-serif
/// face of matching weight and slant, then to any face at all.
pub struct StyledFonts {
    storage: FontStorage,
    explicit: [Option<fontdb::ID>; 3],
    resolved: [Option<(fontdb::ID, Arc<fontdue::Font>)>; 3],
}

impl StyledFonts {
    pub fn new(storage: FontStorage) -> Self {
        Self {
            storage,
            explicit: [None; 3],
            resolved: [None, None, None],
        }
    }

    /// System fonts plus whatever `paths` names. A path that cannot be used
    /// is logged and the slot falls back to a system face.
    pub fn from_paths(paths: &FontPaths) -> Self {
        let mut fonts = Self::new(FontStorage::with_system_fonts());
        for style in FontStyle::ALL {
            if let Some(path) = paths.get(style) {
                if let Err(e) = fonts.load_file(style, path.clone()) {
                    log::warn!("{e}; using a default face for {style:?}");
                }
            }
        }
        fonts
    }

    pub fn storage(&self) -> &FontStorage {
        &self.storage
    }

    pub fn load_file(&mut self, style: FontStyle, path: PathBuf) -> Result<()> {
        let origin = path.display().to_string();
        let ids = self.storage.load_font_file(path)?;
        self.assign(style, &ids, &origin)
    }

    pub fn load_binary(&mut self, style: FontStyle, data: impl Into<Vec<u8>>) -> Result<()> {
        let ids = self.storage.load_font_binary(data);
        self.assign(style, &ids, "binary font data")
    }

    fn assign(&mut self, style: FontStyle, ids: &[fontdb::ID], origin: &str) -> Result<()> {
        let id = *ids
            .first()
            .ok_or_else(|| Error::FontParse(format!("no faces found in {origin}")))?;
        let font = self
            .storage
            .font(id)
            .ok_or_else(|| Error::FontParse(format!("{origin} is not a usable scalable font")))?;

        self.explicit[style.slot()] = Some(id);
        self.resolved[style.slot()] = Some((id, font));
        Ok(())
    }

    fn resolve(&mut self, style: FontStyle) -> Option<(fontdb::ID, Arc<fontdue::Font>)> {
        if let Some(id) = self.explicit[style.slot()] {
            if let Some(font) = self.storage.font(id) {
                return Some((id, font));
            }
        }

        self.storage
            .query_style(style)
            .or_else(|| self.storage.any_face())
    }
}

impl FontProvider for StyledFonts {
    fn face(&mut self, style: FontStyle) -> Option<Arc<dyn Face>> {
        if self.resolved[style.slot()].is_none() {
            self.resolved[style.slot()] = self.resolve(style);
            if self.resolved[style.slot()].is_none() {
                log::warn!("No face available for the {style:?} style");
            }
        }

        self.resolved[style.slot()]
            .as_ref()
            .map(|(_, font)| Arc::clone(font) as Arc<dyn Face>)
    }

    fn is_color_font(&self, style: FontStyle) -> bool {
        self.resolved[style.slot()]
            .as_ref()
            .is_some_and(|(id, _)| self.storage.is_color_face(*id))
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BlockFace, BlockFonts};

    #[test]
    fn run_style_maps_to_slot() {
        let bold_italic = RunStyle {
            bold: true,
            italic: true,
            ..Default::default()
        };
        assert_eq!(FontStyle::for_run(&bold_italic), FontStyle::Bold);

        let italic = RunStyle {
            italic: true,
            ..Default::default()
        };
        assert_eq!(FontStyle::for_run(&italic), FontStyle::Italic);
        assert_eq!(FontStyle::for_run(&RunStyle::default()), FontStyle::Regular);
    }

    #[test]
    fn text_width_sums_advances() {
        let face = BlockFace;
        assert_eq!(face.text_width("abc", 10.0), 15.0);
        assert_eq!(face.text_width(" ", 10.0), 3.0);
        assert_eq!(face.text_width("", 10.0), 0.0);
    }

    #[test]
    fn missing_face_is_an_error() {
        let mut fonts = BlockFonts::missing();
        let err = fonts.font(FontStyle::Italic, 12).unwrap_err();
        assert!(matches!(err, Error::FontUnavailable(FontStyle::Italic)));
    }

    #[test]
    fn handle_height_spans_ascent_and_descent() {
        let mut fonts = BlockFonts::default();
        let handle = fonts.font(FontStyle::Regular, 20).unwrap();
        assert_eq!(handle.text_height(), 20);
        assert_eq!(handle.width("ab"), 20);
    }

    #[test]
    fn unreadable_font_file_is_reported() {
        let mut fonts = StyledFonts::new(FontStorage::new());
        let err = fonts
            .load_file(FontStyle::Bold, PathBuf::from("/nonexistent/font.ttf"))
            .unwrap_err();
        assert!(matches!(err, Error::FontFile { .. }));
    }

    #[test]
    fn garbage_binary_is_rejected() {
        let mut fonts = StyledFonts::new(FontStorage::new());
        assert!(fonts.load_binary(FontStyle::Regular, vec![0u8; 16]).is_err());
        assert!(!fonts.is_color_font(FontStyle::Regular));
    }
}
