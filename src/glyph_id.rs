use crate::font::FontStyle;

/// Key of a rasterized glyph in the renderer cache.
///
/// Glyphs are keyed by style slot rather than by face identity, so the cache
/// must be cleared whenever the faces behind a [`crate::font::FontProvider`]
/// change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphId {
    style: FontStyle,
    ch: char,
    font_size: u32,
}

impl GlyphId {
    /// Creates a key for `ch` in the `style` slot at `font_size` pixels.
    pub fn new(style: FontStyle, ch: char, font_size: u32) -> Self {
        Self {
            style,
            ch,
            font_size,
        }
    }

    /// Face slot the glyph was rasterized from.
    pub fn style(&self) -> FontStyle {
        self.style
    }

    /// The character.
    pub fn ch(&self) -> char {
        self.ch
    }

    /// Pixel size the glyph was rasterized at.
    pub fn font_size(&self) -> u32 {
        self.font_size
    }
}
