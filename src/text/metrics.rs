use std::{collections::HashMap, sync::Arc};

use image::RgbaImage;

use crate::emoji::{self, CroppedEmoji, EmojiBitmapProvider};
use crate::error::Result;
use crate::font::{FontHandle, FontProvider, FontStyle};
use crate::text::RunStyle;

/// Smallest width reported for a lone space, so that word gaps never vanish
/// in faces with zero-width spaces.
pub const MIN_SPACE_WIDTH: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct WidthKey {
    style: FontStyle,
    size: u32,
    emoji: bool,
    text: String,
}

/// Memoized widths and cropped emoji bitmaps.
///
/// Entries are keyed by style slot, so the cache must be cleared when the
/// faces behind the provider change.
#[derive(Default)]
pub struct MetricsCache {
    widths: HashMap<WidthKey, u32, fxhash::FxBuildHasher>,
    emoji: HashMap<(String, u32), Option<CroppedEmoji>, fxhash::FxBuildHasher>,
}

impl MetricsCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every memoized width and cropped emoji.
    pub fn clear(&mut self) {
        self.widths.clear();
        self.emoji.clear();
    }

    /// Number of memoized widths plus cached emoji entries, misses included.
    pub fn len(&self) -> usize {
        self.widths.len() + self.emoji.len()
    }

    /// Returns `true` when nothing has been memoized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Measures styled text for both fitting and rendering.
///
/// Layout and drawing must go through the same instance so that every width
/// the wrapper relied on is exactly the advance the renderer uses.
pub struct GlyphMetrics<'a> {
    fonts: &'a mut dyn FontProvider,
    emoji_provider: Option<&'a mut dyn EmojiBitmapProvider>,
    emoji_enabled: bool,
    cache: &'a mut MetricsCache,
}

impl<'a> GlyphMetrics<'a> {
    /// Metrics over `fonts`, memoizing into `cache`. Emoji handling is on,
    /// with no bitmap source until one is attached.
    pub fn new(fonts: &'a mut dyn FontProvider, cache: &'a mut MetricsCache) -> Self {
        Self {
            fonts,
            emoji_provider: None,
            emoji_enabled: true,
            cache,
        }
    }

    /// Attaches the source of emoji bitmaps.
    pub fn with_emoji_provider(mut self, provider: &'a mut dyn EmojiBitmapProvider) -> Self {
        self.emoji_provider = Some(provider);
        self
    }

    /// With emoji handling off, emoji code points are measured and drawn by
    /// the text face like any other character.
    pub fn with_emoji(mut self, enabled: bool) -> Self {
        self.emoji_enabled = enabled;
        self
    }

    /// Whether emoji are measured and drawn from bitmaps.
    pub fn emoji_enabled(&self) -> bool {
        self.emoji_enabled
    }

    /// Font handle for the face slot of `style` at `size`.
    pub fn resolve_font(&mut self, style: &RunStyle, size: u32) -> Result<FontHandle> {
        self.fonts.font(FontStyle::for_run(style), size)
    }

    /// Whether the face behind `style` is a color font.
    pub fn is_color_font(&self, style: &RunStyle) -> bool {
        self.fonts.is_color_font(FontStyle::for_run(style))
    }

    /// Width of `text` in `style` at `size`, in whole pixels.
    pub fn measure(&mut self, style: &RunStyle, size: u32, text: &str) -> Result<u32> {
        if text.is_empty() {
            return Ok(0);
        }

        let key = WidthKey {
            style: FontStyle::for_run(style),
            size,
            emoji: self.emoji_enabled,
            text: text.to_string(),
        };
        if let Some(&width) = self.cache.widths.get(&key) {
            return Ok(width);
        }

        let font = self.resolve_font(style, size)?;
        let width = if text == " " {
            font.width(text).max(MIN_SPACE_WIDTH)
        } else if self.emoji_enabled && emoji::has_emoji(text) {
            let mut total = 0;
            for segment in emoji::split_by_emoji(text) {
                total += if segment.is_emoji {
                    self.emoji_width(segment.text, size)
                } else {
                    font.width(segment.text)
                };
            }
            total
        } else {
            font.width(text)
        };

        self.cache.widths.insert(key, width);
        Ok(width)
    }

    /// Advance of an emoji sequence: its cropped bitmap width, or
    /// `0.8 * size` without a bitmap.
    pub fn emoji_width(&mut self, emoji: &str, size: u32) -> u32 {
        self.cropped_emoji(emoji, size)
            .map(|cropped| cropped.advance)
            .unwrap_or_else(|| emoji::fallback_emoji_width(size))
    }

    /// Cropped bitmap of an emoji sequence, if the provider has one.
    pub fn emoji_bitmap(&mut self, emoji: &str, size: u32) -> Option<Arc<RgbaImage>> {
        self.cropped_emoji(emoji, size).map(|cropped| cropped.image)
    }

    fn cropped_emoji(&mut self, emoji: &str, size: u32) -> Option<CroppedEmoji> {
        let key = (emoji.to_string(), size);
        if let Some(cached) = self.cache.emoji.get(&key) {
            return cached.clone();
        }

        let cropped = self
            .emoji_provider
            .as_mut()
            .and_then(|provider| provider.bitmap(emoji, size))
            .map(|bitmap| emoji::crop_to_content(bitmap, size));
        self.cache.emoji.insert(key, cropped.clone());
        cropped
    }
}
