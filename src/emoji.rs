//! Emoji detection, segmentation and bitmap sources.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use image::{RgbaImage, imageops};

/// Code point ranges treated as emoji.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x2600, 0x26FF),   // miscellaneous symbols
    (0x2700, 0x27BF),   // dingbats
    (0x2744, 0x2744),   // snowflake
    (0x2B50, 0x2B50),   // star
    (0x1F000, 0x1F02F), // mahjong tiles
    (0x1F1E0, 0x1F1FF), // regional indicators
    (0x1F300, 0x1F5FF), // symbols and pictographs
    (0x1F600, 0x1F64F), // emoticons
    (0x1F680, 0x1F6FF), // transport and map
    (0x1F700, 0x1F8FF), // alchemical, geometric shapes ext, arrows-c
    (0x1F900, 0x1F9FF), // supplemental symbols and pictographs
    (0x1FA00, 0x1FFFF), // chess, symbols ext-a and beyond
];

const REGIONAL_INDICATORS: (u32, u32) = (0x1F1E6, 0x1F1FF);
const VARIATION_SELECTORS: (u32, u32) = (0xFE00, 0xFE0F);

/// Alpha above which a pixel counts as content when cropping.
pub const CROP_ALPHA_THRESHOLD: u8 = 10;
/// Lower bound on the advance of a cropped emoji.
pub const MIN_EMOJI_WIDTH: u32 = 4;

fn in_range(ch: char, (lo, hi): (u32, u32)) -> bool {
    (lo..=hi).contains(&(ch as u32))
}

/// Whether `ch` falls in one of the recognized emoji ranges.
pub fn is_emoji(ch: char) -> bool {
    EMOJI_RANGES.iter().any(|&range| in_range(ch, range))
}

/// Whether any character of `text` is an emoji.
pub fn has_emoji(text: &str) -> bool {
    text.chars().any(is_emoji)
}

/// Every emoji code point in `text`, one string each.
pub fn extract_emojis(text: &str) -> Vec<String> {
    text.chars()
        .filter(|&ch| is_emoji(ch))
        .map(String::from)
        .collect()
}

/// A piece of text that is either all plain or a single emoji sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub is_emoji: bool,
}

/// Splits `text` into plain and emoji segments, preserving every character.
///
/// An emoji sequence is one emoji code point followed by any variation
/// selectors, or a run of regional indicators (flags).
pub fn split_by_emoji(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if !is_emoji(ch) {
            continue;
        }

        let regional = in_range(ch, REGIONAL_INDICATORS);
        let mut end = start + ch.len_utf8();
        while let Some(&(idx, next)) = chars.peek() {
            let joins = if regional {
                in_range(next, REGIONAL_INDICATORS)
            } else {
                in_range(next, VARIATION_SELECTORS)
            };
            if !joins {
                break;
            }
            end = idx + next.len_utf8();
            chars.next();
        }

        if start > plain_start {
            segments.push(Segment {
                text: &text[plain_start..start],
                is_emoji: false,
            });
        }
        segments.push(Segment {
            text: &text[start..end],
            is_emoji: true,
        });
        plain_start = end;
    }

    if plain_start < text.len() {
        segments.push(Segment {
            text: &text[plain_start..],
            is_emoji: false,
        });
    }

    segments
}

/// Source of color bitmaps for emoji sequences.
///
/// Returning `None` makes the caller draw the sequence with the text face
/// and measure it at `0.8 * size`.
pub trait EmojiBitmapProvider {
    fn bitmap(&mut self, emoji: &str, size: u32) -> Option<RgbaImage>;
}

impl<F> EmojiBitmapProvider for F
where
    F: FnMut(&str, u32) -> Option<RgbaImage>,
{
    fn bitmap(&mut self, emoji: &str, size: u32) -> Option<RgbaImage> {
        self(emoji, size)
    }
}

/// Loads `<dir>/<codepoint>.png` (lowercase hex of the first code point),
/// scaled to `size` x `size`.
pub struct PngDirEmoji {
    dir: PathBuf,
    cache: HashMap<(String, u32), Option<RgbaImage>, fxhash::FxBuildHasher>,
}

impl PngDirEmoji {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::with_hasher(fxhash::FxBuildHasher::default()),
        }
    }

    pub fn path_for(&self, emoji: &str) -> Option<PathBuf> {
        let first = emoji.chars().next()?;
        Some(self.dir.join(format!("{:x}.png", first as u32)))
    }

    fn load(&self, emoji: &str, size: u32) -> Option<RgbaImage> {
        let path = self.path_for(emoji)?;
        match image::open(&path) {
            Ok(img) => Some(imageops::resize(
                &img.to_rgba8(),
                size.max(1),
                size.max(1),
                imageops::FilterType::Lanczos3,
            )),
            Err(e) => {
                log::debug!("No emoji bitmap at {}: {e}", path.display());
                None
            }
        }
    }
}

impl EmojiBitmapProvider for PngDirEmoji {
    fn bitmap(&mut self, emoji: &str, size: u32) -> Option<RgbaImage> {
        let key = (emoji.to_string(), size);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let loaded = self.load(emoji, size);
        self.cache.insert(key, loaded.clone());
        loaded
    }
}

/// An emoji bitmap trimmed to its visible content.
#[derive(Clone, Debug)]
pub struct CroppedEmoji {
    pub image: Arc<RgbaImage>,
    /// Horizontal advance used for both measuring and drawing.
    pub advance: u32,
}

/// Crops to the bounding box of pixels with alpha above
/// [`CROP_ALPHA_THRESHOLD`]. A bitmap with no such pixel is kept whole and
/// advances by `0.8 * size`.
pub fn crop_to_content(bitmap: RgbaImage, size: u32) -> CroppedEmoji {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in bitmap.enumerate_pixels() {
        if pixel[3] <= CROP_ALPHA_THRESHOLD {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => {
            let cropped = imageops::crop_imm(&bitmap, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image();
            let advance = cropped.width().max(MIN_EMOJI_WIDTH);
            CroppedEmoji {
                image: Arc::new(cropped),
                advance,
            }
        }
        None => CroppedEmoji {
            image: Arc::new(bitmap),
            advance: fallback_emoji_width(size),
        },
    }
}

/// Advance of an emoji without a usable bitmap.
pub fn fallback_emoji_width(size: u32) -> u32 {
    size * 4 / 5
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn detects_emoji_ranges() {
        assert!(is_emoji('😀'));
        assert!(is_emoji('☀'));
        assert!(is_emoji('⭐'));
        assert!(is_emoji('🇺'));
        assert!(!is_emoji('a'));
        assert!(!is_emoji('é'));
        assert!(!has_emoji("plain text"));
        assert!(has_emoji("sun ☀ here"));
    }

    #[test]
    fn split_keeps_variation_selectors_and_flags_together() {
        let segments = split_by_emoji("Hi ❤\u{FE0F}🇺🇸!");
        let texts: Vec<(&str, bool)> = segments.iter().map(|s| (s.text, s.is_emoji)).collect();
        assert_eq!(
            texts,
            [("Hi ", false), ("❤\u{FE0F}", true), ("🇺🇸", true), ("!", false)]
        );
    }

    #[test]
    fn adjacent_emoji_are_separate_segments() {
        let segments = split_by_emoji("😀😀");
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.is_emoji && s.text == "😀"));
    }

    #[test]
    fn split_without_emoji_is_one_segment() {
        let segments = split_by_emoji("abc");
        assert_eq!(segments, [Segment { text: "abc", is_emoji: false }]);
        assert!(split_by_emoji("").is_empty());
    }

    #[test]
    fn extract_lists_code_points() {
        assert_eq!(extract_emojis("a😀b🌸"), ["😀", "🌸"]);
    }

    #[test]
    fn crop_uses_alpha_threshold() {
        let mut bitmap = RgbaImage::new(20, 20);
        for y in 4..16 {
            for x in 5..15 {
                bitmap.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        // faint halo below the threshold
        bitmap.put_pixel(0, 0, Rgba([255, 0, 0, 10]));

        let cropped = crop_to_content(bitmap, 20);
        assert_eq!(cropped.image.dimensions(), (10, 12));
        assert_eq!(cropped.advance, 10);
    }

    #[test]
    fn narrow_content_is_widened() {
        let mut bitmap = RgbaImage::new(20, 20);
        bitmap.put_pixel(3, 3, Rgba([0, 0, 0, 255]));
        let cropped = crop_to_content(bitmap, 20);
        assert_eq!(cropped.image.dimensions(), (1, 1));
        assert_eq!(cropped.advance, MIN_EMOJI_WIDTH);
    }

    #[test]
    fn transparent_bitmap_uses_fallback_width() {
        let cropped = crop_to_content(RgbaImage::new(20, 20), 20);
        assert_eq!(cropped.advance, 16);
        assert_eq!(cropped.image.dimensions(), (20, 20));
    }

    #[test]
    fn png_dir_paths_and_missing_files() {
        let mut provider = PngDirEmoji::new("/nonexistent/emoji");
        assert_eq!(
            provider.path_for("😀").unwrap(),
            PathBuf::from("/nonexistent/emoji/1f600.png")
        );
        assert!(provider.bitmap("😀", 32).is_none());
    }

    #[test]
    fn closures_are_providers() {
        let mut calls = 0;
        let mut provider = |_: &str, size: u32| {
            calls += 1;
            Some(RgbaImage::new(size, size))
        };
        assert_eq!(provider.bitmap("😀", 8).unwrap().dimensions(), (8, 8));
        assert_eq!(calls, 1);
    }
}
