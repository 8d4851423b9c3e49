use image::Rgba;

use crate::error::{Error, Result};
use crate::text::RunStyle;

/// Hashtag color used when the caller does not configure one.
pub const DEFAULT_HASHTAG_COLOR: Rgba<u8> = Rgba([0, 100, 200, 255]);

/// Parses `#RRGGBB`, `RRGGBB`, `#RGB` or `RGB` into an opaque color.
pub fn parse_hex_color(hex: &str) -> Result<Rgba<u8>> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidColor(hex.to_string()));
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| Error::InvalidColor(hex.to_string()));

    match digits.len() {
        6 => Ok(Rgba([
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
            255,
        ])),
        3 => {
            let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            Ok(Rgba([expand(0)?, expand(1)?, expand(2)?, 255]))
        }
        _ => Err(Error::InvalidColor(hex.to_string())),
    }
}

/// Returns `color` with its alpha replaced by `opacity` in `[0, 1]`.
pub fn with_opacity(color: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0) as u8;
    Rgba([color[0], color[1], color[2], alpha])
}

/// Fill colors for every run style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyleColors {
    pub regular: Rgba<u8>,
    pub italic: Rgba<u8>,
    pub bold: Rgba<u8>,
    pub hashtag: Option<Rgba<u8>>,
}

impl Default for StyleColors {
    fn default() -> Self {
        let black = Rgba([0, 0, 0, 255]);
        Self {
            regular: black,
            italic: black,
            bold: black,
            hashtag: None,
        }
    }
}

impl StyleColors {
    /// Hashtag > bold > italic > regular.
    pub fn resolve(&self, style: &RunStyle) -> Rgba<u8> {
        if style.hashtag {
            self.hashtag.unwrap_or(DEFAULT_HASHTAG_COLOR)
        } else if style.bold {
            self.bold
        } else if style.italic {
            self.italic
        } else {
            self.regular
        }
    }
}
