//! # Fude
//!
//! Styled text overlays for raster images, with automatic font fitting.
//!
//! ## Overview
//!
//! `Fude` takes a piece of lightly marked-up text, finds the largest font size
//! at which it fits a padded box, and draws it onto one or more RGBA images.
//! The core of the library is the [`OverlaySystem`], which coordinates font
//! resolution, measurement, wrapping, the fit search and rendering.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fude::{FontPaths, OverlayConfig, OverlaySystem, text::{Dialect, TextBox}};
//!
//! // 1. Create an OverlaySystem backed by system fonts
//! let system = OverlaySystem::from_font_paths(&FontPaths::default());
//!
//! // 2. Describe the overlay
//! let config = OverlayConfig {
//!     text: "**Launch day** is here #release 🚀".to_string(),
//!     dialect: Dialect::Markdown,
//!     text_box: TextBox::new(40, 40, 560, 200, 20),
//!     ..Default::default()
//! };
//!
//! // 3. Draw onto a batch of images
//! let mut images = vec![image::RgbaImage::new(640, 280)];
//! let report = system.overlay(&mut images, &config);
//! println!("{}", report.processing_info());
//! ```
//!
//! ## Features
//!
//! *   **Markup**: `<b>`/`<i>`/`<u>`/`<s>` tags or a small Markdown subset, plus hashtags.
//! *   **Fitting**: Largest-size search with aggressive scaling, hyphenation and truncation fallbacks.
//! *   **Emoji**: Color bitmaps from a pluggable source, measured and drawn consistently.
//! *   **Thread Safety**: Designed with internal locking for safe concurrent use.

pub mod color;
pub mod emoji;
pub mod error;
pub mod font;
pub mod font_storage;
pub mod glyph_id;
pub mod overlay_system;
pub mod renderer;
pub mod text;

#[cfg(test)]
mod test_support;

// common re-exports
pub use error::{Error, Result};
pub use font::{FontPaths, FontProvider, FontStyle, StyledFonts};
pub use font_storage::FontStorage;
pub use glyph_id::GlyphId;
pub use overlay_system::{BoundingBoxStyle, OverlayConfig, OverlayReport, OverlaySystem};

// re-export dependencies
pub use fontdb;
pub use fontdue;
pub use image;
pub use parking_lot;
