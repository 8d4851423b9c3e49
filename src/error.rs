use std::path::PathBuf;

use crate::font::FontStyle;

/// Errors produced by the fallible building blocks of the overlay pipeline.
///
/// None of these escape [`crate::OverlaySystem::overlay`]; the overlay turns
/// them into warnings and degrades the output instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no usable font for the {0:?} style")]
    FontUnavailable(FontStyle),

    #[error("failed to read font file {}: {source}", path.display())]
    FontFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse font: {0}")]
    FontParse(String),

    #[error("invalid hex color: {0:?}")]
    InvalidColor(String),

    #[error("text box has no usable interior ({width}x{height})")]
    EmptyTextBox { width: i32, height: i32 },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
