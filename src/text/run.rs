/// Style flags of a run. Decorations are independent of the face slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub hashtag: bool,
}

impl RunStyle {
    pub const HASHTAG: RunStyle = RunStyle {
        bold: true,
        italic: false,
        underline: false,
        strikethrough: false,
        hashtag: true,
    };
}

/// A contiguous piece of text sharing one style.
///
/// Runs coming out of the parser have no size; the wrapper stamps every
/// fragment it produces with the size it was laid out at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StyledRun {
    pub text: String,
    pub style: RunStyle,
    pub font_size: Option<u32>,
}

impl StyledRun {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
            font_size: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RunStyle::default())
    }

    /// A sized piece of this run carrying `text`.
    pub fn fragment(&self, text: &str, font_size: u32) -> Self {
        Self {
            text: text.to_string(),
            style: self.style,
            font_size: Some(font_size),
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.text.trim().is_empty()
    }
}
