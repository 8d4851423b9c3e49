use crate::error::Result;

use super::metrics::GlyphMetrics;
use super::run::StyledRun;

/// Height of one line of text at `font_size`, rounded up.
///
/// The product is rounded to thousandths of a pixel first, so that an `f32`
/// ratio such as `1.2` does not push an exact height up by a whole pixel.
pub fn line_height(font_size: u32, ratio: f32) -> u32 {
    let exact = font_size as f64 * ratio as f64;
    ((exact * 1000.0).round() / 1000.0).ceil().max(0.0) as u32
}

/// One wrapped line: words and single-space fragments, each stamped with the
/// size it was measured at.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub fragments: Vec<StyledRun>,
    pub font_size: u32,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Sum of the fragment widths.
    pub fn width(&self, metrics: &mut GlyphMetrics<'_>) -> Result<u32> {
        let mut width = 0u32;
        for fragment in &self.fragments {
            let size = fragment.font_size.unwrap_or(self.font_size);
            width = width.saturating_add(metrics.measure(&fragment.style, size, &fragment.text)?);
        }
        Ok(width)
    }

    /// Largest fragment size, or the line size for an empty line.
    pub fn size(&self) -> u32 {
        self.fragments
            .iter()
            .filter_map(|fragment| fragment.font_size)
            .max()
            .unwrap_or(self.font_size)
            .max(self.font_size)
    }

    pub fn height(&self, ratio: f32) -> u32 {
        line_height(self.size(), ratio)
    }

    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Wrapped {
    pub lines: Vec<Line>,
    pub total_height: u32,
}

struct LineBuilder {
    fragments: Vec<StyledRun>,
    width: u32,
    font_size: u32,
}

impl LineBuilder {
    fn new(font_size: u32) -> Self {
        Self {
            fragments: Vec::new(),
            width: 0,
            font_size,
        }
    }

    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn push(&mut self, fragment: StyledRun, width: u32) {
        self.fragments.push(fragment);
        self.width = self.width.saturating_add(width);
    }

    /// Trailing spaces are dropped so alignment sees the inked width.
    fn finish(&mut self) -> Line {
        let mut fragments = std::mem::take(&mut self.fragments);
        while fragments.last().is_some_and(|f| f.text == " ") {
            fragments.pop();
        }
        self.width = 0;
        Line {
            fragments,
            font_size: self.font_size,
        }
    }
}

/// Greedy word wrap of `runs` into lines no wider than `width_budget`.
///
/// Runs split on `\n` first; every newline ends a line, even an empty one.
/// Each piece then splits on single spaces. A word joins the current line
/// when `line + word + following space` fits, or when the line is empty, so
/// an over-long word gets a line to itself. A space that would start a
/// wrapped line is dropped.
pub fn wrap(
    metrics: &mut GlyphMetrics<'_>,
    runs: &[StyledRun],
    width_budget: u32,
    font_size: u32,
    line_height_ratio: f32,
) -> Result<Wrapped> {
    let mut lines = Vec::new();
    let mut current = LineBuilder::new(font_size);

    for run in runs {
        for (piece_index, piece) in run.text.split('\n').enumerate() {
            if piece_index > 0 {
                lines.push(current.finish());
            }

            let words: Vec<&str> = piece.split(' ').collect();
            let last = words.len() - 1;
            for (index, word) in words.iter().enumerate() {
                let trailing_space = index < last;
                let word_width = if word.is_empty() {
                    0
                } else {
                    metrics.measure(&run.style, font_size, word)?
                };
                let space_width = if trailing_space {
                    metrics.measure(&run.style, font_size, " ")?
                } else {
                    0
                };

                let needed = current
                    .width
                    .saturating_add(word_width)
                    .saturating_add(space_width);
                if needed > width_budget && !current.is_empty() {
                    lines.push(current.finish());
                }

                if !word.is_empty() {
                    current.push(run.fragment(word, font_size), word_width);
                }
                if trailing_space && !current.is_empty() {
                    current.push(run.fragment(" ", font_size), space_width);
                }
            }
        }
    }

    if !current.is_empty() {
        lines.push(current.finish());
    }

    // saturates for huge ratios
    let total_height = lines
        .iter()
        .map(|line| line.height(line_height_ratio))
        .fold(0u32, u32::saturating_add);
    Ok(Wrapped {
        lines,
        total_height,
    })
}
