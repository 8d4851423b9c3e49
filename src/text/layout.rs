use euclid::default::{Box2D, Point2D};

use crate::error::{Error, Result};

use super::wrap::Line;

/// Smallest and largest accepted text box side, in pixels.
pub const MIN_BOX_SIDE: i32 = 10;
pub const MAX_BOX_SIDE: i32 = 10000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
/// Horizontal justification applied after each line is assembled.
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
/// Vertical alignment strategy for the entire block of text.
pub enum VerticalAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Rectangle on the image that receives the text. `padding` is applied on
/// every side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub padding: i32,
}

impl Default for TextBox {
    fn default() -> Self {
        Self {
            left: 0,
            top: 0,
            width: 200,
            height: 200,
            padding: 50,
        }
    }
}

impl TextBox {
    pub fn new(left: i32, top: i32, width: i32, height: i32, padding: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
            padding,
        }
    }

    pub fn effective_width(&self) -> i32 {
        self.width - 2 * self.padding
    }

    pub fn effective_height(&self) -> i32 {
        self.height - 2 * self.padding
    }

    /// Errors when padding leaves no room for text.
    pub fn validate(&self) -> Result<()> {
        if self.effective_width() <= 0 || self.effective_height() <= 0 {
            return Err(Error::EmptyTextBox {
                width: self.effective_width(),
                height: self.effective_height(),
            });
        }
        Ok(())
    }

    /// Outer rectangle, padding included.
    pub fn rect(&self) -> Box2D<i32> {
        Box2D::new(
            Point2D::new(self.left, self.top),
            Point2D::new(self.left + self.width, self.top + self.height),
        )
    }

    /// Rectangle available to text.
    pub fn content_rect(&self) -> Box2D<i32> {
        Box2D::new(
            Point2D::new(self.left + self.padding, self.top + self.padding),
            Point2D::new(
                self.left + self.width - self.padding,
                self.top + self.height - self.padding,
            ),
        )
    }

    /// Clamps both sides into `[MIN_BOX_SIDE, MAX_BOX_SIDE]`, returning a
    /// warning for every adjustment.
    pub fn clamped(&self) -> (TextBox, Vec<String>) {
        let mut clamped = *self;
        let mut warnings = Vec::new();

        for (name, side) in [("width", &mut clamped.width), ("height", &mut clamped.height)] {
            let fixed = (*side).clamp(MIN_BOX_SIDE, MAX_BOX_SIDE);
            if fixed != *side {
                warnings.push(format!(
                    "Text box {name} {} out of range, using {fixed}",
                    *side
                ));
                *side = fixed;
            }
        }

        (clamped, warnings)
    }
}

/// Where a wrapped line starts on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedLine {
    pub index: usize,
    pub origin: Point2D<i32>,
    pub width: u32,
    pub height: u32,
}

/// Positions `lines` inside `text_box`.
///
/// `widths[i]` is the measured width of `lines[i]`. Offsets that would go
/// negative are clamped to zero, so oversized text hangs off the right or
/// bottom edge instead of the top-left. Lines whose bottom would cross the
/// padded bottom edge are not placed, nor is anything after them.
pub fn place_lines(
    lines: &[Line],
    widths: &[u32],
    text_box: &TextBox,
    horizontal_align: HorizontalAlign,
    vertical_align: VerticalAlign,
    line_height_ratio: f32,
) -> Vec<PlacedLine> {
    let heights: Vec<u32> = lines
        .iter()
        .map(|line| line.height(line_height_ratio))
        .collect();
    let total_height: i64 = heights.iter().map(|&h| h as i64).sum();

    let effective_width = text_box.effective_width() as i64;
    let effective_height = text_box.effective_height() as i64;
    let content = text_box.content_rect();

    let offset_y = match vertical_align {
        VerticalAlign::Top => 0,
        VerticalAlign::Middle => ((effective_height - total_height) / 2).max(0),
        VerticalAlign::Bottom => (effective_height - total_height).max(0),
    };

    let mut placed = Vec::with_capacity(lines.len());
    let mut y = content.min.y as i64 + offset_y;
    for (index, (&width, &height)) in widths.iter().zip(&heights).enumerate() {
        if y + height as i64 > content.max.y as i64 {
            break;
        }

        let offset_x = match horizontal_align {
            HorizontalAlign::Left => 0,
            HorizontalAlign::Center => ((effective_width - width as i64) / 2).max(0),
            HorizontalAlign::Right => (effective_width - width as i64).max(0),
        };

        placed.push(PlacedLine {
            index,
            origin: Point2D::new((content.min.x as i64 + offset_x) as i32, y as i32),
            width,
            height,
        });
        y += height as i64;
    }

    placed
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::StyledRun;

    fn line(size: u32) -> Line {
        Line {
            fragments: vec![StyledRun::plain("x").fragment("x", size)],
            font_size: size,
        }
    }

    #[test]
    fn centers_a_line() {
        let text_box = TextBox::new(0, 0, 200, 100, 10);
        let placed = place_lines(
            &[line(10)],
            &[50],
            &text_box,
            HorizontalAlign::Center,
            VerticalAlign::Top,
            1.0,
        );
        assert_eq!(placed[0].origin, Point2D::new(75, 10));
    }

    #[test]
    fn right_and_bottom() {
        let text_box = TextBox::new(5, 5, 100, 100, 10);
        let placed = place_lines(
            &[line(10), line(10)],
            &[30, 40],
            &text_box,
            HorizontalAlign::Right,
            VerticalAlign::Bottom,
            1.0,
        );
        // content is 15..95 on both axes
        assert_eq!(placed[0].origin, Point2D::new(65, 75));
        assert_eq!(placed[1].origin, Point2D::new(55, 85));
    }

    #[test]
    fn middle_splits_the_slack() {
        let text_box = TextBox::new(0, 0, 100, 100, 0);
        let placed = place_lines(
            &[line(20)],
            &[10],
            &text_box,
            HorizontalAlign::Left,
            VerticalAlign::Middle,
            1.0,
        );
        assert_eq!(placed[0].origin, Point2D::new(0, 40));
    }

    #[test]
    fn oversized_text_is_clamped_and_clipped() {
        let text_box = TextBox::new(0, 0, 100, 50, 5);
        let lines = [line(20), line(20), line(20)];
        let placed = place_lines(
            &lines,
            &[500, 10, 10],
            &text_box,
            HorizontalAlign::Center,
            VerticalAlign::Middle,
            1.0,
        );
        // 40px of content fits two 20px lines, placed from the top
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].origin, Point2D::new(5, 5));
        assert_eq!(placed[1].origin.y, 25);
    }

    #[test]
    fn validate_rejects_padding_that_eats_the_box() {
        assert!(TextBox::new(0, 0, 100, 100, 50).validate().is_err());
        assert!(TextBox::new(0, 0, 100, 100, 49).validate().is_ok());
    }

    #[test]
    fn clamps_out_of_range_sides() {
        let (clamped, warnings) = TextBox::new(0, 0, 5, 20000, 0).clamped();
        assert_eq!((clamped.width, clamped.height), (MIN_BOX_SIDE, MAX_BOX_SIDE));
        assert_eq!(warnings.len(), 2);

        let (same, warnings) = TextBox::default().clamped();
        assert_eq!(same, TextBox::default());
        assert!(warnings.is_empty());
    }
}
