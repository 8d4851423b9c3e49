use euclid::default::Box2D;
use image::{Rgba, RgbaImage};

/// Drawing surface over an RGBA image. Everything is clipped to the image
/// bounds and composited source-over.
pub struct Canvas<'a> {
    image: &'a mut RgbaImage,
}

impl<'a> Canvas<'a> {
    /// Wraps `image` for drawing.
    pub fn new(image: &'a mut RgbaImage) -> Self {
        Self { image }
    }

    /// Width of the underlying image in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height of the underlying image in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The image drawn so far.
    pub fn image(&self) -> &RgbaImage {
        &*self.image
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    /// Blends `color`, scaled by `coverage`, over the pixel at `(x, y)`.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba<u8>, coverage: u8) {
        if coverage == 0 || !self.in_bounds(x, y) {
            return;
        }

        let a = color[3] as f32 / 255.0 * (coverage as f32 / 255.0);
        if a <= 0.0 {
            return;
        }

        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let bg_a = pixel[3] as f32 / 255.0;
        let out_a = a + bg_a * (1.0 - a);
        // Avoid division by zero
        if out_a <= 0.0 {
            return;
        }

        for c in 0..3 {
            let src = color[c] as f32 / 255.0;
            let bg = pixel[c] as f32 / 255.0;
            let out = (src * a + bg * bg_a * (1.0 - a)) / out_a;
            pixel[c] = (out * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        pixel[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    /// Fills the half-open rectangle `rect`.
    pub fn fill_rect(&mut self, rect: Box2D<i32>, color: Rgba<u8>) {
        let x0 = rect.min.x.max(0);
        let y0 = rect.min.y.max(0);
        let x1 = rect.max.x.min(self.width() as i32);
        let y1 = rect.max.y.min(self.height() as i32);

        for y in y0..y1 {
            for x in x0..x1 {
                self.blend_pixel(x, y, color, 255);
            }
        }
    }

    /// Outline drawn inside `rect`, `line_width` pixels thick.
    pub fn stroke_rect(&mut self, rect: Box2D<i32>, color: Rgba<u8>, line_width: u32) {
        let w = (line_width as i32)
            .min(rect.width() / 2 + 1)
            .min(rect.height() / 2 + 1);
        if w <= 0 || rect.is_empty() {
            return;
        }

        let (min, max) = (rect.min, rect.max);
        let edges = [
            Box2D::new(min, euclid::point2(max.x, min.y + w)),
            Box2D::new(euclid::point2(min.x, max.y - w), max),
            Box2D::new(euclid::point2(min.x, min.y + w), euclid::point2(min.x + w, max.y - w)),
            Box2D::new(euclid::point2(max.x - w, min.y + w), euclid::point2(max.x, max.y - w)),
        ];
        for edge in edges {
            self.fill_rect(edge, color);
        }
    }

    /// One-pixel horizontal line from `x0` (inclusive) to `x1` (exclusive).
    pub fn hline(&mut self, x0: i32, x1: i32, y: i32, color: Rgba<u8>) {
        for x in x0..x1 {
            self.blend_pixel(x, y, color, 255);
        }
    }

    /// Draws an 8-bit coverage mask with its top-left corner at `(x, y)`.
    pub fn draw_coverage(
        &mut self,
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        coverage: &[u8],
        color: Rgba<u8>,
    ) {
        for row in 0..height {
            for col in 0..width {
                let Some(&alpha) = coverage.get(row * width + col) else {
                    return;
                };
                self.blend_pixel(x + col as i32, y + row as i32, color, alpha);
            }
        }
    }

    /// Composites an RGBA bitmap with its top-left corner at `(x, y)`.
    pub fn draw_image(&mut self, bitmap: &RgbaImage, x: i32, y: i32) {
        for (bx, by, pixel) in bitmap.enumerate_pixels() {
            let color = Rgba([pixel[0], pixel[1], pixel[2], 255]);
            self.blend_pixel(x + bx as i32, y + by as i32, color, pixel[3]);
        }
    }
}
