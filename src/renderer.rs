mod canvas;
pub mod cpu_renderer;

pub use canvas::Canvas;
pub use cpu_renderer::{CpuRenderer, GlyphCache, RenderParams, draw_bounding_box};
