/// Largest fitting font size and its fallbacks.
pub mod fit;
/// Text box geometry and line placement.
pub mod layout;
/// Width measurement shared by fitting and rendering.
pub mod metrics;
/// Markup dialects to styled runs.
pub mod parser;
/// Styled runs of text.
pub mod run;
/// Greedy word wrapping.
pub mod wrap;

pub use fit::{FitRequest, FitResult, FitState, FitStrategy, find_fitting_size};
pub use layout::{HorizontalAlign, PlacedLine, TextBox, VerticalAlign, place_lines};
pub use metrics::{GlyphMetrics, MetricsCache};
pub use parser::{Dialect, count_hashtags, extract_hashtags, has_hashtags, parse};
pub use run::{RunStyle, StyledRun};
pub use wrap::{Line, Wrapped, line_height, wrap};
