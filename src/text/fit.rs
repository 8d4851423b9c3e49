//! Largest-font-size search with an ordered chain of fallbacks.
//!
//! The search is a small state machine. Each state either accepts a layout
//! or hands over to the next, more desperate, strategy:
//!
//! 1. validate the box and the text, pre-check the longest word
//! 2. normal descent from `max_size` down to `min_size`
//! 3. aggressive descent below `min_size` down to [`AGGRESSIVE_FLOOR`]
//! 4. hyphenation of very long words
//! 5. truncation to 100, 50 and 25 characters, then a placeholder
//! 6. terminal fallback at the minimum size, ignoring the height budget
//!
//! Every step that degrades the result records a warning. Nothing here
//! returns an error; a failed measurement only disqualifies a candidate.

use crate::error::Error;

use super::metrics::GlyphMetrics;
use super::parser::{self, Dialect};
use super::run::{RunStyle, StyledRun};
use super::wrap::{Line, Wrapped, wrap};

pub const DEFAULT_MIN_FONT_SIZE: u32 = 6;
pub const AGGRESSIVE_FLOOR: u32 = 3;
pub const TRUNCATION_STEPS: [usize; 3] = [100, 50, 25];
pub const OVERFLOW_PLACEHOLDER: &str = "Text overflow";
/// Words with more characters than this are split by hyphenation.
pub const HYPHENATION_THRESHOLD: usize = 20;

/// Inputs of a fit search.
#[derive(Clone, Debug, PartialEq)]
pub struct FitRequest {
    pub width_budget: i32,
    pub height_budget: i32,
    pub line_height_ratio: f32,
    pub max_size: u32,
    pub min_size: u32,
    pub dialect: Dialect,
    pub detect_hashtags: bool,
}

impl FitRequest {
    pub fn new(width_budget: i32, height_budget: i32, max_size: u32) -> Self {
        Self {
            width_budget,
            height_budget,
            line_height_ratio: 1.2,
            max_size,
            min_size: DEFAULT_MIN_FONT_SIZE,
            dialect: Dialect::default(),
            detect_hashtags: true,
        }
    }

    /// The size every fallback settles on. Never above `max_size`.
    pub fn floor_size(&self) -> u32 {
        self.min_size.min(self.max_size).max(1)
    }
}

/// How the accepted layout was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FitStrategy {
    Normal,
    Aggressive,
    Hyphenated,
    /// Text cut to this many characters plus an ellipsis.
    Truncated(usize),
    /// Text replaced by [`OVERFLOW_PLACEHOLDER`].
    Placeholder,
    /// Layout at the minimum size with no height constraint.
    Fallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FitResult {
    /// `None` only when even the terminal fallback could not be laid out.
    pub font_size: Option<u32>,
    pub lines: Vec<Line>,
    pub total_height: u32,
    pub warnings: Vec<String>,
    pub strategy: FitStrategy,
}

impl FitResult {
    pub fn is_rendered(&self) -> bool {
        self.font_size.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FitState {
    Validate,
    NormalDescent,
    AggressiveScaling,
    Hyphenation,
    Truncation,
    TerminalFallback { offending_word: Option<String> },
}

#[derive(Debug)]
pub enum Step {
    Accept {
        size: u32,
        wrapped: Wrapped,
        strategy: FitStrategy,
    },
    Next(FitState),
    Done(FitResult),
}

/// Runs [`FitSearch`] to completion.
pub fn find_fitting_size(
    metrics: &mut GlyphMetrics<'_>,
    markup: &str,
    request: &FitRequest,
) -> FitResult {
    FitSearch::new(metrics, markup, request).run()
}

pub struct FitSearch<'m, 'a> {
    metrics: &'m mut GlyphMetrics<'a>,
    markup: &'m str,
    request: &'m FitRequest,
    runs: Vec<StyledRun>,
    warnings: Vec<String>,
}

impl<'m, 'a> FitSearch<'m, 'a> {
    pub fn new(
        metrics: &'m mut GlyphMetrics<'a>,
        markup: &'m str,
        request: &'m FitRequest,
    ) -> Self {
        Self {
            metrics,
            markup,
            request,
            runs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn run(mut self) -> FitResult {
        let mut state = FitState::Validate;
        loop {
            log::debug!("fit search entering {state:?}");
            match self.step(state) {
                Step::Accept {
                    size,
                    wrapped,
                    strategy,
                } => return self.accept(size, wrapped, strategy),
                Step::Next(next) => state = next,
                Step::Done(result) => return result,
            }
        }
    }

    pub fn step(&mut self, state: FitState) -> Step {
        match state {
            FitState::Validate => self.validate(),
            FitState::NormalDescent => self.normal_descent(),
            FitState::AggressiveScaling => self.aggressive_scaling(),
            FitState::Hyphenation => self.hyphenation(),
            FitState::Truncation => self.truncation(),
            FitState::TerminalFallback { offending_word } => {
                Step::Done(self.terminal_fallback(offending_word.as_deref()))
            }
        }
    }

    fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.warnings.push(message);
    }

    fn parse(&self, markup: &str) -> Vec<StyledRun> {
        parser::parse_with_hashtags(markup, self.request.dialect, self.request.detect_hashtags)
    }

    /// Both budgets are positive once validation has passed.
    fn width_budget(&self) -> u32 {
        self.request.width_budget.max(0) as u32
    }

    fn height_budget(&self) -> u32 {
        self.request.height_budget.max(0) as u32
    }

    fn try_size(&mut self, runs: &[StyledRun], size: u32) -> Result<Option<Wrapped>, Error> {
        let wrapped = wrap(
            self.metrics,
            runs,
            self.width_budget(),
            size,
            self.request.line_height_ratio,
        )?;
        Ok((wrapped.total_height <= self.height_budget()).then_some(wrapped))
    }

    fn validate(&mut self) -> Step {
        if self.request.width_budget <= 0 || self.request.height_budget <= 0 {
            self.warn("Invalid text box dimensions".to_string());
            return Step::Next(FitState::TerminalFallback {
                offending_word: None,
            });
        }
        if self.markup.trim().is_empty() {
            self.warn("Empty text provided".to_string());
            return Step::Next(FitState::TerminalFallback {
                offending_word: None,
            });
        }

        self.runs = self.parse(self.markup);

        if let Some(word) = longest_word(&self.runs) {
            let floor = self.request.floor_size();
            match self.metrics.measure(&RunStyle::default(), floor, &word) {
                Ok(width) if width > self.width_budget() => {
                    self.warn(format!(
                        "Word '{word}' is too long to fit even at minimum font size"
                    ));
                    return Step::Next(FitState::TerminalFallback {
                        offending_word: Some(word),
                    });
                }
                Ok(_) => {}
                Err(e) => log::debug!("Skipping long word pre-check: {e}"),
            }
        }

        Step::Next(FitState::NormalDescent)
    }

    fn normal_descent(&mut self) -> Step {
        let runs = std::mem::take(&mut self.runs);
        let floor = self.request.floor_size();

        let mut accepted = None;
        for size in (floor..=self.request.max_size).rev() {
            match self.try_size(&runs, size) {
                Ok(Some(wrapped)) => {
                    accepted = Some((size, wrapped));
                    break;
                }
                Ok(None) => {}
                Err(e) => self.warn(format!("Error at font size {size}: {e}")),
            }
        }

        self.runs = runs;
        match accepted {
            Some((size, wrapped)) => Step::Accept {
                size,
                wrapped,
                strategy: FitStrategy::Normal,
            },
            None => Step::Next(FitState::AggressiveScaling),
        }
    }

    fn aggressive_scaling(&mut self) -> Step {
        self.warn("Normal font scaling failed, trying aggressive scaling".to_string());
        let runs = std::mem::take(&mut self.runs);
        let floor = self.request.floor_size();

        let mut accepted = None;
        for size in (AGGRESSIVE_FLOOR..floor).rev() {
            match self.try_size(&runs, size) {
                Ok(Some(wrapped)) => {
                    accepted = Some((size, wrapped));
                    break;
                }
                Ok(None) => {}
                Err(e) => log::debug!("Aggressive scaling error at font size {size}: {e}"),
            }
        }

        self.runs = runs;
        match accepted {
            Some((size, wrapped)) => {
                self.warn(format!(
                    "Text fits with aggressive scaling at font size {size}"
                ));
                Step::Accept {
                    size,
                    wrapped,
                    strategy: FitStrategy::Aggressive,
                }
            }
            None => Step::Next(FitState::Hyphenation),
        }
    }

    fn hyphenation(&mut self) -> Step {
        let Some(hyphenated) = hyphenate_runs(&self.runs) else {
            return Step::Next(FitState::Truncation);
        };
        self.warn("Aggressive scaling failed, trying word hyphenation".to_string());

        let top = self.request.floor_size();
        let bottom = AGGRESSIVE_FLOOR.min(top);
        for size in (bottom..=top).rev() {
            match self.try_size(&hyphenated, size) {
                Ok(Some(wrapped)) => {
                    self.warn(format!(
                        "Text fits after hyphenating long words at font size {size}"
                    ));
                    return Step::Accept {
                        size,
                        wrapped,
                        strategy: FitStrategy::Hyphenated,
                    };
                }
                Ok(None) => {}
                Err(e) => log::debug!("Hyphenation error at font size {size}: {e}"),
            }
        }

        Step::Next(FitState::Truncation)
    }

    fn truncation(&mut self) -> Step {
        self.warn("All scaling methods failed, trying text truncation".to_string());
        let size = self.request.floor_size();

        let mut candidates: Vec<(String, FitStrategy)> = TRUNCATION_STEPS
            .iter()
            .map(|&limit| (truncate_chars(self.markup, limit), FitStrategy::Truncated(limit)))
            .collect();
        candidates.push((OVERFLOW_PLACEHOLDER.to_string(), FitStrategy::Placeholder));

        for (text, strategy) in candidates {
            let runs = self.parse(&text);
            match self.try_size(&runs, size) {
                Ok(Some(wrapped)) => {
                    let message = match strategy {
                        FitStrategy::Truncated(limit) => {
                            format!("Text fits after truncated to {limit} chars")
                        }
                        _ => "Text fits after replaced with error message".to_string(),
                    };
                    self.warn(message);
                    return Step::Accept {
                        size,
                        wrapped,
                        strategy,
                    };
                }
                Ok(None) => {}
                Err(e) => log::debug!("Truncation candidate failed: {e}"),
            }
        }

        self.warn("All fallback strategies failed".to_string());
        Step::Next(FitState::TerminalFallback {
            offending_word: None,
        })
    }

    fn terminal_fallback(&mut self, offending_word: Option<&str>) -> FitResult {
        let text = match offending_word {
            Some(word) => {
                let head: String = word.chars().take(10).collect();
                format!("Text too long: {head}...")
            }
            None => OVERFLOW_PLACEHOLDER.to_string(),
        };
        let size = self.request.floor_size();
        let runs = [StyledRun::plain(text)];

        match wrap(
            self.metrics,
            &runs,
            u32::MAX,
            size,
            self.request.line_height_ratio,
        ) {
            Ok(wrapped) => {
                self.warn(format!("Using fallback font size: {size}"));
                FitResult {
                    font_size: Some(size),
                    lines: wrapped.lines,
                    total_height: wrapped.total_height,
                    warnings: std::mem::take(&mut self.warnings),
                    strategy: FitStrategy::Fallback,
                }
            }
            Err(e) => {
                self.warn(format!("Fallback generation failed: {e}"));
                FitResult {
                    font_size: None,
                    lines: Vec::new(),
                    total_height: 0,
                    warnings: std::mem::take(&mut self.warnings),
                    strategy: FitStrategy::Fallback,
                }
            }
        }
    }

    /// Records a warning for every word still wider than the box.
    fn accept(mut self, size: u32, wrapped: Wrapped, strategy: FitStrategy) -> FitResult {
        let budget = self.width_budget();
        for fragment in wrapped.lines.iter().flat_map(|line| &line.fragments) {
            if fragment.is_whitespace() {
                continue;
            }
            let fragment_size = fragment.font_size.unwrap_or(size);
            if let Ok(width) = self
                .metrics
                .measure(&fragment.style, fragment_size, &fragment.text)
            {
                if width > budget {
                    self.warn(format!(
                        "Word '{}' ({width}px) exceeds container width ({budget}px) at font size {size}",
                        fragment.text
                    ));
                }
            }
        }

        log::trace!(
            "Accepted font size {size} ({strategy:?}) with {} line(s)",
            wrapped.lines.len()
        );
        FitResult {
            font_size: Some(size),
            lines: wrapped.lines,
            total_height: wrapped.total_height,
            warnings: self.warnings,
            strategy,
        }
    }
}

/// Longest whitespace-separated word by character count; the first wins ties.
fn longest_word(runs: &[StyledRun]) -> Option<String> {
    let mut longest: Option<&str> = None;
    for word in runs.iter().flat_map(|run| run.text.split_whitespace()) {
        if longest.is_none_or(|current| word.chars().count() > current.chars().count()) {
            longest = Some(word);
        }
    }
    longest.map(str::to_string)
}

/// `text` cut to `limit` characters plus `...`, or unchanged when short enough.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Splits a long word at its character midpoint with a hyphen.
pub fn hyphenate_word(word: &str) -> Option<String> {
    let count = word.chars().count();
    if count <= HYPHENATION_THRESHOLD {
        return None;
    }
    let (mid, _) = word.char_indices().nth(count / 2)?;
    Some(format!("{}- {}", &word[..mid], &word[mid..]))
}

/// Runs with every over-long word split, or `None` when nothing changed.
fn hyphenate_runs(runs: &[StyledRun]) -> Option<Vec<StyledRun>> {
    let mut changed = false;
    let hyphenated = runs
        .iter()
        .map(|run| {
            let text = run
                .text
                .split(' ')
                .map(|word| match hyphenate_word(word) {
                    Some(split) => {
                        changed = true;
                        split
                    }
                    None => word.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            StyledRun::new(text, run.style)
        })
        .collect();
    changed.then_some(hyphenated)
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BlockFonts;
    use crate::text::MetricsCache;
    use crate::text::wrap::line_height;

    fn fit(markup: &str, request: &FitRequest) -> FitResult {
        let mut fonts = BlockFonts::default();
        let mut cache = MetricsCache::new();
        let mut metrics = GlyphMetrics::new(&mut fonts, &mut cache);
        find_fitting_size(&mut metrics, markup, request)
    }

    #[test]
    fn picks_the_largest_fitting_size() {
        let request = FitRequest::new(180, 180, 30);
        let result = fit("Hello World", &request);
        assert_eq!(result.strategy, FitStrategy::Normal);
        assert_eq!(result.font_size, Some(30));
        assert_eq!(result.lines.len(), 1);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn descent_is_maximal() {
        let markup = "a fairly long sentence that must wrap over several lines of text";
        let request = FitRequest::new(120, 60, 40);
        let result = fit(markup, &request);
        let size = result.font_size.unwrap();
        assert_eq!(result.strategy, FitStrategy::Normal);
        assert!(result.total_height <= 60);

        // the next size up must overflow
        let mut fonts = BlockFonts::default();
        let mut cache = MetricsCache::new();
        let mut metrics = GlyphMetrics::new(&mut fonts, &mut cache);
        let runs = parser::parse(markup, Dialect::Tags);
        let bigger = wrap(&mut metrics, &runs, 120, size + 1, 1.2).unwrap();
        assert!(bigger.total_height > 60);
    }

    #[test]
    fn never_exceeds_max_size() {
        for max in [1, 4, 6, 12, 50] {
            let request = FitRequest::new(500, 500, max);
            let result = fit("tiny", &request);
            assert!(result.font_size.unwrap() <= max, "max {max}");
        }
    }

    #[test]
    fn empty_text_goes_to_terminal_fallback() {
        let request = FitRequest::new(100, 100, 20);
        let result = fit("   ", &request);
        assert_eq!(result.strategy, FitStrategy::Fallback);
        assert_eq!(result.font_size, Some(DEFAULT_MIN_FONT_SIZE));
        assert_eq!(result.lines[0].text(), OVERFLOW_PLACEHOLDER);
        assert_eq!(
            result.warnings,
            ["Empty text provided", "Using fallback font size: 6"]
        );
    }

    #[test]
    fn invalid_box_goes_to_terminal_fallback() {
        let request = FitRequest::new(0, 100, 20);
        let result = fit("hello", &request);
        assert_eq!(result.strategy, FitStrategy::Fallback);
        assert_eq!(result.warnings[0], "Invalid text box dimensions");
    }

    #[test]
    fn oversized_word_is_reported_and_replaced() {
        // 22 chars at size 6 are 66px wide
        let request = FitRequest::new(50, 200, 20);
        let result = fit("Supercalifragilisticex", &request);
        assert_eq!(result.strategy, FitStrategy::Fallback);
        assert_eq!(result.font_size, Some(6));
        assert_eq!(result.lines[0].text(), "Text too long: Supercalif...");
        assert_eq!(
            result.warnings[0],
            "Word 'Supercalifragilisticex' is too long to fit even at minimum font size"
        );
    }

    #[test]
    fn aggressive_scaling_goes_below_minimum() {
        // three lines at size 5 need 18px, at size 6 they need 24px
        let request = FitRequest::new(20, 18, 20);
        let result = fit("aa\nbb\ncc", &request);
        assert_eq!(result.strategy, FitStrategy::Aggressive);
        assert_eq!(result.font_size, Some(5));
        assert_eq!(
            result.warnings,
            [
                "Normal font scaling failed, trying aggressive scaling",
                "Text fits with aggressive scaling at font size 5",
            ]
        );
    }

    /// 100 words: no size from 10 down to 3 fits 40px wide boxes under 80px tall.
    fn truncation_ladder(height: i32) -> FitResult {
        let request = FitRequest::new(40, height, 10);
        fit(&"word ".repeat(100), &request)
    }

    #[test]
    fn truncation_stops_at_fifty_chars() {
        // 10 words and an ellipsis make 5 lines of 8px
        let result = truncation_ladder(40);
        assert_eq!(result.strategy, FitStrategy::Truncated(50));
        assert_eq!(result.font_size, Some(6));
        assert_eq!(result.lines.len(), 5);
        assert_eq!(result.lines[4].text(), "word word ...");
        assert_eq!(
            result.warnings,
            [
                "Normal font scaling failed, trying aggressive scaling",
                "All scaling methods failed, trying text truncation",
                "Text fits after truncated to 50 chars",
            ]
        );
    }

    #[test]
    fn truncation_stops_at_twenty_five_chars() {
        let result = truncation_ladder(24);
        assert_eq!(result.strategy, FitStrategy::Truncated(25));
        assert_eq!(result.lines.len(), 3);
        assert_eq!(result.lines[2].text(), "word ...");
        assert_eq!(
            result.warnings,
            [
                "Normal font scaling failed, trying aggressive scaling",
                "All scaling methods failed, trying text truncation",
                "Text fits after truncated to 25 chars",
            ]
        );
    }

    #[test]
    fn truncation_ends_with_the_placeholder() {
        let result = truncation_ladder(16);
        assert_eq!(result.strategy, FitStrategy::Placeholder);
        assert_eq!(result.font_size, Some(6));
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].text(), OVERFLOW_PLACEHOLDER);
        assert_eq!(
            result.warnings,
            [
                "Normal font scaling failed, trying aggressive scaling",
                "All scaling methods failed, trying text truncation",
                "Text fits after replaced with error message",
            ]
        );
    }

    #[test]
    fn nothing_fits_a_box_shorter_than_one_line() {
        let result = truncation_ladder(7);
        assert_eq!(result.strategy, FitStrategy::Fallback);
        assert_eq!(result.font_size, Some(6));
        assert_eq!(result.lines[0].text(), OVERFLOW_PLACEHOLDER);
        assert_eq!(
            result.warnings,
            [
                "Normal font scaling failed, trying aggressive scaling",
                "All scaling methods failed, trying text truncation",
                "All fallback strategies failed",
                "Using fallback font size: 6",
            ]
        );
    }

    #[test]
    fn hyphenation_packs_long_words_tighter() {
        let (a, b, c) = ("a".repeat(22), "b".repeat(22), "c".repeat(22));
        // whole words take a line each down to size 3 (12px); the halves
        // pack three and three at size 3 (8px)
        let request = FitRequest::new(66, 8, 10);
        let result = fit(&format!("{a} {b} {c}"), &request);

        assert_eq!(result.strategy, FitStrategy::Hyphenated);
        assert_eq!(result.font_size, Some(3));
        assert_eq!(result.lines.len(), 2);
        assert_eq!(
            result.lines[0].text(),
            format!("{}- {} {}-", &a[..11], &a[11..], &b[..11])
        );
        assert_eq!(
            result.warnings,
            [
                "Normal font scaling failed, trying aggressive scaling",
                "Aggressive scaling failed, trying word hyphenation",
                "Text fits after hyphenating long words at font size 3",
            ]
        );
    }

    #[test]
    fn huge_line_height_ratio_falls_back() {
        let mut request = FitRequest::new(100, 100, 10);
        request.line_height_ratio = 1.0e9;
        let result = fit("a\nb", &request);
        assert_eq!(result.strategy, FitStrategy::Fallback);
        assert_eq!(result.font_size, Some(6));
        assert_eq!(result.total_height, u32::MAX);
    }

    #[test]
    fn hyphenation_helpers() {
        assert_eq!(hyphenate_word("short"), None);
        assert_eq!(
            hyphenate_word("abcdefghijklmnopqrstuv").unwrap(),
            "abcdefghijk- lmnopqrstuv"
        );
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("ééé", 2), "éé...");
    }

    #[test]
    fn states_can_be_stepped_individually() {
        let mut fonts = BlockFonts::default();
        let mut cache = MetricsCache::new();
        let mut metrics = GlyphMetrics::new(&mut fonts, &mut cache);
        let request = FitRequest::new(100, 100, 20);
        let mut search = FitSearch::new(&mut metrics, "hello", &request);

        assert!(matches!(
            search.step(FitState::Validate),
            Step::Next(FitState::NormalDescent)
        ));
        match search.step(FitState::Truncation) {
            Step::Accept { strategy, size, .. } => {
                assert_eq!(strategy, FitStrategy::Truncated(100));
                assert_eq!(size, 6);
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(
            search.warnings(),
            [
                "All scaling methods failed, trying text truncation",
                "Text fits after truncated to 100 chars",
            ]
        );
    }

    #[test]
    fn missing_font_ends_without_a_size() {
        let mut fonts = BlockFonts::missing();
        let mut cache = MetricsCache::new();
        let mut metrics = GlyphMetrics::new(&mut fonts, &mut cache);
        let result = find_fitting_size(&mut metrics, "hello", &FitRequest::new(100, 100, 8));
        assert_eq!(result.font_size, None);
        assert!(result.lines.is_empty());
        assert!(
            result
                .warnings
                .last()
                .unwrap()
                .starts_with("Fallback generation failed")
        );
        assert!(result.warnings.iter().any(|w| w.starts_with("Error at font size 8")));
    }

    #[test]
    fn total_height_is_lines_times_line_height() {
        let request = FitRequest::new(60, 200, 20);
        let result = fit("one two three four five six", &request);
        let size = result.font_size.unwrap();
        assert_eq!(
            result.total_height,
            result.lines.len() as u32 * line_height(size, 1.2)
        );
    }
}
