//! Markup to styled runs.
//!
//! Hashtags are split out first and become bold hashtag runs; the remaining
//! segments are parsed with the selected dialect. Malformed markup never
//! fails: anything that does not form a complete construct stays literal.

use std::borrow::Cow;

use super::run::{RunStyle, StyledRun};

/// Markup dialect of the input text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Dialect {
    /// `<b>`, `<i>`, `<u>`, `<s>` with nesting.
    #[default]
    Tags,
    /// `**bold**`, `*italic*`, `__underline__`, `~~strike~~`, no nesting.
    Markdown,
    /// Markdown, with `# heading` lines turned bold.
    MarkdownHeaders,
    /// Markdown headers plus list bullets and inline code.
    MarkdownExtended,
}

impl Dialect {
    /// Parses `markup` in this dialect, hashtags included.
    pub fn parse(self, markup: &str) -> Vec<StyledRun> {
        parse(markup, self)
    }
}

/// Parses `markup` with hashtag detection enabled.
pub fn parse(markup: &str, dialect: Dialect) -> Vec<StyledRun> {
    parse_with_hashtags(markup, dialect, true)
}

/// Always returns at least one run; empty input yields one empty run.
pub fn parse_with_hashtags(markup: &str, dialect: Dialect, hashtags: bool) -> Vec<StyledRun> {
    let source: Cow<'_, str> = match dialect {
        Dialect::Tags | Dialect::Markdown => Cow::Borrowed(markup),
        Dialect::MarkdownHeaders => Cow::Owned(headers_to_bold(markup)),
        Dialect::MarkdownExtended => Cow::Owned(preprocess_extended(markup)),
    };

    let segments = if hashtags {
        split_hashtags(&source)
    } else {
        vec![(&*source, false)]
    };

    let mut runs = Vec::new();
    for (segment, is_hashtag) in segments {
        if is_hashtag {
            runs.push(StyledRun::new(segment, RunStyle::HASHTAG));
            continue;
        }
        match dialect {
            Dialect::Tags => parse_tags(segment, &mut runs),
            _ => parse_markdown(segment, RunStyle::default(), &mut runs),
        }
    }

    if runs.is_empty() {
        runs.push(StyledRun::plain(""));
    }
    runs
}

// ---------------------------------------------------------------------------
// hashtags

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Byte range of every `#word` in `text`, `#` included.
fn hashtag_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if ch != '#' {
            continue;
        }
        let mut end = start + 1;
        while let Some(&(idx, next)) = chars.peek() {
            if !is_word_char(next) {
                break;
            }
            end = idx + next.len_utf8();
            chars.next();
        }
        if end > start + 1 {
            ranges.push((start, end));
        }
    }

    ranges
}

fn split_hashtags(text: &str) -> Vec<(&str, bool)> {
    let mut segments = Vec::new();
    let mut last = 0;

    for (start, end) in hashtag_ranges(text) {
        if start > last {
            segments.push((&text[last..start], false));
        }
        segments.push((&text[start..end], true));
        last = end;
    }
    if last < text.len() || segments.is_empty() {
        segments.push((&text[last..], false));
    }

    segments
}

/// Hashtag bodies in order of appearance, without the `#`.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    hashtag_ranges(text)
        .into_iter()
        .map(|(start, end)| text[start + 1..end].to_string())
        .collect()
}

/// Whether `text` contains at least one `#word`.
pub fn has_hashtags(text: &str) -> bool {
    !hashtag_ranges(text).is_empty()
}

/// Number of `#word` occurrences in `text`, duplicates included.
pub fn count_hashtags(text: &str) -> usize {
    hashtag_ranges(text).len()
}

// ---------------------------------------------------------------------------
// tags

/// Matches `<b>`, `</b>` and friends at the start of `text`.
fn match_tag(text: &str) -> Option<(bool, u8, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let (closing, at) = match bytes.get(1) {
        Some(b'/') => (true, 2),
        _ => (false, 1),
    };
    let tag = *bytes.get(at)?;
    if !matches!(tag, b'b' | b'i' | b'u' | b's') || bytes.get(at + 1) != Some(&b'>') {
        return None;
    }
    Some((closing, tag, at + 2))
}

fn parse_tags(text: &str, runs: &mut Vec<StyledRun>) {
    let mut style = RunStyle::default();
    let mut stack: Vec<RunStyle> = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while let Some(rel) = text[pos..].find('<') {
        let at = pos + rel;
        let Some((closing, tag, len)) = match_tag(&text[at..]) else {
            pos = at + 1;
            continue;
        };

        if at > literal_start {
            runs.push(StyledRun::new(&text[literal_start..at], style));
        }

        if closing {
            // unmatched closers are dropped without touching the style
            if let Some(previous) = stack.pop() {
                style = previous;
            }
        } else {
            stack.push(style);
            match tag {
                b'b' => style.bold = true,
                b'i' => style.italic = true,
                b'u' => style.underline = true,
                _ => style.strikethrough = true,
            }
        }

        pos = at + len;
        literal_start = pos;
    }

    if literal_start < text.len() {
        runs.push(StyledRun::new(&text[literal_start..], style));
    }
}

// ---------------------------------------------------------------------------
// markdown

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
}

#[derive(Clone, Copy, Debug)]
struct Span {
    start: usize,
    end: usize,
    content: (usize, usize),
    mark: Mark,
}

/// `delim content delim` with the first closing delimiter on the same line.
fn delimited_spans(text: &str, delim: &str, mark: Mark) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(rel) = text[from..].find(delim) {
        let start = from + rel;
        let content_start = start + delim.len();
        match text[content_start..].find(delim) {
            Some(len) if !text[content_start..content_start + len].contains('\n') => {
                let end = content_start + len + delim.len();
                spans.push(Span {
                    start,
                    end,
                    content: (content_start, content_start + len),
                    mark,
                });
                from = end;
            }
            _ => from = start + 1,
        }
    }

    spans
}

/// A lone `*` pair with no `*` adjacent to either delimiter.
fn italic_spans(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let opens = bytes[i] == b'*'
            && (i == 0 || bytes[i - 1] != b'*')
            && bytes.get(i + 1).is_some_and(|&b| b != b'*');
        if opens {
            if let Some(rel) = text[i + 1..].find('*') {
                let close = i + 1 + rel;
                if bytes.get(close + 1) != Some(&b'*') {
                    spans.push(Span {
                        start: i,
                        end: close + 1,
                        content: (i + 1, close),
                        mark: Mark::Italic,
                    });
                    i = close + 1;
                    continue;
                }
            }
        }
        i += 1;
    }

    spans
}

fn parse_markdown(text: &str, base: RunStyle, runs: &mut Vec<StyledRun>) {
    let mut spans = delimited_spans(text, "**", Mark::Bold);
    spans.extend(italic_spans(text));
    spans.extend(delimited_spans(text, "__", Mark::Underline));
    spans.extend(delimited_spans(text, "~~", Mark::Strike));
    // stable: at equal starts the earlier pattern wins
    spans.sort_by_key(|span| span.start);

    let mut cursor = 0;
    for span in spans {
        if span.start < cursor {
            continue;
        }
        if span.start > cursor {
            runs.push(StyledRun::new(&text[cursor..span.start], base));
        }

        let (from, to) = span.content;
        if to > from {
            let mut style = base;
            match span.mark {
                Mark::Bold => style.bold = true,
                Mark::Italic => style.italic = true,
                Mark::Underline => style.underline = true,
                Mark::Strike => style.strikethrough = true,
            }
            runs.push(StyledRun::new(&text[from..to], style));
        }
        cursor = span.end;
    }

    if cursor < text.len() {
        runs.push(StyledRun::new(&text[cursor..], base));
    }
}

// ---------------------------------------------------------------------------
// line preprocessing

/// Content of a `# heading` line, which must already be trimmed.
fn header_content(line: &str) -> Option<&str> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let content = rest.trim_start();
    (!content.is_empty()).then_some(content)
}

/// Content of a `- item`, `* item` or `1. item` line, which must already be trimmed.
fn list_content(line: &str) -> Option<&str> {
    let rest = if let Some(rest) = line.strip_prefix(['-', '*']) {
        rest
    } else {
        let digits = line.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        line[digits..].strip_prefix('.')?
    };
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let content = rest.trim_start();
    (!content.is_empty()).then_some(content)
}

/// `` `code` `` becomes `**code**`. Empty backtick pairs stay literal.
fn inline_code_to_bold(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut rest = line;

    while let Some(open) = rest.find('`') {
        let after = &rest[open + 1..];
        match after.find('`') {
            Some(close) if close > 0 => {
                out.push_str(&rest[..open]);
                out.push_str("**");
                out.push_str(&after[..close]);
                out.push_str("**");
                rest = &after[close + 1..];
            }
            _ => {
                out.push_str(&rest[..open + 1]);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn headers_to_bold(text: &str) -> String {
    text.split('\n')
        .map(|line| match header_content(line.trim()) {
            Some(content) => format!("**{content}**"),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn preprocess_extended(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let line = line.trim();
            if line.is_empty() {
                String::new()
            } else if let Some(content) = header_content(line) {
                format!("**{content}**")
            } else if let Some(content) = list_content(line) {
                format!("• {}", inline_code_to_bold(content))
            } else {
                inline_code_to_bold(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
