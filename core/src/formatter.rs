//! Composition text formatter
//!
//! Turns raw model output into lightly marked-up text:
//!
//! 1. `*` and `#` are removed (stray markdown emphasis/heading markers).
//! 2. `&`, `<` and `>` are escaped, so the only markup in the output is
//!    the `<strong>` tags added here.
//! 3. Each line is checked for a timing entry (`0:00-0:15 (Intro)`), whose
//!    timestamp and label are wrapped in `<strong>`. Any other line with a
//!    label before its first colon (`Mood: Calm`) gets `Mood:` wrapped.
//!
//! Timing lines are matched first: the timestamp's own colon must not be
//! mistaken for a label separator.

use std::sync::OnceLock;

use regex::Regex;

/// Opening emphasis tag emitted by the formatter.
pub const STRONG_OPEN: &str = "<strong>";
/// Closing emphasis tag emitted by the formatter.
pub const STRONG_CLOSE: &str = "</strong>";

/// `H:MM-H:MM (label)` with optional spaces around the dash.
const TIMING_PATTERN: &str =
    r"^([ \t]*)(\d{1,2}:\d{2}[ \t]*-[ \t]*\d{1,2}:\d{2}[ \t]*\(.+\))";

/// Everything before the first colon on a line, plus the colon.
const LABEL_PATTERN: &str = r"^([^:\r\n]+:)";

fn timing_regex() -> &'static Regex {
    static TIMING_REGEX: OnceLock<Regex> = OnceLock::new();
    TIMING_REGEX.get_or_init(|| Regex::new(TIMING_PATTERN).expect("invalid timing pattern"))
}

fn label_regex() -> &'static Regex {
    static LABEL_REGEX: OnceLock<Regex> = OnceLock::new();
    LABEL_REGEX.get_or_init(|| Regex::new(LABEL_PATTERN).expect("invalid label pattern"))
}

/// Formats raw model output for display.
///
/// See the module docs for the exact rules. The result only contains
/// `<strong>` tags and escaped text.
pub fn format_composition(raw: &str) -> String {
    let cleaned = escape_markup(&strip_markers(raw));
    cleaned
        .split('\n')
        .map(format_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes every `*` and `#`.
pub fn strip_markers(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '*' | '#')).collect()
}

/// Escapes the characters that would otherwise be read as markup.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverses [`escape_markup`].
pub fn unescape_markup(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn format_line(line: &str) -> String {
    if let Some((indent, span)) = timing_regex()
        .captures(line)
        .and_then(|caps| Some((caps.get(1)?, caps.get(2)?)))
    {
        return format!(
            "{}{STRONG_OPEN}{}{STRONG_CLOSE}{}",
            indent.as_str(),
            span.as_str(),
            &line[span.end()..]
        );
    }

    if let Some(label) = label_regex().find(line) {
        return format!(
            "{STRONG_OPEN}{}{STRONG_CLOSE}{}",
            label.as_str(),
            &line[label.end()..]
        );
    }

    line.to_string()
}

/// A run of formatted text with uniform emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Unescaped display text
    pub text: String,
    /// Whether the run was inside `<strong>`
    pub strong: bool,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            strong: false,
        }
    }

    pub fn strong(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            strong: true,
        }
    }
}

/// Splits formatter output into plain and strong runs.
///
/// Entities are unescaped, so the segments hold display text. Empty runs
/// are dropped. An unterminated `<strong>` extends to the end of the input.
pub fn markup_segments(markup: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = markup;

    while !rest.is_empty() {
        let Some(open) = rest.find(STRONG_OPEN) else {
            push_segment(&mut segments, rest, false);
            break;
        };
        push_segment(&mut segments, &rest[..open], false);
        rest = &rest[open + STRONG_OPEN.len()..];

        match rest.find(STRONG_CLOSE) {
            Some(close) => {
                push_segment(&mut segments, &rest[..close], true);
                rest = &rest[close + STRONG_CLOSE.len()..];
            }
            None => {
                push_segment(&mut segments, rest, true);
                break;
            }
        }
    }

    segments
}

fn push_segment(segments: &mut Vec<Segment>, text: &str, strong: bool) {
    if !text.is_empty() {
        segments.push(Segment {
            text: unescape_markup(text),
            strong,
        });
    }
}
