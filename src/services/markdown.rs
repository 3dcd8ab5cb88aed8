// Markdown parser for the IPDraft PDF engine
// Line-level classification plus inline emphasis segmentation.
// Parsing never fails: malformed input degrades to plain text.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::{HeadingInfo, InlineSegment, ListItem, ListKind};

static HEADING_REGEX: OnceLock<Regex> = OnceLock::new();
static HEADING_PARTS_REGEX: OnceLock<Regex> = OnceLock::new();
static UNORDERED_REGEX: OnceLock<Regex> = OnceLock::new();
static ORDERED_REGEX: OnceLock<Regex> = OnceLock::new();
static BLOCK_QUOTE_REGEX: OnceLock<Regex> = OnceLock::new();
static LINK_REGEX: OnceLock<Regex> = OnceLock::new();

fn heading_regex() -> &'static Regex {
    HEADING_REGEX.get_or_init(|| Regex::new(r"^\s*#{1,6} \S").unwrap())
}

fn heading_parts_regex() -> &'static Regex {
    HEADING_PARTS_REGEX.get_or_init(|| Regex::new(r"^\s*(#{1,6}) (.*)$").unwrap())
}

fn unordered_regex() -> &'static Regex {
    UNORDERED_REGEX.get_or_init(|| Regex::new(r"^(\s*)([-*+])\s+(\S.*)$").unwrap())
}

fn ordered_regex() -> &'static Regex {
    ORDERED_REGEX.get_or_init(|| Regex::new(r"^(\s*)(\d+)\.\s+(\S.*)$").unwrap())
}

fn block_quote_regex() -> &'static Regex {
    BLOCK_QUOTE_REGEX.get_or_init(|| Regex::new(r"^\s*>").unwrap())
}

fn link_regex() -> &'static Regex {
    LINK_REGEX.get_or_init(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").unwrap())
}

/// Is this line an ATX heading (1-6 hashes, a space, then text)?
/// Seven or more hashes is body text, not a heading.
pub fn is_heading(line: &str) -> bool {
    heading_regex().is_match(line)
}

/// Is this line a horizontal rule: at least three of the same character
/// from `-`, `_`, `*` and nothing else?
pub fn is_horizontal_rule(line: &str) -> bool {
    let trimmed: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if trimmed.len() < 3 {
        return false;
    }
    let first = trimmed.chars().next().unwrap();
    matches!(first, '-' | '_' | '*') && trimmed.chars().all(|c| c == first)
}

pub fn is_unordered_list_item(line: &str) -> bool {
    unordered_regex().is_match(line)
}

pub fn is_ordered_list_item(line: &str) -> bool {
    ordered_regex().is_match(line)
}

pub fn is_block_quote(line: &str) -> bool {
    block_quote_regex().is_match(line)
}

/// Extract heading level and text. The text keeps interior spacing but is
/// trimmed at both ends.
pub fn parse_heading(line: &str) -> Option<HeadingInfo> {
    if !is_heading(line) {
        return None;
    }
    let caps = heading_parts_regex().captures(line)?;
    Some(HeadingInfo {
        level: caps[1].len() as u8,
        text: caps[2].trim().to_string(),
        original_line: line.to_string(),
    })
}

/// Render size for a heading level: 16 pt for level 1, 14 pt for level 2,
/// body size for the rest.
pub fn heading_font_size(level: u8) -> f32 {
    match level {
        1 => 16.0,
        2 => 14.0,
        _ => 12.0,
    }
}

/// Levels 1-3 render bold; deeper levels render at body weight.
pub fn heading_is_bold(level: u8) -> bool {
    level <= 3
}

/// Extract a list item from a line. Every two leading spaces count as one
/// indent level.
pub fn parse_list_item(line: &str) -> Option<ListItem> {
    if let Some(caps) = unordered_regex().captures(line) {
        return Some(ListItem {
            kind: ListKind::Unordered,
            indent_level: caps[1].len() / 2,
            marker: caps[2].to_string(),
            text: caps[3].trim_end().to_string(),
        });
    }
    if let Some(caps) = ordered_regex().captures(line) {
        return Some(ListItem {
            kind: ListKind::Ordered,
            indent_level: caps[1].len() / 2,
            marker: format!("{}.", &caps[2]),
            text: caps[3].trim_end().to_string(),
        });
    }
    None
}

/// Strip the leading `>` (and one optional following space) from a
/// block-quote line.
pub fn parse_block_quote(line: &str) -> String {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix('>') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest).to_string(),
        None => line.to_string(),
    }
}

/// Replace every `[label](url)` with just `label`. Link targets are not
/// rendered in the PDF output.
pub fn extract_link_text(text: &str) -> String {
    link_regex().replace_all(text, "$1").to_string()
}

/// Split a line into styled segments. Recognized delimiters, greediest
/// first: `***`/`___` (bold italic), `**`/`__` (bold), `*`/`_` (italic).
/// The matcher is deliberately non-nested: the inner text of a styled run
/// is taken literally. An unclosed delimiter anywhere makes the whole
/// input a single plain segment.
pub fn parse_inline_formatting(text: &str) -> Vec<InlineSegment> {
    if text.is_empty() {
        return vec![InlineSegment::plain("")];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut segments: Vec<InlineSegment> = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '*' && c != '_' {
            plain.push(c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while run < 3 && i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let mut matched = false;
        for len in (1..=run).rev() {
            if let Some(close) = find_closing(&chars, i + len, c, len) {
                let inner: String = chars[i + len..close].iter().collect();
                if !plain.is_empty() {
                    segments.push(InlineSegment::plain(std::mem::take(&mut plain)));
                }
                let (bold, italic) = match len {
                    3 => (true, true),
                    2 => (true, false),
                    _ => (false, true),
                };
                segments.push(InlineSegment::styled(inner, bold, italic));
                i = close + len;
                matched = true;
                break;
            }
        }

        if !matched {
            // Unclosed delimiter: give back the input untouched.
            return vec![InlineSegment::plain(text)];
        }
    }

    if !plain.is_empty() || segments.is_empty() {
        segments.push(InlineSegment::plain(plain));
    }

    segments
}

/// Find the first closing run of exactly `len` copies of `delim` at or
/// after `from`, leaving at least one character of content.
fn find_closing(chars: &[char], from: usize, delim: char, len: usize) -> Option<usize> {
    let mut j = from;
    while j + len <= chars.len() {
        if chars[j..j + len].iter().all(|&ch| ch == delim) && j > from {
            return Some(j);
        }
        j += 1;
    }
    None
}

/// Remove all recognized emphasis delimiters from a line. Applied to a
/// fixpoint so that styled runs containing literal delimiters are fully
/// flattened. Unclosed delimiters are left in place.
pub fn strip_inline_formatting(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let stripped: String = parse_inline_formatting(&current)
            .into_iter()
            .map(|segment| segment.text)
            .collect();
        if stripped == current {
            return stripped;
        }
        current = stripped;
    }
}
