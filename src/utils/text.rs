// Text utilities for the IPDraft PDF engine

/// Average glyph width as a fraction of the font size, tuned for the
/// Times family. Good enough for wrapping and centering; the layout
/// engine leaves slack through paragraph spacing.
const AVG_GLYPH_WIDTH_RATIO: f32 = 0.5;

/// Words per minute assumed when estimating reading time for legal prose.
const READING_WPM: usize = 225;

/// Estimate the rendered width of `text` at `font_size` points.
pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * AVG_GLYPH_WIDTH_RATIO
}

/// Word-wrap `text` to fit within `max_width` points at `font_size`.
/// A word wider than the full line is placed on its own line rather
/// than split mid-word. Always returns at least one line.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if estimate_text_width(&candidate, font_size) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
}

/// Title-case a phrase: capitalize the first letter of every word,
/// lowercasing the rest. Words already in all caps (acronyms, "USPTO")
/// are left alone.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            if word.chars().all(|c| !c.is_lowercase()) {
                return word.to_string();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Estimated reading time in whole minutes, never less than one.
pub fn estimate_reading_time(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    ((words + READING_WPM - 1) / READING_WPM).max(1) as u32
}

/// Lowercase roman numerals for page numbering (i, ii, iii, iv, ...).
pub fn to_roman(mut n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    const TABLE: [(u32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, numeral) in TABLE {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// Spreadsheet-style alphabetic numbering (a, b, ..., z, aa, ab, ...).
pub fn to_alpha(n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut n = n;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    out.iter().rev().collect()
}
