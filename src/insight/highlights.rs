use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: u32,
    pub quote: String,
    pub author_name: String,
}

/// Enumeration or bullet prefix: `1.`, `2)`, `３．`, `-`, `•`, `・`, ...
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s0-9０-９.．、)）\-－–—*•・●○◦▪]+").expect("Invalid list marker regex")
});

/// A quoted (or bare) span followed by a parenthesized attribution. Both
/// half-width and full-width glyphs are accepted.
static QUOTE_WITH_AUTHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:[「『"“]([^」』"”]+)[」』"”]|([^（(]+?))\s*[（(]\s*([^（）()]+?)\s*[)）]"#,
    )
    .expect("Invalid highlight regex")
});

/// Parses one highlight per line; lines without an attribution are skipped.
pub fn extract_highlights(section: &str) -> Vec<Highlight> {
    let mut highlights = Vec::new();

    for line in section.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let line = LIST_MARKER.replace(line, "");
        let Some(caps) = QUOTE_WITH_AUTHOR.captures(&line) else {
            continue;
        };

        let quote = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| clean_quote(m.as_str()))
            .unwrap_or_default();
        let author_name = caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        // a lone glyph is punctuation caught by the bare-span branch
        if quote.chars().count() <= 1 {
            continue;
        }

        highlights.push(Highlight {
            id: highlights.len() as u32 + 1,
            quote,
            author_name,
        });
    }
    highlights
}

fn clean_quote(raw: &str) -> String {
    const QUOTE_GLYPHS: &[char] = &[
        '*', '_', ':', '：', '-', '「', '」', '『', '』', '"', '“', '”', '\'', '‘', '’',
    ];
    raw.trim()
        .trim_matches(|c: char| c.is_whitespace() || QUOTE_GLYPHS.contains(&c))
        .to_string()
}
