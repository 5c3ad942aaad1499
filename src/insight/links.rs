use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLink {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub url: String,
}

/// `http(s)://` followed by ASCII URL characters, so text written straight
/// after the URL (common with CJK descriptions) is not swallowed.
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://[A-Za-z0-9\-._~:/?#@!$&'*+,;=%]+").expect("Invalid URL regex pattern")
});

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[\r\n]+\s*").expect("Invalid line break regex"));

/// Marker of the next list item that bled into this span, e.g. `... 2.`.
static TRAILING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(?:[0-9０-９]+[.．、)）]|[-*•・])$").expect("Invalid trailing marker regex")
});

static LEADING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s\-*•・:：]+").expect("Invalid leading marker regex"));

/// Punctuation that usually ends a sentence rather than the URL itself.
const URL_TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\''];

const PARENTHESES: &[char] = &['(', ')', '（', '）'];

/// Title delimiters, earliest occurrence wins.
const TITLE_DELIMITERS: &[char] = &['：', '・', '。'];

/// Collects every URL in the section; the text up to the next URL is its
/// description.
pub fn extract_links(section: &str) -> Vec<ReferenceLink> {
    let matches: Vec<_> = URL_REGEX.find_iter(section).collect();
    let mut links = Vec::with_capacity(matches.len());

    for (i, m) in matches.iter().enumerate() {
        let url = m.as_str().trim_end_matches(URL_TRAILING_PUNCTUATION);
        if url.is_empty() {
            continue;
        }
        let span_end = matches.get(i + 1).map_or(section.len(), |next| next.start());
        let description = clean_description(&section[m.end()..span_end]);
        let title = split_title(&description);

        links.push(ReferenceLink {
            id: links.len() as u32 + 1,
            title,
            description,
            url: url.to_string(),
        });
    }
    links
}

fn clean_description(span: &str) -> String {
    let flat = LINE_BREAKS.replace_all(span, " ");
    let flat = flat.trim();
    let flat = TRAILING_MARKER.replace(flat, "");
    let flat = LEADING_MARKER.replace(&flat, "");
    flat.trim_matches(|c: char| c.is_whitespace() || PARENTHESES.contains(&c))
        .to_string()
}

fn split_title(description: &str) -> String {
    match description.find(TITLE_DELIMITERS) {
        Some(pos) if pos > 0 => description[..pos].trim().to_string(),
        _ => description.to_string(),
    }
}
