//! Best-effort parsing of the summarizer's free-form answer.
//!
//! The summarizer writes three loosely marked sections (summary, highlights,
//! references) in whatever language the discussion ran in. A header is a line
//! that is little more than a section keyword, ignoring case, brackets and
//! punctuation; bracketed or markdown-marked lines may add a short subtitle.
//! Everything here is total: missing structure yields empty fields, never an
//! error.

pub mod highlights;
pub mod links;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub use highlights::{extract_highlights, Highlight};
pub use links::{extract_links, ReferenceLink};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightSummary {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightDocument {
    pub summary: InsightSummary,
    pub highlights: Vec<Highlight>,
    pub reference_links: Vec<ReferenceLink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Summary,
    Highlights,
    References,
}

const SECTION_KEYWORDS: &[(&str, SectionKind)] = &[
    ("サマリ", SectionKind::Summary),
    ("要約", SectionKind::Summary),
    ("概要", SectionKind::Summary),
    ("总结", SectionKind::Summary),
    ("summary", SectionKind::Summary),
    ("tómtắt", SectionKind::Summary),
    ("ハイライト", SectionKind::Highlights),
    ("要点", SectionKind::Highlights),
    ("highlight", SectionKind::Highlights),
    ("nổibật", SectionKind::Highlights),
    ("参考", SectionKind::References),
    ("参照", SectionKind::References),
    ("出典", SectionKind::References),
    ("reference", SectionKind::References),
    ("thamkhảo", SectionKind::References),
];

/// Alphanumerics allowed around the keyword on a bare line ("Highlights", "参考文献").
const MAX_BARE_EXTRA: usize = 4;
/// Same, for lines opened by a header marker ("## Summary of the call").
const MAX_MARKED_EXTRA: usize = 12;

/// Leading glyphs that mark a line as intended to be a header.
const HEADER_OPENERS: &[char] = &['【', '[', '［', '〔', '《', '#', '*', '■', '◆', '●'];

static HEADER_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostFirst)
        .build(SECTION_KEYWORDS.iter().map(|(k, _)| *k))
        .expect("section keywords are valid patterns")
});

/// Header glyphs that are tolerated around a section title.
const HEADER_DECORATION: &[char] = &[
    '【', '】', '[', ']', '［', '］', '〔', '〕', '《', '》', '(', ')', '（', '）', '#', '*', ':',
    '：', '■', '◆', '●', '-', '=',
];

/// A located section header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    kind: SectionKind,
    /// Byte offset of the header line start.
    start: usize,
    /// Byte offset just past the header line (after its newline, if any).
    body_start: usize,
    title: String,
}

/// Parses a summarizer answer into an [`InsightDocument`].
pub fn extract_insight(text: &str) -> InsightDocument {
    let headers = locate_headers(text);

    let section = |kind: SectionKind| -> Option<(&Header, &str)> {
        let header = headers.iter().find(|h| h.kind == kind)?;
        let end = headers
            .iter()
            .map(|h| h.start)
            .filter(|start| *start > header.start)
            .min()
            .unwrap_or(text.len());
        Some((header, &text[header.body_start..end]))
    };

    let summary = section(SectionKind::Summary)
        .map(|(header, body)| InsightSummary {
            title: header.title.clone(),
            content: body.trim().to_string(),
        })
        .unwrap_or_default();
    let highlights = section(SectionKind::Highlights)
        .map(|(_, body)| extract_highlights(body))
        .unwrap_or_default();
    let reference_links = section(SectionKind::References)
        .map(|(_, body)| extract_links(body))
        .unwrap_or_default();

    InsightDocument {
        summary,
        highlights,
        reference_links,
    }
}

/// First header line of each kind, in document order.
fn locate_headers(text: &str) -> Vec<Header> {
    let mut headers: Vec<Header> = Vec::with_capacity(3);
    let mut offset = 0;

    for raw_line in text.split_inclusive('\n') {
        let start = offset;
        offset += raw_line.len();

        let Some(kind) = classify_header(raw_line) else {
            continue;
        };
        if headers.iter().any(|h| h.kind == kind) {
            continue;
        }
        headers.push(Header {
            kind,
            start,
            body_start: offset,
            title: header_title(raw_line),
        });
    }
    headers
}

fn classify_header(line: &str) -> Option<SectionKind> {
    let normalized: String = line
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    let found = HEADER_MATCHER.find(&normalized)?;

    let extra = normalized[..found.start()].chars().count()
        + normalized[found.end()..].chars().count();
    let allowed = if line.trim_start().starts_with(HEADER_OPENERS) {
        MAX_MARKED_EXTRA
    } else {
        MAX_BARE_EXTRA
    };
    (extra <= allowed).then(|| SECTION_KEYWORDS[found.pattern().as_usize()].1)
}

fn header_title(line: &str) -> String {
    line.trim()
        .trim_matches(|c: char| c.is_whitespace() || HEADER_DECORATION.contains(&c))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_all_three_sections() {
        let text = "【サマリ】\nGrowth plan.\n\n【ハイライト】\n1. 「Focus on customers」（CEO）\n\n【参考】\nhttps://example.com 説明文";
        let doc = extract_insight(text);

        assert_eq!(doc.summary.title, "サマリ");
        assert_eq!(doc.summary.content, "Growth plan.");
        assert_eq!(
            doc.highlights,
            vec![Highlight {
                id: 1,
                quote: "Focus on customers".to_string(),
                author_name: "CEO".to_string(),
            }]
        );
        assert_eq!(
            doc.reference_links,
            vec![ReferenceLink {
                id: 1,
                title: "説明文".to_string(),
                description: "説明文".to_string(),
                url: "https://example.com".to_string(),
            }]
        );
    }

    #[test]
    fn sections_in_any_order_after_preamble() {
        let text = "Here is the wrap-up of today's debate.\n\
                    ## References\n\
                    - https://a.example/x Source A\n\
                    ## Summary\n\
                    Ship the MVP first.\n\
                    ## Highlights\n\
                    - \"Talk to users weekly\" (Biz Dev)\n";
        let doc = extract_insight(text);

        assert_eq!(doc.summary.title, "Summary");
        assert_eq!(doc.summary.content, "Ship the MVP first.");
        assert_eq!(doc.highlights.len(), 1);
        assert_eq!(doc.highlights[0].author_name, "Biz Dev");
        assert_eq!(doc.reference_links.len(), 1);
        assert_eq!(doc.reference_links[0].url, "https://a.example/x");
        assert_eq!(doc.reference_links[0].title, "Source A");
    }

    #[test]
    fn highlights_only_leaves_other_fields_empty() {
        let text = "[Highlights]\n1. 「まず顧客」（CEO）\n2. 「技術負債を返す」（Tech Lead）\n";
        let doc = extract_insight(text);

        assert_eq!(doc.summary, InsightSummary::default());
        assert!(doc.reference_links.is_empty());
        assert_eq!(doc.highlights.len(), 2);
        assert_eq!(doc.highlights[1].id, 2);
        assert_eq!(doc.highlights[1].quote, "技術負債を返す");
    }

    #[test]
    fn headers_match_case_and_punctuation_insensitively() {
        let text = "**SUMMARY:**\nkeep costs flat\nTóm tắt khác\nignored\n";
        let doc = extract_insight(text);
        // only the first summary header counts; the later one is body text
        assert_eq!(doc.summary.content, "keep costs flat\nTóm tắt khác\nignored");
    }

    #[test]
    fn prose_mentioning_a_keyword_is_not_a_header() {
        let text = "This summary is long enough that it clearly belongs to the body of the answer.\n";
        assert_eq!(extract_insight(text), InsightDocument::default());
    }

    #[test]
    fn body_line_starting_with_a_keyword_stays_in_its_section() {
        let text = "【サマリ】\n参考までに、コスト削減が最優先。\n\n【ハイライト】\n1. 「Focus on customers」（CEO）\n\n【参考】\nhttps://example.com 説明文";
        let doc = extract_insight(text);

        assert_eq!(doc.summary.content, "参考までに、コスト削減が最優先。");
        assert_eq!(doc.highlights.len(), 1);
        assert_eq!(doc.reference_links.len(), 1);
        assert_eq!(doc.reference_links[0].url, "https://example.com");
    }

    #[test]
    fn quote_mentioning_a_keyword_is_not_a_header() {
        let text = "【ハイライト】\n1. 「要約より行動」（CEO）\n2. 「顧客第一」（Biz Dev）\n\n【サマリ】\nGrowth plan.";
        let doc = extract_insight(text);

        assert_eq!(doc.summary.title, "サマリ");
        assert_eq!(doc.summary.content, "Growth plan.");
        assert_eq!(doc.highlights.len(), 2);
        assert_eq!(doc.highlights[0].quote, "要約より行動");
        assert_eq!(doc.highlights[1].author_name, "Biz Dev");
    }

    #[test]
    fn classifies_bare_and_marked_headers() {
        assert_eq!(classify_header("参考文献\n"), Some(SectionKind::References));
        assert_eq!(classify_header("Key Highlights"), Some(SectionKind::Highlights));
        assert_eq!(classify_header("## Summary of the call"), Some(SectionKind::Summary));
        assert_eq!(classify_header("Summary of the whole call"), None);
        assert_eq!(classify_header("要約すると、まず顧客。"), None);
    }

    #[test]
    fn unstructured_text_yields_empty_document() {
        assert_eq!(extract_insight(""), InsightDocument::default());
        assert_eq!(extract_insight("just a sentence"), InsightDocument::default());
    }

    #[test]
    fn document_serializes_with_expected_keys() {
        let doc = extract_insight("【サマリ】\nok");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "summary": {"title": "サマリ", "content": "ok"},
                "highlights": [],
                "reference_links": []
            })
        );
    }
}
