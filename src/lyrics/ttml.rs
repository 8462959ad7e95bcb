//! TTML (timed text) parser
//!
//! Apple Music serves lyrics as TTML with a handful of vendor namespaces:
//!
//! ```text
//! <tt xmlns="http://www.w3.org/ns/ttml" xmlns:itunes="..." itunes:timing="Word">
//!   <body><div>
//!     <p begin="00:12.340" ttm:agent="v1">
//!       <span begin="00:12.340">Hel</span><span begin="00:12.800">lo</span>
//!     </p>
//!   </div></body>
//! </tt>
//! ```
//!
//! Namespace declarations and the known prefixes are stripped before parsing,
//! so lookups below work on bare local names.

use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};

use super::LyricsError;

/// `begin` value used for paragraphs that carry no timing.
pub const DEFAULT_BEGIN: &str = "00:00.000";

/// Prefixes removed from element and attribute names.
const KNOWN_PREFIXES: &[&str] = &["itunes", "ttm", "tts", "amll"];

static XMLNS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+xmlns(?::[\w.-]+)?\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap()
});

static PREFIXED_NAME: Lazy<Regex> = Lazy::new(|| {
    let alternatives = KNOWN_PREFIXES.join("|");
    Regex::new(&format!(r"(</?|\s)(?:{alternatives}):([A-Za-z_])")).unwrap()
});

/// A single `<span>` directly inside a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsSpan {
    /// Raw `begin` attribute, if the span carries one (possibly empty).
    pub start_time: Option<String>,
    /// All text inside the span, nested markup ignored.
    pub text: String,
}

/// A `<p>` element: one lyric line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsParagraph {
    /// Raw `begin` attribute, [`DEFAULT_BEGIN`] when absent.
    pub start_time: String,
    pub agent: Option<String>,
    pub spans: Vec<LyricsSpan>,
    /// All text inside the paragraph, untrimmed.
    pub raw_text: String,
}

impl LyricsParagraph {
    /// True when at least one span carries its own timing.
    pub fn is_syllable_timed(&self) -> bool {
        self.spans.iter().any(|s| s.start_time.is_some())
    }
}

/// Remove namespace declarations and known prefixes from a TTML document.
pub fn strip_namespaces(raw: &str) -> String {
    let without_decls = XMLNS_DECL.replace_all(raw, "");
    PREFIXED_NAME
        .replace_all(&without_decls, "${1}${2}")
        .into_owned()
}

/// Parse a TTML document into its paragraphs, in document order.
///
/// Paragraphs are found anywhere in the tree, not only under `body/div`.
pub fn parse(raw: &str) -> Result<Vec<LyricsParagraph>, LyricsError> {
    let cleaned = strip_namespaces(raw);
    let doc = Document::parse(&cleaned)?;

    let paragraphs = doc
        .descendants()
        .filter(|n| is_element(n, "p"))
        .map(|p| LyricsParagraph {
            start_time: p.attribute("begin").unwrap_or(DEFAULT_BEGIN).to_string(),
            agent: p
                .attribute("agent")
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            spans: p
                .children()
                .filter(|c| is_element(c, "span"))
                .map(|s| LyricsSpan {
                    start_time: s.attribute("begin").map(str::to_string),
                    text: inner_text(s),
                })
                .collect(),
            raw_text: inner_text(p),
        })
        .collect();

    Ok(paragraphs)
}

fn is_element(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn inner_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYLLABLE_TTML: &str = r#"<tt xmlns="http://www.w3.org/ns/ttml" xmlns:itunes="http://music.apple.com/lyric-ttml-internal" xmlns:ttm="http://www.w3.org/ns/ttml#metadata" itunes:timing="Word" xml:lang="en">
<head><metadata><ttm:agent type="person" xml:id="v1"/></metadata></head>
<body dur="00:03:10.000"><div begin="00:12.340" end="00:20.000">
<p begin="00:12.340" end="00:14.000" ttm:agent="v1"><span begin="00:12.340" end="00:12.800">Hel</span><span begin="00:12.800" end="00:13.100">lo</span> <span>there</span></p>
<p begin="00:15.000" end="00:16.000">Plain line</p>
</div></body></tt>"#;

    #[test]
    fn test_strip_namespaces() {
        let cleaned = strip_namespaces(
            r#"<tt xmlns="a" xmlns:ttm='b' itunes:timing="Word"><ttm:agent/></tt>"#,
        );
        assert_eq!(cleaned, r#"<tt timing="Word"><agent/></tt>"#);
    }

    #[test]
    fn test_parse_paragraphs_and_spans() {
        let paragraphs = parse(SYLLABLE_TTML).unwrap();
        assert_eq!(paragraphs.len(), 2);

        let first = &paragraphs[0];
        assert_eq!(first.start_time, "00:12.340");
        assert_eq!(first.agent.as_deref(), Some("v1"));
        assert_eq!(first.spans.len(), 3);
        assert_eq!(first.spans[0].start_time.as_deref(), Some("00:12.340"));
        assert_eq!(first.spans[0].text, "Hel");
        assert_eq!(first.spans[2].start_time, None);
        assert_eq!(first.raw_text, "Hello there");
        assert!(first.is_syllable_timed());

        let second = &paragraphs[1];
        assert_eq!(second.agent, None);
        assert!(second.spans.is_empty());
        assert_eq!(second.raw_text, "Plain line");
        assert!(!second.is_syllable_timed());
    }

    #[test]
    fn test_missing_begin_defaults() {
        let paragraphs = parse("<tt><p>Untimed</p></tt>").unwrap();
        assert_eq!(paragraphs[0].start_time, DEFAULT_BEGIN);
        assert_eq!(
            crate::lyrics::timestamp::normalize(&paragraphs[0].start_time),
            "00:00.00"
        );
    }

    #[test]
    fn test_paragraphs_found_at_any_depth() {
        let doc = r#"<tt><p begin="00:01.000">a</p><body><section><div><p begin="00:02.000">b</p></div></section></body></tt>"#;
        let starts: Vec<_> = parse(doc)
            .unwrap()
            .into_iter()
            .map(|p| p.start_time)
            .collect();
        assert_eq!(starts, vec!["00:01.000", "00:02.000"]);
    }

    #[test]
    fn test_nested_span_text_is_flattened() {
        let doc = r#"<tt><p begin="1:00.0"><span begin="1:00.0">a<span>b</span></span></p></tt>"#;
        let paragraphs = parse(doc).unwrap();
        assert_eq!(paragraphs[0].spans.len(), 1);
        assert_eq!(paragraphs[0].spans[0].text, "ab");
    }

    #[test]
    fn test_malformed_markup_is_parse_error() {
        let err = parse("<tt><p begin=\"00:01.000\">oops</tt>").unwrap_err();
        assert!(matches!(err, LyricsError::Parse(_)));
    }
}
