//! LRC line builder
//!
//! Turns parsed TTML paragraphs into LRC lines:
//!
//! ```text
//! [00:12.34]v1: <00:12.34>Hel<00:12.80>lo
//! [00:15.00]Plain line
//! ```

use super::ttml::LyricsParagraph;
use super::{LyricsError, Tier, timestamp};

/// Rendered lyrics, ready to be written below an LRC header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsDocument {
    body: Vec<String>,
    is_karaoke: bool,
    tier: Tier,
}

impl LyricsDocument {
    /// Render paragraphs into LRC lines.
    ///
    /// Fails with [`LyricsError::Empty`] when no paragraph produced a line.
    pub fn build(paragraphs: &[LyricsParagraph], tier: Tier) -> Result<Self, LyricsError> {
        let mut body = Vec::with_capacity(paragraphs.len());
        let mut is_karaoke = false;

        for p in paragraphs {
            let line_time = timestamp::normalize(&p.start_time);
            let prefix = p
                .agent
                .as_deref()
                .map(|a| format!("{a}: "))
                .unwrap_or_default();

            // Untimed spans in a timed line are emitted bare and keep no timing of their own.
            let content = if p.is_syllable_timed() {
                is_karaoke = true;
                render_syllables(p)
            } else {
                let text = p.raw_text.trim();
                if text.is_empty() {
                    // Instrumental break.
                    continue;
                }
                text.to_string()
            };

            body.push(format!("[{line_time}]{prefix}{content}"));
        }

        if body.is_empty() {
            return Err(LyricsError::Empty);
        }

        Ok(Self {
            body,
            is_karaoke,
            tier,
        })
    }

    pub fn lines(&self) -> &[String] {
        &self.body
    }

    /// Lines joined with `\n`, no trailing newline.
    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }

    pub fn is_karaoke(&self) -> bool {
        self.is_karaoke
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

fn render_syllables(p: &LyricsParagraph) -> String {
    let mut out = String::new();
    for span in &p.spans {
        match span.start_time.as_deref() {
            Some(begin) if !begin.is_empty() => {
                out.push('<');
                out.push_str(&timestamp::normalize(begin));
                out.push('>');
                out.push_str(&span.text);
            }
            _ => out.push_str(&span.text),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::ttml::LyricsSpan;

    fn paragraph(begin: &str, text: &str) -> LyricsParagraph {
        LyricsParagraph {
            start_time: begin.to_string(),
            agent: None,
            spans: Vec::new(),
            raw_text: text.to_string(),
        }
    }

    fn span(begin: Option<&str>, text: &str) -> LyricsSpan {
        LyricsSpan {
            start_time: begin.map(str::to_string),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_plain_lines() {
        let doc = LyricsDocument::build(
            &[
                paragraph("00:01.000", "  Hello  "),
                paragraph("00:00:04.250", "World"),
            ],
            Tier::Standard,
        )
        .unwrap();

        assert_eq!(doc.lines(), ["[00:01.00]Hello", "[00:04.25]World"]);
        assert_eq!(doc.body_text(), "[00:01.00]Hello\n[00:04.25]World");
        assert!(!doc.is_karaoke());
        assert_eq!(doc.tier(), Tier::Standard);
    }

    #[test]
    fn test_agent_prefix() {
        let mut p = paragraph("00:02.000", "Line");
        p.agent = Some("v2".to_string());
        let doc = LyricsDocument::build(&[p], Tier::Standard).unwrap();
        assert_eq!(doc.lines(), ["[00:02.00]v2: Line"]);
    }

    #[test]
    fn test_untimed_spans_are_not_karaoke() {
        let mut p = paragraph("00:03.000", "ab");
        p.spans = vec![span(None, "a"), span(None, "b")];
        let doc = LyricsDocument::build(&[p], Tier::Standard).unwrap();
        assert!(!doc.is_karaoke());
        assert_eq!(doc.lines(), ["[00:03.00]ab"]);
    }

    #[test]
    fn test_one_timed_span_switches_line_to_karaoke() {
        let mut timed = paragraph("00:10.000", "Hello world");
        timed.agent = Some("v1".to_string());
        timed.spans = vec![
            span(Some("00:10.000"), "Hel"),
            span(None, "lo "),
            span(Some("00:10.900"), "world"),
        ];
        let plain = paragraph("00:12.000", "Next");

        let doc = LyricsDocument::build(&[timed, plain], Tier::Syllable).unwrap();
        assert!(doc.is_karaoke());
        assert_eq!(
            doc.lines(),
            [
                "[00:10.00]v1: <00:10.00>Hello <00:10.90>world",
                "[00:12.00]Next",
            ]
        );
    }

    #[test]
    fn test_empty_begin_on_span_renders_bare_text() {
        let mut p = paragraph("00:01.000", "");
        p.spans = vec![span(Some(""), "la"), span(Some("00:01.500"), "la")];
        let doc = LyricsDocument::build(&[p], Tier::Syllable).unwrap();
        assert_eq!(doc.lines(), ["[00:01.00]la<00:01.50>la"]);
    }

    #[test]
    fn test_blank_paragraphs_are_dropped() {
        let doc = LyricsDocument::build(
            &[
                paragraph("00:01.000", "One"),
                paragraph("00:05.000", " \n\t "),
                paragraph("00:09.000", "Two"),
            ],
            Tier::Standard,
        )
        .unwrap();
        assert_eq!(doc.lines().len(), 2);
    }

    #[test]
    fn test_no_lines_is_error() {
        let err = LyricsDocument::build(&[paragraph("00:01.000", "   ")], Tier::Standard)
            .unwrap_err();
        assert!(matches!(err, LyricsError::Empty));

        let err = LyricsDocument::build(&[], Tier::Syllable).unwrap_err();
        assert!(matches!(err, LyricsError::Empty));
    }
}
