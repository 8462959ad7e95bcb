//! Lyrics module for turning timed text into LRC files
//!
//! This module provides:
//! - TTML parser for Apple Music timed text
//! - Timestamp normalisation to LRC `mm:ss.cc`
//! - LRC line builder with per-syllable (karaoke) detection
//! - Deduplicating `.lrc` writer for a shared output directory

pub mod lrc;
pub mod timestamp;
pub mod ttml;
pub mod writer;

use std::fmt;

use thiserror::Error;

pub use lrc::LyricsDocument;
pub use writer::{LrcWriter, OutputRecord};

/// Fidelity of a lyrics source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Per-syllable timing.
    Syllable,
    /// Per-line timing only.
    Standard,
}

impl Tier {
    /// Tiers in the order they should be tried.
    pub const PREFERENCE: [Tier; 2] = [Tier::Syllable, Tier::Standard];

    /// Catalog endpoint serving this tier.
    pub fn endpoint(self) -> &'static str {
        match self {
            Tier::Syllable => "syllable-lyrics",
            Tier::Standard => "lyrics",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Syllable => "syllable",
            Tier::Standard => "standard",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Conversion failures. Both mean "no usable lyrics" for the track.
#[derive(Debug, Error)]
pub enum LyricsError {
    /// The timed text is not well-formed markup.
    #[error("malformed timed text: {0}")]
    Parse(#[from] roxmltree::Error),

    /// The markup parsed but produced no lyric line.
    #[error("timed text contains no lyric lines")]
    Empty,
}

/// Convert a TTML document into LRC lines.
pub fn convert(ttml: &str, tier: Tier) -> Result<LyricsDocument, LyricsError> {
    let paragraphs = ttml::parse(ttml)?;
    LyricsDocument::build(&paragraphs, tier)
}
