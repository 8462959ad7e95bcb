//! `.lrc` file writer
//!
//! Files are named `<title> - <artist>.lrc`. When that name is taken by a file
//! with different lyrics, ` (1)`, ` (2)`, ... is inserted before the extension.
//! A file that already contains the same lyrics is reused instead of duplicated.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use super::LyricsDocument;
use crate::apple::models::Track;

/// Characters that are not allowed in file names on Windows.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];
const MAX_COMPONENT_CHARS: usize = 80;
const EXTENSION: &str = "lrc";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("create output dir {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where a track's lyrics ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    /// Zero when an existing file already held these lyrics.
    pub bytes_written: usize,
}

impl OutputRecord {
    pub fn reused(&self) -> bool {
        self.bytes_written == 0
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Writes `.lrc` files into one output directory.
///
/// The probe-and-write sequence for a track runs under a single lock for the
/// whole directory, since one track may walk several candidate names.
#[derive(Debug)]
pub struct LrcWriter {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl LrcWriter {
    /// Open the output directory, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, WriteError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| WriteError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist lyrics for a track and return the path actually used.
    pub fn write(&self, track: &Track, doc: &LyricsDocument) -> Result<OutputRecord, WriteError> {
        let body = doc.body_text();
        let stem = file_stem(track.title(), track.artist_name());

        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut path = self.dir.join(format!("{stem}.{EXTENSION}"));
        let mut counter = 1u32;
        while path.exists() {
            if contains_body(&path, &body) {
                debug!(path = %path.display(), "lyrics already present");
                return Ok(self.record(track, path, 0));
            }
            path = self.dir.join(format!("{stem} ({counter}).{EXTENSION}"));
            counter += 1;
        }

        let content = format!(
            "[ti:{}]\n[ar:{}]\n[offset:0]\n{}",
            track.title(),
            track.artist_name(),
            body
        );
        fs::write(&path, &content).map_err(|source| WriteError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = content.len(), "wrote lyrics");

        Ok(self.record(track, path, content.len()))
    }

    fn record(&self, track: &Track, path: PathBuf, bytes_written: usize) -> OutputRecord {
        OutputRecord {
            path,
            title: track.title().to_string(),
            artist: track.artist_name().to_string(),
            bytes_written,
        }
    }
}

/// `<title> - <artist>` with both parts made safe for file names.
pub fn file_stem(title: &str, artist: &str) -> String {
    format!("{} - {}", sanitize(title), sanitize(artist))
}

/// Drop forbidden characters, trim, and cap the length at 80 characters.
pub fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.chars().count() <= MAX_COMPONENT_CHARS {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(MAX_COMPONENT_CHARS).collect();
    truncated.trim_end().to_string()
}

// Unreadable files count as different content and get skipped over.
fn contains_body(path: &Path, body: &str) -> bool {
    fs::read_to_string(path)
        .map(|existing| existing.contains(body))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::{Tier, convert};
    use tempfile::TempDir;

    fn doc(text: &str) -> LyricsDocument {
        let ttml = format!(r#"<tt><body><div><p begin="00:01.000">{text}</p></div></body></tt>"#);
        convert(&ttml, Tier::Standard).unwrap()
    }

    fn track(title: &str, artist: &str) -> Track {
        Track::new("1", title, artist).unwrap()
    }

    #[test]
    fn test_writes_header_and_body() {
        let tmp = TempDir::new().unwrap();
        let writer = LrcWriter::new(tmp.path()).unwrap();

        let record = writer.write(&track("X", "Y"), &doc("Hello")).unwrap();

        assert_eq!(record.path, tmp.path().join("X - Y.lrc"));
        assert_eq!(record.file_name(), "X - Y.lrc");
        let content = fs::read_to_string(&record.path).unwrap();
        assert_eq!(content, "[ti:X]\n[ar:Y]\n[offset:0]\n[00:01.00]Hello");
        assert_eq!(record.bytes_written, content.len());
        assert!(!record.reused());
    }

    #[test]
    fn test_same_lyrics_twice_reuses_file() {
        let tmp = TempDir::new().unwrap();
        let writer = LrcWriter::new(tmp.path()).unwrap();
        let t = track("Song", "Band");

        let first = writer.write(&t, &doc("Hello")).unwrap();
        let second = writer.write(&t, &doc("Hello")).unwrap();

        assert_eq!(first.path, second.path);
        assert!(second.reused());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_different_lyrics_get_numbered_name() {
        let tmp = TempDir::new().unwrap();
        let writer = LrcWriter::new(tmp.path()).unwrap();
        let t = track("Song", "Band");

        writer.write(&t, &doc("Hello")).unwrap();
        let second = writer.write(&t, &doc("Goodbye")).unwrap();
        let third = writer.write(&t, &doc("Again")).unwrap();

        assert_eq!(second.path, tmp.path().join("Song - Band (1).lrc"));
        assert_eq!(third.path, tmp.path().join("Song - Band (2).lrc"));
        let original = fs::read_to_string(tmp.path().join("Song - Band.lrc")).unwrap();
        assert!(original.ends_with("Hello"));
    }

    #[test]
    fn test_probe_finds_match_past_first_collision() {
        let tmp = TempDir::new().unwrap();
        let writer = LrcWriter::new(tmp.path()).unwrap();
        let t = track("Song", "Band");

        writer.write(&t, &doc("Hello")).unwrap();
        let numbered = writer.write(&t, &doc("Goodbye")).unwrap();
        let again = writer.write(&t, &doc("Goodbye")).unwrap();

        assert_eq!(again.path, numbered.path);
        assert!(again.reused());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_creates_missing_output_dir() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        let writer = LrcWriter::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(writer.dir(), nested.as_path());
    }

    #[test]
    fn test_header_keeps_original_names() {
        let tmp = TempDir::new().unwrap();
        let writer = LrcWriter::new(tmp.path()).unwrap();

        let record = writer.write(&track("What?", "AC/DC"), &doc("Hi")).unwrap();

        assert_eq!(record.file_name(), "What - ACDC.lrc");
        let content = fs::read_to_string(&record.path).unwrap();
        assert!(content.starts_with("[ti:What?]\n[ar:AC/DC]\n"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(r#" a\b/c*d?e:f"g<h>i|j "#), "abcdefghij");
        assert_eq!(file_stem("  Title ", " Artist"), "Title - Artist");

        let long = "x".repeat(100);
        assert_eq!(sanitize(&long).chars().count(), 80);

        let spaced = format!("{} tail", "y".repeat(79));
        assert_eq!(sanitize(&spaced), "y".repeat(79));

        let accented = "é".repeat(90);
        assert_eq!(sanitize(&accented), "é".repeat(80));
    }
}
