//! Concurrent fetch → convert → write pipeline over many tracks.
//!
//! Every job runs as its own task; a semaphore caps how many run at once.
//! Results come back in completion order, so callers can only rely on
//! getting exactly one result per submitted job.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::apple::models::Track;
use crate::lyrics::{self, LrcWriter, OutputRecord, Tier};

pub const DEFAULT_WORKERS: usize = 10;

/// Where timed text comes from.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    /// Fetch the TTML document for a catalog song at the given tier.
    ///
    /// `Ok(None)` means the tier is not available for that song.
    async fn fetch_ttml(&self, catalog_id: &str, tier: Tier) -> anyhow::Result<Option<String>>;

    /// Resolve a free-text query to its best matching track.
    async fn search_track(&self, term: &str) -> anyhow::Result<Option<Track>>;
}

/// One unit of work.
#[derive(Debug, Clone)]
pub enum Job {
    Track(Track),
    /// Search term, resolved to its first hit inside the pipeline.
    Query(String),
}

impl From<Track> for Job {
    fn from(track: Track) -> Self {
        Job::Track(track)
    }
}

/// Outcome of one job.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub succeeded: bool,
    pub message: String,
    pub output: Option<OutputRecord>,
}

impl BatchResult {
    fn success(output: OutputRecord, tier: Tier) -> Self {
        let note = if output.reused() { ", already saved" } else { "" };
        Self {
            succeeded: true,
            message: format!("ok    {} : {} ({tier}{note})", output.title, output.file_name()),
            output: Some(output),
        }
    }

    fn failure(subject: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            succeeded: false,
            message: format!("fail  {subject} : {reason}"),
            output: None,
        }
    }
}

/// Final tally of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub total: usize,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }
}

pub struct BatchOrchestrator<S> {
    source: Arc<S>,
    writer: Arc<LrcWriter>,
    workers: usize,
}

impl<S: LyricsSource + 'static> BatchOrchestrator<S> {
    pub fn new(source: Arc<S>, writer: Arc<LrcWriter>, workers: usize) -> Self {
        Self {
            source,
            writer,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job and report each result as it completes.
    ///
    /// `on_result` receives the 1-based completion index, the job total and
    /// the result. Returns once all jobs have finished.
    pub async fn run<J, F>(&self, jobs: J, mut on_result: F) -> BatchSummary
    where
        J: IntoIterator,
        J::Item: Into<Job>,
        F: FnMut(usize, usize, &BatchResult),
    {
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut set = JoinSet::new();

        for job in jobs {
            let job = job.into();
            let permits = Arc::clone(&permits);
            let source = Arc::clone(&self.source);
            let writer = Arc::clone(&self.writer);
            set.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(p) => p,
                    Err(e) => return BatchResult::failure(job.subject(), e),
                };
                process_job(source.as_ref(), writer, job).await
            });
        }

        let total = set.len();
        let mut summary = BatchSummary { succeeded: 0, total };
        let mut done = 0;

        while let Some(joined) = set.join_next().await {
            done += 1;
            let result = joined.unwrap_or_else(|e| {
                warn!(error = %e, "lyrics task died");
                BatchResult::failure("task", e)
            });
            if result.succeeded {
                summary.succeeded += 1;
            }
            on_result(done, total, &result);
        }

        info!(succeeded = summary.succeeded, failed = summary.failed(), "batch finished");
        summary
    }
}

impl Job {
    fn subject(&self) -> &str {
        match self {
            Job::Track(t) => t.title(),
            Job::Query(q) => q,
        }
    }
}

async fn process_job<S: LyricsSource>(source: &S, writer: Arc<LrcWriter>, job: Job) -> BatchResult {
    let track = match job {
        Job::Track(track) => track,
        Job::Query(term) => match source.search_track(&term).await {
            Ok(Some(track)) => track,
            Ok(None) => return BatchResult::failure(&format!("'{term}'"), "not found"),
            Err(e) => {
                warn!(term = %term, error = %e, "search failed");
                return BatchResult::failure(&format!("'{term}'"), "not found");
            }
        },
    };
    process_track(source, writer, track).await
}

/// fetch (syllable, then standard) → convert → write
pub async fn process_track<S: LyricsSource + ?Sized>(
    source: &S,
    writer: Arc<LrcWriter>,
    track: Track,
) -> BatchResult {
    let subject = format!("{} - {}", track.title(), track.artist_name());

    let Some((ttml, tier)) = fetch_best(source, track.catalog_id()).await else {
        return BatchResult::failure(&subject, "no lyrics");
    };

    let doc = match lyrics::convert(&ttml, tier) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(track = %subject, error = %e, "conversion failed");
            return BatchResult::failure(&subject, "conversion error");
        }
    };
    debug!(
        track = %subject,
        tier = %doc.tier(),
        lines = doc.lines().len(),
        karaoke = doc.is_karaoke(),
        "converted"
    );

    let written = tokio::task::spawn_blocking(move || writer.write(&track, &doc)).await;

    match written {
        Ok(Ok(output)) => {
            debug!(artist = %output.artist, bytes = output.bytes_written, "saved");
            BatchResult::success(output, tier)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "write failed");
            BatchResult::failure(&subject, format!("write error ({e})"))
        }
        Err(e) => BatchResult::failure(&subject, format!("write error ({e})")),
    }
}

/// First tier that yields a document. Fetch errors fall through to the next tier.
async fn fetch_best<S: LyricsSource + ?Sized>(source: &S, catalog_id: &str) -> Option<(String, Tier)> {
    for tier in Tier::PREFERENCE {
        match source.fetch_ttml(catalog_id, tier).await {
            Ok(Some(ttml)) if !ttml.is_empty() => return Some((ttml, tier)),
            Ok(_) => debug!(catalog_id, %tier, "tier unavailable"),
            Err(e) => debug!(catalog_id, %tier, error = %e, "tier fetch failed"),
        }
    }
    None
}
