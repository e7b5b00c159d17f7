//! Scrape: fetch every pending document for one mode and record the result.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::pool::run_workers;
use super::sink::{ClaimsSink, XmlSink};
use super::{check_range, CrawlError, StopSignal};
use crate::extract::{parse_claims, ClaimsOutcome};
use crate::http_client::Fetcher;
use crate::models::{Document, Mode, TrackStatus};
use crate::repository::TrackingRepository;

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub mode: Mode,
    pub output_dir: PathBuf,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub workers: usize,
}

/// Outcome of a scrape run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    /// Documents pending when the run started.
    pub pending: usize,
    pub processed: usize,
    /// Completed with output written.
    pub written: usize,
    /// Completed without a record (claims mode only).
    pub without_record: usize,
    pub failed: usize,
    /// Processed documents whose status could not be stored.
    pub unrecorded: usize,
    pub interrupted: bool,
}

impl ScrapeReport {
    pub fn completed(&self) -> usize {
        self.written + self.without_record
    }
}

pub struct Scraper {
    fetcher: Arc<dyn Fetcher>,
    repo: TrackingRepository,
    progress: ProgressBar,
}

impl Scraper {
    pub fn new(fetcher: Arc<dyn Fetcher>, repo: TrackingRepository) -> Self {
        Self {
            fetcher,
            repo,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-document progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Process every pending document for `options.mode`.
    ///
    /// Per-document problems become `failed` rows; only setup problems and
    /// an unreadable store end the run with an error.
    pub async fn run(
        &self,
        options: &ScrapeOptions,
        stop: &StopSignal,
    ) -> Result<ScrapeReport, CrawlError> {
        check_range(options.start, options.end)?;
        if options.workers == 0 {
            return Err(CrawlError::NoWorkers);
        }

        tokio::fs::create_dir_all(&options.output_dir)
            .await
            .map_err(|source| CrawlError::OutputDir {
                path: options.output_dir.clone(),
                source,
            })?;

        let pending = self
            .repo
            .get_pending(options.mode, options.start, options.end)
            .await?;
        if pending.is_empty() {
            info!("No pending documents for {}", options.mode);
            return Ok(ScrapeReport::default());
        }
        info!(
            "Scraping {} pending documents ({} mode)",
            pending.len(),
            options.mode
        );

        let sink = match options.mode {
            Mode::Claims => Sink::Claims(ClaimsSink::new(&options.output_dir)),
            Mode::Xml => Sink::Xml(XmlSink::new(&options.output_dir)),
        };
        let worker = Arc::new(ScrapeWorker {
            fetcher: self.fetcher.clone(),
            repo: self.repo.clone(),
            mode: options.mode,
            sink,
            progress: self.progress.clone(),
            counters: Counters::default(),
        });

        self.progress.set_length(pending.len() as u64);
        let total = pending.len();
        let handler = {
            let worker = worker.clone();
            move |doc: Document| {
                let worker = worker.clone();
                async move { worker.process(doc).await }
            }
        };
        run_workers(pending, options.workers, stop, handler).await?;

        let report = worker.counters.report(total, stop.is_stopped());
        info!(
            "Scrape finished: {} completed, {} failed of {} pending",
            report.completed(),
            report.failed,
            report.pending
        );
        Ok(report)
    }
}

enum Sink {
    Claims(ClaimsSink),
    Xml(XmlSink),
}

enum Outcome {
    Written,
    NoRecord(&'static str),
    Failed(String),
}

#[derive(Default)]
struct Counters {
    processed: AtomicUsize,
    written: AtomicUsize,
    without_record: AtomicUsize,
    failed: AtomicUsize,
    unrecorded: AtomicUsize,
}

impl Counters {
    fn report(&self, pending: usize, interrupted: bool) -> ScrapeReport {
        ScrapeReport {
            pending,
            processed: self.processed.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            without_record: self.without_record.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unrecorded: self.unrecorded.load(Ordering::Relaxed),
            interrupted,
        }
    }
}

struct ScrapeWorker {
    fetcher: Arc<dyn Fetcher>,
    repo: TrackingRepository,
    mode: Mode,
    sink: Sink,
    progress: ProgressBar,
    counters: Counters,
}

impl ScrapeWorker {
    async fn process(&self, doc: Document) {
        self.progress.set_message(doc.doc_id.clone());

        let outcome = match self.fetcher.fetch(&doc.url).await {
            Ok(body) => self.handle(&doc, &body).await,
            Err(failure) => Outcome::Failed(format!("fetch error: {}", failure.last_error)),
        };

        let (status, note) = match &outcome {
            Outcome::Written => {
                self.counters.written.fetch_add(1, Ordering::Relaxed);
                (TrackStatus::Completed, None)
            }
            Outcome::NoRecord(note) => {
                debug!("{}: {}", doc.doc_id, note);
                self.counters.without_record.fetch_add(1, Ordering::Relaxed);
                (TrackStatus::Completed, Some(*note))
            }
            Outcome::Failed(reason) => {
                warn!("{} failed: {}", doc.url, reason);
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                (TrackStatus::Failed, Some(reason.as_str()))
            }
        };

        match self
            .repo
            .mark_processed(&doc.url, self.mode, status, note)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!("{} is no longer tracked", doc.url);
                self.counters.unrecorded.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!("Could not record status of {}: {}", doc.url, e);
                self.counters.unrecorded.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        self.progress.inc(1);
    }

    async fn handle(&self, doc: &Document, body: &[u8]) -> Outcome {
        match &self.sink {
            Sink::Claims(sink) => match parse_claims(body) {
                ClaimsOutcome::Record(record) => match sink.append(&doc.date, &record).await {
                    Ok(()) => Outcome::Written,
                    Err(e) => Outcome::Failed(e.to_string()),
                },
                other => Outcome::NoRecord(other.note().unwrap_or_default()),
            },
            Sink::Xml(sink) => match sink.write(&doc.date, doc.doc_index, body).await {
                Ok(path) => {
                    debug!("Wrote {}", path.display());
                    Outcome::Written
                }
                Err(e) => Outcome::Failed(e.to_string()),
            },
        }
    }
}
