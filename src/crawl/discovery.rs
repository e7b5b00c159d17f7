//! Discovery: walk the publication date listing and record every matching
//! document for the dates in range.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use indicatif::ProgressBar;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::listing::{date_entries, document_links, PublicationServer};
use super::pool::run_workers;
use super::{check_range, CrawlError, StopSignal};
use crate::http_client::{FetchFailure, Fetcher};
use crate::models::DiscoveredDocument;
use crate::repository::{date_key, TrackingRepository};

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Only links ending with this marker are kept.
    pub suffix: String,
    pub workers: usize,
}

/// Outcome of a discovery run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    /// Publication dates kept from the listing.
    pub dates: usize,
    /// Of those, dates not seen before.
    pub new_dates: usize,
    /// Dates whose document listing could not be fetched.
    pub failed_dates: Vec<String>,
    pub documents_found: usize,
    pub documents_added: usize,
    pub interrupted: bool,
}

impl DiscoveryReport {
    /// Found documents that were already tracked.
    pub fn duplicates(&self) -> usize {
        self.documents_found.saturating_sub(self.documents_added)
    }
}

pub struct Discoverer {
    fetcher: Arc<dyn Fetcher>,
    repo: TrackingRepository,
    server: PublicationServer,
    progress: ProgressBar,
}

impl Discoverer {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        repo: TrackingRepository,
        server: PublicationServer,
    ) -> Self {
        Self {
            fetcher,
            repo,
            server,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-date progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Publication dates within `[start, end]`, ascending.
    pub async fn discover_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, CrawlError> {
        let page = self
            .fetcher
            .fetch(&self.server.dates_url())
            .await
            .map_err(CrawlError::DateListing)?;

        let listed = date_entries(&page);
        let mut dates: Vec<NaiveDate> = listed
            .iter()
            .copied()
            .filter(|date| (start..=end).contains(date))
            .collect();
        dates.sort();

        debug!(
            "Date listing has {} entries, {} in range",
            listed.len(),
            dates.len()
        );
        Ok(dates)
    }

    /// Matching documents listed for one date, in page order.
    pub async fn discover_documents(
        &self,
        date: NaiveDate,
        suffix: &str,
    ) -> Result<Vec<DiscoveredDocument>, FetchFailure> {
        list_documents(self.fetcher.as_ref(), &self.server, date, suffix).await
    }

    /// Discover dates and documents in range and record them.
    ///
    /// A date whose listing fails contributes no documents and is reported
    /// in `failed_dates`. Only a failed date listing, an empty range or a
    /// store error ends the run early.
    pub async fn run(
        &self,
        options: &DiscoveryOptions,
        stop: &StopSignal,
    ) -> Result<DiscoveryReport, CrawlError> {
        check_range(Some(options.start), Some(options.end))?;
        if options.workers == 0 {
            return Err(CrawlError::NoWorkers);
        }

        let dates = self.discover_dates(options.start, options.end).await?;
        if dates.is_empty() {
            return Err(CrawlError::NoDates {
                start: options.start,
                end: options.end,
            });
        }
        info!(
            "Found {} publication dates between {} and {}",
            dates.len(),
            options.start,
            options.end
        );

        let keys: Vec<String> = dates.iter().copied().map(date_key).collect();
        let new_dates = self.repo.add_dates(&keys).await?;

        self.progress.set_length(dates.len() as u64);
        let found: Arc<Mutex<BTreeMap<String, Vec<DiscoveredDocument>>>> = Arc::default();
        let failed: Arc<Mutex<Vec<String>>> = Arc::default();

        let handler = {
            let fetcher = self.fetcher.clone();
            let server = self.server.clone();
            let suffix = options.suffix.clone();
            let progress = self.progress.clone();
            let found = found.clone();
            let failed = failed.clone();

            move |date: NaiveDate| {
                let fetcher = fetcher.clone();
                let server = server.clone();
                let suffix = suffix.clone();
                let progress = progress.clone();
                let found = found.clone();
                let failed = failed.clone();

                async move {
                    let key = date_key(date);
                    progress.set_message(key.clone());
                    match list_documents(fetcher.as_ref(), &server, date, &suffix).await {
                        Ok(docs) => {
                            debug!("{}: {} documents", key, docs.len());
                            found.lock().await.insert(key, docs);
                        }
                        Err(e) => {
                            warn!("Skipping {}: {}", key, e);
                            failed.lock().await.push(key);
                        }
                    }
                    progress.inc(1);
                }
            }
        };

        run_workers(dates.clone(), options.workers, stop, handler).await?;
        let interrupted = stop.is_stopped();

        let docs: Vec<DiscoveredDocument> = found.lock().await.values().flatten().cloned().collect();
        let documents_added = self.repo.add_documents(&docs).await?;

        let mut failed_dates = std::mem::take(&mut *failed.lock().await);
        failed_dates.sort();

        let report = DiscoveryReport {
            dates: dates.len(),
            new_dates,
            failed_dates,
            documents_found: docs.len(),
            documents_added,
            interrupted,
        };
        info!(
            "Discovery recorded {} new documents ({} already known)",
            report.documents_added,
            report.duplicates()
        );
        Ok(report)
    }
}

async fn list_documents(
    fetcher: &dyn Fetcher,
    server: &PublicationServer,
    date: NaiveDate,
    suffix: &str,
) -> Result<Vec<DiscoveredDocument>, FetchFailure> {
    let key = date_key(date);
    let page_url = server.patents_url(&key);
    let page = fetcher.fetch(&page_url).await?;

    Ok(document_links(&page_url, &page, suffix)
        .into_iter()
        .map(|link| DiscoveredDocument {
            url: link.url,
            date: key.clone(),
            doc_id: link.doc_id,
        })
        .collect())
}
