//! Discovery and scrape coordinators.

mod discovery;
pub mod listing;
mod locks;
mod pool;
mod scrape;
pub mod sink;

pub use discovery::{Discoverer, DiscoveryOptions, DiscoveryReport};
pub use listing::{PublicationServer, DEFAULT_BASE_URL};
pub use locks::KeyedLocks;
pub use pool::run_workers;
pub use scrape::{ScrapeOptions, ScrapeReport, Scraper};

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::http_client::FetchFailure;
use crate::repository::DieselError;

/// Conditions that end a coordinator run before or instead of doing work.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("could not fetch the publication date listing: {0}")]
    DateListing(FetchFailure),
    #[error("no publication dates between {start} and {end}")]
    NoDates { start: NaiveDate, end: NaiveDate },
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid base URL {url}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("tracking store error: {0}")]
    Store(#[from] DieselError),
}

pub(crate) fn check_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), CrawlError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(CrawlError::InvalidRange { start, end }),
        _ => Ok(()),
    }
}

/// Shared flag telling workers to stop taking new work.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Record an interrupt. The first one trips the signal; any later one
    /// asks for an immediate exit.
    pub fn interrupt(&self) -> Interrupt {
        if self.0.swap(true, Ordering::SeqCst) {
            Interrupt::Force
        } else {
            Interrupt::Graceful
        }
    }

    /// Trip this signal on Ctrl-C until the returned guard is dropped.
    ///
    /// A second Ctrl-C exits the process with status 130 without waiting
    /// for in-flight work.
    pub fn listen_for_ctrl_c(&self) -> CtrlCListener {
        let signal = self.clone();
        let handle = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                match signal.interrupt() {
                    Interrupt::Graceful => {
                        warn!("Interrupted, finishing in-flight work (Ctrl-C again to quit now)")
                    }
                    Interrupt::Force => {
                        warn!("Second interrupt, exiting");
                        std::process::exit(130);
                    }
                }
            }
        });
        CtrlCListener { handle }
    }
}

/// What an interrupt should do to the running command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Stop taking new work and finish what is in flight.
    Graceful,
    /// Exit now.
    Force,
}

/// Aborts the Ctrl-C listener on drop.
#[derive(Debug)]
pub struct CtrlCListener {
    handle: JoinHandle<()>,
}

impl Drop for CtrlCListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_shared_between_clones() {
        let a = StopSignal::new();
        let b = a.clone();
        assert!(!b.is_stopped());
        a.stop();
        assert!(b.is_stopped());
    }

    #[test]
    fn test_check_range() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day);
        assert!(check_range(d(1), d(2)).is_ok());
        assert!(check_range(d(2), d(2)).is_ok());
        assert!(check_range(None, d(2)).is_ok());
        assert!(matches!(
            check_range(d(3), d(2)),
            Err(CrawlError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_repeated_interrupt_forces_exit() {
        let signal = StopSignal::new();
        let worker_view = signal.clone();

        assert_eq!(signal.interrupt(), Interrupt::Graceful);
        assert!(worker_view.is_stopped());
        assert_eq!(signal.interrupt(), Interrupt::Force);
        assert_eq!(worker_view.interrupt(), Interrupt::Force);
    }

    #[tokio::test]
    async fn test_listener_guard_does_not_stop() {
        let signal = StopSignal::new();
        {
            let _guard = signal.listen_for_ctrl_c();
            tokio::task::yield_now().await;
        }
        assert!(!signal.is_stopped());
    }
}
