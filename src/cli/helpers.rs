//! Shared helper functions for CLI commands.

use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};

use epoharvest::repository::TrackingRepository;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}";

/// Progress bar in the house style. Length is set by the coordinator.
pub fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Parse a date given as `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

/// Open the tracking store, upgrading its schema if needed.
pub async fn open_store(path: &Path) -> anyhow::Result<TrackingRepository> {
    TrackingRepository::open(path)
        .await
        .with_context(|| format!("cannot open tracking store {}", path.display()))
}
