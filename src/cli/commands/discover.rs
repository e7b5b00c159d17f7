//! Discover publication dates and documents.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;

use crate::cli::helpers::{open_store, progress_bar};
use crate::cli::icons;
use epoharvest::config::Settings;
use epoharvest::crawl::{Discoverer, DiscoveryOptions, StopSignal};

pub async fn cmd_discover(
    settings: &Settings,
    start: NaiveDate,
    end: NaiveDate,
    suffix: Option<String>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let repo = open_store(&settings.database).await?;
    let client = settings
        .http_client()
        .context("failed to create HTTP client")?;
    let server = settings.publication_server()?;

    let options = DiscoveryOptions {
        start,
        end,
        suffix: suffix.unwrap_or_else(|| settings.suffix.clone()),
        workers: workers.unwrap_or(settings.workers),
    };

    println!(
        "{} Discovering {} documents published {} to {}",
        icons::info(),
        options.suffix,
        start,
        end
    );

    let pb = progress_bar();
    let stop = StopSignal::new();
    let _listener = stop.listen_for_ctrl_c();

    let result = Discoverer::new(Arc::new(client), repo, server)
        .with_progress(pb.clone())
        .run(&options, &stop)
        .await;
    pb.finish_and_clear();
    let report = result?;

    println!(
        "{} {} publication dates in range ({} new)",
        icons::success(),
        report.dates,
        report.new_dates
    );
    println!(
        "{} {} documents found, {} new, {} already tracked",
        icons::success(),
        report.documents_found,
        report.documents_added,
        report.duplicates()
    );
    if !report.failed_dates.is_empty() {
        println!(
            "{} {} date listing(s) could not be fetched: {}",
            icons::error(),
            report.failed_dates.len(),
            report.failed_dates.join(", ")
        );
    }
    if report.interrupted {
        println!(
            "{} Interrupted; documents listed so far were recorded",
            icons::warn()
        );
    }

    Ok(())
}
