//! Download pending documents for one mode.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;

use crate::cli::helpers::{open_store, progress_bar};
use crate::cli::icons;
use epoharvest::config::Settings;
use epoharvest::crawl::{ScrapeOptions, Scraper, StopSignal};
use epoharvest::models::Mode;

pub async fn cmd_scrape(
    settings: &Settings,
    mode: Mode,
    output_dir: PathBuf,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let repo = open_store(&settings.database).await?;
    let client = settings
        .http_client()
        .context("failed to create HTTP client")?;

    let options = ScrapeOptions {
        mode,
        output_dir,
        start,
        end,
        workers: workers.unwrap_or(settings.workers),
    };

    let pb = progress_bar();
    let stop = StopSignal::new();
    let _listener = stop.listen_for_ctrl_c();

    let result = Scraper::new(Arc::new(client), repo)
        .with_progress(pb.clone())
        .run(&options, &stop)
        .await;
    pb.finish_and_clear();
    let report = result?;

    if report.pending == 0 {
        println!("{} No pending documents for {}", icons::success(), mode);
        return Ok(());
    }

    println!(
        "{} Processed {} of {} pending documents ({} mode)",
        icons::info(),
        report.processed,
        report.pending,
        mode
    );
    println!("  {} written: {}", icons::success(), report.written);
    if mode == Mode::Claims {
        println!(
            "  {} completed without claims: {}",
            icons::success(),
            report.without_record
        );
    }
    println!("  {} failed: {}", icons::error(), report.failed);
    if report.unrecorded > 0 {
        println!(
            "  {} status not saved: {} (will be retried next run)",
            icons::warn(),
            report.unrecorded
        );
    }
    if report.interrupted {
        println!(
            "{} Interrupted; remaining documents stay pending",
            icons::warn()
        );
    }
    println!(
        "{} Output in {}",
        icons::info(),
        options.output_dir.display()
    );

    Ok(())
}
