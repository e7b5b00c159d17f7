//! Tracking store statistics.

use console::style;

use crate::cli::helpers::open_store;
use epoharvest::config::Settings;
use epoharvest::models::{Mode, TrackStatus};

pub async fn cmd_stats(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let repo = open_store(&settings.database).await?;
    let stats = repo.stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("\n{}", style("Tracking Store").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Store:", settings.database.display());
    println!("{:<20} {}", "Known dates:", stats.known_dates);
    match (&stats.date_range.first, &stats.date_range.last) {
        (Some(first), Some(last)) => {
            println!("{:<20} {} to {}", "Date range:", first, last);
            println!(
                "{:<20} {}",
                "Dates with docs:", stats.date_range.dates_with_documents
            );
        }
        _ => println!("{:<20} {}", "Date range:", style("none").dim()),
    }

    for mode in Mode::ALL {
        let counts = stats.mode(mode);
        println!("\n{}", style(format!("{} mode", mode)).bold());
        println!("{}", "-".repeat(40));
        println!("{:<20} {}", "Total:", counts.total);
        println!(
            "{:<20} {}",
            "Pending:",
            style(counts.count(TrackStatus::Pending)).yellow()
        );
        println!(
            "{:<20} {}",
            "Completed:",
            style(counts.count(TrackStatus::Completed)).green()
        );
        println!(
            "{:<20} {}",
            "Failed:",
            style(counts.count(TrackStatus::Failed)).red()
        );
        for (status, count) in &counts.by_status {
            if TrackStatus::from_str(status).is_none() {
                println!("{:<20} {}", format!("{}:", status), count);
            }
        }
    }

    Ok(())
}
