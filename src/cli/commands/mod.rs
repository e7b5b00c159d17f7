//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod discover;
mod scrape;
mod stats;

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use super::helpers::parse_date;
use epoharvest::config::{Config, Settings};
use epoharvest::models::Mode;

#[derive(Parser)]
#[command(name = "epoharvest")]
#[command(about = "Harvest patent documents from the EPO publication server")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Tracking store path (overrides config file)
    #[arg(long, global = true, env = "EPOHARVEST_DB")]
    store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find publication dates and documents in a date range (does not download)
    Discover {
        /// First publication date, inclusive (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start_date: NaiveDate,
        /// Last publication date, inclusive (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        end_date: NaiveDate,
        /// Keep only document links ending with this marker
        #[arg(long)]
        suffix: Option<String>,
        /// Number of dates listed concurrently
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Download pending documents for one mode
    Scrape {
        /// What to produce: extracted claims or raw XML
        #[arg(value_enum)]
        mode: Mode,
        /// Root directory for output files
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Only documents published on or after this date
        #[arg(long, value_parser = parse_date)]
        start_date: Option<NaiveDate>,
        /// Only documents published on or before this date
        #[arg(long, value_parser = parse_date)]
        end_date: Option<NaiveDate>,
        /// Number of concurrent downloads
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Show tracking store statistics
    Stats {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> anyhow::Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            anyhow::bail!("--start-date {} is after --end-date {}", start, end);
        }
    }
    Ok(())
}

async fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let config = Config::load(cli.config.as_deref()).await?;
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let mut settings = Settings::from_config(&config, &cwd)?;
    if let Some(ref store) = cli.store {
        settings.database = store.clone();
    }
    Ok(settings)
}

/// Run the parsed command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli).await?;

    match cli.command {
        Commands::Discover {
            start_date,
            end_date,
            suffix,
            workers,
        } => {
            check_dates(Some(start_date), Some(end_date))?;
            discover::cmd_discover(&settings, start_date, end_date, suffix, workers).await
        }
        Commands::Scrape {
            mode,
            output_dir,
            start_date,
            end_date,
            workers,
        } => {
            check_dates(start_date, end_date)?;
            scrape::cmd_scrape(&settings, mode, output_dir, start_date, end_date, workers).await
        }
        Commands::Stats { json } => stats::cmd_stats(&settings, json).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scrape_command() {
        let cli = Cli::try_parse_from([
            "epoharvest",
            "--store",
            "/tmp/epo.db",
            "scrape",
            "xml",
            "--output-dir",
            "out",
            "--start-date",
            "2024-01-03",
        ])
        .unwrap();

        assert_eq!(cli.store, Some(PathBuf::from("/tmp/epo.db")));
        match cli.command {
            Commands::Scrape {
                mode,
                output_dir,
                start_date,
                end_date,
                workers,
            } => {
                assert_eq!(mode, Mode::Xml);
                assert_eq!(output_dir, PathBuf::from("out"));
                assert_eq!(start_date, NaiveDate::from_ymd_opt(2024, 1, 3));
                assert_eq!(end_date, None);
                assert_eq!(workers, None);
            }
            _ => panic!("expected scrape"),
        }
    }

    #[test]
    fn test_discover_requires_dates() {
        assert!(Cli::try_parse_from(["epoharvest", "discover", "--start-date", "2024-01-03"]).is_err());
        assert!(Cli::try_parse_from([
            "epoharvest",
            "discover",
            "--start-date",
            "2024-01-03",
            "--end-date",
            "not-a-date"
        ])
        .is_err());
    }

    #[test]
    fn test_reversed_dates_rejected() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day);
        assert!(check_dates(d(10), d(3)).is_err());
        assert!(check_dates(d(3), d(3)).is_ok());
        assert!(check_dates(None, d(3)).is_ok());
    }
}
