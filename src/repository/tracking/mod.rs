//! Tracking store: the durable record of discovered publication dates and
//! documents, and of each document's progress through both scrape modes.
//!
//! Split into submodules:
//! - `mod.rs` (this file): repository struct, record conversion
//! - `dates.rs`: publication date inserts and listing
//! - `documents.rs`: document inserts, pending queries, status updates
//! - `stats.rs`: aggregate counts for the stats report

mod dates;
mod documents;
mod stats;

use std::path::Path;

use super::diesel_models::DocumentRecord;
use super::migrations::{run_migrations, MigrationError};
use super::pool::SqlitePool;
use super::util::parse_datetime_opt;
use crate::models::{Document, TrackState, TrackStatus};

pub use documents::date_key;
pub use stats::{DateRange, ModeStats, TrackingStats};

/// Diesel-backed tracking store.
#[derive(Clone)]
pub struct TrackingRepository {
    pool: SqlitePool,
}

impl TrackingRepository {
    /// Wrap an existing pool. The schema must already be migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the store at `path`, creating or upgrading its schema.
    pub async fn open(path: &Path) -> Result<Self, MigrationError> {
        run_migrations(path).await?;
        Ok(Self::new(SqlitePool::from_path(path)))
    }

    pub fn database_url(&self) -> &str {
        self.pool.database_url()
    }
}

fn track_from_columns(
    status: Option<&str>,
    error: Option<String>,
    processed_at: Option<&str>,
) -> TrackState {
    TrackState {
        // NULL status only occurs on legacy rows that predate the default.
        status: status
            .and_then(TrackStatus::from_str)
            .unwrap_or(TrackStatus::Pending),
        error,
        processed_at: parse_datetime_opt(processed_at),
    }
}

impl From<DocumentRecord> for Document {
    fn from(record: DocumentRecord) -> Self {
        Document {
            claims: track_from_columns(
                record.claims_status.as_deref(),
                record.claims_error,
                record.claims_processed_at.as_deref(),
            ),
            xml: track_from_columns(
                record.xml_status.as_deref(),
                record.xml_error,
                record.xml_processed_at.as_deref(),
            ),
            discovered_at: parse_datetime_opt(record.discovered_at.as_deref()),
            doc_id: record.doc_id.unwrap_or_default(),
            doc_index: record.doc_index.map(i64::from).unwrap_or_default(),
            url: record.url,
            date: record.date,
        }
    }
}
