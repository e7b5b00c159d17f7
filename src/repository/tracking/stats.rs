//! Aggregate statistics over the tracking store.

use std::collections::BTreeMap;

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel_async::RunQueryDsl;
use serde::Serialize;

use super::TrackingRepository;
use crate::models::{Mode, TrackStatus};
use crate::repository::pool::DieselError;
use crate::schema::dates;
use crate::with_conn;

/// Status counts for one mode.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModeStats {
    pub by_status: BTreeMap<String, u64>,
    pub total: u64,
}

impl ModeStats {
    pub fn count(&self, status: TrackStatus) -> u64 {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}

/// Span of publication dates that have documents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DateRange {
    pub first: Option<String>,
    pub last: Option<String>,
    pub dates_with_documents: u64,
}

/// Tracking store report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackingStats {
    pub claims: ModeStats,
    pub xml: ModeStats,
    pub date_range: DateRange,
    pub known_dates: u64,
}

impl TrackingStats {
    pub fn mode(&self, mode: Mode) -> &ModeStats {
        match mode {
            Mode::Claims => &self.claims,
            Mode::Xml => &self.xml,
        }
    }
}

#[derive(QueryableByName)]
struct StatusCount {
    #[diesel(sql_type = Text)]
    status: String,
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(QueryableByName)]
struct DateSpan {
    #[diesel(sql_type = Nullable<Text>)]
    first: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    last: Option<String>,
    #[diesel(sql_type = BigInt)]
    count: i64,
}

fn status_column(mode: Mode) -> &'static str {
    match mode {
        Mode::Claims => "claims_status",
        Mode::Xml => "xml_status",
    }
}

impl TrackingRepository {
    /// Per-status document counts for one mode.
    pub async fn mode_stats(&self, mode: Mode) -> Result<ModeStats, DieselError> {
        let query = format!(
            "SELECT COALESCE({col}, 'pending') AS status, COUNT(*) AS count
             FROM documents GROUP BY COALESCE({col}, 'pending')",
            col = status_column(mode)
        );

        let rows: Vec<StatusCount> = with_conn!(self.pool, conn, {
            diesel::sql_query(query).load(&mut conn).await
        })?;

        let mut stats = ModeStats::default();
        for row in rows {
            let count = row.count.max(0) as u64;
            stats.total += count;
            stats.by_status.insert(row.status, count);
        }
        Ok(stats)
    }

    /// Full report: both modes, date span, known publication dates.
    pub async fn stats(&self) -> Result<TrackingStats, DieselError> {
        let claims = self.mode_stats(Mode::Claims).await?;
        let xml = self.mode_stats(Mode::Xml).await?;

        let span: DateSpan = with_conn!(self.pool, conn, {
            diesel::sql_query(
                "SELECT MIN(date) AS first, MAX(date) AS last, COUNT(DISTINCT date) AS count
                 FROM documents",
            )
            .get_result(&mut conn)
            .await
        })?;

        let known_dates: i64 = with_conn!(self.pool, conn, {
            dates::table.count().get_result(&mut conn).await
        })?;

        Ok(TrackingStats {
            claims,
            xml,
            date_range: DateRange {
                first: span.first,
                last: span.last,
                dates_with_documents: span.count.max(0) as u64,
            },
            known_dates: known_dates.max(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{doc, open_temp};
    use super::*;

    #[tokio::test]
    async fn test_empty_store_stats() {
        let (repo, _dir) = open_temp().await;
        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.claims.total, 0);
        assert_eq!(stats.xml.total, 0);
        assert!(stats.date_range.first.is_none());
        assert_eq!(stats.known_dates, 0);
    }

    #[tokio::test]
    async fn test_stats_counts_each_mode_separately() {
        let (repo, _dir) = open_temp().await;
        repo.add_dates(&["20240103".to_string(), "20240110".to_string(), "20240117".to_string()])
            .await
            .unwrap();
        let docs = vec![
            doc("20240103", "A"),
            doc("20240103", "B"),
            doc("20240110", "C"),
        ];
        repo.add_documents(&docs).await.unwrap();
        repo.mark_processed(&docs[0].url, Mode::Claims, TrackStatus::Completed, None)
            .await
            .unwrap();
        repo.mark_processed(&docs[1].url, Mode::Claims, TrackStatus::Failed, Some("fetch error: 503"))
            .await
            .unwrap();
        repo.mark_processed(&docs[2].url, Mode::Xml, TrackStatus::Completed, None)
            .await
            .unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.claims.total, 3);
        assert_eq!(stats.claims.count(TrackStatus::Completed), 1);
        assert_eq!(stats.claims.count(TrackStatus::Failed), 1);
        assert_eq!(stats.claims.count(TrackStatus::Pending), 1);
        assert_eq!(stats.mode(Mode::Xml).count(TrackStatus::Pending), 2);
        assert_eq!(stats.xml.count(TrackStatus::Completed), 1);

        assert_eq!(stats.date_range.first.as_deref(), Some("20240103"));
        assert_eq!(stats.date_range.last.as_deref(), Some("20240110"));
        assert_eq!(stats.date_range.dates_with_documents, 2);
        assert_eq!(stats.known_dates, 3);
    }
}
