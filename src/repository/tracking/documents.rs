//! Document operations: discovery inserts, pending work, status updates.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::TrackingRepository;
use crate::models::{DiscoveredDocument, Document, Mode, TrackStatus};
use crate::repository::diesel_models::DocumentRecord;
use crate::repository::pool::DieselError;
use crate::schema::documents;
use crate::with_conn;

/// Inserts one document, numbering it after the date's current maximum.
///
/// The index is computed by the INSERT itself, so an ignored duplicate URL
/// never consumes a number.
const INSERT_DOCUMENT: &str = r#"INSERT OR IGNORE INTO documents
    (url, date, doc_id, doc_index, discovered_at, claims_status, xml_status)
SELECT ?, ?, ?, COALESCE(MAX(doc_index), 0) + 1, ?, 'pending', 'pending'
FROM documents WHERE date = ?"#;

/// Registers a document's publication date so the foreign key holds.
const INSERT_DATE: &str =
    "INSERT OR IGNORE INTO dates (date, discovered_at, status) VALUES (?, ?, 'pending')";

/// Format a calendar day as the publication server's `YYYYMMDD` key.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

impl TrackingRepository {
    /// Record discovered documents, skipping URLs already tracked.
    ///
    /// Documents are grouped by date and numbered in input order; each date
    /// is inserted in its own transaction, together with the date itself if
    /// it is not yet known. Returns how many documents were new.
    pub async fn add_documents(&self, docs: &[DiscoveredDocument]) -> Result<usize, DieselError> {
        let mut by_date: BTreeMap<&str, Vec<&DiscoveredDocument>> = BTreeMap::new();
        for doc in docs {
            by_date.entry(doc.date.as_str()).or_default().push(doc);
        }

        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        for (date, batch) in by_date {
            let date = date.to_string();
            let batch: Vec<DiscoveredDocument> = batch.into_iter().cloned().collect();
            let now = now.clone();

            inserted += with_conn!(self.pool, conn, {
                conn.transaction(move |conn| {
                    Box::pin(async move {
                        diesel::sql_query(INSERT_DATE)
                            .bind::<Text, _>(date.as_str())
                            .bind::<Text, _>(now.as_str())
                            .execute(conn)
                            .await?;

                        let mut added = 0;
                        for doc in &batch {
                            added += diesel::sql_query(INSERT_DOCUMENT)
                                .bind::<Text, _>(doc.url.as_str())
                                .bind::<Text, _>(date.as_str())
                                .bind::<Text, _>(doc.doc_id.as_str())
                                .bind::<Text, _>(now.as_str())
                                .bind::<Text, _>(date.as_str())
                                .execute(conn)
                                .await?;
                        }
                        Ok::<_, DieselError>(added)
                    })
                })
                .await
            })?;
        }

        Ok(inserted)
    }

    /// Documents still pending in `mode`, optionally within an inclusive
    /// date range, ordered by date then doc_index.
    pub async fn get_pending(
        &self,
        mode: Mode,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Document>, DieselError> {
        let pending = TrackStatus::Pending.as_str();
        let start = start.map(date_key);
        let end = end.map(date_key);

        with_conn!(self.pool, conn, {
            let mut query = documents::table
                .select(DocumentRecord::as_select())
                .into_boxed();

            query = match mode {
                Mode::Claims => query.filter(documents::claims_status.eq(pending)),
                Mode::Xml => query.filter(documents::xml_status.eq(pending)),
            };
            if let Some(ref start) = start {
                query = query.filter(documents::date.ge(start));
            }
            if let Some(ref end) = end {
                query = query.filter(documents::date.le(end));
            }

            query
                .order((documents::date.asc(), documents::doc_index.asc()))
                .load::<DocumentRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Document::from).collect())
        })
    }

    /// Set one document's status, note and completion time for `mode`.
    ///
    /// Returns false when no document has this URL.
    pub async fn mark_processed(
        &self,
        url: &str,
        mode: Mode,
        status: TrackStatus,
        error: Option<&str>,
    ) -> Result<bool, DieselError> {
        let now = Utc::now().to_rfc3339();

        with_conn!(self.pool, conn, {
            let target = documents::table.filter(documents::url.eq(url));
            let updated = match mode {
                Mode::Claims => {
                    diesel::update(target)
                        .set((
                            documents::claims_status.eq(status.as_str()),
                            documents::claims_error.eq(error),
                            documents::claims_processed_at.eq(now.as_str()),
                        ))
                        .execute(&mut conn)
                        .await?
                }
                Mode::Xml => {
                    diesel::update(target)
                        .set((
                            documents::xml_status.eq(status.as_str()),
                            documents::xml_error.eq(error),
                            documents::xml_processed_at.eq(now.as_str()),
                        ))
                        .execute(&mut conn)
                        .await?
                }
            };
            Ok(updated > 0)
        })
    }

    /// Look up one document by URL.
    pub async fn get_document(&self, url: &str) -> Result<Option<Document>, DieselError> {
        with_conn!(self.pool, conn, {
            documents::table
                .filter(documents::url.eq(url))
                .select(DocumentRecord::as_select())
                .first::<DocumentRecord>(&mut conn)
                .await
                .optional()
                .map(|r| r.map(Document::from))
        })
    }

    /// All documents of one publication date, by doc_index.
    pub async fn documents_for_date(&self, date: &str) -> Result<Vec<Document>, DieselError> {
        with_conn!(self.pool, conn, {
            documents::table
                .filter(documents::date.eq(date))
                .select(DocumentRecord::as_select())
                .order(documents::doc_index.asc())
                .load::<DocumentRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Document::from).collect())
        })
    }
}
