//! Publication date operations.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::TrackingRepository;
use crate::repository::diesel_models::{DateRecord, NewDate};
use crate::repository::pool::DieselError;
use crate::schema::dates;
use crate::with_conn;

impl TrackingRepository {
    /// Record publication dates, ignoring ones already known.
    ///
    /// Returns the number of dates that were new.
    pub async fn add_dates(&self, new_dates: &[String]) -> Result<usize, DieselError> {
        if new_dates.is_empty() {
            return Ok(0);
        }
        let new_dates = new_dates.to_vec();
        let now = Utc::now().to_rfc3339();

        with_conn!(self.pool, conn, {
            conn.transaction(move |conn| {
                Box::pin(async move {
                    let mut added = 0;
                    for date in &new_dates {
                        added += diesel::insert_or_ignore_into(dates::table)
                            .values(NewDate {
                                date,
                                discovered_at: &now,
                                status: "pending",
                            })
                            .execute(conn)
                            .await?;
                    }
                    Ok::<_, DieselError>(added)
                })
            })
            .await
        })
    }

    /// All known publication dates, ascending.
    pub async fn list_dates(&self) -> Result<Vec<String>, DieselError> {
        with_conn!(self.pool, conn, {
            dates::table
                .select(DateRecord::as_select())
                .order(dates::date.asc())
                .load::<DateRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(|r| r.date).collect())
        })
    }
}
