//! Diesel ORM models for the tracking store tables.

use diesel::prelude::*;

use crate::schema;

/// Publication date record from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::dates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DateRecord {
    pub date: String,
    pub discovered_at: Option<String>,
    pub status: Option<String>,
}

/// New publication date for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::dates)]
pub struct NewDate<'a> {
    pub date: &'a str,
    pub discovered_at: &'a str,
    pub status: &'a str,
}

/// Document record from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentRecord {
    pub url: String,
    pub date: String,
    pub doc_id: Option<String>,
    pub doc_index: Option<i32>,
    pub discovered_at: Option<String>,
    pub claims_status: Option<String>,
    pub claims_error: Option<String>,
    pub claims_processed_at: Option<String>,
    pub xml_status: Option<String>,
    pub xml_error: Option<String>,
    pub xml_processed_at: Option<String>,
}
