//! Repository layer for the tracking store.
//!
//! Queries use Diesel over a SQLite connection wrapped for async use;
//! schema upgrades run through cetane on a plain rusqlite connection.

pub mod diesel_models;
pub mod migrations;
pub mod pool;
pub mod tracking;
pub mod util;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{DieselError, SqlitePool};
pub use tracking::{date_key, DateRange, ModeStats, TrackingRepository, TrackingStats};
pub use util::parse_datetime_opt;
