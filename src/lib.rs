//! epoharvest - EPO publication server harvester.
//!
//! Core library: tracking store, fetcher, claims extraction and the
//! discovery and scrape coordinators used by the `epoharvest` binary.

// Model types use `from_str` methods that return Option<Self>,
// not Result<Self, Error> as std::str::FromStr requires.
#![allow(clippy::should_implement_trait)]

pub mod config;
pub mod crawl;
pub mod extract;
pub mod http_client;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod schema;
