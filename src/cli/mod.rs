//! Command-line interface for epoharvest.

mod commands;
pub mod helpers;
pub mod icons;

pub use commands::{run, Cli};
