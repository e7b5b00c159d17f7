//! Domain models.

mod document;

pub use document::{DiscoveredDocument, Document, Mode, TrackState, TrackStatus};
