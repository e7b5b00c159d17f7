//! Tracked publication dates and documents.
//!
//! Each document carries two independent processing tracks (claims and
//! full XML), each with its own status, error note and completion time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scrape mode: which processing track a run advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Extract English claims into per-date JSONL files.
    Claims,
    /// Save the raw document XML.
    Xml,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Claims, Mode::Xml];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claims => "claims",
            Self::Xml => "xml",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "claims" => Some(Self::Claims),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one processing track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    Pending,
    Completed,
    Failed,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal outcome for a processed document.
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Completed
        } else {
            Self::Failed
        }
    }
}

/// State of a single processing track on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackState {
    pub status: TrackStatus,
    /// Failure reason or informational note.
    pub error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TrackState {
    pub fn pending() -> Self {
        Self {
            status: TrackStatus::Pending,
            error: None,
            processed_at: None,
        }
    }
}

/// A tracked patent document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Absolute URL of the document XML. Primary identity.
    pub url: String,
    /// Publication date, YYYYMMDD.
    pub date: String,
    pub doc_id: String,
    /// 1-based position within its publication date.
    pub doc_index: i64,
    pub discovered_at: Option<DateTime<Utc>>,
    pub claims: TrackState,
    pub xml: TrackState,
}

impl Document {
    pub fn track(&self, mode: Mode) -> &TrackState {
        match mode {
            Mode::Claims => &self.claims,
            Mode::Xml => &self.xml,
        }
    }
}

/// A document found on a listing page, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDocument {
    pub url: String,
    pub date: String,
    pub doc_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip_names() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(Mode::from_str("pdf"), None);
    }

    #[test]
    fn test_track_status_from_success() {
        assert_eq!(TrackStatus::from_success(true), TrackStatus::Completed);
        assert_eq!(TrackStatus::from_success(false), TrackStatus::Failed);
        assert_eq!(TrackStatus::from_str("done"), None);
    }
}
