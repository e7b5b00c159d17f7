//! Output writers for the two scrape modes.
//!
//! Claims go to `{root}/{date}.jsonl`, one record per line, appended under
//! a per-date lock. XML goes to `{root}/{date}/{doc_index}.xml`, written to a
//! `.part` sibling first and renamed into place.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::locks::KeyedLocks;
use crate::extract::ClaimsRecord;

/// Appends claims records to per-date JSON Lines files.
#[derive(Debug)]
pub struct ClaimsSink {
    root: PathBuf,
    locks: KeyedLocks,
}

impl ClaimsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: KeyedLocks::new(),
        }
    }

    pub fn path_for(&self, date: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", date))
    }

    /// Append one record as a single line.
    pub async fn append(&self, date: &str, record: &ClaimsRecord) -> io::Result<()> {
        let mut line = serde_json::to_string(record).map_err(io::Error::other)?;
        line.push('\n');

        let lock = self.locks.get(date);
        let _guard = lock.lock().await;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(date))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

/// Writes raw document bodies under per-date directories.
#[derive(Debug)]
pub struct XmlSink {
    root: PathBuf,
}

impl XmlSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, date: &str, doc_index: i64) -> PathBuf {
        self.root.join(date).join(format!("{}.xml", doc_index))
    }

    /// Write `body` verbatim, replacing any earlier file for this index.
    pub async fn write(&self, date: &str, doc_index: i64, body: &[u8]) -> io::Result<PathBuf> {
        let dir = self.root.join(date);
        fs::create_dir_all(&dir).await?;

        let target = self.path_for(date, doc_index);
        let partial = dir.join(format!("{}.xml.part", doc_index));

        if let Err(e) = write_then_rename(&partial, &target, body).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
        Ok(target)
    }
}

async fn write_then_rename(partial: &Path, target: &Path, body: &[u8]) -> io::Result<()> {
    fs::write(partial, body).await?;
    fs::rename(partial, target).await
}
