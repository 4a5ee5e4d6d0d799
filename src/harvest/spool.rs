// src/harvest/spool.rs

//! Spool directory harvester.
//!
//! Layout:
//! ```text
//! {spool_dir}/{destination}/*.json            pending batches
//! {spool_dir}/{destination}/processed/*.json  acknowledged batches
//! {spool_dir}/{destination}/rejected/*.json   batches that failed to parse
//! ```
//! Each batch is a JSON array of item records (`kind` + kind fields).
//! `destination` and `status` in a record are ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::harvest::Harvester;
use crate::models::{DestinationConfig, Item, ItemContent};

const PROCESSED_DIR: &str = "processed";
const REJECTED_DIR: &str = "rejected";

#[derive(Debug, Deserialize)]
struct SpoolRecord {
    #[serde(flatten)]
    content: ItemContent,
}

/// Reads item batches dropped by an external scraper.
pub struct SpoolHarvester {
    spool_dir: PathBuf,
    archive: bool,
    pending: Mutex<HashMap<String, Vec<PathBuf>>>,
}

impl SpoolHarvester {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            archive: true,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// A harvester that leaves acknowledged batches in the inbox.
    pub fn read_only(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive: false,
            ..Self::new(spool_dir)
        }
    }

    fn inbox(&self, destination: &str) -> PathBuf {
        self.spool_dir.join(destination)
    }

    /// Pending batch files, oldest name first.
    async fn batch_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file()
                && path.extension().is_some_and(|ext| ext == "json")
            {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Move an unreadable batch out of the way so later batches still flow.
    async fn reject(&self, inbox: &Path, path: &Path) -> Result<()> {
        if !self.archive {
            return Ok(());
        }
        let rejected = inbox.join(REJECTED_DIR);
        tokio::fs::create_dir_all(&rejected).await?;
        if let Some(name) = path.file_name() {
            tokio::fs::rename(path, rejected.join(name)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Harvester for SpoolHarvester {
    async fn harvest(&self, destination: &DestinationConfig) -> Result<Vec<Item>> {
        let inbox = self.inbox(&destination.id);
        let mut items = Vec::new();
        let mut read = Vec::new();

        for path in Self::batch_files(&inbox).await? {
            let bytes = tokio::fs::read(&path).await?;
            let records: Vec<SpoolRecord> = match serde_json::from_slice(&bytes) {
                Ok(records) => records,
                Err(e) => {
                    log::error!(
                        "{}",
                        AppError::harvest(&destination.id, format!("{}: {e}", path.display()))
                    );
                    self.reject(&inbox, &path).await?;
                    continue;
                }
            };
            log::debug!("read {} records from {}", records.len(), path.display());
            items.extend(
                records
                    .into_iter()
                    .map(|record| Item::new(destination.id.clone(), record.content)),
            );
            read.push(path);
        }

        self.pending
            .lock()
            .await
            .insert(destination.id.clone(), read);
        Ok(items)
    }

    async fn acknowledge(&self, destination: &DestinationConfig) -> Result<()> {
        let files = self
            .pending
            .lock()
            .await
            .remove(&destination.id)
            .unwrap_or_default();
        if files.is_empty() || !self.archive {
            return Ok(());
        }

        let processed = self.inbox(&destination.id).join(PROCESSED_DIR);
        tokio::fs::create_dir_all(&processed).await?;
        for path in files {
            if let Some(name) = path.file_name() {
                tokio::fs::rename(&path, processed.join(name)).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemKind, ItemStatus};
    use tempfile::tempdir;

    fn destination(id: &str) -> DestinationConfig {
        DestinationConfig {
            id: id.into(),
            endpoint: "https://api.example.com/statuses".into(),
            access_token: "token".into(),
            access_token_env: None,
        }
    }

    #[tokio::test]
    async fn test_missing_inbox_yields_nothing() {
        let dir = tempdir().unwrap();
        let harvester = SpoolHarvester::new(dir.path());
        let items = harvester.harvest(&destination("co1")).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_reads_batches_in_name_order() {
        let dir = tempdir().unwrap();
        let inbox = dir.path().join("co1");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::write(
            inbox.join("002.json"),
            r#"[{"kind":"video","title":"v","link":"http://example.com/sm1"}]"#,
        )
        .unwrap();
        std::fs::write(
            inbox.join("001.json"),
            r#"[{"kind":"reply","number":7,"name":"a","body":"hi","status":"COMPLETED","destination":"other"}]"#,
        )
        .unwrap();
        std::fs::write(inbox.join("notes.txt"), "ignored").unwrap();

        let harvester = SpoolHarvester::new(dir.path());
        let items = harvester.harvest(&destination("co1")).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind(), ItemKind::Reply);
        assert_eq!(items[1].kind(), ItemKind::Video);
        assert!(items.iter().all(|i| i.destination == "co1"));
        assert!(items.iter().all(|i| i.status == ItemStatus::Unprocessed));
    }

    #[tokio::test]
    async fn test_acknowledge_moves_batches() {
        let dir = tempdir().unwrap();
        let inbox = dir.path().join("co1");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::write(inbox.join("001.json"), "[]").unwrap();

        let harvester = SpoolHarvester::new(dir.path());
        let dest = destination("co1");
        harvester.harvest(&dest).await.unwrap();
        harvester.acknowledge(&dest).await.unwrap();

        assert!(!inbox.join("001.json").exists());
        assert!(inbox.join("processed").join("001.json").exists());
        assert!(harvester.harvest(&dest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_keeps_batches() {
        let dir = tempdir().unwrap();
        let inbox = dir.path().join("co1");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::write(inbox.join("001.json"), "[]").unwrap();

        let harvester = SpoolHarvester::read_only(dir.path());
        let dest = destination("co1");
        harvester.harvest(&dest).await.unwrap();
        harvester.acknowledge(&dest).await.unwrap();

        assert!(inbox.join("001.json").exists());
    }

    #[tokio::test]
    async fn test_malformed_batch_is_set_aside() {
        let dir = tempdir().unwrap();
        let inbox = dir.path().join("co1");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::write(inbox.join("001.json"), "{not json").unwrap();
        std::fs::write(
            inbox.join("002.json"),
            r#"[{"kind":"video","title":"v","link":"http://example.com/sm1"}]"#,
        )
        .unwrap();

        let harvester = SpoolHarvester::new(dir.path());
        let dest = destination("co1");
        let items = harvester.harvest(&dest).await.unwrap();
        harvester.acknowledge(&dest).await.unwrap();

        assert_eq!(items.len(), 1);
        assert!(inbox.join("rejected").join("001.json").exists());
        assert!(inbox.join("processed").join("002.json").exists());
        assert!(harvester.harvest(&dest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_leaves_malformed_batch_in_place() {
        let dir = tempdir().unwrap();
        let inbox = dir.path().join("co1");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::write(inbox.join("001.json"), "{not json").unwrap();

        let harvester = SpoolHarvester::read_only(dir.path());
        let items = harvester.harvest(&destination("co1")).await.unwrap();

        assert!(items.is_empty());
        assert!(inbox.join("001.json").exists());
    }
}
