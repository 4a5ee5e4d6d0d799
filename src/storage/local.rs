//! Local filesystem storage implementation.
//!
//! Keeps one JSON array per destination and item kind. Each array is in
//! creation order; updates rewrite the file atomically.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── items/
//!     └── {destination}/
//!         └── {kind}.json
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Item, ItemKey, ItemKind, ItemStatus};
use crate::storage::{ItemStore, delivery_order};

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    // Serializes read-modify-write cycles on the item files.
    write_lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Items file key for a destination and kind.
    fn items_key(destination: &str, kind: ItemKind) -> String {
        format!("items/{}/{}.json", destination, kind)
    }

    async fn load_items(&self, destination: &str, kind: ItemKind) -> Result<Vec<Item>> {
        Ok(self
            .read_json(&Self::items_key(destination, kind))
            .await?
            .unwrap_or_default())
    }

    async fn save_items(&self, destination: &str, kind: ItemKind, items: &[Item]) -> Result<()> {
        self.write_json(&Self::items_key(destination, kind), items)
            .await
    }
}

#[async_trait]
impl ItemStore for LocalStorage {
    async fn upsert(&self, item: &Item) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = item.key();
        let mut items = self.load_items(&key.destination, key.kind).await?;

        match items.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => {
                let status = existing.status;
                *existing = item.clone();
                existing.status = status;
            }
            None => items.push(item.clone()),
        }

        self.save_items(&key.destination, key.kind, &items).await
    }

    async fn exists(&self, key: &ItemKey) -> Result<bool> {
        let items = self.load_items(&key.destination, key.kind).await?;
        Ok(items.iter().any(|item| item.key() == *key))
    }

    async fn find_by_status(&self, destination: &str, status: ItemStatus) -> Result<Vec<Item>> {
        let mut found = Vec::new();
        for kind in ItemKind::ALL {
            let items = self.load_items(destination, kind).await?;
            found.extend(items.into_iter().filter(|item| item.status == status));
        }
        delivery_order(&mut found);
        Ok(found)
    }

    async fn set_status(&self, key: &ItemKey, status: ItemStatus) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load_items(&key.destination, key.kind).await?;

        let item = items
            .iter_mut()
            .find(|item| item.key() == *key)
            .ok_or_else(|| AppError::ItemNotFound(key.to_string()))?;
        item.status = status;

        self.save_items(&key.destination, key.kind, &items).await
    }

    async fn count_by_status(&self, destination: &str) -> Result<BTreeMap<ItemStatus, usize>> {
        let mut counts = BTreeMap::new();
        for kind in ItemKind::ALL {
            for item in self.load_items(destination, kind).await? {
                *counts.entry(item.status).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}
