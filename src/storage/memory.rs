//! In-memory item store for dry runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Item, ItemKey, ItemStatus};
use crate::storage::{ItemStore, delivery_order};

/// Item store kept in process memory. Items are held in creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<Vec<Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a single item by key.
    pub async fn get(&self, key: &ItemKey) -> Option<Item> {
        let items = self.items.lock().await;
        items.iter().find(|item| item.key() == *key).cloned()
    }

    /// Total number of records.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn upsert(&self, item: &Item) -> Result<()> {
        let mut items = self.items.lock().await;
        let key = item.key();
        match items.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => {
                let status = existing.status;
                *existing = item.clone();
                existing.status = status;
            }
            None => items.push(item.clone()),
        }
        Ok(())
    }

    async fn exists(&self, key: &ItemKey) -> Result<bool> {
        let items = self.items.lock().await;
        Ok(items.iter().any(|item| item.key() == *key))
    }

    async fn find_by_status(&self, destination: &str, status: ItemStatus) -> Result<Vec<Item>> {
        let items = self.items.lock().await;
        let mut found: Vec<Item> = items
            .iter()
            .filter(|item| item.destination == destination && item.status == status)
            .cloned()
            .collect();
        delivery_order(&mut found);
        Ok(found)
    }

    async fn set_status(&self, key: &ItemKey, status: ItemStatus) -> Result<()> {
        let mut items = self.items.lock().await;
        let item = items
            .iter_mut()
            .find(|item| item.key() == *key)
            .ok_or_else(|| AppError::ItemNotFound(key.to_string()))?;
        item.status = status;
        Ok(())
    }

    async fn count_by_status(&self, destination: &str) -> Result<BTreeMap<ItemStatus, usize>> {
        let items = self.items.lock().await;
        let mut counts = BTreeMap::new();
        for item in items.iter().filter(|item| item.destination == destination) {
            *counts.entry(item.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemContent;

    fn news(date: &str, title: &str) -> Item {
        Item::new(
            "co1",
            ItemContent::News {
                community_name: "テストコミュ".to_string(),
                title: title.to_string(),
                desc: "本文".to_string(),
                date: date.to_string(),
                name: Some("主".to_string()),
            },
        )
    }

    #[tokio::test]
    async fn test_upsert_same_key_keeps_one_record() {
        let store = MemoryStore::new();
        store.upsert(&news("2013/06/01", "old")).await.unwrap();
        store.upsert(&news("2013/06/01", "new")).await.unwrap();

        assert_eq!(store.len().await, 1);
        let item = store.get(&news("2013/06/01", "").key()).await.unwrap();
        assert!(matches!(item.content, ItemContent::News { ref title, .. } if title == "new"));
    }

    #[tokio::test]
    async fn test_upsert_keeps_terminal_status() {
        let store = MemoryStore::new();
        let item = news("2013/06/03", "old");
        store.upsert(&item).await.unwrap();
        store
            .set_status(&item.key(), ItemStatus::Completed)
            .await
            .unwrap();

        let mut again = news("2013/06/03", "new");
        again.status = ItemStatus::Unprocessed;
        store.upsert(&again).await.unwrap();

        let stored = store.get(&item.key()).await.unwrap();
        assert_eq!(stored.status, ItemStatus::Completed);
        assert!(matches!(stored.content, ItemContent::News { ref title, .. } if title == "new"));
    }

    #[tokio::test]
    async fn test_set_status_only_touches_status() {
        let store = MemoryStore::new();
        let item = news("2013/06/02", "title");
        store.upsert(&item).await.unwrap();
        store
            .set_status(&item.key(), ItemStatus::Completed)
            .await
            .unwrap();

        let stored = store.get(&item.key()).await.unwrap();
        assert_eq!(stored.status, ItemStatus::Completed);
        assert_eq!(stored.content, item.content);
        assert!(
            store
                .find_by_status("co1", ItemStatus::Unprocessed)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_set_status_unknown_key() {
        let store = MemoryStore::new();
        let result = store
            .set_status(&news("x", "y").key(), ItemStatus::Spam)
            .await;
        assert!(matches!(result, Err(AppError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_status_filters_destination() {
        let store = MemoryStore::new();
        store.upsert(&news("a", "t")).await.unwrap();
        let mut other = news("b", "t");
        other.destination = "co2".to_string();
        store.upsert(&other).await.unwrap();

        let found = store
            .find_by_status("co1", ItemStatus::Unprocessed)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].destination, "co1");

        let counts = store.count_by_status("co2").await.unwrap();
        assert_eq!(counts.get(&ItemStatus::Unprocessed), Some(&1));
    }
}
