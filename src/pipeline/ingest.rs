// src/pipeline/ingest.rs

//! Registration of harvested items in the store.

use crate::error::Result;
use crate::models::{Item, ItemStatus};
use crate::storage::ItemStore;

/// Counts of one ingest run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub registered: usize,
    pub skipped: usize,
}

/// Register the items whose natural key is not yet known, as `UNPROCESSED`.
///
/// Known items are skipped so that a re-harvest never resets the status of
/// an item that has already been delivered.
pub async fn ingest(store: &dyn ItemStore, items: &[Item]) -> Result<IngestReport> {
    let mut skipped = Vec::new();
    let mut registered = Vec::new();

    for item in items {
        let key = item.key();
        if store.exists(&key).await? {
            skipped.push(key.id);
            continue;
        }

        let mut item = item.clone();
        item.status = ItemStatus::Unprocessed;
        store.upsert(&item).await?;
        registered.push(key.id);
    }

    ::log::debug!("skipped: {skipped:?}");
    ::log::debug!("registered: {registered:?}");
    if let Some(destination) = items.first().map(|i| i.destination.as_str()) {
        ::log::info!(
            "ingested {} items for {}: {} registered, {} skipped",
            items.len(),
            destination,
            registered.len(),
            skipped.len()
        );
    }

    Ok(IngestReport {
        registered: registered.len(),
        skipped: skipped.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemContent;
    use crate::storage::MemoryStore;

    fn video(link: &str, title: &str) -> Item {
        Item::new(
            "co1",
            ItemContent::Video {
                title: title.into(),
                link: link.into(),
            },
        )
    }

    #[tokio::test]
    async fn test_registers_new_items() {
        let store = MemoryStore::new();
        let items = [video("http://v/1", "a"), video("http://v/2", "b")];

        let report = ingest(&store, &items).await.unwrap();

        assert_eq!(report, IngestReport { registered: 2, skipped: 0 });
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_known_items_keep_their_status() {
        let store = MemoryStore::new();
        let mut done = video("http://v/1", "a");
        done.status = ItemStatus::Completed;
        store.upsert(&done).await.unwrap();

        let report = ingest(&store, &[video("http://v/1", "renamed")])
            .await
            .unwrap();

        assert_eq!(report, IngestReport { registered: 0, skipped: 1 });
        let stored = store.get(&done.key()).await.unwrap();
        assert_eq!(stored.status, ItemStatus::Completed);
        assert_eq!(stored, done);
    }

    #[tokio::test]
    async fn test_harvested_status_is_reset() {
        let store = MemoryStore::new();
        let mut item = video("http://v/1", "a");
        item.status = ItemStatus::Spam;

        ingest(&store, std::slice::from_ref(&item)).await.unwrap();

        let stored = store.get(&item.key()).await.unwrap();
        assert_eq!(stored.status, ItemStatus::Unprocessed);
    }
}
