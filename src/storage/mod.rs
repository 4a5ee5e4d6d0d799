//! Storage abstractions for item bookkeeping.
//!
//! The store records every harvested item with its processing status. It
//! carries no business logic: the delivery driver decides transitions, the
//! store only persists them.
//!
//! ## Directory Structure (local backend)
//!
//! ```text
//! storage/
//! └── items/
//!     └── {destination}/
//!         ├── reply.json
//!         ├── broadcast.json
//!         ├── news.json
//!         └── video.json
//! ```

pub mod local;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Item, ItemKey, ItemStatus};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStore;

/// Trait for item store backends.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert the item, or replace the fields of the item with the same
    /// natural key. A recorded item keeps its stored status.
    async fn upsert(&self, item: &Item) -> Result<()>;

    /// Whether an item with this natural key is recorded.
    async fn exists(&self, key: &ItemKey) -> Result<bool>;

    /// Items of a destination with the given status, in delivery order.
    async fn find_by_status(&self, destination: &str, status: ItemStatus) -> Result<Vec<Item>>;

    /// Overwrite the status of a recorded item, leaving other fields alone.
    async fn set_status(&self, key: &ItemKey, status: ItemStatus) -> Result<()>;

    /// Number of items per status for a destination.
    async fn count_by_status(&self, destination: &str) -> Result<BTreeMap<ItemStatus, usize>>;
}

/// Sort items into delivery order: by kind, then by sequence number where the
/// kind has one. The sort is stable, so creation order is kept otherwise.
pub fn delivery_order(items: &mut [Item]) {
    items.sort_by_key(|item| (item.kind(), item.sequence().unwrap_or(0)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemContent;

    #[test]
    fn test_delivery_order() {
        let video = |title: &str| {
            Item::new(
                "co1",
                ItemContent::Video {
                    title: title.to_string(),
                    link: format!("http://example.com/{title}"),
                },
            )
        };
        let reply = |number: u64| {
            Item::new(
                "co1",
                ItemContent::Reply {
                    number,
                    name: "n".to_string(),
                    date: String::new(),
                    hash: String::new(),
                    body: "b".to_string(),
                },
            )
        };

        let mut items = vec![video("b"), reply(10), video("a"), reply(2)];
        delivery_order(&mut items);

        let keys: Vec<String> = items.iter().map(|i| i.key().id).collect();
        assert_eq!(
            keys,
            vec!["2", "10", "http://example.com/b", "http://example.com/a"]
        );
    }
}
