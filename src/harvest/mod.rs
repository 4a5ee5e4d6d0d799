//! Sources of harvested items.
//!
//! Scraping the community pages is done by an external process; this crate
//! only consumes what it produces.

mod spool;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DestinationConfig, Item};

pub use spool::SpoolHarvester;

/// Produces raw items for one destination.
#[async_trait]
pub trait Harvester: Send + Sync {
    /// Items currently available for `destination`, in source order, all
    /// `UNPROCESSED` and tagged with the destination id.
    async fn harvest(&self, destination: &DestinationConfig) -> Result<Vec<Item>>;

    /// Called once the harvested items are safely in the store.
    async fn acknowledge(&self, _destination: &DestinationConfig) -> Result<()> {
        Ok(())
    }
}
