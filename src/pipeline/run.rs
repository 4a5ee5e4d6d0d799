// src/pipeline/run.rs

//! The relay loop: harvest, ingest and deliver for every destination.

use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::harvest::Harvester;
use crate::models::{Config, DestinationConfig};
use crate::pipeline::deliver::{DeliveryDriver, PassOutcome, PassReport};
use crate::pipeline::ingest::{IngestReport, ingest};
use crate::publisher::Publisher;
use crate::storage::ItemStore;
use crate::utils::log;

/// Options of a relay run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayOptions {
    /// Run a single round instead of looping
    pub once: bool,
    /// Accepted posts per pass; overrides `delivery.limit`
    pub limit: Option<usize>,
}

/// Relay items until stopped, or for one round when `once` or a limit is
/// set.
pub async fn run_relay(
    config: &Config,
    store: &dyn ItemStore,
    harvester: &dyn Harvester,
    publisher: &dyn Publisher,
    options: RelayOptions,
) -> Result<()> {
    let driver = DeliveryDriver::new(config, store, publisher)?;
    let limit = options.limit.or(config.delivery.limit);

    log::header("Relay starting");
    ::log::info!(
        "{} destinations, pacing {}s, interval {}s",
        config.destinations.len(),
        config.delivery.pacing_secs,
        config.harvest.interval_secs
    );

    loop {
        run_round(config, &driver, store, harvester, limit).await;

        if options.once || limit.is_some() {
            break;
        }
        ::log::debug!("sleeping {}s until next round...", config.harvest.interval_secs);
        tokio::time::sleep(config.harvest.interval()).await;
    }

    Ok(())
}

/// One round over all destinations. Failures are logged per destination and
/// never stop the others.
pub async fn run_round(
    config: &Config,
    driver: &DeliveryDriver<'_>,
    store: &dyn ItemStore,
    harvester: &dyn Harvester,
    limit: Option<usize>,
) -> Vec<PassReport> {
    let concurrency = config.delivery.max_concurrent_destinations.max(1);
    let mut passes = stream::iter(&config.destinations)
        .map(|destination| async move {
            let result = relay_destination(destination, driver, store, harvester, limit).await;
            (destination, result)
        })
        .buffer_unordered(concurrency);

    let mut reports = Vec::new();
    while let Some((destination, result)) = passes.next().await {
        match result {
            Ok(report) => {
                if report.outcome == PassOutcome::QuotaExhausted {
                    ::log::warn!(
                        "{}: provider quota exhausted, resuming next round",
                        destination.id
                    );
                }
                report.log_summary();
                reports.push(report);
            }
            Err(e) => ::log::error!("caught error when processing {}: {e}", destination.id),
        }
    }
    reports
}

/// Harvest and register new items for one destination without delivering.
pub async fn collect(
    destination: &DestinationConfig,
    store: &dyn ItemStore,
    harvester: &dyn Harvester,
) -> Result<IngestReport> {
    ::log::info!("*** harvesting destination: {}", destination.id);
    let items = harvester.harvest(destination).await?;
    let report = ingest(store, &items).await?;
    harvester.acknowledge(destination).await?;
    Ok(report)
}

async fn relay_destination(
    destination: &DestinationConfig,
    driver: &DeliveryDriver<'_>,
    store: &dyn ItemStore,
    harvester: &dyn Harvester,
    limit: Option<usize>,
) -> Result<PassReport> {
    collect(destination, store, harvester).await?;
    driver.run_pass(destination, limit).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AppError, PublishError};
    use crate::models::{DeliveryConfig, Item, ItemContent, ItemStatus};
    use crate::storage::MemoryStore;

    struct FixedHarvester {
        items: Vec<Item>,
        failing: &'static str,
    }

    #[async_trait]
    impl Harvester for FixedHarvester {
        async fn harvest(&self, destination: &DestinationConfig) -> Result<Vec<Item>> {
            if destination.id == self.failing {
                return Err(AppError::harvest(&destination.id, "unreachable"));
            }
            Ok(self
                .items
                .iter()
                .filter(|i| i.destination == destination.id)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct CountingPublisher {
        posts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Publisher for CountingPublisher {
        async fn publish(
            &self,
            destination: &DestinationConfig,
            post: &str,
        ) -> std::result::Result<(), PublishError> {
            self.posts
                .lock()
                .unwrap()
                .push((destination.id.clone(), post.to_string()));
            Ok(())
        }
    }

    fn destination(id: &str) -> DestinationConfig {
        DestinationConfig {
            id: id.into(),
            endpoint: "https://api.example.com/statuses".into(),
            access_token: "token".into(),
            access_token_env: None,
        }
    }

    fn video(destination: &str, n: u32) -> Item {
        Item::new(
            destination,
            ItemContent::Video {
                title: format!("v{n}"),
                link: format!("http://video.example.com/sm{n}"),
            },
        )
    }

    fn config(ids: &[&str]) -> Config {
        Config {
            delivery: DeliveryConfig {
                pacing_secs: 0,
                max_concurrent_destinations: 2,
                ..DeliveryConfig::default()
            },
            destinations: ids.iter().map(|id| destination(id)).collect(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_single_round_relays_every_destination() {
        let config = config(&["co1", "co2"]);
        let store = MemoryStore::new();
        let harvester = FixedHarvester {
            items: vec![video("co1", 1), video("co2", 2), video("co2", 3)],
            failing: "",
        };
        let publisher = CountingPublisher::default();
        let options = RelayOptions {
            once: true,
            limit: None,
        };

        run_relay(&config, &store, &harvester, &publisher, options)
            .await
            .unwrap();

        assert_eq!(publisher.posts.lock().unwrap().len(), 3);
        let done = store.find_by_status("co2", ItemStatus::Completed).await.unwrap();
        assert_eq!(done.len(), 2);
    }

    #[tokio::test]
    async fn test_harvest_failure_only_affects_its_destination() {
        let config = config(&["co1", "co2"]);
        let store = MemoryStore::new();
        let harvester = FixedHarvester {
            items: vec![video("co1", 1), video("co2", 2)],
            failing: "co1",
        };
        let publisher = CountingPublisher::default();
        let driver = DeliveryDriver::new(&config, &store, &publisher).unwrap();

        let reports = run_round(&config, &driver, &store, &harvester, None).await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].destination, "co2");
        let posts = publisher.posts.lock().unwrap();
        assert!(posts.iter().all(|(dest, _)| dest == "co2"));
    }

    #[tokio::test]
    async fn test_second_round_does_not_repost() {
        let config = config(&["co1"]);
        let store = MemoryStore::new();
        let harvester = FixedHarvester {
            items: vec![video("co1", 1)],
            failing: "",
        };
        let publisher = CountingPublisher::default();
        let driver = DeliveryDriver::new(&config, &store, &publisher).unwrap();

        run_round(&config, &driver, &store, &harvester, None).await;
        let reports = run_round(&config, &driver, &store, &harvester, None).await;

        assert_eq!(publisher.posts.lock().unwrap().len(), 1);
        assert_eq!(reports[0].backlog, 0);
    }
}
