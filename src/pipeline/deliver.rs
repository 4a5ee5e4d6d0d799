// src/pipeline/deliver.rs

//! Delivery driver: turns the `UNPROCESSED` backlog of a destination into
//! published posts and writes back the resulting status.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{AppError, PublishError, Result};
use crate::models::{Config, DestinationConfig, Item, ItemKey, ItemStatus};
use crate::pipeline::compose::Composer;
use crate::pipeline::filter::ContentFilter;
use crate::publisher::Publisher;
use crate::segment::Segmenter;
use crate::storage::ItemStore;
use crate::utils::log;

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every eligible item was handled
    Drained,
    /// The submission limit was reached at an item boundary
    LimitReached,
    /// The provider reported an exhausted quota; the rest waits for the next pass
    QuotaExhausted,
}

impl fmt::Display for PassOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PassOutcome::Drained => "drained",
            PassOutcome::LimitReached => "limit reached",
            PassOutcome::QuotaExhausted => "quota exhausted",
        })
    }
}

/// Result of delivering a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// All posts accepted, now `COMPLETED`
    Completed,
    /// Rejected by the content filter, now `SPAM`
    Spam,
    /// The provider already had the text, now `DUPLICATE`
    Duplicate,
    /// Rejected or unsegmentable, left `UNPROCESSED`
    Skipped,
    /// Over the provider quota, left `UNPROCESSED`
    QuotaExhausted,
    /// Already terminal, nothing done
    Unchanged,
}

/// Summary of one pass over a destination's backlog.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub destination: String,
    pub backlog: usize,
    pub completed: usize,
    pub spam: usize,
    pub duplicate: usize,
    pub skipped: usize,
    /// Posts accepted by the provider
    pub submissions: usize,
    pub outcome: PassOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassReport {
    fn start(destination: &str, backlog: usize) -> Self {
        let now = Utc::now();
        Self {
            destination: destination.to_string(),
            backlog,
            completed: 0,
            spam: 0,
            duplicate: 0,
            skipped: 0,
            submissions: 0,
            outcome: PassOutcome::Drained,
            started_at: now,
            finished_at: now,
        }
    }

    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Completed => self.completed += 1,
            ItemOutcome::Spam => self.spam += 1,
            ItemOutcome::Duplicate => self.duplicate += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::QuotaExhausted | ItemOutcome::Unchanged => {}
        }
    }

    pub fn log_summary(&self) {
        let elapsed = self.finished_at - self.started_at;
        log::summary(
            &format!("delivery pass for {}", self.destination),
            &[
                ("outcome", self.outcome.to_string()),
                ("backlog", self.backlog.to_string()),
                ("completed", self.completed.to_string()),
                ("spam", self.spam.to_string()),
                ("duplicate", self.duplicate.to_string()),
                ("skipped", self.skipped.to_string()),
                ("posts", self.submissions.to_string()),
                ("elapsed", format!("{}ms", elapsed.num_milliseconds())),
            ],
        );
    }
}

/// Counters local to one pass.
#[derive(Debug, Default)]
struct PassState {
    /// Publisher calls made, successful or not
    attempts: usize,
    /// Posts accepted
    submissions: usize,
}

/// Publishes the backlog of a destination, one item and one post at a time.
pub struct DeliveryDriver<'a> {
    store: &'a dyn ItemStore,
    publisher: &'a dyn Publisher,
    segmenter: Segmenter,
    filter: ContentFilter,
    composer: Composer,
    pacing: Duration,
}

impl<'a> DeliveryDriver<'a> {
    pub fn new(
        config: &Config,
        store: &'a dyn ItemStore,
        publisher: &'a dyn Publisher,
    ) -> Result<Self> {
        Ok(Self {
            store,
            publisher,
            segmenter: Segmenter::from_config(&config.segment)?,
            filter: ContentFilter::from_config(&config.filter)?,
            composer: Composer::new(&config.templates, &config.segment),
            pacing: config.delivery.pacing(),
        })
    }

    /// Run one pass over the `UNPROCESSED` items of `destination`.
    ///
    /// `limit` bounds the accepted posts of the pass and is checked before
    /// each item, so a multi-post item is never cut short by it. Store
    /// failures abort the pass with an error.
    pub async fn run_pass(
        &self,
        destination: &DestinationConfig,
        limit: Option<usize>,
    ) -> Result<PassReport> {
        let items = self
            .store
            .find_by_status(&destination.id, ItemStatus::Unprocessed)
            .await?;
        ::log::info!(
            "processing destination: {} unprocessed: {}",
            destination.id,
            items.len()
        );

        let mut report = PassReport::start(&destination.id, items.len());
        let mut state = PassState::default();

        for item in &items {
            if let Some(limit) = limit {
                if state.submissions >= limit {
                    ::log::info!(
                        "breaking delivery, limit: {} posts: {}",
                        limit,
                        state.submissions
                    );
                    report.outcome = PassOutcome::LimitReached;
                    break;
                }
            }

            let outcome = self.deliver(destination, item, &mut state).await?;
            report.record(outcome);
            if outcome == ItemOutcome::QuotaExhausted {
                report.outcome = PassOutcome::QuotaExhausted;
                break;
            }
        }

        report.submissions = state.submissions;
        report.finished_at = Utc::now();
        Ok(report)
    }

    /// Deliver a single item. Terminal items are left untouched.
    pub async fn deliver_item(
        &self,
        destination: &DestinationConfig,
        item: &Item,
    ) -> Result<ItemOutcome> {
        self.deliver(destination, item, &mut PassState::default())
            .await
    }

    async fn deliver(
        &self,
        destination: &DestinationConfig,
        item: &Item,
        state: &mut PassState,
    ) -> Result<ItemOutcome> {
        let key = item.key();
        if item.status.is_terminal() {
            ::log::debug!("{key} is already {}, nothing to do", item.status);
            return Ok(ItemOutcome::Unchanged);
        }
        ::log::debug!("processing {key}");

        let message = self.composer.compose(item);
        if let Some(reason) = self.filter.check(&message.body) {
            ::log::info!("{key} is spam ({reason}), skipping: [{}]", message.body);
            self.write_status(item, &key, ItemStatus::Spam).await?;
            return Ok(ItemOutcome::Spam);
        }

        let posts = match self.segmenter.segment(
            &message.header,
            &message.continued_mark,
            &message.body,
            &message.continue_mark,
        ) {
            Ok(posts) => posts,
            Err(e @ AppError::NoBudget { .. }) => {
                ::log::error!("{key} cannot be segmented: {e}");
                return Ok(ItemOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        for post in &posts {
            if state.attempts > 0 && !self.pacing.is_zero() {
                ::log::debug!("sleeping {:?} before next post...", self.pacing);
                tokio::time::sleep(self.pacing).await;
            }
            state.attempts += 1;

            match self.publisher.publish(destination, post).await {
                Ok(()) => {
                    state.submissions += 1;
                    ::log::info!("status updated: [{post}]");
                }
                Err(PublishError::Duplicate(detail)) => {
                    ::log::error!("status update error for {key}, duplicate: {detail}");
                    self.write_status(item, &key, ItemStatus::Duplicate).await?;
                    return Ok(ItemOutcome::Duplicate);
                }
                Err(PublishError::OverLimit(detail)) => {
                    ::log::warn!("status update error for {key}, over limit: {detail}");
                    return Ok(ItemOutcome::QuotaExhausted);
                }
                Err(PublishError::Rejected(detail)) => {
                    ::log::error!("status update error for {key}, unknown: {detail}");
                    return Ok(ItemOutcome::Skipped);
                }
            }
        }

        self.write_status(item, &key, ItemStatus::Completed).await?;
        Ok(ItemOutcome::Completed)
    }

    async fn write_status(&self, item: &Item, key: &ItemKey, next: ItemStatus) -> Result<()> {
        let next = item.status.transition(key, next)?;
        self.store.set_status(key, next).await
    }
}
