//! Publishing of finished posts to a destination.
//!
//! - `HttpPublisher`: posts to the destination's status endpoint
//! - `DryRunPublisher`: logs posts without sending them

mod dry_run;
mod http;

use async_trait::async_trait;

use crate::error::PublishError;
use crate::models::DestinationConfig;

pub use dry_run::DryRunPublisher;
pub use http::{HttpPublisher, classify_response};

/// Accepts one finished post at a time.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        destination: &DestinationConfig,
        post: &str,
    ) -> std::result::Result<(), PublishError>;
}
