//! Publisher that only logs what would be posted.

use async_trait::async_trait;

use crate::error::PublishError;
use crate::models::DestinationConfig;
use crate::publisher::Publisher;

/// Accepts every post and writes it to the log.
#[derive(Debug, Default)]
pub struct DryRunPublisher;

impl DryRunPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(
        &self,
        destination: &DestinationConfig,
        post: &str,
    ) -> std::result::Result<(), PublishError> {
        log::info!("[dry-run] {} <- [{}]", destination.id, post);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accepts_every_post() {
        let destination = DestinationConfig {
            id: "co1".into(),
            endpoint: "https://api.example.com/statuses".into(),
            access_token: String::new(),
            access_token_env: None,
        };
        let publisher = DryRunPublisher::new();
        assert_eq!(publisher.publish(&destination, "post").await, Ok(()));
    }
}
