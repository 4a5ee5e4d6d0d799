//! Publisher for JSON status-update endpoints.
//!
//! Error bodies follow the common `{"errors":[{"code":..,"message":..}]}`
//! shape. Codes are classified as:
//!
//! | code / status | meaning                          | class       |
//! |---------------|----------------------------------|-------------|
//! | 187           | status is a duplicate            | `Duplicate` |
//! | 185, HTTP 429 | over daily update / rate limit   | `OverLimit` |
//! | anything else | too long (186), malformed, ...   | `Rejected`  |

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{PublishError, Result};
use crate::models::{DeliveryConfig, DestinationConfig};
use crate::publisher::Publisher;
use crate::utils::http::create_async_client;

const DUPLICATE_STATUS: i64 = 187;
const OVER_UPDATE_LIMIT: i64 = 185;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Posts `{"status": <post>}` with the destination's bearer token.
pub struct HttpPublisher {
    client: Client,
}

impl HttpPublisher {
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(
        &self,
        destination: &DestinationConfig,
        post: &str,
    ) -> std::result::Result<(), PublishError> {
        let token = destination
            .token()
            .map_err(|e| PublishError::Rejected(e.to_string()))?;

        let response = self
            .client
            .post(&destination.endpoint)
            .bearer_auth(token)
            .json(&serde_json::json!({ "status": post }))
            .send()
            .await
            .map_err(|e| PublishError::Rejected(format!("transport: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_response(status, &body))
    }
}

/// Map a failed response onto the three publish error classes.
pub fn classify_response(status: StatusCode, body: &str) -> PublishError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    for error in &parsed.errors {
        let detail = format!("status: [{}] code: [{}]", error.message, error.code);
        match error.code {
            DUPLICATE_STATUS => return PublishError::Duplicate(detail),
            OVER_UPDATE_LIMIT => return PublishError::OverLimit(detail),
            _ => {}
        }
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return PublishError::OverLimit(format!("HTTP {status}"));
    }

    match parsed.errors.first() {
        Some(error) => PublishError::Rejected(format!(
            "status: [{}] code: [{}]",
            error.message, error.code
        )),
        None => PublishError::Rejected(format!("HTTP {status}: {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_code() {
        let body = r#"{"errors":[{"message":"Status is a duplicate.","code":187}]}"#;
        assert!(matches!(
            classify_response(StatusCode::FORBIDDEN, body),
            PublishError::Duplicate(_)
        ));
    }

    #[test]
    fn test_over_limit_code() {
        let body = r#"{"errors":[{"message":"User is over daily status update limit.","code":185}]}"#;
        assert!(matches!(
            classify_response(StatusCode::FORBIDDEN, body),
            PublishError::OverLimit(_)
        ));
    }

    #[test]
    fn test_too_many_requests_without_body() {
        assert!(matches!(
            classify_response(StatusCode::TOO_MANY_REQUESTS, ""),
            PublishError::OverLimit(_)
        ));
    }

    #[test]
    fn test_too_long_is_rejected() {
        let body = r#"{"errors":[{"message":"Status is over 140 characters.","code":186}]}"#;
        let error = classify_response(StatusCode::FORBIDDEN, body);
        assert_eq!(
            error,
            PublishError::Rejected("status: [Status is over 140 characters.] code: [186]".into())
        );
    }

    #[test]
    fn test_unparseable_body_is_rejected() {
        assert!(matches!(
            classify_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>"),
            PublishError::Rejected(_)
        ));
    }

    #[test]
    fn test_duplicate_wins_over_other_codes() {
        let body = r#"{"errors":[{"message":"x","code":34},{"message":"dup","code":187}]}"#;
        assert!(matches!(
            classify_response(StatusCode::FORBIDDEN, body),
            PublishError::Duplicate(_)
        ));
    }
}
