//! Application configuration structures.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Item store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Harvest inbox and crawl interval
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Publishing behavior
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Post length limits and continuation marks
    #[serde(default)]
    pub segment: SegmentConfig,

    /// Content filter rules
    #[serde(default)]
    pub filter: FilterConfig,

    /// Per-kind message templates
    #[serde(default)]
    pub templates: TemplateConfig,

    /// Publication targets
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.delivery.user_agent.trim().is_empty() {
            return Err(AppError::validation("delivery.user_agent is empty"));
        }
        if self.delivery.timeout_secs == 0 {
            return Err(AppError::validation("delivery.timeout_secs must be > 0"));
        }
        if self.delivery.max_concurrent_destinations == 0 {
            return Err(AppError::validation(
                "delivery.max_concurrent_destinations must be > 0",
            ));
        }
        if self.delivery.limit == Some(0) {
            return Err(AppError::validation("delivery.limit must be > 0 when set"));
        }
        if self.segment.max_length <= self.segment.link_length {
            return Err(AppError::validation(
                "segment.max_length must be greater than segment.link_length",
            ));
        }
        for pattern in self
            .filter
            .denylist
            .iter()
            .chain(&self.filter.cross_reference_patterns)
        {
            Regex::new(pattern).map_err(|e| AppError::pattern(pattern, e))?;
        }

        let mut seen = HashSet::new();
        for destination in &self.destinations {
            if destination.id.trim().is_empty() {
                return Err(AppError::validation("destination id is empty"));
            }
            if destination.id.contains(['/', '\\']) || destination.id.starts_with('.') {
                return Err(AppError::validation(format!(
                    "destination id '{}' is not usable as a directory name",
                    destination.id
                )));
            }
            if !seen.insert(destination.id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate destination id '{}'",
                    destination.id
                )));
            }
            url::Url::parse(&destination.endpoint)?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            harvest: HarvestConfig::default(),
            delivery: DeliveryConfig::default(),
            segment: SegmentConfig::default(),
            filter: FilterConfig::default(),
            templates: TemplateConfig::default(),
            destinations: Vec::new(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level: debug, info, warn or error
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Item store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local item store
    #[serde(default = "defaults::storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: defaults::storage_root(),
        }
    }
}

/// Harvest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Directory the external scraper drops item batches into
    #[serde(default = "defaults::spool_dir")]
    pub spool_dir: PathBuf,

    /// Seconds to wait between relay rounds
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,
}

impl HarvestConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            spool_dir: defaults::spool_dir(),
            interval_secs: defaults::interval(),
        }
    }
}

/// Publishing behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Minimum delay between two consecutive posts, in seconds
    #[serde(default = "defaults::pacing")]
    pub pacing_secs: u64,

    /// Maximum successful posts per pass (unbounded when absent)
    #[serde(default)]
    pub limit: Option<usize>,

    /// Destinations processed at the same time
    #[serde(default = "defaults::max_concurrent_destinations")]
    pub max_concurrent_destinations: usize,

    /// User-Agent header for publisher requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Publisher request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl DeliveryConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            pacing_secs: defaults::pacing(),
            limit: None,
            max_concurrent_destinations: defaults::max_concurrent_destinations(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Post length limits and continuation marks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Maximum counted length of a post
    #[serde(default = "defaults::max_length")]
    pub max_length: usize,

    /// Counted length of any link after provider shortening
    #[serde(default = "defaults::link_length")]
    pub link_length: usize,

    /// Placed after the header of every post but the first
    #[serde(default = "defaults::continued_mark")]
    pub continued_mark: String,

    /// Placed at the end of every post but the last
    #[serde(default = "defaults::continue_mark")]
    pub continue_mark: String,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_length: defaults::max_length(),
            link_length: defaults::link_length(),
            continued_mark: defaults::continued_mark(),
            continue_mark: defaults::continue_mark(),
        }
    }
}

/// Content filter rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Regular expressions; a match anywhere marks the item as spam
    #[serde(default)]
    pub denylist: Vec<String>,

    /// Distinct references of one class allowed before an item is spam
    #[serde(default = "defaults::max_cross_references")]
    pub max_cross_references: usize,

    /// One regular expression per content-identifier class
    #[serde(default = "defaults::cross_reference_patterns")]
    pub cross_reference_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            denylist: Vec::new(),
            max_cross_references: defaults::max_cross_references(),
            cross_reference_patterns: defaults::cross_reference_patterns(),
        }
    }
}

/// Message templates.
///
/// Supported placeholders:
/// - reply: `{name}`, `{number}`, `{date}`, `{hash}`
/// - broadcast: `{community_name}`, `{title}`, `{date}`, `{link}`
/// - news: `{community_name}`, `{title}`, `{name}`, `{date}`
/// - video: `{title}`, `{link}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "defaults::reply_header")]
    pub reply_header: String,

    #[serde(default)]
    pub broadcast_header: String,

    #[serde(default = "defaults::broadcast_body")]
    pub broadcast_body: String,

    #[serde(default = "defaults::news_header")]
    pub news_header: String,

    #[serde(default = "defaults::video_header")]
    pub video_header: String,

    #[serde(default = "defaults::video_body")]
    pub video_body: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            reply_header: defaults::reply_header(),
            broadcast_header: String::new(),
            broadcast_body: defaults::broadcast_body(),
            news_header: defaults::news_header(),
            video_header: defaults::video_header(),
            video_body: defaults::video_body(),
        }
    }
}

/// A publication target and its credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Identifier shared by the harvested items (e.g. the community id)
    pub id: String,

    /// Status update endpoint of the publisher
    pub endpoint: String,

    /// Bearer token for the endpoint
    #[serde(default)]
    pub access_token: String,

    /// Environment variable that overrides `access_token`
    #[serde(default)]
    pub access_token_env: Option<String>,
}

impl DestinationConfig {
    /// Resolve the access token, preferring the environment variable.
    pub fn token(&self) -> Result<String> {
        if let Some(var) = &self.access_token_env {
            if let Ok(token) = std::env::var(var) {
                return Ok(token);
            }
        }
        if self.access_token.is_empty() {
            return Err(AppError::config(format!(
                "No access token configured for destination '{}'",
                self.id
            )));
        }
        Ok(self.access_token.clone())
    }
}

impl fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("access_token", &"xxxxxxxxxx")
            .field("access_token_env", &self.access_token_env)
            .finish()
    }
}

mod defaults {
    use std::path::PathBuf;

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }

    // Storage defaults
    pub fn storage_root() -> PathBuf {
        PathBuf::from("storage")
    }

    // Harvest defaults
    pub fn spool_dir() -> PathBuf {
        PathBuf::from("spool")
    }
    pub fn interval() -> u64 {
        30
    }

    // Delivery defaults
    pub fn pacing() -> u64 {
        3
    }
    pub fn max_concurrent_destinations() -> usize {
        1
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; relay/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Segment defaults
    pub fn max_length() -> usize {
        140
    }
    pub fn link_length() -> usize {
        23
    }
    pub fn continued_mark() -> String {
        "[続き]\n".into()
    }
    pub fn continue_mark() -> String {
        "\n[続く]".into()
    }

    // Filter defaults
    pub fn max_cross_references() -> usize {
        5
    }
    pub fn cross_reference_patterns() -> Vec<String> {
        vec![r"sm[0-9]{5,}".into(), r"co[0-9]{5,}".into()]
    }

    // Template defaults
    pub fn reply_header() -> String {
        "({name})\n".into()
    }
    pub fn broadcast_body() -> String {
        "【放送予約】「{community_name}」で生放送「{title}」が予約されました。{date} {link}".into()
    }
    pub fn news_header() -> String {
        "【お知らせ更新】\n「{title}」({name})\n\n".into()
    }
    pub fn video_header() -> String {
        "【コミュニティ動画投稿】".into()
    }
    pub fn video_body() -> String {
        "動画「{title}」が投稿されました。{link}".into()
    }
}
