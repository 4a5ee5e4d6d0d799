// src/pipeline/filter.rs

//! Content filter applied before segmentation.

use std::collections::HashSet;

use regex::Regex;

use crate::error::Result;
use crate::models::FilterConfig;
use crate::segment::compile;

/// Why an item was classified as spam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpamReason {
    /// Matched a denylist pattern
    Denylisted(String),
    /// Referenced too many distinct ids of one class
    TooManyReferences { pattern: String, count: usize },
}

impl std::fmt::Display for SpamReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpamReason::Denylisted(pattern) => write!(f, "denylisted by '{pattern}'"),
            SpamReason::TooManyReferences { pattern, count } => {
                write!(f, "{count} distinct references matching '{pattern}'")
            }
        }
    }
}

/// Compiled denylist and cross-reference rules.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    denylist: Vec<Regex>,
    cross_references: Vec<Regex>,
    max_cross_references: usize,
}

impl ContentFilter {
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Ok(Self {
            denylist: config
                .denylist
                .iter()
                .map(|p| compile(p))
                .collect::<Result<_>>()?,
            cross_references: config
                .cross_reference_patterns
                .iter()
                .map(|p| compile(p))
                .collect::<Result<_>>()?,
            max_cross_references: config.max_cross_references,
        })
    }

    /// `Some(reason)` when `text` must not be published.
    pub fn check(&self, text: &str) -> Option<SpamReason> {
        if let Some(re) = self.denylist.iter().find(|re| re.is_match(text)) {
            return Some(SpamReason::Denylisted(re.as_str().to_string()));
        }

        self.cross_references.iter().find_map(|re| {
            let distinct: HashSet<&str> = re.find_iter(text).map(|m| m.as_str()).collect();
            (distinct.len() > self.max_cross_references).then(|| SpamReason::TooManyReferences {
                pattern: re.as_str().to_string(),
                count: distinct.len(),
            })
        })
    }
}
