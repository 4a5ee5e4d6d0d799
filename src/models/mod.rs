// src/models/mod.rs

//! Domain models for the relay.
//!
//! This module contains the harvested item model and the configuration
//! structures shared across the application.

mod config;
mod item;

// Re-export all public types
pub use config::{
    Config, DeliveryConfig, DestinationConfig, FilterConfig, HarvestConfig, LoggingConfig,
    SegmentConfig, StorageConfig, TemplateConfig,
};
pub use item::{Item, ItemContent, ItemKey, ItemKind, ItemStatus};
