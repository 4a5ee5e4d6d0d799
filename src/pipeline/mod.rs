// src/pipeline/mod.rs

//! Content delivery pipeline.
//!
//! - `filter`: denylist and cross-reference checks
//! - `compose`: per-kind message building from templates
//! - `ingest`: registration of harvested items
//! - `deliver`: the per-destination delivery driver
//! - `run`: the relay loop tying harvest, ingest and delivery together

pub mod compose;
pub mod deliver;
pub mod filter;
pub mod ingest;
pub mod run;

pub use compose::{Composer, Message};
pub use deliver::{DeliveryDriver, ItemOutcome, PassOutcome, PassReport};
pub use filter::{ContentFilter, SpamReason};
pub use ingest::{IngestReport, ingest};
pub use run::{RelayOptions, collect, run_relay, run_round};
