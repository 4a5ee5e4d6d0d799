// src/lib.rs

//! Relay Library
//!
//! Harvested community content is registered in an item store and
//! re-published as length-limited posts, each item exactly once.

pub mod error;
pub mod harvest;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod segment;
pub mod storage;
pub mod utils;
