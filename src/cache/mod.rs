//! Cache module for storing fetched prayer times on disk
//!
//! This module provides an append-only store of daily schedules in a single
//! flat file, either CSV (one row per day) or a JSON array of API-shaped day
//! records. Lookups scan every record and the last one for a date wins.

mod csv;
mod store;

pub use store::{cache_key, CacheError, CacheFormat, CacheStore};
