//! Metric records over HTTP, with optional unit conversion and a TTL
//! response cache in front of the SQLite store.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod init;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod shaper;
pub mod stats;
pub mod store;
pub mod units;
