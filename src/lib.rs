//! Data layer for the PCDB terminal client: a typed client for the inventory
//! API and the query cache that keeps its results in sync.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
