pub mod api;
pub mod cache;
pub mod config;
pub mod observability;
pub mod stats;
pub mod storage;
