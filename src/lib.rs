// Kagami page routing and incremental page cache library

pub mod admin;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod page;
pub mod pipeline;
pub mod regeneration; // Background regeneration dedup
pub mod render;
pub mod router;
