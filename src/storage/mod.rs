//! Storage Layer
//!
//! JSON config on disk, plus the in-memory scan history and summary cache.

pub mod config;
pub mod history;
pub mod summary_cache;

pub use config::*;
pub use history::*;
pub use summary_cache::*;
