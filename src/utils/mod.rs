//! Utilities
//!
//! Common utilities used throughout the application.

pub mod formatters;
pub mod logging;
pub mod paths;

pub use formatters::*;
pub use logging::init_logging;
pub use paths::*;
