//! Data Models
//!
//! Configuration, upload modes and history entries.

pub mod history;
pub mod settings;
pub mod upload_mode;

pub use history::*;
pub use settings::*;
pub use upload_mode::*;
