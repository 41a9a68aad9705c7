//! scanlens - Threat Scanning Client Library
//!
//! Client core for a multi-engine file scanning service. It includes:
//! - Upload mode and analysis lifecycle controllers
//! - Streaming AI summaries with a process-lifetime cache
//! - Scan history and the workbench facade over all of the above
//! - Configuration storage, logging setup and display formatters
//!
//! Result types and threat derivation live in `scanlens-core`; the transport
//! lives in `scanlens-client`.

pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::history::FileHistoryEntry;
pub use models::settings::{ScannerConfig, SettingsUpdate};
pub use models::upload_mode::UploadMode;
pub use services::{
    AnalysisLifecycleController, AnalysisSnapshot, CurrentResult, LifecyclePhase, ScanWorkbench,
    SummarySession, SummaryState, SummaryStreamClient, SummaryView, UploadModeController,
    UploadOutcome,
};
pub use state::AppState;
pub use storage::{ConfigService, ScanHistoryStore, SummaryCache};
