//! Services
//!
//! Controllers for upload mode, analysis lifecycle and AI summaries, plus the
//! workbench facade that ties them together.

pub mod analysis;
pub mod summary;
pub mod upload_mode;
pub mod workbench;

pub use analysis::{AnalysisLifecycleController, AnalysisSnapshot, LifecyclePhase};
pub use summary::{SummarySession, SummaryState, SummaryStreamClient, SummaryView};
pub use upload_mode::{HistoricalSelection, UploadModeController};
pub use workbench::{CurrentResult, ScanWorkbench, UploadOutcome};
