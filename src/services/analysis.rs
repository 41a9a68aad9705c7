//! Analysis Lifecycle Controller
//!
//! Tracks a single multi-engine analysis from submission to completion.
//! There is no polling timer: callers drive progress with [`refresh`], and
//! concurrent refreshes share one in-flight fetch.
//!
//! [`refresh`]: AnalysisLifecycleController::refresh

use std::sync::{Arc, Mutex as StdMutex};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use scanlens_client::{FileUpload, ScanBackend};
use scanlens_core::{AnalysisObject, AnalysisStatus, CoreError, CoreResult};

use crate::models::upload_mode::UploadMode;
use crate::services::upload_mode::UploadModeController;

/// Where the tracked analysis is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Nothing tracked
    Idle,
    /// Upload in progress
    Submitting,
    /// Upstream has not finished; refresh to advance
    Pending { status: AnalysisStatus },
    /// Final result held. `from_cache` when upstream already had it.
    Completed { from_cache: bool },
}

impl LifecyclePhase {
    fn for_analysis(analysis: &AnalysisObject, from_cache: bool) -> Self {
        match analysis.status() {
            AnalysisStatus::Completed => LifecyclePhase::Completed { from_cache },
            status => LifecyclePhase::Pending { status },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, LifecyclePhase::Completed { .. })
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub uuid: Option<String>,
    pub filename: Option<String>,
    pub analysis: Option<AnalysisObject>,
    pub phase: LifecyclePhase,
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self {
            uuid: None,
            filename: None,
            analysis: None,
            phase: LifecyclePhase::Idle,
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, CoreResult<AnalysisObject>>>;

struct InFlight {
    uuid: String,
    fetch: SharedFetch,
    /// Callers currently awaiting `fetch`
    waiters: usize,
}

type InFlightSlot = StdMutex<Option<InFlight>>;

/// Releases one waiter of an in-flight refresh. The slot is emptied once the
/// fetch has finished or its last waiter has gone, so an abandoned fetch is
/// never joined later.
struct RefreshGuard<'a> {
    slot: &'a InFlightSlot,
    fetch: SharedFetch,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut slot) = self.slot.lock() else {
            return;
        };
        if let Some(current) = slot.as_mut() {
            if current.fetch.ptr_eq(&self.fetch) {
                current.waiters = current.waiters.saturating_sub(1);
                if current.waiters == 0 || current.fetch.peek().is_some() {
                    slot.take();
                }
            }
        }
    }
}

fn release_slot(slot: &InFlightSlot) {
    if let Ok(mut slot) = slot.lock() {
        slot.take();
    }
}

/// Submission and refresh of full-mode analyses.
pub struct AnalysisLifecycleController {
    backend: Arc<dyn ScanBackend>,
    modes: UploadModeController,
    state: Arc<RwLock<AnalysisSnapshot>>,
    in_flight: Arc<InFlightSlot>,
}

impl AnalysisLifecycleController {
    pub fn new(backend: Arc<dyn ScanBackend>, modes: UploadModeController) -> Self {
        Self {
            backend,
            modes,
            state: Arc::new(RwLock::new(AnalysisSnapshot::default())),
            in_flight: Arc::new(StdMutex::new(None)),
        }
    }

    async fn require_full_mode(&self, operation: &str) -> CoreResult<()> {
        let mode = self.modes.mode().await;
        if mode != UploadMode::Full {
            return Err(CoreError::state(format!(
                "{} requires full mode (current mode: {})",
                operation, mode
            )));
        }
        Ok(())
    }

    /// Upload a file for full analysis.
    ///
    /// A prior completed analysis reported by upstream is adopted as-is.
    /// Otherwise the new analysis is fetched once and returned in whatever
    /// phase it is in.
    pub async fn submit(&self, file: &FileUpload) -> CoreResult<AnalysisSnapshot> {
        self.require_full_mode("submit").await?;
        release_slot(&self.in_flight);

        {
            let mut state = self.state.write().await;
            *state = AnalysisSnapshot {
                uuid: None,
                filename: Some(file.filename.clone()),
                analysis: None,
                phase: LifecyclePhase::Submitting,
            };
        }

        let submission = match self.backend.submit_full_scan(file).await {
            Ok(submission) => submission,
            Err(e) => {
                warn!("[Analysis] Submission of {} failed: {}", file.filename, e);
                *self.state.write().await = AnalysisSnapshot::default();
                return Err(e);
            }
        };

        if let Some(cached) = submission.cached_analysis() {
            info!(
                "[Analysis] {} already analysed upstream, adopting result",
                submission.filename
            );
            let snapshot = AnalysisSnapshot {
                uuid: Some(submission.uuid.clone()),
                filename: Some(submission.filename.clone()),
                phase: LifecyclePhase::for_analysis(cached, true),
                analysis: Some(cached.clone()),
            };
            *self.state.write().await = snapshot.clone();
            return Ok(snapshot);
        }

        info!(
            "[Analysis] Queued {} as {} (analysis {:?})",
            submission.filename, submission.uuid, submission.analysis_id
        );
        {
            let mut state = self.state.write().await;
            state.uuid = Some(submission.uuid.clone());
            state.filename = Some(submission.filename.clone());
            state.phase = LifecyclePhase::Pending {
                status: AnalysisStatus::Queued,
            };
        }

        let analysis = self.backend.fetch_analysis(&submission.uuid).await?;
        Ok(self.apply_fetch(&submission.uuid, analysis).await)
    }

    /// Fetch the tracked analysis again.
    ///
    /// Concurrent calls share a single network request and all receive its
    /// outcome. Requires full mode and a tracked uuid.
    pub async fn refresh(&self) -> CoreResult<AnalysisSnapshot> {
        self.require_full_mode("refresh").await?;
        let uuid = self
            .state
            .read()
            .await
            .uuid
            .clone()
            .ok_or_else(|| CoreError::state("refresh requires a tracked analysis"))?;

        let guard = {
            let mut slot = self
                .in_flight
                .lock()
                .map_err(|e| CoreError::internal(format!("refresh slot poisoned: {}", e)))?;
            let fetch = match slot.as_mut() {
                Some(existing) if existing.uuid == uuid => {
                    debug!("[Analysis] Joining in-flight refresh of {}", uuid);
                    existing.waiters += 1;
                    existing.fetch.clone()
                }
                _ => {
                    let backend = Arc::clone(&self.backend);
                    let target = uuid.clone();
                    let fetch = async move { backend.fetch_analysis(&target).await }
                        .boxed()
                        .shared();
                    *slot = Some(InFlight {
                        uuid: uuid.clone(),
                        fetch: fetch.clone(),
                        waiters: 1,
                    });
                    fetch
                }
            };
            RefreshGuard {
                slot: &self.in_flight,
                fetch,
            }
        };

        let outcome = guard.fetch.clone().await;
        drop(guard);

        let analysis = outcome?;
        Ok(self.apply_fetch(&uuid, analysis).await)
    }

    /// Bind an analysis opened from history so it can be refreshed.
    pub async fn track(
        &self,
        uuid: impl Into<String>,
        filename: impl Into<String>,
        analysis: Option<AnalysisObject>,
    ) {
        release_slot(&self.in_flight);
        let phase = match &analysis {
            Some(a) => LifecyclePhase::for_analysis(a, false),
            None => LifecyclePhase::Pending {
                status: AnalysisStatus::Queued,
            },
        };
        *self.state.write().await = AnalysisSnapshot {
            uuid: Some(uuid.into()),
            filename: Some(filename.into()),
            analysis,
            phase,
        };
    }

    pub async fn snapshot(&self) -> AnalysisSnapshot {
        self.state.read().await.clone()
    }

    /// Whether a refresh fetch is currently in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Stop tracking. An in-flight refresh still completes for its callers but
    /// its result is discarded.
    pub async fn clear(&self) {
        release_slot(&self.in_flight);
        *self.state.write().await = AnalysisSnapshot::default();
    }

    /// Replace the tracked analysis wholesale, unless tracking moved on.
    async fn apply_fetch(&self, uuid: &str, analysis: AnalysisObject) -> AnalysisSnapshot {
        let mut state = self.state.write().await;
        if state.uuid.as_deref() != Some(uuid) {
            debug!("[Analysis] Dropping stale fetch for {}", uuid);
            return AnalysisSnapshot {
                uuid: Some(uuid.to_string()),
                filename: None,
                phase: LifecyclePhase::for_analysis(&analysis, false),
                analysis: Some(analysis),
            };
        }

        let from_cache = matches!(state.phase, LifecyclePhase::Completed { from_cache: true });
        state.phase = LifecyclePhase::for_analysis(&analysis, from_cache);
        state.analysis = Some(analysis);
        debug!("[Analysis] {} is {:?}", uuid, state.phase);
        state.clone()
    }
}
