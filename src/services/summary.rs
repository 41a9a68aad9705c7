//! AI Summary Stream Client
//!
//! Drives one server-push summary session at a time. Frames are applied in
//! receipt order by a single task per session; every state write is checked
//! against the session generation so nothing from a superseded session lands.
//!
//! Observers read the session through [`SummaryStreamClient::subscribe`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use scanlens_client::ScanBackend;
use scanlens_core::streaming::{GENERATION_FAILURE_MESSAGE, PARSE_FAILURE_MESSAGE};
use scanlens_core::{CoreError, CoreResult, SummaryFrame};

use crate::storage::summary_cache::SummaryCache;

/// Message shown when the transport drops before a terminal frame.
pub const CONNECTION_LOST_MESSAGE: &str = "Connection to server lost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryState {
    Idle,
    Connecting,
    Streaming,
    Done,
    Error,
}

impl SummaryState {
    /// No further frames will be applied.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SummaryState::Idle | SummaryState::Done | SummaryState::Error
        )
    }
}

/// Observable state of the current summary session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummarySession {
    pub file_uuid: Option<String>,
    pub state: SummaryState,
    /// Transient progress text from `status` frames
    pub status_text: Option<String>,
    /// Latest full summary text
    pub buffer: String,
    pub error_message: Option<String>,
    /// Increments on every new session and on disconnect
    pub generation: u64,
}

impl Default for SummarySession {
    fn default() -> Self {
        Self {
            file_uuid: None,
            state: SummaryState::Idle,
            status_text: None,
            buffer: String::new(),
            error_message: None,
            generation: 0,
        }
    }
}

impl SummarySession {
    fn connecting(file_uuid: &str, generation: u64) -> Self {
        Self {
            file_uuid: Some(file_uuid.to_string()),
            state: SummaryState::Connecting,
            generation,
            ..Default::default()
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.state = SummaryState::Error;
        self.error_message = Some(message.into());
        self.status_text = None;
        self.buffer.clear();
    }

    /// Apply one non-terminal frame, or the state change of a terminal one.
    fn apply(&mut self, frame: &SummaryFrame) {
        match frame {
            SummaryFrame::Status { content } => {
                self.state = SummaryState::Streaming;
                if let Some(text) = content.as_deref().filter(|c| !c.is_empty()) {
                    self.status_text = Some(text.to_string());
                }
            }
            SummaryFrame::Summary { content } => {
                self.state = SummaryState::Streaming;
                if let Some(text) = content.as_deref().filter(|c| !c.is_empty()) {
                    self.buffer = text.to_string();
                    self.status_text = None;
                }
            }
            SummaryFrame::Done { .. } => {
                self.state = SummaryState::Done;
                self.status_text = None;
            }
            SummaryFrame::Error { content } => {
                let message = content
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| GENERATION_FAILURE_MESSAGE.to_string());
                self.fail(message);
            }
        }
    }
}

/// Result of [`SummaryStreamClient::view`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryView {
    /// Served from cache; no session was started
    Cached(String),
    /// A new session was started with this generation
    Streaming { generation: u64 },
}

struct LiveSession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Shared {
    session_tx: watch::Sender<SummarySession>,
    generation: AtomicU64,
}

impl Shared {
    /// Mutate the session only if it still belongs to `generation`.
    fn update(&self, generation: u64, f: impl FnOnce(&mut SummarySession)) -> bool {
        self.session_tx.send_if_modified(|session| {
            if session.generation != generation {
                return false;
            }
            f(session);
            true
        })
    }
}

/// Client for streamed and one-shot AI summaries.
pub struct SummaryStreamClient {
    backend: Arc<dyn ScanBackend>,
    cache: SummaryCache,
    shared: Arc<Shared>,
    live: Mutex<Option<LiveSession>>,
}

impl SummaryStreamClient {
    pub fn new(backend: Arc<dyn ScanBackend>, cache: SummaryCache) -> Self {
        let (session_tx, _) = watch::channel(SummarySession::default());
        Self {
            backend,
            cache,
            shared: Arc::new(Shared {
                session_tx,
                generation: AtomicU64::new(0),
            }),
            live: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    /// Start a fresh session for `uuid`, ignoring any cached summary.
    ///
    /// The previous session's transport is closed before the new one opens.
    /// Returns the new session generation.
    pub async fn generate(&self, uuid: &str) -> u64 {
        let mut live = self.live.lock().await;
        if let Some(previous) = live.take() {
            debug!("[SummaryStream] Closing previous session");
            previous.cancel.cancel();
            let _ = previous.task.await;
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared
            .session_tx
            .send_replace(SummarySession::connecting(uuid, generation));
        info!("[SummaryStream] Session {} for {}", generation, uuid);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(
            Arc::clone(&self.backend),
            self.cache.clone(),
            Arc::clone(&self.shared),
            uuid.to_string(),
            generation,
            cancel.clone(),
        ));
        *live = Some(LiveSession { cancel, task });
        generation
    }

    /// Show the summary for `uuid`: from cache when present (no network, no
    /// session change), otherwise via a new session.
    pub async fn view(&self, uuid: &str) -> SummaryView {
        if let Some(text) = self.cache.get(uuid).await {
            debug!("[SummaryStream] Cache hit for {}", uuid);
            return SummaryView::Cached(text);
        }
        SummaryView::Streaming {
            generation: self.generate(uuid).await,
        }
    }

    /// Close the live transport and return to idle. Nothing is cached.
    pub async fn disconnect(&self) {
        let mut live = self.live.lock().await;
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.session_tx.send_modify(|session| {
            session.state = SummaryState::Idle;
            session.status_text = None;
            session.generation = generation;
        });
        if let Some(previous) = live.take() {
            info!("[SummaryStream] Disconnected");
            previous.cancel.cancel();
            let _ = previous.task.await;
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SummarySession> {
        self.shared.session_tx.subscribe()
    }

    pub fn session(&self) -> SummarySession {
        self.shared.session_tx.borrow().clone()
    }

    /// Wait until the current session is done, failed, or idle.
    pub async fn wait_settled(&self) -> CoreResult<SummarySession> {
        let mut rx = self.subscribe();
        let session = rx
            .wait_for(|session| session.state.is_settled())
            .await
            .map_err(|_| CoreError::internal("summary session channel closed"))?;
        Ok(session.clone())
    }

    /// Non-streaming summary: cached text, or a blocking request whose result
    /// is cached.
    pub async fn summarize_once(&self, uuid: &str) -> CoreResult<String> {
        if let Some(text) = self.cache.get(uuid).await {
            debug!("[SummaryStream] Cache hit for {}", uuid);
            return Ok(text);
        }
        let text = self.backend.request_summary(uuid).await?;
        self.cache.insert(uuid, text.clone()).await;
        Ok(text)
    }
}

impl Drop for SummaryStreamClient {
    fn drop(&mut self) {
        if let Ok(mut live) = self.live.try_lock() {
            if let Some(session) = live.take() {
                session.cancel.cancel();
            }
        }
    }
}

async fn run_session(
    backend: Arc<dyn ScanBackend>,
    cache: SummaryCache,
    shared: Arc<Shared>,
    uuid: String,
    generation: u64,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        opened = backend.open_summary_stream(&uuid) => opened,
    };

    let mut frames = match opened {
        Ok(frames) => frames,
        Err(e) => {
            warn!("[SummaryStream] Failed to open stream for {}: {}", uuid, e);
            shared.update(generation, |session| session.fail(e.to_string()));
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = frames.next() => next,
        };

        let payload = match next {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => {
                warn!("[SummaryStream] Transport error for {}: {}", uuid, e);
                shared.update(generation, |session| session.fail(CONNECTION_LOST_MESSAGE));
                break;
            }
            None => {
                warn!("[SummaryStream] Stream for {} ended without a terminal frame", uuid);
                shared.update(generation, |session| session.fail(CONNECTION_LOST_MESSAGE));
                break;
            }
        };

        let frame = match SummaryFrame::parse(&payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("[SummaryStream] Bad frame for {}: {}", uuid, e);
                shared.update(generation, |session| session.fail(PARSE_FAILURE_MESSAGE));
                break;
            }
        };
        debug!("[SummaryStream] {} frame for {}", frame.type_name(), uuid);

        if matches!(frame, SummaryFrame::Done { .. }) {
            if !cancel.is_cancelled() {
                complete(&shared, &cache, &uuid, generation).await;
            }
            break;
        }

        shared.update(generation, |session| session.apply(&frame));
        if frame.is_terminal() {
            break;
        }
    }

    drop(frames);
    debug!("[SummaryStream] Session {} closed", generation);
}

/// Publish `done` and cache the buffer as one step: the cache write lock is
/// held across the generation check, so a superseded session caches nothing
/// and readers that saw `done` find the text.
async fn complete(shared: &Shared, cache: &SummaryCache, uuid: &str, generation: u64) -> bool {
    cache
        .insert_with(uuid, || {
            let mut buffer = None;
            shared.update(generation, |session| {
                session.apply(&SummaryFrame::done());
                buffer = Some(session.buffer.clone());
            });
            buffer
        })
        .await
}
