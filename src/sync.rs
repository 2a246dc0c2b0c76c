//! Polling synchronization for one open conversation
//!
//! A [`SyncEngine`] owns at most one session. Opening a conversation performs a
//! foreground fetch, merges it, and spawns a background poller that re-fetches on
//! a fixed period. Closing (explicitly, by switching conversation, or by dropping
//! the engine) aborts the poller; fetch results that land after close are dropped.
//!
//! The store is published through a `tokio::sync::watch` channel and only
//! notifies subscribers when a merge or send actually changed it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::logging::OperationTimer;
use crate::metrics::{FetchKind, SyncMetrics};
use crate::models::{AuthorKind, DeliveryState, Message, OutgoingMessage};
use crate::repository::{MessageFeed, MessageSender};
use crate::store::{MergeOutcome, MergePolicy, MessageStore};
use crate::validation::InputValidator;

/// User-visible state of the open conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// No conversation open
    Closed,
    /// Foreground fetch in progress.
    ///
    /// Observable while a [`SyncEngine::refresh`] runs. The initial load happens
    /// inside [`SyncEngine::start`], before any receiver for the new session exists.
    Loading,
    /// Last foreground or background fetch was applied
    Ready,
    /// Last foreground fetch failed; background polling continues
    Error(String),
}

struct SessionShared {
    conversation_id: String,
    feed: Arc<dyn MessageFeed>,
    policy: MergePolicy,
    metrics: Arc<SyncMetrics>,
    store: watch::Sender<MessageStore>,
    status: watch::Sender<SyncStatus>,
    open: AtomicBool,
    // Foreground fetches wait for it, background ticks skip when it is held.
    fetch_gate: Mutex<()>,
}

impl SessionShared {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    async fn fetch(&self, kind: FetchKind) -> Result<Vec<Message>> {
        let timer = OperationTimer::new(match kind {
            FetchKind::Foreground => "foreground_fetch",
            FetchKind::Background => "background_fetch",
        });
        let result = self.feed.fetch(&self.conversation_id).await;
        self.metrics.record_fetch(kind, timer.elapsed(), result.is_ok());
        result
    }

    async fn foreground_fetch(&self) -> Result<()> {
        let _gate = self.fetch_gate.lock().await;
        if self.is_open() {
            self.set_status(SyncStatus::Loading);
        }

        match self.fetch(FetchKind::Foreground).await {
            Ok(remote) => {
                self.apply(remote);
                Ok(())
            }
            Err(e) => {
                warn!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "Foreground fetch failed"
                );
                if self.is_open() {
                    self.set_status(SyncStatus::Error(e.to_string()));
                }
                Err(e)
            }
        }
    }

    async fn background_tick(&self) {
        let Ok(_gate) = self.fetch_gate.try_lock() else {
            debug!(conversation_id = %self.conversation_id, "Fetch in flight, skipping tick");
            self.metrics.record_skipped_tick();
            return;
        };

        match self.fetch(FetchKind::Background).await {
            Ok(remote) => self.apply(remote),
            Err(e) => {
                debug!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "Background fetch failed"
                );
            }
        }
    }

    fn apply(&self, remote: Vec<Message>) {
        if !self.is_open() {
            debug!(
                conversation_id = %self.conversation_id,
                "Discarding snapshot for closed conversation"
            );
            self.metrics.record_discarded();
            return;
        }

        let policy = self.policy;
        let mut outcome = MergeOutcome::Unchanged;
        self.store.send_if_modified(|store| {
            outcome = store.merge(remote, policy);
            outcome.changed()
        });
        self.metrics.record_merge(outcome);
        if outcome.changed() {
            debug!(
                conversation_id = %self.conversation_id,
                messages = self.store.borrow().len(),
                "Snapshot replaced store"
            );
        }
        self.set_status(SyncStatus::Ready);
    }
}

struct Session {
    shared: Arc<SessionShared>,
    poller: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.open.store(false, Ordering::Release);
        self.poller.abort();
        self.shared.set_status(SyncStatus::Closed);
    }
}

fn spawn_poller(shared: Arc<SessionShared>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if !shared.is_open() {
                break;
            }
            shared.background_tick().await;
        }
    })
}

/// Keeps one conversation's store in step with the remote feed
pub struct SyncEngine {
    feed: Arc<dyn MessageFeed>,
    sender: Arc<dyn MessageSender>,
    config: SyncConfig,
    metrics: Arc<SyncMetrics>,
    session: Option<Session>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("conversation_id", &self.conversation_id())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Engine with no open conversation
    pub fn new(
        feed: Arc<dyn MessageFeed>,
        sender: Arc<dyn MessageSender>,
        config: SyncConfig,
    ) -> Self {
        Self {
            feed,
            sender,
            config,
            metrics: Arc::new(SyncMetrics::new()),
            session: None,
        }
    }

    /// Share a metrics collector with other components
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics collector used by this engine
    #[must_use]
    pub const fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    /// Open `conversation_id`, closing whatever was open before.
    ///
    /// The session is installed once the initial fetch settles, so receivers
    /// taken afterwards start at `Ready` or `Error`.
    ///
    /// Returns the foreground fetch result. The conversation stays open on error:
    /// the status channel shows [`SyncStatus::Error`] and either the next
    /// background tick or [`refresh`](Self::refresh) can recover.
    pub async fn start(&mut self, conversation_id: &str) -> Result<()> {
        InputValidator::validate_conversation_id(conversation_id)?;
        let period = self.config.poll_interval();
        InputValidator::validate_poll_interval(period)?;

        self.stop();
        info!(conversation_id, poll_ms = period.as_millis(), "Opening conversation");

        let shared = Arc::new(SessionShared {
            conversation_id: conversation_id.to_string(),
            feed: Arc::clone(&self.feed),
            policy: self.config.merge_policy,
            metrics: Arc::clone(&self.metrics),
            store: watch::Sender::new(MessageStore::new()),
            status: watch::Sender::new(SyncStatus::Loading),
            open: AtomicBool::new(true),
            fetch_gate: Mutex::new(()),
        });

        let initial = shared.foreground_fetch().await;
        let poller = spawn_poller(Arc::clone(&shared), period);
        self.session = Some(Session { shared, poller });
        initial
    }

    /// Close the open conversation, cancelling its poller. No-op when closed.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            info!(conversation_id = %session.shared.conversation_id, "Closing conversation");
        }
    }

    /// Foreground re-fetch of the open conversation.
    ///
    /// The returned future owns what it needs, so it may be spawned; if the
    /// conversation closes before it completes, its snapshot is discarded.
    pub fn refresh(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        let shared = self.shared();
        async move {
            match shared {
                Some(shared) => shared.foreground_fetch().await,
                None => Err(SyncError::NotOpen),
            }
        }
    }

    /// Send a message on the open conversation.
    ///
    /// A pending copy is appended to the store before the send provider is
    /// called. On success the copy is marked confirmed and records the server id;
    /// it keeps its local id until a snapshot carrying the server copy replaces
    /// it. On failure it stays pending until the next snapshot replaces it.
    pub fn send(
        &self,
        draft: OutgoingMessage,
    ) -> impl Future<Output = Result<Message>> + Send + 'static {
        let shared = self.shared();
        let sender = Arc::clone(&self.sender);
        let metrics = Arc::clone(&self.metrics);
        async move {
            let shared = shared.ok_or(SyncError::NotOpen)?;
            let draft = OutgoingMessage {
                body: InputValidator::sanitize_text(&draft.body),
                attachments: draft.attachments,
            };
            InputValidator::validate_outgoing(&draft)?;

            let local_id = format!("local-{:016x}", rand::random::<u64>());
            let optimistic = Message {
                id: local_id.clone(),
                body: draft.body.clone(),
                author_kind: AuthorKind::Admin,
                created_at: Utc::now(),
                attachments: draft.attachments.clone(),
                delivery_state: Some(DeliveryState::Pending),
                server_id: None,
            };
            shared.store.send_modify(|store| store.append_optimistic(optimistic));

            match sender.send(&shared.conversation_id, &draft).await {
                Ok(server) => {
                    metrics.record_send(true);
                    if shared.is_open() {
                        shared.store.send_if_modified(|store| store.confirm(&local_id, &server));
                    }
                    debug!(
                        conversation_id = %shared.conversation_id,
                        message_id = %server.id,
                        "Message sent"
                    );
                    Ok(server)
                }
                Err(e) => {
                    metrics.record_send(false);
                    warn!(conversation_id = %shared.conversation_id, error = %e, "Send failed");
                    Err(e)
                }
            }
        }
    }

    fn shared(&self) -> Option<Arc<SessionShared>> {
        self.session.as_ref().map(|s| Arc::clone(&s.shared))
    }

    /// True while a conversation is open
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Id of the open conversation
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.shared.conversation_id.as_str())
    }

    /// Receiver notified whenever the store changes
    #[must_use]
    pub fn subscribe(&self) -> Option<watch::Receiver<MessageStore>> {
        self.session.as_ref().map(|s| s.shared.store.subscribe())
    }

    /// Receiver notified whenever the status changes
    #[must_use]
    pub fn status_receiver(&self) -> Option<watch::Receiver<SyncStatus>> {
        self.session.as_ref().map(|s| s.shared.status.subscribe())
    }

    /// Current status; `Closed` when nothing is open
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.session
            .as_ref()
            .map_or(SyncStatus::Closed, |s| s.shared.status.borrow().clone())
    }

    /// Copy of the open conversation's messages
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.session
            .as_ref()
            .map(|s| s.shared.store.borrow().messages().to_vec())
            .unwrap_or_default()
    }
}
