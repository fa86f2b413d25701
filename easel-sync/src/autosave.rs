//! Debounced auto-save.
//!
//! ```text
//!            edit              timer fires           ok
//!   idle ─────────▶ pending ───────────────▶ saving ─────▶ saved
//!                    ▲   │ edit (reset timer)    │
//!                    └───┘                       │ conflict / retries exhausted
//!                                                ▼
//!                                              error
//! ```
//!
//! A background task owns the state machine. Edits reset the debounce timer
//! instead of stacking saves. Each dispatched save carries a sequence number
//! and only the most recently dispatched save may report back; an older
//! response that arrives late is discarded. A version conflict is sticky:
//! nothing is saved again until a new document is loaded.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use easel_core::document::now_ms;
use easel_core::{ChangeCause, Document};

use crate::error::PersistenceError;
use crate::metrics;
use crate::persistence::{PersistenceApi, SaveReceipt};

/// Default quiet period before a save.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Where the synchronizer is in its cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutosaveState {
    /// Nothing to save.
    #[default]
    Idle,
    /// Waiting for the debounce timer.
    Pending,
    /// A save is in flight.
    Saving,
    /// The latest dispatched state is stored.
    Saved,
    /// The last save failed or conflicted.
    Error,
}

/// Observable synchronizer status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveStatus {
    /// Current state.
    pub state: AutosaveState,
    /// Wall-clock time of the last successful save, in milliseconds.
    pub last_saved: Option<u64>,
    /// Version stored by the last successful save.
    pub saved_version: Option<u64>,
    /// Message of the last failure.
    pub error: Option<String>,
    /// Whether the failure is an unresolved version conflict.
    pub conflict: bool,
}

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds (cap for backoff).
    pub max_delay_ms: u64,
    /// Multiplier applied to delay after each retry (e.g., 2.0 for doubling).
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 8000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub const fn new(
        max_retries: u32,
        initial_delay_ms: u64,
        max_delay_ms: u64,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay_ms,
            max_delay_ms,
            backoff_multiplier,
        }
    }

    /// Calculate the delay for a given retry attempt (0-indexed).
    ///
    /// Uses exponential backoff: `delay = initial * multiplier^attempt`
    /// capped at `max_delay_ms`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay_ms as f64;
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (base_delay * multiplier).min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

/// Auto-save configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before saving.
    pub debounce: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            retry: RetryConfig::default(),
        }
    }
}

impl AutosaveConfig {
    /// Use a different debounce period.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Use a different retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug)]
enum Signal {
    Changed(Box<Document>),
    Loaded(Box<Document>),
    Flush(oneshot::Sender<AutosaveStatus>),
    Shutdown,
}

/// Cloneable sender for document changes.
#[derive(Debug, Clone)]
pub struct AutosaveNotifier {
    tx: mpsc::UnboundedSender<Signal>,
}

impl AutosaveNotifier {
    /// Report a committed mutation.
    pub fn changed(&self, doc: &Document) {
        self.send(Signal::Changed(Box::new(doc.clone())));
    }

    /// Report that a new document replaced the current one.
    pub fn loaded(&self, doc: &Document) {
        self.send(Signal::Loaded(Box::new(doc.clone())));
    }

    /// Route an editor change notification.
    pub fn observe(&self, doc: &Document, cause: ChangeCause) {
        match cause {
            ChangeCause::Loaded => self.loaded(doc),
            ChangeCause::Command | ChangeCause::Undo | ChangeCause::Redo | ChangeCause::Replaced => {
                self.changed(doc);
            }
        }
    }

    /// A listener suitable for `EditorContext::subscribe`.
    #[must_use]
    pub fn listener(&self) -> impl FnMut(&Document, ChangeCause) + Send + 'static {
        let notifier = self.clone();
        move |doc: &Document, cause: ChangeCause| notifier.observe(doc, cause)
    }

    fn send(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            tracing::debug!("Autosave task has stopped, dropping signal");
        }
    }
}

/// Handle to the background auto-save task.
#[derive(Debug)]
pub struct AutosaveHandle {
    notifier: AutosaveNotifier,
    status: watch::Receiver<AutosaveStatus>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Spawn the auto-save task on the current Tokio runtime.
    #[must_use]
    pub fn spawn(api: Arc<dyn PersistenceApi>, config: AutosaveConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(AutosaveStatus::default());
        let worker = Worker::new(api, config, status_tx);
        let task = tokio::spawn(worker.run(rx));
        Self {
            notifier: AutosaveNotifier { tx },
            status,
            task,
        }
    }

    /// Cloneable sender for change notifications.
    #[must_use]
    pub fn notifier(&self) -> AutosaveNotifier {
        self.notifier.clone()
    }

    /// Report a committed mutation.
    pub fn notify_changed(&self, doc: &Document) {
        self.notifier.changed(doc);
    }

    /// Report that a new document replaced the current one. Cancels a pending
    /// debounce and clears a conflict.
    pub fn document_loaded(&self, doc: &Document) {
        self.notifier.loaded(doc);
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> AutosaveStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AutosaveStatus> {
        self.status.clone()
    }

    /// Save the latest state now and wait for the outcome.
    pub async fn flush(&self) -> AutosaveStatus {
        let (reply, response) = oneshot::channel();
        self.notifier.send(Signal::Flush(reply));
        match response.await {
            Ok(status) => status,
            Err(_) => self.status(),
        }
    }

    /// Stop the task, dropping any pending debounce. A save already in flight
    /// is left to finish.
    pub async fn shutdown(self) {
        self.notifier.send(Signal::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Autosave task ended abnormally");
        }
    }
}

struct Completion {
    seq: u64,
    result: Result<SaveReceipt, PersistenceError>,
}

struct Worker {
    api: Arc<dyn PersistenceApi>,
    config: AutosaveConfig,
    status_tx: watch::Sender<AutosaveStatus>,
    status: AutosaveStatus,
    latest: Option<Document>,
    dirty: bool,
    deadline: Option<Instant>,
    dispatched: u64,
    in_flight: bool,
    waiters: Vec<oneshot::Sender<AutosaveStatus>>,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Worker {
    fn new(
        api: Arc<dyn PersistenceApi>,
        config: AutosaveConfig,
        status_tx: watch::Sender<AutosaveStatus>,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            api,
            config,
            status_tx,
            status: AutosaveStatus::default(),
            latest: None,
            dirty: false,
            deadline: None,
            dispatched: 0,
            in_flight: false,
            waiters: Vec::new(),
            done_tx,
            done_rx,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Signal>) {
        tracing::debug!(debounce = ?self.config.debounce, "Autosave started");
        loop {
            let deadline = self.deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                signal = rx.recv() => match signal {
                    Some(Signal::Changed(doc)) => self.on_changed(*doc),
                    Some(Signal::Loaded(doc)) => self.on_loaded(*doc),
                    Some(Signal::Flush(reply)) => self.on_flush(reply),
                    Some(Signal::Shutdown) | None => break,
                },
                () = tokio::time::sleep_until(deadline), if self.deadline.is_some() => {
                    self.deadline = None;
                    self.dispatch();
                }
                Some(done) = self.done_rx.recv() => self.on_completion(done),
            }
        }
        if self.deadline.take().is_some() {
            tracing::debug!("Autosave stopped with a pending debounce");
        }
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(self.status.clone());
        }
    }

    fn on_changed(&mut self, doc: Document) {
        self.latest = Some(doc);
        self.dirty = true;
        if self.status.conflict {
            tracing::debug!("Edit held back: unresolved save conflict");
            return;
        }
        self.deadline = Some(Instant::now() + self.config.debounce);
        self.set_state(AutosaveState::Pending);
    }

    fn on_loaded(&mut self, doc: Document) {
        self.deadline = None;
        self.dirty = false;
        if self.in_flight {
            // Responses for the previous document are stale from here on.
            self.dispatched += 1;
            self.in_flight = false;
        }
        self.status = AutosaveStatus {
            state: AutosaveState::Idle,
            last_saved: self.status.last_saved,
            saved_version: None,
            error: None,
            conflict: false,
        };
        tracing::debug!(document = %doc.id, version = doc.version(), "Autosave reset for new document");
        self.latest = Some(doc);
        self.publish();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(self.status.clone());
        }
    }

    fn on_flush(&mut self, reply: oneshot::Sender<AutosaveStatus>) {
        if self.dirty && !self.status.conflict {
            self.deadline = None;
            self.dispatch();
        }
        if self.in_flight {
            self.waiters.push(reply);
        } else {
            let _ = reply.send(self.status.clone());
        }
    }

    fn dispatch(&mut self) {
        let Some(doc) = self.latest.clone() else {
            return;
        };
        self.dispatched += 1;
        self.dirty = false;
        self.in_flight = true;
        self.set_state(AutosaveState::Saving);

        let seq = self.dispatched;
        let api = Arc::clone(&self.api);
        let retry = self.config.retry.clone();
        let done_tx = self.done_tx.clone();
        tracing::debug!(seq, version = doc.version(), "Dispatching save");
        tokio::spawn(async move {
            let result = save_with_retry(api.as_ref(), &doc, &retry).await;
            let _ = done_tx.send(Completion { seq, result });
        });
    }

    fn on_completion(&mut self, done: Completion) {
        if done.seq != self.dispatched {
            tracing::debug!(seq = done.seq, latest = self.dispatched, "Discarding stale save response");
            metrics::record_save("stale");
            return;
        }
        self.in_flight = false;
        match done.result {
            Ok(receipt) => {
                metrics::record_save("saved");
                tracing::debug!(version = receipt.version, "Document saved");
                self.status.last_saved = Some(now_ms());
                self.status.saved_version = Some(receipt.version);
                self.status.error = None;
                let state = if self.deadline.is_some() {
                    AutosaveState::Pending
                } else {
                    AutosaveState::Saved
                };
                self.set_state(state);
            }
            Err(e) => {
                let conflict = e.is_conflict();
                if conflict {
                    metrics::record_save("conflict");
                    tracing::warn!(error = %e, "Save conflict; auto-save suspended until reload");
                    self.deadline = None;
                } else {
                    metrics::record_save("failed");
                    tracing::warn!(error = %e, "Save failed");
                }
                self.status.error = Some(e.to_string());
                self.status.conflict = conflict;
                if self.deadline.is_none() {
                    self.set_state(AutosaveState::Error);
                } else {
                    self.publish();
                }
            }
        }
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(self.status.clone());
        }
    }

    fn set_state(&mut self, state: AutosaveState) {
        self.status.state = state;
        self.publish();
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status.clone());
    }
}

async fn save_with_retry(
    api: &dyn PersistenceApi,
    doc: &Document,
    retry: &RetryConfig,
) -> Result<SaveReceipt, PersistenceError> {
    let mut attempt = 0;
    loop {
        match api.save(doc).await {
            Ok(receipt) => return Ok(receipt),
            Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                let delay = retry.delay_for_attempt(attempt);
                tracing::warn!(
                    "Save failed (attempt {}/{}), retrying in {}ms: {}",
                    attempt + 1,
                    retry.max_retries + 1,
                    delay.as_millis(),
                    e
                );
                metrics::record_retry();
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
