//! Backpressure-aware bulk sink.
//!
//! A single writer owns the sink and submits one batch at a time. The sink
//! has two states:
//!
//! - `Ready`: the next batch goes to the engine.
//! - `Suspended`: the engine signalled overload (item level
//!   `es_rejected_execution_exception`, HTTP 429) or did not answer
//!   (timeout, transport failure). Batches are handed back untouched until
//!   the cooldown has elapsed.
//!
//! Structural failures stop the sink for good.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::compile::BulkActionPair;
use crate::engine::{BulkResponse, SearchEngine};
use crate::error::SinkError;

/// Default bulk request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default suspension cooldown.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Current sink state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Ready,
    Suspended {
        /// When the engine last refused work
        since: Instant,
        /// When writes may resume
        until: Instant,
    },
}

/// One-line account of a delivered batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Items reported by the engine
    pub items: usize,
    /// Server side processing time
    pub took_ms: u64,
    /// Whether any item failed
    pub errors: bool,
    /// Items that failed for data reasons
    pub failed_items: usize,
    /// Items refused for lack of capacity
    pub rejected_items: usize,
}

impl BulkSummary {
    fn from_response(response: &BulkResponse) -> Self {
        Self {
            items: response.items.len(),
            took_ms: response.took,
            errors: response.errors,
            ..Default::default()
        }
    }
}

/// Result of handing a batch to the sink.
#[derive(Debug)]
pub enum WriteOutcome {
    /// The engine accepted the request. Individual items may still have
    /// failed; see the summary.
    Delivered(BulkSummary),
    /// The sink is suspended; the batch was not sent.
    Refused(Vec<BulkActionPair>),
    /// The engine did not take the batch (timeout, transport failure,
    /// overload). The sink is now suspended; resubmit the batch first.
    Deferred(Vec<BulkActionPair>),
}

impl WriteOutcome {
    /// The batch to resubmit, if it was not delivered.
    pub fn into_pending(self) -> Option<Vec<BulkActionPair>> {
        match self {
            WriteOutcome::Delivered(_) => None,
            WriteOutcome::Refused(batch) | WriteOutcome::Deferred(batch) => Some(batch),
        }
    }
}

/// Single-writer bulk sink with suspension on overload.
pub struct BulkSink {
    engine: Arc<dyn SearchEngine>,
    request_timeout: Duration,
    cooldown: Duration,
    state: SinkState,
    stopped: bool,
}

impl BulkSink {
    /// Create a sink in the `Ready` state.
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            engine,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cooldown: DEFAULT_COOLDOWN,
            state: SinkState::Ready,
            stopped: false,
        }
    }

    /// Set the per-request timeout for bulk calls.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set how long the sink stays suspended.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Current state, after applying any elapsed cooldown.
    pub fn state(&mut self) -> SinkState {
        self.refresh(Instant::now());
        self.state
    }

    /// Whether a write would be sent to the engine right now.
    pub fn is_ready(&mut self) -> bool {
        !self.stopped && self.state() == SinkState::Ready
    }

    /// Whether a fatal error has stopped the sink.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// When a suspended sink resumes; `None` when ready.
    pub fn resume_at(&self) -> Option<Instant> {
        match self.state {
            SinkState::Ready => None,
            SinkState::Suspended { until, .. } => Some(until),
        }
    }

    /// Sleep until the cooldown has elapsed. Returns immediately when ready.
    pub async fn wait_ready(&mut self) {
        if let Some(until) = self.resume_at() {
            let wait = until.saturating_duration_since(Instant::now());
            debug!(wait_ms = wait.as_millis() as u64, "Waiting for search engine");
            tokio::time::sleep_until(until).await;
        }
        self.refresh(Instant::now());
    }

    fn refresh(&mut self, now: Instant) {
        if let SinkState::Suspended { until, .. } = self.state {
            if now >= until {
                info!("Resuming bulk writes");
                self.state = SinkState::Ready;
            }
        }
    }

    fn suspend(&mut self, now: Instant) {
        let until = now + self.cooldown;
        warn!(cooldown_ms = self.cooldown.as_millis() as u64, "Suspending bulk writes");
        self.state = SinkState::Suspended { since: now, until };
    }

    /// Submit one batch.
    ///
    /// Returns `Err` only for structural failures, after which every
    /// further call returns [`SinkError::Stopped`].
    pub async fn write(&mut self, batch: Vec<BulkActionPair>) -> Result<WriteOutcome, SinkError> {
        if self.stopped {
            return Err(SinkError::Stopped);
        }

        let now = Instant::now();
        self.refresh(now);
        if let SinkState::Suspended { .. } = self.state {
            info!(actions = batch.len(), "Waiting for search engine, batch refused");
            return Ok(WriteOutcome::Refused(batch));
        }

        if batch.is_empty() {
            return Ok(WriteOutcome::Delivered(BulkSummary::default()));
        }

        match self.engine.bulk(&batch, self.request_timeout).await {
            Ok(response) => Ok(WriteOutcome::Delivered(self.inspect(&response))),
            Err(e) if e.is_transient() || e.is_capacity() => {
                warn!(error = %e, actions = batch.len(), "Bulk request not accepted, will retry");
                self.suspend(Instant::now());
                Ok(WriteOutcome::Deferred(batch))
            }
            Err(e) => {
                error!(
                    error = %e,
                    actions = batch.len(),
                    "Error processing bulk request, stopping sink"
                );
                self.stopped = true;
                Err(SinkError::Fatal(e))
            }
        }
    }

    fn inspect(&mut self, response: &BulkResponse) -> BulkSummary {
        let mut summary = BulkSummary::from_response(response);

        if response.errors {
            for item in response.items.iter().filter(|item| item.error().is_some()) {
                let detail = serde_json::to_string(item).unwrap_or_default();
                if item.is_rejected() {
                    summary.rejected_items += 1;
                    error!(item = %detail, "Search engine queue full");
                } else {
                    summary.failed_items += 1;
                    error!(item = %detail, "Bulk item failed");
                }
            }
        }

        // TODO: resubmit only the rejected items instead of pausing the whole sink
        if summary.rejected_items > 0 {
            self.suspend(Instant::now());
        }

        info!(
            items = summary.items,
            took_ms = summary.took_ms,
            errors = summary.errors,
            "Bulk write complete"
        );
        summary
    }
}

impl std::fmt::Debug for BulkSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkSink")
            .field("request_timeout", &self.request_timeout)
            .field("cooldown", &self.cooldown)
            .field("state", &self.state)
            .field("stopped", &self.stopped)
            .finish()
    }
}
