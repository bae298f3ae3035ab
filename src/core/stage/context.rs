//! Per-stage runtime context.

use crate::core::digest::{DigestConfig, Signers};
use crate::core::sync::{CancellationToken, ConcurrencyLimiter, Inbox, Outbox};
use crate::error::{ItemError, ItemFailure};
use crate::events::{null_sender, EventSender, ItemEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Items a stage works on concurrently unless the pipeline says otherwise
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Collects per-item failures from every stage of a run
#[derive(Debug, Clone)]
pub struct FailureLog {
    sender: Sender<ItemFailure>,
    receiver: Receiver<ItemFailure>,
}

impl FailureLog {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn record(&self, failure: ItemFailure) {
        // The log holds its own receiver, so this cannot disconnect.
        let _ = self.sender.send(failure);
    }

    /// Take everything recorded so far
    pub fn drain(&self) -> Vec<ItemFailure> {
        self.receiver.try_iter().collect()
    }
}

impl Default for FailureLog {
    fn default() -> Self {
        Self::new()
    }
}

/// What a stage gets to work with besides its queues
#[derive(Debug, Clone)]
pub struct StageContext {
    stage: String,
    signers: Signers,
    limiter: Arc<ConcurrencyLimiter>,
    cancel: CancellationToken,
    events: EventSender,
    failures: FailureLog,
    max_in_flight: usize,
}

impl StageContext {
    pub fn new(
        stage: impl Into<String>,
        signers: Signers,
        limiter: Arc<ConcurrencyLimiter>,
        cancel: CancellationToken,
        events: EventSender,
        failures: FailureLog,
        max_in_flight: usize,
    ) -> Self {
        Self {
            stage: stage.into(),
            signers,
            limiter,
            cancel,
            events,
            failures,
            max_in_flight,
        }
    }

    /// A context outside any pipeline, for driving one stage by hand.
    ///
    /// Uses the default digests, a private slow-digest lock and no event
    /// listener. Returns the failure log alongside.
    pub fn detached(stage: impl Into<String>, cancel: &CancellationToken) -> (Self, FailureLog) {
        let failures = FailureLog::new();
        let ctx = Self::new(
            stage,
            DigestConfig::new().build(),
            Arc::new(ConcurrencyLimiter::exclusive()),
            cancel.clone(),
            null_sender(),
            failures.clone(),
            DEFAULT_MAX_IN_FLIGHT,
        );
        (ctx, failures)
    }

    /// Replace the digests
    pub fn with_signers(mut self, signers: Signers) -> Self {
        self.signers = signers;
        self
    }

    pub fn stage_name(&self) -> &str {
        &self.stage
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    pub fn fast_digest(&self, content: &str) -> Result<String, ItemError> {
        self.signers.fast.compute(content, &self.cancel)
    }

    /// Slow digest, holding the slow-digest lock for the call only.
    pub fn slow_digest(&self, content: &str) -> Result<String, ItemError> {
        let _permit = self.limiter.acquire(&self.cancel)?;
        self.signers.slow.compute(content, &self.cancel)
    }

    /// Forward a value downstream
    pub fn emit(&self, output: &Outbox, value: String) -> Result<(), ItemError> {
        debug!(stage = %self.stage, %value, "Emitted");
        self.events.send(ItemEvent::Emitted {
            stage: self.stage.clone(),
            value: value.clone(),
        });
        output.send(value)?;
        Ok(())
    }

    /// Record that `item` could not be processed by this stage
    pub fn record_failure(&self, item: &str, error: ItemError) {
        warn!(stage = %self.stage, item, %error, "Item failed");
        self.events.send(ItemEvent::Failed {
            stage: self.stage.clone(),
            item: item.to_string(),
            message: error.to_string(),
        });
        self.failures
            .record(ItemFailure::new(self.stage.clone(), item, error));
    }

    /// Compute one item's value and forward it, or record its failure.
    ///
    /// A panic inside `work` fails this item only.
    pub fn process<F>(&self, item: &str, output: &Outbox, work: F)
    where
        F: FnOnce(&str) -> Result<String, ItemError>,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(item)))
            .unwrap_or(Err(ItemError::WorkerPanicked));

        if let Err(error) = outcome.and_then(|value| self.emit(output, value)) {
            self.record_failure(item, error);
        }
    }

    /// `process` every item of `input`, each on its own scoped worker.
    ///
    /// At most `max_in_flight` workers exist at once; further items wait
    /// in the inbox. Returns once every worker has finished, so dropping
    /// `output` afterwards closes it after all per-item work.
    pub fn for_each_item<F>(&self, input: &Inbox, output: &Outbox, work: F)
    where
        F: Fn(&str) -> Result<String, ItemError> + Sync,
    {
        let workers = ConcurrencyLimiter::with_permits(self.max_in_flight.max(1));
        let work = &work;

        thread::scope(|scope| {
            for item in input.iter() {
                let Ok(permit) = workers.acquire(&self.cancel) else {
                    break;
                };
                scope.spawn(move || {
                    let _permit = permit;
                    self.process(&item, output, work);
                });
            }
        });
    }
}
