//! Pipeline execution implementation.

use crate::core::digest::{DigestConfig, Signers};
use crate::core::item::Item;
use crate::core::stage::{
    CombineResults, FailureLog, MultiHash, SingleHash, Stage, StageContext, DEFAULT_MAX_IN_FLIGHT,
};
use crate::core::sync::{queue, CancellationToken, ConcurrencyLimiter, Outbox, DEFAULT_QUEUE_CAPACITY};
use crate::error::{BuildError, ItemFailure, PipelineError};
use crate::events::{null_sender, EventSender, PipelineEvent, PipelineSummary, StageEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name failures are attributed to when an item cannot be normalized
pub const INPUT_STAGE: &str = "input";

/// Result of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Identifier of the run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Everything the last stage emitted, in arrival order
    pub outputs: Vec<String>,
    /// Items that failed, sorted by stage then item
    pub failures: Vec<ItemFailure>,
    /// Items submitted by the caller
    pub total_items: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineResult {
    /// First value emitted by the last stage.
    ///
    /// For a pipeline ending in `CombineResults` this is the whole result.
    pub fn output(&self) -> Option<&str> {
        self.outputs.first().map(String::as_str)
    }

    /// True when no item failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Counts for the completion event
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            total_items: self.total_items,
            outputs: self.outputs.len(),
            failures: self.failures.len(),
            duration_ms: self.duration_ms,
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
    queue_capacity: usize,
    max_in_flight: usize,
    digests: DigestConfig,
    limiter: Option<Arc<ConcurrencyLimiter>>,
    cancel: Option<CancellationToken>,
}

impl PipelineBuilder {
    /// Create an empty pipeline builder
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            digests: DigestConfig::new(),
            limiter: None,
            cancel: None,
        }
    }

    /// SingleHash -> MultiHash -> CombineResults
    pub fn signer() -> Self {
        Self::new()
            .stage(SingleHash::new())
            .stage(MultiHash::new())
            .stage(CombineResults::new())
    }

    /// Append a stage
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append several stages
    pub fn stages(mut self, stages: Vec<Box<dyn Stage>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Set how many items each queue buffers
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set how many items each stage works on at once
    pub fn max_in_flight(mut self, workers: usize) -> Self {
        self.max_in_flight = workers;
        self
    }

    /// Set the digests and their latency
    pub fn digests(mut self, digests: DigestConfig) -> Self {
        self.digests = digests;
        self
    }

    /// Use this slow-digest lock instead of the process-wide one
    pub fn limiter(mut self, limiter: Arc<ConcurrencyLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        if self.stages.is_empty() {
            return Err(BuildError::NoStages.into());
        }
        if self.queue_capacity == 0 {
            return Err(BuildError::ZeroCapacity.into());
        }
        if self.max_in_flight == 0 {
            return Err(BuildError::ZeroInFlight.into());
        }

        Ok(Pipeline {
            stages: self.stages,
            queue_capacity: self.queue_capacity,
            max_in_flight: self.max_in_flight,
            signers: self.digests.build(),
            limiter: self.limiter.unwrap_or_else(ConcurrencyLimiter::global),
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered list of stages run concurrently over bounded queues
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    queue_capacity: usize,
    max_in_flight: usize,
    signers: Signers,
    limiter: Arc<ConcurrencyLimiter>,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Names of the stages, in order
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Token that aborts runs of this pipeline.
    ///
    /// Once cancelled, every later run returns `Cancelled` too.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Slow-digest lock this pipeline uses
    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    /// Run the pipeline without events
    pub fn run<I>(&self, items: I) -> Result<PipelineResult, PipelineError>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        self.run_with_events(items, &null_sender())
    }

    /// Run the pipeline with event reporting.
    ///
    /// Returns once every stage has closed its output and terminated.
    pub fn run_with_events<I>(
        &self,
        items: I,
        events: &EventSender,
    ) -> Result<PipelineResult, PipelineError>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        let total_items = items.len();
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start_time = Instant::now();

        info!(%run_id, stages = self.stages.len(), items = total_items, "Pipeline started");
        events.send(PipelineEvent::Started {
            run_id,
            stages: self.stage_names(),
            total_items,
        });

        let cancel = &self.cancel;
        let failures = FailureLog::new();
        let (feed, mut upstream) = queue(self.queue_capacity, cancel);

        let (outputs, panicked) = thread::scope(|scope| {
            let mut workers = Vec::with_capacity(self.stages.len());

            for (index, stage) in self.stages.iter().enumerate() {
                let (output, downstream) = queue(self.queue_capacity, cancel);
                let input = std::mem::replace(&mut upstream, downstream);
                let ctx = StageContext::new(
                    stage.name(),
                    self.signers.clone(),
                    self.limiter.clone(),
                    cancel.clone(),
                    events.clone(),
                    failures.clone(),
                    self.max_in_flight,
                );

                let handle = scope.spawn(move || {
                    let stage_start = Instant::now();
                    events.send(StageEvent::Started {
                        index,
                        stage: stage.name().to_string(),
                    });

                    stage.run(input, output, &ctx);

                    let duration_ms = stage_start.elapsed().as_millis() as u64;
                    debug!(stage = stage.name(), duration_ms, "Stage finished");
                    events.send(StageEvent::Finished {
                        index,
                        stage: stage.name().to_string(),
                        duration_ms,
                    });
                });
                workers.push((stage.name().to_string(), handle));
            }

            let feeder = {
                let failures = failures.clone();
                scope.spawn(move || feed_items(items, feed, &failures))
            };

            // Drain the last queue here so a chatty final stage never blocks.
            let outputs: Vec<String> = upstream.iter().collect();

            let mut panicked: Vec<String> = workers
                .into_iter()
                .filter_map(|(name, handle)| handle.join().err().map(|_| name))
                .collect();
            if feeder.join().is_err() {
                panicked.push(INPUT_STAGE.to_string());
            }

            (outputs, panicked)
        });

        let mut failures = failures.drain();
        failures.sort_by(|a, b| (&a.stage, &a.item).cmp(&(&b.stage, &b.item)));
        let duration_ms = start_time.elapsed().as_millis() as u64;

        if cancel.is_cancelled() {
            warn!(%run_id, duration_ms, "Pipeline cancelled");
            events.send(PipelineEvent::Cancelled);
            return Err(PipelineError::Cancelled);
        }

        if let Some(stage) = panicked.into_iter().next() {
            let error = PipelineError::StagePanicked { stage };
            warn!(%run_id, %error, "Pipeline failed");
            events.send(PipelineEvent::Error {
                message: error.to_string(),
            });
            return Err(error);
        }

        let result = PipelineResult {
            run_id,
            started_at,
            outputs,
            failures,
            total_items,
            duration_ms,
        };

        info!(
            %run_id,
            duration_ms,
            outputs = result.outputs.len(),
            failures = result.failures.len(),
            "Pipeline completed"
        );
        events.send(PipelineEvent::Completed {
            summary: result.summary(),
        });

        Ok(result)
    }
}

/// Normalize each item and submit it to the first queue.
///
/// Dropping `feed` on return closes the first queue.
fn feed_items(items: Vec<Item>, feed: Outbox, failures: &FailureLog) {
    for item in items {
        let label = item.label();
        let outcome = item
            .normalize()
            .and_then(|text| feed.send(text).map_err(Into::into));

        if let Err(error) = outcome {
            warn!(item = %label, %error, "Item rejected at input");
            failures.record(ItemFailure::new(INPUT_STAGE, label, error));
        }
    }
}

/// Run `stages` over `items` with default settings
pub fn execute_pipeline<I>(
    stages: Vec<Box<dyn Stage>>,
    items: I,
) -> Result<PipelineResult, PipelineError>
where
    I: IntoIterator,
    I::Item: Into<Item>,
{
    PipelineBuilder::new().stages(stages).build()?.run(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::digest::Digest;
    use crate::core::stage::stage_fn;
    use crate::core::sync::Inbox;
    use crate::error::{DigestError, ItemError};
    use crate::events::{event_channel, Event};
    use std::time::Duration;

    fn stub_digests() -> DigestConfig {
        let fast = |c: &str| -> Result<String, DigestError> { Ok(format!("f({c})")) };
        let slow = |c: &str| -> Result<String, DigestError> { Ok(format!("s({c})")) };
        DigestConfig::new().fast(Arc::new(fast)).slow(Arc::new(slow))
    }

    fn passthrough(name: &str) -> Box<dyn Stage> {
        Box::new(stage_fn(name, |input: Inbox, output: Outbox, _: &StageContext| {
            for item in input.iter() {
                if output.send(item).is_err() {
                    break;
                }
            }
        }))
    }

    #[test]
    fn builder_rejects_empty_stage_list() {
        let result = Pipeline::builder().build();
        assert!(matches!(
            result,
            Err(PipelineError::Build(BuildError::NoStages))
        ));
    }

    #[test]
    fn builder_rejects_zero_capacity() {
        let result = PipelineBuilder::signer().queue_capacity(0).build();
        assert!(matches!(
            result,
            Err(PipelineError::Build(BuildError::ZeroCapacity))
        ));
    }

    #[test]
    fn builder_rejects_zero_workers() {
        let result = PipelineBuilder::signer().max_in_flight(0).build();
        assert!(matches!(
            result,
            Err(PipelineError::Build(BuildError::ZeroInFlight))
        ));
    }

    #[test]
    fn signer_preset_has_three_stages() {
        let pipeline = PipelineBuilder::signer().build().unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["SingleHash", "MultiHash", "CombineResults"]
        );
    }

    #[test]
    fn default_limiter_is_the_global_one() {
        let pipeline = PipelineBuilder::signer().build().unwrap();
        assert!(Arc::ptr_eq(pipeline.limiter(), &ConcurrencyLimiter::global()));
    }

    #[test]
    fn passthrough_keeps_every_item() {
        let pipeline = Pipeline::builder()
            .stage(stage_fn("a", |input: Inbox, output: Outbox, _: &StageContext| {
                for item in input.iter() {
                    output.send(item).unwrap();
                }
            }))
            .queue_capacity(2)
            .build()
            .unwrap();

        let result = pipeline.run(0..250).unwrap();

        assert_eq!(result.outputs.len(), 250);
        assert!(result.is_complete());
    }

    #[test]
    fn stage_a_output_matches_composition_law() {
        let pipeline = Pipeline::builder()
            .stage(SingleHash::new())
            .digests(stub_digests())
            .limiter(Arc::new(ConcurrencyLimiter::exclusive()))
            .build()
            .unwrap();

        let mut outputs = pipeline.run(["0", "1"]).unwrap().outputs;
        outputs.sort();

        assert_eq!(outputs, vec!["f(0)~f(s(0))", "f(1)~f(s(1))"]);
    }

    #[test]
    fn non_text_items_fail_at_input_only() {
        let pipeline = Pipeline::builder()
            .stage(CombineResults::new())
            .build()
            .unwrap();

        let items = vec![Item::from("ok"), Item::from(vec![0xC3u8, 0x28]), Item::from(5)];
        let result = pipeline.run(items).unwrap();

        assert_eq!(result.output(), Some("5_ok"));
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].stage, INPUT_STAGE);
        assert!(matches!(result.failures[0].error, ItemError::NotText { .. }));
    }

    #[test]
    fn panicking_stage_is_reported_without_hanging() {
        let pipeline = Pipeline::builder()
            .stages(vec![passthrough("before")])
            .stage(stage_fn("broken", |_: Inbox, _: Outbox, _: &StageContext| {
                panic!("stage bug")
            }))
            .stage(CombineResults::new())
            .build()
            .unwrap();

        let result = pipeline.run(0..10);

        assert!(matches!(
            result,
            Err(PipelineError::StagePanicked { ref stage }) if stage == "broken"
        ));
    }

    #[test]
    fn cancellation_stops_a_slow_run() {
        let cancel = CancellationToken::new();
        let pipeline = PipelineBuilder::signer()
            .digests(DigestConfig::new().slow_latency(Duration::from_secs(30)))
            .limiter(Arc::new(ConcurrencyLimiter::exclusive()))
            .cancellation(cancel.clone())
            .build()
            .unwrap();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            cancel.cancel();
        });

        let start = Instant::now();
        let result = pipeline.run(0..20);
        canceller.join().unwrap();

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn events_follow_the_run() {
        let (sender, receiver) = event_channel();
        let pipeline = Pipeline::builder()
            .stage(CombineResults::new())
            .build()
            .unwrap();

        pipeline.run_with_events(["b", "a"], &sender).unwrap();
        drop(sender);

        let events: Vec<Event> = receiver.iter().collect();
        assert!(matches!(
            events.first(),
            Some(Event::Pipeline(PipelineEvent::Started { total_items: 2, .. }))
        ));
        assert!(matches!(
            events.last(),
            Some(Event::Pipeline(PipelineEvent::Completed { summary })) if summary.outputs == 1
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Stage(StageEvent::Finished { index: 0, .. }))));
    }

    #[test]
    fn execute_pipeline_runs_default_settings() {
        let digest = crate::core::digest::Xxh32Digest;
        let stages: Vec<Box<dyn Stage>> = vec![Box::new(MultiHash::new()), Box::new(CombineResults::new())];

        let result = execute_pipeline(stages, ["x"]).unwrap();

        let expected: String = (0..6)
            .map(|k| digest.digest(&format!("{k}x")).unwrap())
            .collect();
        assert_eq!(result.output(), Some(expected.as_str()));
    }
}
