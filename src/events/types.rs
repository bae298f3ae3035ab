//! Event type definitions for progress reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All events emitted by a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Run-level events
    Pipeline(PipelineEvent),
    /// Stage lifecycle events
    Stage(StageEvent),
    /// Per-item events
    Item(ItemEvent),
}

/// Run-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Run has started
    Started {
        run_id: Uuid,
        stages: Vec<String>,
        total_items: usize,
    },
    /// Every stage drained and terminated
    Completed { summary: PipelineSummary },
    /// Run was cancelled
    Cancelled,
    /// Run encountered a fatal error
    Error { message: String },
}

/// Stage lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageEvent {
    /// Stage task launched
    Started { index: usize, stage: String },
    /// Stage closed its output and returned
    Finished {
        index: usize,
        stage: String,
        duration_ms: u64,
    },
}

/// Per-item events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemEvent {
    /// A stage forwarded a value downstream
    Emitted { stage: String, value: String },
    /// A stage gave up on an item; the run continues
    Failed {
        stage: String,
        item: String,
        message: String,
    },
}

impl From<PipelineEvent> for Event {
    fn from(event: PipelineEvent) -> Self {
        Event::Pipeline(event)
    }
}

impl From<StageEvent> for Event {
    fn from(event: StageEvent) -> Self {
        Event::Stage(event)
    }
}

impl From<ItemEvent> for Event {
    fn from(event: ItemEvent) -> Self {
        Event::Item(event)
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Identifier of the run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Items submitted by the caller
    pub total_items: usize,
    /// Values produced by the last stage
    pub outputs: usize,
    /// Items that failed somewhere along the way
    pub failures: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
