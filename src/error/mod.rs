//! # Error Module
//!
//! Error types for the signer pipeline.
//!
//! ## Design Principles
//! - **Never abort the process** on a bad item - record a per-item failure instead
//! - **Fail fast** on construction problems, before any worker is spawned
//! - **Include context** - the stage and the item that failed

use serde::Serialize;
use thiserror::Error;

/// Top-level pipeline error
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pipeline construction error: {0}")]
    Build(#[from] BuildError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stage '{stage}' panicked")]
    StagePanicked { stage: String },

    #[error("Pipeline was cancelled")]
    Cancelled,

    #[error("Failed to read input {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Errors detected while assembling a pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("A pipeline needs at least one stage")]
    NoStages,

    #[error("Queue capacity must be at least 1")]
    ZeroCapacity,

    #[error("Each stage needs room for at least 1 item in flight")]
    ZeroInFlight,
}

/// Errors raised by a digest function
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    #[error("{kind} digest overheated: called while another call was in flight")]
    Overheated { kind: String },

    #[error("Digest computation failed: {0}")]
    Failed(String),
}

/// Errors on a queue between two stages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Downstream queue is disconnected")]
    Disconnected,

    #[error("Queue operation was cancelled")]
    Cancelled,
}

/// Why a single item could not be processed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("Item is not valid text: {reason}")]
    NotText { reason: String },

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Worker for this item panicked")]
    WorkerPanicked,

    #[error("Item processing was cancelled")]
    Cancelled,
}

/// A per-item failure, collected alongside the successful results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Stage that failed the item (`input` for normalization failures)
    pub stage: String,
    /// Textual form of the item (lossy for non-text input)
    pub item: String,
    /// Rendered error message
    pub message: String,
    #[serde(skip)]
    pub error: ItemError,
}

impl ItemFailure {
    pub fn new(stage: impl Into<String>, item: impl Into<String>, error: ItemError) -> Self {
        Self {
            stage: stage.into(),
            item: item.into(),
            message: error.to_string(),
            error,
        }
    }
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {:?}: {}", self.stage, self.item, self.message)
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PipelineError>;
