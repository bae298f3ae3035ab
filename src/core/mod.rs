//! # Core Module
//!
//! The signing engine, independent of any front end.
//!
//! ## Modules
//! - `item` - Normalizes submitted values to text
//! - `digest` - Fast and slow digest functions
//! - `sync` - Cancellation, the slow-digest lock, stage queues
//! - `stage` - The stage contract and the built-in stages
//! - `pipeline` - Runs an ordered list of stages

pub mod digest;
pub mod item;
pub mod pipeline;
pub mod stage;
pub mod sync;

// Re-export commonly used types
pub use digest::{Digest, DigestConfig, DigestKind};
pub use item::Item;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineResult};
pub use stage::{CombineResults, MultiHash, SingleHash, Stage, StageContext};
pub use sync::{CancellationToken, ConcurrencyLimiter};
