//! # Pipeline Module
//!
//! Wires stages together and runs them.
//!
//! ## Queues
//! N stages get N+1 bounded queues: one the executor fills with the
//! caller's items, one between each pair of stages, and one the executor
//! drains. Each stage closes the queue it writes to when it returns, so
//! "no more work" travels downstream one stage at a time.
//!
//! ## Parallelism
//! Every stage runs on its own scoped thread; `run` joins all of them
//! before returning.

mod executor;

pub use executor::{execute_pipeline, Pipeline, PipelineBuilder, PipelineResult, INPUT_STAGE};
pub use crate::core::sync::CancellationToken;
