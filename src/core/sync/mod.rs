//! # Sync Module
//!
//! Coordination primitives shared by the executor and the stages.
//!
//! - `cancel` - A token every suspension point selects on
//! - `limiter` - Permit pool guarding the slow digest
//! - `queue` - Bounded, closable queues between stages

mod cancel;
mod limiter;
mod queue;

pub use cancel::CancellationToken;
pub use limiter::{ConcurrencyLimiter, Permit};
pub use queue::{queue, Inbox, Outbox, DEFAULT_QUEUE_CAPACITY};
