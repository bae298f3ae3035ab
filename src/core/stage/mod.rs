//! # Stage Module
//!
//! Units of work connected by queues.
//!
//! A stage drains its `Inbox`, writes to its `Outbox`, and returns once
//! every item it accepted has been answered. Dropping the `Outbox` on
//! return is what tells the next stage that no more work is coming.
//!
//! ## Built-in Stages
//! 1. **SingleHash** - `fast(item) ~ fast(slow(item))` per item
//! 2. **MultiHash** - six indexed fast digests per item, concatenated
//! 3. **CombineResults** - sorts everything it received and joins it

mod combine;
mod context;
mod multi_hash;
mod single_hash;
mod traits;

pub use combine::{combine, CombineResults, SEPARATOR};
pub use context::{FailureLog, StageContext, DEFAULT_MAX_IN_FLIGHT};
pub use multi_hash::{MultiHash, FAN_OUT};
pub use single_hash::{SingleHash, COMPOSITE_SEPARATOR};
pub use traits::{stage_fn, FnStage, Stage};
