//! The stage contract.

use super::StageContext;
use crate::core::sync::{Inbox, Outbox};

/// A unit of work between two queues.
///
/// `run` must drain `input`, and must not return before every value it
/// intends to produce has been sent on `output`. Taking `output` by value
/// means the queue is closed exactly once, when `run` returns.
pub trait Stage: Send + Sync {
    /// Name used in logs, events and failure reports
    fn name(&self) -> &str;

    fn run(&self, input: Inbox, output: Outbox, ctx: &StageContext);
}

/// A stage built from a plain function
pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F> Stage for FnStage<F>
where
    F: Fn(Inbox, Outbox, &StageContext) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: Inbox, output: Outbox, ctx: &StageContext) {
        (self.f)(input, output, ctx)
    }
}

/// Wrap a function as a named stage
pub fn stage_fn<F>(name: impl Into<String>, f: F) -> FnStage<F>
where
    F: Fn(Inbox, Outbox, &StageContext) + Send + Sync,
{
    FnStage {
        name: name.into(),
        f,
    }
}
