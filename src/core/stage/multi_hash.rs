//! Fan-out per-item digest.

use super::{Stage, StageContext};
use crate::core::sync::{Inbox, Outbox};
use crate::error::ItemError;
use std::thread;

/// Number of indexed sub-digests per item
pub const FAN_OUT: usize = 6;

/// Signs each item as `fast("0"+item) + fast("1"+item) + ...`.
///
/// The sub-digests run concurrently; each writes into its own slot, so
/// the concatenation follows the index, not completion order.
#[derive(Debug, Clone, Copy)]
pub struct MultiHash {
    fan_out: usize,
}

impl MultiHash {
    pub fn new() -> Self {
        Self { fan_out: FAN_OUT }
    }

    /// Use `fan_out` sub-digests instead of `FAN_OUT`
    pub fn with_fan_out(fan_out: usize) -> Self {
        Self { fan_out }
    }

    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    /// Concatenated sub-digests of one item
    pub fn sign(&self, item: &str, ctx: &StageContext) -> Result<String, ItemError> {
        let mut slots: Vec<Option<Result<String, ItemError>>> = vec![None; self.fan_out];

        thread::scope(|scope| {
            for (index, slot) in slots.iter_mut().enumerate() {
                scope.spawn(move || {
                    *slot = Some(ctx.fast_digest(&format!("{index}{item}")));
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(ItemError::WorkerPanicked)))
            .collect()
    }
}

impl Default for MultiHash {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for MultiHash {
    fn name(&self) -> &str {
        "MultiHash"
    }

    fn run(&self, input: Inbox, output: Outbox, ctx: &StageContext) {
        ctx.for_each_item(&input, &output, |item| self.sign(item, ctx));
    }
}
