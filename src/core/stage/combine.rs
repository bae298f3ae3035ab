//! Deterministic collector.

use super::{Stage, StageContext};
use crate::core::sync::{Inbox, Outbox};
use rayon::slice::ParallelSliceMut;

/// Separator between collected values
pub const SEPARATOR: &str = "_";

/// Sort `values` by byte order and join them with `separator`
pub fn combine(mut values: Vec<String>, separator: &str) -> String {
    values.par_sort_unstable();
    values.join(separator)
}

/// Collects every value of its input and emits one sorted, joined string.
///
/// Upstream stages emit in completion order; sorting here makes the final
/// output depend only on the set of values.
#[derive(Debug, Default, Clone, Copy)]
pub struct CombineResults;

impl CombineResults {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for CombineResults {
    fn name(&self) -> &str {
        "CombineResults"
    }

    fn run(&self, input: Inbox, output: Outbox, ctx: &StageContext) {
        let values: Vec<String> = input.iter().collect();
        if ctx.cancellation().is_cancelled() {
            return;
        }

        let count = values.len();
        let combined = combine(values, SEPARATOR);
        tracing::debug!(count, "Combined results");

        if let Err(error) = ctx.emit(&output, combined) {
            ctx.record_failure(&format!("<{count} combined values>"), error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::{queue, CancellationToken};

    #[test]
    fn combine_sorts_then_joins() {
        let values = vec!["b".to_string(), "c".to_string(), "a".to_string()];
        assert_eq!(combine(values, SEPARATOR), "a_b_c");
    }

    #[test]
    fn combine_keeps_duplicates() {
        let values = vec!["x".to_string(), "x".to_string()];
        assert_eq!(combine(values, "_"), "x_x");
    }

    #[test]
    fn combine_uses_byte_order() {
        let values = vec!["a".to_string(), "B".to_string(), "10".to_string(), "9".to_string()];
        assert_eq!(combine(values, "_"), "10_9_B_a");
    }

    #[test]
    fn run_emits_single_value() {
        let cancel = CancellationToken::new();
        let (ctx, _) = StageContext::detached("CombineResults", &cancel);
        let (feed, input) = queue(8, &cancel);
        let (output, results) = queue(8, &cancel);

        for value in ["2", "3", "1"] {
            feed.send(value.to_string()).unwrap();
        }
        feed.close();

        CombineResults::new().run(input, output, &ctx);

        assert_eq!(results.iter().collect::<Vec<_>>(), vec!["1_2_3"]);
    }

    #[test]
    fn empty_input_emits_empty_string() {
        let cancel = CancellationToken::new();
        let (ctx, _) = StageContext::detached("CombineResults", &cancel);
        let (feed, input) = queue(1, &cancel);
        let (output, results) = queue(1, &cancel);
        feed.close();

        CombineResults::new().run(input, output, &ctx);

        assert_eq!(results.iter().collect::<Vec<_>>(), vec![String::new()]);
    }
}
