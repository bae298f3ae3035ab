//! Composite per-item digest.

use super::{Stage, StageContext};
use crate::core::sync::{Inbox, Outbox};
use crate::error::ItemError;
use std::thread;

/// Joins the two halves of a composite digest
pub const COMPOSITE_SEPARATOR: &str = "~";

/// Signs each item as `fast(item) ~ fast(slow(item))`.
///
/// Every item gets its own worker (up to the stage's in-flight cap), and
/// each worker computes both halves concurrently. Only the slow digest call itself is serialized, through
/// the run's slow-digest lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleHash;

impl SingleHash {
    pub fn new() -> Self {
        Self
    }

    /// Composite digest of one item
    pub fn sign(&self, item: &str, ctx: &StageContext) -> Result<String, ItemError> {
        thread::scope(|scope| {
            let slow_branch = scope.spawn(|| {
                let slow = ctx.slow_digest(item)?;
                ctx.fast_digest(&slow)
            });

            let fast = ctx.fast_digest(item);
            let slow_then_fast = slow_branch
                .join()
                .unwrap_or(Err(ItemError::WorkerPanicked));

            Ok(format!("{}{}{}", fast?, COMPOSITE_SEPARATOR, slow_then_fast?))
        })
    }
}

impl Stage for SingleHash {
    fn name(&self) -> &str {
        "SingleHash"
    }

    fn run(&self, input: Inbox, output: Outbox, ctx: &StageContext) {
        ctx.for_each_item(&input, &output, |item| self.sign(item, ctx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::digest::{Digest, DigestConfig};
    use crate::core::sync::{queue, CancellationToken};
    use crate::error::DigestError;
    use std::sync::Arc;

    fn stub_context(cancel: &CancellationToken) -> (StageContext, super::super::FailureLog) {
        let fast = |c: &str| -> Result<String, DigestError> { Ok(format!("f({c})")) };
        let slow = |c: &str| -> Result<String, DigestError> { Ok(format!("s({c})")) };
        let (ctx, failures) = StageContext::detached("SingleHash", cancel);
        let ctx = ctx.with_signers(
            DigestConfig::new()
                .fast(Arc::new(fast))
                .slow(Arc::new(slow))
                .build(),
        );
        (ctx, failures)
    }

    #[test]
    fn sign_composes_fast_and_slow() {
        let cancel = CancellationToken::new();
        let (ctx, _) = stub_context(&cancel);

        assert_eq!(SingleHash.sign("0", &ctx).unwrap(), "f(0)~f(s(0))");
    }

    #[test]
    fn run_emits_one_value_per_item() {
        let cancel = CancellationToken::new();
        let (ctx, failures) = stub_context(&cancel);
        let (feed, input) = queue(8, &cancel);
        let (output, results) = queue(8, &cancel);

        feed.send("0".to_string()).unwrap();
        feed.send("1".to_string()).unwrap();
        feed.close();

        SingleHash.run(input, output, &ctx);

        let mut values: Vec<_> = results.iter().collect();
        values.sort();
        assert_eq!(values, vec!["f(0)~f(s(0))", "f(1)~f(s(1))"]);
        assert!(failures.drain().is_empty());
    }

    #[test]
    fn failing_slow_digest_fails_only_that_item() {
        let cancel = CancellationToken::new();
        let slow = |c: &str| -> Result<String, DigestError> {
            if c == "bad" {
                Err(DigestError::Failed("rejected".to_string()))
            } else {
                Ok(format!("s({c})"))
            }
        };
        let (ctx, failures) = StageContext::detached("SingleHash", &cancel);
        let ctx = ctx.with_signers(DigestConfig::new().slow(Arc::new(slow)).build());

        let (feed, input) = queue(8, &cancel);
        let (output, results) = queue(8, &cancel);
        for item in ["good", "bad"] {
            feed.send(item.to_string()).unwrap();
        }
        feed.close();

        SingleHash.run(input, output, &ctx);

        assert_eq!(results.iter().count(), 1);
        let failures = failures.drain();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].item, "bad");
    }

    #[test]
    fn builtin_digests_produce_composite() {
        let cancel = CancellationToken::new();
        let (ctx, _) = StageContext::detached("SingleHash", &cancel);

        let fast = crate::core::digest::Xxh32Digest;
        let md5 = crate::core::digest::Md5Digest::new();
        let expected = format!(
            "{}~{}",
            fast.digest("0").unwrap(),
            fast.digest(&md5.digest("0").unwrap()).unwrap()
        );
        assert_eq!(SingleHash.sign("0", &ctx).unwrap(), expected);
    }
}
