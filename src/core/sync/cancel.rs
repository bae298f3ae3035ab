//! Cooperative cancellation.

use crate::error::ItemError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Signals every worker of a run to stop at its next suspension point.
///
/// The token is a channel that never carries a message: cancelling drops
/// the only sender, which disconnects every cloned receiver at once. That
/// lets workers wait on a queue or a permit and on cancellation in the
/// same `select!`.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(sender))),
            signal: receiver,
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let mut trigger = self
            .trigger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        drop(trigger.take());
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.signal.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready (disconnected) on cancellation
    pub fn signal(&self) -> &Receiver<()> {
        &self.signal
    }

    /// Sleep for `duration`, waking early on cancellation
    pub fn sleep(&self, duration: Duration) -> Result<(), ItemError> {
        if duration.is_zero() {
            return if self.is_cancelled() {
                Err(ItemError::Cancelled)
            } else {
                Ok(())
            };
        }

        match self.signal.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => Ok(()),
            _ => Err(ItemError::Cancelled),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn new_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.sleep(Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancel_wakes_sleepers() {
        let token = CancellationToken::new();
        let sleeper = token.clone();

        let start = Instant::now();
        let handle = thread::spawn(move || sleeper.sleep(Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(20));
        token.cancel();

        let result = handle.join().unwrap();
        assert_eq!(result, Err(ItemError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn zero_sleep_reports_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(token.sleep(Duration::ZERO), Err(ItemError::Cancelled));
    }
}
