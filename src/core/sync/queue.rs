//! Bounded queues connecting adjacent stages.

use super::CancellationToken;
use crate::error::QueueError;
use crossbeam_channel::{bounded, select, Receiver, Sender};

/// In-flight items a queue buffers before senders block
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Create a queue of `capacity` items.
///
/// The queue is closed when the `Outbox` is dropped; the `Inbox` then
/// yields what is still buffered and ends.
pub fn queue(capacity: usize, cancel: &CancellationToken) -> (Outbox, Inbox) {
    let (sender, receiver) = bounded(capacity);
    (
        Outbox {
            sender,
            cancel: cancel.clone(),
        },
        Inbox {
            receiver,
            cancel: cancel.clone(),
        },
    )
}

/// Consuming end of a queue
#[derive(Debug)]
pub struct Inbox {
    receiver: Receiver<String>,
    cancel: CancellationToken,
}

impl Inbox {
    /// Next item, or `None` once the queue is closed and drained or the
    /// run is cancelled.
    pub fn recv(&self) -> Option<String> {
        if self.cancel.is_cancelled() {
            return None;
        }

        select! {
            recv(self.receiver) -> item => item.ok(),
            recv(self.cancel.signal()) -> _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::from_fn(move || self.recv())
    }
}

/// Producing end of a queue. Dropping it closes the queue.
///
/// `Outbox` is `Sync`, so per-item workers spawned in a scope can share
/// a borrow of it; the owner drops it only after the scope has joined.
#[derive(Debug)]
pub struct Outbox {
    sender: Sender<String>,
    cancel: CancellationToken,
}

impl Outbox {
    /// Send an item, blocking while the queue is full.
    pub fn send(&self, item: String) -> Result<(), QueueError> {
        if self.cancel.is_cancelled() {
            return Err(QueueError::Cancelled);
        }

        select! {
            send(self.sender, item) -> sent => sent.map_err(|_| QueueError::Disconnected),
            recv(self.cancel.signal()) -> _ => Err(QueueError::Cancelled),
        }
    }

    /// Close the queue explicitly
    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn closing_ends_iteration_after_buffered_items() {
        let cancel = CancellationToken::new();
        let (outbox, inbox) = queue(4, &cancel);

        outbox.send("a".to_string()).unwrap();
        outbox.send("b".to_string()).unwrap();
        outbox.close();

        assert_eq!(inbox.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(inbox.recv().is_none());
    }

    #[test]
    fn full_queue_applies_backpressure() {
        let cancel = CancellationToken::new();
        let (outbox, inbox) = queue(1, &cancel);

        thread::scope(|s| {
            let producer = s.spawn(|| {
                for i in 0..5 {
                    outbox.send(i.to_string()).unwrap();
                }
            });

            thread::sleep(Duration::from_millis(20));
            assert!(!producer.is_finished());

            let received: Vec<_> = (0..5).filter_map(|_| inbox.recv()).collect();
            assert_eq!(received, vec!["0", "1", "2", "3", "4"]);
        });
    }

    #[test]
    fn send_to_dropped_inbox_is_disconnected() {
        let cancel = CancellationToken::new();
        let (outbox, inbox) = queue(1, &cancel);
        drop(inbox);

        assert_eq!(outbox.send("x".to_string()), Err(QueueError::Disconnected));
    }

    #[test]
    fn blocked_send_wakes_on_cancel() {
        let cancel = CancellationToken::new();
        let (outbox, _inbox) = queue(1, &cancel);
        outbox.send("fill".to_string()).unwrap();

        thread::scope(|s| {
            let blocked = s.spawn(|| outbox.send("stuck".to_string()));
            thread::sleep(Duration::from_millis(20));
            cancel.cancel();
            assert_eq!(blocked.join().unwrap(), Err(QueueError::Cancelled));
        });
    }

    #[test]
    fn recv_returns_none_after_cancel() {
        let cancel = CancellationToken::new();
        let (outbox, inbox) = queue(2, &cancel);
        outbox.send("pending".to_string()).unwrap();

        cancel.cancel();
        assert!(inbox.recv().is_none());
    }
}
