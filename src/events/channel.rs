//! Crossbeam-backed event channel.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Create a connected sender/receiver pair.
///
/// The channel is unbounded: a listener that falls behind must never
/// throttle a run.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (sender, receiver) = unbounded();
    (EventSender(sender), EventReceiver(receiver))
}

/// A sender nobody listens to
pub fn null_sender() -> EventSender {
    event_channel().0
}

/// Handle the executor and stages report through
#[derive(Debug, Clone)]
pub struct EventSender(Sender<Event>);

impl EventSender {
    /// Report an event; dropped if nobody is listening any more
    pub fn send(&self, event: impl Into<Event>) {
        let _ = self.0.send(event.into());
    }
}

/// Listening end of an event channel
#[derive(Debug)]
pub struct EventReceiver(Receiver<Event>);

impl EventReceiver {
    /// Events in send order, until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.0.iter()
    }
}
