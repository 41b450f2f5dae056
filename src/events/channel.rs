//! Crossbeam-backed transport for pipeline events.
//!
//! A run writes progress, group batches and its terminal event through an
//! [`EventSender`]. Whoever drives the run (the CLI, a test, a GUI) drains
//! the matching [`EventReceiver`], usually on its own thread.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Writing half, cloned into every place that reports progress.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Deliver an event. Blocks only on a full bounded channel.
    ///
    /// A run without a listener keeps going; events sent after the
    /// receiver is dropped are discarded.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Reading half. Iteration ends once every sender is gone, which is
/// after the run's `Finished` event.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Events in send order, until all senders drop
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel; the pipeline never waits on its listener.
    pub fn new() -> (EventSender, EventReceiver) {
        Self::wrap(unbounded())
    }

    /// Channel holding at most `capacity` pending events.
    ///
    /// With a capacity of 0 every send waits until the listener takes the
    /// event, so a listener that cancels on some event stops the run
    /// before the next one is produced.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        Self::wrap(bounded(capacity))
    }

    fn wrap((sender, receiver): (Sender<Event>, Receiver<Event>)) -> (EventSender, EventReceiver) {
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender with nobody listening, for runs that need no reporting.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
