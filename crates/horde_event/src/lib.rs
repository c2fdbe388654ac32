//! # horde_event - Typed Event Channels
//!
//! Events are scoped to the systems that produce them:
//! - `EventChannel<E>`: queued delivery, drained by the owner once per tick
//! - `Observers<E>`: immediate delivery to registered callbacks
//!
//! There is no global registry. Each system owns the channels it publishes on
//! and hands out senders or subscriptions explicitly.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

/// Subscriber ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// Sending half of an [`EventChannel`]. Cheap to clone.
pub struct EventSender<E> {
    tx: Sender<E>,
}

impl<E> EventSender<E> {
    /// Queue an event. Events sent after the channel is dropped are discarded.
    pub fn send(&self, event: E) {
        if self.tx.send(event).is_err() {
            log::debug!("event dropped: channel closed");
        }
    }
}

impl<E> std::fmt::Debug for EventSender<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender")
            .field("pending", &self.tx.len())
            .finish()
    }
}

impl<E> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Unbounded multi-producer event queue owned by one consumer
pub struct EventChannel<E> {
    tx: Sender<E>,
    rx: Receiver<E>,
}

impl<E> EventChannel<E> {
    /// Create a new channel
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Get a sender for producers
    pub fn sender(&self) -> EventSender<E> {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Queue an event
    pub fn send(&self, event: E) {
        // The channel holds its own receiver, so this cannot fail.
        let _ = self.tx.send(event);
    }

    /// Pop one pending event
    pub fn try_recv(&self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Take every pending event in send order
    pub fn drain(&self) -> Vec<E> {
        self.rx.try_iter().collect()
    }

    /// Discard every pending event
    pub fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Get pending event count
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Event handler function type
pub type Handler<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Typed observer list with immediate delivery
pub struct Observers<E> {
    handlers: RwLock<Vec<(SubscriberId, Handler<E>)>>,
    next_id: RwLock<u64>,
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: RwLock::new(1),
        }
    }

    /// Subscribe a handler
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut next = self.next_id.write();
            let id = SubscriberId(*next);
            *next += 1;
            id
        };
        self.handlers.write().push((id, Box::new(handler)));
        id
    }

    /// Unsubscribe. Returns false if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(sub_id, _)| *sub_id != id);
        handlers.len() != before
    }

    /// Deliver an event to every subscriber in subscription order
    pub fn notify(&self, event: &E) {
        for (_, handler) in self.handlers.read().iter() {
            handler(event);
        }
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

pub mod prelude {
    pub use crate::{EventChannel, EventSender, Handler, Observers, SubscriberId};
}
