// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session notifier: a publish/subscribe bus for session events.
//!
//! The notifier is an explicitly-injected object — components that need
//! events subscribe to a notifier instance handed to them, and hold the
//! returned [`SubscriptionId`] for the unsubscribe side of the lifecycle.
//!
//! Delivery is synchronous on the publishing thread. Performances emit their
//! own events in strictly nested order, and synchronous fan-out is what
//! carries that order through to subscribers; routing events through a
//! channel would decouple delivery from emission order, which the nesting
//! algorithm in [`crate::reporter`] cannot tolerate.

use crate::reporter::SessionEvent;
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicU64, Ordering},
};

/// A consumer of session events.
///
/// Implementations must be prepared for `handle_event` to be called from many
/// threads at once: unrelated performances publish in true parallel. Events
/// belonging to a single performance are delivered in emission order.
pub trait EventSubscriber: Send + Sync {
    /// Handles one published event.
    fn handle_event(&self, event: &SessionEvent);
}

/// Identifies one subscription for later removal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SubscriptionId(u64);

/// A publish/subscribe bus carrying [`SessionEvent`]s to subscribers.
pub struct SessionNotifier {
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn EventSubscriber>)>>,
    next_id: AtomicU64,
}

impl SessionNotifier {
    /// Creates a new notifier with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a subscriber, returning the id to unsubscribe with.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .expect("subscriber list lock poisoned")
            .push((id, subscriber));
        id
    }

    /// Removes a subscription. Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .expect("subscriber list lock poisoned");
        let before = subscribers.len();
        subscribers.retain(|(subscription_id, _)| *subscription_id != id);
        subscribers.len() != before
    }

    /// Publishes an event to every current subscriber, on the calling thread.
    pub fn publish(&self, event: &SessionEvent) {
        let subscribers = self
            .subscribers
            .read()
            .expect("subscriber list lock poisoned");
        for (_, subscriber) in subscribers.iter() {
            subscriber.handle_event(event);
        }
    }

    /// Returns the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscriber list lock poisoned")
            .len()
    }
}

impl Default for SessionNotifier {
    fn default() -> Self {
        Self::new()
    }
}
