//! Publish/subscribe bus for car lifecycle events
//!
//! Nodes detect when a car should appear or disappear, but only the owner of
//! the car arena may allocate or free one. The bus decouples the two. Delivery
//! is synchronous and in subscription order, so a publish made during a tick
//! is fully handled before the publisher continues.
//!
//! The bus is generic over the context handed to subscribers at publish time.
//! The world passes its mutable traffic state, which lets a subscriber act on
//! the graph without holding a reference to it between ticks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::trace;

use super::types::{CarId, LaneId};

/// Topic names a subscriber can register for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CreateCar,
    DeleteCar,
}

impl Topic {
    pub fn name(self) -> &'static str {
        match self {
            Topic::CreateCar => "create_car",
            Topic::DeleteCar => "delete_car",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lifecycle event together with its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// A generator asks for a new car at the start of this lane
    CreateCar(LaneId),
    /// A sink has absorbed this car and it should be released
    DeleteCar(CarId),
}

impl Notification {
    pub fn topic(&self) -> Topic {
        match self {
            Notification::CreateCar(_) => Topic::CreateCar,
            Notification::DeleteCar(_) => Topic::DeleteCar,
        }
    }
}

/// Something that reacts to notifications
pub trait Subscriber<C>: Send + Sync {
    fn notify(&self, ctx: &mut C, notification: &Notification);
}

/// Topic-keyed subscriber registry
pub struct NotificationBus<C> {
    subscriptions: HashMap<Topic, Vec<Arc<dyn Subscriber<C>>>>,
}

impl<C> Default for NotificationBus<C> {
    fn default() -> Self {
        Self {
            subscriptions: HashMap::new(),
        }
    }
}

impl<C> NotificationBus<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for a topic.
    ///
    /// Registrations are not deduplicated: subscribing twice means being
    /// notified twice.
    pub fn subscribe(&mut self, topic: Topic, subscriber: Arc<dyn Subscriber<C>>) {
        self.subscriptions.entry(topic).or_default().push(subscriber);
    }

    /// Deliver a notification to every subscriber of its topic, in the order
    /// they subscribed. Does nothing when the topic has no subscribers.
    pub fn publish(&self, ctx: &mut C, notification: Notification) {
        let topic = notification.topic();
        let Some(subscribers) = self.subscriptions.get(&topic) else {
            trace!("No subscribers for {}", topic);
            return;
        };

        for subscriber in subscribers {
            subscriber.notify(ctx, &notification);
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscriptions.get(&topic).map_or(0, Vec::len)
    }
}
