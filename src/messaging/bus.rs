/// Event bus for out-of-process consumers
///
/// Forwards every event to subscribers over unbounded channels so slow
/// consumers (recorders, uploaders, speech) never block a tick.
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

use super::events::Event;
use super::listener::{EventListener, StampedEvent};
use crate::context::Context;

/// Subscriber ID for tracking subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Subscriber {
    id: SubscriberId,
    sender: Sender<StampedEvent>,
}

pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<RwLock<usize>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(0)),
        }
    }

    /// Subscribe to events, returns a receiver and subscription ID
    pub fn subscribe(&self) -> (Receiver<StampedEvent>, SubscriberId) {
        let (tx, rx) = unbounded();

        let mut next_id = self.next_id.write();
        let id = SubscriberId(*next_id);
        *next_id += 1;
        drop(next_id);

        self.subscribers.write().push(Subscriber { id, sender: tx });

        (rx, id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Send to every subscriber without blocking
    pub fn publish(&self, event: StampedEvent) {
        let subscribers = self.subscribers.read();
        for subscriber in subscribers.iter() {
            // A closed channel only means the subscriber went away
            let _ = subscriber.sender.try_send(event.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl EventListener for EventBus {
    fn on_event(&mut self, ctx: &Context, event: &Event) {
        self.publish(StampedEvent {
            tick: ctx.tick(),
            msec: ctx.msec(),
            event: event.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(event: Event) -> StampedEvent {
        StampedEvent {
            tick: 1,
            msec: 0,
            event,
        }
    }

    #[test]
    fn test_event_bus_subscribe_and_unsubscribe() {
        let bus = EventBus::new();
        let (_rx, id) = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new();
        let (rx1, _id1) = bus.subscribe();
        let (rx2, _id2) = bus.subscribe();

        bus.publish(stamped(Event::GameFinish));

        assert_eq!(rx1.try_recv().unwrap().event, Event::GameFinish);
        assert_eq!(rx2.try_recv().unwrap().event, Event::GameFinish);
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let bus = EventBus::new();
        let (rx, _id) = bus.subscribe();
        drop(rx);

        bus.publish(stamped(Event::TimerReset));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_listener_stamps_context_time() {
        let mut bus = EventBus::new();
        let (rx, _id) = bus.subscribe();

        let mut ctx = Context::new();
        ctx.engine.tick = 12;
        ctx.engine.msec = 400;
        bus.on_event(&ctx, &Event::GameBeginning);

        let received = rx.try_recv().unwrap();
        assert_eq!((received.tick, received.msec), (12, 400));
    }

    #[test]
    fn test_event_bus_clone_shares_subscribers() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();

        let (_rx, _id) = bus1.subscribe();
        assert_eq!(bus2.subscriber_count(), 1);

        bus2.clear();
        assert_eq!(bus1.subscriber_count(), 0);
    }
}
