//! Typed, scoped, synchronous publish/subscribe.
//!
//! A channel belongs to one [`Scope`] and only accepts events declared for that
//! scope, so a domain-local event can never be published on the broadcast bus
//! or on another domain's channel. Delivery is by exact Rust type: subscribing
//! to `A` never observes `B`, whatever relationship the two types have.
//!
//! Channels are `!Send`. Every publish and subscription happens on the thread
//! that owns the mediators; background work reports back through the kernel.

use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::warn;

pub trait Scope: 'static {
    const NAME: &'static str;
}

/// An event that may travel on channels of exactly one scope.
pub trait ChannelEvent: Any + fmt::Debug {
    type Scope: Scope;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of a single publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

impl Delivery {
    pub fn reached(&self) -> usize {
        self.delivered + self.failed
    }
}

type Handler = Rc<dyn Fn(&dyn Any) -> anyhow::Result<()>>;

pub struct EventChannel<S: Scope> {
    subscribers: RefCell<HashMap<TypeId, Vec<(SubscriptionId, Handler)>>>,
    next_id: Cell<u64>,
    _scope: PhantomData<S>,
}

impl<S: Scope> Default for EventChannel<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Scope> fmt::Debug for EventChannel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers: usize = self.subscribers.borrow().values().map(Vec::len).sum();
        f.debug_struct("EventChannel")
            .field("scope", &S::NAME)
            .field("subscribers", &subscribers)
            .finish()
    }
}

impl<S: Scope> EventChannel<S> {
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
            _scope: PhantomData,
        }
    }

    /// Registers `handler` for events of type `E`. Multiple handlers for the
    /// same type are all invoked, in registration order.
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: ChannelEvent<Scope = S>,
        F: Fn(&E) -> anyhow::Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let erased: Handler = Rc::new(move |event: &dyn Any| match event.downcast_ref::<E>() {
            Some(event) => handler(event),
            None => Ok(()),
        });

        self.subscribers
            .borrow_mut()
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, erased));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        for handlers in subscribers.values_mut() {
            if let Some(pos) = handlers.iter().position(|(sid, _)| *sid == id) {
                handlers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Invokes every handler currently registered for `E`.
    ///
    /// The handler list is snapshotted first: handlers may subscribe, unsubscribe
    /// or publish re-entrantly, and such changes take effect from the next
    /// publish. A handler returning `Err` is logged and skipped; the remaining
    /// handlers still receive the event. Panics are not caught.
    pub fn publish<E>(&self, event: &E) -> Delivery
    where
        E: ChannelEvent<Scope = S>,
    {
        let snapshot: Vec<(SubscriptionId, Handler)> = self
            .subscribers
            .borrow()
            .get(&TypeId::of::<E>())
            .cloned()
            .unwrap_or_default();

        let mut delivery = Delivery::default();
        for (id, handler) in snapshot {
            match handler(event) {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    delivery.failed += 1;
                    warn!(
                        scope = S::NAME,
                        event = type_name::<E>(),
                        subscription = id.0,
                        "event handler failed: {e:#}"
                    );
                }
            }
        }
        delivery
    }

    pub fn subscriber_count<E>(&self) -> usize
    where
        E: ChannelEvent<Scope = S>,
    {
        self.subscribers
            .borrow()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestScope;
    impl Scope for TestScope {
        const NAME: &'static str = "test";
    }

    #[derive(Debug, PartialEq)]
    struct Ping(u32);
    impl ChannelEvent for Ping {
        type Scope = TestScope;
    }

    #[derive(Debug)]
    struct Pong;
    impl ChannelEvent for Pong {
        type Scope = TestScope;
    }

    #[test]
    fn delivers_in_registration_and_publish_order() {
        let channel = EventChannel::<TestScope>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for name in ["a", "b"] {
            let log = log.clone();
            channel.subscribe(move |p: &Ping| {
                log.borrow_mut().push(format!("{name}{}", p.0));
                Ok(())
            });
        }

        channel.publish(&Ping(1));
        channel.publish(&Ping(2));

        assert_eq!(*log.borrow(), ["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn failing_handler_does_not_stop_delivery() {
        let channel = EventChannel::<TestScope>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        channel.subscribe(|_: &Ping| anyhow::bail!("boom"));
        let s = seen.clone();
        channel.subscribe(move |p: &Ping| {
            s.borrow_mut().push(p.0);
            Ok(())
        });

        let delivery = channel.publish(&Ping(7));

        assert_eq!(*seen.borrow(), [7]);
        assert_eq!(delivery, Delivery { delivered: 1, failed: 1 });
    }

    #[test]
    fn no_delivery_across_types() {
        let channel = EventChannel::<TestScope>::new();
        let pings = Rc::new(Cell::new(0));
        let p = pings.clone();
        channel.subscribe(move |_: &Ping| {
            p.set(p.get() + 1);
            Ok(())
        });

        assert_eq!(channel.publish(&Pong).reached(), 0);
        assert_eq!(pings.get(), 0);
    }

    #[test]
    fn subscribing_during_publish_applies_to_next_publish() {
        let channel = Rc::new(EventChannel::<TestScope>::new());
        let late_calls = Rc::new(Cell::new(0));

        let ch = Rc::downgrade(&channel);
        let late = late_calls.clone();
        channel.subscribe(move |_: &Ping| {
            if let Some(ch) = ch.upgrade() {
                let late = late.clone();
                ch.subscribe(move |_: &Ping| {
                    late.set(late.get() + 1);
                    Ok(())
                });
            }
            Ok(())
        });

        channel.publish(&Ping(1));
        assert_eq!(late_calls.get(), 0);

        channel.publish(&Ping(2));
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let channel = EventChannel::<TestScope>::new();
        let a = channel.subscribe(|_: &Ping| Ok(()));
        channel.subscribe(|_: &Ping| Ok(()));

        assert!(channel.unsubscribe(a));
        assert!(!channel.unsubscribe(a));
        assert_eq!(channel.subscriber_count::<Ping>(), 1);
    }
}
