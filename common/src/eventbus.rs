//! In-process typed pub/sub (spec §4.7).
//!
//! One `EventBus<E>` exists per event enum (rate events, lifecycle events,
//! bridge events, ...) rather than a single dynamically-typed bus — the
//! "topic" is the Rust type itself, which is the idiomatic rendering of
//! the source's ad-hoc emitter classes (see design notes in SPEC_FULL.md).
//!
//! `publish` invokes subscribers synchronously, in registration order.
//! A subscriber that panics is caught and logged; it never stops later
//! subscribers from running, and never propagates to the publisher. The
//! subscriber list is copy-on-write: publish clones the current `Arc` under
//! a brief read lock and then iterates without holding any lock, so a
//! subscriber may itself subscribe/unsubscribe without deadlocking.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct EventBus<E> {
    subs: RwLock<Arc<Vec<(SubscriptionId, Callback<E>)>>>,
    next_id: AtomicU64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subs: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Returns a handle usable with `unsubscribe`.
    pub fn subscribe<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut guard = self.subs.write();
        let mut next = (**guard).clone();
        next.push((id, Arc::new(f)));
        *guard = Arc::new(next);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut guard = self.subs.write();
        let mut next = (**guard).clone();
        next.retain(|(sid, _)| *sid != id);
        *guard = Arc::new(next);
    }

    /// Synchronously fan out `event` to every current subscriber.
    pub fn publish(&self, event: E) {
        let snapshot = { self.subs.read().clone() };
        for (id, cb) in snapshot.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| cb(&event)));
            if let Err(panic) = result {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "<non-string panic payload>".to_string());
                tracing::error!(
                    subscriber_id = id.0,
                    panic = %msg,
                    "event bus subscriber panicked; continuing with remaining subscribers"
                );
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subs.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone)]
    struct Tick(u32);

    #[test]
    fn publishes_in_registration_order() {
        let bus: EventBus<Tick> = EventBus::new();
        let order = Arc::new(RwLock::new(Vec::new()));

        let o1 = order.clone();
        bus.subscribe(move |t: &Tick| o1.write().push((1, t.0)));
        let o2 = order.clone();
        bus.subscribe(move |t: &Tick| o2.write().push((2, t.0)));

        bus.publish(Tick(7));

        assert_eq!(*order.read(), vec![(1, 7), (2, 7)]);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let bus: EventBus<Tick> = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        bus.subscribe(|_: &Tick| panic!("boom"));
        let h = hits.clone();
        bus.subscribe(move |_: &Tick| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Tick(1));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let bus: EventBus<Tick> = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = bus.subscribe(move |_: &Tick| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Tick(1));
        bus.unsubscribe(id);
        bus.publish(Tick(2));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
