//! Subscriber tokens and the per-owner subscription registry.
//!
//! Every signal-like owner (a plain signal, a tracked store) holds a
//! [`LocalSubscriptionManager`]. Reading the owner under an active
//! execution context registers the current [`Subscriber`]; writing asks
//! the manager to notify everyone registered. Notification schedules
//! subscribers with the owning container — actually re-running them is
//! the render/task runtime's job.

use std::cell::RefCell;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::container::ContainerInner;
use crate::invoke::HostId;

/// Unique identifier for a subscriber.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriberId(u64);

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn next() -> Self {
        SubscriberId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What kind of consumer a subscriber stands for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SubscriberKind {
    /// A component render pass.
    Render,
    /// A task run.
    Task,
    /// A computed-signal evaluation.
    Computed,
}

/// A cheap, copyable token identifying one consumer of signal changes.
///
/// The core only needs identity (for deduplication) and kind/host (for
/// diagnostics); the runtime that minted the token knows how to re-run
/// the consumer behind it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Subscriber {
    id: SubscriberId,
    kind: SubscriberKind,
    host: Option<HostId>,
}

impl Subscriber {
    pub fn new(kind: SubscriberKind) -> Self {
        Self {
            id: SubscriberId::next(),
            kind,
            host: None,
        }
    }

    pub fn with_host(kind: SubscriberKind, host: HostId) -> Self {
        Self {
            id: SubscriberId::next(),
            kind,
            host: Some(host),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn kind(&self) -> SubscriberKind {
        self.kind
    }

    pub fn host(&self) -> Option<HostId> {
        self.host
    }
}

/// Per-owner registry of subscribers to notify on change.
///
/// Created by a [`Container`](crate::container::Container) and held by the
/// owner through an `Rc`. Registration is idempotent per subscriber id;
/// notification order among subscribers is unspecified.
pub struct LocalSubscriptionManager {
    container: Weak<ContainerInner>,
    subs: RefCell<Vec<Subscriber>>,
}

impl LocalSubscriptionManager {
    pub(crate) fn new(container: Weak<ContainerInner>, seed: Vec<Subscriber>) -> Self {
        Self {
            container,
            subs: RefCell::new(seed),
        }
    }

    /// Register a subscriber. Registering the same subscriber twice within
    /// a tracking pass is a no-op.
    pub fn add_sub(&self, sub: Subscriber) {
        let mut subs = self.subs.borrow_mut();
        if subs.iter().any(|existing| existing.id() == sub.id()) {
            return;
        }
        subs.push(sub);
    }

    /// Remove a subscriber. The owner of a torn-down consumer calls this;
    /// the signal itself has no visibility into consumer teardown.
    pub fn remove_sub(&self, id: SubscriberId) {
        self.subs.borrow_mut().retain(|sub| sub.id() != id);
    }

    /// Schedule every registered subscriber with the owning container.
    ///
    /// Synchronous: all currently-registered subscribers are scheduled
    /// before this returns. A manager whose container is gone notifies
    /// no one.
    pub fn notify_subs(&self) {
        let Some(container) = self.container.upgrade() else {
            return;
        };
        // Snapshot first: a scheduler hook may re-enter and register new
        // subscribers against this same manager.
        let snapshot: Vec<Subscriber> = self.subs.borrow().clone();
        for sub in snapshot {
            container.schedule(sub);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subs.borrow().len()
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.subs.borrow().iter().any(|sub| sub.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;

    #[test]
    fn test_add_sub_is_idempotent() {
        let container = Container::new();
        let manager = container.create_manager();
        let sub = Subscriber::new(SubscriberKind::Render);

        manager.add_sub(sub);
        manager.add_sub(sub);
        manager.add_sub(sub);
        assert_eq!(manager.subscriber_count(), 1);
    }

    #[test]
    fn test_remove_sub() {
        let container = Container::new();
        let manager = container.create_manager();
        let a = Subscriber::new(SubscriberKind::Task);
        let b = Subscriber::new(SubscriberKind::Render);

        manager.add_sub(a);
        manager.add_sub(b);
        manager.remove_sub(a.id());
        assert_eq!(manager.subscriber_count(), 1);
        assert!(!manager.is_subscribed(a.id()));
        assert!(manager.is_subscribed(b.id()));
    }

    #[test]
    fn test_notify_schedules_all_subscribers() {
        let container = Container::new();
        let manager = container.create_manager();
        let a = Subscriber::new(SubscriberKind::Render);
        let b = Subscriber::new(SubscriberKind::Task);

        manager.add_sub(a);
        manager.add_sub(b);
        manager.notify_subs();

        let scheduled = container.drain_scheduled();
        assert_eq!(scheduled.len(), 2);
        let ids: Vec<_> = scheduled.iter().map(|s| s.id()).collect();
        assert!(ids.contains(&a.id()));
        assert!(ids.contains(&b.id()));
    }

    #[test]
    fn test_notify_after_container_dropped_is_noop() {
        let container = Container::new();
        let manager = container.create_manager();
        manager.add_sub(Subscriber::new(SubscriberKind::Render));
        drop(container);
        // Must not panic or schedule anywhere.
        manager.notify_subs();
    }

    #[test]
    fn test_seeded_manager_starts_subscribed() {
        let container = Container::new();
        let sub = Subscriber::new(SubscriberKind::Task);
        let manager = container.create_manager_with(vec![sub]);
        assert!(manager.is_subscribed(sub.id()));
    }
}
