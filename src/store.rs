//! Reactive host objects.
//!
//! A [`Store`] is the property-wrapper boundary of the deep reactivity
//! layer: a string-keyed bag of [`Value`]s with optional per-property
//! immutability metadata. A store starts plain; once a container tracks
//! it, property reads under an active execution context register the
//! current subscriber with the store's manager and writes notify it.
//!
//! The manager is resolved through the container side table at access
//! time, never cached — wrappers created before the store was tracked
//! pick it up automatically.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::container::ContainerInner;
use crate::error::SignalError;
use crate::invoke::current_subscriber;
use crate::signal::Signal;
use crate::subscription::LocalSubscriptionManager;
use crate::value::Value;

/// Unique identity of a store, used as the side-table key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StoreId(u64);

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

impl StoreId {
    pub fn next() -> Self {
        StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Declared-immutable metadata for one property.
#[derive(Clone)]
pub enum ImmutableSlot {
    /// The property is immutable; the resolver falls back to the raw
    /// value instead of constructing a wrapper.
    Const,
    /// The property is backed directly by this signal.
    Signal(Signal),
}

struct StoreInner {
    id: StoreId,
    props: RefCell<HashMap<Rc<str>, Value>>,
    immutable: RefCell<HashMap<Rc<str>, ImmutableSlot>>,
    container: RefCell<Option<Weak<ContainerInner>>>,
}

/// Handle to a reactive host object. Cloning shares the same object.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                id: StoreId::next(),
                props: RefCell::new(HashMap::new()),
                immutable: RefCell::new(HashMap::new()),
                container: RefCell::new(None),
            }),
        }
    }

    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<Rc<str>>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let store = Store::new();
        {
            let mut props = store.inner.props.borrow_mut();
            for (key, value) in entries {
                props.insert(key.into(), value);
            }
        }
        store
    }

    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    pub(crate) fn attach_container(&self, container: Weak<ContainerInner>) {
        *self.inner.container.borrow_mut() = Some(container);
    }

    /// The store's subscription manager, resolved through the container
    /// side table. `None` until the store is tracked (or after its
    /// container is gone).
    pub fn manager(&self) -> Option<Rc<LocalSubscriptionManager>> {
        let container = self.inner.container.borrow().clone()?;
        container.upgrade()?.manager_of(self.inner.id)
    }

    pub fn is_tracked(&self) -> bool {
        self.manager().is_some()
    }

    /// Cached immutable signal for `key`, if the tracking container holds
    /// one for this store.
    pub fn const_signal(&self, key: &str) -> Option<Signal> {
        let container = self.inner.container.borrow().clone()?;
        container.upgrade()?.const_signal(self.inner.id, key)
    }

    /// Read a property, registering the active subscriber (if any) with
    /// the store's manager. Missing properties read as `Null`.
    pub fn get_prop(&self, key: &str) -> Value {
        if let Some(sub) = current_subscriber() {
            if let Some(manager) = self.manager() {
                manager.add_sub(sub);
            }
        }
        self.get_prop_untracked(key)
    }

    /// Read a property without dependency registration.
    pub fn get_prop_untracked(&self, key: &str) -> Value {
        self.inner
            .props
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Write a property. Reference-equal rewrites are skipped entirely;
    /// an actual change notifies the store's subscribers. Debug-checked
    /// builds reject values that would break serialization.
    pub fn set_prop(&self, key: impl Into<Rc<str>>, value: Value) -> Result<(), SignalError> {
        if cfg!(debug_assertions) {
            crate::container::verify_serializable(&value)?;
        }
        let key = key.into();
        let changed = {
            let mut props = self.inner.props.borrow_mut();
            let old = props.get(&key).cloned().unwrap_or(Value::Null);
            if Value::same(&old, &value) {
                false
            } else {
                props.insert(key, value);
                true
            }
        };
        if changed {
            if let Some(manager) = self.manager() {
                manager.notify_subs();
            }
        }
        Ok(())
    }

    /// Write a property with no validation and no notification. Used
    /// when materializing resumed state.
    pub fn set_prop_untracked(&self, key: impl Into<Rc<str>>, value: Value) {
        self.inner.props.borrow_mut().insert(key.into(), value);
    }

    pub fn set_immutable(&self, key: impl Into<Rc<str>>, slot: ImmutableSlot) {
        self.inner.immutable.borrow_mut().insert(key.into(), slot);
    }

    pub fn immutable_slot(&self, key: &str) -> Option<ImmutableSlot> {
        self.inner.immutable.borrow().get(key).cloned()
    }

    pub(crate) fn props_snapshot(&self) -> Vec<(Rc<str>, Value)> {
        self.inner
            .props
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Store {}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("tracked", &self.is_tracked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::invoke::{invoke, InvokeContext};
    use crate::subscription::{Subscriber, SubscriberKind};

    #[test]
    fn test_missing_prop_reads_null() {
        let store = Store::new();
        assert!(Value::same(&store.get_prop("absent"), &Value::Null));
    }

    #[test]
    fn test_set_then_get() {
        let store = Store::new();
        store.set_prop("count", Value::Int(5)).unwrap();
        assert!(Value::same(&store.get_prop("count"), &Value::Int(5)));
    }

    #[test]
    fn test_untracked_store_has_no_manager() {
        let store = Store::new();
        assert!(store.manager().is_none());
        assert!(!store.is_tracked());
    }

    #[test]
    fn test_tracked_read_registers_subscriber() {
        let container = Container::new();
        let store = Store::from_entries([("count", Value::Int(0))]);
        container.track_store(&store);

        let sub = Subscriber::new(SubscriberKind::Render);
        invoke(InvokeContext::task(sub), || {
            store.get_prop("count");
        });
        assert!(store.manager().unwrap().is_subscribed(sub.id()));
    }

    #[test]
    fn test_write_notifies_tracked_store() {
        let container = Container::new();
        let store = Store::from_entries([("count", Value::Int(0))]);
        container.track_store(&store);

        let sub = Subscriber::new(SubscriberKind::Render);
        store.manager().unwrap().add_sub(sub);

        store.set_prop("count", Value::Int(1)).unwrap();
        assert_eq!(container.drain_scheduled().len(), 1);
    }

    #[test]
    fn test_same_value_write_skips_notification() {
        let container = Container::new();
        let store = Store::from_entries([("count", Value::Int(3))]);
        container.track_store(&store);
        store
            .manager()
            .unwrap()
            .add_sub(Subscriber::new(SubscriberKind::Render));

        store.set_prop("count", Value::Int(3)).unwrap();
        assert!(container.drain_scheduled().is_empty());
    }

    #[test]
    fn test_untracked_read_does_not_register() {
        let container = Container::new();
        let store = Store::from_entries([("count", Value::Int(0))]);
        container.track_store(&store);

        let sub = Subscriber::new(SubscriberKind::Render);
        invoke(InvokeContext::task(sub), || {
            store.get_prop_untracked("count");
        });
        assert_eq!(store.manager().unwrap().subscriber_count(), 0);
    }

    #[test]
    fn test_manager_resolves_after_late_tracking() {
        let store = Store::from_entries([("name", Value::str("a"))]);
        assert!(store.manager().is_none());

        let container = Container::new();
        container.track_store(&store);
        // No re-construction needed; the same handle sees the manager.
        assert!(store.manager().is_some());
    }

    #[test]
    fn test_identity_equality() {
        let a = Store::new();
        let b = a.clone();
        let c = Store::new();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_immutable_slots() {
        let store = Store::new();
        assert!(store.immutable_slot("k").is_none());
        store.set_immutable("k", ImmutableSlot::Const);
        assert!(matches!(
            store.immutable_slot("k"),
            Some(ImmutableSlot::Const)
        ));
    }
}
