//! Container: the runtime-state collaborator signals are bound to.
//!
//! One container corresponds to one resumable application instance. It
//! owns the signal factory, the per-store side table (subscription
//! managers and cached immutable signals, keyed by store identity instead
//! of reserved property names), the queue of scheduled subscribers, and
//! the serializability validator used by debug-checked writes.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use crate::error::SignalError;
use crate::signal::{Signal, SignalFlags};
use crate::store::{Store, StoreId};
use crate::subscription::{LocalSubscriptionManager, Subscriber, SubscriberId};
use crate::value::Value;

type SchedulerHook = Rc<dyn Fn(&Subscriber)>;

/// Side-table entry for one tracked store.
pub(crate) struct TrackedMeta {
    manager: Rc<LocalSubscriptionManager>,
    /// Cached per-property immutable signals, handed out by the property
    /// access resolver instead of fresh wrappers.
    const_signals: HashMap<Rc<str>, Signal>,
}

pub(crate) struct ContainerInner {
    stores: RefCell<HashMap<StoreId, TrackedMeta>>,
    pending: RefCell<Vec<Subscriber>>,
    pending_ids: RefCell<HashSet<SubscriberId>>,
    scheduler: RefCell<Option<SchedulerHook>>,
}

impl ContainerInner {
    /// Queue a subscriber for re-evaluation. Deduplicated; the scheduler
    /// hook still fires per notification so batching stays the hook's
    /// decision.
    pub(crate) fn schedule(&self, sub: Subscriber) {
        if self.pending_ids.borrow_mut().insert(sub.id()) {
            self.pending.borrow_mut().push(sub);
        }
        // Clone the hook out before calling it: it may re-enter the
        // container (read signals, register subscribers).
        let hook = self.scheduler.borrow().clone();
        if let Some(hook) = hook {
            hook(&sub);
        }
    }

    pub(crate) fn manager_of(&self, id: StoreId) -> Option<Rc<LocalSubscriptionManager>> {
        self.stores
            .borrow()
            .get(&id)
            .map(|meta| meta.manager.clone())
    }

    pub(crate) fn const_signal(&self, id: StoreId, key: &str) -> Option<Signal> {
        self.stores
            .borrow()
            .get(&id)
            .and_then(|meta| meta.const_signals.get(key).cloned())
    }
}

/// Handle to a container. Cloning shares the same instance.
#[derive(Clone)]
pub struct Container {
    inner: Rc<ContainerInner>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                stores: RefCell::new(HashMap::new()),
                pending: RefCell::new(Vec::new()),
                pending_ids: RefCell::new(HashSet::new()),
                scheduler: RefCell::new(None),
            }),
        }
    }

    /// Create a subscription manager bound to this container.
    pub fn create_manager(&self) -> Rc<LocalSubscriptionManager> {
        self.create_manager_with(Vec::new())
    }

    /// Create a manager seeded with subscribers, used when resuming a
    /// serialized container that already had registrations.
    pub fn create_manager_with(&self, seed: Vec<Subscriber>) -> Rc<LocalSubscriptionManager> {
        Rc::new(LocalSubscriptionManager::new(
            Rc::downgrade(&self.inner),
            seed,
        ))
    }

    /// Create a plain signal holding `value`, bound to a fresh manager.
    pub fn create_signal(&self, value: Value) -> Signal {
        self.create_signal_with_flags(value, SignalFlags::empty())
    }

    /// Create a plain signal with explicit flags. An `UNASSIGNED` signal
    /// holds `Null` as its raw placeholder until the first write.
    pub fn create_signal_with_flags(&self, value: Value, flags: SignalFlags) -> Signal {
        Signal::plain(value, self.create_manager(), flags)
    }

    /// Register a store with this container, giving it a subscription
    /// manager. Reads of the store's properties become trackable from
    /// this point on; wrappers created earlier pick the manager up
    /// lazily.
    pub fn track_store(&self, store: &Store) {
        let manager = self.create_manager();
        self.inner.stores.borrow_mut().insert(
            store.id(),
            TrackedMeta {
                manager,
                const_signals: HashMap::new(),
            },
        );
        store.attach_container(Rc::downgrade(&self.inner));
    }

    pub fn is_tracked(&self, store: &Store) -> bool {
        self.inner.stores.borrow().contains_key(&store.id())
    }

    /// The store's subscription manager, if the store is tracked here.
    pub fn manager_of(&self, store: &Store) -> Option<Rc<LocalSubscriptionManager>> {
        self.inner.manager_of(store.id())
    }

    /// Cache an immutable per-property signal for a tracked store. The
    /// resolver returns it for reads of `key` instead of constructing a
    /// wrapper.
    pub fn set_const_signal(&self, store: &Store, key: impl Into<Rc<str>>, signal: Signal) {
        if let Some(meta) = self.inner.stores.borrow_mut().get_mut(&store.id()) {
            meta.const_signals.insert(key.into(), signal);
        }
    }

    pub fn const_signal(&self, store: &Store, key: &str) -> Option<Signal> {
        self.inner.const_signal(store.id(), key)
    }

    /// Install a hook invoked once per scheduled subscriber. Independent
    /// of the hook, scheduled subscribers accumulate in the pending queue
    /// until drained.
    pub fn set_scheduler(&self, hook: impl Fn(&Subscriber) + 'static) {
        *self.inner.scheduler.borrow_mut() = Some(Rc::new(hook));
    }

    /// Take the deduplicated set of subscribers scheduled since the last
    /// drain. Order among them is unspecified.
    pub fn drain_scheduled(&self) -> Vec<Subscriber> {
        self.inner.pending_ids.borrow_mut().clear();
        std::mem::take(&mut *self.inner.pending.borrow_mut())
    }

    /// Validator used by debug-checked writes; see [`verify_serializable`].
    pub fn verify_serializable(&self, value: &Value) -> Result<(), SignalError> {
        verify_serializable(value)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that a value can survive serialization and resumption.
///
/// Plain data passes: null, booleans, numbers, strings, lists and stores
/// (recursively, cycle-safe), signals, and funcs that carry a captured
/// string form. Opaque handles and repr-less closures fail with the
/// offending kind named.
pub fn verify_serializable(value: &Value) -> Result<(), SignalError> {
    let mut visited = HashSet::new();
    verify_inner(value, &mut visited)
}

fn verify_inner(value: &Value, visited: &mut HashSet<usize>) -> Result<(), SignalError> {
    match value {
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => Ok(()),
        Value::List(items) => {
            if !visited.insert(Rc::as_ptr(items) as usize) {
                return Ok(());
            }
            for item in items.borrow().iter() {
                verify_inner(item, visited)?;
            }
            Ok(())
        }
        Value::Object(store) => {
            if !visited.insert(store.addr()) {
                return Ok(());
            }
            for (_, prop) in store.props_snapshot() {
                verify_inner(&prop, visited)?;
            }
            Ok(())
        }
        // Signals are recognized reactive wrappers; the container knows
        // how to serialize them.
        Value::Signal(_) => Ok(()),
        Value::Func(func) => {
            if func.repr().is_some() {
                Ok(())
            } else {
                Err(SignalError::NotSerializable("func"))
            }
        }
        Value::Opaque(_) => Err(SignalError::NotSerializable("opaque")),
    }
}
