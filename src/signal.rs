//! Signals: trackable value containers.
//!
//! One [`Signal`] type with three kinds behind a shared handle:
//!
//! - **Plain** — owns a raw value, a subscription manager, and a flag set.
//!   Reads under an active execution context register the current
//!   subscriber; writes notify every registered subscriber.
//! - **Derived** — recomputes a pure function over fixed arguments on
//!   every read. Owns no manager; its reactivity is whatever the signals
//!   read inside the function provide. Read-only.
//! - **Wrapper** — a signal-shaped view over one property of a host
//!   [`Store`], forwarding get/set to the host and resolving the host's
//!   manager lazily at access time.
//!
//! Identity is the handle: two signals holding the same value are never
//! equal unless they share the same inner allocation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::container::verify_serializable;
use crate::error::SignalError;
use crate::invoke::{current_event, current_host_element, current_subscriber, InvokeEvent};
use crate::store::Store;
use crate::subscription::LocalSubscriptionManager;
use crate::value::{FuncValue, Value};

bitflags! {
    /// Per-signal behavior flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SignalFlags: u8 {
        /// Writes are rejected.
        const IMMUTABLE = 1 << 0;
        /// Reads fail with [`SignalError::Unassigned`] until the first
        /// write clears the flag.
        const UNASSIGNED = 1 << 1;
    }
}

/// Which kind of signal a handle points at.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SignalTag {
    Plain,
    Derived,
    Wrapper,
}

struct PlainSignal {
    untracked_value: RefCell<Value>,
    manager: Rc<LocalSubscriptionManager>,
    flags: Cell<SignalFlags>,
}

struct DerivedSignal {
    func: FuncValue,
    args: Vec<Value>,
}

struct WrapperSignal {
    host: Store,
    key: Rc<str>,
}

enum SignalKind {
    Plain(PlainSignal),
    Derived(DerivedSignal),
    Wrapper(WrapperSignal),
}

/// A reactive value container. Cloning shares the same signal.
#[derive(Clone)]
pub struct Signal {
    inner: Rc<SignalKind>,
}

impl Signal {
    /// Plain signals are minted by the container factory so they are
    /// always bound to a container's subscription manager.
    pub(crate) fn plain(
        value: Value,
        manager: Rc<LocalSubscriptionManager>,
        flags: SignalFlags,
    ) -> Self {
        Self {
            inner: Rc::new(SignalKind::Plain(PlainSignal {
                untracked_value: RefCell::new(value),
                manager,
                flags: Cell::new(flags),
            })),
        }
    }

    /// A signal computed afresh from `func` over `args` on every read.
    pub fn derived(func: FuncValue, args: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(SignalKind::Derived(DerivedSignal { func, args })),
        }
    }

    /// A signal-shaped view over `host[key]`.
    pub fn wrapper(host: Store, key: impl Into<Rc<str>>) -> Self {
        Self {
            inner: Rc::new(SignalKind::Wrapper(WrapperSignal {
                host,
                key: key.into(),
            })),
        }
    }

    pub fn tag(&self) -> SignalTag {
        match &*self.inner {
            SignalKind::Plain(_) => SignalTag::Plain,
            SignalKind::Derived(_) => SignalTag::Derived,
            SignalKind::Wrapper(_) => SignalTag::Wrapper,
        }
    }

    /// Tracked read.
    ///
    /// Plain: fails with [`SignalError::Unassigned`] before the first
    /// write; otherwise registers the active subscriber (if any) with the
    /// owning manager before returning the raw value. Derived: recomputes
    /// every call, transparent to tracking. Wrapper: forwards to the
    /// host's property-get semantics.
    pub fn value(&self) -> Result<Value, SignalError> {
        match &*self.inner {
            SignalKind::Plain(plain) => {
                if plain.flags.get().contains(SignalFlags::UNASSIGNED) {
                    return Err(SignalError::Unassigned);
                }
                if let Some(sub) = current_subscriber() {
                    plain.manager.add_sub(sub);
                }
                Ok(plain.untracked_value.borrow().clone())
            }
            SignalKind::Derived(derived) => Ok(derived.func.call(&derived.args)),
            SignalKind::Wrapper(wrapper) => Ok(wrapper.host.get_prop(&wrapper.key)),
        }
    }

    /// Raw read, never registers a dependency. An unassigned plain signal
    /// reads as its `Null` placeholder here.
    pub fn untracked_value(&self) -> Value {
        match &*self.inner {
            SignalKind::Plain(plain) => plain.untracked_value.borrow().clone(),
            SignalKind::Derived(derived) => derived.func.call(&derived.args),
            SignalKind::Wrapper(wrapper) => wrapper.host.get_prop_untracked(&wrapper.key),
        }
    }

    /// Tracked write.
    ///
    /// Rejects writes to `IMMUTABLE` and derived signals. Debug-checked
    /// builds also reject non-serializable values and warn when the write
    /// happens inside a render pass or a computed evaluation. A
    /// reference-equal rewrite is a complete no-op; an actual change
    /// updates the raw value, clears `UNASSIGNED`, and notifies all
    /// subscribers before returning.
    pub fn set_value(&self, value: Value) -> Result<(), SignalError> {
        match &*self.inner {
            SignalKind::Plain(plain) => {
                let flags = plain.flags.get();
                if flags.contains(SignalFlags::IMMUTABLE) {
                    return Err(SignalError::ImmutableWrite);
                }
                if cfg!(debug_assertions) {
                    verify_serializable(&value)?;
                    warn_if_pure_context();
                }
                let unassigned = flags.contains(SignalFlags::UNASSIGNED);
                if !unassigned {
                    let old = plain.untracked_value.borrow();
                    if Value::same(&old, &value) {
                        return Ok(());
                    }
                }
                *plain.untracked_value.borrow_mut() = value;
                if unassigned {
                    plain.flags.set(flags - SignalFlags::UNASSIGNED);
                }
                plain.manager.notify_subs();
                Ok(())
            }
            SignalKind::Derived(_) => Err(SignalError::ImmutableWrite),
            SignalKind::Wrapper(wrapper) => wrapper.host.set_prop(wrapper.key.clone(), value),
        }
    }

    /// Flag set. Derived signals report `IMMUTABLE`; wrappers carry no
    /// flags of their own.
    pub fn flags(&self) -> SignalFlags {
        match &*self.inner {
            SignalKind::Plain(plain) => plain.flags.get(),
            SignalKind::Derived(_) => SignalFlags::IMMUTABLE,
            SignalKind::Wrapper(_) => SignalFlags::empty(),
        }
    }

    pub fn is_immutable(&self) -> bool {
        self.flags().contains(SignalFlags::IMMUTABLE)
    }

    /// The subscription manager behind this signal. Plain signals own
    /// one; wrappers resolve the host's manager at call time (never
    /// cached); derived signals have none.
    pub fn manager(&self) -> Option<Rc<LocalSubscriptionManager>> {
        match &*self.inner {
            SignalKind::Plain(plain) => Some(plain.manager.clone()),
            SignalKind::Derived(_) => None,
            SignalKind::Wrapper(wrapper) => wrapper.host.manager(),
        }
    }

    /// Host and key of a wrapper signal.
    pub fn wrapper_parts(&self) -> Option<(Store, Rc<str>)> {
        match &*self.inner {
            SignalKind::Wrapper(wrapper) => Some((wrapper.host.clone(), wrapper.key.clone())),
            _ => None,
        }
    }

    /// Pointer identity: the only equality signals have.
    pub fn same(a: &Signal, b: &Signal) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        Signal::same(self, other)
    }
}

impl Eq for Signal {}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Signal {}]", self.untracked_value())
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.inner {
            SignalKind::Plain(plain) => f
                .debug_struct("Signal")
                .field("value", &plain.untracked_value.borrow())
                .field("flags", &plain.flags.get())
                .finish(),
            SignalKind::Derived(derived) => f
                .debug_tuple("Signal::Derived")
                .field(&derived.func)
                .finish(),
            SignalKind::Wrapper(wrapper) => f
                .debug_struct("Signal::Wrapper")
                .field("host", &wrapper.host.id())
                .field("key", &wrapper.key)
                .finish(),
        }
    }
}

/// Mutating state as a side effect of a pure derivation defeats
/// dependency safety; say so, but do not alter control flow.
fn warn_if_pure_context() {
    match current_event() {
        Some(InvokeEvent::Render) => {
            log::warn!(
                "state mutation during render{}; move the write into a task",
                host_suffix()
            );
        }
        Some(InvokeEvent::Computed) => {
            log::warn!(
                "state mutation inside a computed evaluation{}; move the write into a task",
                host_suffix()
            );
        }
        _ => {}
    }
}

fn host_suffix() -> String {
    match current_host_element() {
        Some(host) => format!(" (host {host:?})"),
        None => String::new(),
    }
}
