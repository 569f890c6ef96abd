//! Property access resolver.
//!
//! Entry point for "read this property reactively". Given a host value
//! and a property key, [`wrap_prop`] decides whether the access is
//! satisfied directly, through an existing signal, or by lazily
//! constructing a wrapper signal. Wrapping is on demand: properties that
//! are never read reactively never allocate a signal, and the same store
//! serves both tracked and untracked access patterns depending on the
//! call site.

use crate::signal::Signal;
use crate::store::{ImmutableSlot, Store};
use crate::value::Value;

/// Outcome of resolving a reactive property access.
#[derive(Clone, Debug)]
pub enum Resolved {
    /// Plain value; no reactive semantics apply.
    Value(Value),
    /// A signal to read through.
    Signal(Signal),
    /// The raw property value was itself a signal: the caller should
    /// unwrap once more instead of building a signal-of-signal.
    UnwrapSignal,
}

/// Resolve a reactive property access. First match wins:
///
/// 1. Non-object host: raw member lookup, no wrapping possible.
/// 2. Host is a signal: the only property that makes sense through this
///    path is the value accessor; anything else is a programming error.
///    Returns the signal as-is so callers compose transparently.
/// 3. Host is a store: a cached immutable signal for the key wins;
///    otherwise any key not declared immutable gets a lazily-built
///    wrapper (the common case). Untracked hosts whose immutable slot
///    holds a signal yield that signal unwrapped.
/// 4. Declared-immutable fallthrough: the raw value, with a sentinel if
///    that value is itself a signal.
///
/// # Panics
///
/// Panics when `host` is a signal and `key` is not `"value"`.
pub fn wrap_prop(host: &Value, key: &str) -> Resolved {
    let store = match host {
        Value::Signal(signal) => {
            assert_eq!(
                key, "value",
                "property `{key}` requested on a signal; only the `value` accessor is valid here"
            );
            return Resolved::Signal(signal.clone());
        }
        Value::Object(store) => store,
        other => return Resolved::Value(other.member(key)),
    };

    if store.is_tracked() {
        if let Some(signal) = store.const_signal(key) {
            return Resolved::Signal(signal);
        }
        if !matches!(store.immutable_slot(key), Some(ImmutableSlot::Const)) {
            return Resolved::Signal(Signal::wrapper(store.clone(), key));
        }
    } else {
        match store.immutable_slot(key) {
            Some(ImmutableSlot::Signal(signal)) => return Resolved::Signal(signal),
            Some(ImmutableSlot::Const) => {}
            None => return Resolved::Signal(Signal::wrapper(store.clone(), key)),
        }
    }

    // Key declared immutable: fall back to the raw value. Tracked read,
    // so the host's own get semantics still apply.
    let raw = store.get_prop(key);
    if raw.is_signal() {
        return Resolved::UnwrapSignal;
    }
    Resolved::Value(raw)
}

/// [`wrap_prop`] with the sentinel collapsed: when the raw value was
/// itself a signal, that inner signal is returned once, never re-wrapped.
pub fn wrap_signal(host: &Value, key: &str) -> Value {
    match wrap_prop(host, key) {
        Resolved::Value(value) => value,
        Resolved::Signal(signal) => Value::Signal(signal),
        Resolved::UnwrapSignal => match host {
            Value::Object(store) => store.get_prop(key),
            other => other.member(key),
        },
    }
}
