use thiserror::Error;

/// Failures raised by the signal read/write protocol.
///
/// All of these are local, synchronous conditions surfaced at the point of
/// misuse. None are retried or swallowed here; callers (the render/task
/// runtime) decide how to recover.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SignalError {
    /// The signal is still in its `UNASSIGNED` state. This is a
    /// distinguished "value not yet available" condition so that callers
    /// (e.g. default-value logic) can special-case it instead of treating
    /// it as a genuine failure.
    #[error("signal read before first assignment")]
    Unassigned,

    /// Write attempted on a signal flagged `IMMUTABLE`, or on a derived
    /// signal (which is read-only by contract).
    #[error("cannot mutate an immutable signal")]
    ImmutableWrite,

    /// The value would break resumable serialization (live handles,
    /// closures without a captured string form). Checked on write in
    /// debug builds so bad state is caught before it is ever persisted.
    #[error("value of kind `{0}` cannot be serialized for resumption")]
    NotSerializable(&'static str),

    /// A signal was used where a primitive was expected. Almost always a
    /// missing `.value` access at the call site.
    #[error("cannot coerce a signal to {0}; read `.value` instead")]
    CoerceSignal(&'static str),

    /// Primitive coercion between incompatible value kinds.
    #[error("cannot coerce {from} to {to}")]
    Coercion {
        from: &'static str,
        to: &'static str,
    },
}
