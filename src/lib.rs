//! Fine-grained reactive signal core for resumable UIs.
//!
//! Dependency tracking lives in three pieces: signals ([`Signal`]) hold
//! values and delegate registration/notification to per-owner
//! subscription managers ([`subscription`]), the execution context
//! ([`invoke`]) says who is currently listening, and the property access
//! resolver ([`wrap`]) lazily wraps store properties in signals on first
//! reactive read. A [`Container`] binds it all to one resumable
//! application instance and guards serializability on writes.
//!
//! ```
//! use resin::prelude::*;
//!
//! let container = Container::new();
//! let count = container.create_signal(Value::Int(0));
//!
//! let sub = Subscriber::new(SubscriberKind::Render);
//! invoke(InvokeContext::task(sub), || {
//!     count.value().unwrap(); // registers `sub`
//! });
//!
//! count.set_value(Value::Int(1)).unwrap();
//! assert_eq!(container.drain_scheduled().len(), 1);
//! ```

pub mod container;
pub mod error;
pub mod invoke;
pub mod signal;
pub mod store;
pub mod subscription;
pub mod value;
pub mod wrap;

pub use container::{verify_serializable, Container};
pub use error::SignalError;
pub use invoke::{
    current_event, current_host_element, current_subscriber, invoke, HostId, InvokeContext,
    InvokeEvent,
};
pub use signal::{Signal, SignalFlags, SignalTag};
pub use store::{ImmutableSlot, Store, StoreId};
pub use subscription::{LocalSubscriptionManager, Subscriber, SubscriberId, SubscriberKind};
pub use value::{is_signal, FuncValue, Value};
pub use wrap::{wrap_prop, wrap_signal, Resolved};

pub mod prelude {
    pub use crate::container::{verify_serializable, Container};
    pub use crate::error::SignalError;
    pub use crate::invoke::{
        current_event, current_host_element, current_subscriber, invoke, HostId, InvokeContext,
        InvokeEvent,
    };
    pub use crate::signal::{Signal, SignalFlags, SignalTag};
    pub use crate::store::{ImmutableSlot, Store};
    pub use crate::subscription::{Subscriber, SubscriberKind};
    pub use crate::value::{is_signal, FuncValue, Value};
    pub use crate::wrap::{wrap_prop, wrap_signal, Resolved};
}
