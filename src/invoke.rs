//! Execution context accessor.
//!
//! The core never receives "who is reading" as a parameter. Instead, every
//! tracked evaluation (a render pass, a task run, a computed read) is
//! entered through [`invoke`], which scopes an [`InvokeContext`] on a
//! thread-local stack. Signal reads consult the nearest enclosing context
//! via the pure accessors below.
//!
//! The stack is pushed and popped through an RAII guard, so the active
//! context is restored even when the tracked evaluation panics — tracking
//! never leaks across unrelated evaluations.
//!
//! Single logical thread of control: contexts do not cross threads.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::subscription::Subscriber;

/// Opaque reference to the render host element currently being evaluated.
/// Only used for diagnostic warnings; the core never dereferences it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct HostId(u64);

static NEXT_HOST_ID: AtomicU64 = AtomicU64::new(1);

impl HostId {
    /// Generate a new unique host ID.
    pub fn next() -> Self {
        HostId(NEXT_HOST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What kind of tracked evaluation is in progress.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InvokeEvent {
    Render,
    Task,
    Computed,
}

/// The ambient record of the currently executing consumer.
#[derive(Clone, Copy, Default, Debug)]
pub struct InvokeContext {
    pub subscriber: Option<Subscriber>,
    pub event: Option<InvokeEvent>,
    pub host: Option<HostId>,
}

impl InvokeContext {
    pub fn render(subscriber: Subscriber, host: HostId) -> Self {
        Self {
            subscriber: Some(subscriber),
            event: Some(InvokeEvent::Render),
            host: Some(host),
        }
    }

    pub fn task(subscriber: Subscriber) -> Self {
        Self {
            subscriber: Some(subscriber),
            event: Some(InvokeEvent::Task),
            host: None,
        }
    }

    pub fn computed(subscriber: Subscriber) -> Self {
        Self {
            subscriber: Some(subscriber),
            event: Some(InvokeEvent::Computed),
            host: None,
        }
    }

    /// A context with an event but no listening subscriber. Reads inside
    /// it are untracked.
    pub fn untracked(event: InvokeEvent) -> Self {
        Self {
            subscriber: None,
            event: Some(event),
            host: None,
        }
    }
}

thread_local! {
    static INVOKE_STACK: RefCell<Vec<InvokeContext>> = const { RefCell::new(Vec::new()) };
}

struct StackGuard;

impl Drop for StackGuard {
    fn drop(&mut self) {
        INVOKE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run `f` with `ctx` as the active execution context.
///
/// The context is popped when `f` returns *or panics*; the previous
/// context (if any) becomes active again.
pub fn invoke<R>(ctx: InvokeContext, f: impl FnOnce() -> R) -> R {
    INVOKE_STACK.with(|stack| stack.borrow_mut().push(ctx));
    let _guard = StackGuard;
    f()
}

fn current() -> Option<InvokeContext> {
    INVOKE_STACK.with(|stack| stack.borrow().last().copied())
}

/// The subscriber listening in the innermost active context, if any.
pub fn current_subscriber() -> Option<Subscriber> {
    current().and_then(|ctx| ctx.subscriber)
}

/// The event kind of the innermost active context, if any.
pub fn current_event() -> Option<InvokeEvent> {
    current().and_then(|ctx| ctx.event)
}

/// The host element of the innermost active context, if any.
pub fn current_host_element() -> Option<HostId> {
    current().and_then(|ctx| ctx.host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::SubscriberKind;

    #[test]
    fn test_no_context_outside_invoke() {
        assert!(current_subscriber().is_none());
        assert!(current_event().is_none());
        assert!(current_host_element().is_none());
    }

    #[test]
    fn test_context_visible_inside_invoke() {
        let sub = Subscriber::new(SubscriberKind::Task);
        invoke(InvokeContext::task(sub), || {
            assert_eq!(current_subscriber().map(|s| s.id()), Some(sub.id()));
            assert_eq!(current_event(), Some(InvokeEvent::Task));
        });
        assert!(current_subscriber().is_none());
    }

    #[test]
    fn test_nested_contexts_restore_outer() {
        let outer = Subscriber::new(SubscriberKind::Render);
        let inner = Subscriber::new(SubscriberKind::Computed);
        let host = HostId::next();
        invoke(InvokeContext::render(outer, host), || {
            assert_eq!(current_event(), Some(InvokeEvent::Render));
            assert_eq!(current_host_element(), Some(host));
            invoke(InvokeContext::computed(inner), || {
                assert_eq!(current_subscriber().map(|s| s.id()), Some(inner.id()));
                assert_eq!(current_event(), Some(InvokeEvent::Computed));
                assert!(current_host_element().is_none());
            });
            assert_eq!(current_subscriber().map(|s| s.id()), Some(outer.id()));
            assert_eq!(current_event(), Some(InvokeEvent::Render));
        });
    }

    #[test]
    fn test_context_popped_on_panic() {
        let sub = Subscriber::new(SubscriberKind::Task);
        let result = std::panic::catch_unwind(|| {
            invoke(InvokeContext::task(sub), || {
                panic!("boom");
            })
        });
        assert!(result.is_err());
        // The failed evaluation must not leave its context behind.
        assert!(current_subscriber().is_none());
        assert!(current_event().is_none());
    }

    #[test]
    fn test_untracked_context_has_no_subscriber() {
        invoke(InvokeContext::untracked(InvokeEvent::Render), || {
            assert!(current_subscriber().is_none());
            assert_eq!(current_event(), Some(InvokeEvent::Render));
        });
    }
}
