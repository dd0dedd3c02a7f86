//! Reactive Primitives
//!
//! This module implements the observation machinery: handles that intercept
//! reads and writes on raw containers, and effects that re-run when what
//! they read changes.
//!
//! # Concepts
//!
//! ## Handles
//!
//! A [`Handle`] wraps one raw [`Object`](crate::Object). Reading through it
//! registers the running effect as a dependent of the `(target, key)` read;
//! writing through it notifies the dependents of the written key. Nested
//! containers are wrapped lazily, on read.
//!
//! ## Effects
//!
//! An [`Effect`] is a computation that runs once on creation and again
//! whenever one of its dependencies changes. Dependencies are re-derived on
//! every run.
//!
//! # Implementation Notes
//!
//! All engine state lives in a [`ReactiveContext`] owned by a [`Runtime`]
//! rather than in thread-locals, so independent runtimes never observe each
//! other.

mod context;
mod effect;
mod handle;
mod instrument;
mod interceptor;
mod registry;
mod runtime;
mod subscriber;

pub use context::{ReactiveContext, RuntimeStats};
pub use effect::{Effect, EffectOptions, EffectRef, Scheduler};
pub use handle::{Handle, Mode};
pub use instrument::Instrumentation;
pub use interceptor::{BaseInterceptor, CollectionHandlers, Interceptor, ReadonlyView};
pub use runtime::{Runtime, RuntimeBuilder};
pub use subscriber::{Subscriber, SubscriberId};

use crate::value::{Object, Value};

/// Whether `value` is a mutable handle.
pub fn is_reactive(value: &Value) -> bool {
    value.as_handle().is_some_and(Handle::is_reactive)
}

/// Whether `value` is a readonly handle.
pub fn is_readonly(value: &Value) -> bool {
    value.as_handle().is_some_and(Handle::is_readonly)
}

/// Whether `value` is a handle that leaves nested containers unwrapped.
pub fn is_shallow(value: &Value) -> bool {
    value.as_handle().is_some_and(Handle::is_shallow)
}

/// Whether `value` is a handle of any mode.
pub fn is_proxy(value: &Value) -> bool {
    value.as_handle().is_some()
}

/// Mark `object` so it is never wrapped, and return it.
pub fn mark_raw(object: Object) -> Object {
    object.mark_raw();
    object
}
