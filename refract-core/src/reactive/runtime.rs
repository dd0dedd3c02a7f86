//! Reactive Runtime
//!
//! The runtime owns one [`ReactiveContext`] and is the entry point for
//! consumers: it wraps raw containers into handles and creates effects.
//!
//! # How It Works
//!
//! 1. `reactive`, `shallow_reactive`, `readonly` and `shallow_readonly`
//!    wrap a raw container, caching one handle per container per class
//!    (mutable or readonly).
//!
//! 2. Reads through a handle record an edge for the effect currently
//!    running; writes look up the edges of the written key and re-run the
//!    affected effects.
//!
//! # Lifetime
//!
//! Handles and effects keep the context alive, and subscribed effects own
//! closures that typically own handles. Dropping the `Runtime` clears the
//! dependency graph and the registry, which breaks that cycle; handles that
//! outlive it keep working on their raw data but no longer track.

use std::rc::Rc;

use super::context::{ReactiveContext, RuntimeStats};
use super::effect::{Effect, EffectOptions};
use super::handle::Mode;
use super::interceptor::CollectionHandlers;
use crate::config::RuntimeConfig;
use crate::graph::{TrackOpType, TriggerOpType};
use crate::value::{Key, Object, Value};

/// Owner of a reactive engine instance.
///
/// A runtime is single-threaded; values created by it are `!Send`.
pub struct Runtime {
    cx: Rc<ReactiveContext>,
}

/// Builder for a [`Runtime`] with custom configuration or collection handlers.
#[derive(Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    collection_handlers: Option<Rc<dyn CollectionHandlers>>,
}

impl RuntimeBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Interceptors used for map and set targets. Without them such targets
    /// are returned unwrapped.
    pub fn collection_handlers(mut self, handlers: Rc<dyn CollectionHandlers>) -> Self {
        self.collection_handlers = Some(handlers);
        self
    }

    pub fn build(self) -> Runtime {
        Runtime {
            cx: ReactiveContext::new(self.config, self.collection_handlers),
        }
    }
}

impl Runtime {
    /// A runtime with the default configuration and no collection handlers.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// A runtime with `config` and no collection handlers.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The shared engine state, for integrations that call `track`/`trigger`.
    pub fn context(&self) -> &Rc<ReactiveContext> {
        &self.cx
    }

    // ------------------------------------------------------------------
    // Proxy factory
    // ------------------------------------------------------------------

    /// Wrap `value` with the given mode. Values that cannot be observed are
    /// returned unchanged.
    pub fn wrap(&self, value: impl Into<Value>, mode: Mode) -> Value {
        self.cx.wrap(value.into(), mode)
    }

    /// Deep, mutable, tracking handle.
    pub fn reactive(&self, value: impl Into<Value>) -> Value {
        self.wrap(value, Mode::REACTIVE)
    }

    /// Tracks the top level only; nested containers are returned raw.
    pub fn shallow_reactive(&self, value: impl Into<Value>) -> Value {
        self.wrap(value, Mode::SHALLOW_REACTIVE)
    }

    /// Deep readonly handle: no mutation, no tracking. Given a mutable
    /// handle, returns a readonly view whose reads track through it.
    pub fn readonly(&self, value: impl Into<Value>) -> Value {
        self.wrap(value, Mode::READONLY)
    }

    /// Readonly at the top level only; nested containers are returned as
    /// they are.
    pub fn shallow_readonly(&self, value: impl Into<Value>) -> Value {
        self.wrap(value, Mode::SHALLOW_READONLY)
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Create an effect and run it immediately.
    pub fn effect<T, F>(&self, func: F) -> Effect<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        self.effect_with(func, EffectOptions::default())
    }

    /// Create an effect with explicit options (lazy start, scheduler).
    pub fn effect_with<T, F>(&self, func: F, options: EffectOptions) -> Effect<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        Effect::new(self.cx.clone(), func, options)
    }

    // ------------------------------------------------------------------
    // Tracking control
    // ------------------------------------------------------------------

    /// Stop recording dependencies until the matching
    /// [`reset_tracking`](Self::reset_tracking).
    pub fn pause_tracking(&self) {
        self.cx.pause_tracking();
    }

    /// Record dependencies again, even inside a paused region, until the
    /// matching [`reset_tracking`](Self::reset_tracking).
    pub fn enable_tracking(&self) {
        self.cx.enable_tracking();
    }

    /// Restore the tracking state saved by the last pause or enable.
    pub fn reset_tracking(&self) {
        self.cx.reset_tracking();
    }

    /// Run `f` without recording dependencies.
    pub fn untracked<T>(&self, f: impl FnOnce() -> T) -> T {
        self.cx.untracked(f)
    }

    /// See [`ReactiveContext::track`].
    pub fn track(&self, target: &Object, op: TrackOpType, key: impl Into<Key>) {
        self.cx.track(target, op, key.into());
    }

    /// See [`ReactiveContext::trigger`].
    pub fn trigger(
        &self,
        target: &Object,
        op: TriggerOpType,
        key: impl Into<Key>,
        new_value: Option<&Value>,
        old_value: Option<&Value>,
    ) {
        self.cx.trigger(target, op, &key.into(), new_value, old_value);
    }

    // ------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------

    /// Sweep entries for dropped targets and handles. Returns how many
    /// entries were removed.
    pub fn collect_garbage(&self) -> usize {
        self.cx.collect_garbage()
    }

    /// Live entry counts of the dependency graph and identity registry.
    pub fn stats(&self) -> RuntimeStats {
        self.cx.stats()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.cx.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_caches_one_handle_per_class() {
        let rt = Runtime::new();
        let raw = Object::record();

        let a = rt.reactive(&raw);
        let b = rt.reactive(&raw);
        let shallow = rt.shallow_reactive(&raw);
        let ro = rt.readonly(&raw);

        assert_eq!(a, b);
        // shallow and deep share the mutable class
        assert_eq!(a, shallow);
        assert_ne!(a, ro);
        assert_eq!(rt.stats().handles, 2);
    }

    #[test]
    fn runtime_drop_clears_graph() {
        let rt = Runtime::new();
        let state = rt.reactive(Object::record_from([("a", 1)])).into_handle().unwrap();
        let reader = state.clone();
        let effect = rt.effect(move || reader.get("a"));
        assert_eq!(rt.stats().deps, 1);

        let cx = rt.context().clone();
        drop(rt);
        assert_eq!(cx.stats(), RuntimeStats::default());

        // the handle still reads and writes, it just no longer triggers
        assert!(state.set("a", 2));
        assert_eq!(state.get("a"), Value::from(2));
        assert_eq!(effect.run_count(), 1);
    }
}
