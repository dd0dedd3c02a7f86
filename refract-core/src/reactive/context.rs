//! Reactive Context
//!
//! The engine state shared by every handle and effect of one runtime: the
//! active-effect stack, the tracking flag with its save/restore stack, the
//! dependency graph and the identity registry.
//!
//! # Implementation
//!
//! Running an effect pushes it onto the stack; any read that happens while
//! it is on top is attributed to it. The push returns a guard that pops on
//! drop, so the stack stays balanced even if the effect panics.
//!
//! Tracking can be paused independently of the stack. `pause_tracking` and
//! `enable_tracking` save the current flag before overriding it, and
//! `reset_tracking` restores whatever was saved, so nested regions compose.
//!
//! No `RefCell` borrow is held while user code runs: triggers snapshot the
//! effects to run before running any of them.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::handle::{Handle, Mode};
use super::interceptor::{BaseInterceptor, CollectionHandlers, Interceptor, ReadonlyView};
use super::registry::ProxyRegistry;
use super::subscriber::{Subscriber, SubscriberId};
use super::effect::EffectRef;
use crate::config::RuntimeConfig;
use crate::graph::{DepId, TargetMap, TrackOpType, TriggerOpType};
use crate::value::{Key, Object, ObjectKind, Value};

/// Counts of live engine entries, for diagnostics and leak tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Targets with at least one recorded dependency key.
    pub targets: usize,
    /// Dependency sets across all targets.
    pub deps: usize,
    /// Cached handles, both classes.
    pub handles: usize,
}

/// One interceptor per mode, shared by every handle of that mode.
struct BaseInterceptors {
    reactive: Rc<dyn Interceptor>,
    shallow_reactive: Rc<dyn Interceptor>,
    readonly: Rc<dyn Interceptor>,
    shallow_readonly: Rc<dyn Interceptor>,
}

impl BaseInterceptors {
    fn new() -> Self {
        Self {
            reactive: Rc::new(BaseInterceptor::new(Mode::REACTIVE)),
            shallow_reactive: Rc::new(BaseInterceptor::new(Mode::SHALLOW_REACTIVE)),
            readonly: Rc::new(BaseInterceptor::new(Mode::READONLY)),
            shallow_readonly: Rc::new(BaseInterceptor::new(Mode::SHALLOW_READONLY)),
        }
    }

    fn for_mode(&self, mode: Mode) -> Rc<dyn Interceptor> {
        match (mode.readonly, mode.shallow) {
            (false, false) => self.reactive.clone(),
            (false, true) => self.shallow_reactive.clone(),
            (true, false) => self.readonly.clone(),
            (true, true) => self.shallow_readonly.clone(),
        }
    }
}

/// How the proxy factory treats a raw container.
enum TargetType {
    Invalid,
    Common,
    Collection,
}

fn target_type(target: &Object) -> TargetType {
    if target.is_marked_raw() || !target.is_extensible() {
        return TargetType::Invalid;
    }
    match target.kind() {
        ObjectKind::Record | ObjectKind::List => TargetType::Common,
        ObjectKind::Map | ObjectKind::Set => TargetType::Collection,
        ObjectKind::Opaque => TargetType::Invalid,
    }
}

/// Shared engine state of one [`Runtime`](crate::Runtime).
pub struct ReactiveContext {
    this: Weak<ReactiveContext>,
    config: RuntimeConfig,
    effect_stack: RefCell<Vec<Rc<dyn Subscriber>>>,
    should_track: Cell<bool>,
    track_stack: RefCell<Vec<bool>>,
    targets: RefCell<TargetMap>,
    registry: RefCell<ProxyRegistry>,
    interceptors: BaseInterceptors,
    collection_handlers: Option<Rc<dyn CollectionHandlers>>,
    torn_down: Cell<bool>,
}

impl ReactiveContext {
    pub(crate) fn new(
        config: RuntimeConfig,
        collection_handlers: Option<Rc<dyn CollectionHandlers>>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            config,
            effect_stack: RefCell::new(Vec::new()),
            should_track: Cell::new(true),
            track_stack: RefCell::new(Vec::new()),
            targets: RefCell::new(TargetMap::new()),
            registry: RefCell::new(ProxyRegistry::default()),
            interceptors: BaseInterceptors::new(),
            collection_handlers,
            torn_down: Cell::new(false),
        })
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Effect stack
    // ------------------------------------------------------------------

    /// Make `effect` the target of every read until the scope is dropped.
    /// Tracking is enabled inside the scope even if the caller paused it.
    pub(crate) fn enter(&self, effect: Rc<dyn Subscriber>) -> EffectScope<'_> {
        let id = effect.id();
        self.enable_tracking();
        self.effect_stack.borrow_mut().push(effect);
        EffectScope { cx: self, id }
    }

    /// The effect reads are currently attributed to.
    pub fn active_effect(&self) -> Option<SubscriberId> {
        self.effect_stack.borrow().last().map(|effect| effect.id())
    }

    /// Whether a read right now would record a dependency.
    pub fn is_tracking(&self) -> bool {
        self.should_track.get() && !self.torn_down.get() && !self.effect_stack.borrow().is_empty()
    }

    // ------------------------------------------------------------------
    // Tracking flag
    // ------------------------------------------------------------------

    /// Save the tracking flag and turn tracking off.
    pub fn pause_tracking(&self) {
        self.track_stack.borrow_mut().push(self.should_track.get());
        self.should_track.set(false);
    }

    /// Save the tracking flag and turn tracking on.
    pub fn enable_tracking(&self) {
        self.track_stack.borrow_mut().push(self.should_track.get());
        self.should_track.set(true);
    }

    /// Restore the flag saved by the matching pause/enable; enabled if
    /// nothing was saved.
    pub fn reset_tracking(&self) {
        let last = self.track_stack.borrow_mut().pop();
        self.should_track.set(last.unwrap_or(true));
    }

    /// Pause tracking until the returned guard is dropped.
    pub(crate) fn pause_scope(&self) -> TrackingScope<'_> {
        self.pause_tracking();
        TrackingScope { cx: self }
    }

    /// Run `f` without recording dependencies.
    pub fn untracked<T>(&self, f: impl FnOnce() -> T) -> T {
        let _paused = self.pause_scope();
        f()
    }

    // ------------------------------------------------------------------
    // Track & trigger
    // ------------------------------------------------------------------

    /// Record that the active effect depends on `(target, key)`.
    pub fn track(&self, target: &Object, op: TrackOpType, key: Key) {
        if !self.should_track.get() || self.torn_down.get() {
            return;
        }
        let Some(active) = self.effect_stack.borrow().last().cloned() else {
            return;
        };
        // stopped while running
        if !active.is_active() {
            return;
        }

        let mut targets = self.targets.borrow_mut();
        trace!(target_id = target.id().raw(), %op, %key, effect = ?active.id(), "track");
        let dep = targets.dep_for(target, key);
        if targets.subscribe(dep, active.clone()) {
            active.record_dependency(dep);
        }

        let threshold = self.config.prune_threshold;
        if threshold > 0 && targets.added_since_sweep() >= threshold {
            let removed = targets.sweep();
            debug!(removed, remaining = targets.len(), "swept dependency graph");
        }
    }

    /// Re-run, or hand to their schedulers, the effects affected by a
    /// mutation of `(target, key)`.
    pub fn trigger(
        &self,
        target: &Object,
        op: TriggerOpType,
        key: &Key,
        new_value: Option<&Value>,
        old_value: Option<&Value>,
    ) {
        let effects = {
            let targets = self.targets.borrow();
            targets.collect(target, op, key, new_value, self.active_effect())
        };
        if effects.is_empty() {
            return;
        }
        trace!(
            target_id = target.id().raw(),
            %op,
            %key,
            ?new_value,
            ?old_value,
            effects = effects.len(),
            "trigger"
        );

        for effect in effects {
            // an earlier effect of this batch may have stopped it
            if !effect.is_active() {
                continue;
            }
            match effect.scheduler() {
                Some(scheduler) => scheduler(&EffectRef::new(effect)),
                None => effect.run_erased(),
            }
        }
    }

    /// Remove subscriber `id` from every dep in `deps`.
    pub(crate) fn cleanup(&self, id: SubscriberId, deps: impl IntoIterator<Item = DepId>) {
        let mut targets = self.targets.borrow_mut();
        for dep in deps {
            targets.unsubscribe(dep, id);
        }
    }

    /// Number of effects subscribed to `(target, key)`.
    pub fn subscriber_count(&self, target: &Object, key: &Key) -> usize {
        self.targets
            .borrow()
            .dep(target, key)
            .map_or(0, |dep| dep.len())
    }

    // ------------------------------------------------------------------
    // Proxy factory
    // ------------------------------------------------------------------

    /// Wrap `value` in a handle of `mode`, or return it unchanged if it
    /// cannot be observed.
    ///
    /// A readonly wrap of a mutable handle yields a [`ReadonlyView`] over
    /// that handle, so reads through the view are still tracked.
    pub fn wrap(&self, value: Value, mode: Mode) -> Value {
        let target = match value {
            Value::Object(target) => target,
            Value::Handle(handle) => {
                // a handle of the requested class, or a readonly handle asked
                // to be mutable, stays as it is
                if handle.is_readonly() || !mode.readonly {
                    return Value::Handle(handle);
                }
                return self.readonly_view(handle, mode);
            }
            other => return other,
        };

        if let Some(existing) = self.registry.borrow().get(target.id(), mode.readonly) {
            return Value::Handle(existing);
        }

        let interceptor = match target_type(&target) {
            TargetType::Invalid => return Value::Object(target),
            TargetType::Common => self.interceptors.for_mode(mode),
            TargetType::Collection => match &self.collection_handlers {
                Some(handlers) => handlers.interceptor(mode),
                None => {
                    debug!(object = ?target, "no collection handlers registered; returning target unwrapped");
                    return Value::Object(target);
                }
            },
        };
        let Some(cx) = self.this.upgrade() else {
            return Value::Object(target);
        };

        let handle = Handle::new(target, mode, interceptor, cx);
        let mut registry = self.registry.borrow_mut();
        registry.insert(&handle);

        let threshold = self.config.prune_threshold;
        if threshold > 0 && registry.added_since_sweep() >= threshold {
            let removed = registry.sweep();
            debug!(removed, remaining = registry.len(), "swept identity registry");
        }
        Value::Handle(handle)
    }

    fn readonly_view(&self, source: Handle, mode: Mode) -> Value {
        let target = source.to_raw();
        if let Some(existing) = self.registry.borrow().view(target.id()) {
            return Value::Handle(existing);
        }
        let Some(cx) = self.this.upgrade() else {
            return Value::Handle(source);
        };

        let view = Rc::new(ReadonlyView::new(source, mode.shallow));
        let handle = Handle::new(target, mode, view, cx);
        self.registry.borrow_mut().insert_view(&handle);
        Value::Handle(handle)
    }

    // ------------------------------------------------------------------
    // Lifetime
    // ------------------------------------------------------------------

    /// Drop registry and graph entries whose targets or handles are gone.
    /// Returns the number of entries removed.
    pub fn collect_garbage(&self) -> usize {
        let handles = self.registry.borrow_mut().sweep();
        let targets = self.targets.borrow_mut().sweep();
        debug!(handles, targets, "collected garbage");
        handles + targets
    }

    /// Current entry counts, sweeps not forced.
    pub fn stats(&self) -> RuntimeStats {
        let targets = self.targets.borrow();
        RuntimeStats {
            targets: targets.len(),
            deps: targets.dep_count(),
            handles: self.registry.borrow().len(),
        }
    }

    /// Clear the graph and the registry and stop recording dependencies.
    ///
    /// Subscribed effects own closures that own handles that own this
    /// context; clearing the graph breaks that cycle.
    pub(crate) fn teardown(&self) {
        self.torn_down.set(true);
        let targets = std::mem::take(&mut *self.targets.borrow_mut());
        let registry = std::mem::take(&mut *self.registry.borrow_mut());
        drop(targets);
        drop(registry);
    }
}

/// Guard that pops the effect stack when dropped.
pub(crate) struct EffectScope<'a> {
    cx: &'a ReactiveContext,
    id: SubscriberId,
}

impl Drop for EffectScope<'_> {
    fn drop(&mut self) {
        let popped = self.cx.effect_stack.borrow_mut().pop();
        if let Some(effect) = popped {
            debug_assert_eq!(
                effect.id(),
                self.id,
                "effect stack mismatch: expected {:?}, got {:?}",
                self.id,
                effect.id()
            );
        }
        self.cx.reset_tracking();
    }
}

/// Guard that restores the tracking flag when dropped.
pub(crate) struct TrackingScope<'a> {
    cx: &'a ReactiveContext,
}

impl Drop for TrackingScope<'_> {
    fn drop(&mut self) {
        self.cx.reset_tracking();
    }
}
