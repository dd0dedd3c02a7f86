//! Effect Implementation
//!
//! An Effect is a computation that re-runs whenever data it read through a
//! handle changes.
//!
//! # How Effects Work
//!
//! 1. On creation the effect runs once to establish its dependencies,
//!    unless it was created lazily.
//!
//! 2. Every run starts by leaving every dependency set the effect joined
//!    last time, then pushes the effect onto the active-effect stack so the
//!    reads of this run re-subscribe it. Dependencies therefore follow
//!    control flow: a branch that stops reading a key stops depending on it.
//!
//! 3. When a dependency changes, the effect re-runs synchronously, or its
//!    scheduler is called with an [`EffectRef`] and decides when to run it.
//!
//! # Stopping
//!
//! [`Effect::stop`] leaves every dependency set and deactivates the effect.
//! A stopped effect can still be run by hand; it then runs without tracking
//! and stays unsubscribed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};
use crate::graph::DepId;

/// Callback that takes over re-execution of a triggered effect.
pub type Scheduler = Rc<dyn Fn(&EffectRef)>;

/// Options for [`Runtime::effect_with`](crate::Runtime::effect_with).
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Do not run on creation.
    pub lazy: bool,
    /// Called instead of re-running the effect when it is triggered.
    pub scheduler: Option<Scheduler>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the initial run; the effect first runs when called.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Hand every triggered re-run to `scheduler` instead of running it.
    pub fn scheduler(mut self, scheduler: impl Fn(&EffectRef) + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .finish()
    }
}

struct EffectInner<T> {
    id: SubscriberId,
    func: Rc<dyn Fn() -> T>,
    cx: Rc<ReactiveContext>,
    deps: RefCell<SmallVec<[DepId; 8]>>,
    scheduler: Option<Scheduler>,
    active: Cell<bool>,
    run_count: Cell<usize>,
}

impl<T: 'static> EffectInner<T> {
    fn run(self: &Rc<Self>) -> T {
        self.run_count.set(self.run_count.get() + 1);

        // Clone the function so no borrow of `self` spans user code, which
        // may re-enter this effect.
        let func = self.func.clone();
        if !self.active.get() {
            // not on the stack, so an outer effect must not take its reads
            return self.cx.untracked(|| func());
        }

        self.cleanup();
        let _scope = self.cx.enter(self.clone());
        func()
    }

    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        self.cx.cleanup(self.id, deps);
    }
}

impl<T: 'static> Subscriber for EffectInner<T> {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn scheduler(&self) -> Option<Scheduler> {
        self.scheduler.clone()
    }

    fn run_erased(self: Rc<Self>) {
        let _ = self.run();
    }

    fn record_dependency(&self, dep: DepId) {
        self.deps.borrow_mut().push(dep);
    }

    fn stop(&self) {
        if self.active.replace(false) {
            self.cleanup();
        }
    }
}

/// A reactive computation returning `T`.
///
/// # Example
///
/// ```rust
/// use refract_core::{Object, Runtime};
///
/// let rt = Runtime::new();
/// let state = rt.reactive(Object::record_from([("count", 0)])).into_handle().unwrap();
///
/// let reader = state.clone();
/// let effect = rt.effect(move || reader.get("count").as_number().unwrap_or(0.0) * 2.0);
/// assert_eq!(effect.run_count(), 1);
///
/// state.set("count", 5);
/// assert_eq!(effect.run_count(), 2);
/// assert_eq!(effect.run(), 10.0);
/// ```
pub struct Effect<T: 'static> {
    inner: Rc<EffectInner<T>>,
}

impl<T: 'static> Effect<T> {
    pub(crate) fn new<F>(cx: Rc<ReactiveContext>, func: F, options: EffectOptions) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let effect = Self {
            inner: Rc::new(EffectInner {
                id: SubscriberId::new(),
                func: Rc::new(func),
                cx,
                deps: RefCell::new(SmallVec::new()),
                scheduler: options.scheduler,
                active: Cell::new(true),
                run_count: Cell::new(0),
            }),
        };

        if !options.lazy {
            effect.inner.run();
        }
        effect
    }

    /// Run the effect now, re-deriving its dependencies, and return the result.
    pub fn run(&self) -> T {
        self.inner.run()
    }

    /// Unsubscribe from every dependency and never re-run on a trigger again.
    pub fn stop(&self) {
        Subscriber::stop(&*self.inner);
    }

    /// `false` once the effect has been stopped.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Number of times the effect has run, manual runs included.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of dependency sets the effect currently belongs to.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// A type-erased reference, as handed to schedulers.
    pub fn to_ref(&self) -> EffectRef {
        EffectRef::new(self.inner.clone())
    }
}

impl<T: 'static> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// A type-erased handle to a triggered effect.
///
/// Schedulers receive one and decide when to call [`EffectRef::run`].
#[derive(Clone)]
pub struct EffectRef(Rc<dyn Subscriber>);

impl EffectRef {
    pub(crate) fn new(subscriber: Rc<dyn Subscriber>) -> Self {
        Self(subscriber)
    }

    pub fn id(&self) -> SubscriberId {
        self.0.id()
    }

    pub fn is_active(&self) -> bool {
        self.0.is_active()
    }

    /// Run the effect, discarding its result.
    pub fn run(&self) {
        self.0.clone().run_erased();
    }

    /// Stop the effect; see [`Effect::stop`].
    pub fn stop(&self) {
        self.0.stop();
    }
}

impl PartialEq for EffectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for EffectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EffectRef").field(&self.id()).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{Object, Runtime, Value};

    #[test]
    fn effect_runs_on_creation() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();

        let _effect = rt.effect(move || counter.set(counter.get() + 1));

        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let rt = Runtime::new();
        let effect = rt.effect_with(|| 7, EffectOptions::new().lazy(true));

        assert_eq!(effect.run_count(), 0);
        assert_eq!(effect.run(), 7);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_records_each_read_key_once() {
        let rt = Runtime::new();
        let state = rt
            .reactive(Object::record_from([("a", 1), ("b", 2)]))
            .into_handle()
            .unwrap();

        let reader = state.clone();
        let effect = rt.effect(move || {
            reader.get("a");
            reader.get("a");
            reader.get("b");
        });
        assert_eq!(effect.dependency_count(), 2);

        effect.run();
        assert_eq!(effect.dependency_count(), 2);
    }

    #[test]
    fn stop_unsubscribes_from_everything() {
        let rt = Runtime::new();
        let state = rt
            .reactive(Object::record_from([("a", 1), ("b", 2)]))
            .into_handle()
            .unwrap();

        let reader = state.clone();
        let effect = rt.effect(move || {
            reader.get("a");
            reader.get("b");
        });
        effect.stop();
        effect.stop();

        assert!(!effect.is_active());
        assert_eq!(effect.dependency_count(), 0);

        state.set("a", 10);
        state.set("b", 20);
        assert_eq!(effect.run_count(), 1);

        // manual runs still work but do not resubscribe
        effect.run();
        assert_eq!(effect.run_count(), 2);
        state.set("a", 11);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn effect_clone_shares_state() {
        let rt = Runtime::new();
        let effect1 = rt.effect(|| Value::Null);
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());
        effect1.run();
        assert_eq!(effect2.run_count(), 2);

        effect1.stop();
        assert!(!effect2.is_active());
    }
}
