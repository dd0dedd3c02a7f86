//! Interception Layer
//!
//! The trap behaviours behind a [`Handle`](super::Handle). [`Interceptor`]
//! is the seam: the engine ships [`BaseInterceptor`] for records and lists,
//! and map/set handlers are supplied from outside through
//! [`CollectionHandlers`].
//!
//! # Traps
//!
//! - `read`: the [`Symbol::RAW`] sentinel yields the raw target; otherwise
//!   read, track (mutable modes, non-symbol keys), and wrap nested
//!   containers lazily unless shallow.
//! - `write`: capture the old value and whether the key existed, write,
//!   then trigger `Add` or `Set` only if the receiver is this target's own
//!   handle. Writes arriving through a prototype chain do not trigger here.
//! - `has`, `delete`, `own_keys`: track or trigger the key, or the
//!   iteration key for enumeration.
//!
//! Readonly modes neither track nor mutate; a rejected mutation logs a
//! warning and still reports success.
//!
//! A readonly handle made from a mutable handle uses [`ReadonlyView`]
//! instead: its reads go through the mutable handle, so they are tracked
//! there, and nested values come back as readonly views of their own.

use std::rc::Rc;

use tracing::warn;

use super::context::ReactiveContext;
use super::handle::{Handle, Mode};
use super::instrument::{self, Instrumentation};
use crate::graph::{TrackOpType, TriggerOpType};
use crate::value::{has_changed, ArrayMethod, Key, Object, Symbol, Value};

/// Trap set applied to every operation on a handle.
pub trait Interceptor {
    fn read(&self, cx: &ReactiveContext, target: &Object, key: &Key, receiver: &Value) -> Value;

    fn write(&self, cx: &ReactiveContext, target: &Object, key: Key, value: Value, receiver: &Value)
        -> bool;

    fn has(&self, cx: &ReactiveContext, target: &Object, key: &Key) -> bool;

    fn delete(&self, cx: &ReactiveContext, target: &Object, key: &Key) -> bool;

    fn own_keys(&self, cx: &ReactiveContext, target: &Object) -> Vec<Key>;

    /// Replacement for a native list method, if this interceptor has one.
    fn lookup_method(&self, _target: &Object, _method: ArrayMethod) -> Option<Instrumentation> {
        None
    }
}

/// Source of interceptors for map and set targets.
pub trait CollectionHandlers {
    fn interceptor(&self, mode: Mode) -> Rc<dyn Interceptor>;
}

/// Traps for records and lists.
#[derive(Debug, Clone, Copy)]
pub struct BaseInterceptor {
    readonly: bool,
    shallow: bool,
}

impl BaseInterceptor {
    pub fn new(mode: Mode) -> Self {
        Self {
            readonly: mode.readonly,
            shallow: mode.shallow,
        }
    }

    fn nested_mode(&self) -> Mode {
        if self.readonly {
            Mode::READONLY
        } else {
            Mode::REACTIVE
        }
    }
}

/// Raw identity of a write receiver.
fn receiver_is(target: &Object, receiver: &Value) -> bool {
    match receiver {
        Value::Object(raw) => Object::ptr_eq(raw, target),
        Value::Handle(handle) => Object::ptr_eq(&handle.to_raw(), target),
        _ => false,
    }
}

impl Interceptor for BaseInterceptor {
    fn read(&self, cx: &ReactiveContext, target: &Object, key: &Key, receiver: &Value) -> Value {
        if matches!(key, Key::Symbol(symbol) if *symbol == Symbol::RAW) {
            return Value::Object(target.clone());
        }

        let result = target.get_with_receiver(key, receiver);

        if !self.readonly && !key.is_symbol() {
            cx.track(target, TrackOpType::Get, key.clone());
        }
        if self.shallow {
            return result;
        }
        if result.is_object_like() {
            return cx.wrap(result, self.nested_mode());
        }
        result
    }

    fn write(
        &self,
        cx: &ReactiveContext,
        target: &Object,
        key: Key,
        value: Value,
        receiver: &Value,
    ) -> bool {
        if self.readonly {
            if cx.config().warn_on_readonly {
                warn!(%key, object = ?target, "set operation failed: target is readonly");
            }
            return true;
        }

        let old_value = target.get(&key);
        let had_key = match key.as_index() {
            Some(index) if target.is_list() => (index as usize) < target.list_len(),
            _ => target.has_own(&key),
        };

        let result = target.set_with_receiver(key.clone(), value.clone(), receiver);

        // a rejected write changed nothing
        if result && receiver_is(target, receiver) {
            if !had_key {
                cx.trigger(target, TriggerOpType::Add, &key, Some(&value), None);
            } else if has_changed(&old_value, &value) {
                cx.trigger(target, TriggerOpType::Set, &key, Some(&value), Some(&old_value));
            }
        }
        result
    }

    fn has(&self, cx: &ReactiveContext, target: &Object, key: &Key) -> bool {
        let result = target.has_key(key);
        if !self.readonly && !key.is_well_known_symbol() {
            cx.track(target, TrackOpType::Has, key.clone());
        }
        result
    }

    fn delete(&self, cx: &ReactiveContext, target: &Object, key: &Key) -> bool {
        if self.readonly {
            if cx.config().warn_on_readonly {
                warn!(%key, object = ?target, "delete operation failed: target is readonly");
            }
            return true;
        }

        let had_key = target.has_own(key);
        let old_value = target.get(key);
        let result = target.delete_key(key);
        if result && had_key {
            cx.trigger(target, TriggerOpType::Delete, key, None, Some(&old_value));
        }
        result
    }

    fn own_keys(&self, cx: &ReactiveContext, target: &Object) -> Vec<Key> {
        if !self.readonly {
            let key = if target.is_list() {
                Key::length()
            } else {
                Key::Symbol(Symbol::ITERATE_KEY)
            };
            cx.track(target, TrackOpType::Iterate, key);
        }
        target.own_keys()
    }

    fn lookup_method(&self, target: &Object, method: ArrayMethod) -> Option<Instrumentation> {
        if self.readonly || !target.is_list() {
            return None;
        }
        instrument::lookup(method)
    }
}

/// Readonly traps over a mutable handle.
pub struct ReadonlyView {
    source: Handle,
    shallow: bool,
}

impl ReadonlyView {
    pub fn new(source: Handle, shallow: bool) -> Self {
        Self { source, shallow }
    }

    /// The mutable handle reads go through.
    pub fn source(&self) -> &Handle {
        &self.source
    }
}

impl Interceptor for ReadonlyView {
    fn read(&self, cx: &ReactiveContext, target: &Object, key: &Key, _receiver: &Value) -> Value {
        if matches!(key, Key::Symbol(symbol) if *symbol == Symbol::RAW) {
            return Value::Object(target.clone());
        }

        let result = self.source.get(key);
        if !self.shallow && result.is_object_like() {
            return cx.wrap(result, Mode::READONLY);
        }
        result
    }

    fn write(
        &self,
        cx: &ReactiveContext,
        target: &Object,
        key: Key,
        _value: Value,
        _receiver: &Value,
    ) -> bool {
        if cx.config().warn_on_readonly {
            warn!(%key, object = ?target, "set operation failed: target is readonly");
        }
        true
    }

    fn has(&self, _cx: &ReactiveContext, _target: &Object, key: &Key) -> bool {
        self.source.has(key)
    }

    fn delete(&self, cx: &ReactiveContext, target: &Object, key: &Key) -> bool {
        if cx.config().warn_on_readonly {
            warn!(%key, object = ?target, "delete operation failed: target is readonly");
        }
        true
    }

    fn own_keys(&self, _cx: &ReactiveContext, _target: &Object) -> Vec<Key> {
        self.source.own_keys()
    }
}
