//! Observable handles.
//!
//! A [`Handle`] stands in for a raw container. Every operation on it is
//! routed through the [`Interceptor`] of its mode, which is where reads get
//! tracked and writes get triggered.

use std::fmt;
use std::rc::{Rc, Weak};

use super::context::ReactiveContext;
use super::interceptor::Interceptor;
use crate::error::{Error, Result};
use crate::value::{call_native, ArrayMethod, Key, Object, Symbol, Value};

/// How a handle observes its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode {
    /// Reject mutations and skip tracking.
    pub readonly: bool,
    /// Return nested containers unwrapped.
    pub shallow: bool,
}

impl Mode {
    pub const REACTIVE: Mode = Mode {
        readonly: false,
        shallow: false,
    };
    pub const SHALLOW_REACTIVE: Mode = Mode {
        readonly: false,
        shallow: true,
    };
    pub const READONLY: Mode = Mode {
        readonly: true,
        shallow: false,
    };
    pub const SHALLOW_READONLY: Mode = Mode {
        readonly: true,
        shallow: true,
    };
}

struct HandleInner {
    target: Object,
    mode: Mode,
    interceptor: Rc<dyn Interceptor>,
    cx: Rc<ReactiveContext>,
}

/// An observable wrapper around exactly one raw container.
///
/// Cloning shares the handle; two handles are equal only if they are the
/// same handle.
#[derive(Clone)]
pub struct Handle {
    inner: Rc<HandleInner>,
}

#[derive(Clone)]
pub(crate) struct WeakHandle(Weak<HandleInner>);

impl WeakHandle {
    pub(crate) fn upgrade(&self) -> Option<Handle> {
        self.0.upgrade().map(|inner| Handle { inner })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Handle {
    pub(crate) fn new(
        target: Object,
        mode: Mode,
        interceptor: Rc<dyn Interceptor>,
        cx: Rc<ReactiveContext>,
    ) -> Self {
        Self {
            inner: Rc::new(HandleInner {
                target,
                mode,
                interceptor,
                cx,
            }),
        }
    }

    /// Read `key` through the handle's interceptor.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        self.get_with_receiver(&key.into(), &Value::Handle(self.clone()))
    }

    pub(crate) fn get_with_receiver(&self, key: &Key, receiver: &Value) -> Value {
        let inner = &self.inner;
        inner.interceptor.read(&inner.cx, &inner.target, key, receiver)
    }

    /// Write through the handle. Returns what the underlying write reports;
    /// readonly handles report success without writing.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        self.set_with_receiver(key.into(), value.into(), &Value::Handle(self.clone()))
    }

    pub(crate) fn set_with_receiver(&self, key: Key, value: Value, receiver: &Value) -> bool {
        let inner = &self.inner;
        inner
            .interceptor
            .write(&inner.cx, &inner.target, key, value, receiver)
    }

    /// Containment check, tracked in mutable modes.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let inner = &self.inner;
        inner.interceptor.has(&inner.cx, &inner.target, &key.into())
    }

    pub fn delete(&self, key: impl Into<Key>) -> bool {
        let inner = &self.inner;
        inner.interceptor.delete(&inner.cx, &inner.target, &key.into())
    }

    /// Enumerate own keys. Mutable handles track the key set.
    pub fn own_keys(&self) -> Vec<Key> {
        let inner = &self.inner;
        inner.interceptor.own_keys(&inner.cx, &inner.target)
    }

    /// Call a list method with this handle as the receiver.
    ///
    /// Instrumented methods of the handle's interceptor take precedence;
    /// otherwise the native algorithm runs and its element accesses go
    /// through this handle.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let method =
            ArrayMethod::from_name(method).ok_or_else(|| Error::UnknownMethod(method.to_owned()))?;
        let inner = &self.inner;
        if !inner.target.is_list() {
            return Err(Error::NotAList {
                method: method.name(),
                kind: inner.target.kind().name(),
            });
        }
        match inner.interceptor.lookup_method(&inner.target, method) {
            Some(instrumented) => instrumented(&inner.cx, self, method, args),
            None => call_native(self, method, args),
        }
    }

    /// The raw container, recovered through the reserved [`Symbol::RAW`] read.
    pub fn to_raw(&self) -> Object {
        match self.get(Symbol::RAW) {
            Value::Object(raw) => raw,
            _ => self.inner.target.clone(),
        }
    }

    pub(crate) fn raw(&self) -> &Object {
        &self.inner.target
    }

    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    pub fn is_readonly(&self) -> bool {
        self.inner.mode.readonly
    }

    pub fn is_shallow(&self) -> bool {
        self.inner.mode.shallow
    }

    /// Whether this is a mutable (tracking) handle.
    pub fn is_reactive(&self) -> bool {
        !self.inner.mode.readonly
    }

    /// The engine this handle reports reads and writes to.
    pub fn context(&self) -> &Rc<ReactiveContext> {
        &self.inner.cx
    }

    pub fn ptr_eq(a: &Handle, b: &Handle) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakHandle {
        WeakHandle(Rc::downgrade(&self.inner))
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Handle::ptr_eq(self, other)
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match (self.inner.mode.readonly, self.inner.mode.shallow) {
            (false, false) => "reactive",
            (false, true) => "shallow reactive",
            (true, false) => "readonly",
            (true, true) => "shallow readonly",
        };
        write!(f, "Handle({mode} {:?})", self.inner.target)
    }
}
