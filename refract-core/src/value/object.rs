//! Raw Containers
//!
//! An [`Object`] is the unobserved data a handle wraps. Its operations follow
//! ordinary property semantics: reads fall through to the prototype, writes
//! land on the receiver, lists keep a `length` and may contain holes.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::{Key, Value};
use crate::error::Result;

/// Unique identifier of a raw container.
///
/// Ids are never reused, so a stale id can be detected by its weak
/// reference failing to upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The shape of a container, as seen by the proxy factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Record,
    List,
    Map,
    Set,
    /// Anything else (dates, buffers, ...). Never wrapped.
    Opaque,
}

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Record => "record",
            ObjectKind::List => "list",
            ObjectKind::Map => "map",
            ObjectKind::Set => "set",
            ObjectKind::Opaque => "opaque",
        }
    }
}

enum Store {
    Record(IndexMap<Key, Value>),
    List(Slots),
    Collection(IndexMap<Key, Value>),
    Opaque(Rc<str>),
}

/// List elements keyed by index. Holes are simply absent, so a large
/// `length` or a far index allocates nothing for the gap.
#[derive(Default)]
struct Slots {
    items: BTreeMap<usize, Value>,
    len: usize,
}

impl Slots {
    fn from_holes(items: Vec<Option<Value>>) -> Self {
        let len = items.len();
        let items = items
            .into_iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|value| (index, value)))
            .collect();
        Self { items, len }
    }

    fn put(&mut self, index: usize, value: Value) {
        self.items.insert(index, value);
        self.len = self.len.max(index + 1);
    }

    fn set_len(&mut self, len: usize) {
        if len < self.len {
            drop(self.items.split_off(&len));
        }
        self.len = len;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Flags {
    skip: bool,
    non_extensible: bool,
    frozen: bool,
}

struct ObjectInner {
    id: TargetId,
    kind: ObjectKind,
    store: RefCell<Store>,
    prototype: RefCell<Option<Value>>,
    flags: Cell<Flags>,
}

/// A raw container. Cloning shares the container.
#[derive(Clone)]
pub struct Object {
    inner: Rc<ObjectInner>,
}

/// A non-owning reference to an [`Object`].
#[derive(Clone)]
pub struct WeakObject(Weak<ObjectInner>);

impl WeakObject {
    pub fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(|inner| Object { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Object {
    fn with_store(kind: ObjectKind, store: Store) -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                id: TargetId::new(),
                kind,
                store: RefCell::new(store),
                prototype: RefCell::new(None),
                flags: Cell::new(Flags::default()),
            }),
        }
    }

    /// An empty keyed record.
    pub fn record() -> Self {
        Self::with_store(ObjectKind::Record, Store::Record(IndexMap::new()))
    }

    /// A record populated from `(key, value)` pairs, in order.
    pub fn record_from<K, V, I>(entries: I) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::with_store(ObjectKind::Record, Store::Record(map))
    }

    /// A list holding `items`, in order.
    pub fn list<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let items = items.into_iter().map(|v| Some(v.into())).collect();
        Self::list_with_holes(items)
    }

    pub(crate) fn list_with_holes(items: Vec<Option<Value>>) -> Self {
        Self::with_store(ObjectKind::List, Store::List(Slots::from_holes(items)))
    }

    /// An empty map-like collection. Its entries are only reachable through
    /// [`Object::entries`]; interception is left to external handlers.
    pub fn map() -> Self {
        Self::with_store(ObjectKind::Map, Store::Collection(IndexMap::new()))
    }

    /// An empty set-like collection.
    pub fn set_collection() -> Self {
        Self::with_store(ObjectKind::Set, Store::Collection(IndexMap::new()))
    }

    /// A container the engine never wraps, tagged for diagnostics.
    pub fn opaque(tag: &str) -> Self {
        Self::with_store(ObjectKind::Opaque, Store::Opaque(Rc::from(tag)))
    }

    /// Identity of this container, stable for its lifetime.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.inner.kind
    }

    pub fn is_list(&self) -> bool {
        self.inner.kind == ObjectKind::List
    }

    pub fn ptr_eq(a: &Object, b: &Object) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    pub fn downgrade(&self) -> WeakObject {
        WeakObject(Rc::downgrade(&self.inner))
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    fn update_flags(&self, f: impl FnOnce(&mut Flags)) {
        let mut flags = self.inner.flags.get();
        f(&mut flags);
        self.inner.flags.set(flags);
    }

    /// Mark this container so the proxy factory never wraps it.
    pub fn mark_raw(&self) -> &Self {
        self.update_flags(|flags| flags.skip = true);
        self
    }

    pub fn is_marked_raw(&self) -> bool {
        self.inner.flags.get().skip
    }

    /// Forbid adding new keys.
    pub fn prevent_extensions(&self) {
        self.update_flags(|flags| flags.non_extensible = true);
    }

    /// Forbid every mutation.
    pub fn freeze(&self) {
        self.update_flags(|flags| {
            flags.non_extensible = true;
            flags.frozen = true;
        });
    }

    pub fn is_extensible(&self) -> bool {
        !self.inner.flags.get().non_extensible
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.flags.get().frozen
    }

    // ------------------------------------------------------------------
    // Prototype
    // ------------------------------------------------------------------

    pub fn prototype(&self) -> Option<Value> {
        self.inner.prototype.borrow().clone()
    }

    /// Set the object reads fall back to. Only containers are accepted;
    /// anything else clears the prototype.
    ///
    /// Returns `false`, leaving the prototype unchanged, when the chain
    /// starting at `prototype` leads back to this object.
    pub fn set_prototype(&self, prototype: Option<Value>) -> bool {
        let prototype = prototype.filter(Value::is_object_like);

        let mut link = prototype.as_ref().and_then(chain_target);
        while let Some(object) = link {
            if Object::ptr_eq(&object, self) {
                return false;
            }
            link = object.prototype().as_ref().and_then(chain_target);
        }

        *self.inner.prototype.borrow_mut() = prototype;
        true
    }

    // ------------------------------------------------------------------
    // Own properties
    // ------------------------------------------------------------------

    /// Number of slots, holes included. Zero for non-lists.
    pub fn list_len(&self) -> usize {
        match &*self.inner.store.borrow() {
            Store::List(slots) => slots.len,
            _ => 0,
        }
    }

    fn own_value(&self, key: &Key) -> Option<Value> {
        match &*self.inner.store.borrow() {
            Store::Record(map) => map.get(key).cloned(),
            Store::List(slots) => match key {
                Key::Index(index) => slots.items.get(&(*index as usize)).cloned(),
                key if key.is_length() => Some(Value::from(slots.len)),
                _ => None,
            },
            Store::Collection(_) | Store::Opaque(_) => None,
        }
    }

    pub fn has_own(&self, key: &Key) -> bool {
        match &*self.inner.store.borrow() {
            Store::Record(map) => map.contains_key(key),
            Store::List(slots) => match key {
                Key::Index(index) => slots.items.contains_key(&(*index as usize)),
                key => key.is_length(),
            },
            Store::Collection(_) | Store::Opaque(_) => false,
        }
    }

    /// Own keys in order. Lists list their present indices, then `length`.
    pub fn own_keys(&self) -> Vec<Key> {
        match &*self.inner.store.borrow() {
            Store::Record(map) => map.keys().cloned().collect(),
            Store::List(slots) => slots
                .items
                .keys()
                .map(|&index| Key::from(index))
                .chain(std::iter::once(Key::length()))
                .collect(),
            Store::Collection(_) | Store::Opaque(_) => Vec::new(),
        }
    }

    /// Create or overwrite an own data property, bypassing the prototype.
    pub(crate) fn define_own(&self, key: Key, value: Value) -> bool {
        let flags = self.inner.flags.get();
        if flags.frozen {
            return false;
        }
        let exists = self.has_own(&key);
        if !exists && flags.non_extensible {
            return false;
        }

        match &mut *self.inner.store.borrow_mut() {
            Store::Record(map) => {
                map.insert(key, value);
                true
            }
            Store::List(slots) => match key {
                Key::Index(index) => {
                    slots.put(index as usize, value);
                    true
                }
                key if key.is_length() => match array_length(&value) {
                    Some(len) => {
                        slots.set_len(len);
                        true
                    }
                    None => false,
                },
                _ => false,
            },
            Store::Collection(_) | Store::Opaque(_) => false,
        }
    }

    // ------------------------------------------------------------------
    // Ordinary operations
    // ------------------------------------------------------------------

    /// Read `key`, falling back along the prototype chain.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        self.get_with_receiver(&key.into(), &Value::Object(self.clone()))
    }

    pub(crate) fn get_with_receiver(&self, key: &Key, receiver: &Value) -> Value {
        if let Some(value) = self.own_value(key) {
            return value;
        }
        match self.prototype() {
            Some(Value::Object(proto)) => proto.get_with_receiver(key, receiver),
            Some(Value::Handle(proto)) => proto.get_with_receiver(key, receiver),
            _ => Value::Undefined,
        }
    }

    /// Write `key`. Returns `false` when the container rejects the write.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        self.set_with_receiver(key.into(), value.into(), &Value::Object(self.clone()))
    }

    /// Ordinary set: an own property, or the absence of any prototype,
    /// makes the write land on `receiver`; otherwise the prototype decides.
    pub(crate) fn set_with_receiver(&self, key: Key, value: Value, receiver: &Value) -> bool {
        if self.is_frozen() && self.has_own(&key) {
            return false;
        }
        if !self.has_own(&key) {
            match self.prototype() {
                Some(Value::Object(proto)) => {
                    return proto.set_with_receiver(key, value, receiver);
                }
                Some(Value::Handle(proto)) => {
                    return proto.set_with_receiver(key, value, receiver);
                }
                _ => {}
            }
        }
        match receiver {
            Value::Object(target) => target.define_own(key, value),
            Value::Handle(handle) => handle.raw().define_own(key, value),
            _ => false,
        }
    }

    /// Containment check, following the prototype chain.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        self.has_key(&key.into())
    }

    pub(crate) fn has_key(&self, key: &Key) -> bool {
        if self.has_own(key) {
            return true;
        }
        match self.prototype() {
            Some(Value::Object(proto)) => proto.has_key(key),
            Some(Value::Handle(proto)) => proto.has(key),
            _ => false,
        }
    }

    /// Remove an own property. Deleting a missing key succeeds.
    pub fn delete(&self, key: impl Into<Key>) -> bool {
        self.delete_key(&key.into())
    }

    pub(crate) fn delete_key(&self, key: &Key) -> bool {
        if !self.has_own(key) {
            return true;
        }
        if self.is_frozen() {
            return false;
        }
        match &mut *self.inner.store.borrow_mut() {
            Store::Record(map) => {
                map.shift_remove(key);
                true
            }
            Store::List(slots) => match key {
                Key::Index(index) => {
                    slots.items.remove(&(*index as usize));
                    true
                }
                // `length` is not configurable
                _ => false,
            },
            Store::Collection(_) | Store::Opaque(_) => false,
        }
    }

    /// Invoke a list method with this raw container as the receiver.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        super::array::call_by_name(self, method, args)
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    /// Entries of a map or set collection (sets store each member under
    /// its key with the value `true`). `None` for other kinds.
    pub fn entries(&self) -> Option<Ref<'_, IndexMap<Key, Value>>> {
        Ref::filter_map(self.inner.store.borrow(), |store| match store {
            Store::Collection(entries) => Some(entries),
            _ => None,
        })
        .ok()
    }

    pub fn entries_mut(&self) -> Option<RefMut<'_, IndexMap<Key, Value>>> {
        if self.is_frozen() {
            return None;
        }
        RefMut::filter_map(self.inner.store.borrow_mut(), |store| match store {
            Store::Collection(entries) => Some(entries),
            _ => None,
        })
        .ok()
    }

    /// Tag of an opaque container.
    pub fn opaque_tag(&self) -> Option<Rc<str>> {
        match &*self.inner.store.borrow() {
            Store::Opaque(tag) => Some(tag.clone()),
            _ => None,
        }
    }
}

/// The raw container a prototype link resolves to.
fn chain_target(value: &Value) -> Option<Object> {
    match value {
        Value::Object(object) => Some(object.clone()),
        Value::Handle(handle) => Some(handle.raw().clone()),
        _ => None,
    }
}

/// A valid list length: a non-negative integral number below 2^32.
fn array_length(value: &Value) -> Option<usize> {
    let n = value.as_number()?;
    if n.fract() != 0.0 || n < 0.0 || n > f64::from(u32::MAX) {
        return None;
    }
    Some(n as usize)
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Object::ptr_eq(self, other)
    }
}

impl Eq for Object {}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({}#{})", self.kind().name(), self.id().raw())
    }
}
