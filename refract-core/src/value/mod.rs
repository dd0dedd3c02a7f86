//! Value Model
//!
//! Raw data the engine observes. A [`Value`] is either a primitive, a raw
//! container ([`Object`]) or an observable [`Handle`] wrapped around one.
//!
//! # Identity
//!
//! Containers are reference types: cloning an `Object` or a `Handle` clones
//! the reference, never the data. Equality between containers is identity
//! equality, mirroring how the dependency graph keys on raw targets.
//!
//! # Keys
//!
//! Property keys are normalised on construction: a string that is the
//! canonical form of an array index (`"0"`, `"17"`, but not `"01"`) becomes
//! [`Key::Index`], so `"3"` and `3` name the same slot.

mod array;
mod json;
mod object;

pub use array::ArrayMethod;
pub use object::{Object, ObjectKind, TargetId, WeakObject};

pub(crate) use array::{call_native, search};

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::reactive::Handle;

// ----------------------------------------------------------------------------
// Symbols
// ----------------------------------------------------------------------------

/// A unique, identity-compared property key.
///
/// Well-known symbols occupy a fixed id range so they can be recognised
/// without a lookup table.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Cow<'static, str>,
}

/// Ids up to this value belong to the language-level well-known symbols.
const LAST_WELL_KNOWN: u64 = 13;

/// First id handed out by [`Symbol::new`].
const FIRST_USER_SYMBOL: u64 = 1024;

impl Symbol {
    pub const ASYNC_ITERATOR: Symbol = Symbol::fixed(1, "Symbol.asyncIterator");
    pub const HAS_INSTANCE: Symbol = Symbol::fixed(2, "Symbol.hasInstance");
    pub const IS_CONCAT_SPREADABLE: Symbol = Symbol::fixed(3, "Symbol.isConcatSpreadable");
    pub const ITERATOR: Symbol = Symbol::fixed(4, "Symbol.iterator");
    pub const MATCH: Symbol = Symbol::fixed(5, "Symbol.match");
    pub const MATCH_ALL: Symbol = Symbol::fixed(6, "Symbol.matchAll");
    pub const REPLACE: Symbol = Symbol::fixed(7, "Symbol.replace");
    pub const SEARCH: Symbol = Symbol::fixed(8, "Symbol.search");
    pub const SPECIES: Symbol = Symbol::fixed(9, "Symbol.species");
    pub const SPLIT: Symbol = Symbol::fixed(10, "Symbol.split");
    pub const TO_PRIMITIVE: Symbol = Symbol::fixed(11, "Symbol.toPrimitive");
    pub const TO_STRING_TAG: Symbol = Symbol::fixed(12, "Symbol.toStringTag");
    pub const UNSCOPABLES: Symbol = Symbol::fixed(13, "Symbol.unscopables");

    /// Reserved key: reading it through a handle yields the raw target.
    pub const RAW: Symbol = Symbol::fixed(100, "__v_raw");

    /// Dependency key standing for "the set of keys" of a non-list target.
    pub const ITERATE_KEY: Symbol = Symbol::fixed(101, "iterate");

    /// Dependency key standing for "the set of keys" of a map collection.
    pub const MAP_KEY_ITERATE_KEY: Symbol = Symbol::fixed(102, "Map key iterate");

    const fn fixed(id: u64, description: &'static str) -> Self {
        Self {
            id,
            description: Cow::Borrowed(description),
        }
    }

    /// Create a fresh symbol, distinct from every other symbol.
    pub fn new(description: impl Into<Cow<'static, str>>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(FIRST_USER_SYMBOL);
        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether this is one of the built-in `Symbol.*` keys.
    pub fn is_well_known(&self) -> bool {
        self.id <= LAST_WELL_KNOWN
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

// ----------------------------------------------------------------------------
// Keys
// ----------------------------------------------------------------------------

/// A property key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A canonical array index.
    Index(u32),
    /// Any other string key.
    Name(Rc<str>),
    Symbol(Symbol),
}

impl Key {
    /// The `length` key of lists.
    pub fn length() -> Self {
        Key::Name(Rc::from("length"))
    }

    pub fn is_length(&self) -> bool {
        matches!(self, Key::Name(name) if &**name == "length")
    }

    /// The index this key names, if it is integer-like.
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Key::Index(index) => Some(*index),
            _ => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Key::Symbol(_))
    }

    pub fn is_well_known_symbol(&self) -> bool {
        matches!(self, Key::Symbol(symbol) if symbol.is_well_known())
    }
}

/// Parse `s` as a canonical array index (no sign, no leading zeros, below 2^32 - 1).
fn canonical_index(s: &str) -> Option<u32> {
    if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
        return None;
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().filter(|&n| n != u32::MAX)
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        match canonical_index(s) {
            Some(index) => Key::Index(index),
            None => Key::Name(Rc::from(s)),
        }
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::from(s.as_str())
    }
}

impl From<u32> for Key {
    fn from(index: u32) -> Self {
        if index == u32::MAX {
            Key::Name(Rc::from(index.to_string()))
        } else {
            Key::Index(index)
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(index) => Key::from(index),
            Err(_) => Key::Name(Rc::from(index.to_string())),
        }
    }
}

impl From<i32> for Key {
    fn from(index: i32) -> Self {
        match u32::try_from(index) {
            Ok(index) => Key::Index(index),
            Err(_) => Key::Name(Rc::from(index.to_string())),
        }
    }
}

impl From<Symbol> for Key {
    fn from(symbol: Symbol) -> Self {
        Key::Symbol(symbol)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
            Key::Symbol(symbol) => write!(f, "{symbol:?}"),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => write!(f, "{name:?}"),
            Key::Symbol(symbol) => write!(f, "{symbol:?}"),
        }
    }
}

// ----------------------------------------------------------------------------
// Values
// ----------------------------------------------------------------------------

/// A dynamically typed value stored in, or read from, a container.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Symbol(Symbol),
    /// A raw container.
    Object(Object),
    /// An observable handle over a raw container.
    Handle(Handle),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Whether this value is a container, raw or wrapped.
    pub fn is_object_like(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Handle(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Value::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn into_handle(self) -> Option<Handle> {
        match self {
            Value::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    /// Integer conversion used by index arguments: truncates, maps NaN and
    /// non-numbers to zero.
    pub(crate) fn to_integer(&self) -> f64 {
        let n = match self {
            Value::Number(n) => *n,
            Value::Bool(true) => 1.0,
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        if n.is_nan() {
            0.0
        } else {
            n.trunc()
        }
    }
}

/// Strict equality: NaN is unequal to itself, +0 equals -0, containers
/// compare by identity.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Symbol(a), Value::Symbol(b)) => a == b,
        (Value::Object(a), Value::Object(b)) => Object::ptr_eq(a, b),
        (Value::Handle(a), Value::Handle(b)) => Handle::ptr_eq(a, b),
        _ => false,
    }
}

/// Strict equality, except that NaN equals NaN.
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
        _ => strict_equals(a, b),
    }
}

/// Whether a write of `new` over `old` counts as a change.
pub fn has_changed(old: &Value, new: &Value) -> bool {
    !same_value_zero(old, new)
}

/// Unwrap a handle to its raw container; other values are returned as-is.
pub fn to_raw(value: &Value) -> Value {
    match value {
        Value::Handle(handle) => Value::Object(handle.to_raw()),
        other => other.clone(),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        strict_equals(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Symbol(symbol) => write!(f, "{symbol:?}"),
            Value::Object(object) => write!(f, "{object:?}"),
            Value::Handle(handle) => write!(f, "{handle:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<&Object> for Value {
    fn from(object: &Object) -> Self {
        Value::Object(object.clone())
    }
}

impl From<Handle> for Value {
    fn from(handle: Handle) -> Self {
        Value::Handle(handle)
    }
}

impl From<&Handle> for Value {
    fn from(handle: &Handle) -> Self {
        Value::Handle(handle.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_index_strings_become_indices() {
        assert_eq!(Key::from("0"), Key::Index(0));
        assert_eq!(Key::from("42"), Key::Index(42));
        assert_eq!(Key::from(42usize), Key::from("42"));
        assert!(matches!(Key::from("042"), Key::Name(_)));
        assert!(matches!(Key::from("-1"), Key::Name(_)));
        assert!(matches!(Key::from("4294967295"), Key::Name(_)));
        assert!(Key::from("length").is_length());
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = Symbol::new("token");
        let b = Symbol::new("token");
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
        assert!(Symbol::ITERATOR.is_well_known());
        assert!(!Symbol::RAW.is_well_known());
        assert!(!a.is_well_known());
    }

    #[test]
    fn change_detection_treats_nan_as_equal() {
        let nan = Value::Number(f64::NAN);
        assert!(!strict_equals(&nan, &nan));
        assert!(!has_changed(&nan, &nan));
        assert!(!has_changed(&Value::from(0.0), &Value::from(-0.0)));
        assert!(has_changed(&Value::from(1), &Value::from(2)));
        assert!(has_changed(&Value::Undefined, &Value::Null));
    }

    #[test]
    fn containers_compare_by_identity() {
        let a = Object::record();
        let b = Object::record();
        assert_eq!(Value::from(&a), Value::from(&a));
        assert_ne!(Value::from(&a), Value::from(&b));
    }
}
