//! List methods.
//!
//! Native algorithms for the list methods the engine knows about. They are
//! written against [`Receiver`] so the same code runs on a raw [`Object`]
//! and on a [`Handle`], where every element access goes through the traps.

use super::{same_value_zero, strict_equals, Key, Object, Value};
use crate::error::{Error, Result};
use crate::reactive::Handle;

/// List methods callable through [`Object::call`] and [`Handle::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayMethod {
    Includes,
    IndexOf,
    LastIndexOf,
    Push,
    Pop,
    Shift,
    Unshift,
    Splice,
}

impl ArrayMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "includes" => ArrayMethod::Includes,
            "indexOf" => ArrayMethod::IndexOf,
            "lastIndexOf" => ArrayMethod::LastIndexOf,
            "push" => ArrayMethod::Push,
            "pop" => ArrayMethod::Pop,
            "shift" => ArrayMethod::Shift,
            "unshift" => ArrayMethod::Unshift,
            "splice" => ArrayMethod::Splice,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ArrayMethod::Includes => "includes",
            ArrayMethod::IndexOf => "indexOf",
            ArrayMethod::LastIndexOf => "lastIndexOf",
            ArrayMethod::Push => "push",
            ArrayMethod::Pop => "pop",
            ArrayMethod::Shift => "shift",
            ArrayMethod::Unshift => "unshift",
            ArrayMethod::Splice => "splice",
        }
    }
}

/// The `this` of a list method.
pub(crate) trait Receiver {
    fn get(&self, key: &Key) -> Value;
    fn set(&self, key: Key, value: Value) -> bool;
    fn has(&self, key: &Key) -> bool;
    fn delete(&self, key: &Key) -> bool;
}

impl Receiver for Object {
    fn get(&self, key: &Key) -> Value {
        Object::get(self, key)
    }

    fn set(&self, key: Key, value: Value) -> bool {
        Object::set(self, key, value)
    }

    fn has(&self, key: &Key) -> bool {
        self.has_key(key)
    }

    fn delete(&self, key: &Key) -> bool {
        self.delete_key(key)
    }
}

impl Receiver for Handle {
    fn get(&self, key: &Key) -> Value {
        Handle::get(self, key)
    }

    fn set(&self, key: Key, value: Value) -> bool {
        Handle::set(self, key, value)
    }

    fn has(&self, key: &Key) -> bool {
        Handle::has(self, key)
    }

    fn delete(&self, key: &Key) -> bool {
        Handle::delete(self, key)
    }
}

pub(crate) fn call_by_name(this: &Object, name: &str, args: &[Value]) -> Result<Value> {
    let method = ArrayMethod::from_name(name).ok_or_else(|| Error::UnknownMethod(name.to_owned()))?;
    if !this.is_list() {
        return Err(Error::NotAList {
            method: method.name(),
            kind: this.kind().name(),
        });
    }
    call_native(this, method, args)
}

/// Run the native algorithm of `method` with `this` as receiver.
pub(crate) fn call_native<R: Receiver>(this: &R, method: ArrayMethod, args: &[Value]) -> Result<Value> {
    match method {
        ArrayMethod::Includes | ArrayMethod::IndexOf | ArrayMethod::LastIndexOf => {
            Ok(search(this, method, args))
        }
        ArrayMethod::Push => push(this, args),
        ArrayMethod::Pop => pop(this),
        ArrayMethod::Shift => shift(this),
        ArrayMethod::Unshift => unshift(this, args),
        ArrayMethod::Splice => splice(this, args),
    }
}

fn length_of<R: Receiver>(this: &R) -> usize {
    let n = this.get(&Key::length()).to_integer();
    if n <= 0.0 {
        0
    } else {
        n.min(f64::from(u32::MAX - 1)) as usize
    }
}

/// Resolve a relative index argument against `len`.
fn relative_index(arg: Option<&Value>, len: usize, default: f64) -> f64 {
    let n = arg.map_or(default, Value::to_integer);
    if n < 0.0 {
        (len as f64 + n).max(0.0)
    } else {
        n.min(len as f64)
    }
}

fn write<R: Receiver>(this: &R, key: Key, value: Value) -> Result<()> {
    if this.set(key.clone(), value) {
        Ok(())
    } else {
        Err(Error::WriteRejected(key))
    }
}

fn remove<R: Receiver>(this: &R, key: Key) -> Result<()> {
    if this.delete(&key) {
        Ok(())
    } else {
        Err(Error::DeleteRejected(key))
    }
}

/// Move slot `from` to slot `to`, propagating holes.
fn move_slot<R: Receiver>(this: &R, from: usize, to: usize) -> Result<()> {
    let from = Key::from(from);
    if this.has(&from) {
        let value = this.get(&from);
        write(this, Key::from(to), value)
    } else {
        remove(this, Key::from(to))
    }
}

/// `includes` / `indexOf` / `lastIndexOf`.
pub(crate) fn search<R: Receiver>(this: &R, method: ArrayMethod, args: &[Value]) -> Value {
    let needle = args.first().cloned().unwrap_or_default();
    let len = length_of(this);

    match method {
        ArrayMethod::Includes => {
            let start = relative_index(args.get(1), len, 0.0) as usize;
            let found = (start..len).any(|i| same_value_zero(&this.get(&Key::from(i)), &needle));
            Value::Bool(found)
        }
        ArrayMethod::IndexOf => {
            let start = relative_index(args.get(1), len, 0.0) as usize;
            let found = (start..len).find(|&i| {
                let key = Key::from(i);
                this.has(&key) && strict_equals(&this.get(&key), &needle)
            });
            found.map_or(Value::Number(-1.0), Value::from)
        }
        ArrayMethod::LastIndexOf => {
            if len == 0 {
                return Value::Number(-1.0);
            }
            let from = args.get(1).map_or(len as f64 - 1.0, Value::to_integer);
            let from = if from < 0.0 {
                len as f64 + from
            } else {
                from.min(len as f64 - 1.0)
            };
            if from < 0.0 {
                return Value::Number(-1.0);
            }
            let found = (0..=from as usize).rev().find(|&i| {
                let key = Key::from(i);
                this.has(&key) && strict_equals(&this.get(&key), &needle)
            });
            found.map_or(Value::Number(-1.0), Value::from)
        }
        _ => Value::Undefined,
    }
}

fn push<R: Receiver>(this: &R, args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    for (offset, item) in args.iter().enumerate() {
        write(this, Key::from(len + offset), item.clone())?;
    }
    let new_len = len + args.len();
    write(this, Key::length(), Value::from(new_len))?;
    Ok(Value::from(new_len))
}

fn pop<R: Receiver>(this: &R) -> Result<Value> {
    let len = length_of(this);
    if len == 0 {
        write(this, Key::length(), Value::from(0))?;
        return Ok(Value::Undefined);
    }
    let last = Key::from(len - 1);
    let element = this.get(&last);
    remove(this, last)?;
    write(this, Key::length(), Value::from(len - 1))?;
    Ok(element)
}

fn shift<R: Receiver>(this: &R) -> Result<Value> {
    let len = length_of(this);
    if len == 0 {
        write(this, Key::length(), Value::from(0))?;
        return Ok(Value::Undefined);
    }
    let first = this.get(&Key::Index(0));
    for k in 1..len {
        move_slot(this, k, k - 1)?;
    }
    remove(this, Key::from(len - 1))?;
    write(this, Key::length(), Value::from(len - 1))?;
    Ok(first)
}

fn unshift<R: Receiver>(this: &R, args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    let count = args.len();
    if count > 0 {
        for k in (1..=len).rev() {
            move_slot(this, k - 1, k + count - 1)?;
        }
        for (j, item) in args.iter().enumerate() {
            write(this, Key::from(j), item.clone())?;
        }
    }
    write(this, Key::length(), Value::from(len + count))?;
    Ok(Value::from(len + count))
}

fn splice<R: Receiver>(this: &R, args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    let start = relative_index(args.first(), len, 0.0) as usize;
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => args[1].to_integer().max(0.0).min((len - start) as f64) as usize,
    };
    let items = args.get(2..).unwrap_or_default();

    let removed: Vec<Option<Value>> = (start..start + delete_count)
        .map(|i| {
            let key = Key::from(i);
            this.has(&key).then(|| this.get(&key))
        })
        .collect();

    let item_count = items.len();
    if item_count < delete_count {
        for k in start..len - delete_count {
            move_slot(this, k + delete_count, k + item_count)?;
        }
        for k in (len - delete_count + item_count..len).rev() {
            remove(this, Key::from(k))?;
        }
    } else if item_count > delete_count {
        for k in (start + 1..=len - delete_count).rev() {
            move_slot(this, k + delete_count - 1, k + item_count - 1)?;
        }
    }

    for (offset, item) in items.iter().enumerate() {
        write(this, Key::from(start + offset), item.clone())?;
    }
    write(this, Key::length(), Value::from(len - delete_count + item_count))?;

    Ok(Value::Object(Object::list_with_holes(removed)))
}
