//! List method instrumentation for mutable handles.
//!
//! Two groups of methods need more than the generic traps:
//!
//! - Identity-sensitive searches depend on every element, and callers may
//!   search for a handle where the list stores the raw value (or the other
//!   way round). They track every index, search with the arguments as given,
//!   and retry with unwrapped arguments on a miss.
//! - Length-changing mutations read `length` and then write it. Run with
//!   tracking on, an effect that pushes to a list would subscribe to the
//!   very `length` it is about to change. They run with tracking paused.

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::handle::Handle;
use crate::error::Result;
use crate::graph::TrackOpType;
use crate::value::{call_native, search, to_raw, ArrayMethod, Key, Value};

/// Replacement implementation of a list method.
pub type Instrumentation = fn(&ReactiveContext, &Handle, ArrayMethod, &[Value]) -> Result<Value>;

const INSTRUMENTATIONS: [(ArrayMethod, Instrumentation); 8] = [
    (ArrayMethod::Includes, search_by_identity as Instrumentation),
    (ArrayMethod::IndexOf, search_by_identity),
    (ArrayMethod::LastIndexOf, search_by_identity),
    (ArrayMethod::Push, mutate_untracked),
    (ArrayMethod::Pop, mutate_untracked),
    (ArrayMethod::Shift, mutate_untracked),
    (ArrayMethod::Unshift, mutate_untracked),
    (ArrayMethod::Splice, mutate_untracked),
];

pub(crate) fn lookup(method: ArrayMethod) -> Option<Instrumentation> {
    INSTRUMENTATIONS
        .iter()
        .find(|(candidate, _)| *candidate == method)
        .map(|&(_, instrumentation)| instrumentation)
}

fn is_miss(result: &Value) -> bool {
    match result {
        Value::Number(n) => *n == -1.0,
        Value::Bool(found) => !found,
        _ => false,
    }
}

fn search_by_identity(
    cx: &ReactiveContext,
    this: &Handle,
    method: ArrayMethod,
    args: &[Value],
) -> Result<Value> {
    let raw = this.to_raw();
    let len = this.get(Key::length()).to_integer().max(0.0) as u32;
    for index in 0..len {
        cx.track(&raw, TrackOpType::Get, Key::Index(index));
    }

    let result = search(&raw, method, args);
    if !is_miss(&result) {
        return Ok(result);
    }
    let raw_args: SmallVec<[Value; 4]> = args.iter().map(to_raw).collect();
    Ok(search(&raw, method, &raw_args))
}

fn mutate_untracked(
    cx: &ReactiveContext,
    this: &Handle,
    method: ArrayMethod,
    args: &[Value],
) -> Result<Value> {
    let _paused = cx.pause_scope();
    call_native(this, method, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_list_method_is_instrumented() {
        for method in [
            ArrayMethod::Includes,
            ArrayMethod::IndexOf,
            ArrayMethod::LastIndexOf,
            ArrayMethod::Push,
            ArrayMethod::Pop,
            ArrayMethod::Shift,
            ArrayMethod::Unshift,
            ArrayMethod::Splice,
        ] {
            assert!(lookup(method).is_some(), "{} not instrumented", method.name());
        }
    }
}
