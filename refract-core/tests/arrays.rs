//! List Semantics Through Handles
//!
//! Length bookkeeping, identity-sensitive search and the length-changing
//! methods, observed through effects.

use refract_core::{Error, Handle, Object, Runtime, Value};

fn reactive(rt: &Runtime, raw: &Object) -> Handle {
    rt.reactive(raw).into_handle().unwrap()
}

fn numbers(list: &Object) -> Vec<f64> {
    (0..list.list_len())
        .map(|i| list.get(i).as_number().unwrap_or(f64::NAN))
        .collect()
}

/// Searching finds an element whether given as a handle or as raw.
#[test]
fn search_matches_handles_and_raw_values() {
    let rt = Runtime::new();
    let (a, b) = (Object::record(), Object::record());
    let list = reactive(&rt, &Object::list([&a, &b]));

    let wrapped = list.get(1);
    assert!(wrapped.as_handle().is_some());

    assert_eq!(list.call("indexOf", &[wrapped.clone()]).unwrap(), Value::from(1));
    assert_eq!(list.call("indexOf", &[Value::from(&b)]).unwrap(), Value::from(1));
    assert_eq!(list.call("lastIndexOf", &[wrapped.clone()]).unwrap(), Value::from(1));
    assert_eq!(list.call("includes", &[wrapped]).unwrap(), Value::Bool(true));
    assert_eq!(
        list.call("includes", &[Value::from(&Object::record())]).unwrap(),
        Value::Bool(false)
    );
}

/// A search depends on every element and on the length.
#[test]
fn search_tracks_every_index() {
    let rt = Runtime::new();
    let list = reactive(&rt, &Object::list([1, 2, 3]));

    let reader = list.clone();
    let effect = rt.effect(move || reader.call("includes", &[9.into()]).unwrap());
    assert_eq!(effect.run(), Value::Bool(false));

    list.set(2, 9);
    assert_eq!(effect.run_count(), 3);
    assert_eq!(effect.run(), Value::Bool(true));

    list.call("push", &[4.into()]).unwrap();
    assert_eq!(effect.run_count(), 5);
}

/// An effect that pushes inside its own run neither loops nor subscribes
/// to the length it changes.
#[test]
fn push_inside_effect_runs_once() {
    let rt = Runtime::new();
    let raw = Object::list(Vec::<Value>::new());
    let list = reactive(&rt, &raw);

    let writer = list.clone();
    let effect = rt.effect(move || {
        writer.call("push", &["item".into()]).unwrap();
    });
    assert_eq!(effect.run_count(), 1);
    assert_eq!(raw.list_len(), 1);
    assert_eq!(effect.dependency_count(), 0);

    list.call("push", &["other".into()]).unwrap();
    assert_eq!(effect.run_count(), 1);
    assert_eq!(raw.list_len(), 2);
}

/// An effect reading the length and then pushing re-runs only for
/// outside length changes, and never re-enters itself.
#[test]
fn length_reader_that_pushes() {
    let rt = Runtime::new();
    let raw = Object::list([7, 8]);
    let list = reactive(&rt, &raw);

    let handle = list.clone();
    let effect = rt.effect(move || {
        let len = handle.get("length");
        handle.call("push", &[len]).unwrap();
    });
    assert_eq!(effect.run_count(), 1);
    assert_eq!(numbers(&raw), vec![7.0, 8.0, 2.0]);

    list.set("length", 0);
    assert_eq!(effect.run_count(), 2);
    assert_eq!(numbers(&raw), vec![0.0]);
}

/// Appending past the end notifies length readers.
#[test]
fn adding_an_index_triggers_length() {
    let rt = Runtime::new();
    let list = reactive(&rt, &Object::list([1, 2, 3]));

    let reader = list.clone();
    let effect = rt.effect(move || reader.get("length"));

    list.set(1, 20);
    assert_eq!(effect.run_count(), 1, "in-bounds writes keep the length");

    list.set(5, 6);
    assert_eq!(effect.run_count(), 2);
    assert_eq!(effect.run(), Value::from(6));
}

/// Far indices and huge lengths are accepted without filling the gap.
#[test]
fn far_index_and_length_writes() {
    let rt = Runtime::new();
    let raw = Object::list([1, 2]);
    let list = reactive(&rt, &raw);

    let reader = list.clone();
    let length = rt.effect(move || reader.get("length"));
    let reader = list.clone();
    let far = rt.effect(move || reader.get(4_000_000_000u32));

    assert!(list.set(4_000_000_000u32, 7));
    assert_eq!(raw.list_len(), 4_000_000_001);
    assert_eq!((length.run_count(), far.run_count()), (2, 2));
    assert_eq!(list.own_keys().len(), 4);

    assert!(list.set("length", 3_000_000_000u32));
    assert_eq!((length.run_count(), far.run_count()), (3, 3));
    assert_eq!(list.get(4_000_000_000u32), Value::Undefined);
    assert_eq!(list.get(1), Value::from(2));

    assert!(!list.set("length", 5e9));
    assert_eq!(raw.list_len(), 3_000_000_000);
}

/// Shrinking the length notifies readers of the removed indices only.
#[test]
fn truncation_triggers_removed_indices() {
    let rt = Runtime::new();
    let list = reactive(&rt, &Object::list([1, 2, 3, 4]));

    let reader = list.clone();
    let tail = rt.effect(move || reader.get(3));
    let reader = list.clone();
    let head = rt.effect(move || reader.get(0));

    list.set("length", 2);
    assert_eq!(tail.run_count(), 2);
    assert_eq!(head.run_count(), 1);
    assert_eq!(tail.run(), Value::Undefined);
}

/// Enumerating a list depends on its length.
#[test]
fn own_keys_tracks_length() {
    let rt = Runtime::new();
    let list = reactive(&rt, &Object::list(["a", "b"]));

    let reader = list.clone();
    let effect = rt.effect(move || reader.own_keys().len());
    assert_eq!(effect.run(), 3);

    list.set(0, "z");
    assert_eq!(effect.run_count(), 2, "only the manual run above");

    list.call("pop", &[]).unwrap();
    assert_eq!(effect.run_count(), 3);
}

/// Length-changing methods notify element readers.
#[test]
fn mutators_trigger_element_readers() {
    let rt = Runtime::new();
    let raw = Object::list([1, 2, 3]);
    let list = reactive(&rt, &raw);

    let reader = list.clone();
    let first = rt.effect(move || reader.get(0));

    assert_eq!(list.call("shift", &[]).unwrap(), Value::from(1));
    assert_eq!(first.run_count(), 2);
    assert_eq!(numbers(&raw), vec![2.0, 3.0]);

    list.call("unshift", &[0.into()]).unwrap();
    assert_eq!(first.run_count(), 3);

    let removed = list.call("splice", &[0.into(), 1.into()]).unwrap();
    assert_eq!(numbers(removed.as_object().unwrap()), vec![0.0]);
    assert_eq!(first.run_count(), 4);
    assert_eq!(numbers(&raw), vec![2.0, 3.0]);
}

/// Methods called on a readonly list leave it untouched.
#[test]
fn readonly_list_is_not_mutated() {
    let rt = Runtime::new();
    let raw = Object::list([1, 2]);
    let readonly = rt.readonly(&raw).into_handle().unwrap();

    readonly.call("push", &[3.into()]).unwrap();
    readonly.call("pop", &[]).unwrap();
    assert_eq!(numbers(&raw), vec![1.0, 2.0]);

    assert_eq!(readonly.call("indexOf", &[2.into()]).unwrap(), Value::from(1));
}

/// Shallow lists are instrumented like deep ones.
#[test]
fn shallow_list_push_does_not_recurse() {
    let rt = Runtime::new();
    let raw = Object::list(Vec::<Value>::new());
    let list = rt.shallow_reactive(&raw).into_handle().unwrap();

    let handle = list.clone();
    let effect = rt.effect(move || {
        let len = handle.get("length");
        handle.call("push", &[len]).unwrap();
    });
    assert_eq!(effect.run_count(), 1);
    assert_eq!(raw.list_len(), 1);
}

/// Lists only take index keys and `length`.
#[test]
fn lists_reject_named_keys() {
    let rt = Runtime::new();
    let list = reactive(&rt, &Object::list([1]));

    assert!(!list.set("name", 1));
    assert!(matches!(list.call("frobnicate", &[]), Err(Error::UnknownMethod(_))));

    let record = reactive(&rt, &Object::record());
    assert!(matches!(record.call("push", &[]), Err(Error::NotAList { .. })));
}
