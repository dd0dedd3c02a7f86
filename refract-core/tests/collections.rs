//! Map Targets Through Supplied Collection Handlers
//!
//! The engine does not trap maps and sets itself. These tests plug a
//! minimal map interceptor into a runtime and check that the graph applies
//! the map-specific trigger rules.

use std::rc::Rc;

use refract_core::reactive::{CollectionHandlers, Interceptor, Mode, ReactiveContext};
use refract_core::{has_changed, Key, Object, Runtime, Symbol, TrackOpType, TriggerOpType, Value};

struct MapInterceptor {
    readonly: bool,
}

impl Interceptor for MapInterceptor {
    fn read(&self, cx: &ReactiveContext, target: &Object, key: &Key, _receiver: &Value) -> Value {
        if *key == Key::Symbol(Symbol::RAW) {
            return Value::from(target);
        }
        if !self.readonly {
            cx.track(target, TrackOpType::Get, key.clone());
        }
        target
            .entries()
            .and_then(|entries| entries.get(key).cloned())
            .unwrap_or_default()
    }

    fn write(&self, cx: &ReactiveContext, target: &Object, key: Key, value: Value, _receiver: &Value) -> bool {
        if self.readonly {
            return true;
        }
        let old = target.entries().and_then(|entries| entries.get(&key).cloned());
        let Some(mut entries) = target.entries_mut() else {
            return false;
        };
        entries.insert(key.clone(), value.clone());
        drop(entries);

        match old {
            None => cx.trigger(target, TriggerOpType::Add, &key, Some(&value), None),
            Some(old) if has_changed(&old, &value) => {
                cx.trigger(target, TriggerOpType::Set, &key, Some(&value), Some(&old))
            }
            Some(_) => {}
        }
        true
    }

    fn has(&self, cx: &ReactiveContext, target: &Object, key: &Key) -> bool {
        if !self.readonly {
            cx.track(target, TrackOpType::Has, key.clone());
        }
        target.entries().is_some_and(|entries| entries.contains_key(key))
    }

    fn delete(&self, cx: &ReactiveContext, target: &Object, key: &Key) -> bool {
        if self.readonly {
            return true;
        }
        let old = target
            .entries_mut()
            .and_then(|mut entries| entries.shift_remove(key));
        if let Some(old) = &old {
            cx.trigger(target, TriggerOpType::Delete, key, None, Some(old));
        }
        old.is_some()
    }

    fn own_keys(&self, cx: &ReactiveContext, target: &Object) -> Vec<Key> {
        if !self.readonly {
            cx.track(target, TrackOpType::Iterate, Key::Symbol(Symbol::ITERATE_KEY));
        }
        target
            .entries()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

struct MapHandlers;

impl CollectionHandlers for MapHandlers {
    fn interceptor(&self, mode: Mode) -> Rc<dyn Interceptor> {
        Rc::new(MapInterceptor {
            readonly: mode.readonly,
        })
    }
}

fn runtime() -> Runtime {
    Runtime::builder()
        .collection_handlers(Rc::new(MapHandlers))
        .build()
}

/// Without handlers, maps pass through unwrapped.
#[test]
fn maps_are_unwrapped_without_handlers() {
    let rt = Runtime::new();
    let map = Object::map();
    assert_eq!(rt.reactive(&map), Value::from(&map));
}

/// Iterating a map depends on values as well as on the key set.
#[test]
fn map_iteration_sees_value_updates() {
    let rt = runtime();
    let map = rt.reactive(Object::map()).into_handle().unwrap();

    let reader = map.clone();
    let effect = rt.effect(move || {
        reader
            .own_keys()
            .into_iter()
            .map(|key| reader.get(key).as_number().unwrap_or(0.0))
            .sum::<f64>()
    });

    map.set("a", 1);
    assert_eq!(effect.run_count(), 2);

    map.set("a", 2);
    assert_eq!(effect.run_count(), 3);
    assert_eq!(effect.run(), 2.0);

    map.set("a", 2);
    assert_eq!(effect.run_count(), 4, "only the manual run above");

    map.delete("a");
    assert_eq!(effect.run_count(), 5);
}

/// Keyed reads on a map follow their key only.
#[test]
fn map_get_tracks_single_key() {
    let rt = runtime();
    let map = rt.reactive(Object::map()).into_handle().unwrap();

    let reader = map.clone();
    let effect = rt.effect(move || reader.get("a"));

    map.set("b", 1);
    assert_eq!(effect.run_count(), 1);

    map.set("a", 1);
    assert_eq!(effect.run_count(), 2);
    assert!(map.has("a"));
}

/// Supplied handlers receive the requested mode.
#[test]
fn readonly_map_handle() {
    let rt = runtime();
    let raw = Object::map();
    let readonly = rt.readonly(&raw).into_handle().unwrap();

    assert!(readonly.is_readonly());
    readonly.set("a", 1);
    assert!(raw.entries().unwrap().is_empty());
}
