//! The `(target, key) -> Dep` registry and mutation key selection.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{DepArena, DepId, Dep, TriggerOpType};
use crate::reactive::{Subscriber, SubscriberId};
use crate::value::{Key, Object, ObjectKind, Symbol, TargetId, Value, WeakObject};

struct TargetEntry {
    target: WeakObject,
    keys: IndexMap<Key, DepId>,
}

/// Registry from raw target to per-key subscriber sets.
#[derive(Default)]
pub struct TargetMap {
    targets: HashMap<TargetId, TargetEntry>,
    arena: DepArena,
    added_since_sweep: usize,
}

impl TargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dep for `(target, key)`, created on first use.
    pub fn dep_for(&mut self, target: &Object, key: Key) -> DepId {
        let arena = &mut self.arena;
        let added = &mut self.added_since_sweep;
        let entry = self.targets.entry(target.id()).or_insert_with(|| {
            *added += 1;
            TargetEntry {
                target: target.downgrade(),
                keys: IndexMap::new(),
            }
        });
        *entry.keys.entry(key).or_insert_with(|| arena.alloc())
    }

    /// Add `subscriber` to a dep. Returns `false` if it was already there or
    /// the ticket is stale.
    pub fn subscribe(&mut self, dep: DepId, subscriber: Rc<dyn Subscriber>) -> bool {
        self.arena
            .get_mut(dep)
            .is_some_and(|dep| dep.insert(subscriber))
    }

    pub fn unsubscribe(&mut self, dep: DepId, id: SubscriberId) {
        if let Some(dep) = self.arena.get_mut(dep) {
            dep.remove(id);
        }
    }

    pub fn dep(&self, target: &Object, key: &Key) -> Option<&Dep> {
        let id = *self.targets.get(&target.id())?.keys.get(key)?;
        self.arena.get(id)
    }

    /// Effects a mutation of `(target, key)` must notify: deduplicated, in
    /// subscription order, without `active` and without stopped effects.
    pub fn collect(
        &self,
        target: &Object,
        op: TriggerOpType,
        key: &Key,
        new_value: Option<&Value>,
        active: Option<SubscriberId>,
    ) -> Vec<Rc<dyn Subscriber>> {
        let Some(entry) = self.targets.get(&target.id()) else {
            return Vec::new();
        };

        let mut selected: IndexMap<SubscriberId, Rc<dyn Subscriber>> = IndexMap::new();
        let mut add = |dep: Option<&DepId>| {
            let Some(dep) = dep.and_then(|&id| self.arena.get(id)) else {
                return;
            };
            for subscriber in dep.subscribers() {
                let id = subscriber.id();
                if Some(id) == active || !subscriber.is_active() {
                    continue;
                }
                selected.entry(id).or_insert_with(|| subscriber.clone());
            }
        };

        let kind = target.kind();
        let is_list = kind == ObjectKind::List;
        let is_map = kind == ObjectKind::Map;

        if is_list && key.is_length() {
            // truncation: every index at or past the new length, plus `length`
            let new_len = new_value.and_then(Value::as_number).unwrap_or(0.0);
            for (tracked, dep) in &entry.keys {
                let removed = tracked
                    .as_index()
                    .is_some_and(|index| f64::from(index) >= new_len);
                if removed || tracked.is_length() {
                    add(Some(dep));
                }
            }
        } else {
            add(entry.keys.get(key));

            let iterate = Key::Symbol(Symbol::ITERATE_KEY);
            let map_iterate = Key::Symbol(Symbol::MAP_KEY_ITERATE_KEY);
            match op {
                TriggerOpType::Add | TriggerOpType::Delete if !is_list => {
                    add(entry.keys.get(&iterate));
                    if is_map {
                        add(entry.keys.get(&map_iterate));
                    }
                }
                TriggerOpType::Add if key.as_index().is_some() => {
                    // a new index extends the list
                    add(entry.keys.get(&Key::length()));
                }
                TriggerOpType::Set if is_map => {
                    add(entry.keys.get(&iterate));
                }
                _ => {}
            }
        }

        selected.into_values().collect()
    }

    /// Targets added since the last sweep.
    pub fn added_since_sweep(&self) -> usize {
        self.added_since_sweep
    }

    /// Drop entries whose target no longer exists. Returns how many targets
    /// were removed.
    pub fn sweep(&mut self) -> usize {
        let arena = &mut self.arena;
        let before = self.targets.len();
        self.targets.retain(|_, entry| {
            if entry.target.is_alive() {
                return true;
            }
            for &dep in entry.keys.values() {
                arena.free(dep);
            }
            false
        });
        self.added_since_sweep = 0;
        before - self.targets.len()
    }

    /// Number of observed targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Number of live deps across all targets.
    pub fn dep_count(&self) -> usize {
        self.arena.len()
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::reactive::Scheduler;

    struct Probe {
        id: SubscriberId,
        active: Cell<bool>,
    }

    impl Probe {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                id: SubscriberId::new(),
                active: Cell::new(true),
            })
        }
    }

    impl Subscriber for Probe {
        fn id(&self) -> SubscriberId {
            self.id
        }
        fn is_active(&self) -> bool {
            self.active.get()
        }
        fn scheduler(&self) -> Option<Scheduler> {
            None
        }
        fn run_erased(self: Rc<Self>) {}
        fn record_dependency(&self, _dep: DepId) {}
        fn stop(&self) {
            self.active.set(false);
        }
    }

    fn subscribe(map: &mut TargetMap, target: &Object, key: impl Into<Key>, probe: &Rc<Probe>) {
        let dep = map.dep_for(target, key.into());
        map.subscribe(dep, probe.clone());
    }

    fn ids(subscribers: Vec<Rc<dyn Subscriber>>) -> Vec<SubscriberId> {
        subscribers.iter().map(|s| s.id()).collect()
    }

    #[test]
    fn add_on_record_reaches_iteration_once() {
        let mut map = TargetMap::new();
        let target = Object::record();
        let (a, b) = (Probe::new(), Probe::new());
        subscribe(&mut map, &target, "k", &a);
        subscribe(&mut map, &target, Symbol::ITERATE_KEY, &a);
        subscribe(&mut map, &target, Symbol::ITERATE_KEY, &b);

        let selected = map.collect(&target, TriggerOpType::Add, &"k".into(), None, None);
        assert_eq!(ids(selected), vec![a.id, b.id]);

        let selected = map.collect(&target, TriggerOpType::Set, &"k".into(), None, None);
        assert_eq!(ids(selected), vec![a.id]);
    }

    #[test]
    fn excludes_active_and_stopped() {
        let mut map = TargetMap::new();
        let target = Object::record();
        let (a, b, c) = (Probe::new(), Probe::new(), Probe::new());
        for probe in [&a, &b, &c] {
            subscribe(&mut map, &target, "k", probe);
        }
        c.stop();

        let selected = map.collect(&target, TriggerOpType::Set, &"k".into(), None, Some(a.id));
        assert_eq!(ids(selected), vec![b.id]);
    }

    #[test]
    fn length_write_selects_truncated_indices() {
        let mut map = TargetMap::new();
        let target = Object::list([1, 2, 3]);
        let (low, high, len) = (Probe::new(), Probe::new(), Probe::new());
        subscribe(&mut map, &target, 0u32, &low);
        subscribe(&mut map, &target, 2u32, &high);
        subscribe(&mut map, &target, "length", &len);

        let selected = map.collect(
            &target,
            TriggerOpType::Set,
            &Key::length(),
            Some(&Value::from(1)),
            None,
        );
        assert_eq!(ids(selected), vec![high.id, len.id]);
    }

    #[test]
    fn new_index_selects_length() {
        let mut map = TargetMap::new();
        let target = Object::list([1]);
        let (len, iterate) = (Probe::new(), Probe::new());
        subscribe(&mut map, &target, "length", &len);
        subscribe(&mut map, &target, Symbol::ITERATE_KEY, &iterate);

        let selected = map.collect(&target, TriggerOpType::Add, &Key::Index(1), None, None);
        assert_eq!(ids(selected), vec![len.id]);
    }

    #[test]
    fn map_set_selects_iteration() {
        let mut map = TargetMap::new();
        let target = Object::map();
        let (iterate, keys) = (Probe::new(), Probe::new());
        subscribe(&mut map, &target, Symbol::ITERATE_KEY, &iterate);
        subscribe(&mut map, &target, Symbol::MAP_KEY_ITERATE_KEY, &keys);

        let selected = map.collect(&target, TriggerOpType::Set, &"k".into(), None, None);
        assert_eq!(ids(selected), vec![iterate.id]);

        let selected = map.collect(&target, TriggerOpType::Delete, &"k".into(), None, None);
        assert_eq!(ids(selected), vec![iterate.id, keys.id]);
    }

    #[test]
    fn sweep_frees_dropped_targets() {
        let mut map = TargetMap::new();
        let kept = Object::record();
        let probe = Probe::new();
        subscribe(&mut map, &kept, "a", &probe);
        {
            let dropped = Object::record();
            subscribe(&mut map, &dropped, "a", &probe);
            subscribe(&mut map, &dropped, "b", &probe);
        }
        assert_eq!((map.len(), map.dep_count()), (2, 3));
        assert_eq!(map.added_since_sweep(), 2);

        assert_eq!(map.sweep(), 1);
        assert_eq!((map.len(), map.dep_count()), (1, 1));
        assert_eq!(map.added_since_sweep(), 0);
    }
}
