//! Subscriber sets and the arena that stores them.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::reactive::{Subscriber, SubscriberId};

/// Ticket for a [`Dep`] in a [`DepArena`].
///
/// The generation makes a ticket for a freed slot harmless: lookups with a
/// stale ticket find nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepId {
    index: u32,
    generation: u32,
}

/// The effects subscribed to one `(target, key)` pair, in subscription order.
#[derive(Default)]
pub struct Dep {
    subscribers: IndexMap<SubscriberId, Rc<dyn Subscriber>>,
}

impl Dep {
    /// Add `subscriber`. Returns `false` if it was already present.
    pub fn insert(&mut self, subscriber: Rc<dyn Subscriber>) -> bool {
        let id = subscriber.id();
        if self.subscribers.contains_key(&id) {
            return false;
        }
        self.subscribers.insert(id, subscriber);
        true
    }

    pub fn remove(&mut self, id: SubscriberId) -> bool {
        self.subscribers.shift_remove(&id).is_some()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn subscribers(&self) -> impl Iterator<Item = &Rc<dyn Subscriber>> {
        self.subscribers.values()
    }
}

struct Slot {
    generation: u32,
    dep: Option<Dep>,
}

/// Generational storage for [`Dep`]s.
#[derive(Default)]
pub struct DepArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl DepArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> DepId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.dep = Some(Dep::default());
            return DepId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            dep: Some(Dep::default()),
        });
        DepId {
            index,
            generation: 0,
        }
    }

    /// Free a slot, returning its dep. Stale tickets are ignored.
    pub fn free(&mut self, id: DepId) -> Option<Dep> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let dep = slot.dep.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(dep)
    }

    pub fn get(&self, id: DepId) -> Option<&Dep> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.dep.as_ref())
    }

    pub fn get_mut(&mut self, id: DepId) -> Option<&mut Dep> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.dep.as_mut())
    }

    /// Number of live deps.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_tickets_miss() {
        let mut arena = DepArena::new();
        let first = arena.alloc();
        assert!(arena.get(first).is_some());

        assert!(arena.free(first).is_some());
        assert!(arena.get(first).is_none());
        assert!(arena.free(first).is_none());

        // the slot is reused under a new generation
        let second = arena.alloc();
        assert_ne!(first, second);
        assert!(arena.get(first).is_none());
        assert!(arena.get(second).is_some());
        assert_eq!(arena.len(), 1);
    }
}
