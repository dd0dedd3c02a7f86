//! Identity registry: raw target -> handle, per class, plus one table of
//! readonly views over mutable handles.
//!
//! Entries hold the handle weakly. A live handle keeps its target alive, so
//! a dead handle is the only way an entry goes stale; stale entries are
//! swept in bulk.

use std::collections::HashMap;

use super::handle::{Handle, WeakHandle};
use crate::value::TargetId;

#[derive(Default)]
pub(crate) struct ProxyRegistry {
    reactive: HashMap<TargetId, WeakHandle>,
    readonly: HashMap<TargetId, WeakHandle>,
    views: HashMap<TargetId, WeakHandle>,
    added_since_sweep: usize,
}

impl ProxyRegistry {
    fn table(&self, readonly: bool) -> &HashMap<TargetId, WeakHandle> {
        if readonly {
            &self.readonly
        } else {
            &self.reactive
        }
    }

    /// The live handle of `target` for the given class.
    pub(crate) fn get(&self, target: TargetId, readonly: bool) -> Option<Handle> {
        self.table(readonly).get(&target)?.upgrade()
    }

    pub(crate) fn insert(&mut self, handle: &Handle) {
        let table = if handle.is_readonly() {
            &mut self.readonly
        } else {
            &mut self.reactive
        };
        table.insert(handle.raw().id(), handle.downgrade());
        self.added_since_sweep += 1;
    }

    /// The live readonly view over the mutable handle of `target`.
    pub(crate) fn view(&self, target: TargetId) -> Option<Handle> {
        self.views.get(&target)?.upgrade()
    }

    pub(crate) fn insert_view(&mut self, view: &Handle) {
        self.views.insert(view.raw().id(), view.downgrade());
        self.added_since_sweep += 1;
    }

    pub(crate) fn added_since_sweep(&self) -> usize {
        self.added_since_sweep
    }

    /// Remove entries whose handle was dropped. Returns how many were removed.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.len();
        self.reactive.retain(|_, handle| handle.is_alive());
        self.readonly.retain(|_, handle| handle.is_alive());
        self.views.retain(|_, handle| handle.is_alive());
        self.added_since_sweep = 0;
        before - self.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.reactive.len() + self.readonly.len() + self.views.len()
    }
}
