//! Subscriber types for the reactive system.
//!
//! A Subscriber is any computation that can sit in a dependency set: today
//! that is an [`Effect`](super::Effect), but computed values and watchers
//! built on top of the engine plug in through the same trait.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::Scheduler;
use crate::graph::DepId;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. Dependency sets key on it
/// so a subscriber joins a set at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Next id from a process-wide counter.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that dependency sets can hold and triggers can re-run.
pub trait Subscriber {
    fn id(&self) -> SubscriberId;

    /// `false` once stopped; stopped subscribers are never re-run by a trigger.
    fn is_active(&self) -> bool;

    /// Callback that takes over re-execution, if any.
    fn scheduler(&self) -> Option<Scheduler>;

    /// Run the computation, discarding its result.
    fn run_erased(self: Rc<Self>);

    /// Remember that this subscriber joined `dep`, so cleanup can leave it.
    fn record_dependency(&self, dep: DepId);

    /// Leave every dep and deactivate.
    fn stop(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_issued_in_creation_order() {
        let ids: Vec<SubscriberId> = (0..4).map(|_| SubscriberId::new()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
