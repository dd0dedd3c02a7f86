//! Dependency Graph
//!
//! The bipartite graph between observed `(target, key)` pairs and the
//! effects that read them.
//!
//! # Overview
//!
//! - [`TargetMap`] maps a raw target (held weakly) to its keys, and each key
//!   to a [`Dep`]: the insertion-ordered set of subscribed effects.
//! - Deps live in a generational arena. Effects keep [`DepId`] tickets for
//!   every dep they joined, so unsubscribing an effect touches only its own
//!   deps instead of scanning the graph.
//! - [`TargetMap::collect`] implements the key-selection policy of a
//!   mutation: which deps a write to `(target, key)` must notify.
//!
//! # Design Decisions
//!
//! 1. Edges are rebuilt on every effect run. The graph never tries to diff
//!    old and new dependencies; the effect leaves every dep it joined and
//!    re-joins whatever it reads.
//!
//! 2. Targets are held weakly. Entries for dropped targets are swept in
//!    bulk rather than on drop, because a raw object does not know which
//!    runtimes observe it.

mod dep;
mod target_map;

use std::fmt;

pub use dep::{Dep, DepArena, DepId};
pub use target_map::TargetMap;

/// Why a dependency was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackOpType {
    Get,
    Has,
    Iterate,
}

/// What kind of mutation is being propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerOpType {
    Set,
    Add,
    Delete,
}

impl fmt::Display for TrackOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrackOpType::Get => "get",
            TrackOpType::Has => "has",
            TrackOpType::Iterate => "iterate",
        })
    }
}

impl fmt::Display for TriggerOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerOpType::Set => "set",
            TriggerOpType::Add => "add",
            TriggerOpType::Delete => "delete",
        })
    }
}
