//! Refract Core
//!
//! A fine-grained reactive dependency-tracking engine. It observes plain
//! data (keyed records and lists) through handles, records which effects
//! read which `(target, key)` pairs, and re-runs exactly the affected
//! effects when that data changes.
//!
//! - Handles in four modes: reactive, shallow reactive, readonly and
//!   shallow readonly
//! - Dependency graph with per-key granularity and list-aware propagation
//! - Effects with lazy creation, custom schedulers and stop
//! - Pausable tracking with correctly nesting pause/resume regions
//!
//! # Architecture
//!
//! - `value`: raw containers, keys and values
//! - `graph`: the `(target, key) -> effects` registry and trigger policy
//! - `reactive`: handles, interceptors, effects and the runtime
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use refract_core::{Object, Runtime};
//!
//! let rt = Runtime::new();
//! let state = rt.reactive(Object::record_from([("count", 0)])).into_handle().unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let (reader, log) = (state.clone(), seen.clone());
//! rt.effect(move || {
//!     let doubled = reader.get("count").as_number().unwrap_or(0.0) * 2.0;
//!     log.borrow_mut().push(doubled);
//! });
//!
//! state.set("count", 5);
//! state.set("count", 5); // unchanged, no re-run
//! assert_eq!(*seen.borrow(), vec![0.0, 10.0]);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use graph::{TrackOpType, TriggerOpType};
pub use reactive::{
    is_proxy, is_reactive, is_readonly, is_shallow, mark_raw, Effect, EffectOptions, EffectRef,
    Handle, Mode, ReactiveContext, Runtime, RuntimeBuilder,
};
pub use value::{has_changed, to_raw, ArrayMethod, Key, Object, ObjectKind, Symbol, Value};
