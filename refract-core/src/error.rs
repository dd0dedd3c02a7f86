//! Error types.

use thiserror::Error;

use crate::value::Key;

/// Errors surfaced by list methods and value conversion.
///
/// Mutations through a readonly handle are not errors: they are reported as
/// a warning and otherwise ignored.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown list method `{0}`")]
    UnknownMethod(String),

    #[error("`{method}` called on a {kind}, expected a list")]
    NotAList {
        method: &'static str,
        kind: &'static str,
    },

    #[error("cannot assign to key `{0}`: target rejected the write")]
    WriteRejected(Key),

    #[error("cannot delete key `{0}`: target rejected the deletion")]
    DeleteRejected(Key),

    #[error("cannot serialize non-finite number {0}")]
    NonFiniteNumber(f64),

    #[error("cannot serialize a cyclic value")]
    CyclicValue,

    #[error("cannot serialize a {0} container")]
    Unserializable(&'static str),

    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
