//! Defines [`QueryError`], the unified error type for query operations.
//!
//! Errors here are the catchable ones: the surrounding engine turns
//! them into Prolog exceptions with [`QueryError::formal_term`].  Plain
//! unification or comparison failure is never an error, and depth or
//! cycle trouble is reported through the query's `cycle_error` flag.

use crate::{CellRef, EpochID, Heap};
use smartstring::alias::String;
use thiserror::Error;

/// Represents all errors raised by the query core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// A required object does not exist, e.g. the
    /// `post_unify_hook/0` procedure.
    #[error("existence error: {kind} {culprit}")]
    Existence { kind: &'static str, culprit: String },

    /// An allocation needed by the operation failed.
    #[error("resource error: {0}")]
    Resource(&'static str),

    /// A builtin received an argument of the wrong kind.
    #[error("type error: expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },

    /// An argument was unbound where a value is required.
    #[error("instantiation error")]
    Instantiation,

    /// A term builder finished with a head still open.
    #[error("incomplete term")]
    IncompleteTerm,

    /// The heap mark is no longer alive.
    #[error("invalid epoch {0:?}")]
    InvalidEpoch(EpochID),
}

impl QueryError {
    /// Builds the ISO formal error term for this error on `heap`, e.g.
    /// `existence_error(procedure, post_unify_hook/0)`.
    ///
    /// The culprit of an existence error is written `Name/Arity` when it
    /// has that shape and as an atom otherwise.
    pub fn formal_term(&self, heap: &mut Heap) -> CellRef {
        match self {
            QueryError::Existence { kind, culprit } => {
                let kind = heap.atom(kind);
                let culprit = match culprit.rsplit_once('/') {
                    Some((name, arity)) => match arity.parse::<i64>() {
                        Ok(arity) => {
                            let name = heap.atom(name);
                            let arity = heap.int(arity);
                            heap.func("/", &[name, arity])
                        }
                        Err(_) => heap.atom(culprit),
                    },
                    None => heap.atom(culprit),
                };
                heap.func("existence_error", &[kind, culprit])
            }
            QueryError::Resource(what) => {
                let what = heap.atom(what);
                heap.func("resource_error", &[what])
            }
            QueryError::Type { expected, found } => {
                let expected = heap.atom(expected);
                let found = heap.atom(found);
                heap.func("type_error", &[expected, found])
            }
            QueryError::Instantiation => heap.atom("instantiation_error"),
            QueryError::IncompleteTerm => {
                let what = heap.atom("incomplete_term");
                heap.func("system_error", &[what])
            }
            QueryError::InvalidEpoch(_) => {
                let what = heap.atom("heap_mark");
                heap.func("system_error", &[what])
            }
        }
    }
}

/// Name of the procedure armed after an episode binds an attributed
/// variable.
pub(crate) const POST_UNIFY_HOOK: (&str, usize) = ("post_unify_hook", 0);

pub(crate) fn missing_procedure(name: &str, arity: usize) -> QueryError {
    let mut culprit = String::from(name);
    culprit.push('/');
    culprit.push_str(&arity.to_string());
    QueryError::Existence {
        kind: "procedure",
        culprit,
    }
}
