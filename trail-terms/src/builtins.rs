//! Builtin predicates over unification, standard order, cycle detection
//! and the hook trail.
//!
//! Each builtin takes its arguments as [`TermRef`]s and reports success,
//! failure or a catchable [`QueryError`].  Comparisons that the depth
//! bound leaves undecided follow a per-predicate policy: `==` succeeds,
//! while `\==`, the ordering tests and `compare/3` fail.

use crate::error::missing_procedure;
use crate::{Comparison, Cyclicity, Handle, Query, QueryError, TermRef};
use core::fmt;

/// Identifies one builtin predicate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Builtin {
    Unify,
    Identical,
    NotIdentical,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Compare,
    CyclicTerm,
    AcyclicTerm,
    SkipMaxList,
    UndoTrail,
    RedoTrail,
    EndHook,
}

const BUILTINS: &[(&str, usize, Builtin)] = &[
    ("=", 2, Builtin::Unify),
    ("==", 2, Builtin::Identical),
    ("\\==", 2, Builtin::NotIdentical),
    ("@<", 2, Builtin::Less),
    ("@=<", 2, Builtin::LessOrEqual),
    ("@>", 2, Builtin::Greater),
    ("@>=", 2, Builtin::GreaterOrEqual),
    ("compare", 3, Builtin::Compare),
    ("cyclic_term", 1, Builtin::CyclicTerm),
    ("acyclic_term", 1, Builtin::AcyclicTerm),
    ("$skip_max_list", 4, Builtin::SkipMaxList),
    ("$undo_trail", 1, Builtin::UndoTrail),
    ("$redo_trail", 0, Builtin::RedoTrail),
    ("$end_hook", 0, Builtin::EndHook),
];

impl Builtin {
    /// Finds the builtin `name/arity`.
    pub fn lookup(name: &str, arity: usize) -> Option<Self> {
        BUILTINS
            .iter()
            .find(|(n, a, _)| *n == name && *a == arity)
            .map(|&(_, _, b)| b)
    }

    /// Returns the predicate indicator of this builtin.
    pub fn indicator(self) -> (&'static str, usize) {
        // the table lists builtins in declaration order
        let (name, arity, _) = BUILTINS[self as usize];
        (name, arity)
    }

    /// Iterates every builtin in table order.
    pub fn all() -> impl Iterator<Item = Builtin> {
        BUILTINS.iter().map(|&(_, _, b)| b)
    }

    /// Runs this builtin on `args`.
    ///
    /// Fails with `existence_error(procedure, Name/N)` when `args` does
    /// not have the builtin's arity.
    pub fn call(self, q: &mut Query, args: &[TermRef]) -> Result<bool, QueryError> {
        let (name, arity) = self.indicator();
        if args.len() != arity {
            return Err(missing_procedure(name, args.len()));
        }
        match self {
            Builtin::Unify => q.unify_episode(args[0], args[1]),
            Builtin::Identical => Ok(matches!(
                q.compare(args[0], args[1]),
                Comparison::Equal | Comparison::Undecidable
            )),
            Builtin::NotIdentical => Ok(matches!(
                q.compare(args[0], args[1]),
                Comparison::Less | Comparison::Greater
            )),
            Builtin::Less => Ok(q.compare(args[0], args[1]) == Comparison::Less),
            Builtin::LessOrEqual => Ok(matches!(
                q.compare(args[0], args[1]),
                Comparison::Less | Comparison::Equal
            )),
            Builtin::Greater => Ok(q.compare(args[0], args[1]) == Comparison::Greater),
            Builtin::GreaterOrEqual => Ok(matches!(
                q.compare(args[0], args[1]),
                Comparison::Greater | Comparison::Equal
            )),
            Builtin::Compare => compare3(q, args[0], args[1], args[2]),
            Builtin::CyclicTerm => Ok(q.is_cyclic_term(args[0])),
            Builtin::AcyclicTerm => Ok(q.check_cyclic(args[0]) == Cyclicity::Acyclic),
            Builtin::SkipMaxList => skip_max_list(q, args[0], args[1], args[2], args[3]),
            Builtin::UndoTrail => {
                let list = q.undo_trail()?;
                Ok(q.unify(args[0], list))
            }
            Builtin::RedoTrail => Ok(q.redo_trail()),
            Builtin::EndHook => {
                q.end_hook();
                Ok(true)
            }
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, arity) = self.indicator();
        write!(f, "{name}/{arity}")
    }
}

/// Calls the builtin `name` with `args`.
///
/// Fails with `existence_error(procedure, Name/Arity)` when there is no
/// such builtin.
pub fn call(q: &mut Query, name: &str, args: &[TermRef]) -> Result<bool, QueryError> {
    match Builtin::lookup(name, args.len()) {
        Some(builtin) => builtin.call(q, args),
        None => Err(missing_procedure(name, args.len())),
    }
}

/// `compare(Order, A, B)`.  `Order` must be unbound or an atom.
fn compare3(q: &mut Query, order: TermRef, a: TermRef, b: TermRef) -> Result<bool, QueryError> {
    let order = q.deref(order);
    let cell = q.heap.cell(order.cell);
    if !cell.is_var() && !cell.is_atom() {
        return Err(QueryError::Type {
            expected: "atom",
            found: cell.kind_name(),
        });
    }
    let name = match q.compare(a, b) {
        Comparison::Less => "<",
        Comparison::Equal => "=",
        Comparison::Greater => ">",
        Comparison::Undecidable => return Ok(false),
    };
    let result = q.heap.atom(name);
    let result = q.at(result);
    Ok(q.unify(order, result))
}

/// `'$skip_max_list'(Skipped, Max, List, Rest)`: skips at most `Max`
/// elements of `List`, a negative `Max` meaning no bound, and unifies
/// `Skipped` with the count and `Rest` with the tail reached.
fn skip_max_list(
    q: &mut Query,
    skipped: TermRef,
    max: TermRef,
    list: TermRef,
    rest: TermRef,
) -> Result<bool, QueryError> {
    let max = q.deref(max);
    let max = match q.heap.cell(max.cell).0 {
        Handle::Int(n) => usize::try_from(n).ok(),
        // too large to bound any list
        Handle::BigInt(_) => None,
        Handle::Var { .. } => return Err(QueryError::Instantiation),
        _ => {
            return Err(QueryError::Type {
                expected: "integer",
                found: q.heap.cell(max.cell).kind_name(),
            });
        }
    };

    let scan = q.detect_cycle(list, max);
    let count = q.heap.int(scan.count as i64);
    let count = q.at(count);
    Ok(q.unify(skipped, count) && q.unify(rest, scan.stop))
}
