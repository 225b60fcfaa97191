//! # Trail Terms
//!
//! Prolog terms stored as flat cell arrays, with the core operations a
//! Prolog engine builds on: unification, cycle detection, the standard
//! order of terms, and a reversible binding trail.
//!
//! A term lives in a [`Heap`] as a prefix array of 16-byte [`Cell`]s.  It
//! is always read together with the context ([`Ctx`]) of the frame its
//! variables belong to; the pair is a [`TermRef`].  A [`Query`] owns the
//! heap, the binding [`Store`] with its trail, and the soft flags that
//! walks report through: every recursive walk is bounded by
//! [`QueryConfig::max_depth`], and running into the bound sets
//! [`Query::cycle_error`] instead of overflowing the stack.
//!
//! ## Example
//! ```rust
//! # use trail_terms::{Comparison, Query, View};
//! let mut q = Query::new();
//!
//! // X = f(X, a), a cyclic term
//! let x = q.fresh_var();
//! let a = q.heap_mut().atom("a");
//! let f = q.heap_mut().func("f", &[x.cell, a]);
//! assert!(q.unify(x, q.at(f)));
//! assert!(q.is_cyclic_term(x));
//!
//! // standard order: numbers before atoms before compounds
//! let one = q.heap_mut().int(1);
//! assert_eq!(q.compare(q.at(one), q.at(a)), Comparison::Less);
//!
//! // undo everything on backtracking
//! let y = q.fresh_var();
//! let cp = q.choice_point();
//! assert!(q.unify(y, q.at(one)));
//! assert!(matches!(q.heap().view(q.deref(y).cell), View::Int(1)));
//! q.backtrack(&cp).unwrap();
//! assert_eq!(q.deref(y), y);
//! ```
//!
//! ## License
//!
//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0 or
//! (at your option) any later version (LGPL-3.0-or-later).

pub mod builtins;
mod cell;
mod compare;
mod cycle;
mod dedup;
mod display;
mod error;
mod heap;
mod hook;
mod number;
mod query;
mod seq;
mod store;
mod unify;
mod vars;
mod view;

pub use builtins::Builtin;
pub(crate) use cell::{Handle, Name, Slice};
pub use cell::{AtomId, Cell, CellRef, Ctx, Tag, TermRef, VarId, VarKey};
pub use compare::Comparison;
pub use cycle::{CycleScan, Cyclicity, ListCycle};
pub use dedup::ResultLog;
pub use display::{TermDisplay, DISPLAY_DEPTH};
pub use error::QueryError;
pub use heap::{EpochID, Heap, HeapStats, TermBuilder};
pub use hook::Procedures;
pub(crate) use query::RefTracking;
pub use query::{ChoicePoint, InterruptHandle, Query, QueryConfig};
pub use store::{Slot, Snapshot, Store, TrailEntry};
pub use vars::VarUse;
pub use view::{Args, View};

/// Default recursion bound of unify, compare and the cycle walks.
pub const MAX_DEPTH: usize = 4096;
