//! Defines [`View`], a borrowed read-only decoding of one heap cell.
//!
//! A view does not follow variable bindings; it shows the cell exactly
//! as stored.  Use the binding store to dereference first.

use crate::{CellRef, Handle, Heap, VarId};
use core::fmt;
use num_bigint::BigInt;

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Var(id, name) => f.debug_tuple("Var").field(&id.0).field(name).finish(),
            View::Atom(a) => f.debug_tuple("Atom").field(a).finish(),
            View::Int(i) => f.debug_tuple("Int").field(i).finish(),
            View::BigInt(b) => f.debug_tuple("BigInt").field(b).finish(),
            View::Real(r) => f.debug_tuple("Real").field(r).finish(),
            View::Str(s) => f.debug_tuple("Str").field(s).finish(),
            View::Func(name, args) => f
                .debug_tuple("Func")
                .field(name)
                .field(
                    &args
                        .clone()
                        .map(|a| args.heap.map(|h| h.view(a)))
                        .collect::<Vec<_>>(),
                )
                .finish(),
        }
    }
}

/// A borrowed view of one cell of a [`Heap`].
///
/// Use [`Heap::view`] to obtain a view.  Names, text, and big integers
/// are borrowed from the heap pools; no allocation is performed.
#[derive(Clone)]
pub enum View<'a> {
    /// A variable: its number and display name (`_` when anonymous).
    Var(VarId, &'a str),
    /// An atom name, whichever way it is stored.
    Atom(&'a str),
    /// A machine integer.
    Int(i64),
    /// An arbitrary-precision integer.
    BigInt(&'a BigInt),
    /// A floating point value.
    Real(f64),
    /// A compact string.
    Str(&'a str),
    /// A compound term: functor name and an iterator over the argument
    /// cells.
    Func(&'a str, Args<'a>),
}

/// Iterator over the argument cells of a compound term.
///
/// Arguments are contiguous after the head, so advancing skips the
/// subtree size of the current argument.
#[derive(Clone)]
pub struct Args<'a> {
    heap: Option<&'a Heap>,
    next: CellRef,
    remaining: u32,
}

impl<'a> Args<'a> {
    pub(crate) fn new(heap: &'a Heap, head: CellRef) -> Self {
        Self {
            heap: Some(heap),
            next: head.offset(1),
            remaining: heap.cell(head).arity(),
        }
    }

    fn empty() -> Self {
        Self {
            heap: None,
            next: CellRef::NIL,
            remaining: 0,
        }
    }
}

impl Iterator for Args<'_> {
    type Item = CellRef;

    fn next(&mut self) -> Option<CellRef> {
        let heap = self.heap?;
        if self.remaining == 0 {
            return None;
        }
        let arg = self.next;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.next = arg.offset(heap.cell(arg).size());
        }
        Some(arg)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for Args<'_> {}

impl<'a> View<'a> {
    pub(crate) fn of(heap: &'a Heap, r: CellRef) -> Self {
        match heap.cell(r).0 {
            Handle::Var { id, name } => View::Var(id, heap.atom_name(name)),
            Handle::Atom(name) => View::Atom(heap.name_text(name)),
            Handle::Func { name, .. } => View::Func(heap.atom_name(name), Args::new(heap, r)),
            Handle::Int(i) => View::Int(i),
            Handle::BigInt(index) => View::BigInt(heap.bigint_at(index)),
            Handle::Real(f) => View::Real(f),
            Handle::Str(slice) => View::Str(heap.slice_text(slice)),
        }
    }

    /// Returns the argument iterator of a compound view, or an empty
    /// iterator for any other view.
    pub fn args(&self) -> Args<'a> {
        match self {
            View::Func(_, args) => args.clone(),
            _ => Args::empty(),
        }
    }

    /// Returns the functor name and arity of a compound view, or the
    /// atom name with arity 0.
    pub fn name_arity(&self) -> Option<(&'a str, usize)> {
        match self {
            View::Atom(name) => Some((*name, 0)),
            View::Func(name, args) => Some((*name, args.len())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_of_leaves() {
        let mut heap = Heap::new();
        let v = heap.named_var(VarId(2), "X");
        let i = heap.int(-3);
        let b = heap.bigint(BigInt::from(10).pow(30));
        let r = heap.real(0.5);
        let s = heap.str("héllo");

        assert!(matches!(heap.view(v), View::Var(VarId(2), "X")));
        assert!(matches!(heap.view(i), View::Int(-3)));
        assert!(matches!(heap.view(b), View::BigInt(n) if *n == BigInt::from(10).pow(30)));
        assert!(matches!(heap.view(r), View::Real(x) if x == 0.5));
        assert!(matches!(heap.view(s), View::Str("héllo")));
        assert_eq!(heap.view(i).args().count(), 0);
    }

    #[test]
    fn args_skip_nested_subtrees() {
        let mut heap = Heap::new();
        let x = heap.int(1);
        let y = heap.int(2);
        let inner = heap.func("g", &[x, y]);
        let deeper = heap.func("h", &[inner]);
        let z = heap.atom("z");
        let f = heap.func("f", &[deeper, z, inner]);

        let view = heap.view(f);
        assert_eq!(view.name_arity(), Some(("f", 3)));
        let args: Vec<_> = view.args().collect();
        assert_eq!(args.len(), 3);
        assert_eq!(args[1].index() - args[0].index(), 4);
        assert!(matches!(heap.view(args[1]), View::Atom("z")));
        assert_eq!(heap.view(args[2]).name_arity(), Some(("g", 2)));
    }

    #[test]
    fn debug_shows_nested_args() {
        let mut heap = Heap::new();
        let a = heap.atom("a");
        let f = heap.func("f", &[a]);
        let text = format!("{:?}", heap.view(f));
        assert!(text.contains("\"f\""));
        assert!(text.contains("Atom(\"a\")"));
    }
}
