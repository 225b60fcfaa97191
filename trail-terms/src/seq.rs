//! Sequence view over lists and compact strings.
//!
//! A compact string and a proper list of character codes denote the same
//! term.  Every walk that cares about lists asks a [`Cursor`] for its next
//! element plus remainder, and both representations answer the same way:
//! a list cell yields its head term, a string yields its next character.

use crate::{CellRef, Ctx, Handle, Heap, Store, TermRef};

/// A position in a list-like term.  The wrapped term is always
/// dereferenced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Cursor {
    Term(TermRef),
    Str { cell: CellRef, ctx: Ctx, offset: u32 },
}

/// One element of a sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Elem {
    Code(char),
    /// A list head, not yet dereferenced.
    Term(TermRef),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Step {
    /// An element and the cursor after it.
    Cons(Elem, Cursor),
    /// Not a list cell or non-empty string: the cursor itself.
    End(Cursor),
}

impl Cursor {
    /// Starts a cursor at the dereferenced term `t`.  The empty string
    /// starts as `[]`.
    pub(crate) fn start(heap: &Heap, t: TermRef) -> Self {
        match heap.cell(t.cell).0 {
            Handle::Str(slice) if slice.len == 0 => Cursor::Term(TermRef::new(CellRef::NIL, t.ctx)),
            Handle::Str(_) => Cursor::Str {
                cell: t.cell,
                ctx: t.ctx,
                offset: 0,
            },
            _ => Cursor::Term(t),
        }
    }

    /// Returns `true` if the cursor stands on a list cell or a non-empty
    /// string.
    pub(crate) fn is_cons(&self, heap: &Heap) -> bool {
        match *self {
            Cursor::Term(t) => heap.cell(t.cell).is_list(),
            Cursor::Str { cell, offset, .. } => offset < heap.cell(cell).str_len(),
        }
    }

    /// Identity of the current position, used by cycle detection.
    pub(crate) fn position(&self) -> (CellRef, Ctx, u32) {
        match *self {
            Cursor::Term(t) => (t.cell, t.ctx, 0),
            Cursor::Str { cell, ctx, offset } => (cell, ctx, offset),
        }
    }

    /// Advances one element.
    pub(crate) fn step(&self, heap: &Heap, store: &Store) -> Step {
        match *self {
            Cursor::Term(t) => {
                if !heap.cell(t.cell).is_list() {
                    return Step::End(*self);
                }
                let head = t.cell.offset(1);
                let tail = head.offset(heap.cell(head).size());
                let tail = store.deref(heap, TermRef::new(tail, t.ctx));
                Step::Cons(
                    Elem::Term(TermRef::new(head, t.ctx)),
                    Cursor::start(heap, tail),
                )
            }
            Cursor::Str { cell, ctx, offset } => {
                let Handle::Str(slice) = heap.cell(cell).0 else {
                    return Step::End(*self);
                };
                let text = &heap.slice_text(slice)[offset as usize..];
                let Some(c) = text.chars().next() else {
                    return Step::End(Cursor::Term(TermRef::new(CellRef::NIL, ctx)));
                };
                let offset = offset + c.len_utf8() as u32;
                let next = if offset == slice.len {
                    Cursor::Term(TermRef::new(CellRef::NIL, ctx))
                } else {
                    Cursor::Str { cell, ctx, offset }
                };
                Step::Cons(Elem::Code(c), next)
            }
        }
    }

    /// Turns the cursor back into a term.  A partly consumed string
    /// becomes a new string cell sharing the remaining text.
    pub(crate) fn materialize(&self, heap: &mut Heap) -> TermRef {
        match *self {
            Cursor::Term(t) => t,
            Cursor::Str { cell, ctx, offset: 0 } => TermRef::new(cell, ctx),
            Cursor::Str { cell, ctx, offset } => {
                if offset >= heap.cell(cell).str_len() {
                    TermRef::new(CellRef::NIL, ctx)
                } else {
                    TermRef::new(heap.str_suffix(cell, offset), ctx)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VarId, View};

    fn codes(heap: &Heap, store: &Store, mut cur: Cursor) -> (Vec<char>, Cursor) {
        let mut out = Vec::new();
        loop {
            match cur.step(heap, store) {
                Step::Cons(Elem::Code(c), next) => {
                    out.push(c);
                    cur = next;
                }
                Step::Cons(Elem::Term(t), next) => {
                    let t = store.deref(heap, t);
                    if let View::Int(i) = heap.view(t.cell) {
                        out.push(char::from_u32(i as u32).unwrap());
                    }
                    cur = next;
                }
                Step::End(end) => return (out, end),
            }
        }
    }

    #[test]
    fn string_and_list_walk_alike() {
        let mut heap = Heap::new();
        let mut store = Store::new();
        let ctx = store.push_frame(0);
        let s = heap.str("aé");
        let items = [heap.int('a' as i64), heap.int('é' as i64)];
        let l = heap.list(&items);

        let (a, end_a) = codes(&heap, &store, Cursor::start(&heap, TermRef::new(s, ctx)));
        let (b, end_b) = codes(&heap, &store, Cursor::start(&heap, TermRef::new(l, ctx)));
        assert_eq!(a, vec!['a', 'é']);
        assert_eq!(a, b);
        // the string ends on the shared nil, the list on its own tail cell
        assert_eq!(end_a.position().0, CellRef::NIL);
        assert!(matches!(heap.view(end_b.position().0), View::Atom("[]")));
    }

    #[test]
    fn empty_string_is_nil() {
        let mut heap = Heap::new();
        let mut store = Store::new();
        let ctx = store.push_frame(0);
        let s = heap.str("");
        let cur = Cursor::start(&heap, TermRef::new(s, ctx));
        assert_eq!(cur, Cursor::Term(TermRef::new(CellRef::NIL, ctx)));
        assert!(!cur.is_cons(&heap));
    }

    #[test]
    fn partial_list_ends_on_variable() {
        let mut heap = Heap::new();
        let mut store = Store::new();
        let ctx = store.push_frame(1);
        let tail = heap.var(VarId(0));
        let one = heap.int(49);
        let l = heap.list_with_tail(&[one], tail);
        let (seen, end) = codes(&heap, &store, Cursor::start(&heap, TermRef::new(l, ctx)));
        assert_eq!(seen, vec!['1']);
        assert!(matches!(end, Cursor::Term(t) if heap.cell(t.cell).is_var()));
    }

    #[test]
    fn materialize_rest_of_string() {
        let mut heap = Heap::new();
        let mut store = Store::new();
        let ctx = store.push_frame(0);
        let s = heap.str("abc");
        let cur = Cursor::start(&heap, TermRef::new(s, ctx));
        let Step::Cons(_, rest) = cur.step(&heap, &store) else {
            panic!("expected element");
        };
        let t = rest.materialize(&mut heap);
        assert!(matches!(heap.view(t.cell), View::Str("bc")));
        assert_eq!(cur.materialize(&mut heap), TermRef::new(s, ctx));
    }
}
