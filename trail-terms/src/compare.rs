//! Standard order of terms.
//!
//! Variables come first, ordered by slot, then numbers, atoms and
//! compound terms.  Every integer, machine or big, sorts after every
//! real, whatever the values; within integers and within reals the
//! value decides.  Compounds compare by arity, then name, then
//! arguments left to right.  Lists and non-empty strings are the same
//! `'.'/2` terms and are walked element by element.
//!
//! The walk keeps its pending pairs on a heap-allocated stack, so only
//! the depth bound limits how deep a term can be compared.

use crate::number::Num;
use crate::seq::{Cursor, Elem, Step};
use crate::{AtomId, Cell, CellRef, Handle, Query, TermRef, VarKey};
use core::cmp::Ordering;

/// Outcome of [`Query::compare`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Comparison {
    Less,
    Equal,
    Greater,
    /// The walk reached the depth bound or was interrupted, so no order
    /// was decided.
    Undecidable,
}

impl Comparison {
    pub fn ordering(self) -> Option<Ordering> {
        match self {
            Comparison::Less => Some(Ordering::Less),
            Comparison::Equal => Some(Ordering::Equal),
            Comparison::Greater => Some(Ordering::Greater),
            Comparison::Undecidable => None,
        }
    }
}

impl From<Ordering> for Comparison {
    fn from(ord: Ordering) -> Self {
        match ord {
            Ordering::Less => Comparison::Less,
            Ordering::Equal => Comparison::Equal,
            Ordering::Greater => Comparison::Greater,
        }
    }
}

/// Why a comparison walk stopped early.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Halt {
    Depth,
    Interrupted,
}

type Cmp = Result<Ordering, Halt>;

/// Pending work of a comparison walk.
#[derive(Debug, Clone, Copy)]
enum Task {
    Pair { a: TermRef, b: TermRef, depth: usize },
    /// The remaining `left` arguments of two compounds of equal shape.
    Args {
        a: TermRef,
        b: TermRef,
        left: u32,
        depth: usize,
    },
    /// An element-by-element list walk, started at `base`.
    Seq {
        a: Cursor,
        b: Cursor,
        depth: usize,
        base: usize,
    },
}

/// Rank of a term class in standard order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Var,
    Number,
    Atom,
    Compound,
}

fn rank(cell: Cell) -> Rank {
    match cell.0 {
        Handle::Var { .. } => Rank::Var,
        Handle::Int(_) | Handle::BigInt(_) | Handle::Real(_) => Rank::Number,
        Handle::Atom(_) => Rank::Atom,
        // Settled strings are never empty.
        Handle::Func { .. } | Handle::Str(_) => Rank::Compound,
    }
}

impl Query {
    /// Compares `a` and `b` in standard order.
    ///
    /// Returns [`Comparison::Undecidable`] and sets `cycle_error` when
    /// the depth bound was reached, or records [`Query::interrupted`]
    /// when the interrupt flag stopped the walk.
    pub fn compare(&mut self, a: TermRef, b: TermRef) -> Comparison {
        self.cycle_error = false;
        match self.cmp_walk(a, b) {
            Ok(ord) => ord.into(),
            Err(Halt::Depth) => {
                self.depth_exceeded();
                Comparison::Undecidable
            }
            Err(Halt::Interrupted) => {
                self.poll_interrupt();
                Comparison::Undecidable
            }
        }
    }

    fn settled(&self, t: TermRef) -> TermRef {
        let t = self.deref(t);
        let cell = self.heap.cell(t.cell);
        if cell.is_string() && cell.str_len() == 0 {
            TermRef::new(CellRef::NIL, t.ctx)
        } else {
            t
        }
    }

    /// Compares on an explicit work stack.  Pending pairs are taken in
    /// the order a left-to-right recursive walk would meet them, so the
    /// first pair that is not equal decides.
    fn cmp_walk(&self, a: TermRef, b: TermRef) -> Cmp {
        let mut todo = vec![Task::Pair { a, b, depth: 0 }];
        while let Some(task) = todo.pop() {
            let ord = match task {
                Task::Pair { a, b, depth } => self.cmp_pair(a, b, depth, &mut todo)?,
                Task::Args {
                    a,
                    b,
                    left,
                    depth,
                } => self.cmp_args(a, b, left, depth, &mut todo)?,
                Task::Seq { a, b, depth, base } => self.cmp_seq(a, b, depth, base, &mut todo)?,
            };
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(Ordering::Equal)
    }

    /// Orders the top cells of `a` and `b`.  When they tie and have
    /// arguments, the arguments are pushed and `Equal` is returned.
    fn cmp_pair(&self, a: TermRef, b: TermRef, depth: usize, todo: &mut Vec<Task>) -> Cmp {
        if depth >= self.config.max_depth {
            return Err(Halt::Depth);
        }
        let a = self.settled(a);
        let b = self.settled(b);
        if a == b {
            return Ok(Ordering::Equal);
        }
        let ca = self.heap.cell(a.cell);
        let cb = self.heap.cell(b.cell);
        let (ra, rb) = (rank(ca), rank(cb));
        if ra != rb {
            return Ok(ra.cmp(&rb));
        }

        match ra {
            Rank::Var => {
                let ka = self.var_slot(a, ca);
                let kb = self.var_slot(b, cb);
                Ok(ka.cmp(&kb))
            }
            Rank::Number => Ok(self.cmp_numbers(ca, cb)),
            Rank::Atom => {
                let (Handle::Atom(na), Handle::Atom(nb)) = (ca.0, cb.0) else {
                    unreachable!("atom rank without atom cells");
                };
                Ok(self
                    .heap
                    .name_text(na)
                    .as_bytes()
                    .cmp(self.heap.name_text(nb).as_bytes()))
            }
            Rank::Compound => {
                let la = ca.is_list() || ca.is_string();
                let lb = cb.is_list() || cb.is_string();
                if la && lb {
                    todo.push(Task::Seq {
                        a: Cursor::start(&self.heap, a),
                        b: Cursor::start(&self.heap, b),
                        depth: depth + 1,
                        base: depth + 1,
                    });
                    return Ok(Ordering::Equal);
                }
                let (aa, na) = self.compound_shape(ca);
                let (ab, nb) = self.compound_shape(cb);
                let ord = aa.cmp(&ab).then_with(|| {
                    self.heap
                        .atom_name(na)
                        .as_bytes()
                        .cmp(self.heap.atom_name(nb).as_bytes())
                });
                if ord == Ordering::Equal {
                    todo.push(Task::Args {
                        a: TermRef::new(a.cell.offset(1), a.ctx),
                        b: TermRef::new(b.cell.offset(1), b.ctx),
                        left: aa,
                        depth: depth + 1,
                    });
                }
                Ok(ord)
            }
        }
    }

    fn var_slot(&self, t: TermRef, cell: Cell) -> usize {
        match cell.var_id() {
            Some(id) => self.store.slot_index(VarKey { ctx: t.ctx, id }),
            None => unreachable!("var rank without var cell"),
        }
    }

    /// Arity and name; a string is a `'.'/2` term.
    fn compound_shape(&self, cell: Cell) -> (u32, AtomId) {
        match cell.0 {
            Handle::Func { name, arity, .. } => (arity, name),
            _ => (2, AtomId::DOT),
        }
    }

    fn cmp_numbers(&self, ca: Cell, cb: Cell) -> Ordering {
        let (Some(x), Some(y)) = (Num::of(&self.heap, ca), Num::of(&self.heap, cb)) else {
            unreachable!("number rank without number cells");
        };
        match (x, y) {
            (Num::Real(p), Num::Real(q)) => p.partial_cmp(&q).unwrap_or_else(|| p.total_cmp(&q)),
            (Num::Real(_), _) => Ordering::Less,
            (_, Num::Real(_)) => Ordering::Greater,
            _ => x.value_cmp(&y).unwrap_or(Ordering::Equal),
        }
    }

    /// Schedules the next argument pair; `a` and `b` are the first
    /// argument cells not yet compared.
    fn cmp_args(
        &self,
        a: TermRef,
        b: TermRef,
        left: u32,
        depth: usize,
        todo: &mut Vec<Task>,
    ) -> Cmp {
        if left == 0 {
            return Ok(Ordering::Equal);
        }
        if self.interrupt.is_set() {
            return Err(Halt::Interrupted);
        }
        if left > 1 {
            let na = a.cell.offset(self.heap.cell(a.cell).size());
            let nb = b.cell.offset(self.heap.cell(b.cell).size());
            todo.push(Task::Args {
                a: TermRef::new(na, a.ctx),
                b: TermRef::new(nb, b.ctx),
                left: left - 1,
                depth,
            });
        }
        todo.push(Task::Pair { a, b, depth });
        Ok(Ordering::Equal)
    }

    /// Walks two list-like terms element by element.  Each element costs
    /// one unit of depth so cyclic lists end in [`Halt::Depth`].  A pair
    /// of element terms is scheduled ahead of the rest of the walk.
    fn cmp_seq(
        &self,
        mut ca: Cursor,
        mut cb: Cursor,
        mut d: usize,
        base: usize,
        todo: &mut Vec<Task>,
    ) -> Cmp {
        while ca.is_cons(&self.heap) && cb.is_cons(&self.heap) {
            if self.interrupt.is_set() {
                return Err(Halt::Interrupted);
            }
            if d >= self.config.max_depth {
                return Err(Halt::Depth);
            }
            let (Step::Cons(ea, na), Step::Cons(eb, nb)) = (
                ca.step(&self.heap, &self.store),
                cb.step(&self.heap, &self.store),
            ) else {
                break;
            };
            let ord = match (ea, eb) {
                (Elem::Code(x), Elem::Code(y)) => x.cmp(&y),
                (Elem::Code(c), Elem::Term(t)) => self.cmp_code(c, t),
                (Elem::Term(t), Elem::Code(c)) => self.cmp_code(c, t).reverse(),
                (Elem::Term(x), Elem::Term(y)) => {
                    todo.push(Task::Seq {
                        a: na,
                        b: nb,
                        depth: d + 1,
                        base,
                    });
                    todo.push(Task::Pair {
                        a: x,
                        b: y,
                        depth: d + 1,
                    });
                    return Ok(Ordering::Equal);
                }
            };
            if ord != Ordering::Equal {
                return Ok(ord);
            }
            ca = na;
            cb = nb;
            d += 1;
        }

        match (ca, cb) {
            (Cursor::Term(x), Cursor::Term(y)) => {
                todo.push(Task::Pair {
                    a: x,
                    b: y,
                    depth: base + 1,
                });
                Ok(Ordering::Equal)
            }
            (Cursor::Str { .. }, Cursor::Term(y)) => Ok(self.cmp_cons_with(y)),
            (Cursor::Term(x), Cursor::Str { .. }) => Ok(self.cmp_cons_with(x).reverse()),
            (Cursor::Str { .. }, Cursor::Str { .. }) => Ok(Ordering::Equal),
        }
    }

    /// Orders a character code against the list element `t`.
    fn cmp_code(&self, c: char, t: TermRef) -> Ordering {
        let t = self.settled(t);
        let cell = self.heap.cell(t.cell);
        match rank(cell) {
            Rank::Number => {
                let code = Num::Int(c as i64);
                match Num::of(&self.heap, cell) {
                    Some(Num::Real(_)) => Ordering::Greater,
                    Some(n) => code.value_cmp(&n).unwrap_or(Ordering::Equal),
                    None => Ordering::Less,
                }
            }
            r => Rank::Number.cmp(&r),
        }
    }

    /// Orders the rest of a string, a non-empty `'.'/2` term, against the
    /// settled non-list term `t`.
    fn cmp_cons_with(&self, t: TermRef) -> Ordering {
        let t = self.settled(t);
        let cell = self.heap.cell(t.cell);
        match rank(cell) {
            Rank::Compound => {
                let (arity, name) = self.compound_shape(cell);
                2u32.cmp(&arity)
                    .then_with(|| ".".as_bytes().cmp(self.heap.atom_name(name).as_bytes()))
            }
            _ => Ordering::Greater,
        }
    }
}
