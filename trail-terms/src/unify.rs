//! Unification of two terms under the query's binding store.
//!
//! The walk is bounded by [`QueryConfig::max_depth`](crate::QueryConfig).
//! Reaching the bound stops the walk, sets the query's `cycle_error`
//! flag and reports success: a caller that needs an exact answer must
//! check [`Query::cycle_error`] afterwards.  Pending pairs are kept on
//! a heap-allocated work stack, so the native stack stays flat however
//! deep the terms are.  Bindings made before a
//! failure stay in place; take a [`ChoicePoint`](crate::ChoicePoint) to
//! roll them back.

use crate::number::Num;
use crate::seq::{Cursor, Elem, Step};
use crate::{CellRef, Handle, Query, QueryError, RefTracking, Store, TermRef, VarKey};

/// Pending work of a unification walk.
#[derive(Debug, Clone, Copy)]
enum Task {
    /// Two terms at nesting `depth`.
    Pair { a: TermRef, b: TermRef, depth: usize },
    /// The remaining `left` arguments of two compounds, from the
    /// argument cells `a` and `b`.
    Args {
        a: TermRef,
        b: TermRef,
        left: u32,
        depth: usize,
    },
    /// A lockstep list walk at element depth `depth`, started at `base`.
    Seq {
        a: Cursor,
        b: Cursor,
        depth: usize,
        base: usize,
    },
    /// Drops the tracked path entries pushed for a finished argument.
    Unwind { left: usize, right: usize },
}

impl Query {
    /// Unifies `a` with `b`.
    ///
    /// Returns `false` on mismatch, or if the interrupt flag stopped the
    /// walk (see [`Query::interrupted`]).
    pub fn unify(&mut self, a: TermRef, b: TermRef) -> bool {
        self.cycle_error = false;
        self.unify_at(a, b, 0)
    }

    /// Unifies `a` with `b` as one episode: if an attributed variable was
    /// bound, the `post_unify_hook/0` goal is armed over the episode's
    /// bindings.
    ///
    /// Fails with an existence error when the hook is needed but not
    /// defined.
    pub fn unify_episode(&mut self, a: TermRef, b: TermRef) -> Result<bool, QueryError> {
        self.save_tp = self.store.trail_mark();
        let ok = self.unify(a, b);
        if ok && self.has_attrs && !self.in_hook {
            self.arm_post_unify_hook()?;
        }
        Ok(ok)
    }

    /// Unifies `a` with `b` while tracking the variables on the path
    /// currently being walked on each side.  A variable met again on its
    /// own side's path is taken as matched instead of being followed,
    /// which keeps walks over cyclic attribute terms finite.
    pub fn unify_tracked(&mut self, a: TermRef, b: TermRef) -> bool {
        let outer = self.tracking.replace(RefTracking::default());
        let ok = self.unify(a, b);
        self.tracking = outer;
        ok
    }

    pub(crate) fn depth_exceeded(&mut self) {
        if !self.cycle_error {
            log::debug!("depth bound {} reached", self.config.max_depth);
        }
        self.cycle_error = true;
    }

    /// Empty strings are the empty list.
    #[inline]
    fn settle(&self, t: TermRef) -> TermRef {
        let t = self.deref(t);
        let cell = self.heap.cell(t.cell);
        if cell.is_string() && cell.str_len() == 0 {
            TermRef::new(CellRef::NIL, t.ctx)
        } else {
            t
        }
    }

    /// Runs the walk from `a` and `b` at nesting `depth` on an explicit
    /// work stack, so deep terms cost heap memory instead of native
    /// stack.
    fn unify_at(&mut self, a: TermRef, b: TermRef, depth: usize) -> bool {
        let mut todo = vec![Task::Pair { a, b, depth }];
        while let Some(task) = todo.pop() {
            let ok = match task {
                Task::Pair { a, b, depth } => self.unify_pair(a, b, depth, &mut todo),
                Task::Args {
                    a,
                    b,
                    left,
                    depth,
                } => self.unify_args(a, b, left, depth, &mut todo),
                Task::Seq { a, b, depth, base } => self.unify_seq(a, b, depth, base, &mut todo),
                Task::Unwind { left, right } => {
                    if let Some(tracking) = self.tracking.as_mut() {
                        tracking.left.truncate(left);
                        tracking.right.truncate(right);
                    }
                    true
                }
            };
            if !ok {
                return false;
            }
            if self.cycle_error {
                return true;
            }
        }
        true
    }

    /// Matches the top cells of `a` and `b`, pushing whatever is left to
    /// unify below them.
    fn unify_pair(
        &mut self,
        a: TermRef,
        b: TermRef,
        depth: usize,
        todo: &mut Vec<Task>,
    ) -> bool {
        if depth >= self.config.max_depth {
            self.depth_exceeded();
            return true;
        }

        let a = self.settle(a);
        let b = self.settle(b);
        let ca = self.heap.cell(a.cell);
        let cb = self.heap.cell(b.cell);

        match (ca.0, cb.0) {
            (Handle::Var { id: ia, .. }, Handle::Var { id: ib, .. }) => {
                let ka = VarKey { ctx: a.ctx, id: ia };
                let kb = VarKey { ctx: b.ctx, id: ib };
                // The newer variable points at the older one.
                if kb > ka {
                    self.set_var(kb, a);
                } else if ka > kb {
                    self.set_var(ka, b);
                }
                true
            }
            (Handle::Var { id, .. }, _) => {
                self.set_var(VarKey { ctx: a.ctx, id }, b);
                true
            }
            (_, Handle::Var { id, .. }) => {
                self.set_var(VarKey { ctx: b.ctx, id }, a);
                true
            }
            (Handle::Str(sa), Handle::Str(sb)) => {
                self.heap.slice_text(sa) == self.heap.slice_text(sb)
            }
            (Handle::Str(_), _) if cb.is_list() => self.push_seq(a, b, depth + 1, todo),
            (_, Handle::Str(_)) if ca.is_list() => self.push_seq(a, b, depth + 1, todo),
            (Handle::Func { .. }, Handle::Func { .. }) if ca.is_list() && cb.is_list() => {
                self.push_seq(a, b, depth + 1, todo)
            }
            (
                Handle::Func {
                    name: na,
                    arity: aa,
                    ..
                },
                Handle::Func {
                    name: nb,
                    arity: ab,
                    ..
                },
            ) => {
                if na != nb || aa != ab {
                    return false;
                }
                todo.push(Task::Args {
                    a: TermRef::new(a.cell.offset(1), a.ctx),
                    b: TermRef::new(b.cell.offset(1), b.ctx),
                    left: aa,
                    depth: depth + 1,
                });
                true
            }
            (Handle::Atom(na), Handle::Atom(nb)) => {
                na == nb || self.heap.name_text(na) == self.heap.name_text(nb)
            }
            _ => match (Num::of(&self.heap, ca), Num::of(&self.heap, cb)) {
                (Some(x), Some(y)) => x.value_eq(&y),
                _ => false,
            },
        }
    }

    fn push_seq(&mut self, a: TermRef, b: TermRef, depth: usize, todo: &mut Vec<Task>) -> bool {
        todo.push(Task::Seq {
            a: Cursor::start(&self.heap, a),
            b: Cursor::start(&self.heap, b),
            depth,
            base: depth,
        });
        true
    }

    /// Schedules the next argument pair of two compounds of equal name
    /// and arity; `a` and `b` are the first argument cells not yet
    /// unified.
    fn unify_args(
        &mut self,
        a: TermRef,
        b: TermRef,
        left: u32,
        depth: usize,
        todo: &mut Vec<Task>,
    ) -> bool {
        if left == 0 {
            return true;
        }
        if depth >= self.config.max_depth {
            self.depth_exceeded();
            return true;
        }
        if self.poll_interrupt() {
            return false;
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
        self.push_arg(a, b, depth, todo);
        true
    }

    /// Schedules one argument pair, honouring path tracking when it is
    /// installed.  `ta` and `tb` are the argument cells as stored.
    fn push_arg(&mut self, ta: TermRef, tb: TermRef, depth: usize, todo: &mut Vec<Task>) {
        let Some(tracking) = self.tracking.as_mut() else {
            todo.push(Task::Pair { a: ta, b: tb, depth });
            return;
        };

        let ka = Store::var_key(&self.heap, ta);
        let kb = Store::var_key(&self.heap, tb);
        if ka.is_some_and(|k| tracking.left.contains(&k))
            || kb.is_some_and(|k| tracking.right.contains(&k))
        {
            return;
        }

        todo.push(Task::Unwind {
            left: tracking.left.len(),
            right: tracking.right.len(),
        });
        tracking.left.extend(ka);
        tracking.right.extend(kb);
        todo.push(Task::Pair { a: ta, b: tb, depth });
    }

    /// Walks two list-like terms in lockstep.  Codes are matched in
    /// place; a pair of element terms is scheduled ahead of the rest of
    /// the walk.  Once either side stops being a list cell, whatever
    /// remains of each is unified at `base`.
    fn unify_seq(
        &mut self,
        mut ca: Cursor,
        mut cb: Cursor,
        mut d: usize,
        base: usize,
        todo: &mut Vec<Task>,
    ) -> bool {
        while ca.is_cons(&self.heap) && cb.is_cons(&self.heap) {
            if self.poll_interrupt() {
                return false;
            }
            if d >= self.config.max_depth {
                self.depth_exceeded();
                return true;
            }
            let (Step::Cons(ea, na), Step::Cons(eb, nb)) = (
                ca.step(&self.heap, &self.store),
                cb.step(&self.heap, &self.store),
            ) else {
                break;
            };
            match (ea, eb) {
                (Elem::Code(x), Elem::Code(y)) => {
                    if x != y {
                        return false;
                    }
                }
                (Elem::Code(c), Elem::Term(t)) | (Elem::Term(t), Elem::Code(c)) => {
                    if !self.unify_code(c, t) {
                        return false;
                    }
                }
                (Elem::Term(x), Elem::Term(y)) => {
                    todo.push(Task::Seq {
                        a: na,
                        b: nb,
                        depth: d + 1,
                        base,
                    });
                    self.push_arg(x, y, d + 1, todo);
                    return true;
                }
            }
            ca = na;
            cb = nb;
            d += 1;
        }

        let ta = ca.materialize(&mut self.heap);
        let tb = cb.materialize(&mut self.heap);
        todo.push(Task::Pair {
            a: ta,
            b: tb,
            depth: base + 1,
        });
        true
    }

    /// Unifies a character decoded from a string with a list element.
    fn unify_code(&mut self, c: char, t: TermRef) -> bool {
        let t = self.deref(t);
        let cell = self.heap.cell(t.cell);
        match cell.0 {
            Handle::Var { id, .. } => {
                let code = self.heap.int(c as i64);
                let code = TermRef::new(code, self.ctx);
                self.set_var(VarKey { ctx: t.ctx, id }, code);
                true
            }
            _ => match Num::of(&self.heap, cell) {
                Some(n) => n.value_eq(&Num::Int(c as i64)),
                None => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ctx, QueryConfig, View};
    use num_bigint::BigInt;
    use proptest::prelude::*;

    fn int_of(q: &Query, t: TermRef) -> Option<i64> {
        match q.heap().view(q.deref(t).cell) {
            View::Int(i) => Some(i),
            _ => None,
        }
    }

    fn shallow() -> Query {
        Query::with_config(QueryConfig {
            max_depth: 200,
            ..QueryConfig::default()
        })
    }

    fn codes(q: &mut Query, s: &str) -> TermRef {
        let items: Vec<_> = s.chars().map(|c| q.heap_mut().int(c as i64)).collect();
        let l = q.heap_mut().list(&items);
        q.at(l)
    }

    #[test]
    fn structural_binding() {
        let mut q = Query::new();
        let a = q.fresh_var();
        let b = q.fresh_var();
        let h = q.heap_mut();
        let one = h.int(1);
        let two = h.int(2);
        let lhs = h.func("f", &[a.cell, b.cell]);
        let rhs = h.func("f", &[one, two]);
        let (lhs, rhs) = (q.at(lhs), q.at(rhs));

        assert!(q.unify(lhs, rhs));
        assert!(!q.cycle_error());
        assert_eq!(int_of(&q, a), Some(1));
        assert_eq!(int_of(&q, b), Some(2));
    }

    #[test]
    fn functor_mismatch_binds_nothing() {
        let mut q = Query::new();
        let a = q.fresh_var();
        let f = q.heap_mut().func("f", &[a.cell]);
        let g = q.heap_mut().func("g", &[a.cell]);
        let mark = q.store().trail_mark();
        assert!(!q.unify(q.at(f), q.at(g)));
        assert_eq!(q.store().trail_mark(), mark);

        let h2 = q.heap_mut().func("f", &[a.cell, a.cell]);
        assert!(!q.unify(q.at(f), q.at(h2)));
        assert_eq!(q.store().trail_mark(), mark);
    }

    #[test]
    fn newer_context_binds_to_older() {
        let mut q = Query::new();
        let outer = q.fresh_var();
        q.push_frame(0);
        let inner = q.fresh_var();
        assert!(q.unify(outer, inner));
        assert_eq!(q.deref(inner), outer);
        assert_eq!(q.deref(outer), outer);

        // same frame: the higher number points at the lower one
        let x = q.fresh_var();
        let y = q.fresh_var();
        assert!(q.unify(x, y));
        assert_eq!(q.deref(y), x);
    }

    #[test]
    fn variable_with_itself_makes_no_binding() {
        let mut q = Query::new();
        let x = q.fresh_var();
        let mark = q.store().trail_mark();
        assert!(q.unify(x, x));
        assert_eq!(q.store().trail_mark(), mark);
    }

    #[test]
    fn string_list_duality() {
        let mut q = Query::new();
        let s = q.heap_mut().str("abc");
        let s = q.at(s);
        let l = codes(&mut q, "abc");
        assert!(q.unify(s, l));
        assert!(q.unify(l, s));

        let abd = q.heap_mut().str("abd");
        let abd = q.at(abd);
        assert!(!q.unify(s, abd));
        let l2 = codes(&mut q, "abd");
        assert!(!q.unify(s, l2));
        let short = codes(&mut q, "ab");
        assert!(!q.unify(s, short));
    }

    #[test]
    fn string_against_partial_list() {
        let mut q = Query::new();
        let x = q.fresh_var();
        let tail = q.fresh_var();
        let a = q.heap_mut().int('a' as i64);
        let l = q.heap_mut().list_with_tail(&[a, x.cell], tail.cell);
        let s = q.heap_mut().str("abcd");
        assert!(q.unify(q.at(s), q.at(l)));
        assert_eq!(int_of(&q, x), Some('b' as i64));
        let rest = q.deref(tail);
        assert!(matches!(q.heap().view(rest.cell), View::Str("cd")));
    }

    #[test]
    fn empty_string_is_empty_list() {
        let mut q = Query::new();
        let s = q.heap_mut().str("");
        assert!(q.unify(q.at(s), q.at(CellRef::NIL)));
        let one = q.heap_mut().str("a");
        let l = codes(&mut q, "a");
        let x = q.fresh_var();
        let lx = q.heap_mut().list_with_tail(&[x.cell], CellRef::NIL);
        assert!(q.unify(q.at(one), q.at(lx)));
        assert!(q.unify(q.at(one), l));
    }

    #[test]
    fn atoms_by_text() {
        let mut q = Query::new();
        let a = q.heap_mut().atom("hello");
        let b = q.heap_mut().atom_owned("hello");
        let c = q.heap_mut().atom_owned("world");
        let s = q.heap_mut().str("hello");
        assert!(q.unify(q.at(a), q.at(b)));
        assert!(!q.unify(q.at(b), q.at(c)));
        assert!(!q.unify(q.at(a), q.at(s)));
    }

    #[test]
    fn numbers_across_representations() {
        let mut q = Query::new();
        let h = q.heap_mut();
        let i = h.int(42);
        let big = h.bigint(42);
        let r = h.real(42.0);
        let r2 = h.real(42.5);
        let huge = h.bigint(BigInt::from(1u64) << 80);
        let huge2 = h.bigint(BigInt::from(1u64) << 80);
        assert!(q.unify(q.at(i), q.at(big)));
        assert!(q.unify(q.at(big), q.at(i)));
        assert!(q.unify(q.at(r), q.at(i)));
        assert!(q.unify(q.at(big), q.at(r)));
        assert!(!q.unify(q.at(r2), q.at(i)));
        assert!(q.unify(q.at(huge), q.at(huge2)));
        assert!(!q.unify(q.at(huge), q.at(i)));
        let a = q.heap_mut().atom("a");
        assert!(!q.unify(q.at(i), q.at(a)));
    }

    #[test]
    fn aliasing_through_bindings() {
        let mut q = Query::new();
        let x = q.fresh_var();
        let y = q.fresh_var();
        let h = q.heap_mut();
        let fx = h.func("f", &[x.cell, x.cell]);
        let one = h.int(1);
        let fy1 = h.func("f", &[y.cell, one]);
        assert!(q.unify(q.at(fx), q.at(fy1)));
        assert_eq!(int_of(&q, x), Some(1));
        assert_eq!(int_of(&q, y), Some(1));
    }

    #[test]
    fn cyclic_terms_hit_depth_bound() {
        let mut q = shallow();
        let x = q.fresh_var();
        let y = q.fresh_var();
        let fx = q.heap_mut().func("f", &[x.cell]);
        let fy = q.heap_mut().func("f", &[y.cell]);
        assert!(q.unify(x, q.at(fx)));
        assert!(q.unify(y, q.at(fy)));
        assert!(!q.cycle_error());
        assert!(q.unify(x, y));
        assert!(q.cycle_error());

        // the flag is cleared by the next call
        let a = q.heap_mut().atom("a");
        assert!(q.unify(q.at(a), q.at(a)));
        assert!(!q.cycle_error());
    }

    #[test]
    fn cyclic_lists_hit_depth_bound() {
        let mut q = shallow();
        let x = q.fresh_var();
        let y = q.fresh_var();
        let one = q.heap_mut().int(1);
        let lx = q.heap_mut().list_with_tail(&[one], x.cell);
        let ly = q.heap_mut().list_with_tail(&[one, one], y.cell);
        assert!(q.unify(x, q.at(lx)));
        assert!(q.unify(y, q.at(ly)));
        assert!(q.unify(x, y));
        assert!(q.cycle_error());
    }

    #[test]
    fn tracked_unify_stops_on_path_variables() {
        let mut q = shallow();
        let x = q.fresh_var();
        let fx = q.heap_mut().func("f", &[x.cell]);
        assert!(q.unify(x, q.at(fx)));

        let y = q.fresh_var();
        let fy = q.heap_mut().func("f", &[y.cell]);
        assert!(q.unify(y, q.at(fy)));

        assert!(q.unify_tracked(x, y));
        assert!(!q.cycle_error());
        assert!(q.tracking.is_none());
    }

    #[test]
    fn interrupt_stops_structural_walk() {
        let mut q = Query::new();
        let a = q.heap_mut().atom("a");
        let b = q.heap_mut().atom("b");
        let fa = q.heap_mut().func("f", &[a, a]);
        let fb = q.heap_mut().func("f", &[a, b]);
        q.interrupt_handle().interrupt();
        assert!(!q.unify(q.at(fa), q.at(fa)));
        assert!(q.interrupted());
        q.clear_interrupt();
        assert!(q.unify(q.at(fa), q.at(fa)));
        assert!(!q.unify(q.at(fa), q.at(fb)));
    }

    #[test]
    fn same_cells_different_contexts() {
        let mut q = Query::new();
        let v = q.heap_mut().var(crate::VarId(0));
        let c1 = q.push_frame(1);
        let c2 = q.push_frame(1);
        let one = q.heap_mut().int(1);
        let two = q.heap_mut().int(2);
        assert!(q.unify(TermRef::new(v, c1), TermRef::new(one, Ctx(0))));
        assert!(q.unify(TermRef::new(v, c2), TermRef::new(two, Ctx(0))));
        assert_eq!(int_of(&q, TermRef::new(v, c1)), Some(1));
        assert_eq!(int_of(&q, TermRef::new(v, c2)), Some(2));
    }

    #[test]
    fn depth_safety_on_deep_term() {
        // a plain spawned thread keeps the default native stack
        std::thread::spawn(|| {
            let mut q = Query::new();
            let depth = crate::MAX_DEPTH + 100;
            let mut b = q.heap_mut().builder();
            for _ in 0..depth {
                b.open("s", 1);
            }
            b.int(0);
            let deep = b.finish().unwrap();
            let copy = q.heap_mut().copy_term(deep);
            assert!(q.unify(q.at(deep), q.at(copy)));
            assert!(q.cycle_error());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn deep_term_within_raised_bound() {
        std::thread::spawn(|| {
            let mut q = Query::with_config(QueryConfig {
                max_depth: 1_000_000,
                ..QueryConfig::default()
            });
            let x = q.fresh_var();
            let mut b = q.heap_mut().builder();
            for _ in 0..200_000 {
                b.open("s", 1);
            }
            b.int(0);
            let deep = b.finish().unwrap();
            let mut b = q.heap_mut().builder();
            for _ in 0..200_000 {
                b.open("s", 1);
            }
            b.term(x.cell);
            let open = b.finish().unwrap();
            assert!(q.unify(q.at(open), q.at(deep)));
            assert!(!q.cycle_error());
            assert_eq!(int_of(&q, x), Some(0));
        })
        .join()
        .unwrap();
    }

    #[test]
    fn deep_cyclic_lists_on_default_stack() {
        std::thread::spawn(|| {
            let mut q = Query::new();
            let x = q.fresh_var();
            let y = q.fresh_var();
            let a = q.heap_mut().atom("a");
            let fa = q.heap_mut().func("f", &[a]);
            let lx = q.heap_mut().list_with_tail(&[fa], x.cell);
            let ly = q.heap_mut().list_with_tail(&[fa, fa], y.cell);
            assert!(q.unify(x, q.at(lx)));
            assert!(q.unify(y, q.at(ly)));
            assert!(q.unify(x, y));
            assert!(q.cycle_error());
        })
        .join()
        .unwrap();
    }

    fn ground_term() -> impl Strategy<Value = Vec<(u8, i64)>> {
        prop::collection::vec((0u8..4, -5i64..5), 1..24)
    }

    /// Builds a ground term from a flat recipe: 0 opens `f/2`, 1 opens
    /// `g/1`, 2 pushes an integer, 3 pushes a string.  Missing arguments
    /// are filled with `0`.
    fn build(q: &mut Query, recipe: &[(u8, i64)]) -> TermRef {
        let mut needed = 1usize;
        let mut b = q.heap_mut().builder();
        for &(op, n) in recipe {
            if needed == 0 {
                break;
            }
            match op {
                0 => {
                    b.open("f", 2);
                    needed += 1;
                }
                1 => {
                    b.open("g", 1);
                }
                2 => {
                    b.int(n);
                    needed -= 1;
                }
                _ => {
                    b.str(if n > 0 { "ab" } else { "" });
                    needed -= 1;
                }
            }
        }
        for _ in 0..needed {
            b.int(0);
        }
        let t = b.finish().unwrap();
        q.at(t)
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn reflexive_without_trail(recipe in ground_term()) {
            let mut q = Query::new();
            let t = build(&mut q, &recipe);
            let copy = q.heap_mut().copy_term(t.cell);
            let mark = q.store().trail_mark();
            prop_assert!(q.unify(t, t));
            prop_assert!(q.unify(t, q.at(copy)));
            prop_assert_eq!(q.store().trail_mark(), mark);
            prop_assert!(!q.cycle_error());
        }
    }
}
