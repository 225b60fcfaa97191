//! Cycle detection for terms made cyclic through variable bindings.
//!
//! Two walks live here.  [`Query::detect_cycle`] follows a list spine
//! with Brent's algorithm and can stop after a bounded number of
//! elements.  [`Query::check_cyclic`] walks a whole term keeping the
//! variables on the current path, and reports a cycle when a variable is
//! met again on its own path.
//!
//! The occurs walk also remembers the variables whose targets it has
//! walked completely, and does not enter them again.  A cycle through
//! such a variable would have been found on its first walk, so cycles
//! are reported as by the path alone.  A term sharing a bound variable
//! in many places is walked once per variable instead of once per
//! occurrence.

use crate::seq::{Cursor, Step};
use crate::{Handle, Query, TermRef, VarKey};
use indexmap::IndexSet;

/// Result of the occurs-cycle walk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cyclicity {
    Acyclic,
    Cyclic,
    /// The walk reached the depth bound before deciding.
    DepthExceeded,
}

/// Start and length of a cyclic list spine, counted in elements from
/// the head.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ListCycle {
    pub start: usize,
    pub length: usize,
}

/// Result of [`Query::detect_cycle`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CycleScan {
    /// Where the walk stopped: the tail after `count` elements.  It is
    /// `[]` for a proper list, the unbound tail of a partial list, the
    /// remaining text of a string cut short, or the first cell of the
    /// cycle for an unbounded walk over a cyclic list.
    pub stop: TermRef,
    /// Elements consumed.
    pub count: usize,
    /// Set when the spine is cyclic.
    pub cycle: Option<ListCycle>,
}

impl Query {
    /// Enumerates the spine of a list or string from `head`, consuming at
    /// most `max` elements when a bound is given.
    ///
    /// A bounded walk over a cyclic list reports exactly `max` elements
    /// and the position reached, computed from the cycle's start and
    /// length rather than by walking.  An unbounded walk over a cyclic
    /// list stops at the start of the cycle.
    pub fn detect_cycle(&mut self, head: TermRef, max: Option<usize>) -> CycleScan {
        let head = self.deref(head);
        let start = Cursor::start(&self.heap, head);

        if max == Some(0) {
            return self.scan_result(start, 0, None);
        }

        let mut tortoise = start;
        let mut hare = match start.step(&self.heap, &self.store) {
            Step::Cons(_, next) => next,
            Step::End(end) => return self.scan_result(end, 0, None),
        };
        let mut count = 1usize;
        let mut power = 1usize;
        let mut lam = 1usize;

        loop {
            if self.poll_interrupt() {
                return self.scan_result(hare, count, None);
            }
            if Some(count) == max {
                return self.scan_result(hare, count, None);
            }
            if hare.position() == tortoise.position() {
                break;
            }
            if power == lam {
                tortoise = hare;
                power *= 2;
                lam = 0;
            }
            hare = match hare.step(&self.heap, &self.store) {
                Step::Cons(_, next) => next,
                Step::End(end) => return self.scan_result(end, count, None),
            };
            count += 1;
            lam += 1;
        }

        // Cycle length is lam; find where it starts.
        let mut hare = start;
        for _ in 0..lam {
            hare = self.advance(hare);
        }
        let mut tortoise = start;
        let mut mu = 0usize;
        while tortoise.position() != hare.position() {
            if self.poll_interrupt() {
                return self.scan_result(tortoise, mu, None);
            }
            tortoise = self.advance(tortoise);
            hare = self.advance(hare);
            mu += 1;
        }

        let cycle = Some(ListCycle {
            start: mu,
            length: lam,
        });
        log::trace!("list cycle at {mu} of length {lam}");

        match max {
            None => self.scan_result(tortoise, mu, cycle),
            Some(n) => {
                let target = if n <= mu { n } else { mu + (n - mu) % lam };
                let mut cur = start;
                for _ in 0..target {
                    cur = self.advance(cur);
                }
                self.scan_result(cur, n, cycle)
            }
        }
    }

    fn advance(&self, cur: Cursor) -> Cursor {
        match cur.step(&self.heap, &self.store) {
            Step::Cons(_, next) => next,
            Step::End(end) => end,
        }
    }

    fn scan_result(&mut self, stop: Cursor, count: usize, cycle: Option<ListCycle>) -> CycleScan {
        CycleScan {
            stop: stop.materialize(&mut self.heap),
            count,
            cycle,
        }
    }

    /// Returns `true` if `t` is cyclic, or if the walk reached the depth
    /// bound before deciding.  Either way `cycle_error` is set.
    pub fn is_cyclic_term(&mut self, t: TermRef) -> bool {
        self.check_cyclic(t) != Cyclicity::Acyclic
    }

    /// Walks `t` and tells a genuine cycle apart from running out of
    /// depth.  Both non-acyclic outcomes set `cycle_error`.
    pub fn check_cyclic(&mut self, t: TermRef) -> Cyclicity {
        self.cycle_error = false;
        let t = self.deref(t);
        let mut path = Vec::new();
        let mut done = IndexSet::new();
        let found = self.cyclic_walk(t, &mut path, &mut done);
        match found {
            Cyclicity::Acyclic => {}
            Cyclicity::Cyclic => self.cycle_error = true,
            Cyclicity::DepthExceeded => self.depth_exceeded(),
        }
        found
    }

    /// `path` holds the variables being expanded; `done` the variables
    /// whose targets were fully walked without finding a cycle.
    fn cyclic_walk(
        &mut self,
        t: TermRef,
        path: &mut Vec<VarKey>,
        done: &mut IndexSet<VarKey>,
    ) -> Cyclicity {
        let cell = self.heap.cell(t.cell);
        if !cell.is_structure() {
            return Cyclicity::Acyclic;
        }
        if path.len() >= self.config.max_depth {
            return Cyclicity::DepthExceeded;
        }

        // Nested compounds are contiguous, so one linear scan covers them;
        // only bindings need recursion.
        for i in 1..cell.size() {
            let c = t.cell.offset(i);
            let Handle::Var { id, .. } = self.heap.cell(c).0 else {
                continue;
            };
            if self.poll_interrupt() {
                return Cyclicity::Acyclic;
            }
            let key = VarKey { ctx: t.ctx, id };
            if path.contains(&key) {
                return Cyclicity::Cyclic;
            }
            if done.contains(&key) {
                continue;
            }
            path.push(key);
            let target = self.deref(TermRef::new(c, t.ctx));
            let found = self.cyclic_walk(target, path, done);
            path.pop();
            if found != Cyclicity::Acyclic {
                return found;
            }
            done.insert(key);
        }
        Cyclicity::Acyclic
    }
}
