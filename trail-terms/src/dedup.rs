//! Defines [`ResultLog`], which spots answer values already shown.
//!
//! When an answer binds several variables to the same term, the top
//! level prints the later ones as the name of the first.

use crate::{Comparison, Query, TermRef};

/// Values seen so far in one answer, with the number of the variable
/// that produced each.
#[derive(Debug, Default, Clone)]
pub struct ResultLog {
    items: Vec<(usize, TermRef)>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of an earlier entry equal to `value` in
    /// standard order.  Otherwise records `value` under `nbr` and returns
    /// `None`.  An undecidable comparison never counts as a duplicate.
    pub fn check_duplicate(&mut self, q: &mut Query, nbr: usize, value: TermRef) -> Option<usize> {
        for &(seen, t) in &self.items {
            if q.compare(value, t) == Comparison::Equal {
                return Some(seen);
            }
        }
        self.items.push((nbr, value));
        None
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Forgets every value; called between answers.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryConfig;

    #[test]
    fn reports_first_equal_value() {
        let mut q = Query::new();
        let mut log = ResultLog::new();
        let h = q.heap_mut();
        let one = h.int(1);
        let a = h.atom("a");
        let f1 = h.func("f", &[one]);
        let f1_again = h.func("f", &[one]);
        let big_one = h.bigint(1);

        let f1_ref = TermRef::new(f1, q.ctx());
        assert_eq!(log.check_duplicate(&mut q, 0, f1_ref), None);
        let a_ref = TermRef::new(a, q.ctx());
        assert_eq!(log.check_duplicate(&mut q, 1, a_ref), None);
        let f1_again = TermRef::new(f1_again, q.ctx());
        assert_eq!(log.check_duplicate(&mut q, 2, f1_again), Some(0));
        let one_ref = TermRef::new(one, q.ctx());
        assert_eq!(log.check_duplicate(&mut q, 3, one_ref), None);
        let big_one = TermRef::new(big_one, q.ctx());
        assert_eq!(log.check_duplicate(&mut q, 4, big_one), Some(3));
        assert_eq!(log.len(), 3);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn unbound_variables_are_distinct_values() {
        let mut q = Query::new();
        let mut log = ResultLog::new();
        let x = q.fresh_var();
        let y = q.fresh_var();
        assert_eq!(log.check_duplicate(&mut q, 0, x), None);
        assert_eq!(log.check_duplicate(&mut q, 1, y), None);
        assert!(q.unify(y, x));
        assert_eq!(log.check_duplicate(&mut q, 2, y), Some(0));
    }

    #[test]
    fn undecidable_is_not_duplicate() {
        let mut q = Query::with_config(QueryConfig {
            max_depth: 100,
            ..QueryConfig::default()
        });
        let mut log = ResultLog::new();
        let x = q.fresh_var();
        let y = q.fresh_var();
        let fx = q.heap_mut().func("f", &[x.cell]);
        let fy = q.heap_mut().func("f", &[y.cell]);
        assert!(q.unify(x, q.at(fx)));
        assert!(q.unify(y, q.at(fy)));
        assert_eq!(log.check_duplicate(&mut q, 0, x), None);
        assert_eq!(log.check_duplicate(&mut q, 1, y), None);
        assert!(q.cycle_error());
    }
}
