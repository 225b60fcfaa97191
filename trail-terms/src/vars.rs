//! Collection of the unbound variables of a term.

use crate::{AtomId, Handle, Query, TermRef, VarKey};
use indexmap::IndexMap;

/// One distinct unbound variable found by [`Query::collect_vars`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarUse {
    pub key: VarKey,
    /// The variable cell where the first occurrence dereferenced to.
    pub var: TermRef,
    pub occurrences: usize,
    /// Named `_`.
    pub anonymous: bool,
}

impl Query {
    /// Returns each distinct unbound variable of `t` once, in order of
    /// first occurrence, following bindings.
    ///
    /// Bindings are followed with a path guard so cyclic terms are
    /// walked finitely; a path longer than the depth bound sets
    /// `cycle_error` and is not followed further.
    pub fn collect_vars(&mut self, t: TermRef) -> Vec<VarUse> {
        self.cycle_error = false;
        let mut found = IndexMap::new();
        let mut path = Vec::new();
        let t = self.deref(t);
        self.collect_walk(t, &mut path, &mut found);
        found.into_values().collect()
    }

    fn collect_walk(
        &mut self,
        t: TermRef,
        path: &mut Vec<VarKey>,
        found: &mut IndexMap<VarKey, VarUse>,
    ) {
        let size = self.heap.cell(t.cell).size();
        for i in 0..size {
            let c = t.cell.offset(i);
            let Handle::Var { id, .. } = self.heap.cell(c).0 else {
                continue;
            };
            let key = VarKey { ctx: t.ctx, id };
            if path.contains(&key) {
                continue;
            }
            let target = self.deref(TermRef::new(c, t.ctx));
            match self.heap.cell(target.cell).0 {
                Handle::Var { id, name } => {
                    let key = VarKey {
                        ctx: target.ctx,
                        id,
                    };
                    found
                        .entry(key)
                        .and_modify(|u: &mut VarUse| u.occurrences += 1)
                        .or_insert(VarUse {
                            key,
                            var: target,
                            occurrences: 1,
                            anonymous: name == AtomId::ANON,
                        });
                }
                Handle::Func { .. } => {
                    if path.len() >= self.config.max_depth {
                        self.depth_exceeded();
                        continue;
                    }
                    path.push(key);
                    self.collect_walk(target, path, found);
                    path.pop();
                }
                _ => {}
            }
        }
    }
}
