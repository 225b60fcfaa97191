//! Trail undo/redo around the post-unification hook.
//!
//! When a unification episode binds an attributed variable, the
//! `post_unify_hook/0` goal is spliced onto the continuation over the
//! trail range of that episode.  The hook can then take the bindings
//! back with [`Query::undo_trail`], inspect the `Var-Value` list it
//! receives, and reinstate them exactly with [`Query::redo_trail`].

use crate::error::{missing_procedure, POST_UNIFY_HOOK};
use crate::{Query, QueryError, TermRef, VarId, VarKey};
use indexmap::IndexSet;
use smartstring::alias::String;

/// The set of defined predicate indicators.
#[derive(Debug, Default, Clone)]
pub struct Procedures {
    defined: IndexSet<(String, usize)>,
}

impl Procedures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `name/arity`.  Returns `false` if it was already defined.
    pub fn define(&mut self, name: &str, arity: usize) -> bool {
        self.defined.insert((String::from(name), arity))
    }

    /// Removes `name/arity`.  Returns `false` if it was not defined.
    pub fn abolish(&mut self, name: &str, arity: usize) -> bool {
        self.defined.shift_remove(&(String::from(name), arity))
    }

    pub fn is_defined(&self, name: &str, arity: usize) -> bool {
        self.defined.contains(&(String::from(name), arity))
    }

    pub fn len(&self) -> usize {
        self.defined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }

    /// Iterates the defined indicators in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.defined.iter().map(|(name, arity)| (name.as_str(), *arity))
    }
}

impl Query {
    /// Arms the post-unification hook over the bindings made since the
    /// start of the current episode.
    ///
    /// Fails with `existence_error(procedure, post_unify_hook/0)` when the
    /// hook is not defined; the query state is then left as it was apart
    /// from the cleared attribute flag.
    pub fn arm_post_unify_hook(&mut self) -> Result<(), QueryError> {
        let (name, arity) = POST_UNIFY_HOOK;
        self.has_attrs = false;
        if !self.procedures.is_defined(name, arity) {
            return Err(missing_procedure(name, arity));
        }
        self.in_hook = true;
        self.hook_range = self.save_tp..self.store.trail_mark();
        let goal = self.heap.atom(name);
        self.goals.push(goal);
        log::debug!(
            "{name}/{arity} armed over {} bindings",
            self.hook_range.len()
        );
        Ok(())
    }

    /// Takes back the bindings of the armed episode.
    ///
    /// Every slot in the range is saved, then emptied with its attributes
    /// put back.  Trail entries already undone are skipped.  Returns the list `[Var-Value, ...]` describing what was
    /// undone, in trail order, built in the current frame.
    ///
    /// Fails with a resource error when the save buffer cannot be
    /// allocated.
    pub fn undo_trail(&mut self) -> Result<TermRef, QueryError> {
        // entries past the trail top were already undone
        let end = self.hook_range.end.min(self.store.trail_mark());
        let range = self.hook_range.start.min(end)..end;
        let snapshot = self.store.capture(range.clone())?;
        let n = range.len() as u32;
        log::trace!("undo trail {range:?}");

        let first = self.create_vars(2 * n);
        let ctx = self.ctx;
        let keys: Vec<VarKey> = self.store.trail()[range.clone()]
            .iter()
            .map(|entry| entry.var)
            .collect();

        // Scratch pairs: the left variable stands for the undone
        // variable, the right one for the value it had.
        for (i, (key, saved)) in keys.iter().zip(snapshot.slots()).enumerate() {
            let lhs = VarKey {
                ctx,
                id: VarId(first.0 + 2 * i as u32),
            };
            let rhs = VarKey {
                ctx,
                id: VarId(first.0 + 2 * i as u32 + 1),
            };
            let var = self.heap.var(key.id);
            self.store.set_var(lhs, TermRef::new(var, key.ctx));
            if let Some(value) = saved.value() {
                self.store.set_var(rhs, value);
            }
        }

        let mut b = self.heap.builder();
        for i in 0..n {
            b.cons()
                .open("-", 2)
                .var(VarId(first.0 + 2 * i))
                .var(VarId(first.0 + 2 * i + 1));
        }
        b.nil();
        let list = b.finish()?;

        self.store.unbind_range(range);
        self.snapshots.push(snapshot);
        Ok(TermRef::new(list, ctx))
    }

    /// Reinstates the bindings taken back by the last
    /// [`Query::undo_trail`], exactly as they were before it.  Returns
    /// `false` if there is nothing to redo.
    pub fn redo_trail(&mut self) -> bool {
        let Some(snapshot) = self.snapshots.pop() else {
            return false;
        };
        log::trace!("redo trail {:?}", snapshot.range());
        self.store.restore(&snapshot);
        true
    }

    /// Leaves the hook, so later episodes arm it again.
    pub fn end_hook(&mut self) {
        self.in_hook = false;
    }
}
