//! Defines [`Query`], the per-query context that owns the heap, the
//! binding store and the soft flags every core operation reports
//! through.

use crate::{
    CellRef, Ctx, EpochID, Heap, Procedures, QueryError, Snapshot, Store, TermRef, VarId, VarKey,
    MAX_DEPTH,
};
use core::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Tunables of a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// Recursion bound shared by unify, compare and the occurs-cycle
    /// walk.
    pub max_depth: usize,
    pub cells_capacity: usize,
    pub text_capacity: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            cells_capacity: 1024,
            text_capacity: 4096,
        }
    }
}

/// A shared flag that asks running walks to stop.
///
/// Clones share the flag, so a handle can be moved to a signal handler
/// or another thread while the query runs.
#[derive(Debug, Default, Clone)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything needed to return to an earlier state on backtracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoicePoint {
    trail: usize,
    frames: usize,
    epoch: EpochID,
    snapshots: usize,
    goals: usize,
    in_hook: bool,
    hook_start: usize,
    hook_end: usize,
}

/// Active recursion paths of tracked unification, one per side.
#[derive(Debug, Default, Clone)]
pub(crate) struct RefTracking {
    pub(crate) left: Vec<VarKey>,
    pub(crate) right: Vec<VarKey>,
}

/// One query's exclusive state.
///
/// A query owns its heap, frames and trail; nothing in it is shared with
/// other queries except the interrupt flag.
#[derive(Debug)]
pub struct Query {
    pub(crate) heap: Heap,
    pub(crate) store: Store,
    pub(crate) procedures: Procedures,
    pub(crate) config: QueryConfig,

    /// Current frame; new variables and scratch terms live here.
    pub(crate) ctx: Ctx,

    /// Set when a walk gave up at the depth bound or found a cycle.
    pub(crate) cycle_error: bool,
    pub(crate) interrupted: bool,
    pub(crate) interrupt: InterruptHandle,

    /// An attributed variable was bound in the current episode.
    pub(crate) has_attrs: bool,
    pub(crate) in_hook: bool,
    /// Trail mark at the start of the current unification episode.
    pub(crate) save_tp: usize,
    /// Trail range handed to the armed hook.
    pub(crate) hook_range: Range<usize>,
    pub(crate) snapshots: Vec<Snapshot>,
    /// Goals spliced onto the continuation, oldest first.
    pub(crate) goals: Vec<CellRef>,
    pub(crate) tracking: Option<RefTracking>,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    pub fn with_config(config: QueryConfig) -> Self {
        let mut store = Store::new();
        let ctx = store.push_frame(0);
        Self {
            heap: Heap::with_capacity(config.cells_capacity, config.text_capacity),
            store,
            procedures: Procedures::new(),
            config,
            ctx,
            cycle_error: false,
            interrupted: false,
            interrupt: InterruptHandle::default(),
            has_attrs: false,
            in_hook: false,
            save_tp: 0,
            hook_range: 0..0,
            snapshots: Vec::new(),
            goals: Vec::new(),
            tracking: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    #[inline]
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    #[inline]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    #[inline]
    pub fn procedures(&self) -> &Procedures {
        &self.procedures
    }

    #[inline]
    pub fn procedures_mut(&mut self) -> &mut Procedures {
        &mut self.procedures
    }

    /// The current frame.
    #[inline]
    pub fn ctx(&self) -> Ctx {
        self.ctx
    }

    /// Pushes a frame of `nvars` variables and makes it current.
    pub fn push_frame(&mut self, nvars: u32) -> Ctx {
        self.ctx = self.store.push_frame(nvars);
        self.ctx
    }

    /// Adds `n` variables to the current frame and returns the first.
    pub fn create_vars(&mut self, n: u32) -> VarId {
        self.store.create_vars(self.ctx, n)
    }

    /// Creates one fresh variable in the current frame and returns a
    /// reference to it.
    pub fn fresh_var(&mut self) -> TermRef {
        let id = self.create_vars(1);
        let cell = self.heap.var(id);
        TermRef::new(cell, self.ctx)
    }

    /// Pairs a heap cell with the current frame.
    #[inline]
    pub fn at(&self, cell: CellRef) -> TermRef {
        TermRef::new(cell, self.ctx)
    }

    #[inline]
    pub fn deref(&self, t: TermRef) -> TermRef {
        self.store.deref(&self.heap, t)
    }

    /// Binds `var` to `value`, noting whether an attributed variable was
    /// bound.
    pub fn set_var(&mut self, var: VarKey, value: TermRef) {
        if self.store.set_var(var, value) {
            self.has_attrs = true;
        }
    }

    /// Returns `true` if the last unify, compare or cycle check stopped
    /// at the depth bound or on a cycle.
    #[inline]
    pub fn cycle_error(&self) -> bool {
        self.cycle_error
    }

    /// Returns `true` if a walk was stopped by the interrupt flag.
    #[inline]
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Returns a handle that can interrupt this query's walks.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Clears the interrupt flag and the record of an interrupted walk.
    pub fn clear_interrupt(&mut self) {
        self.interrupt.clear();
        self.interrupted = false;
    }

    #[inline]
    pub(crate) fn poll_interrupt(&mut self) -> bool {
        if self.interrupt.is_set() {
            if !self.interrupted {
                log::debug!("walk interrupted");
            }
            self.interrupted = true;
        }
        self.interrupted
    }

    #[inline]
    pub fn has_attrs(&self) -> bool {
        self.has_attrs
    }

    #[inline]
    pub fn in_hook(&self) -> bool {
        self.in_hook
    }

    /// Takes the goals spliced onto the continuation since the last call.
    pub fn take_goals(&mut self) -> Vec<CellRef> {
        core::mem::take(&mut self.goals)
    }

    /// Records the current state for [`Query::backtrack`].
    pub fn choice_point(&mut self) -> ChoicePoint {
        ChoicePoint {
            trail: self.store.trail_mark(),
            frames: self.store.frames_len(),
            epoch: self.heap.begin_epoch(),
            snapshots: self.snapshots.len(),
            goals: self.goals.len(),
            in_hook: self.in_hook,
            hook_start: self.hook_range.start,
            hook_end: self.hook_range.end,
        }
    }

    /// Returns to the state recorded by `cp`: bindings made since are
    /// undone, newer frames dropped and newer cells reclaimed.  A hook
    /// armed since is disarmed.  The choice point stays valid for further
    /// retries.
    pub fn backtrack(&mut self, cp: &ChoicePoint) -> Result<(), QueryError> {
        log::trace!(
            "backtrack: trail {} -> {}",
            self.store.trail_mark(),
            cp.trail
        );
        self.store.undo_to(cp.trail);
        self.store.truncate_frames(cp.frames);
        self.heap.truncate(cp.epoch)?;
        self.snapshots.truncate(cp.snapshots);
        self.goals.truncate(cp.goals);
        self.in_hook = cp.in_hook;
        self.hook_range = cp.hook_start..cp.hook_end;
        self.has_attrs = false;
        self.ctx = Ctx(self.store.frames_len() as u32 - 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::View;

    #[test]
    fn starts_with_one_frame() {
        let q = Query::new();
        assert_eq!(q.ctx(), Ctx(0));
        assert_eq!(q.store().frames_len(), 1);
        assert_eq!(q.config().max_depth, MAX_DEPTH);
        assert!(!q.cycle_error());
    }

    #[test]
    fn fresh_vars_are_distinct() {
        let mut q = Query::new();
        let a = q.fresh_var();
        let b = q.fresh_var();
        assert_ne!(a.cell, b.cell);
        assert_ne!(q.heap().cell(a.cell).var_id(), q.heap().cell(b.cell).var_id());
        assert_eq!(q.deref(a), a);
    }

    #[test]
    fn backtrack_restores_everything() {
        let mut q = Query::new();
        let x = q.fresh_var();
        let cp = q.choice_point();
        let cells = q.heap().stats().cells_len;

        let one = q.heap_mut().int(1);
        let one = q.at(one);
        let key = Store::var_key(q.heap(), x).unwrap();
        q.set_var(key, one);
        q.push_frame(4);
        assert!(matches!(q.heap().view(q.deref(x).cell), View::Int(1)));

        q.backtrack(&cp).unwrap();
        assert_eq!(q.deref(x), x);
        assert_eq!(q.store().frames_len(), 1);
        assert_eq!(q.ctx(), Ctx(0));
        assert_eq!(q.heap().stats().cells_len, cells);

        // the same choice point can be retried
        q.heap_mut().int(2);
        q.backtrack(&cp).unwrap();
        assert_eq!(q.heap().stats().cells_len, cells);
    }

    #[test]
    fn interrupt_handle_is_shared() {
        let mut q = Query::new();
        let handle = q.interrupt_handle();
        assert!(!q.poll_interrupt());
        handle.interrupt();
        assert!(q.poll_interrupt());
        assert!(q.interrupted());
        q.clear_interrupt();
        assert!(!handle.is_set());
        assert!(!q.interrupted());
    }
}
