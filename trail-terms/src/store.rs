//! Defines [`Store`], the binding store: call frames of variable slots
//! and the trail of bindings made to them.
//!
//! A variable is named by its [`VarKey`], the context (frame) that owns
//! it plus its number within that frame.  Frames are numbered in the
//! order they are pushed, so a higher [`Ctx`] is always the newer one.

use crate::{Ctx, Handle, Heap, QueryError, TermRef, VarId, VarKey};
use core::ops::Range;

/// One variable's binding storage.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Slot {
    pub(crate) value: Option<TermRef>,
    pub(crate) attrs: Option<TermRef>,
}

impl Slot {
    /// The term this variable is bound to, if any.
    #[inline]
    pub fn value(&self) -> Option<TermRef> {
        self.value
    }

    /// The attribute term attached to this variable, if any.
    #[inline]
    pub fn attrs(&self) -> Option<TermRef> {
        self.attrs
    }
}

/// One trail record: the variable whose slot changed, and the
/// attributes it carried before.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailEntry {
    pub var: VarKey,
    pub attrs: Option<TermRef>,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    base: u32,
    len: u32,
}

/// The saved slot contents of one trail range, in trail order.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub(crate) range: Range<usize>,
    pub(crate) slots: Vec<Slot>,
}

impl Snapshot {
    /// The trail range this snapshot covers.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// The saved slots, one per trail entry in the range.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}

/// Frames of slots plus the trail.
#[derive(Debug, Default, Clone)]
pub struct Store {
    slots: Vec<Slot>,
    frames: Vec<Frame>,
    trail: Vec<TrailEntry>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new frame with `nvars` empty slots and returns its
    /// context.
    pub fn push_frame(&mut self, nvars: u32) -> Ctx {
        let ctx = Ctx(self.frames.len() as u32);
        let base = self.slots.len() as u32;
        self.slots
            .resize(self.slots.len() + nvars as usize, Slot::default());
        self.frames.push(Frame { base, len: nvars });
        ctx
    }

    /// Adds `n` fresh variables to frame `ctx` and returns the number of
    /// the first one.
    ///
    /// # Panics
    /// Only the most recent frame can grow.
    pub fn create_vars(&mut self, ctx: Ctx, n: u32) -> VarId {
        assert_eq!(
            ctx.index() + 1,
            self.frames.len(),
            "only the top frame can grow"
        );
        let frame = &mut self.frames[ctx.index()];
        let first = VarId(frame.len);
        frame.len += n;
        self.slots
            .resize(self.slots.len() + n as usize, Slot::default());
        first
    }

    /// Number of frames.
    #[inline]
    pub fn frames_len(&self) -> usize {
        self.frames.len()
    }

    /// Number of variables in frame `ctx`.
    #[inline]
    pub fn frame_vars(&self, ctx: Ctx) -> u32 {
        self.frames[ctx.index()].len
    }

    /// Drops every frame from `len` on, together with their slots.
    pub fn truncate_frames(&mut self, len: usize) {
        if let Some(frame) = self.frames.get(len) {
            self.slots.truncate(frame.base as usize);
            self.frames.truncate(len);
        }
    }

    /// Stable offset of a variable's slot within this store.  Standard
    /// order ranks unbound variables by it.
    ///
    /// # Panics
    /// Panics if the context was never pushed or the number is past the
    /// end of its frame.
    #[inline]
    pub fn slot_index(&self, key: VarKey) -> usize {
        let frame = self.frames[key.ctx.index()];
        assert!(key.id.0 < frame.len, "variable {key:?} outside its frame");
        (frame.base + key.id.0) as usize
    }

    #[inline]
    pub fn slot(&self, key: VarKey) -> &Slot {
        &self.slots[self.slot_index(key)]
    }

    #[inline]
    fn slot_mut(&mut self, key: VarKey) -> &mut Slot {
        let index = self.slot_index(key);
        &mut self.slots[index]
    }

    /// Follows bindings from `t` until reaching an unbound variable or a
    /// non-variable cell.
    pub fn deref(&self, heap: &Heap, mut t: TermRef) -> TermRef {
        while let Handle::Var { id, .. } = heap.cell(t.cell).0 {
            match self.slot(VarKey { ctx: t.ctx, id }).value {
                Some(next) => t = next,
                None => break,
            }
        }
        t
    }

    /// Returns the key of `t` if it is a variable cell.  The cell is not
    /// dereferenced.
    #[inline]
    pub fn var_key(heap: &Heap, t: TermRef) -> Option<VarKey> {
        heap.cell(t.cell).var_id().map(|id| VarKey { ctx: t.ctx, id })
    }

    /// Binds `var` to `value` and appends one trail entry.  Returns
    /// `true` if the variable carried attributes.
    pub fn set_var(&mut self, var: VarKey, value: TermRef) -> bool {
        let slot = self.slot_mut(var);
        debug_assert!(slot.value.is_none(), "binding bound variable {var:?}");
        slot.value = Some(value);
        let attrs = slot.attrs;
        self.trail.push(TrailEntry { var, attrs });
        attrs.is_some()
    }

    /// Replaces the attributes of `var`.  The change is trailed so
    /// backtracking restores the old attributes.
    pub fn put_attrs(&mut self, var: VarKey, attrs: Option<TermRef>) {
        let slot = self.slot_mut(var);
        let old = slot.attrs;
        slot.attrs = attrs;
        self.trail.push(TrailEntry { var, attrs: old });
    }

    #[inline]
    pub fn get_attrs(&self, var: VarKey) -> Option<TermRef> {
        self.slot(var).attrs
    }

    /// Current trail length.
    #[inline]
    pub fn trail_mark(&self) -> usize {
        self.trail.len()
    }

    #[inline]
    pub fn trail(&self) -> &[TrailEntry] {
        &self.trail
    }

    /// Undoes trail entries back to `mark`, newest first.
    pub fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some(entry) = self.trail.pop() else {
                break;
            };
            // The frame may already be gone.
            if entry.var.ctx.index() < self.frames.len() {
                let slot = self.slot_mut(entry.var);
                slot.value = None;
                slot.attrs = entry.attrs;
            }
        }
    }

    /// Saves the current slot of every trail entry in `range`.
    ///
    /// Fails with a resource error when the save buffer cannot be
    /// allocated.
    pub fn capture(&self, range: Range<usize>) -> Result<Snapshot, QueryError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(range.len())
            .map_err(|_| QueryError::Resource("memory"))?;
        for entry in &self.trail[range.clone()] {
            slots.push(*self.slot(entry.var));
        }
        Ok(Snapshot { range, slots })
    }

    /// Empties the slot of every trail entry in `range`, putting back the
    /// attributes recorded in the entry.  The entries stay on the trail.
    pub fn unbind_range(&mut self, range: Range<usize>) {
        for i in range {
            let entry = self.trail[i];
            let slot = self.slot_mut(entry.var);
            slot.value = None;
            slot.attrs = entry.attrs;
        }
    }

    /// Writes every slot saved in `snapshot` back, in trail order.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        for (i, saved) in snapshot.range.clone().zip(snapshot.slots.iter()) {
            let var = self.trail[i].var;
            *self.slot_mut(var) = *saved;
        }
    }
}
