//! Defines the [`Heap`] type, which owns every cell of every term a
//! query builds.
//!
//! Terms are stored as prefix arrays: a compound head is followed by its
//! argument subtrees, each of which is itself contiguous.  The heap also
//! owns the side pools referenced from cells (text and big integers) and
//! the atom interner.

use crate::{AtomId, Cell, CellRef, Handle, Name, QueryError, Slice, VarId, View};
use indexmap::IndexSet;
use num_bigint::BigInt;
use smartstring::alias::String as SmartString;

/// The heap interns atoms and stores cells, text, and big integers.
///
/// ### Epochs
/// Allocation is divided into *epochs* that form a stack.  Allocation
/// begins in epoch `0`.  [`Heap::begin_epoch`] freezes the current epoch
/// and starts a new one; [`Heap::truncate`] erases the given epoch and
/// every more recent one in O(1), leaving the given epoch active and
/// empty.  Choice points take one epoch each, so backtracking reclaims
/// exactly the cells built since the choice point was created:
/// ```
/// # use trail_terms::Heap;
/// let mut heap = Heap::new();
/// let epoch = heap.begin_epoch();
/// let before = heap.stats().cells_len;
/// heap.int(42);
/// heap.truncate(epoch).unwrap();
/// assert_eq!(heap.stats().cells_len, before);
/// ```
///
/// Interned atom names outlive truncation; only cells and pool data are
/// reclaimed.
#[derive(Clone, Debug)]
pub struct Heap {
    /// Cell storage.  Index 0 holds the `[]` atom and lives below every
    /// epoch.
    pub(crate) cells: Vec<Cell>,

    /// Text of owned atoms and compact strings.
    pub(crate) text: String,

    /// Arbitrary-precision integers referenced by `BigInt` cells.
    pub(crate) bigints: Vec<BigInt>,

    /// Interned atom names; the index is the [`AtomId`].
    pub(crate) atoms: IndexSet<SmartString>,

    /// Alive epochs, oldest first.  The last one is current.
    pub(crate) epochs: Vec<Epoch>,
}

/// Randomly generated epoch identifier.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpochID(pub(crate) u32);

#[derive(Debug, Clone, Copy)]
pub(crate) struct Epoch {
    id: EpochID,
    cells: usize,
    text: usize,
    bigints: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct HeapStats {
    pub current_epoch: EpochID,
    pub live_epochs: usize,
    pub cells_len: usize,
    pub text_len: usize,
    pub bigints_len: usize,
    pub atoms_len: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    /// Create a new heap with the given initial capacities.
    pub fn with_capacity(cells_capacity: usize, text_capacity: usize) -> Self {
        let mut atoms = IndexSet::with_capacity(64);
        for name in AtomId::WELL_KNOWN {
            atoms.insert(SmartString::from(name));
        }
        let mut cells = Vec::with_capacity(cells_capacity.max(1));
        cells.push(Cell(Handle::Atom(Name::Interned(AtomId::NIL))));

        Self {
            cells,
            text: String::with_capacity(text_capacity),
            bigints: Vec::new(),
            atoms,
            epochs: vec![Epoch {
                id: EpochID(rand::random()),
                cells: 1,
                text: 0,
                bigints: 0,
            }],
        }
    }

    /// Create a new, empty heap with default capacities.
    pub fn new() -> Self {
        Self::with_capacity(1024, 4096)
    }

    /// Returns stats.
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            current_epoch: self.current_epoch(),
            live_epochs: self.epochs.len(),
            cells_len: self.cells.len(),
            text_len: self.text.len(),
            bigints_len: self.bigints.len(),
            atoms_len: self.atoms.len(),
        }
    }

    /// Returns current epoch.
    pub fn current_epoch(&self) -> EpochID {
        self.epochs[self.epochs.len() - 1].id
    }

    /// Freezes current epoch and begins a new one.
    pub fn begin_epoch(&mut self) -> EpochID {
        let id = EpochID(rand::random());
        self.epochs.push(Epoch {
            id,
            cells: self.cells.len(),
            text: self.text.len(),
            bigints: self.bigints.len(),
        });
        id
    }

    /// Epoch `id` and all epochs more recent than it are erased in O(1).
    /// Does not shrink the allocated capacity.
    pub fn truncate(&mut self, id: EpochID) -> Result<(), QueryError> {
        let Some(pos) = self.epochs.iter().rposition(|e| e.id == id) else {
            return Err(QueryError::InvalidEpoch(id));
        };
        let epoch = self.epochs[pos];
        self.cells.truncate(epoch.cells);
        self.text.truncate(epoch.text);
        self.bigints.truncate(epoch.bigints);
        self.epochs.truncate(pos + 1);
        Ok(())
    }

    /// Erases every epoch.  The `[]` cell and interned atoms survive.
    pub fn clear(&mut self) -> Result<(), QueryError> {
        self.truncate(self.epochs[0].id)
    }

    /// Returns the cell at `r`.
    ///
    /// # Panics
    /// Panics if `r` is past the end of the heap; handles into truncated
    /// epochs are invariant violations.
    #[inline]
    pub fn cell(&self, r: CellRef) -> Cell {
        self.cells[r.index()]
    }

    /// Returns the cells of the subtree rooted at `r`.
    #[inline]
    pub fn subtree(&self, r: CellRef) -> &[Cell] {
        let size = self.cell(r).size() as usize;
        &self.cells[r.index()..r.index() + size]
    }

    /// Interns `name` and returns its id.
    pub fn intern(&mut self, name: impl AsRef<str>) -> AtomId {
        let name = name.as_ref();
        if let Some(index) = self.atoms.get_index_of(name) {
            return AtomId(index as u32);
        }
        let (index, _) = self.atoms.insert_full(SmartString::from(name));
        AtomId(index as u32)
    }

    /// Returns the text of an interned atom.
    #[inline]
    pub fn atom_name(&self, id: AtomId) -> &str {
        &self.atoms[id.0 as usize]
    }

    #[inline]
    pub(crate) fn slice_text(&self, slice: Slice) -> &str {
        &self.text[slice.index as usize..(slice.index + slice.len) as usize]
    }

    #[inline]
    pub(crate) fn name_text(&self, name: Name) -> &str {
        match name {
            Name::Interned(id) => self.atom_name(id),
            Name::Owned(slice) => self.slice_text(slice),
        }
    }

    #[inline]
    pub(crate) fn bigint_at(&self, index: u32) -> &BigInt {
        &self.bigints[index as usize]
    }

    #[inline]
    fn push(&mut self, cell: Cell) -> CellRef {
        let r = CellRef(self.cells.len() as u32);
        self.cells.push(cell);
        r
    }

    fn push_text(&mut self, s: &str) -> Slice {
        let index = self.text.len() as u32;
        self.text.push_str(s);
        Slice {
            index,
            len: s.len() as u32,
        }
    }

    /// Construct an anonymous variable cell with number `id`.
    #[inline]
    pub fn var(&mut self, id: VarId) -> CellRef {
        self.push(Cell(Handle::Var {
            id,
            name: AtomId::ANON,
        }))
    }

    /// Construct a named variable cell.  The name is only used for
    /// display and for telling anonymous variables apart.
    #[inline]
    pub fn named_var(&mut self, id: VarId, name: impl AsRef<str>) -> CellRef {
        let name = self.intern(name);
        self.push(Cell(Handle::Var { id, name }))
    }

    /// Construct an interned atom.  `[]` returns the shared nil cell.
    #[inline]
    pub fn atom(&mut self, name: impl AsRef<str>) -> CellRef {
        let name = self.intern(name);
        if name == AtomId::NIL {
            return CellRef::NIL;
        }
        self.push(Cell(Handle::Atom(Name::Interned(name))))
    }

    /// Construct an atom whose name is stored as raw owned text rather
    /// than interned.  It is the same atom as the interned one with the
    /// same text.
    #[inline]
    pub fn atom_owned(&mut self, name: impl AsRef<str>) -> CellRef {
        let slice = self.push_text(name.as_ref());
        self.push(Cell(Handle::Atom(Name::Owned(slice))))
    }

    /// Construct a machine integer.
    #[inline]
    pub fn int(&mut self, i: impl Into<i64>) -> CellRef {
        self.push(Cell(Handle::Int(i.into())))
    }

    /// Construct an arbitrary-precision integer.  The value is stored as
    /// a big integer even when it would fit in a machine word.
    #[inline]
    pub fn bigint(&mut self, i: impl Into<BigInt>) -> CellRef {
        let index = self.bigints.len() as u32;
        self.bigints.push(i.into());
        self.push(Cell(Handle::BigInt(index)))
    }

    /// Construct a floating point number.
    #[inline]
    pub fn real(&mut self, r: impl Into<f64>) -> CellRef {
        self.push(Cell(Handle::Real(r.into())))
    }

    /// Construct a compact string.
    #[inline]
    pub fn str(&mut self, s: impl AsRef<str>) -> CellRef {
        let slice = self.push_text(s.as_ref());
        self.push(Cell(Handle::Str(slice)))
    }

    /// Construct a compact string sharing the text of `r` from byte
    /// `offset` on.
    pub(crate) fn str_suffix(&mut self, r: CellRef, offset: u32) -> CellRef {
        let Handle::Str(slice) = self.cell(r).0 else {
            panic!("not a string cell: {:?}", self.cell(r));
        };
        self.push(Cell(Handle::Str(Slice {
            index: slice.index + offset,
            len: slice.len - offset,
        })))
    }

    /// Copy the subtree rooted at `r` to the end of the heap.
    pub fn copy_term(&mut self, r: CellRef) -> CellRef {
        let start = r.index();
        let size = self.cell(r).size() as usize;
        let dst = CellRef(self.cells.len() as u32);
        self.cells.extend_from_within(start..start + size);
        dst
    }

    /// Construct a compound term `name(args...)`.  Each argument subtree
    /// is copied so the result is contiguous.  No arguments yields the
    /// atom `name`.
    pub fn func(&mut self, name: impl AsRef<str>, args: &[CellRef]) -> CellRef {
        if args.is_empty() {
            return self.atom(name);
        }
        let name = self.intern(name);
        let size = 1 + args.iter().map(|&a| self.cell(a).size()).sum::<u32>();
        let head = self.push(Cell(Handle::Func {
            name,
            arity: args.len() as u32,
            size,
        }));
        for &arg in args {
            self.copy_term(arg);
        }
        head
    }

    /// Construct a proper list of `items`.  No items yields `[]`.
    pub fn list(&mut self, items: &[CellRef]) -> CellRef {
        self.list_with_tail(items, CellRef::NIL)
    }

    /// Construct the partial list `[items... | tail]`.  No items yields
    /// `tail` itself.
    pub fn list_with_tail(&mut self, items: &[CellRef], tail: CellRef) -> CellRef {
        if items.is_empty() {
            return tail;
        }
        let mut sizes = Vec::with_capacity(items.len());
        let mut rest = self.cell(tail).size();
        for &item in items.iter().rev() {
            rest += 1 + self.cell(item).size();
            sizes.push(rest);
        }
        let head = CellRef(self.cells.len() as u32);
        for (&item, &size) in items.iter().zip(sizes.iter().rev()) {
            self.push(Cell(Handle::Func {
                name: AtomId::DOT,
                arity: 2,
                size,
            }));
            self.copy_term(item);
        }
        self.copy_term(tail);
        head
    }

    /// Starts building a term in prefix order directly on the heap.
    pub fn builder(&mut self) -> TermBuilder<'_> {
        let start = CellRef(self.cells.len() as u32);
        TermBuilder {
            heap: self,
            start,
            open: Vec::new(),
            roots: 0,
        }
    }

    /// Produce a [`View`] of the cell at `r`.
    #[inline]
    pub fn view(&self, r: CellRef) -> View<'_> {
        View::of(self, r)
    }
}

/// Builds one term in prefix order without intermediate copies.
///
/// Compound heads are opened with their arity and close automatically
/// once that many arguments have been pushed:
/// ```
/// # use trail_terms::{Heap, View};
/// let mut heap = Heap::new();
/// let mut b = heap.builder();
/// b.open("f", 2).int(1).open("g", 1).atom("a");
/// let t = b.finish().unwrap();
/// assert_eq!(heap.cell(t).size(), 4);
/// ```
pub struct TermBuilder<'a> {
    heap: &'a mut Heap,
    start: CellRef,
    /// Open heads: cell index and arguments still expected.
    open: Vec<(usize, u32)>,
    roots: u32,
}

impl TermBuilder<'_> {
    fn done(&mut self) {
        loop {
            let Some((head, remaining)) = self.open.last_mut() else {
                self.roots += 1;
                return;
            };
            *remaining -= 1;
            if *remaining > 0 {
                return;
            }
            let head = *head;
            self.open.pop();
            let size = (self.heap.cells.len() - head) as u32;
            if let Handle::Func { size: s, .. } = &mut self.heap.cells[head].0 {
                *s = size;
            }
        }
    }

    /// Opens a compound head `name/arity`.  Arity 0 pushes the atom.
    pub fn open(&mut self, name: impl AsRef<str>, arity: u32) -> &mut Self {
        if arity == 0 {
            return self.atom(name);
        }
        let name = self.heap.intern(name);
        let head = self.heap.cells.len();
        self.heap.push(Cell(Handle::Func {
            name,
            arity,
            size: 0,
        }));
        self.open.push((head, arity));
        self
    }

    /// Opens a list cell `'.'(_, _)`.
    pub fn cons(&mut self) -> &mut Self {
        self.open(".", 2)
    }

    pub fn var(&mut self, id: VarId) -> &mut Self {
        self.heap.var(id);
        self.done();
        self
    }

    pub fn atom(&mut self, name: impl AsRef<str>) -> &mut Self {
        let name = self.heap.intern(name);
        self.heap.push(Cell(Handle::Atom(Name::Interned(name))));
        self.done();
        self
    }

    pub fn nil(&mut self) -> &mut Self {
        self.atom("[]")
    }

    pub fn int(&mut self, i: impl Into<i64>) -> &mut Self {
        self.heap.int(i);
        self.done();
        self
    }

    pub fn real(&mut self, r: impl Into<f64>) -> &mut Self {
        self.heap.real(r);
        self.done();
        self
    }

    pub fn str(&mut self, s: impl AsRef<str>) -> &mut Self {
        self.heap.str(s);
        self.done();
        self
    }

    /// Pushes a copy of an existing term.
    pub fn term(&mut self, r: CellRef) -> &mut Self {
        self.heap.copy_term(r);
        self.done();
        self
    }

    /// Returns the built term, or [`QueryError::IncompleteTerm`] if a
    /// head is still open or not exactly one term was built.
    pub fn finish(self) -> Result<CellRef, QueryError> {
        if !self.open.is_empty() || self.roots != 1 {
            return Err(QueryError::IncompleteTerm);
        }
        Ok(self.start)
    }
}
