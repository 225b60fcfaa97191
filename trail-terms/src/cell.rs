//! Defines the core [`Cell`] type and the small handle types around it.
//!
//! A term is stored as a contiguous prefix array of cells inside a
//! [`Heap`](crate::Heap): a compound head is followed immediately by its
//! arguments, and each head records the size of its whole subtree, so
//! skipping or copying a subterm never chases pointers.

use core::fmt;

// The following type definitions describe the internal representation
// of a cell.  Each variant carries its payload directly: machine
// integers and reals inline, interned names by id, and longer data
// (owned atom text, compact strings, big integers) by index into the
// heap's side pools.

/// A range of bytes in the heap's text pool.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Slice {
    pub(crate) index: u32,
    pub(crate) len: u32,
}

/// Storage of an atom's name: either interned, or raw owned text.
///
/// Both forms denote the same atom when their text matches, so equality
/// and ordering always go through the text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Name {
    Interned(AtomId),
    Owned(Slice),
}

/// Internal handle describing the kind of a cell and storing its data.
///
/// The `repr(u8)` attribute keeps the discriminant in a single byte,
/// which together with the widest payload yields a `Cell` size of 16
/// bytes on 64‑bit targets.
#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub(crate) enum Handle {
    Var { id: VarId, name: AtomId },
    Atom(Name),
    Func { name: AtomId, arity: u32, size: u32 },
    Int(i64),
    BigInt(u32),
    Real(f64),
    Str(Slice),
}

/// One tagged node of a term.
///
/// Cells are plain copyable values; a term is identified by the
/// [`CellRef`] of its first cell.  Users normally build cells through the
/// [`Heap`](crate::Heap) constructors rather than by hand.
#[derive(Copy, Clone, PartialEq)]
pub struct Cell(pub(crate) Handle);

/// The tag of a cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    Var,
    Atom,
    Func,
    Int,
    BigInt,
    Real,
    Str,
}

/// Index of a cell in the heap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRef(pub(crate) u32);

impl CellRef {
    /// The preallocated `[]` cell.  It lives below every epoch and is
    /// never truncated.
    pub const NIL: Self = Self(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn offset(self, n: u32) -> Self {
        Self(self.0 + n)
    }
}

/// Identifier of a call context (frame) in the binding store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ctx(pub(crate) u32);

impl Ctx {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Variable number within a context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarId(pub u32);

/// Id of an interned atom.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtomId(pub(crate) u32);

impl AtomId {
    /// `[]`
    pub const NIL: Self = Self(0);
    /// `'.'`, the list constructor.
    pub const DOT: Self = Self(1);
    /// `-`, used for `Var-Value` pairs.
    pub const MINUS: Self = Self(2);
    /// `_`, the anonymous variable name.
    pub const ANON: Self = Self(3);

    /// Names interned by every heap, in id order.
    pub(crate) const WELL_KNOWN: [&'static str; 4] = ["[]", ".", "-", "_"];
}

/// A cell together with the context its variables are resolved in.
///
/// This is the unit every algorithm in the crate works on: the same
/// cells read under two different contexts denote different terms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TermRef {
    pub cell: CellRef,
    pub ctx: Ctx,
}

impl TermRef {
    #[inline]
    pub fn new(cell: CellRef, ctx: Ctx) -> Self {
        Self { cell, ctx }
    }
}

/// A variable identity: its number within the context that owns it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarKey {
    pub ctx: Ctx,
    pub id: VarId,
}

impl Cell {
    /// Returns the tag of this cell.
    #[inline]
    pub fn tag(&self) -> Tag {
        match self.0 {
            Handle::Var { .. } => Tag::Var,
            Handle::Atom(_) => Tag::Atom,
            Handle::Func { .. } => Tag::Func,
            Handle::Int(_) => Tag::Int,
            Handle::BigInt(_) => Tag::BigInt,
            Handle::Real(_) => Tag::Real,
            Handle::Str(_) => Tag::Str,
        }
    }

    /// Returns `true` if the cell is a variable.
    #[inline]
    pub fn is_var(&self) -> bool {
        matches!(self.0, Handle::Var { .. })
    }

    /// Returns `true` if the cell is an atom, interned or owned.
    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self.0, Handle::Atom(_))
    }

    /// Returns `true` if the cell is the head of a compound term.
    #[inline]
    pub fn is_structure(&self) -> bool {
        matches!(self.0, Handle::Func { .. })
    }

    /// Returns `true` if the cell is a list constructor `'.'/2`.
    #[inline]
    pub fn is_list(&self) -> bool {
        matches!(
            self.0,
            Handle::Func {
                name: AtomId::DOT,
                arity: 2,
                ..
            }
        )
    }

    /// Returns `true` if the cell is a machine integer.
    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self.0, Handle::Int(_))
    }

    /// Returns `true` if the cell is an arbitrary-precision integer.
    #[inline]
    pub fn is_bigint(&self) -> bool {
        matches!(self.0, Handle::BigInt(_))
    }

    /// Returns `true` if the cell is an integer of either representation.
    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(self.0, Handle::Int(_) | Handle::BigInt(_))
    }

    /// Returns `true` if the cell is a floating point number.
    #[inline]
    pub fn is_real(&self) -> bool {
        matches!(self.0, Handle::Real(_))
    }

    /// Returns `true` if the cell is any kind of number.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self.0, Handle::Int(_) | Handle::BigInt(_) | Handle::Real(_))
    }

    /// Returns `true` if the cell is a compact string.
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self.0, Handle::Str(_))
    }

    /// Returns `true` for atoms, numbers and strings.
    #[inline]
    pub fn is_atomic(&self) -> bool {
        !matches!(self.0, Handle::Var { .. } | Handle::Func { .. })
    }

    /// Returns the variable number if this cell is a variable.
    #[inline]
    pub fn var_id(&self) -> Option<VarId> {
        match self.0 {
            Handle::Var { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Returns the functor name if this cell is a compound head.
    #[inline]
    pub fn functor(&self) -> Option<AtomId> {
        match self.0 {
            Handle::Func { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the arity.  Atoms, numbers, strings and variables have
    /// arity 0.
    #[inline]
    pub fn arity(&self) -> u32 {
        match self.0 {
            Handle::Func { arity, .. } => arity,
            _ => 0,
        }
    }

    /// Returns the number of cells occupied by this cell's subtree,
    /// including the cell itself.
    #[inline]
    pub fn size(&self) -> u32 {
        match self.0 {
            Handle::Func { size, .. } => size,
            _ => 1,
        }
    }

    /// Byte length of a compact string; 0 for every other cell.
    #[inline]
    pub(crate) fn str_len(&self) -> u32 {
        match self.0 {
            Handle::Str(slice) => slice.len,
            _ => 0,
        }
    }

    /// Returns a string describing the kind of this cell.
    #[inline]
    pub fn kind_name(&self) -> &'static str {
        match self.0 {
            Handle::Var { .. } => "var",
            Handle::Atom(_) => "atom",
            Handle::Func { .. } => "compound",
            Handle::Int(_) => "integer",
            Handle::BigInt(_) => "bigint",
            Handle::Real(_) => "float",
            Handle::Str(_) => "string",
        }
    }
}

/// Implements the standard [`Debug`] formatter for [`Cell`].
///
/// The output shows the tag and raw payload of the cell; names are
/// printed as ids because resolving them needs the heap.  Use
/// [`Query::display`](crate::Query::display) for a readable rendering.
impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Handle::Var { id, name } => f
                .debug_struct("Var")
                .field("id", &id.0)
                .field("name", &name.0)
                .finish(),
            Handle::Atom(Name::Interned(a)) => f.debug_tuple("Atom").field(&a.0).finish(),
            Handle::Atom(Name::Owned(s)) => f
                .debug_struct("AtomOwned")
                .field("index", &s.index)
                .field("len", &s.len)
                .finish(),
            Handle::Func { name, arity, size } => f
                .debug_struct("Func")
                .field("name", &name.0)
                .field("arity", &arity)
                .field("size", &size)
                .finish(),
            Handle::Int(i) => f.debug_tuple("Int").field(&i).finish(),
            Handle::BigInt(b) => f.debug_tuple("BigInt").field(&b).finish(),
            Handle::Real(r) => f.debug_tuple("Real").field(&r).finish(),
            Handle::Str(s) => f
                .debug_struct("Str")
                .field("index", &s.index)
                .field("len", &s.len)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_size_is_16_bytes() {
        assert_eq!(core::mem::size_of::<Cell>(), 16);
    }

    #[test]
    fn option_cell_size_is_16_bytes() {
        assert_eq!(core::mem::size_of::<Option<Cell>>(), 16);
    }

    #[test]
    fn tags_and_predicates_agree() {
        let var = Cell(Handle::Var {
            id: VarId(3),
            name: AtomId::ANON,
        });
        let int = Cell(Handle::Int(7));
        let big = Cell(Handle::BigInt(0));
        let real = Cell(Handle::Real(1.5));
        let atom = Cell(Handle::Atom(Name::Interned(AtomId::NIL)));
        let str = Cell(Handle::Str(Slice { index: 0, len: 3 }));
        let cons = Cell(Handle::Func {
            name: AtomId::DOT,
            arity: 2,
            size: 3,
        });

        assert_eq!(var.tag(), Tag::Var);
        assert_eq!(var.var_id(), Some(VarId(3)));
        assert!(int.is_integer() && int.is_int() && !int.is_bigint());
        assert!(big.is_integer() && big.is_bigint() && big.is_number());
        assert!(real.is_number() && !real.is_integer());
        assert!(atom.is_atom() && atom.is_atomic());
        assert!(str.is_string() && str.is_atomic());
        assert!(cons.is_structure() && cons.is_list());
        assert_eq!(cons.arity(), 2);
        assert_eq!(cons.size(), 3);
        assert_eq!(cons.functor(), Some(AtomId::DOT));
    }

    #[test]
    fn arity_and_size_of_leaves() {
        for cell in [
            Cell(Handle::Int(1)),
            Cell(Handle::Real(0.0)),
            Cell(Handle::Atom(Name::Interned(AtomId::MINUS))),
            Cell(Handle::Str(Slice { index: 0, len: 0 })),
            Cell(Handle::Var {
                id: VarId(0),
                name: AtomId::ANON,
            }),
        ] {
            assert_eq!(cell.arity(), 0);
            assert_eq!(cell.size(), 1);
            assert_eq!(cell.functor(), None);
        }
    }

    #[test]
    fn kind_names() {
        assert_eq!(Cell(Handle::Int(1)).kind_name(), "integer");
        assert_eq!(Cell(Handle::Real(1.0)).kind_name(), "float");
        assert_eq!(
            Cell(Handle::Func {
                name: AtomId::MINUS,
                arity: 2,
                size: 3
            })
            .kind_name(),
            "compound"
        );
    }
}
