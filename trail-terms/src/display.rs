//! Defines [`TermDisplay`], a formatter for rendering terms through
//! their bindings.
//!
//! Unbound variables print as `_G` followed by their slot index.
//! Nesting and list length are cut off at a depth bound, so cyclic terms
//! print finitely with `...` where the walk stopped.  Formatting recurses
//! on the native stack, so the default bound is the smaller of the
//! query's depth bound and [`DISPLAY_DEPTH`].

use crate::{CellRef, Query, Store, TermRef, View};
use std::fmt;

/// Default nesting printed before `...`.
pub const DISPLAY_DEPTH: usize = 256;

/// A term paired with the query whose bindings it is read under.
///
/// Implements [`fmt::Display`]:
/// ```
/// # use trail_terms::Query;
/// let mut q = Query::new();
/// let one = q.heap_mut().int(1);
/// let s = q.heap_mut().str("hi");
/// let t = q.heap_mut().func("foo", &[one, s]);
/// assert_eq!(q.display(q.at(t)).to_string(), "foo(1, \"hi\")");
/// ```
///
/// Construct instances via [`Query::display`].
pub struct TermDisplay<'a> {
    query: &'a Query,
    term: TermRef,
    max_depth: usize,
}

impl Query {
    /// Returns a [`TermDisplay`] for `t`, cut off at the query's depth
    /// bound or [`DISPLAY_DEPTH`], whichever is smaller.
    #[inline]
    pub fn display(&self, t: TermRef) -> TermDisplay<'_> {
        TermDisplay {
            query: self,
            term: t,
            max_depth: self.config.max_depth.min(DISPLAY_DEPTH),
        }
    }
}

impl TermDisplay<'_> {
    /// Overrides the nesting and list length printed before `...`.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn write_term(&self, f: &mut fmt::Formatter<'_>, t: TermRef, depth: usize) -> fmt::Result {
        if depth >= self.max_depth {
            return f.write_str("...");
        }
        let q = self.query;
        let t = q.deref(t);
        match q.heap.view(t.cell) {
            View::Var(..) => match Store::var_key(&q.heap, t) {
                Some(key) => write!(f, "_G{}", q.store.slot_index(key)),
                None => f.write_str("_"),
            },
            View::Atom(a) => write_atom_str(f, a),
            View::Int(i) => write!(f, "{i}"),
            View::BigInt(i) => write!(f, "{i}"),
            View::Real(r) => {
                if r.fract() == 0.0 {
                    write!(f, "{:.1}", r)
                } else {
                    write!(f, "{}", r)
                }
            }
            View::Str(s) => write_str_quoted(f, s),
            View::Func(".", args) if args.len() == 2 => self.write_list(f, t, depth),
            View::Func(name, args) => {
                write_atom_str(f, name)?;
                f.write_str("(")?;
                for (i, arg) in args.enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.write_term(f, TermRef::new(arg, t.ctx), depth + 1)?;
                }
                f.write_str(")")
            }
        }
    }

    /// Writes the list starting at the dereferenced list cell `t`.
    fn write_list(&self, f: &mut fmt::Formatter<'_>, t: TermRef, depth: usize) -> fmt::Result {
        let q = self.query;
        f.write_str("[")?;
        let mut cur = t;
        let mut n = 0;
        loop {
            let mut args = q.heap.view(cur.cell).args();
            let (Some(head), Some(tail)) = (args.next(), args.next()) else {
                break;
            };
            if n > 0 {
                f.write_str(", ")?;
            }
            self.write_term(f, TermRef::new(head, cur.ctx), depth + 1)?;
            n += 1;

            let tail = q.deref(TermRef::new(tail, cur.ctx));
            if !q.heap.cell(tail.cell).is_list() {
                if !matches!(q.heap.view(tail.cell), View::Atom("[]") | View::Str("")) {
                    f.write_str(" | ")?;
                    self.write_term(f, tail, depth + 1)?;
                }
                break;
            }
            if n >= self.max_depth {
                f.write_str(" | ...")?;
                break;
            }
            cur = tail;
        }
        f.write_str("]")
    }
}

fn is_unquoted_atom(s: &str) -> bool {
    const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&$";
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        Some(_) => s.chars().all(|c| SYMBOL_CHARS.contains(c)),
        None => false,
    }
}

fn write_atom_str(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if s == "[]" || s == "!" || s == ";" || is_unquoted_atom(s) {
        f.write_str(s)
    } else {
        let escaped = s.replace('\'', "\\'");
        write!(f, "'{}'", escaped)
    }
}

fn write_str_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02X}\\", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    f.write_str(&out)
}

/// Implements [`fmt::Display`] for [`TermDisplay`], enabling it to be
/// formatted and printed with standard formatting macros.
impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_term(f, self.term, 0)
    }
}

impl fmt::Debug for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermDisplay({})", self)
    }
}

impl Query {
    /// Renders `t` as a `String`; shorthand for `display(t).to_string()`.
    pub fn render(&self, t: TermRef) -> String {
        self.display(t).to_string()
    }

    /// Renders the cell `c` read in the current frame.
    pub fn render_cell(&self, c: CellRef) -> String {
        self.render(self.at(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atoms_numbers_and_strings() {
        let mut q = Query::new();
        let h = q.heap_mut();
        let a = h.atom("a");
        let quoted = h.atom("Hello world");
        let apos = h.atom("it's");
        let plus = h.atom("+");
        let s = h.str("line\n\"x\"");
        let whole = h.real(1.0);
        let half = h.real(2.5);
        let big = h.bigint(num_bigint::BigInt::from(u64::MAX) * 4u32);
        let t = h.func("f", &[a, quoted, apos, plus, s, whole, half, big]);
        assert_eq!(
            q.render_cell(t),
            "f(a, 'Hello world', 'it\\'s', +, \"line\\n\\\"x\\\"\", 1.0, 2.5, 73786976294838206460)"
        );
    }

    #[test]
    fn lists() {
        let mut q = Query::new();
        let x = q.fresh_var();
        let h = q.heap_mut();
        let one = h.int(1);
        let two = h.int(2);
        let proper = h.list(&[one, two]);
        let partial = h.list_with_tail(&[one], x.cell);
        let empty = h.str("");
        let nil = h.list(&[]);
        let codes = h.str("ab");
        let onto_string = h.list_with_tail(&[one], codes);

        assert_eq!(q.render_cell(proper), "[1, 2]");
        assert_eq!(q.render_cell(partial), "[1 | _G0]");
        assert_eq!(q.render_cell(empty), "\"\"");
        assert_eq!(q.render_cell(nil), "[]");
        assert_eq!(q.render_cell(onto_string), "[1 | \"ab\"]");
    }

    #[test]
    fn follows_bindings_and_names_vars() {
        let mut q = Query::new();
        let x = q.fresh_var();
        let y = q.fresh_var();
        let z = q.fresh_var();
        let gy = q.heap_mut().func("g", &[y.cell]);
        let t = q.heap_mut().func("f", &[x.cell, z.cell]);
        assert!(q.unify(x, q.at(gy)));
        assert_eq!(q.render_cell(t), "f(g(_G1), _G2)");
        assert!(q.unify(z, y));
        assert_eq!(q.render_cell(t), "f(g(_G1), _G1)");
    }

    #[test]
    fn cyclic_terms_print_finitely() {
        let mut q = Query::new();
        let x = q.fresh_var();
        let fx = q.heap_mut().func("f", &[x.cell]);
        assert!(q.unify(x, q.at(fx)));
        assert_eq!(q.display(x).max_depth(3).to_string(), "f(f(f(...)))");

        let y = q.fresh_var();
        let a = q.heap_mut().atom("a");
        let ring = q.heap_mut().list_with_tail(&[a], y.cell);
        assert!(q.unify(y, q.at(ring)));
        assert_eq!(q.display(y).max_depth(3).to_string(), "[a, a, a | ...]");
    }

    #[test]
    fn default_bound_is_config_depth() {
        let mut q = Query::with_config(crate::QueryConfig {
            max_depth: 2,
            ..crate::QueryConfig::default()
        });
        let one = q.heap_mut().int(1);
        let inner = q.heap_mut().func("g", &[one]);
        let t = q.heap_mut().func("f", &[inner]);
        assert_eq!(q.render_cell(t), "f(g(...))");
    }

    #[test]
    fn deep_terms_are_cut_at_display_depth() {
        let mut q = Query::new();
        let mut b = q.heap_mut().builder();
        for _ in 0..(DISPLAY_DEPTH + 5) {
            b.open("s", 1);
        }
        b.int(0);
        let t = b.finish().unwrap();
        let text = q.render_cell(t);
        assert!(text.contains("s(...)"));
        assert_eq!(text.matches("s(").count(), DISPLAY_DEPTH);
    }
}
