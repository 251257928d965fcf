//! The untyped intermediate representation: immutable, arena-indexed cons
//! cells with source provenance and an `origin` back-pointer.
//!
//! `Cell` mirrors a classic Lisp pair `(head . rest)`, printed in prefix
//! notation for debugging but never parsed back — it is pure data threaded
//! through the pipeline. The parser builds cells bottom-up; the typed-AST
//! builder (`build.rs`) walks them read-only; transformers (`fold.rs`,
//! `cps.rs`) allocate *new* cells that point back at the ones they replace
//! via `origin`, so diagnostics can always walk back to a source-backed node.

use std::fmt;

use crate::source::SourceRef;

/// Arena index into an [`IrArena`]. Cheap, `Copy`, and stable for the
/// lifetime of the compilation unit that produced the arena — exactly the
/// "weak/indexed reference, never ownership cycle" pattern `DESIGN NOTES`
/// calls for with cyclic-looking `origin` back-pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IrId(u32);

impl IrId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A tagged atom or list head. `Sym` covers keywords/operators/identifiers in
/// the S-expression printing; `Nil` is the unique empty list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Atom {
    Nil,
    Sym(&'static str),
    Str(String),
    Num(f64),
    BigInt(String),
    Bool(bool),
    /// Carries an arbitrary typed AST or value payload that doesn't need its
    /// own IR shape (e.g. a pre-resolved identifier). Kept minimal: the
    /// builder is expected to recognize shapes by `Sym` head, not by this.
    Opaque,
}

#[derive(Debug, Clone)]
pub(crate) struct Cell {
    pub head: Atom,
    /// Children of this cell, in order. A `Nil` atom with an empty `rest`
    /// is the canonical empty list.
    pub rest: Vec<IrId>,
    pub source_ref: Option<SourceRef>,
    /// The cell this one was derived from by a transformer, if any.
    pub origin: Option<IrId>,
}

/// Owns every [`Cell`] allocated while compiling one source text. Cells are
/// append-only and never mutated in place, so `IrId`s remain valid for the
/// arena's whole lifetime — including `origin` links created by later
/// transformation passes over earlier ones.
#[derive(Default)]
pub(crate) struct IrArena {
    cells: Vec<Cell>,
}

impl IrArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, head: Atom, rest: Vec<IrId>, source_ref: Option<SourceRef>) -> IrId {
        self.cells.push(Cell { head, rest, source_ref, origin: None });
        IrId(self.cells.len() as u32 - 1)
    }

    /// Allocates a cell derived from `origin` by a transformer pass.
    pub fn alloc_derived(&mut self, head: Atom, rest: Vec<IrId>, source_ref: Option<SourceRef>, origin: IrId) -> IrId {
        let id = self.alloc(head, rest, source_ref);
        self.cells[id.index()].origin = Some(origin);
        id
    }

    pub fn get(&self, id: IrId) -> &Cell {
        &self.cells[id.index()]
    }

    /// Walks the `origin` chain from `id` until it finds a cell carrying a
    /// `source_ref`, matching §7's "walk the origin chain until one is
    /// found" policy for locating a diagnostic's best source position.
    pub fn nearest_source_ref(&self, id: IrId) -> Option<&SourceRef> {
        let mut current = Some(id);
        while let Some(cur) = current {
            let cell = self.get(cur);
            if let Some(sref) = &cell.source_ref {
                return Some(sref);
            }
            current = cell.origin;
        }
        None
    }

    /// Renders a cell (and its children) as Lisp-style prefix notation, for
    /// debugging and for the `Unknown` AST escape hatch's `Debug` impl.
    pub fn print(&self, id: IrId) -> String {
        let mut out = String::new();
        self.print_into(id, &mut out);
        out
    }

    fn print_into(&self, id: IrId, out: &mut String) {
        let cell = self.get(id);
        match &cell.head {
            Atom::Nil if cell.rest.is_empty() => out.push_str("()"),
            _ => {
                out.push('(');
                write_atom(&cell.head, out);
                for child in &cell.rest {
                    out.push(' ');
                    self.print_into(*child, out);
                }
                out.push(')');
            }
        }
    }
}

fn write_atom(atom: &Atom, out: &mut String) {
    use std::fmt::Write as _;
    match atom {
        Atom::Nil => out.push_str("nil"),
        Atom::Sym(s) => out.push_str(s),
        Atom::Str(s) => {
            let _ = write!(out, "{s:?}");
        }
        Atom::Num(n) => {
            let _ = write!(out, "{n}");
        }
        Atom::BigInt(s) => {
            let _ = write!(out, "{s}n");
        }
        Atom::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Atom::Opaque => out.push_str("#<opaque>"),
    }
}

impl fmt::Debug for IrArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrArena").field("len", &self.cells.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceHandle;

    #[test]
    fn prints_prefix_notation() {
        let mut arena = IrArena::new();
        let one = arena.alloc(Atom::Num(1.0), vec![], None);
        let two = arena.alloc(Atom::Num(2.0), vec![], None);
        let add = arena.alloc(Atom::Sym("+"), vec![one, two], None);
        assert_eq!(arena.print(add), "(+ 1 2)");
    }

    #[test]
    fn origin_chain_finds_source() {
        let mut arena = IrArena::new();
        let handle = SourceHandle::new("t.js", "1");
        let sref = SourceRef::new(handle, 0, 1, 1, 0);
        let original = arena.alloc(Atom::Num(1.0), vec![], Some(sref));
        let derived = arena.alloc_derived(Atom::Num(1.0), vec![], None, original);
        let derived2 = arena.alloc_derived(Atom::Num(1.0), vec![], None, derived);
        assert!(arena.nearest_source_ref(derived2).is_some());
    }
}
