//! Identifier interning.
//!
//! Every identifier and keyword spelling is canonicalized to a single
//! `Rc<str>` and a small `Symbol` handle. Two interned names are equal iff
//! their symbols are equal, so the preprocessor and parser never compare
//! strings on hot paths (macro lookup, parameter matching, type
//! recognition all go through `Symbol`).

use std::collections::HashMap;
use std::rc::Rc;

/// Handle to an interned name. Index into the interner's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An interned identifier as carried by tokens: the symbol plus a shared
/// handle on the canonical spelling.
#[derive(Debug, Clone)]
pub struct Ident {
    pub sym: Symbol,
    pub text: Rc<str>,
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.sym == other.sym
    }
}

impl Eq for Ident {}

#[derive(Debug, Default)]
pub struct Interner {
    map: HashMap<Rc<str>, Symbol>,
    names: Vec<Rc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interner seeded with well-known spellings, in order, so their
    /// symbols are predictable.
    pub fn prefilled(names: &[&str]) -> Self {
        let mut interner = Self::new();
        for name in names {
            interner.intern(name);
        }
        interner
    }

    pub fn intern(&mut self, text: &str) -> Ident {
        if let Some(&sym) = self.map.get(text) {
            return Ident {
                sym,
                text: Rc::clone(&self.names[sym.index()]),
            };
        }
        let sym = Symbol(self.names.len() as u32);
        let text: Rc<str> = Rc::from(text);
        self.names.push(Rc::clone(&text));
        self.map.insert(Rc::clone(&text), sym);
        Ident { sym, text }
    }

    /// Looks up a spelling without interning it.
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.map.get(text).copied()
    }

    pub fn resolve(&self, sym: Symbol) -> Rc<str> {
        Rc::clone(&self.names[sym.index()])
    }
}
