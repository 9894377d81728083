//! The compiler session: one instance per compiler run, passed explicitly
//! to every pipeline stage. Owns the options, the diagnostic sink and the
//! identifier interner. There are no process-wide globals.

use std::cell::RefCell;

use crate::compiler::Options;
use crate::diagnostics::Diagnostics;
use crate::intern::{Ident, Interner, Symbol};
use crate::token::KEYWORDS;

/// Symbols the pipeline compares against by identity.
#[derive(Debug)]
pub struct WellKnown {
    pub define: Symbol,
    pub undef: Symbol,
    /// The only type specifier this core recognizes.
    pub int_type: Symbol,
}

pub struct Session {
    pub options: Options,
    pub diags: Diagnostics,
    pub syms: WellKnown,
    interner: RefCell<Interner>,
}

impl Session {
    pub fn new(options: Options) -> Self {
        let keyword_spellings: Vec<&str> = KEYWORDS.iter().map(|(spelling, _)| *spelling).collect();
        let mut interner = Interner::prefilled(&keyword_spellings);

        let syms = WellKnown {
            define: interner.intern("define").sym,
            undef: interner.intern("undef").sym,
            int_type: interner.intern("int").sym,
        };

        let diags = Diagnostics::new(options.colored_output, options.display_surrounding_lines);

        Self {
            options,
            diags,
            syms,
            interner: RefCell::new(interner),
        }
    }

    pub fn intern(&self, text: &str) -> Ident {
        self.interner.borrow_mut().intern(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_symbols_match_interned_text() {
        let sess = Session::new(Options::default());
        assert_eq!(sess.intern("define").sym, sess.syms.define);
        assert_eq!(sess.intern("int").sym, sess.syms.int_type);
        assert_ne!(sess.syms.define, sess.syms.undef);
    }

    #[test]
    fn keywords_are_pre_interned() {
        let sess = Session::new(Options::default());
        for (spelling, _) in KEYWORDS {
            // Pre-filled symbols occupy the first slots, in table order.
            assert!(sess.intern(spelling).sym.index() < KEYWORDS.len());
        }
    }
}
