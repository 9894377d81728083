//! Preprocessor: directive handling and macro expansion.
//!
//! Tokens are drawn from a stack of token-list frames; when the stack is
//! empty they come from the lexer. Expanding a macro pushes a frame holding
//! the expansion and locks the macro; the lock is released when that frame
//! is popped, which happens lazily on the fetch after its last token, so a
//! macro can never re-expand inside its own expansion.
//!
//! `#define` and `#undef` are implemented. Every other directive word is
//! reported and discarded to the end of its line. A `#` only opens a
//! directive at the beginning of a logical line.

use std::cell::Cell;
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

use crate::diagnostics::Location;
use crate::intern::{Ident, Symbol};
use crate::lexer::Lexer;
use crate::session::Session;
use crate::token::{Token, TokenType};

/// A macro record. `definition` holds the parameter tokens followed by the
/// body tokens; `params` and `body` are index ranges into it.
#[derive(Debug)]
pub struct Macro {
    pub name: Ident,
    pub is_function_like: bool,
    definition: Vec<Token>,
    params: Range<usize>,
    body: Range<usize>,
    pub loc: Location,
    /// Held while an expansion frame for this macro is on the stack.
    cannot_expand: Cell<bool>,
}

impl Macro {
    fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Index of the parameter this token names, by interned symbol.
    fn param_index_of(&self, token: &Token) -> Option<usize> {
        let ident = token.ident()?;
        for (index, param_index) in self.params.clone().enumerate() {
            let param = self.definition[param_index]
                .ident()
                .expect("macro parameters are identifiers");
            if param.sym == ident.sym {
                return Some(index);
            }
        }
        None
    }

    /// True when the parameter appears next to a `##` in the body. Such
    /// arguments are captured verbatim: paste operands are never
    /// macro-expanded beforehand.
    fn param_is_concat_operand(&self, param_index: usize) -> bool {
        let param = match self.params.clone().nth(param_index) {
            Some(index) => self.definition[index]
                .ident()
                .expect("macro parameters are identifiers")
                .sym,
            None => return false,
        };
        for i in self.body.clone() {
            let names_param = self.definition[i]
                .ident()
                .map(|ident| ident.sym == param)
                .unwrap_or(false);
            if !names_param {
                continue;
            }
            if i > self.body.start && self.definition[i - 1].ty == TokenType::DoubleHash {
                return true;
            }
            if i + 1 < self.body.end && self.definition[i + 1].ty == TokenType::DoubleHash {
                return true;
            }
        }
        false
    }
}

/// One source of tokens on the fetch stack.
struct TokenFrame {
    tokens: Vec<Token>,
    cursor: usize,
    /// Set when the frame is a macro expansion; unlocked on pop.
    macro_ref: Option<Rc<Macro>>,
}

pub struct Preprocessor<'s> {
    sess: &'s Session,
    lex: Lexer<'s>,
    /// Secondary lexer swapped in to re-tokenize `##` paste results.
    concat_lex: Lexer<'s>,
    concat_buffer: String,
    macros: HashMap<Symbol, Rc<Macro>>,
    stack: Vec<TokenFrame>,
    cur: Token,
}

impl<'s> Preprocessor<'s> {
    pub fn new(sess: &'s Session, content: Rc<str>, path: Rc<str>) -> Self {
        let start = Location::start_of(Rc::clone(&path), Rc::clone(&content));
        Self {
            sess,
            lex: Lexer::new(sess, content, path),
            concat_lex: Lexer::new(sess, Rc::from(""), Rc::from("<paste>")),
            concat_buffer: String::new(),
            macros: HashMap::new(),
            stack: Vec::new(),
            cur: Token::eof(start),
        }
    }

    /// Next token with directives resolved and macros expanded. Whitespace,
    /// newline and comment tokens still flow through; use
    /// [`Self::next_parse_token`] for the parser-facing stream.
    pub fn next_token(&mut self) -> Token {
        self.advance_normal();

        // Expansion can produce new expandable identifiers; retry until the
        // current token stands.
        while self.try_expand() {
            self.advance_raw();
        }

        self.cur.clone()
    }

    /// Next significant token: trivia is skipped and folded into the
    /// `previous_was_space` flag of the token that follows it.
    pub fn next_parse_token(&mut self) -> Token {
        let mut was_space = false;
        loop {
            let mut tok = self.next_token();
            if tok.is_trivia() {
                was_space = true;
                continue;
            }
            tok.previous_was_space = tok.previous_was_space || was_space;
            return tok;
        }
    }

    pub fn is_defined(&self, sym: Symbol) -> bool {
        self.macros.contains_key(&sym)
    }

    // ------------------------------------------------------------------
    // Token sourcing
    // ------------------------------------------------------------------

    /// Fetches from the frame stack, falling back to the lexer. Exhausted
    /// frames are popped here, unlocking their macro, so the last token of
    /// an expansion is still delivered under the lock.
    fn advance_raw(&mut self) -> &Token {
        loop {
            let exhausted = match self.stack.last() {
                Some(frame) => frame.cursor >= frame.tokens.len(),
                None => {
                    self.cur = self.lex.next().clone();
                    return &self.cur;
                }
            };

            if exhausted {
                let frame = self.stack.pop().expect("frame just observed");
                if let Some(m) = frame.macro_ref {
                    m.cannot_expand.set(false);
                }
                continue;
            }

            let frame = self.stack.last_mut().expect("frame just observed");
            self.cur = frame.tokens[frame.cursor].clone();
            frame.cursor += 1;
            return &self.cur;
        }
    }

    /// Raw fetch plus directive resolution.
    fn advance_normal(&mut self) -> &Token {
        self.advance_raw();

        while self.cur.ty == TokenType::Hash && self.cur.beginning_of_line {
            if !self.parse_directive() {
                self.cur = Token::eof(self.lex.location());
                return &self.cur;
            }
            if self.cur.is_eof() {
                return &self.cur;
            }
            self.advance_raw();
        }

        &self.cur
    }

    /// Fetch for directive bodies (newlines terminate) or macro arguments
    /// (newlines are just space). Skipped trivia becomes the
    /// `previous_was_space` flag of the returned token.
    fn advance_skipping(&mut self, skip_newlines: bool) -> &Token {
        self.advance_normal();
        let mut was_space = false;
        while matches!(
            self.cur.ty,
            TokenType::HorizontalWhitespace | TokenType::Comment
        ) || (skip_newlines && self.cur.ty == TokenType::NewLine)
        {
            was_space = true;
            self.advance_normal();
        }
        if was_space {
            self.cur.previous_was_space = true;
        }
        &self.cur
    }

    fn push_frame(&mut self, tokens: Vec<Token>, macro_ref: Option<Rc<Macro>>) {
        if let Some(m) = &macro_ref {
            m.cannot_expand.set(true);
        }
        self.stack.push(TokenFrame {
            tokens,
            cursor: 0,
            macro_ref,
        });
    }

    // ------------------------------------------------------------------
    // Directives
    // ------------------------------------------------------------------

    /// Current token is a `#` opening a logical line. Returns false on an
    /// error that aborts the translation unit.
    fn parse_directive(&mut self) -> bool {
        self.advance_skipping(false); // skip '#'

        if self.cur.is_keyword_or_identifier() {
            let ident = self.cur.ident().expect("just checked").clone();
            if ident.sym == self.sess.syms.define {
                self.advance_skipping(false); // skip 'define'
                if !self.parse_macro_definition() {
                    return false;
                }
            } else if ident.sym == self.sess.syms.undef {
                self.parse_undef();
            } else {
                self.sess.diags.error_at(
                    &self.cur.loc,
                    format!("unknown directive '#{}'.", ident.text),
                );
                self.skip_to_end_of_line();
            }
        }

        // All directives must end at a new line or EOF.
        if !matches!(self.cur.ty, TokenType::NewLine | TokenType::Eof) {
            self.sess
                .diags
                .error("internal error: directive did not end with a new line.");
            return false;
        }
        true
    }

    fn parse_macro_definition(&mut self) -> bool {
        if !self.expect(TokenType::Identifier) {
            return false;
        }
        let name = self.cur.ident().expect("identifier token").clone();
        let loc = self.cur.loc.clone();

        let mut definition: Vec<Token> = Vec::new();
        let mut is_function_like = false;

        // A '(' only makes the macro function-like when it is glued to the
        // name, so fetch the next token without skipping whitespace.
        self.advance_raw();
        if self.cur.ty == TokenType::ParenL {
            is_function_like = true;
            if !self.parse_macro_parameters(&mut definition) {
                return false;
            }
        } else if matches!(
            self.cur.ty,
            TokenType::HorizontalWhitespace | TokenType::Comment
        ) {
            self.advance_skipping(false); // move onto the body
        }
        let params = 0..definition.len();

        let body_start = definition.len();
        if !self.parse_macro_body(&loc, &mut definition) {
            return false;
        }
        let body = body_start..definition.len();

        // Redefinition silently replaces: same spelling, same key.
        self.macros.insert(
            name.sym,
            Rc::new(Macro {
                name,
                is_function_like,
                definition,
                params,
                body,
                loc,
                cannot_expand: Cell::new(false),
            }),
        );
        true
    }

    fn parse_macro_parameters(&mut self, definition: &mut Vec<Token>) -> bool {
        // Current token is '('.
        self.advance_skipping(false);

        if self.cur.ty == TokenType::Identifier {
            definition.push(self.cur.clone());
            self.advance_skipping(false);

            while self.cur.ty == TokenType::Comma {
                self.advance_skipping(false);
                if !self.cur.is_keyword_or_identifier() {
                    break;
                }
                definition.push(self.cur.clone());
                self.advance_skipping(false);
            }
        }

        if !self.expect(TokenType::ParenR) {
            return false;
        }
        self.advance_skipping(false);
        true
    }

    /// Collects body tokens until the end of the line. `##` may not sit at
    /// either end of the body.
    fn parse_macro_body(&mut self, macro_loc: &Location, definition: &mut Vec<Token>) -> bool {
        if matches!(self.cur.ty, TokenType::Eof | TokenType::NewLine) {
            return true; // empty body
        }

        if self.cur.ty == TokenType::DoubleHash {
            self.sess.diags.error_at(
                macro_loc,
                "'##' cannot appear at either end of a macro expansion.",
            );
            return false;
        }

        let mut first = self.cur.clone();
        first.previous_was_space = false;
        definition.push(first);
        self.advance_skipping(false);

        while !matches!(self.cur.ty, TokenType::Eof | TokenType::NewLine) {
            definition.push(self.cur.clone());
            self.advance_skipping(false);
        }

        if definition.last().map(|t| t.ty) == Some(TokenType::DoubleHash) {
            self.sess.diags.error_at(
                macro_loc,
                "'##' cannot appear at either end of a macro expansion.",
            );
            return false;
        }
        true
    }

    fn parse_undef(&mut self) {
        self.advance_skipping(false); // skip 'undef'

        if !self.expect(TokenType::Identifier) {
            self.skip_to_end_of_line();
            return;
        }
        let name = self.cur.ident().expect("identifier token").clone();
        self.advance_skipping(false);

        if !matches!(self.cur.ty, TokenType::NewLine | TokenType::Eof) {
            self.sess
                .diags
                .warning("extra tokens at end of '#undef' directive.");
            self.skip_to_end_of_line();
        }

        // Unlink now; a frame still expanding this macro keeps the record
        // alive until it pops.
        self.macros.remove(&name.sym);
    }

    fn skip_to_end_of_line(&mut self) {
        while !matches!(self.cur.ty, TokenType::NewLine | TokenType::Eof) {
            self.advance_skipping(false);
        }
    }

    fn expect(&self, ty: TokenType) -> bool {
        if self.cur.ty == ty {
            return true;
        }
        self.sess.diags.error_at(
            &self.cur.loc,
            format!(
                "syntax error: expected '{}', actual '{}'.",
                ty.as_str(),
                self.cur.describe()
            ),
        );
        false
    }

    // ------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------

    /// Attempts to expand the current token. Returns true when an
    /// expansion was pushed (or the macro expanded to nothing) and the
    /// current token is therefore consumed.
    fn try_expand(&mut self) -> bool {
        if self.cur.cannot_expand {
            return false;
        }
        let Some(ident) = self.cur.ident() else {
            return false;
        };
        let Some(m) = self.macros.get(&ident.sym).map(Rc::clone) else {
            return false;
        };
        if m.cannot_expand.get() {
            // Re-scanned output of a live expansion: freeze the identifier
            // so it can never expand, even after the lock is gone.
            self.cur.cannot_expand = true;
            return false;
        }

        let identifier = self.cur.clone();
        if m.is_function_like {
            self.expand_function_like(identifier, m)
        } else {
            self.expand_object_like(&identifier, &m);
            true
        }
    }

    fn expand_object_like(&mut self, identifier: &Token, m: &Rc<Macro>) {
        if m.body.is_empty() {
            return; // expands to nothing, still counts as expanded
        }
        let expanded = self.expand_body(identifier, m, &[], &[]);
        self.push_frame(expanded, Some(Rc::clone(m)));
    }

    /// Looks ahead for a `(`. Without one a function-like macro name is
    /// ordinary text: the identifier and everything peeked past are pushed
    /// back so the caller re-reads the original sequence.
    fn expand_function_like(&mut self, identifier: Token, m: Rc<Macro>) -> bool {
        let mut skipped: Vec<Token> = Vec::new();
        loop {
            self.advance_normal();
            if self.cur.is_trivia() {
                skipped.push(self.cur.clone());
                continue;
            }
            break;
        }

        if self.cur.ty != TokenType::ParenL {
            let mut replay = skipped;
            replay.push(self.cur.clone());
            self.cur = identifier;
            self.push_frame(replay, None);
            return false;
        }

        self.expand_call(identifier, m)
    }

    /// Current token is the `(` of a macro call: collect the arguments and
    /// emit the expanded body.
    fn expand_call(&mut self, identifier: Token, m: Rc<Macro>) -> bool {
        self.advance_skipping(true); // skip '('

        let mut args: Vec<Token> = Vec::new();
        let mut ranges: Vec<Range<usize>> = Vec::new();
        let param_count = m.param_count();

        if param_count > 0 {
            let mut depth = 0usize;
            loop {
                let raw_capture = m.param_is_concat_operand(ranges.len());
                let start = args.len();

                loop {
                    if self.cur.is_eof() {
                        self.sess
                            .diags
                            .error_at(&self.cur.loc, "macro call does not end with ')'.");
                        return false;
                    }
                    if depth == 0
                        && matches!(self.cur.ty, TokenType::Comma | TokenType::ParenR)
                    {
                        break;
                    }
                    match self.cur.ty {
                        TokenType::ParenL => depth += 1,
                        TokenType::ParenR => depth -= 1,
                        _ => {}
                    }

                    // Arguments expand as they are collected, except paste
                    // operands which must keep their original spelling.
                    if raw_capture || !self.try_expand() {
                        args.push(self.cur.clone());
                    }
                    self.advance_skipping(true);
                }

                ranges.push(start..args.len());

                if self.cur.ty == TokenType::Comma && ranges.len() < param_count {
                    self.advance_skipping(true);
                    continue;
                }
                break;
            }

            if ranges.len() < param_count {
                self.sess
                    .diags
                    .error_at(&self.cur.loc, "macro call is missing arguments.");
                return false;
            }
        }

        if self.cur.ty != TokenType::ParenR {
            self.sess
                .diags
                .error_at(&self.cur.loc, "macro call does not end with ')'.");
            return false;
        }

        if m.body.is_empty() {
            return true; // expands to nothing
        }

        let expanded = self.expand_body(&identifier, &m, &args, &ranges);
        self.push_frame(expanded, Some(m));
        true
    }

    /// Walks the body, splicing argument ranges in place of parameters and
    /// folding `##` pastes. The first emitted token inherits the call
    /// site's leading-space flag.
    fn expand_body(
        &mut self,
        identifier: &Token,
        m: &Macro,
        args: &[Token],
        ranges: &[Range<usize>],
    ) -> Vec<Token> {
        let mut out: Vec<Token> = Vec::new();

        for i in m.body.clone() {
            let mut body_token = m.definition[i].clone();

            if let Some(param_index) = m.param_index_of(&body_token) {
                let range = ranges[param_index].clone();
                let lead_space = body_token.previous_was_space;
                for (k, j) in range.enumerate() {
                    let mut arg_token = args[j].clone();
                    if k == 0 {
                        arg_token.previous_was_space = lead_space;
                    }
                    self.push_expanded(&mut out, arg_token);
                }
            } else {
                if i == m.body.start {
                    body_token.previous_was_space = identifier.previous_was_space;
                }
                self.push_expanded(&mut out, body_token);
            }
        }

        // An argument that expanded to nothing can strand a trailing '##'.
        if out.last().map(|t| t.ty) == Some(TokenType::DoubleHash) {
            out.pop();
        }
        out
    }

    /// Appends a token to an expansion, concatenating when the previous
    /// appended token was `##`.
    fn push_expanded(&mut self, out: &mut Vec<Token>, token: Token) {
        if out.last().map(|t| t.ty) == Some(TokenType::DoubleHash) {
            out.pop(); // the '##' marker
            match out.pop() {
                Some(left) => self.concat(out, left, token),
                // Empty left operand: the paste reduces to the right side.
                None => out.push(token),
            }
        } else {
            out.push(token);
        }
    }

    /// Joins the verbatim spellings of `left` and `right` and re-tokenizes
    /// the paste with the secondary lexer. All resulting tokens are
    /// appended; the first keeps the left operand's leading-space flag.
    fn concat(&mut self, out: &mut Vec<Token>, left: Token, right: Token) {
        let previous_was_space = left.previous_was_space;

        self.concat_buffer.clear();
        left.write_verbatim(&mut self.concat_buffer);
        right.write_verbatim(&mut self.concat_buffer);

        self.concat_lex
            .set_content(Rc::from(self.concat_buffer.as_str()), Rc::from("<paste>"));
        self.lex.swap(&mut self.concat_lex);

        let mut first = true;
        loop {
            let mut tok = self.lex.next().clone();
            if tok.is_eof() {
                break;
            }
            if first {
                tok.previous_was_space = previous_was_space;
                first = false;
            }
            out.push(tok);
        }

        self.lex.swap(&mut self.concat_lex);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Options;

    fn preprocess(source: &str) -> (Vec<Token>, u32, u32) {
        let sess = Session::new(Options::default());
        let mut pp = Preprocessor::new(&sess, Rc::from(source), Rc::from("test.c"));
        let mut tokens = Vec::new();
        loop {
            let tok = pp.next_parse_token();
            if tok.is_eof() {
                break;
            }
            tokens.push(tok);
        }
        (tokens, sess.diags.error_count(), sess.diags.warning_count())
    }

    fn spellings(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn object_like_macro_expands_at_use() {
        let (tokens, errors, _) = preprocess("#define PI 314\nint x = PI;\n");
        assert_eq!(errors, 0);
        assert_eq!(spellings(&tokens), vec!["int", "x", "=", "314", ";"]);
    }

    #[test]
    fn empty_body_expands_to_nothing_every_time() {
        let (tokens, errors, _) = preprocess("#define X\nX X X\n");
        assert_eq!(errors, 0);
        assert!(tokens.is_empty());
    }

    #[test]
    fn empty_argument_expands_to_nothing() {
        let (tokens, errors, _) = preprocess("#define F(x) x\nF()\n");
        assert_eq!(errors, 0);
        assert!(tokens.is_empty());
    }

    #[test]
    fn concatenation_pastes_unexpanded_operands() {
        let source = "#define glue(a, b) a ## b\n#define HIGH 1\nglue(HIGH, 2)\n";
        let (tokens, errors, _) = preprocess(source);
        assert_eq!(errors, 0);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].ty, TokenType::Identifier);
        assert_eq!(tokens[0].ident().unwrap().text.as_ref(), "HIGH2");
    }

    #[test]
    fn self_referential_macro_expands_once() {
        let (tokens, errors, _) = preprocess("#define LOW LOW \", world\"\nLOW\n");
        assert_eq!(errors, 0);
        assert_eq!(spellings(&tokens), vec!["LOW", "\", world\""]);
        assert_eq!(tokens[0].ty, TokenType::Identifier);
        assert_eq!(tokens[1].ty, TokenType::LiteralString);
    }

    #[test]
    fn undef_removes_the_definition() {
        let (tokens, errors, _) = preprocess("#define M 1\nM\n#undef M\nM\n");
        assert_eq!(errors, 0);
        assert_eq!(spellings(&tokens), vec!["1", "M"]);
        assert_eq!(tokens[1].ty, TokenType::Identifier);
    }

    #[test]
    fn function_like_name_without_call_is_plain_text() {
        let (tokens, errors, _) = preprocess("#define F(x) x\nint F = 1;\n");
        assert_eq!(errors, 0);
        assert_eq!(spellings(&tokens), vec!["int", "F", "=", "1", ";"]);
    }

    #[test]
    fn arguments_are_expanded_when_not_paste_operands() {
        let source = "#define ONE 1\n#define wrap(x) (x)\nwrap(ONE)\n";
        let (tokens, errors, _) = preprocess(source);
        assert_eq!(errors, 0);
        assert_eq!(spellings(&tokens), vec!["(", "1", ")"]);
    }

    #[test]
    fn nested_parentheses_stay_inside_one_argument() {
        let source = "#define first(a, b) a\nfirst((1, 2), 3)\n";
        let (tokens, errors, _) = preprocess(source);
        assert_eq!(errors, 0);
        assert_eq!(spellings(&tokens), vec!["(", "1", ",", "2", ")"]);
    }

    #[test]
    fn missing_argument_is_an_error() {
        let (_, errors, _) = preprocess("#define two(a, b) a b\ntwo(1)\n");
        assert!(errors > 0);
    }

    #[test]
    fn double_hash_at_body_boundary_is_rejected() {
        let (_, errors, _) = preprocess("#define bad(a) ## a\nint x;\n");
        assert!(errors > 0);
    }

    #[test]
    fn unknown_directive_is_reported_and_skipped() {
        let (tokens, errors, _) = preprocess("#pragma once\nint x;\n");
        assert_eq!(errors, 1);
        assert_eq!(spellings(&tokens), vec!["int", "x", ";"]);
    }

    #[test]
    fn undef_with_extra_tokens_warns() {
        let (_, errors, warnings) = preprocess("#define M 1\n#undef M extra\nM\n");
        assert_eq!(errors, 0);
        assert_eq!(warnings, 1);
    }

    #[test]
    fn redefinition_silently_replaces() {
        let (tokens, errors, _) = preprocess("#define M 1\n#define M 2\nM\n");
        assert_eq!(errors, 0);
        assert_eq!(spellings(&tokens), vec!["2"]);
    }

    #[test]
    fn hash_mid_line_is_not_a_directive() {
        let (tokens, errors, _) = preprocess("int x # define\n");
        assert_eq!(errors, 0);
        assert_eq!(spellings(&tokens), vec!["int", "x", "#", "define"]);
    }

    #[test]
    fn macro_table_updates_take_effect_immediately() {
        let sess = Session::new(Options::default());
        let mut pp = Preprocessor::new(
            &sess,
            Rc::from("#define A 1\nA\n"),
            Rc::from("test.c"),
        );
        let first = pp.next_parse_token();
        assert_eq!(first.to_string(), "1");
        assert!(pp.is_defined(sess.intern("A").sym));
    }
}
