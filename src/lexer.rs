//! Hand-rolled scanner.
//!
//! Produces one token per call, keeping whitespace, newline and comment
//! tokens in the stream so the preprocessor can reason about directive
//! lines and macro spacing. Every token carries its verbatim spelling and
//! the location of its first byte.
//!
//! Numeric literals: base prefixes `0x/0X`, `0b/0B`, `0o/0O`; a leading
//! zero followed by digits is read as decimal (the octal rule of standard C
//! is intentionally not applied here). Digit separators `'` and `_` are
//! accepted between digits, a trailing separator is tolerated. Suffixes
//! `u/U` and up to two `l/L` set the unsignedness and long depth flags.
//! Floats come from a `.` after the digits or a base-10 `e/E` exponent;
//! hex-floats use a mandatory `p/P` exponent.

use std::rc::Rc;

use crate::diagnostics::Location;
use crate::session::Session;
use crate::token::{
    FloatLiteral, IntLiteral, StrEncoding, StrLiteral, Token, TokenType, TokenValue, KEYWORDS,
};

pub struct Lexer<'s> {
    sess: &'s Session,
    content: Rc<str>,
    path: Rc<str>,
    /// Byte cursor into `content`.
    cur: usize,
    row: u32,
    col: u32,
    token: Token,
    beginning_of_line: bool,
    /// Set after a fatal scan error; every later fetch yields a premature
    /// EOF.
    failed: bool,
}

/// Scanning-state snapshot. Lets a lexer be suspended and resumed (or two
/// lexers exchange sources via [`Lexer::swap`]) without touching any
/// scratch storage.
#[derive(Clone)]
pub struct LexerState {
    content: Rc<str>,
    path: Rc<str>,
    cur: usize,
    row: u32,
    col: u32,
    token: Token,
    beginning_of_line: bool,
    failed: bool,
}

impl<'s> Lexer<'s> {
    pub fn new(sess: &'s Session, content: Rc<str>, path: Rc<str>) -> Self {
        let start = Location::start_of(Rc::clone(&path), Rc::clone(&content));
        Self {
            sess,
            content,
            path,
            cur: 0,
            row: 1,
            col: 1,
            token: Token::eof(start),
            beginning_of_line: true,
            failed: false,
        }
    }

    /// Rebinds the lexer to a new source, resetting the scanning state.
    pub fn set_content(&mut self, content: Rc<str>, path: Rc<str>) {
        let start = Location::start_of(Rc::clone(&path), Rc::clone(&content));
        self.content = content;
        self.path = path;
        self.cur = 0;
        self.row = 1;
        self.col = 1;
        self.token = Token::eof(start);
        self.beginning_of_line = true;
        self.failed = false;
    }

    pub fn save(&self) -> LexerState {
        LexerState {
            content: Rc::clone(&self.content),
            path: Rc::clone(&self.path),
            cur: self.cur,
            row: self.row,
            col: self.col,
            token: self.token.clone(),
            beginning_of_line: self.beginning_of_line,
            failed: self.failed,
        }
    }

    pub fn restore(&mut self, state: LexerState) {
        self.content = state.content;
        self.path = state.path;
        self.cur = state.cur;
        self.row = state.row;
        self.col = state.col;
        self.token = state.token;
        self.beginning_of_line = state.beginning_of_line;
        self.failed = state.failed;
    }

    /// Exchanges the scanning state of two lexers. Used by the
    /// preprocessor to temporarily scan its concatenation buffer.
    pub fn swap(&mut self, other: &mut Lexer<'s>) {
        let mine = self.save();
        let theirs = other.save();
        self.restore(theirs);
        other.restore(mine);
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn location(&self) -> Location {
        self.here()
    }

    /// Advances to the next token and returns it. Repeatable at EOF.
    pub fn next(&mut self) -> &Token {
        let loc = self.here();
        let bol = self.beginning_of_line;

        let mut tok = if self.failed {
            let mut eof = Token::eof(loc.clone());
            eof.is_premature_eof = true;
            eof
        } else {
            self.scan(&loc)
        };

        tok.loc = loc;
        tok.beginning_of_line = bol;

        self.beginning_of_line = match tok.ty {
            TokenType::NewLine => true,
            TokenType::HorizontalWhitespace | TokenType::Comment => self.beginning_of_line,
            _ => false,
        };

        self.token = tok;
        &self.token
    }

    // ------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------

    fn scan(&mut self, start_loc: &Location) -> Token {
        use TokenType::*;

        let Some(c) = self.peek(0) else {
            return Token::eof(start_loc.clone());
        };

        match c {
            b' ' | b'\t' | b'\x0c' | b'\x0b' => {
                let start = self.cur;
                self.bump();
                while matches!(self.peek(0), Some(b' ' | b'\t' | b'\x0c' | b'\x0b')) {
                    self.bump();
                }
                self.text_token(HorizontalWhitespace, start)
            }

            b'\n' | b'\r' => {
                let start = self.cur;
                self.bump(); // CRLF advances two bytes, one row
                self.text_token(NewLine, start)
            }

            b'#' => {
                if self.peek(1) == Some(b'#') {
                    self.punct(DoubleHash)
                } else {
                    self.punct(Hash)
                }
            }
            b'[' => self.punct(SquareL),
            b']' => self.punct(SquareR),
            b'(' => self.punct(ParenL),
            b')' => self.punct(ParenR),
            b'{' => self.punct(BraceL),
            b'}' => self.punct(BraceR),
            b';' => self.punct(SemiColon),
            b',' => self.punct(Comma),
            b'?' => self.punct(Question),
            b':' => self.punct(Colon),
            b'\\' => self.punct(Backslash),
            b'$' => self.punct(Dollar),
            b'\'' => self.punct(Quote),

            b'=' => match self.peek(1) {
                Some(b'=') => self.punct(DoubleEqual),
                _ => self.punct(Equal),
            },
            b'!' => match self.peek(1) {
                Some(b'=') => self.punct(NotEqual),
                _ => self.punct(Exclam),
            },
            b'<' => match self.peek(1) {
                Some(b'<') => self.punct(DoubleLess),
                Some(b'=') => self.punct(LessEqual),
                _ => self.punct(Less),
            },
            b'>' => match self.peek(1) {
                Some(b'>') => self.punct(DoubleGreater),
                Some(b'=') => self.punct(GreaterEqual),
                _ => self.punct(Greater),
            },
            b'&' => match self.peek(1) {
                Some(b'&') => self.punct(DoubleAmp),
                Some(b'=') => self.punct(AmpEqual),
                _ => self.punct(Amp),
            },
            b'|' => match self.peek(1) {
                Some(b'|') => self.punct(DoublePipe),
                Some(b'=') => self.punct(PipeEqual),
                _ => self.punct(Pipe),
            },
            b'+' => match self.peek(1) {
                Some(b'=') => self.punct(PlusEqual),
                _ => self.punct(Plus),
            },
            b'-' => match self.peek(1) {
                Some(b'=') => self.punct(MinusEqual),
                Some(b'>') => self.punct(Arrow),
                _ => self.punct(Minus),
            },
            b'*' => match self.peek(1) {
                Some(b'=') => self.punct(StarEqual),
                _ => self.punct(Star),
            },
            b'%' => match self.peek(1) {
                Some(b'=') => self.punct(PercentEqual),
                _ => self.punct(Percent),
            },
            b'^' => match self.peek(1) {
                Some(b'=') => self.punct(CaretEqual),
                _ => self.punct(Caret),
            },
            b'~' => match self.peek(1) {
                Some(b'=') => self.punct(TildeEqual),
                _ => self.punct(Tilde),
            },
            b'.' => match (self.peek(1), self.peek(2)) {
                (Some(b'.'), Some(b'.')) => self.punct(TripleDot),
                (Some(b'.'), _) => self.punct(DoubleDot),
                _ => self.punct(Dot),
            },

            b'/' => match self.peek(1) {
                Some(b'=') => self.punct(SlashEqual),
                Some(b'/') => self.line_comment(),
                Some(b'*') => self.block_comment(start_loc),
                _ => self.punct(Slash),
            },

            b'"' => self.string_literal(StrEncoding::Plain, start_loc),

            b'0'..=b'9' => self.number(start_loc),

            _ if is_ident_start(c) => self.identifier_like(start_loc),

            _ => {
                self.sess
                    .diags
                    .error_at(start_loc, format!("illegal character '{}'.", c as char));
                self.failed = true;
                let mut eof = Token::eof(start_loc.clone());
                eof.is_premature_eof = true;
                eof
            }
        }
    }

    fn line_comment(&mut self) -> Token {
        let start = self.cur;
        self.bump(); // '/'
        self.bump(); // '/'
        while !matches!(self.peek(0), None | Some(b'\n') | Some(b'\r')) {
            self.bump();
        }
        self.text_token(TokenType::Comment, start)
    }

    fn block_comment(&mut self, start_loc: &Location) -> Token {
        let start = self.cur;
        self.bump(); // '/'
        self.bump(); // '*'
        loop {
            match self.peek(0) {
                None => {
                    self.sess
                        .diags
                        .error_at(start_loc, "cannot find closing comment tag '*/'.");
                    return Token::new(TokenType::Error, TokenValue::None, start_loc.clone());
                }
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                _ => self.bump(),
            }
        }
        self.text_token(TokenType::Comment, start)
    }

    fn string_literal(&mut self, encoding: StrEncoding, start_loc: &Location) -> Token {
        self.bump(); // opening quote
        let content = Rc::clone(&self.content);
        let start = self.cur;
        loop {
            match self.peek(0) {
                None | Some(b'\n') | Some(b'\r') => {
                    self.sess.diags.error_at(
                        start_loc,
                        "string literal is not well terminated with '\"'.",
                    );
                    return Token::new(TokenType::Error, TokenValue::None, start_loc.clone());
                }
                Some(b'"') => break,
                _ => self.bump(),
            }
        }
        let text = Rc::from(&content[start..self.cur]);
        self.bump(); // closing quote
        Token::new(
            TokenType::LiteralString,
            TokenValue::Str(StrLiteral {
                content: text,
                encoding,
            }),
            start_loc.clone(),
        )
    }

    fn identifier_like(&mut self, start_loc: &Location) -> Token {
        let content = Rc::clone(&self.content);
        let start = self.cur;
        while let Some(c) = self.peek(0) {
            if !is_ident_continue(c) {
                break;
            }
            self.bump();
        }
        let text = &content[start..self.cur];

        match text {
            "true" => {
                return Token::new(
                    TokenType::LiteralBool,
                    TokenValue::Bool(true),
                    start_loc.clone(),
                )
            }
            "false" => {
                return Token::new(
                    TokenType::LiteralBool,
                    TokenValue::Bool(false),
                    start_loc.clone(),
                )
            }
            "null" => {
                return Token::new(
                    TokenType::LiteralNull,
                    TokenValue::Text(Rc::from("null")),
                    start_loc.clone(),
                )
            }
            _ => {}
        }

        // Encoding prefix glued to an opening quote starts a string.
        if self.peek(0) == Some(b'"') {
            let encoding = match text {
                "u8" => Some(StrEncoding::Utf8),
                "u" => Some(StrEncoding::Utf16),
                "U" => Some(StrEncoding::Utf32),
                "L" => Some(StrEncoding::Wide),
                _ => None,
            };
            if let Some(encoding) = encoding {
                return self.string_literal(encoding, start_loc);
            }
        }

        for (spelling, ty) in KEYWORDS {
            if *spelling == text {
                let ident = self.sess.intern(spelling);
                return Token::new(*ty, TokenValue::Ident(ident), start_loc.clone());
            }
        }

        let ident = self.sess.intern(text);
        Token::new(
            TokenType::Identifier,
            TokenValue::Ident(ident),
            start_loc.clone(),
        )
    }

    fn number(&mut self, start_loc: &Location) -> Token {
        let content = Rc::clone(&self.content);
        let start = self.cur;

        let mut base: u64 = 10;
        match (self.peek(0), self.peek(1)) {
            (Some(b'0'), Some(b'x' | b'X')) => {
                self.bump();
                self.bump();
                base = 16;
            }
            (Some(b'0'), Some(b'b' | b'B')) => {
                self.bump();
                self.bump();
                base = 2;
            }
            (Some(b'0'), Some(b'o' | b'O')) => {
                self.bump();
                self.bump();
                base = 8;
            }
            _ => {}
        }

        let mut acc: u64 = 0;
        let mut overflow = false;
        while let Some(c) = self.peek(0) {
            if let Some(digit) = digit_value(c, base) {
                match acc.checked_mul(base).and_then(|v| v.checked_add(digit)) {
                    Some(value) => acc = value,
                    None => {
                        overflow = true;
                        acc = acc.wrapping_mul(base).wrapping_add(digit);
                    }
                }
                self.bump();
            } else if c == b'\'' || c == b'_' {
                // Digit separator; a trailing separator is tolerated.
                self.bump();
            } else {
                break;
            }
        }

        let float_ahead = match self.peek(0) {
            Some(b'.') => base == 10 || base == 16,
            Some(b'e' | b'E') => base == 10 && self.exponent_follows(),
            Some(b'p' | b'P') => base == 16,
            _ => false,
        };

        if float_ahead {
            if base == 16 && self.sess.options.reject_hex_float {
                self.sess
                    .diags
                    .error_at(start_loc, "hexadecimal float literals are not allowed.");
                return Token::new(TokenType::Error, TokenValue::None, start_loc.clone());
            }
            return self.float_tail(start_loc, &content, start, base, acc, overflow);
        }

        let mut unsigned = false;
        let mut long_depth: u8 = 0;
        while let Some(c) = self.peek(0) {
            match c {
                b'u' | b'U' => {
                    unsigned = true;
                    self.bump();
                }
                b'l' | b'L' if long_depth < 2 => {
                    long_depth += 1;
                    self.bump();
                }
                _ => break,
            }
        }

        let text = Rc::from(&content[start..self.cur]);
        Token::new(
            TokenType::LiteralInteger,
            TokenValue::Int(IntLiteral {
                text,
                value: acc,
                overflow,
                unsigned,
                long_depth,
            }),
            start_loc.clone(),
        )
    }

    /// Fraction, exponent and `f` suffix of a float literal. The integer
    /// digits have already been accumulated into `acc`.
    fn float_tail(
        &mut self,
        start_loc: &Location,
        content: &Rc<str>,
        start: usize,
        base: u64,
        acc: u64,
        mut overflow: bool,
    ) -> Token {
        let mut value = acc as f64;

        if self.peek(0) == Some(b'.') {
            self.bump();
            let mut fraction = 0f64;
            let mut scale = 1f64;
            while let Some(digit) = self.peek(0).and_then(|c| digit_value(c, base)) {
                fraction = fraction * base as f64 + digit as f64;
                scale *= base as f64;
                self.bump();
            }
            value += fraction / scale;
        }

        let has_exponent = match self.peek(0) {
            Some(b'p' | b'P') if base == 16 => {
                self.bump();
                true
            }
            Some(b'e' | b'E') if base == 10 => {
                self.bump();
                true
            }
            _ => {
                if base == 16 {
                    // Hex floats require a binary exponent.
                    self.sess
                        .diags
                        .error_at(start_loc, "hexadecimal float requires a 'p' exponent.");
                    return Token::new(TokenType::Error, TokenValue::None, start_loc.clone());
                }
                false
            }
        };

        if has_exponent {
            let negative = self.peek(0) == Some(b'-');
            if matches!(self.peek(0), Some(b'-' | b'+')) {
                self.bump();
            }
            let mut exponent: u32 = 0;
            while let Some(digit) = self.peek(0).and_then(|c| digit_value(c, 10)) {
                exponent = exponent.saturating_mul(10).saturating_add(digit as u32);
                self.bump();
            }
            let power_base: f64 = if base == 16 { 2.0 } else { 10.0 };
            let power = power_base.powi(exponent.min(i32::MAX as u32) as i32);
            value = if negative { value / power } else { value * power };
        }

        let mut is_double = true;
        if self.peek(0) == Some(b'f') {
            self.bump();
            is_double = false;
            if value > f32::MAX as f64 {
                overflow = true;
            }
        }

        if !value.is_finite() {
            overflow = true;
        }

        let text = Rc::from(&content[start..self.cur]);
        Token::new(
            TokenType::LiteralFloat,
            TokenValue::Float(FloatLiteral {
                text,
                value,
                overflow,
                is_double,
            }),
            start_loc.clone(),
        )
    }

    /// True when the byte after the `e`/`E` begins a real exponent, so
    /// `123e` still lexes as an integer followed by an identifier.
    fn exponent_follows(&self) -> bool {
        match self.peek(1) {
            Some(b'0'..=b'9') => true,
            Some(b'-' | b'+') => matches!(self.peek(2), Some(b'0'..=b'9')),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Cursor primitives
    // ------------------------------------------------------------------

    fn here(&self) -> Location {
        Location {
            path: Rc::clone(&self.path),
            row: self.row,
            col: self.col,
            pos: self.cur,
            content: Rc::clone(&self.content),
        }
    }

    fn peek(&self, n: usize) -> Option<u8> {
        self.content.as_bytes().get(self.cur + n).copied()
    }

    /// Consumes one character. A CRLF pair is consumed whole and counts as
    /// a single row advance.
    fn bump(&mut self) {
        let bytes = self.content.as_bytes();
        match bytes.get(self.cur) {
            Some(b'\n') | Some(b'\r') => {
                let first = bytes[self.cur];
                let second = bytes.get(self.cur + 1).copied();
                let pair = matches!(
                    (first, second),
                    (b'\r', Some(b'\n')) | (b'\n', Some(b'\r'))
                );
                self.cur += if pair { 2 } else { 1 };
                self.row += 1;
                self.col = 1;
            }
            Some(_) => {
                self.cur += 1;
                self.col += 1;
            }
            None => {}
        }
    }

    fn punct(&mut self, ty: TokenType) -> Token {
        for _ in 0..ty.as_str().len() {
            self.bump();
        }
        Token::new(ty, TokenValue::None, Location::none())
    }

    fn text_token(&mut self, ty: TokenType, start: usize) -> Token {
        let text = Rc::from(&self.content[start..self.cur]);
        Token::new(ty, TokenValue::Text(text), Location::none())
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 128
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c >= 128
}

fn digit_value(c: u8, base: u64) -> Option<u64> {
    let value = match c {
        b'0'..=b'9' => (c - b'0') as u64,
        b'a'..=b'f' => (c - b'a') as u64 + 10,
        b'A'..=b'F' => (c - b'A') as u64 + 10,
        _ => return None,
    };
    (value < base).then_some(value)
}
