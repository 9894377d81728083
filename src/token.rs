//! Token model: the token type enumeration, literal payloads, and stable
//! printable forms.
//!
//! Tokens are plain values. Their backing text is shared (`Rc<str>`): a
//! slice of the source, the interner's canonical spelling, or the
//! preprocessor's concatenation scratch. Concatenating the verbatim text of
//! a full raw token stream reproduces the input byte-for-byte.

use std::fmt;
use std::rc::Rc;

use crate::diagnostics::Location;
use crate::intern::Ident;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Structural
    None,
    Eof,
    Error,
    Comment,
    HorizontalWhitespace,
    NewLine,
    Identifier,

    // Literals
    LiteralBool,
    LiteralChar,
    LiteralInteger,
    LiteralFloat,
    LiteralString,
    LiteralNull,

    // Keywords
    If,
    Else,
    For,
    While,
    Return,
    Struct,
    Enum,
    Sizeof,
    Typeof,

    // Punctuation
    Hash,
    DoubleHash,
    ParenL,
    ParenR,
    BraceL,
    BraceR,
    SquareL,
    SquareR,
    Comma,
    SemiColon,
    Colon,
    Question,
    Backslash,
    Dollar,
    Quote,
    DoubleQuote,
    Dot,
    DoubleDot,
    TripleDot,
    Arrow,
    Tilde,
    TildeEqual,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    Pipe,
    Exclam,
    Equal,
    DoubleEqual,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    DoubleLess,
    DoubleGreater,
    DoubleAmp,
    DoublePipe,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    CaretEqual,
    AmpEqual,
    PipeEqual,
}

/// Keyword spellings, scanned linearly when an identifier has been lexed.
/// The spelling stored here becomes the token's canonical text, so later
/// identity tests against interned names hold.
pub const KEYWORDS: &[(&str, TokenType)] = &[
    ("if", TokenType::If),
    ("else", TokenType::Else),
    ("for", TokenType::For),
    ("while", TokenType::While),
    ("return", TokenType::Return),
    ("struct", TokenType::Struct),
    ("enum", TokenType::Enum),
    ("sizeof", TokenType::Sizeof),
    ("typeof", TokenType::Typeof),
];

impl TokenType {
    /// Stable printable form: the canonical glyph for punctuation and
    /// operators, the spelling for keywords, and a `<placeholder>` for
    /// categories without a fixed spelling.
    pub fn as_str(self) -> &'static str {
        use TokenType::*;
        match self {
            None => "<none>",
            Eof => "end-of-line",
            Error => "<error>",
            Comment => "<comment>",
            HorizontalWhitespace => "<horizontal_whitespace>",
            NewLine => "<new_line>",
            Identifier => "<identifier>",
            LiteralBool => "<literal-bool>",
            LiteralChar => "<literal-char>",
            LiteralInteger => "<literal-integer>",
            LiteralFloat => "<literal-float>",
            LiteralString => "<literal-string>",
            LiteralNull => "<literal-null>",
            If => "if",
            Else => "else",
            For => "for",
            While => "while",
            Return => "return",
            Struct => "struct",
            Enum => "enum",
            Sizeof => "sizeof",
            Typeof => "typeof",
            Hash => "#",
            DoubleHash => "##",
            ParenL => "(",
            ParenR => ")",
            BraceL => "{",
            BraceR => "}",
            SquareL => "[",
            SquareR => "]",
            Comma => ",",
            SemiColon => ";",
            Colon => ":",
            Question => "?",
            Backslash => "\\",
            Dollar => "$",
            Quote => "'",
            DoubleQuote => "\"",
            Dot => ".",
            DoubleDot => "..",
            TripleDot => "...",
            Arrow => "->",
            Tilde => "~",
            TildeEqual => "~=",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Caret => "^",
            Amp => "&",
            Pipe => "|",
            Exclam => "!",
            Equal => "=",
            DoubleEqual => "==",
            NotEqual => "!=",
            Less => "<",
            Greater => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            DoubleLess => "<<",
            DoubleGreater => ">>",
            DoubleAmp => "&&",
            DoublePipe => "||",
            PlusEqual => "+=",
            MinusEqual => "-=",
            StarEqual => "*=",
            SlashEqual => "/=",
            PercentEqual => "%=",
            CaretEqual => "^=",
            AmpEqual => "&=",
            PipeEqual => "|=",
        }
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenType::LiteralBool
                | TokenType::LiteralChar
                | TokenType::LiteralInteger
                | TokenType::LiteralFloat
                | TokenType::LiteralString
                | TokenType::LiteralNull
        )
    }
}

/// String literal encoding prefixes. Flag-only: the content is not
/// re-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrEncoding {
    Plain,
    Utf8,
    Utf16,
    Utf32,
    Wide,
}

impl StrEncoding {
    pub fn prefix(self) -> &'static str {
        match self {
            StrEncoding::Plain => "",
            StrEncoding::Utf8 => "u8",
            StrEncoding::Utf16 => "u",
            StrEncoding::Utf32 => "U",
            StrEncoding::Wide => "L",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntLiteral {
    /// Verbatim spelling, including base prefix, separators and suffixes.
    pub text: Rc<str>,
    pub value: u64,
    pub overflow: bool,
    pub unsigned: bool,
    /// 0 = plain, 1 = `l`, 2 = `ll`.
    pub long_depth: u8,
}

#[derive(Debug, Clone)]
pub struct FloatLiteral {
    pub text: Rc<str>,
    pub value: f64,
    pub overflow: bool,
    /// `false` once an `f` suffix demoted the literal to single precision.
    pub is_double: bool,
}

#[derive(Debug, Clone)]
pub struct StrLiteral {
    /// Content between the quotes, escapes untouched.
    pub content: Rc<str>,
    pub encoding: StrEncoding,
}

/// Token payload. Exactly the keyword-or-identifier tokens carry an
/// [`Ident`]; that property is what the macro machinery keys on.
#[derive(Debug, Clone)]
pub enum TokenValue {
    None,
    Ident(Ident),
    /// Verbatim text for comments, whitespace runs, newlines and `null`.
    Text(Rc<str>),
    Int(IntLiteral),
    Float(FloatLiteral),
    Bool(bool),
    Str(StrLiteral),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub ty: TokenType,
    pub value: TokenValue,
    pub loc: Location,
    /// Horizontal whitespace or a comment immediately preceded this token.
    pub previous_was_space: bool,
    /// No non-whitespace token precedes this one on its line. Directives
    /// are only recognized on such tokens.
    pub beginning_of_line: bool,
    /// Set while re-scanning the output of a locked macro so the identifier
    /// is never expanded again.
    pub cannot_expand: bool,
    /// The EOF token doubles as the halt marker after a fatal scan error.
    pub is_premature_eof: bool,
}

impl Token {
    pub fn new(ty: TokenType, value: TokenValue, loc: Location) -> Self {
        Self {
            ty,
            value,
            loc,
            previous_was_space: false,
            beginning_of_line: false,
            cannot_expand: false,
            is_premature_eof: false,
        }
    }

    pub fn eof(loc: Location) -> Self {
        Self::new(TokenType::Eof, TokenValue::None, loc)
    }

    pub fn is_eof(&self) -> bool {
        self.ty == TokenType::Eof
    }

    pub fn is_keyword_or_identifier(&self) -> bool {
        matches!(self.value, TokenValue::Ident(_))
    }

    pub fn ident(&self) -> Option<&Ident> {
        match &self.value {
            TokenValue::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    /// Trivia never reaches the parser: whitespace runs, comments and
    /// newlines.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.ty,
            TokenType::HorizontalWhitespace | TokenType::Comment | TokenType::NewLine
        )
    }

    /// The token as the user spelled it. Used for error messages, where
    /// identifiers print their name and everything else its stable form.
    pub fn describe(&self) -> &str {
        match &self.value {
            TokenValue::Ident(ident) => &ident.text,
            _ => self.ty.as_str(),
        }
    }

    /// Writes the verbatim source text of this token. The raw token stream
    /// of a file, printed through this, reproduces the file exactly.
    pub fn write_verbatim(&self, out: &mut String) {
        match &self.value {
            TokenValue::None => {
                if self.ty != TokenType::Eof {
                    out.push_str(self.ty.as_str());
                }
            }
            TokenValue::Ident(ident) => out.push_str(&ident.text),
            TokenValue::Text(text) => out.push_str(text),
            TokenValue::Int(literal) => out.push_str(&literal.text),
            TokenValue::Float(literal) => out.push_str(&literal.text),
            TokenValue::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            TokenValue::Str(literal) => {
                out.push_str(literal.encoding.prefix());
                out.push('"');
                out.push_str(&literal.content);
                out.push('"');
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::new();
        self.write_verbatim(&mut text);
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_spellings() {
        assert_eq!(TokenType::Eof.as_str(), "end-of-line");
        assert_eq!(TokenType::Identifier.as_str(), "<identifier>");
        assert_eq!(TokenType::DoubleGreater.as_str(), ">>");
        assert_eq!(TokenType::TripleDot.as_str(), "...");
        assert_eq!(TokenType::TildeEqual.as_str(), "~=");
    }

    #[test]
    fn string_verbatim_restores_quotes_and_prefix() {
        let tok = Token::new(
            TokenType::LiteralString,
            TokenValue::Str(StrLiteral {
                content: Rc::from("hi"),
                encoding: StrEncoding::Wide,
            }),
            Location::none(),
        );
        assert_eq!(tok.to_string(), "L\"hi\"");
    }

    #[test]
    fn eof_has_empty_verbatim_text() {
        assert_eq!(Token::eof(Location::none()).to_string(), "");
    }
}
