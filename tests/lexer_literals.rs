//! Scanner-level tests: the numeric literal table, round-tripping, and
//! location bookkeeping.

use std::rc::Rc;

use acc::{Lexer, Options, Session, Token, TokenType, TokenValue};

fn lex_all(source: &str) -> Vec<Token> {
    let sess = Session::new(Options::default());
    let mut lexer = Lexer::new(&sess, Rc::from(source), Rc::from("test.c"));
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next().clone();
        if tok.is_eof() {
            break;
        }
        tokens.push(tok);
    }
    tokens
}

fn integer_values(source: &str) -> Vec<(u64, bool)> {
    lex_all(source)
        .iter()
        .filter_map(|tok| match &tok.value {
            TokenValue::Int(literal) => Some((literal.value, literal.overflow)),
            _ => None,
        })
        .collect()
}

#[test]
fn integer_literal_table() {
    let source = "0 00 01 10 123 123u 123ull 0b101 0X2A 0x2aULL 1'2'3 1_2_3";
    let values = integer_values(source);
    assert_eq!(values.len(), 12);

    let expected = [0, 0, 1, 10, 123, 123, 123, 5, 42, 42, 123, 123];
    for (i, (value, overflow)) in values.iter().enumerate() {
        assert_eq!(*value, expected[i], "lexeme #{}", i);
        assert!(!overflow, "lexeme #{} must not overflow", i);
    }
}

#[test]
fn integer_suffixes_set_flags() {
    let tokens = lex_all("123ull 42u 7ll 9l");
    let literals: Vec<_> = tokens
        .iter()
        .filter_map(|tok| match &tok.value {
            TokenValue::Int(literal) => Some(literal),
            _ => None,
        })
        .collect();
    assert!(literals[0].unsigned);
    assert_eq!(literals[0].long_depth, 2);
    assert!(literals[1].unsigned);
    assert_eq!(literals[1].long_depth, 0);
    assert!(!literals[2].unsigned);
    assert_eq!(literals[2].long_depth, 2);
    assert_eq!(literals[3].long_depth, 1);
}

#[test]
fn overflow_flag_flips_exactly_past_the_maximum() {
    let at_max = integer_values("18446744073709551615");
    assert_eq!(at_max, vec![(u64::MAX, false)]);

    let past_max = integer_values("18446744073709551616");
    assert_eq!(past_max.len(), 1);
    assert!(past_max[0].1, "one past the maximum must overflow");
}

#[test]
fn leading_zero_reads_as_decimal() {
    // The octal rule of standard C is deliberately not applied.
    assert_eq!(integer_values("017"), vec![(17, false)]);
}

#[test]
fn float_forms() {
    let tokens = lex_all("1.5 1e3 2.5f 0x1p4");
    let floats: Vec<_> = tokens
        .iter()
        .filter_map(|tok| match &tok.value {
            TokenValue::Float(literal) => Some(literal),
            _ => None,
        })
        .collect();
    assert_eq!(floats.len(), 4);
    assert_eq!(floats[0].value, 1.5);
    assert!(floats[0].is_double);
    assert_eq!(floats[1].value, 1000.0);
    assert_eq!(floats[2].value, 2.5);
    assert!(!floats[2].is_double);
    assert_eq!(floats[3].value, 16.0);
}

#[test]
fn round_trip_reproduces_the_source_exactly() {
    let source = "\
#define glue(a, b) a ## b\n\
int main() { // entry\n\
\treturn 0x2aULL; /* answer */\n\
}\r\n\
\"string \\ literal\" 'q' 1_2_3 ... ~=\n";
    let mut rebuilt = String::new();
    for tok in lex_all(source) {
        tok.write_verbatim(&mut rebuilt);
    }
    assert_eq!(rebuilt, source);
}

#[test]
fn byte_offsets_stay_within_the_source() {
    let source = "int x = 0b101;\n// done\n";
    for tok in lex_all(source) {
        assert!(
            tok.loc.pos < source.len(),
            "token '{}' at offset {} out of bounds",
            tok,
            tok.loc.pos
        );
    }
}

#[test]
fn interned_identifiers_share_symbols_exactly_when_text_matches() {
    let tokens = lex_all("alpha beta alpha");
    let idents: Vec<_> = tokens.iter().filter_map(|t| t.ident()).collect();
    assert_eq!(idents.len(), 3);
    assert_eq!(idents[0].sym, idents[2].sym);
    assert_ne!(idents[0].sym, idents[1].sym);
    assert_eq!(idents[0].text, idents[2].text);
}

#[test]
fn empty_input_is_an_immediate_eof() {
    let sess = Session::new(Options::default());
    let mut lexer = Lexer::new(&sess, Rc::from(""), Rc::from("test.c"));
    assert!(lexer.next().is_eof());
    assert!(lexer.next().is_eof());
}

#[test]
fn whitespace_only_input_is_whitespace_then_eof() {
    let tokens = lex_all("   \t ");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].ty, TokenType::HorizontalWhitespace);
}

#[test]
fn quote_stays_an_unsupported_token() {
    // Char literals are not produced; a bare quote is its own token.
    let tokens = lex_all("'x'");
    let types: Vec<TokenType> = tokens.iter().map(|t| t.ty).collect();
    assert_eq!(
        types,
        vec![TokenType::Quote, TokenType::Identifier, TokenType::Quote]
    );
}
