//! Preprocessor scenarios: expansion, concatenation, recursion locks and
//! `#undef`, exercised through the public token stream.

use std::rc::Rc;

use acc::{Compiler, Options, Preprocessor, Session, SourceFile, Token, TokenType};

fn parse_stream(source: &str) -> (Vec<Token>, u32, u32) {
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
fn object_like_macro() {
    let source = "#define PI 314\nint x = PI;\n";
    let (tokens, errors, _) = parse_stream(source);
    assert_eq!(errors, 0);
    assert_eq!(spellings(&tokens), vec!["int", "x", "=", "314", ";"]);
    assert_eq!(tokens[3].ty, TokenType::LiteralInteger);
}

#[test]
fn function_like_macro_with_concatenation() {
    let source = "#define glue(a, b) a ## b\n#define HIGH 1\nglue(HIGH, 2)\n";
    let (tokens, errors, _) = parse_stream(source);
    assert_eq!(errors, 0);
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].ty, TokenType::Identifier);
    assert_eq!(tokens[0].ident().unwrap().text.as_ref(), "HIGH2");
}

#[test]
fn recursion_is_prevented_by_the_expansion_lock() {
    let source = "#define LOW LOW \", world\"\nLOW\n";
    let (tokens, errors, _) = parse_stream(source);
    assert_eq!(errors, 0);
    assert_eq!(spellings(&tokens), vec!["LOW", "\", world\""]);
    assert_eq!(tokens[0].ty, TokenType::Identifier);
    assert_eq!(tokens[1].ty, TokenType::LiteralString);
}

#[test]
fn undef_removes_a_definition() {
    let source = "#define M 1\nM\n#undef M\nM\n";
    let (tokens, errors, _) = parse_stream(source);
    assert_eq!(errors, 0);
    assert_eq!(spellings(&tokens), vec!["1", "M"]);
    assert_eq!(tokens[0].ty, TokenType::LiteralInteger);
    assert_eq!(tokens[1].ty, TokenType::Identifier);
}

#[test]
fn empty_define_expands_to_nothing() {
    let (tokens, errors, _) = parse_stream("#define X\nX\n");
    assert_eq!(errors, 0);
    assert!(tokens.is_empty());
}

#[test]
fn empty_call_argument_expands_to_nothing() {
    let (tokens, errors, _) = parse_stream("#define F(x) x\nF()\n");
    assert_eq!(errors, 0);
    assert!(tokens.is_empty());
}

#[test]
fn chained_expansion_goes_through_arguments() {
    let source = "#define TWICE(x) x x\n#define N 7\nTWICE(N)\n";
    let (tokens, errors, _) = parse_stream(source);
    assert_eq!(errors, 0);
    assert_eq!(spellings(&tokens), vec!["7", "7"]);
}

#[test]
fn pasted_identifier_can_itself_expand() {
    // The re-scan of a paste result goes through the expansion loop again.
    let source = "#define HIGH2 99\n#define glue(a, b) a ## b\nglue(HIGH, 2)\n";
    let (tokens, errors, _) = parse_stream(source);
    assert_eq!(errors, 0);
    assert_eq!(spellings(&tokens), vec!["99"]);
}

#[test]
fn undef_extra_tokens_warn_but_do_not_fail() {
    let (_, errors, warnings) = parse_stream("#define M 1\n#undef M junk\nM\n");
    assert_eq!(errors, 0);
    assert_eq!(warnings, 1);
}

#[test]
fn unknown_directives_are_errors_but_lines_are_skipped() {
    let (tokens, errors, _) = parse_stream("#include <stdio.h>\nint x;\n");
    assert_eq!(errors, 1);
    assert_eq!(spellings(&tokens), vec!["int", "x", ";"]);
}

#[test]
fn preprocessed_output_is_idempotent_without_directives() {
    let source = "int  a = 1;\nchar b; /* keep */\n";
    let options = {
        let mut options = Options::default();
        options.preserve_comment = true;
        options
    };
    let compiler = Compiler::new(options);
    let file = SourceFile {
        path: Rc::from("test.c"),
        content: Rc::from(source),
    };
    let once = compiler.preprocess_to_string(&file);
    let file_again = SourceFile {
        path: Rc::from("test.c"),
        content: Rc::from(once.as_str()),
    };
    let twice = compiler.preprocess_to_string(&file_again);
    assert_eq!(once, twice);
}

#[test]
fn preprocessed_output_keeps_spacing_across_expansion() {
    let source = "#define VALUE 1 + 2\nint x = VALUE;\n";
    let compiler = Compiler::new(Options::default());
    let file = SourceFile {
        path: Rc::from("test.c"),
        content: Rc::from(source),
    };
    assert_eq!(compiler.preprocess_to_string(&file), "int x = 1 + 2;\n");
}

#[test]
fn sample_file_from_the_original_test_suite() {
    // Mirrors tests/preprocessor_macro samples: xglue pre-expands its
    // arguments before pasting, glue does not.
    let source = "\
#define glue(a, b)  a ## b\n\
#define xglue(a, b) glue(a, b)\n\
#define HIGHLOW     \"hello\"\n\
xglue(HIGH, LOW)\n";
    let (tokens, errors, _) = parse_stream(source);
    assert_eq!(errors, 0);
    // HIGH and LOW are undefined: xglue passes them through to glue, which
    // pastes them into HIGHLOW; the paste result then expands.
    assert_eq!(spellings(&tokens), vec!["\"hello\""]);
}
