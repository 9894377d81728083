//! End-to-end pipeline tests: source text through the preprocessor and
//! parser into the AST, and back out through the converter.

use std::rc::Rc;

use acc::ast::{DeclarationKind, ExprKind, Literal, LiteralKind, TopLevel};
use acc::converter::Converter;
use acc::{Options, Parser, Session, SourceFile};

fn parse(source: &str) -> (Option<TopLevel>, u32) {
    let sess = Session::new(Options::default());
    let file = SourceFile {
        path: Rc::from("test.c"),
        content: Rc::from(source),
    };
    let mut parser = Parser::new(&sess, &file);
    let top = parser.parse();
    (top, sess.diags.error_count())
}

#[test]
fn simple_function_definition() {
    let (top, errors) = parse("int main() { return 0; }\n");
    assert_eq!(errors, 0);
    let top = top.unwrap();
    assert_eq!(top.block.statements.len(), 1);

    let ExprKind::Declaration(decl) = &top.block.statements[0].kind else {
        panic!("expected a declaration");
    };
    assert_eq!(decl.kind, DeclarationKind::FunctionDefinition);
    assert_eq!(decl.type_specifier.identifier.name.text.as_ref(), "int");
    assert_eq!(decl.declarator.ident.name.text.as_ref(), "main");
    assert!(decl.declarator.parameters.as_ref().unwrap().list.is_empty());

    let body = decl.function_block.as_ref().unwrap();
    assert_eq!(body.statements.len(), 1);
    let ExprKind::Return(ret) = &body.statements[0].kind else {
        panic!("expected return");
    };
    let ExprKind::Literal(Literal {
        kind: LiteralKind::Integer(value),
        ..
    }) = &ret.expr.kind
    else {
        panic!("expected an integer literal");
    };
    assert_eq!(*value, 0);
}

#[test]
fn empty_and_whitespace_inputs_yield_empty_top_levels() {
    for source in ["", "   \t\n \n"] {
        let (top, errors) = parse(source);
        assert_eq!(errors, 0, "source {:?}", source);
        assert!(top.unwrap().block.statements.is_empty());
    }
}

#[test]
fn macros_feed_declarations() {
    let (top, errors) = parse("#define PI 314\nint x = PI;\n");
    assert_eq!(errors, 0);
    let top = top.unwrap();
    let ExprKind::Declaration(decl) = &top.block.statements[0].kind else {
        panic!("expected a declaration");
    };
    let init = decl.declarator.initializer.as_ref().unwrap();
    let ExprKind::Literal(Literal {
        kind: LiteralKind::Integer(314),
        ..
    }) = &init.kind
    else {
        panic!("expected 314 as the initializer");
    };
}

#[test]
fn every_node_location_is_inside_the_source() {
    let source = "int a;\nint f(int p);\nint main() { return 1; }\n";
    let (top, errors) = parse(source);
    assert_eq!(errors, 0);
    let top = top.unwrap();
    for statement in &top.block.statements {
        assert!(statement.loc.pos < source.len());
        assert!(statement.loc.row >= 1);
        assert!(statement.loc.col >= 1);
    }
}

#[test]
fn top_level_rejects_plain_expressions() {
    let (top, errors) = parse("42;\n");
    assert!(top.is_none());
    assert!(errors > 0);
}

#[test]
fn unterminated_input_reports_premature_eof() {
    let (top, errors) = parse("int x = ");
    assert!(top.is_none());
    assert!(errors > 0);
}

#[test]
fn converter_round_trips_a_small_program() {
    let source = "#define ZERO 0\nint g = ZERO;\nint main() { return g; }\n";
    let (top, errors) = parse(source);
    assert_eq!(errors, 0);
    let output = Converter::new().convert_to_string(&top.unwrap());
    assert_eq!(output, "int g = 0;\n\nint main()\n{\n    return g;\n}\n\n");

    // The emitted C parses again to the same shape.
    let (reparsed, reparse_errors) = parse(&output);
    assert_eq!(reparse_errors, 0);
    assert_eq!(reparsed.unwrap().block.statements.len(), 2);
}
