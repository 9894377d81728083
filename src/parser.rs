//! Recursive-descent parser over the preprocessed token stream.
//!
//! Each production returns a new AST node, or `None` after reporting a
//! diagnostic; the first fatal error aborts the file. Only declarations are
//! allowed at the top level. Function calls, array accesses, member
//! accesses and binary operators are recognized and reported as
//! unimplemented.

use std::rc::Rc;

use crate::ast::{
    ArraySpecifier, Block, Declaration, DeclarationKind, Declarator, Expr, ExprKind, Identifier,
    Literal, LiteralKind, Parameter, Parameters, Return, TopLevel, TypeSpecifier, Unary,
};
use crate::compiler::SourceFile;
use crate::preprocessor::Preprocessor;
use crate::session::Session;
use crate::token::{Token, TokenType, TokenValue};

pub struct Parser<'s> {
    sess: &'s Session,
    pp: Preprocessor<'s>,
    cur: Token,
}

impl<'s> Parser<'s> {
    pub fn new(sess: &'s Session, source: &SourceFile) -> Self {
        let pp = Preprocessor::new(sess, Rc::clone(&source.content), Rc::clone(&source.path));
        let cur = Token::eof(crate::diagnostics::Location::start_of(
            Rc::clone(&source.path),
            Rc::clone(&source.content),
        ));
        Self { sess, pp, cur }
    }

    /// Parses a whole translation unit. Returns `None` after the first
    /// fatal syntax error.
    pub fn parse(&mut self) -> Option<TopLevel> {
        self.advance();
        let loc = self.cur.loc.clone();
        let mut block = Block::new(loc.clone());

        self.trace("parse_top_level_declarations");
        while !self.cur.is_eof() {
            let expr = self.parse_expr()?;
            if !expr.is_declaration() {
                self.sess
                    .diags
                    .error_at(&expr.loc, "top level expressions can only be declarations.");
                return None;
            }
            block.statements.push(expr);
        }

        Some(TopLevel { loc, block })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Option<Expr> {
        self.trace("parse_expr");
        if self.cur.is_eof() {
            return None;
        }
        let lhs = self.parse_primary()?;
        self.parse_rhs(lhs)
    }

    /// Binary operators are reserved but not parsed; the left-hand side
    /// passes through.
    fn parse_rhs(&mut self, lhs: Expr) -> Option<Expr> {
        self.trace("parse_rhs");
        Some(lhs)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        self.trace("parse_primary");

        if self.is_unary_operator() {
            return self.parse_unary();
        }

        let loc = self.cur.loc.clone();
        match self.cur.ty {
            TokenType::ParenL => {
                self.expect_and_consume(TokenType::ParenL)?;
                let inner = self.parse_expr()?;
                self.expect_and_consume(TokenType::ParenR)?;
                Some(inner)
            }

            TokenType::Identifier => {
                let identifier = self.parse_identifier()?;
                self.parse_postfix_expression(identifier)
            }

            TokenType::LiteralBool => {
                let value = match self.cur.value {
                    TokenValue::Bool(value) => value,
                    _ => false,
                };
                self.advance();
                Some(literal(loc, LiteralKind::Bool(value)))
            }
            TokenType::LiteralInteger => {
                let value = match &self.cur.value {
                    TokenValue::Int(literal) => literal.value,
                    _ => 0,
                };
                self.advance();
                Some(literal(loc, LiteralKind::Integer(value)))
            }
            TokenType::LiteralFloat => {
                let value = match &self.cur.value {
                    TokenValue::Float(literal) => literal.value,
                    _ => 0.0,
                };
                self.advance();
                Some(literal(loc, LiteralKind::Float(value)))
            }
            TokenType::LiteralNull => {
                self.advance();
                Some(literal(loc, LiteralKind::Null))
            }
            TokenType::LiteralString => {
                let value = match &self.cur.value {
                    TokenValue::Str(literal) => Rc::clone(&literal.content),
                    _ => Rc::from(""),
                };
                self.advance();
                Some(literal(loc, LiteralKind::String(value)))
            }

            TokenType::Return => {
                self.expect_and_consume(TokenType::Return)?;
                let expr = self.parse_expr()?;
                Some(Expr::new(
                    loc.clone(),
                    ExprKind::Return(Return {
                        loc,
                        expr: Box::new(expr),
                    }),
                ))
            }

            TokenType::SemiColon => {
                self.advance(); // skip ';'
                Some(Expr::new(loc, ExprKind::EmptyStatement))
            }

            TokenType::Eof => None, // reported by the advance that hit it

            _ => {
                self.sess.diags.error_at(
                    &loc,
                    format!("expected an expression, actual '{}'.", self.cur.describe()),
                );
                None
            }
        }
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        self.trace("parse_unary");
        let loc = self.cur.loc.clone();
        let op = self.cur.ty;
        self.expect_and_consume(op)?;

        let operand = self.parse_primary()?;
        Some(Expr::new(
            loc.clone(),
            ExprKind::Unary(Unary {
                loc,
                op,
                operand: Box::new(operand),
            }),
        ))
    }

    fn parse_identifier(&mut self) -> Option<Identifier> {
        if !self.expect(TokenType::Identifier) {
            return None;
        }
        let loc = self.cur.loc.clone();
        let name = self.cur.ident().expect("identifier token").clone();
        self.expect_and_consume(TokenType::Identifier)?;
        Some(Identifier { loc, name })
    }

    /// After an identifier in expression position: a following identifier
    /// (or pointer run) re-reads it as a type specifier and parses a
    /// declaration; calls and accesses are reserved forms.
    fn parse_postfix_expression(&mut self, identifier: Identifier) -> Option<Expr> {
        self.trace("parse_postfix_expression");
        match self.cur.ty {
            TokenType::ParenL => {
                self.sess
                    .diags
                    .error_at(&self.cur.loc, "function calls are not implemented.");
                None
            }
            TokenType::SquareL => {
                self.sess
                    .diags
                    .error_at(&self.cur.loc, "array accesses are not implemented.");
                None
            }
            TokenType::Dot => {
                self.sess
                    .diags
                    .error_at(&self.cur.loc, "member accesses are not implemented.");
                None
            }
            TokenType::Identifier | TokenType::Star => {
                let type_specifier = self.try_parse_type(identifier);
                self.parse_declaration(type_specifier)
            }
            _ => {
                let loc = identifier.loc.clone();
                Some(Expr::new(loc, ExprKind::Identifier(identifier)))
            }
        }
    }

    fn try_parse_type(&mut self, identifier: Identifier) -> TypeSpecifier {
        self.trace("try_parse_type");
        if identifier.name.sym != self.sess.syms.int_type {
            self.sess
                .diags
                .error_at(&identifier.loc, "this parser can only handle 'int' as type.");
        }
        TypeSpecifier {
            loc: identifier.loc.clone(),
            identifier,
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Declarator tails:
    ///   case 1: `int value;`
    ///   case 2: `int value = 0;`
    ///   case 3: `int function();`
    ///   case 4: `int function() { ... }`
    fn parse_declaration(&mut self, type_specifier: TypeSpecifier) -> Option<Expr> {
        self.trace("parse_declaration");
        let loc = type_specifier.loc.clone();
        let mut declarator = self.parse_declarator()?;

        // (cases 3 and 4)
        if self.cur.ty == TokenType::ParenL {
            declarator.parameters = Some(self.parse_parameters()?);

            if self.cur.ty == TokenType::BraceL {
                let block = self.parse_block()?;
                return Some(Expr::new(
                    loc.clone(),
                    ExprKind::Declaration(Declaration {
                        loc,
                        kind: DeclarationKind::FunctionDefinition,
                        type_specifier,
                        declarator: Box::new(declarator),
                        function_block: Some(Box::new(block)),
                    }),
                ));
            }

            self.expect_and_consume(TokenType::SemiColon)?;
            return Some(simple_declaration(loc, type_specifier, declarator));
        }

        // (case 2)
        if self.cur.ty == TokenType::Equal {
            self.expect_and_consume(TokenType::Equal)?;
            let initializer = self.parse_expr()?;
            declarator.initializer = Some(Box::new(initializer));
        }

        // (case 1, and the tail of case 2)
        self.expect_and_consume(TokenType::SemiColon)?;
        Some(simple_declaration(loc, type_specifier, declarator))
    }

    fn parse_declarator(&mut self) -> Option<Declarator> {
        self.trace("parse_declarator");
        let mut pointer_depth = 0;
        while self.cur.ty == TokenType::Star {
            pointer_depth += 1;
            self.advance();
        }

        let ident = self.parse_identifier()?;

        let mut array_specifier = None;
        if self.cur.ty == TokenType::SquareL {
            let loc = self.cur.loc.clone();
            self.advance(); // skip '['
            let size = if self.cur.ty == TokenType::SquareR {
                None // empty array size
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect_and_consume(TokenType::SquareR)?;
            array_specifier = Some(ArraySpecifier { loc, size });
        }

        Some(Declarator {
            loc: ident.loc.clone(),
            ident,
            pointer_depth,
            parameters: None,
            array_specifier,
            initializer: None,
        })
    }

    fn parse_parameters(&mut self) -> Option<Parameters> {
        self.trace("parse_parameters");
        let loc = self.cur.loc.clone();
        self.expect_and_consume(TokenType::ParenL)?;

        let mut list = Vec::new();
        if self.cur.ty != TokenType::ParenR {
            loop {
                list.push(self.parse_parameter()?);
                if self.cur.ty == TokenType::Comma {
                    self.advance();
                    continue;
                }
                break;
            }
        }

        self.expect_and_consume(TokenType::ParenR)?;
        Some(Parameters { loc, list })
    }

    fn parse_parameter(&mut self) -> Option<Parameter> {
        self.trace("parse_parameter");
        let loc = self.cur.loc.clone();

        if self.cur.ty == TokenType::TripleDot {
            self.advance();
            return Some(Parameter {
                loc,
                type_name: None,
                pointer_depth: 0,
                declarator: None,
                is_var_args: true,
            });
        }

        if !self.expect(TokenType::Identifier) {
            return None;
        }
        let type_name = self.parse_identifier()?;

        let mut pointer_depth = 0;
        while self.cur.ty == TokenType::Star {
            pointer_depth += 1;
            self.advance();
        }

        let declarator = if self.cur.ty == TokenType::Identifier {
            let ident = self.parse_identifier()?;
            Some(Declarator {
                loc: ident.loc.clone(),
                ident,
                pointer_depth: 0,
                parameters: None,
                array_specifier: None,
                initializer: None,
            })
        } else {
            None
        };

        Some(Parameter {
            loc,
            type_name: Some(type_name),
            pointer_depth,
            declarator,
            is_var_args: false,
        })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> Option<Block> {
        self.trace("parse_block");
        let loc = self.cur.loc.clone();
        self.expect_and_consume(TokenType::BraceL)?;

        let mut block = Block::new(loc);
        while !matches!(self.cur.ty, TokenType::BraceR | TokenType::Eof) {
            let statement = self.parse_statement()?;
            block.statements.push(statement);
        }

        self.expect_and_consume(TokenType::BraceR)?;
        Some(block)
    }

    fn parse_statement(&mut self) -> Option<Expr> {
        self.trace("parse_statement");
        let expr = self.parse_expr()?;

        match &expr.kind {
            // Declarations and empty statements consume their own ';'.
            ExprKind::Declaration(_) | ExprKind::EmptyStatement => Some(expr),
            ExprKind::Return(_) => {
                self.expect_and_consume(TokenType::SemiColon)?;
                Some(expr)
            }
            _ => {
                self.sess
                    .diags
                    .error_at(&expr.loc, "this expression is not a valid statement here.");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn advance(&mut self) {
        self.cur = self.pp.next_parse_token();
    }

    fn is_unary_operator(&self) -> bool {
        matches!(
            self.cur.ty,
            TokenType::Amp
                | TokenType::Dot
                | TokenType::Exclam
                | TokenType::Minus
                | TokenType::Plus
                | TokenType::Star
                | TokenType::Tilde
        )
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

    /// Consumes the expected token and reports a premature end-of-file
    /// when the grammar cannot end after it (anything but ';' and '}').
    fn expect_and_consume(&mut self, ty: TokenType) -> Option<()> {
        if !self.expect(ty) {
            return None;
        }
        let consumed = self.cur.clone();
        self.advance();

        if self.cur.is_eof()
            && !matches!(consumed.ty, TokenType::SemiColon | TokenType::BraceR)
        {
            self.sess.diags.error_at(
                &consumed.loc,
                format!(
                    "syntax error: unexpected end-of-file after: '{}'.",
                    consumed.describe()
                ),
            );
            return None;
        }
        Some(())
    }

    fn trace(&self, production: &str) {
        if self.sess.options.debug_parser {
            eprintln!("{}", production);
        }
    }
}

fn literal(loc: crate::diagnostics::Location, kind: LiteralKind) -> Expr {
    Expr::new(
        loc.clone(),
        ExprKind::Literal(Literal { loc, kind }),
    )
}

fn simple_declaration(
    loc: crate::diagnostics::Location,
    type_specifier: TypeSpecifier,
    declarator: Declarator,
) -> Expr {
    Expr::new(
        loc.clone(),
        ExprKind::Declaration(Declaration {
            loc,
            kind: DeclarationKind::Simple,
            type_specifier,
            declarator: Box::new(declarator),
            function_block: None,
        }),
    )
}
