//! C source emitter.
//!
//! Walks a [`TopLevel`] and prints equivalent C into a string buffer,
//! indenting nested blocks with a configurable pattern. The AST is never
//! modified.

use std::fs;
use std::io;
use std::path::Path;

use crate::ast::{
    Block, Declaration, DeclarationKind, Declarator, Expr, ExprKind, Identifier, Literal,
    LiteralKind, Parameter, Parameters, TopLevel, TypeSpecifier,
};

pub struct Converter {
    buffer: String,
    indent_pattern: String,
    indentation_level: u32,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            indent_pattern: "    ".to_string(),
            indentation_level: 0,
        }
    }

    pub fn convert_to_string(&mut self, top_level: &TopLevel) -> String {
        self.buffer.clear();
        for statement in &top_level.block.statements {
            self.print_expr(statement);
        }
        std::mem::take(&mut self.buffer)
    }

    pub fn convert_to_file(&mut self, top_level: &TopLevel, path: &Path) -> io::Result<()> {
        let output = self.convert_to_string(top_level);
        fs::write(path, output)
    }

    fn print_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Declaration(declaration) => self.print_declaration(declaration),
            ExprKind::Declarator(declarator) => self.print_declarator(declarator),
            ExprKind::TypeSpecifier(type_specifier) => self.print_type_specifier(type_specifier),
            ExprKind::Parameter(parameter) => self.print_parameter(parameter),
            ExprKind::Parameters(parameters) => self.print_parameters(parameters),
            ExprKind::Identifier(identifier) => self.print_identifier(identifier),
            ExprKind::Literal(literal) => self.print_literal(literal),
            ExprKind::Return(ret) => {
                self.indent();
                self.print_str("return ");
                self.print_expr(&ret.expr);
                self.print_str(";");
            }
            ExprKind::Unary(unary) => {
                self.print_str(unary.op.as_str());
                self.print_expr(&unary.operand);
            }
            ExprKind::Binary(binary) => {
                self.print_expr(&binary.left);
                self.print_str(" ");
                self.print_str(binary.op.as_str());
                self.print_str(" ");
                self.print_expr(&binary.right);
            }
            ExprKind::Block(block) => self.print_block(block),
            ExprKind::EmptyStatement => {
                self.indent();
                self.print_str(";\n");
            }
            ExprKind::ArraySpecifier(array) => {
                self.print_str("[");
                if let Some(size) = &array.size {
                    self.print_expr(size);
                }
                self.print_str("]");
            }
            ExprKind::If(if_expr) => {
                self.indent();
                self.print_str("if (");
                self.print_expr(&if_expr.condition);
                self.print_str(") ");
                self.print_expr(&if_expr.then_branch);
                if let Some(else_branch) = &if_expr.else_branch {
                    self.print_str(" else ");
                    self.print_expr(else_branch);
                }
            }
        }
    }

    fn print_identifier(&mut self, identifier: &Identifier) {
        self.print_str(&identifier.name.text);
    }

    fn print_type_specifier(&mut self, type_specifier: &TypeSpecifier) {
        self.print_identifier(&type_specifier.identifier);
    }

    fn print_literal(&mut self, literal: &Literal) {
        match &literal.kind {
            LiteralKind::Bool(value) => {
                self.print_str(if *value { "true" } else { "false" })
            }
            LiteralKind::Integer(value) => self.print_string(value.to_string()),
            LiteralKind::Float(value) => self.print_string(value.to_string()),
            LiteralKind::Null => self.print_str("null"),
            LiteralKind::String(content) => {
                self.print_str("\"");
                self.print_string(content.to_string());
                self.print_str("\"");
            }
        }
    }

    fn print_pointers(&mut self, count: u32) {
        for _ in 0..count {
            self.print_str("*");
        }
    }

    fn print_parameters(&mut self, parameters: &Parameters) {
        self.print_str("(");
        let mut first = true;
        for parameter in &parameters.list {
            if !first {
                self.print_str(", ");
            }
            self.print_parameter(parameter);
            first = false;
        }
        self.print_str(")");
    }

    fn print_parameter(&mut self, parameter: &Parameter) {
        if parameter.is_var_args {
            self.print_str("...");
            return;
        }
        if let Some(type_name) = &parameter.type_name {
            self.print_identifier(type_name);
        }
        if parameter.pointer_depth > 0 {
            self.print_str(" ");
            self.print_pointers(parameter.pointer_depth);
            if let Some(declarator) = &parameter.declarator {
                self.print_declarator(declarator);
            }
        } else if let Some(declarator) = &parameter.declarator {
            self.print_str(" ");
            self.print_declarator(declarator);
        }
    }

    fn print_declaration(&mut self, declaration: &Declaration) {
        match declaration.kind {
            DeclarationKind::FunctionDefinition => {
                // Extra space around function definitions.
                self.new_line();
                self.print_type_specifier(&declaration.type_specifier);
                self.print_str(" ");
                self.print_identifier(&declaration.declarator.ident);
                if let Some(parameters) = &declaration.declarator.parameters {
                    self.print_parameters(parameters);
                }
                if let Some(block) = &declaration.function_block {
                    self.push_brace();
                    for statement in &block.statements {
                        self.print_expr(statement);
                    }
                    self.pop_brace();
                }
                self.new_line();
            }
            DeclarationKind::Simple => {
                self.indent();
                self.print_type_specifier(&declaration.type_specifier);
                self.print_str(" ");
                self.print_declarator(&declaration.declarator);
                self.print_str(";");
                self.print_str("\n");
            }
        }
    }

    fn print_declarator(&mut self, declarator: &Declarator) {
        if declarator.pointer_depth > 0 {
            self.print_pointers(declarator.pointer_depth);
        }

        self.print_identifier(&declarator.ident);

        if let Some(array_specifier) = &declarator.array_specifier {
            self.print_str("[");
            if let Some(size) = &array_specifier.size {
                self.print_expr(size);
            }
            self.print_str("]");
        }

        if let Some(initializer) = &declarator.initializer {
            self.print_str(" = ");
            self.print_expr(initializer);
        }

        if let Some(parameters) = &declarator.parameters {
            self.print_parameters(parameters);
        }
    }

    fn print_block(&mut self, block: &Block) {
        self.push_brace();
        for statement in &block.statements {
            self.print_expr(statement);
        }
        self.pop_brace();
    }

    // ------------------------------------------------------------------
    // Buffer helpers
    // ------------------------------------------------------------------

    fn print_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn print_string(&mut self, text: String) {
        self.buffer.push_str(&text);
    }

    fn indent(&mut self) {
        let indentation = self.indent_pattern.repeat(self.indentation_level as usize);
        self.buffer.push_str(&indentation);
    }

    fn push_brace(&mut self) {
        self.new_line();
        self.print_str("{");
        self.indentation_level += 1;
        self.new_line();
    }

    fn pop_brace(&mut self) {
        self.indentation_level -= 1;
        self.new_line();
        self.print_str("}");
        self.new_line();
    }

    fn new_line(&mut self) {
        self.print_str("\n");
    }
}
