//! `acc` is a small C-to-C compiler front end: a hand-rolled lexer, a
//! preprocessor with object-like and function-like macro expansion, a
//! recursive-descent parser for a subset of C, and a converter that
//! re-emits the parsed translation unit as C source.

pub mod ast;
pub mod cli;
pub mod compiler;
pub mod converter;
pub mod diagnostics;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod session;
pub mod token;

pub use compiler::{Compiler, Error, Options, SourceFile, Steps};
pub use diagnostics::{Diagnostics, Location};
pub use intern::{Ident, Interner, Symbol};
pub use lexer::Lexer;
pub use parser::Parser;
pub use preprocessor::Preprocessor;
pub use session::Session;
pub use token::{Token, TokenType, TokenValue};
