//! Compiler driver.
//!
//! Owns the options and the session, loads each translation unit and runs
//! it through the pipeline: preprocess-and-print for `--preprocess`,
//! otherwise parse, then (optionally) emit C through the converter. A
//! failing file is dropped and compilation moves on to the next one; the
//! final success is judged by the diagnostic error count.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::converter::Converter;
use crate::parser::Parser;
use crate::preprocessor::Preprocessor;
use crate::session::Session;
use crate::token::TokenType;

/// Driver-level failures. Source-level problems go through the diagnostic
/// sink instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("file does not exist: {0}")]
    FileNotFound(PathBuf),
    #[error("could not read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: io::Error,
    },
    #[error("{flag} expects a following value")]
    MissingFlagValue { flag: String },
}

/// Compilation steps, combinable as a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Steps(u8);

impl Steps {
    pub const PARSE: Steps = Steps(1 << 0);
    pub const SEMANTIC: Steps = Steps(1 << 1);
    pub const GENERATE: Steps = Steps(1 << 2);
    pub const ALL: Steps = Steps(u8::MAX);

    pub fn contains(self, other: Steps) -> bool {
        self.0 & other.0 == other.0
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub step: Steps,
    pub files: Vec<PathBuf>,
    /// Suffix of the generated C file.
    pub output_extension: String,
    pub preprocess: bool,
    pub preserve_comment: bool,
    pub reject_hex_float: bool,
    pub debug_parser: bool,
    pub colored_output: bool,
    pub display_surrounding_lines: bool,
    pub system_includes: Vec<PathBuf>,
    pub user_includes: Vec<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            step: Steps::ALL,
            files: Vec::new(),
            output_extension: ".g.c".to_string(),
            preprocess: false,
            preserve_comment: false,
            reject_hex_float: false,
            debug_parser: false,
            colored_output: false,
            display_surrounding_lines: true,
            system_includes: Vec::new(),
            user_includes: Vec::new(),
        }
    }
}

/// A loaded translation unit. Content is shared so tokens and locations
/// can alias it for the whole compiler run.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: Rc<str>,
    pub content: Rc<str>,
}

impl SourceFile {
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: Rc::from(path.to_string_lossy().as_ref()),
            content: Rc::from(content.as_str()),
        })
    }
}

pub struct Compiler {
    pub sess: Session,
}

impl Compiler {
    pub fn new(options: Options) -> Self {
        Self {
            sess: Session::new(options),
        }
    }

    /// Compiles every requested file. Returns true when no error was
    /// reported.
    pub fn compile(&mut self) -> bool {
        let files = self.sess.options.files.clone();
        for file in &files {
            self.compile_file(file);
        }
        self.sess.diags.error_count() == 0
    }

    fn compile_file(&self, path: &Path) {
        let source = match SourceFile::load(path) {
            Ok(source) => source,
            Err(err) => {
                self.sess.diags.error(err);
                return;
            }
        };

        if self.sess.options.preprocess {
            let output = self.preprocess_to_string(&source);
            let mut stdout = io::stdout();
            let _ = stdout.write_all(output.as_bytes());
            return;
        }

        let mut parser = Parser::new(&self.sess, &source);
        let Some(top_level) = parser.parse() else {
            return; // diagnostics already reported
        };

        if !self.sess.options.step.contains(Steps::SEMANTIC) {
            return;
        }
        // No semantic analysis in this core.

        if !self.sess.options.step.contains(Steps::GENERATE) {
            return;
        }

        let out_path = output_path(path, &self.sess.options.output_extension);
        let mut converter = Converter::new();
        if let Err(source) = converter.convert_to_file(&top_level, &out_path) {
            self.sess.diags.error(Error::WriteFile {
                path: out_path,
                source,
            });
        }
    }

    /// Expanded token stream as text, GCC `-E` style: newlines preserved,
    /// comments dropped unless `--preserve-comment`, macro-internal
    /// spacing restored from the leading-space flags.
    pub fn preprocess_to_string(&self, source: &SourceFile) -> String {
        let mut pp = Preprocessor::new(
            &self.sess,
            Rc::clone(&source.content),
            Rc::clone(&source.path),
        );

        let mut out = String::new();
        let mut pending_space = false;
        loop {
            let tok = pp.next_token();
            match tok.ty {
                TokenType::Eof => break,
                TokenType::NewLine | TokenType::HorizontalWhitespace => {
                    let _ = write!(out, "{}", tok);
                    pending_space = false;
                }
                TokenType::Comment => {
                    if self.sess.options.preserve_comment {
                        let _ = write!(out, "{}", tok);
                    } else {
                        // A dropped comment still separates tokens.
                        pending_space = true;
                    }
                }
                _ => {
                    let needs_space = pending_space || tok.previous_was_space;
                    if needs_space && !out.is_empty() && !out.ends_with(char::is_whitespace) {
                        out.push(' ');
                    }
                    let _ = write!(out, "{}", tok);
                    pending_space = false;
                }
            }
        }
        out
    }
}

/// `foo.c` with extension `.g.c` becomes `foo.g.c`.
fn output_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input.with_extension("");
    PathBuf::from(format!("{}{}", stem.display(), extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preprocess(source: &str, preserve_comment: bool) -> String {
        let mut options = Options::default();
        options.preserve_comment = preserve_comment;
        let compiler = Compiler::new(options);
        let file = SourceFile {
            path: Rc::from("test.c"),
            content: Rc::from(source),
        };
        compiler.preprocess_to_string(&file)
    }

    #[test]
    fn output_path_swaps_the_extension() {
        assert_eq!(
            output_path(Path::new("dir/foo.c"), ".g.c"),
            PathBuf::from("dir/foo.g.c")
        );
    }

    #[test]
    fn preprocessing_removes_directive_lines() {
        let output = preprocess("#define PI 314\nint x = PI;\n", false);
        assert_eq!(output, "int x = PI;\n".replace("PI", "314"));
    }

    #[test]
    fn comments_are_dropped_unless_preserved() {
        let source = "int/*mid*/x;\n";
        assert_eq!(preprocess(source, false), "int x;\n");
        assert_eq!(preprocess(source, true), "int/*mid*/x;\n");
    }

    #[test]
    fn preprocessing_is_idempotent_without_directives() {
        let source = "int  a = 1;\n// note\nchar b;\n";
        let once = preprocess(source, true);
        let twice = preprocess(&once, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn steps_mask_combines() {
        assert!(Steps::ALL.contains(Steps::GENERATE));
        assert!(!Steps::PARSE.contains(Steps::SEMANTIC));
    }
}
