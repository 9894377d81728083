//! Source locations and diagnostic reporting.
//!
//! Every token and AST node carries a [`Location`]. Diagnostics are written
//! to stderr in the fixed format
//! `[<filepath>: ][<row>:<col>: ]error: <message>` followed, when enabled,
//! by the surrounding source lines with a caret under the offending column.
//! Errors and warnings are counted; the driver turns a non-zero error count
//! into a non-zero exit code.

use std::cell::Cell;
use std::fmt::Display;
use std::io::Write;
use std::rc::Rc;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// A position in a source file: 1-based row and column, 0-based byte
/// offset, plus shared views of the file path and content so context lines
/// can be rendered later without re-reading the file.
#[derive(Debug, Clone)]
pub struct Location {
    pub path: Rc<str>,
    /// 1-based. 0 means "no position".
    pub row: u32,
    /// 1-based. 0 means "no position".
    pub col: u32,
    /// 0-based byte offset into `content`.
    pub pos: usize,
    pub content: Rc<str>,
}

impl Location {
    pub fn start_of(path: Rc<str>, content: Rc<str>) -> Self {
        Self {
            path,
            row: 1,
            col: 1,
            pos: 0,
            content,
        }
    }

    /// Placeholder for messages not tied to a source position.
    pub fn none() -> Self {
        Self {
            path: Rc::from(""),
            row: 0,
            col: 0,
            pos: 0,
            content: Rc::from(""),
        }
    }

    pub fn has_position(&self) -> bool {
        self.row > 0 && self.col > 0
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn prefix(self) -> &'static str {
        match self {
            Severity::Error => "error:",
            Severity::Warning => "warning:",
        }
    }
}

/// Diagnostic sink owned by the compiler session.
#[derive(Debug)]
pub struct Diagnostics {
    errors: Cell<u32>,
    warnings: Cell<u32>,
    color: ColorChoice,
    /// How many lines of context to show above and below the offending
    /// line. 0 disables context entirely.
    surrounding_lines: u32,
}

impl Diagnostics {
    pub fn new(colored: bool, display_surrounding_lines: bool) -> Self {
        Self {
            errors: Cell::new(0),
            warnings: Cell::new(0),
            color: if colored {
                ColorChoice::Always
            } else {
                ColorChoice::Never
            },
            surrounding_lines: if display_surrounding_lines { 1 } else { 0 },
        }
    }

    pub fn error_count(&self) -> u32 {
        self.errors.get()
    }

    pub fn warning_count(&self) -> u32 {
        self.warnings.get()
    }

    pub fn error(&self, message: impl Display) {
        self.emit(Severity::Error, None, &message);
    }

    pub fn warning(&self, message: impl Display) {
        self.emit(Severity::Warning, None, &message);
    }

    pub fn error_at(&self, loc: &Location, message: impl Display) {
        self.emit(Severity::Error, Some(loc), &message);
    }

    pub fn warning_at(&self, loc: &Location, message: impl Display) {
        self.emit(Severity::Warning, Some(loc), &message);
    }

    fn emit(&self, severity: Severity, loc: Option<&Location>, message: &dyn Display) {
        match severity {
            Severity::Error => self.errors.set(self.errors.get() + 1),
            Severity::Warning => self.warnings.set(self.warnings.get() + 1),
        }

        let mut out = StandardStream::stderr(self.color);

        if let Some(loc) = loc {
            if !loc.path.is_empty() {
                let _ = write!(out, "{}: ", loc.path);
            }
            if loc.has_position() {
                let _ = write!(out, "{}:{}: ", loc.row, loc.col);
            }
        }

        if severity == Severity::Error {
            let _ = out.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
        }
        let _ = write!(out, "{} ", severity.prefix());
        let _ = out.reset();

        let _ = writeln!(out, "{}", message);

        if let Some(loc) = loc {
            if self.surrounding_lines > 0 && loc.has_position() && !loc.content.is_empty() {
                self.print_context(&mut out, loc);
            }
        }
    }

    /// Prints the lines around `loc.row` with a `<n>> ` margin and a caret
    /// under `loc.col` on the offending line.
    fn print_context(&self, out: &mut StandardStream, loc: &Location) {
        let first = loc.row.saturating_sub(self.surrounding_lines).max(1);
        let last = loc.row + self.surrounding_lines;

        let mut shown: Vec<(u32, &str)> = Vec::new();
        for (index, line) in loc.content.lines().enumerate() {
            let row = index as u32 + 1;
            if row > last {
                break;
            }
            if row >= first {
                shown.push((row, line));
            }
        }

        let margin_width = shown
            .last()
            .map(|(row, _)| row.to_string().len())
            .unwrap_or(1);

        for (row, line) in shown {
            let _ = writeln!(out, "{:>width$}> {}", row, line, width = margin_width);

            if row == loc.row {
                let _ = write!(out, "{:width$}", "", width = margin_width + 2);
                let upto = (loc.col as usize).saturating_sub(1);
                for ch in line.chars().take(upto) {
                    // Keep tabs so the caret stays aligned with the line above.
                    let _ = write!(out, "{}", if ch.is_whitespace() { ch } else { ' ' });
                }
                let _ = writeln!(out, "^");
            }
        }
    }
}
