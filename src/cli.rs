//! Command-line interface.
//!
//! Commands are `help`, `version` and `compile`; `compile` is the default
//! when the first argument is not a known command. Flag parsing is done by
//! clap after a small normalization pass that expands `--option-file`,
//! rewrites the GCC-style aliases (`-E`, `-C`, `-I`, `-isystem`) and
//! resolves duplicate flags so file options can be overridden from the
//! command line.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use once_cell::sync::Lazy;

use crate::compiler::{Compiler, Error, Options, Steps};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Flags that take no value; duplicates from an option file collapse to a
/// single occurrence.
static BOOL_FLAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "--colored-output",
        "--debug-parser",
        "--display-surrounding-lines",
        "--parse-only",
        "--preprocess",
        "--preserve-comment",
        "--reject-hex-float",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Parser)]
#[command(
    name = "acc compile",
    about = "Compile C source files.",
    no_binary_name = true
)]
struct CompileArgs {
    /// Enable ANSI coloring of diagnostics (default: on when stderr is a
    /// terminal).
    #[arg(long)]
    colored_output: bool,

    /// Trace parser productions to stderr.
    #[arg(long)]
    debug_parser: bool,

    /// Show the surrounding source lines in diagnostics (default: on).
    #[arg(long)]
    display_surrounding_lines: bool,

    /// Suffix of the generated C files.
    #[arg(long, value_name = "EXT", default_value = ".g.c")]
    output_extension: String,

    /// Stop after parsing; emit no output.
    #[arg(long)]
    parse_only: bool,

    /// Stop after preprocessing and print the token stream.
    #[arg(long)]
    preprocess: bool,

    /// Keep comments in the preprocessed output.
    #[arg(long)]
    preserve_comment: bool,

    /// Treat hexadecimal float literals as errors.
    #[arg(long)]
    reject_hex_float: bool,

    /// Append a directory to the system include paths.
    #[arg(long, value_name = "DIR")]
    system_include: Vec<PathBuf>,

    /// Append a directory to the user include paths.
    #[arg(long, value_name = "DIR")]
    user_include: Vec<PathBuf>,

    /// Read additional flags from a file, one per line; '#' starts a line
    /// comment. File flags are applied first, command-line flags override.
    #[arg(long, value_name = "PATH")]
    option_file: Option<PathBuf>,

    /// Files to compile.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

/// Entry point of the binary; returns the process exit code.
pub fn run() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    run_with_args(args)
}

pub fn run_with_args(args: Vec<String>) -> i32 {
    let Some(first) = args.first() else {
        print_help();
        return 1;
    };

    match first.as_str() {
        "help" => {
            print_help();
            0
        }
        "version" => {
            println!("{}", VERSION);
            0
        }
        "compile" => compile(args[1..].to_vec()),
        // Anything else is treated as `compile` arguments.
        _ => compile(args),
    }
}

fn print_help() {
    println!("AC compiler command line interface.");
    println!("usage:");
    println!();
    println!("acc help");
    println!("acc version");
    println!("acc compile [--option-file <option-file>] <filename>");
}

fn compile(args: Vec<String>) -> i32 {
    let args = match expand_option_file(args) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {}", err);
            return 1;
        }
    };
    let args = normalize(args);

    let parsed = match CompileArgs::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
        }
    };

    let mut compiler = Compiler::new(to_options(parsed));
    if compiler.compile() {
        0
    } else {
        1
    }
}

fn to_options(args: CompileArgs) -> Options {
    let CompileArgs {
        colored_output,
        debug_parser,
        display_surrounding_lines,
        output_extension,
        parse_only,
        preprocess,
        preserve_comment,
        reject_hex_float,
        system_include,
        user_include,
        option_file: _, // already spliced in during normalization
        files,
    } = args;

    let defaults = Options::default();
    Options {
        step: if parse_only { Steps::PARSE } else { Steps::ALL },
        files,
        output_extension,
        preprocess,
        preserve_comment,
        reject_hex_float,
        debug_parser,
        colored_output: colored_output || atty::is(atty::Stream::Stderr),
        // Surrounding lines default to on; the flag forces them on.
        display_surrounding_lines: defaults.display_surrounding_lines
            || display_surrounding_lines,
        system_includes: system_include,
        user_includes: user_include,
    }
}

/// Splices the contents of `--option-file <path>` in front of the other
/// arguments: one flag per line, blank lines and `#` comments ignored.
/// Command-line flags follow the file's, so they win when duplicates are
/// resolved.
fn expand_option_file(args: Vec<String>) -> Result<Vec<String>, Error> {
    let Some(index) = args.iter().position(|arg| arg == "--option-file") else {
        return Ok(args);
    };
    let Some(path) = args.get(index + 1) else {
        return Err(Error::MissingFlagValue {
            flag: "--option-file".to_string(),
        });
    };

    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(Error::FileNotFound(path));
    }
    let content = fs::read_to_string(&path).map_err(|source| Error::ReadFile {
        path: path.clone(),
        source,
    })?;

    let mut merged: Vec<String> = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        merged.push(trimmed.to_string());
    }

    // The command line keeps everything except the consumed pair.
    for (i, arg) in args.into_iter().enumerate() {
        if i == index || i == index + 1 {
            continue;
        }
        merged.push(arg);
    }
    Ok(merged)
}

/// Rewrites the GCC-style aliases to their long forms and resolves
/// duplicate flags: toggles collapse to one occurrence,
/// `--output-extension` keeps its last value.
fn normalize(args: Vec<String>) -> Vec<String> {
    let rewritten: Vec<String> = args
        .into_iter()
        .map(|arg| {
            match arg.as_str() {
                "-E" => "--preprocess".to_string(),
                "-C" => "--preserve-comment".to_string(),
                "-I" => "--user-include".to_string(),
                "-isystem" => "--system-include".to_string(),
                _ => arg,
            }
        })
        .collect();

    let mut out: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut output_extension: Option<String> = None;

    let mut i = 0;
    while i < rewritten.len() {
        let arg = rewritten[i].clone();

        if arg == "--output-extension" {
            if let Some(value) = rewritten.get(i + 1) {
                output_extension = Some(value.clone());
                i += 2;
            } else {
                out.push(arg); // let clap report the missing value
                i += 1;
            }
            continue;
        }

        if BOOL_FLAGS.contains(arg.as_str()) {
            if seen.insert(arg.clone()) {
                out.push(arg);
            }
            i += 1;
            continue;
        }

        out.push(arg);
        i += 1;
    }

    if let Some(extension) = output_extension {
        out.push("--output-extension".to_string());
        out.push(extension);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcc_aliases_are_rewritten() {
        let args = normalize(vec!["-E".into(), "-C".into(), "-I".into(), "dir".into()]);
        assert_eq!(
            args,
            vec!["--preprocess", "--preserve-comment", "--user-include", "dir"]
        );
    }

    #[test]
    fn duplicate_toggles_collapse() {
        let args = normalize(vec![
            "--preprocess".into(),
            "--preprocess".into(),
            "file.c".into(),
        ]);
        assert_eq!(args, vec!["--preprocess", "file.c"]);
    }

    #[test]
    fn last_output_extension_wins() {
        let args = normalize(vec![
            "--output-extension".into(),
            ".a.c".into(),
            "--output-extension".into(),
            ".b.c".into(),
            "file.c".into(),
        ]);
        assert_eq!(args, vec!["file.c", "--output-extension", ".b.c"]);
    }

    #[test]
    fn compile_args_parse_after_normalization() {
        let parsed =
            CompileArgs::try_parse_from(["--preprocess", "--output-extension", ".x.c", "a.c"])
                .unwrap();
        assert!(parsed.preprocess);
        assert_eq!(parsed.output_extension, ".x.c");
        assert_eq!(parsed.files, vec![PathBuf::from("a.c")]);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(CompileArgs::try_parse_from(["--no-such-flag"]).is_err());
    }
}
