//! The tcposc command line driver: read a TinyCoPoOS source file, parse it
//! as `root`, and write the compiled C program to standard output. On a
//! parse failure the expectation dump is printed and the exit status is
//! non-zero.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use tcposc::c_grammar::c_grammar;
use tcposc::{compile, Arena, FileSink, Interner, Parser};

#[derive(ClapParser)]
#[command(name = "tcposc", about = "Compile TinyCoPoOS source to C", version)]
struct Cli {
    /// The source file to compile
    source: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let source = match std::fs::read(&cli.source) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("cannot read {}: {e}", cli.source.display());
            return ExitCode::FAILURE;
        }
    };

    let mut interner = Interner::new();
    let grammar = c_grammar(&mut interner);
    let mut arena = Arena::for_input(source.len());

    let root = {
        let mut parser = Parser::new(&grammar, &source, &mut arena, &mut interner);
        match parser.parse("root") {
            Ok(root) => root,
            Err(e) => {
                println!("{e}");
                return ExitCode::FAILURE;
            }
        }
    };

    let mut out = FileSink::new(std::io::stdout().lock());
    let diagnostics = compile(&mut arena, &mut interner, root, &mut out);
    if let Some(e) = out.error() {
        eprintln!("write error: {e}");
        return ExitCode::FAILURE;
    }
    for diagnostic in &diagnostics {
        eprintln!("{diagnostic}");
    }
    ExitCode::SUCCESS
}
