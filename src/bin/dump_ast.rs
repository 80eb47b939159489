//! Syntax tree dumping tool for debugging the VB parser.

use std::env;
use std::fs;
use std::process::ExitCode;

use vb_lint::diagnostics::LineIndex;
use vb_lint::parser::parse_source_lossy;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: dump_ast <file.vb>");
        return ExitCode::from(2);
    }

    let file_path = &args[1];
    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read {file_path}: {e}");
            return ExitCode::from(2);
        }
    };

    let (unit, errors) = parse_source_lossy(&source);
    println!("AST for {file_path}:");
    println!("{unit:#?}");

    if errors.is_empty() {
        return ExitCode::SUCCESS;
    }

    let index = LineIndex::new(&source);
    for error in &errors {
        let pos = index.position(error.range.start);
        eprintln!("{file_path}:{}:{}: syntax error: {}", pos.row, pos.column, error.message);
    }
    ExitCode::from(1)
}
