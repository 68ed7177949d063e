//! # nanocc
//!
//! The command-line front end of the compiler: lex and parse the input,
//! optionally dump the syntax tree as JSON, otherwise generate assembly for
//! the host and hand it to the system toolchain.

mod cli;

use cli::*;

use std::{
    fs,
    path::Path,
    process::{self, Command},
};

use log::{error, info};
use nanoc::{
    codegen::{self, Target},
    error::{CompileError, CompileResult},
    lexer::Lexer,
    parser::Parser,
};

fn main() {
    let args = Cli::init();

    simple_logger::init_with_level(args.verbosity.into()).unwrap();

    if let Err(err) = run(&args) {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn run(args: &Cli) -> CompileResult<()> {
    let source = fs::read_to_string(&args.file).map_err(|err| {
        CompileError::new(format!("could not read '{}': {err}", args.file.display()))
    })?;

    info!("Parsing '{}'...", args.file.display());
    let program = Parser::new(Lexer::new(&source)?).parse()?;

    if args.dump_ast {
        let json = serde_json::to_string_pretty(&program).map_err(|err| {
            CompileError::new(format!("could not serialize the syntax tree: {err}"))
        })?;
        return match &args.output {
            Some(path) => fs::write(path, json + "\n").map_err(|err| {
                CompileError::new(format!("could not write '{}': {err}", path.display()))
            }),
            None => {
                println!("{json}");
                Ok(())
            }
        };
    }

    info!("Generating code...");
    let assembly = codegen::generate(&program, Target::host())?;

    // with -S the assembly is the output; otherwise it lands next to the
    // input and the executable takes the output path
    let asm_path = match (&args.output, args.assembly_only) {
        (Some(output), true) => output.clone(),
        _ => args.file.with_extension("s"),
    };
    fs::write(&asm_path, &assembly).map_err(|err| {
        CompileError::new(format!("could not write '{}': {err}", asm_path.display()))
    })?;

    if args.assembly_only {
        return Ok(());
    }

    let exec_path = match &args.output {
        Some(output) => output.clone(),
        None => args.file.with_extension(""),
    };
    link(&asm_path, &exec_path)
}

/// Assemble and link through the system C compiler.
fn link(asm_path: &Path, exec_path: &Path) -> CompileResult<()> {
    info!("Linking '{}'...", exec_path.display());

    let output = Command::new("cc")
        .arg("-o")
        .arg(exec_path)
        .arg(asm_path)
        .arg("-lc")
        .output()
        .map_err(|err| CompileError::new(format!("could not run cc: {err}")))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        error!("{stderr}");
    }

    if !output.status.success() {
        return Err(CompileError::new(format!("cc failed ({})", output.status)));
    }

    Ok(())
}
