use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use btrc_cli::{resolve_includes, run_pipeline, stdlib, Options, Output};

#[derive(Parser)]
#[command(name = "btrc")]
#[command(version = "0.3.0")]
#[command(about = "btrc — a language that transpiles to C", long_about = None)]
struct Cli {
    /// Input .btrc file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output .c file (default: <input>.c)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Print the token stream and exit
    #[arg(long)]
    emit_tokens: bool,

    /// Print the AST as JSON and exit
    #[arg(long)]
    emit_ast: bool,

    /// Print the IR (before optimization) and exit
    #[arg(long)]
    emit_ir: bool,

    /// Print the IR (after optimization) and exit
    #[arg(long)]
    emit_optimized_ir: bool,

    /// Emit #line directives for source-level debugging
    #[arg(long)]
    debug: bool,

    /// Don't include runtime helpers in the output
    #[arg(long)]
    no_runtime: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(_) => {
            eprintln!("Error: File '{}' not found", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    // Resolve #include "file.btrc" directives textually.
    let mut included = HashSet::new();
    let source = match resolve_includes(&source, &cli.input, &mut included) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Auto-include the standard library, skipping shadowed files.
    let stdlib_source = stdlib::get_stdlib_source(&source);
    let source = if stdlib_source.is_empty() {
        source
    } else {
        format!("{}\n{}", stdlib_source, source)
    };

    let filename = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.input.display().to_string());

    let opts = Options {
        emit_tokens: cli.emit_tokens,
        emit_ast: cli.emit_ast,
        emit_ir: cli.emit_ir,
        emit_optimized_ir: cli.emit_optimized_ir,
        debug: cli.debug,
        no_runtime: cli.no_runtime,
    };

    let c_source = match run_pipeline(&source, &filename, &opts) {
        Ok(Output::Dump(text)) => {
            print!("{}", text);
            return ExitCode::SUCCESS;
        }
        Ok(Output::CSource(text)) => text,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let out_path = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension("c"));
    if let Err(e) = std::fs::write(&out_path, c_source) {
        eprintln!("Error: cannot write '{}': {}", out_path.display(), e);
        return ExitCode::FAILURE;
    }

    println!("Transpiled {} → {}", cli.input.display(), out_path.display());
    ExitCode::SUCCESS
}
