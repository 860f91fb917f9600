// Driver library: include resolution, stdlib preloading, and the
// lex → parse → resolve → IR → optimize → emit pipeline.
//
// The binary in main.rs is a thin clap wrapper over `run_pipeline`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use btrc_diagnostics::{Diagnostic, Span};
use thiserror::Error;

pub mod stdlib;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("{0}")]
    Io(String),
    /// Fully rendered diagnostics, ready for stderr. Exit code 1.
    #[error("{rendered}")]
    Compile { rendered: String },
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub emit_tokens: bool,
    pub emit_ast: bool,
    pub emit_ir: bool,
    pub emit_optimized_ir: bool,
    pub debug: bool,
    pub no_runtime: bool,
}

/// What a pipeline run produced: either an intermediate dump
/// (requested via an --emit-* flag) or the final C text.
#[derive(Debug)]
pub enum Output {
    Dump(String),
    CSource(String),
}

/// Resolve `#include "file.btrc"` directives by textual inclusion,
/// with a circular-include guard. Non-btrc includes pass through to
/// the C output untouched.
pub fn resolve_includes(
    source: &str,
    source_path: &Path,
    included: &mut HashSet<PathBuf>,
) -> Result<String, DriverError> {
    let source_dir = source_path.parent().map(Path::to_path_buf).unwrap_or_default();
    let abs = source_path
        .canonicalize()
        .unwrap_or_else(|_| source_path.to_path_buf());
    if !included.insert(abs) {
        return Ok(String::new());
    }

    let mut result = Vec::new();
    for line in source.split('\n') {
        match parse_btrc_include(line) {
            Some(include_name) => {
                let full_path = source_dir.join(&include_name);
                let content = std::fs::read_to_string(&full_path).map_err(|_| {
                    DriverError::Io(format!(
                        "Include file '{}' not found (resolved to '{}')",
                        include_name,
                        full_path.display()
                    ))
                })?;
                result.push(resolve_includes(&content, &full_path, included)?);
            }
            None => result.push(line.to_string()),
        }
    }
    Ok(result.join("\n"))
}

/// Match `#include "name.btrc"` (whitespace-tolerant); other
/// preprocessor lines are left for the emitter.
fn parse_btrc_include(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("#include")?.trim();
    let inner = rest.strip_prefix('"')?.strip_suffix('"')?;
    if inner.ends_with(".btrc") {
        Some(inner.to_string())
    } else {
        None
    }
}

/// Run the full pipeline over already-include-resolved source.
/// `source` should have the stdlib prepended; diagnostics are
/// rendered against exactly this text.
pub fn run_pipeline(source: &str, filename: &str, opts: &Options) -> Result<Output, DriverError> {
    // Lexing
    log::debug!("lexing {}", filename);
    let tokens = btrc_lexer::Lexer::tokenize(source).map_err(|e| {
        let span = Span::from_offset(filename, source, e.span().start);
        DriverError::Compile {
            rendered: Diagnostic::error(e.to_string(), span).render(source),
        }
    })?;

    if opts.emit_tokens {
        let mut out = String::new();
        for t in &tokens {
            out.push_str(&format!("{:?} @ {}..{}\n", t.token, t.span.start, t.span.end));
        }
        return Ok(Output::Dump(out));
    }

    // Parsing
    log::debug!("parsing {}", filename);
    let mut parser = btrc_parser::Parser::from_tokens(tokens, source);
    let program = parser.parse().map_err(|e| {
        let (line, col) = e.location();
        let span = Span::new(filename, line, col);
        DriverError::Compile {
            rendered: Diagnostic::error(e.to_string(), span).render(source),
        }
    })?;

    if opts.emit_ast {
        let json = serde_json::to_string_pretty(&program)
            .map_err(|e| DriverError::Io(e.to_string()))?;
        return Ok(Output::Dump(json));
    }

    // Resolution — all diagnostics are accumulated and printed in one
    // batch; the IR generator never runs over an errored program.
    log::debug!("resolving {}", filename);
    let analyzed = btrc_resolver::Analyzer::new(filename).analyze(program);
    if !analyzed.errors.is_empty() {
        let rendered: Vec<String> = analyzed.errors.iter().map(|d| d.render(source)).collect();
        return Err(DriverError::Compile {
            rendered: rendered.join("\n"),
        });
    }

    // Code generation: AST → IR → optimize → C text
    log::debug!("generating IR for {}", filename);
    let module = btrc_compiler::generate_ir(&analyzed, opts.debug, filename);

    if opts.emit_ir {
        return Ok(Output::Dump(dump_ir(&module)));
    }

    let module = btrc_compiler::optimize(module);

    if opts.emit_optimized_ir {
        return Ok(Output::Dump(dump_ir(&module)));
    }

    let mut emitter = btrc_compiler::CEmitter::new();
    if opts.debug {
        emitter = emitter.with_debug(filename);
    }
    if opts.no_runtime {
        emitter = emitter.without_runtime();
    }
    Ok(Output::CSource(emitter.emit(&module)))
}

/// Canonical IR dump for --emit-ir / --emit-optimized-ir.
pub fn dump_ir(module: &btrc_compiler::IrModule) -> String {
    let mut out = format!(
        "# IrModule: {} structs, {} functions, {} helpers\n",
        module.struct_defs.len(),
        module.function_defs.len(),
        module.helper_decls.len()
    );
    for s in &module.struct_defs {
        let fields: Vec<String> = s
            .fields
            .iter()
            .map(|f| format!("{} {}", f.c_type, f.name))
            .collect();
        out.push_str(&format!("struct {} {{ {} }}\n", s.name, fields.join(", ")));
    }
    for f in &module.function_defs {
        let params: Vec<String> = f
            .params
            .iter()
            .map(|p| format!("{} {}", p.c_type, p.name))
            .collect();
        out.push_str(&format!(
            "fn {}({}) -> {}\n",
            f.name,
            params.join(", "),
            f.return_type
        ));
    }
    out
}
