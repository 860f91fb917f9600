// Driver pipeline and binary round-trip tests.

use btrc_cli::{run_pipeline, stdlib, Options, Output};
use std::process::Command;

fn with_stdlib(user: &str) -> String {
    let lib = stdlib::get_stdlib_source(user);
    if lib.is_empty() {
        user.to_string()
    } else {
        format!("{}\n{}", lib, user)
    }
}

#[test]
fn test_pipeline_produces_c_source() {
    let source = with_stdlib("int main() { print(Math.abs(-3)); return 0; }");
    let out = run_pipeline(&source, "test.btrc", &Options::default()).unwrap();
    let Output::CSource(c) = out else {
        panic!("expected C source");
    };
    assert!(c.contains("int main(void)"));
    assert!(c.contains("Math_abs(")); // static dispatch into the stdlib class
}

#[test]
fn test_pipeline_reports_resolver_errors() {
    let source = with_stdlib("int main() { return missing; }");
    let err = run_pipeline(&source, "test.btrc", &Options::default()).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("missing"));
    assert!(rendered.contains("test.btrc"));
}

#[test]
fn test_emit_flags_short_circuit() {
    let source = with_stdlib("int main() { return 0; }");

    let opts = Options {
        emit_tokens: true,
        ..Options::default()
    };
    let Output::Dump(tokens) = run_pipeline(&source, "t.btrc", &opts).unwrap() else {
        panic!("expected dump");
    };
    assert!(tokens.contains("Ident(\"main\")"));

    let opts = Options {
        emit_ast: true,
        ..Options::default()
    };
    let Output::Dump(ast) = run_pipeline(&source, "t.btrc", &opts).unwrap() else {
        panic!("expected dump");
    };
    assert!(ast.contains("\"declarations\""));

    let opts = Options {
        emit_ir: true,
        ..Options::default()
    };
    let Output::Dump(ir) = run_pipeline(&source, "t.btrc", &opts).unwrap() else {
        panic!("expected dump");
    };
    assert!(ir.starts_with("# IrModule:"));
    assert!(ir.contains("fn main()"));
}

#[test]
fn test_no_runtime_suppresses_helpers() {
    let source = with_stdlib("int main() { string s = \"a\" + \"b\"; print(s); return 0; }");
    let opts = Options {
        no_runtime: true,
        ..Options::default()
    };
    let Output::CSource(c) = run_pipeline(&source, "t.btrc", &opts).unwrap() else {
        panic!("expected C source");
    };
    // Call sites remain, helper definitions do not.
    assert!(c.contains("__btrc_strcat(\"a\", \"b\")"));
    assert!(!c.contains("static char* __btrc_strcat"));
}

#[test]
fn test_debug_emits_line_directives() {
    let source = with_stdlib("int main() { return 0; }");
    let opts = Options {
        debug: true,
        ..Options::default()
    };
    let Output::CSource(c) = run_pipeline(&source, "prog.btrc", &opts).unwrap() else {
        panic!("expected C source");
    };
    assert!(c.contains("#line"));
    assert!(c.contains("\"prog.btrc\""));
}

// ==================== binary round trips ====================

#[test]
fn test_binary_success_exit_zero() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("hello.btrc");
    let output = dir.path().join("hello_out.c");
    std::fs::write(&input, "int main() { print(42); return 0; }").unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_btrc"))
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .output()
        .unwrap();

    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Transpiled"));
    let c = std::fs::read_to_string(&output).unwrap();
    assert!(c.contains("printf(\"%d\\n\", 42);"));
}

#[test]
fn test_binary_default_output_name() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("prog.btrc");
    std::fs::write(&input, "int main() { return 0; }").unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_btrc"))
        .arg(&input)
        .output()
        .unwrap();

    assert!(result.status.success());
    assert!(dir.path().join("prog.c").exists());
}

#[test]
fn test_binary_compile_error_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.btrc");
    std::fs::write(&input, "int main() { return missing_name; }").unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_btrc"))
        .arg(&input)
        .output()
        .unwrap();

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("missing_name"));
    assert!(stderr.contains("-->"));
}

#[test]
fn test_binary_missing_file_exit_one() {
    let result = Command::new(env!("CARGO_BIN_EXE_btrc"))
        .arg("/nonexistent/nope.btrc")
        .output()
        .unwrap();
    assert_eq!(result.status.code(), Some(1));
}

#[test]
fn test_include_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let helper = dir.path().join("helper.btrc");
    std::fs::write(&helper, "int twice(int x) { return x * 2; }\n").unwrap();
    let input = dir.path().join("main.btrc");
    std::fs::write(
        &input,
        "#include \"helper.btrc\"\nint main() { print(twice(21)); return 0; }",
    )
    .unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_btrc"))
        .arg(&input)
        .output()
        .unwrap();

    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));
    let c = std::fs::read_to_string(dir.path().join("main.c")).unwrap();
    assert!(c.contains("int twice(int x)"));
    assert!(c.contains("twice(21)"));
}
