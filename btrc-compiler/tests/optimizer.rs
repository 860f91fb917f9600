// Dead-helper elimination properties.

use btrc_compiler::ir::{IrExpr, IrStmt};
use btrc_compiler::{generate_ir, optimize, IrModule};
use btrc_resolver::Analyzer;
use std::collections::HashSet;

fn build_module(source: &str) -> IrModule {
    let mut parser = btrc_parser::Parser::new(source).unwrap();
    let program = parser.parse().unwrap();
    let analyzed = Analyzer::new("test.btrc").analyze(program);
    assert!(analyzed.errors.is_empty(), "{:#?}", analyzed.errors);
    generate_ir(&analyzed, false, "test.btrc")
}

fn helper_names(module: &IrModule) -> Vec<String> {
    module.helper_decls.iter().map(|h| h.name.clone()).collect()
}

#[test]
fn test_unused_helpers_dropped() {
    let module = build_module("int main() { print(1); return 0; }");
    let module = optimize(module);
    let names = helper_names(&module);
    assert!(!names.iter().any(|n| n == "__btrc_thread_spawn"));
    assert!(!names.iter().any(|n| n == "__btrc_throw"));
    assert!(!names.iter().any(|n| n == "__btrc_strcat"));
}

#[test]
fn test_used_helper_survives_with_category_dependencies() {
    let module = build_module("int main() { string s = \"x\"; print(s.trim()); return 0; }");
    let module = optimize(module);
    let names = helper_names(&module);
    assert!(names.iter().any(|n| n == "__btrc_trim"));
    // string depends on alloc.
    assert!(names.iter().any(|n| n == "__btrc_safe_malloc"));
}

#[test]
fn test_helper_referenced_only_from_raw_section_survives() {
    // List methods live in a raw section and reference
    // __btrc_safe_realloc as text; the scan must keep it.
    let module = build_module("int main() { List<int> xs = [1]; print(xs.len); return 0; }");
    let module = optimize(module);
    let names = helper_names(&module);
    assert!(names.iter().any(|n| n == "__btrc_safe_realloc"));
}

#[test]
fn test_optimize_is_idempotent() {
    let module = build_module(
        "int main() { string s = \"a\"; s = s + \"b\"; try { throw s; } catch (string e) { print(e); } return 0; }",
    );
    let module = optimize(module);
    let first = helper_names(&module);
    let module = optimize(module);
    let second = helper_names(&module);
    assert_eq!(first, second);
}

#[test]
fn test_every_helper_ref_resolves_after_optimize() {
    let module = build_module(
        "class Node { public Node next = null; Node() {} }\n\
         void build() { Node a = Node(); }\n\
         int main() { build(); string s = \"a\" + \"b\"; print(s); return 0; }",
    );
    let module = optimize(module);

    let kept: HashSet<String> = module
        .helper_decls
        .iter()
        .map(|h| h.name.clone())
        .collect();

    let mut refs = HashSet::new();
    for f in &module.function_defs {
        for stmt in &f.body.stmts {
            collect_refs_stmt(stmt, &mut refs);
        }
    }
    for r in &refs {
        assert!(kept.contains(r), "helper_ref '{}' has no kept helper", r);
    }
}

fn collect_refs_stmt(stmt: &IrStmt, refs: &mut HashSet<String>) {
    match stmt {
        IrStmt::ExprStmt { expr } => collect_refs_expr(expr, refs),
        IrStmt::VarDecl { init: Some(e), .. } => collect_refs_expr(e, refs),
        IrStmt::Assign { target, value } => {
            collect_refs_expr(target, refs);
            collect_refs_expr(value, refs);
        }
        IrStmt::Return { value: Some(e) } => collect_refs_expr(e, refs),
        IrStmt::If {
            condition,
            then_block,
            else_block,
        } => {
            collect_refs_expr(condition, refs);
            for s in &then_block.stmts {
                collect_refs_stmt(s, refs);
            }
            if let Some(b) = else_block {
                for s in &b.stmts {
                    collect_refs_stmt(s, refs);
                }
            }
        }
        IrStmt::While { condition, body } => {
            collect_refs_expr(condition, refs);
            for s in &body.stmts {
                collect_refs_stmt(s, refs);
            }
        }
        IrStmt::For { body, .. } => {
            for s in &body.stmts {
                collect_refs_stmt(s, refs);
            }
        }
        IrStmt::RawC { helper_refs, .. } => {
            for r in helper_refs {
                refs.insert(r.clone());
            }
        }
        _ => {}
    }
}

fn collect_refs_expr(expr: &IrExpr, refs: &mut HashSet<String>) {
    match expr {
        IrExpr::Call {
            helper_ref, args, ..
        } => {
            if !helper_ref.is_empty() {
                refs.insert(helper_ref.clone());
            }
            for a in args {
                collect_refs_expr(a, refs);
            }
        }
        IrExpr::BinOp { left, right, .. } => {
            collect_refs_expr(left, refs);
            collect_refs_expr(right, refs);
        }
        IrExpr::UnaryOp { operand, .. } => collect_refs_expr(operand, refs),
        IrExpr::FieldAccess { obj, .. } => collect_refs_expr(obj, refs),
        IrExpr::Cast { expr, .. } => collect_refs_expr(expr, refs),
        IrExpr::Ternary {
            condition,
            true_expr,
            false_expr,
        } => {
            collect_refs_expr(condition, refs);
            collect_refs_expr(true_expr, refs);
            collect_refs_expr(false_expr, refs);
        }
        IrExpr::StmtExpr { stmts, result } => {
            for s in stmts {
                collect_refs_stmt(s, refs);
            }
            collect_refs_expr(result, refs);
        }
        _ => {}
    }
}
