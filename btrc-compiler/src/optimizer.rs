// IR optimizer.
//
// One pass today: dead helper elimination. Passes are additive and
// must preserve the invariant that every helper_ref referenced in the
// module corresponds to a kept helper.

use std::collections::{HashMap, HashSet};

use crate::ir::*;

/// Run all optimization passes on an IR module.
pub fn optimize(mut module: IrModule) -> IrModule {
    eliminate_dead_helpers(&mut module);
    module
}

/// Remove runtime helpers not referenced by any function body.
///
/// Collects helper_ref strings from IrExpr::Call and IrStmt::RawC
/// nodes, scans raw sections and raw expressions for literal helper
/// names (macro-like helpers are often embedded as text), then keeps
/// every helper whose name is referenced or whose category survives
/// the transitive category-dependency closure.
fn eliminate_dead_helpers(module: &mut IrModule) {
    if module.helper_decls.is_empty() {
        return;
    }

    let mut used: HashSet<String> = HashSet::new();
    for func in &module.function_defs {
        collect_helper_refs_block(&func.body, &mut used);
    }

    let all_names: Vec<String> = module.helper_decls.iter().map(|h| h.name.clone()).collect();
    for section in &module.raw_sections {
        for name in &all_names {
            if section.contains(name.as_str()) {
                used.insert(name.clone());
            }
        }
    }
    for func in &module.function_defs {
        scan_raw_block(&func.body, &all_names, &mut used);
    }
    for global in &module.global_vars {
        for name in &all_names {
            if global.contains(name.as_str()) {
                used.insert(name.clone());
            }
        }
    }

    if used.is_empty() {
        module.helper_decls.clear();
        return;
    }

    // Category dependency graph.
    let mut cat_deps: HashMap<String, HashSet<String>> = HashMap::new();
    let mut helper_to_cat: HashMap<String, String> = HashMap::new();
    for h in &module.helper_decls {
        helper_to_cat.insert(h.name.clone(), h.category.clone());
        let entry = cat_deps.entry(h.category.clone()).or_default();
        for dep in &h.depends_on {
            entry.insert(dep.clone());
        }
    }

    let used_cats: HashSet<String> = used
        .iter()
        .filter_map(|name| helper_to_cat.get(name).cloned())
        .collect();

    // Transitive closure over category dependencies.
    let mut resolved: HashSet<String> = HashSet::new();
    let mut worklist: Vec<String> = used_cats.into_iter().collect();
    while let Some(cat) = worklist.pop() {
        if !resolved.insert(cat.clone()) {
            continue;
        }
        if let Some(deps) = cat_deps.get(&cat) {
            for dep in deps {
                if !resolved.contains(dep) {
                    worklist.push(dep.clone());
                }
            }
        }
    }

    module
        .helper_decls
        .retain(|h| used.contains(&h.name) || resolved.contains(&h.category));
}

// ==================== helper_ref collection ====================

fn collect_helper_refs_block(block: &IrBlock, used: &mut HashSet<String>) {
    for stmt in &block.stmts {
        collect_helper_refs_stmt(stmt, used);
    }
}

fn collect_helper_refs_stmt(stmt: &IrStmt, used: &mut HashSet<String>) {
    match stmt {
        IrStmt::ExprStmt { expr } => collect_helper_refs_expr(expr, used),
        IrStmt::VarDecl { init, .. } => {
            if let Some(e) = init {
                collect_helper_refs_expr(e, used);
            }
        }
        IrStmt::Assign { target, value } => {
            collect_helper_refs_expr(target, used);
            collect_helper_refs_expr(value, used);
        }
        IrStmt::Return { value } => {
            if let Some(e) = value {
                collect_helper_refs_expr(e, used);
            }
        }
        IrStmt::If {
            condition,
            then_block,
            else_block,
        } => {
            collect_helper_refs_expr(condition, used);
            collect_helper_refs_block(then_block, used);
            if let Some(e) = else_block {
                collect_helper_refs_block(e, used);
            }
        }
        IrStmt::While { condition, body } => {
            collect_helper_refs_expr(condition, used);
            collect_helper_refs_block(body, used);
        }
        IrStmt::DoWhile { body, condition } => {
            collect_helper_refs_block(body, used);
            collect_helper_refs_expr(condition, used);
        }
        IrStmt::For { body, .. } => collect_helper_refs_block(body, used),
        IrStmt::Switch { value, cases } => {
            collect_helper_refs_expr(value, used);
            for case in cases {
                if let Some(v) = &case.value {
                    collect_helper_refs_expr(v, used);
                }
                for s in &case.body {
                    collect_helper_refs_stmt(s, used);
                }
            }
        }
        IrStmt::RawC { helper_refs, .. } => {
            for r in helper_refs {
                used.insert(r.clone());
            }
        }
        IrStmt::Break | IrStmt::Continue => {}
    }
}

fn collect_helper_refs_expr(expr: &IrExpr, used: &mut HashSet<String>) {
    match expr {
        IrExpr::Call {
            helper_ref, args, ..
        } => {
            if !helper_ref.is_empty() {
                used.insert(helper_ref.clone());
            }
            for a in args {
                collect_helper_refs_expr(a, used);
            }
        }
        IrExpr::BinOp { left, right, .. } => {
            collect_helper_refs_expr(left, used);
            collect_helper_refs_expr(right, used);
        }
        IrExpr::UnaryOp { operand, .. } => collect_helper_refs_expr(operand, used),
        IrExpr::FieldAccess { obj, .. } => collect_helper_refs_expr(obj, used),
        IrExpr::Cast { expr, .. } => collect_helper_refs_expr(expr, used),
        IrExpr::Ternary {
            condition,
            true_expr,
            false_expr,
        } => {
            collect_helper_refs_expr(condition, used);
            collect_helper_refs_expr(true_expr, used);
            collect_helper_refs_expr(false_expr, used);
        }
        IrExpr::Index { obj, index } => {
            collect_helper_refs_expr(obj, used);
            collect_helper_refs_expr(index, used);
        }
        IrExpr::AddressOf(e) | IrExpr::Deref(e) => collect_helper_refs_expr(e, used),
        IrExpr::StmtExpr { stmts, result } => {
            for s in stmts {
                collect_helper_refs_stmt(s, used);
            }
            collect_helper_refs_expr(result, used);
        }
        IrExpr::SpawnThread { capture_arg, .. } => {
            used.insert("__btrc_thread_spawn".to_string());
            if let Some(a) = capture_arg {
                collect_helper_refs_expr(a, used);
            }
        }
        IrExpr::Literal(_) | IrExpr::Var(_) | IrExpr::RawExpr(_) | IrExpr::Sizeof(_) => {}
    }
}

// ==================== raw text scanning ====================

fn scan_raw_block(block: &IrBlock, names: &[String], used: &mut HashSet<String>) {
    for stmt in &block.stmts {
        scan_raw_stmt(stmt, names, used);
    }
}

fn scan_raw_stmt(stmt: &IrStmt, names: &[String], used: &mut HashSet<String>) {
    match stmt {
        IrStmt::RawC { text, .. } => {
            for name in names {
                if text.contains(name.as_str()) {
                    used.insert(name.clone());
                }
            }
        }
        IrStmt::ExprStmt { expr } => scan_raw_expr(expr, names, used),
        IrStmt::VarDecl { init, .. } => {
            if let Some(e) = init {
                scan_raw_expr(e, names, used);
            }
        }
        IrStmt::Assign { target, value } => {
            scan_raw_expr(target, names, used);
            scan_raw_expr(value, names, used);
        }
        IrStmt::Return { value } => {
            if let Some(e) = value {
                scan_raw_expr(e, names, used);
            }
        }
        IrStmt::If {
            condition,
            then_block,
            else_block,
        } => {
            scan_raw_expr(condition, names, used);
            scan_raw_block(then_block, names, used);
            if let Some(e) = else_block {
                scan_raw_block(e, names, used);
            }
        }
        IrStmt::While { condition, body } => {
            scan_raw_expr(condition, names, used);
            scan_raw_block(body, names, used);
        }
        IrStmt::DoWhile { body, condition } => {
            scan_raw_block(body, names, used);
            scan_raw_expr(condition, names, used);
        }
        IrStmt::For {
            init,
            condition,
            update,
            body,
        } => {
            for text in [init, condition, update] {
                for name in names {
                    if text.contains(name.as_str()) {
                        used.insert(name.clone());
                    }
                }
            }
            scan_raw_block(body, names, used);
        }
        IrStmt::Switch { value, cases } => {
            scan_raw_expr(value, names, used);
            for case in cases {
                if let Some(v) = &case.value {
                    scan_raw_expr(v, names, used);
                }
                for s in &case.body {
                    scan_raw_stmt(s, names, used);
                }
            }
        }
        IrStmt::Break | IrStmt::Continue => {}
    }
}

fn scan_raw_expr(expr: &IrExpr, names: &[String], used: &mut HashSet<String>) {
    match expr {
        IrExpr::RawExpr(text) => {
            for name in names {
                if text.contains(name.as_str()) {
                    used.insert(name.clone());
                }
            }
        }
        IrExpr::Call { callee, args, .. } => {
            if names.iter().any(|n| n == callee) {
                used.insert(callee.clone());
            }
            for a in args {
                scan_raw_expr(a, names, used);
            }
        }
        IrExpr::BinOp { left, right, .. } => {
            scan_raw_expr(left, names, used);
            scan_raw_expr(right, names, used);
        }
        IrExpr::UnaryOp { operand, .. } => scan_raw_expr(operand, names, used),
        IrExpr::FieldAccess { obj, .. } => scan_raw_expr(obj, names, used),
        IrExpr::Cast { expr, .. } => scan_raw_expr(expr, names, used),
        IrExpr::Ternary {
            condition,
            true_expr,
            false_expr,
        } => {
            scan_raw_expr(condition, names, used);
            scan_raw_expr(true_expr, names, used);
            scan_raw_expr(false_expr, names, used);
        }
        IrExpr::Index { obj, index } => {
            scan_raw_expr(obj, names, used);
            scan_raw_expr(index, names, used);
        }
        IrExpr::AddressOf(e) | IrExpr::Deref(e) => scan_raw_expr(e, names, used),
        IrExpr::StmtExpr { stmts, result } => {
            for s in stmts {
                scan_raw_stmt(s, names, used);
            }
            scan_raw_expr(result, names, used);
        }
        IrExpr::Var(name) => {
            // Helper globals (e.g. __btrc_tracking) are referenced as
            // plain variables.
            if name.starts_with("__btrc_") {
                for n in names {
                    if n == name {
                        used.insert(n.clone());
                    }
                }
            }
        }
        IrExpr::SpawnThread { capture_arg, .. } => {
            if let Some(a) = capture_arg {
                scan_raw_expr(a, names, used);
            }
        }
        IrExpr::Literal(_) | IrExpr::Sizeof(_) => {}
    }
}
