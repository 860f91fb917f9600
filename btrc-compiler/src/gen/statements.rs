// Statement lowering: AST stmt → IrStmt. Main dispatch, variable
// declarations, and the quick_text utility. Control flow lives in
// control_flow.rs, loops in iterations.rs, ARC in arc.rs.

use btrc_ast::*;

use super::expressions::lower_expr;
use super::types::{is_collection_type, mangle_generic_type};
use super::{arc, calls, control_flow, iterations, lambdas, IrGenerator};
use crate::ir::{CType, IrBlock, IrExpr, IrStmt};

/// Lower a block with its own ARC-managed scope. Scope-exit release
/// code is appended unless the block already ends in a return.
pub fn lower_block(gen: &mut IrGenerator, block: &Block) -> IrBlock {
    gen.push_managed_scope();
    let mut stmts = Vec::new();
    for s in &block.statements {
        stmts.extend(lower_stmt(gen, s));
    }
    let managed = gen.pop_managed_scope();
    let ends_in_jump = matches!(
        stmts.last(),
        Some(IrStmt::Return { .. }) | Some(IrStmt::Break) | Some(IrStmt::Continue)
    );
    if !managed.is_empty() && !ends_in_jump {
        stmts.extend(arc::emit_scope_release(gen, &managed));
    }
    IrBlock::new(stmts)
}

pub fn lower_stmt(gen: &mut IrGenerator, node: &Stmt) -> Vec<IrStmt> {
    match node {
        Stmt::VarDecl(v) => lower_var_decl(gen, v),
        Stmt::Return { value } => lower_return(gen, value.as_ref()),
        Stmt::If(i) => vec![control_flow::lower_if(gen, i)],
        Stmt::While { condition, body } => {
            let cond = lower_expr(gen, condition);
            vec![IrStmt::While {
                condition: cond,
                body: lower_block(gen, body),
            }]
        }
        Stmt::DoWhile { body, condition } => {
            let b = lower_block(gen, body);
            vec![IrStmt::DoWhile {
                body: b,
                condition: lower_expr(gen, condition),
            }]
        }
        Stmt::CFor(f) => vec![iterations::lower_c_for(gen, f)],
        // Parallel for lowers to a serial for in this version.
        Stmt::ForIn(f) => iterations::lower_for_in(gen, f),
        Stmt::Switch(s) => vec![control_flow::lower_switch(gen, s)],
        Stmt::Break => vec![IrStmt::Break],
        Stmt::Continue => vec![IrStmt::Continue],
        Stmt::Expr(e) => {
            let mut stmts = Vec::new();
            if matches!(e.kind, ExprKind::Call { .. }) {
                stmts.extend(calls::emit_keep_rc_increments(gen, e));
            }
            let ir = lower_expr(gen, e);
            stmts.push(IrStmt::ExprStmt { expr: ir });
            stmts
        }
        Stmt::Delete { expr } => control_flow::lower_delete(gen, expr),
        Stmt::Release { expr } => arc::lower_release(gen, expr),
        Stmt::TryCatch(t) => control_flow::lower_try_catch(gen, t),
        Stmt::Throw { expr } => control_flow::lower_throw(gen, expr),
    }
}

/// Return-path release: drop every managed local except the returned
/// identifier (ownership transfers to the caller). Functions marked
/// `keep` on the return do not exempt the returned variable.
fn lower_return(gen: &mut IrGenerator, value: Option<&Expr>) -> Vec<IrStmt> {
    let returned_var = match value {
        Some(Expr {
            kind: ExprKind::Identifier { name },
            ..
        }) if !gen.current_fn_keep_return => Some(name.clone()),
        _ => None,
    };

    let mut stmts = Vec::new();
    let all_managed = gen.get_all_managed_vars();
    if !all_managed.is_empty() {
        stmts.extend(arc::emit_return_release(gen, returned_var.as_deref()));
    }
    let val = value.map(|v| lower_expr(gen, v));
    stmts.push(IrStmt::Return { value: val });
    stmts
}

fn lower_var_decl(gen: &mut IrGenerator, node: &VarDecl) -> Vec<IrStmt> {
    // Resolve the declared type through any active generic
    // substitution before using it for mangling decisions.
    let declared = node.ty.as_ref().map(|t| {
        if gen.type_map.is_empty() {
            t.clone()
        } else {
            super::types::resolve_type(t, &gen.type_map)
        }
    });

    // Array declarations keep C syntax: `int arr[5] = {...};`
    if let Some(ty) = &declared {
        if ty.is_array {
            let mut base = ty.clone();
            base.is_array = false;
            let size = base.array_size.take();
            let base_c = gen.ctype(Some(&base));
            let var_name = match size {
                Some(sz) => {
                    let ir = lower_expr(gen, &sz);
                    format!("{}[{}]", node.name, quick_text(&ir))
                }
                None => format!("{}[]", node.name),
            };
            let init = node.initializer.as_ref().map(|i| lower_expr(gen, i));
            return vec![IrStmt::VarDecl {
                c_type: CType::new(base_c),
                name: var_name,
                init,
            }];
        }
    }

    // Lambda initializers lift to a static function; the variable
    // holds the function pointer (plus a capture env when needed).
    if let Some(init) = &node.initializer {
        if matches!(init.kind, ExprKind::Lambda(_)) {
            return lambdas::lower_lambda_var_decl(gen, node, init);
        }
    }

    let mut stmts = Vec::new();
    let c_type = match &declared {
        Some(t) => gen.ctype(Some(t)),
        None => "int".to_string(),
    };

    let init = match &node.initializer {
        Some(init) => {
            if matches!(init.kind, ExprKind::Call { .. }) {
                stmts.extend(calls::emit_keep_rc_increments(gen, init));
            }
            Some(lower_collection_aware_init(gen, declared.as_ref(), init))
        }
        None => None,
    };

    stmts.push(IrStmt::VarDecl {
        c_type: CType::new(c_type),
        name: node.name.clone(),
        init,
    });

    register_managed_local(gen, node, declared.as_ref());
    stmts
}

/// Initializer lowering that understands empty collection literals
/// and generic constructor calls.
fn lower_collection_aware_init(
    gen: &mut IrGenerator,
    declared: Option<&TypeExpr>,
    init: &Expr,
) -> IrExpr {

    // Empty {} / [] on a collection-typed variable → mangled _new()
    let empty = match &init.kind {
        ExprKind::BraceInit { elements } => elements.is_empty(),
        ExprKind::ListLiteral { elements } => elements.is_empty(),
        ExprKind::MapLiteral { entries } => entries.is_empty(),
        _ => false,
    };
    if empty {
        if let Some(ty) = declared {
            if is_collection_type(Some(ty)) {
                let mangled = mangle_generic_type(&ty.base, &ty.generic_args);
                return IrExpr::call(format!("{}_new", mangled), vec![]);
            }
        }
    }

    let lowered = lower_expr(gen, init);

    // Generic constructor patch: `Box<int> b = Box(42);` lowered the
    // callee as Box_new; the declared type names the instance.
    if let (Some(ty), ExprKind::Call { callee, .. }) = (declared, &init.kind) {
        if !ty.generic_args.is_empty() {
            if let ExprKind::Identifier { name } = &callee.kind {
                let is_generic_class = gen
                    .analyzed
                    .class_table
                    .get(name)
                    .is_some_and(|c| !c.generic_params.is_empty());
                if is_generic_class {
                    if let IrExpr::Call { args, .. } = lowered {
                        let mangled = mangle_generic_type(name, &ty.generic_args);
                        return IrExpr::call(format!("{}_new", mangled), args);
                    }
                }
            }
        }
    }

    lowered
}

/// Class-typed locals initialized from a fresh allocation join the
/// current managed scope. Aliases (`Point p = q;`) do not — they do
/// not own a reference.
fn register_managed_local(gen: &mut IrGenerator, node: &VarDecl, declared: Option<&TypeExpr>) {
    let Some(ty) = declared else {
        return;
    };
    let Some(init) = &node.initializer else {
        return;
    };
    if ty.pointer_depth > 0 || ty.is_array {
        return;
    }
    let owning = match &init.kind {
        ExprKind::New { .. } => true,
        ExprKind::Call { callee, .. } => {
            matches!(&callee.kind, ExprKind::Identifier { name }
                if gen.analyzed.class_table.contains_key(name))
        }
        _ => false,
    };
    if !owning {
        return;
    }
    let Some(info) = gen.analyzed.class_table.get(&ty.base) else {
        return;
    };
    let class_name = if !info.generic_params.is_empty() && !ty.generic_args.is_empty() {
        mangle_generic_type(&ty.base, &ty.generic_args)
    } else {
        ty.base.clone()
    };
    gen.register_managed_var(&node.name, &class_name);
}

/// Render an IR expression as inline C text, for for-loop headers and
/// statement-expression pieces.
pub fn quick_text(expr: &IrExpr) -> String {
    match expr {
        IrExpr::Literal(text) => text.clone(),
        IrExpr::Var(name) => name.clone(),
        IrExpr::RawExpr(text) => text.clone(),
        IrExpr::BinOp { left, op, right } => {
            format!("({} {} {})", quick_text(left), op, quick_text(right))
        }
        IrExpr::UnaryOp {
            op,
            operand,
            prefix,
        } => {
            if *prefix {
                format!("({}{})", op, quick_text(operand))
            } else {
                format!("({}{})", quick_text(operand), op)
            }
        }
        IrExpr::Call { callee, args, .. } => {
            let args: Vec<String> = args.iter().map(quick_text).collect();
            format!("{}({})", callee, args.join(", "))
        }
        IrExpr::FieldAccess { obj, field, arrow } => {
            let sep = if *arrow { "->" } else { "." };
            format!("{}{}{}", quick_text(obj), sep, field)
        }
        IrExpr::Index { obj, index } => format!("{}[{}]", quick_text(obj), quick_text(index)),
        IrExpr::Cast { target_type, expr } => {
            format!("(({}){})", target_type, quick_text(expr))
        }
        IrExpr::Ternary {
            condition,
            true_expr,
            false_expr,
        } => format!(
            "({} ? {} : {})",
            quick_text(condition),
            quick_text(true_expr),
            quick_text(false_expr)
        ),
        IrExpr::AddressOf(e) => format!("(&{})", quick_text(e)),
        IrExpr::Deref(e) => format!("(*{})", quick_text(e)),
        IrExpr::Sizeof(operand) => format!("sizeof({})", operand),
        IrExpr::StmtExpr { stmts, result } => {
            let mut parts: Vec<String> = stmts.iter().map(stmt_inline_text).collect();
            parts.push(format!("{};", quick_text(result)));
            format!("({{ {} }})", parts.join(" "))
        }
        IrExpr::SpawnThread {
            fn_ptr,
            capture_arg,
        } => {
            let arg = capture_arg
                .as_ref()
                .map(|a| quick_text(a))
                .unwrap_or_else(|| "NULL".to_string());
            format!("__btrc_thread_spawn((void*(*)(void*)){}, {})", fn_ptr, arg)
        }
    }
}

/// Render a statement inline, for statement expressions.
pub fn stmt_inline_text(stmt: &IrStmt) -> String {
    match stmt {
        IrStmt::VarDecl { c_type, name, init } => match init {
            Some(e) => format!("{} {} = {};", c_type, name, quick_text(e)),
            None => format!("{} {};", c_type, name),
        },
        IrStmt::ExprStmt { expr } => format!("{};", quick_text(expr)),
        IrStmt::Assign { target, value } => {
            format!("{} = {};", quick_text(target), quick_text(value))
        }
        IrStmt::If {
            condition,
            then_block,
            ..
        } => {
            let body: Vec<String> = then_block.stmts.iter().map(stmt_inline_text).collect();
            format!("if ({}) {{ {} }}", quick_text(condition), body.join(" "))
        }
        IrStmt::RawC { text, .. } => text.clone(),
        _ => "/* unsupported inline stmt */;".to_string(),
    }
}
