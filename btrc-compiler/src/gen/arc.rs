// ARC scope-release and destroy lowering.
//
// Scope-exit cleanup, phased release for cyclable types, return-path
// release, and the explicit `release` statement.

use btrc_ast::Expr;
use btrc_resolver::ClassInfo;

use super::expressions::lower_expr;
use super::types::{is_generic_class_type, mangle_generic_type};
use super::IrGenerator;
use crate::ir::{IrBlock, IrExpr, IrStmt};

/// The destroy/free function name for a managed class name (plain or
/// mangled generic).
pub(crate) fn destroy_fn_for_managed(gen: &IrGenerator, cls_name: &str) -> String {
    let base = lookup_base_class(gen, cls_name)
        .map(|(name, _)| name)
        .unwrap_or_else(|| cls_name.to_string());
    let has_free = gen
        .analyzed
        .class_table
        .get(&base)
        .is_some_and(|c| c.methods.contains_key("free"));
    if has_free {
        format!("{}_free", cls_name)
    } else {
        format!("{}_destroy", cls_name)
    }
}

/// Resolve a plain or mangled class name back to its ClassInfo.
fn lookup_base_class<'a>(gen: &'a IrGenerator, cls_name: &str) -> Option<(String, &'a ClassInfo)> {
    if let Some(info) = gen.analyzed.class_table.get(cls_name) {
        return Some((cls_name.to_string(), info));
    }
    for (cname, info) in &gen.analyzed.class_table {
        if cls_name.starts_with(&format!("btrc_{}_", cname)) {
            return Some((cname.clone(), info));
        }
    }
    None
}

fn is_cyclable_name(gen: &IrGenerator, cls_name: &str) -> bool {
    lookup_base_class(gen, cls_name).is_some_and(|(_, info)| info.is_cyclable)
}

/// `if (x != NULL) { if (--x->__rc <= 0) destroy(x); }`
fn simple_release(var_name: &str, destroy_fn: &str) -> IrStmt {
    IrStmt::If {
        condition: IrExpr::binop(IrExpr::var(var_name), "!=", IrExpr::lit("NULL")),
        then_block: IrBlock::new(vec![IrStmt::If {
            condition: IrExpr::binop(
                IrExpr::UnaryOp {
                    op: "--".to_string(),
                    operand: Box::new(IrExpr::field(IrExpr::var(var_name), "__rc", true)),
                    prefix: true,
                },
                "<=",
                IrExpr::lit("0"),
            ),
            then_block: IrBlock::new(vec![IrStmt::ExprStmt {
                expr: IrExpr::call(destroy_fn, vec![IrExpr::var(var_name)]),
            }]),
            else_block: None,
        }]),
        else_block: None,
    }
}

/// Release code for one scope's managed vars, reverse declaration
/// order. Scopes containing cyclable instances take the phased path.
pub fn emit_scope_release(gen: &mut IrGenerator, managed: &[(String, String)]) -> Vec<IrStmt> {
    let has_cyclable = managed
        .iter()
        .any(|(_, cls_name)| is_cyclable_name(gen, cls_name));
    if has_cyclable {
        return emit_scope_release_phased(gen, managed);
    }

    managed
        .iter()
        .rev()
        .map(|(var_name, cls_name)| {
            let destroy_fn = destroy_fn_for_managed(gen, cls_name);
            simple_release(var_name, &destroy_fn)
        })
        .collect()
}

/// Four-phase release for scopes containing cyclable types.
///
/// Destroyed-object tracking keeps cascade destruction (phase 2) from
/// reading freed memory: every later read is gated through
/// `__btrc_is_destroyed()`, which short-circuits first.
fn emit_scope_release_phased(gen: &mut IrGenerator, managed: &[(String, String)]) -> Vec<IrStmt> {
    gen.use_helper("__btrc_suspect_buf");
    gen.use_helper("__btrc_collect_cycles");
    gen.use_helper("__btrc_destroyed_tracking");

    let mut stmts = Vec::new();

    // Enable cascade-destroy tracking.
    stmts.push(IrStmt::Assign {
        target: IrExpr::var("__btrc_tracking"),
        value: IrExpr::lit("1"),
    });
    stmts.push(IrStmt::Assign {
        target: IrExpr::var("__btrc_destroyed_count"),
        value: IrExpr::lit("0"),
    });

    // Phase 1: decrement rc for ALL managed vars.
    for (var_name, _) in managed.iter().rev() {
        stmts.push(IrStmt::If {
            condition: IrExpr::binop(IrExpr::var(var_name), "!=", IrExpr::lit("NULL")),
            then_block: IrBlock::new(vec![IrStmt::ExprStmt {
                expr: IrExpr::UnaryOp {
                    op: "--".to_string(),
                    operand: Box::new(IrExpr::field(IrExpr::var(var_name), "__rc", true)),
                    prefix: true,
                },
            }]),
            else_block: None,
        });
    }

    // Phase 2: destroy those at rc <= 0, skipping cascade-freed ones.
    for (var_name, cls_name) in managed.iter().rev() {
        let destroy_fn = destroy_fn_for_managed(gen, cls_name);
        stmts.push(IrStmt::If {
            condition: IrExpr::binop(IrExpr::var(var_name), "!=", IrExpr::lit("NULL")),
            then_block: IrBlock::new(vec![IrStmt::If {
                condition: IrExpr::binop(
                    IrExpr::call("__btrc_is_destroyed", vec![IrExpr::var(var_name)]),
                    "==",
                    IrExpr::lit("0"),
                ),
                then_block: IrBlock::new(vec![IrStmt::If {
                    condition: IrExpr::binop(
                        IrExpr::field(IrExpr::var(var_name), "__rc", true),
                        "<=",
                        IrExpr::lit("0"),
                    ),
                    then_block: IrBlock::new(vec![
                        IrStmt::ExprStmt {
                            expr: IrExpr::call(destroy_fn, vec![IrExpr::var(var_name)]),
                        },
                        IrStmt::Assign {
                            target: IrExpr::var(var_name),
                            value: IrExpr::lit("NULL"),
                        },
                    ]),
                    else_block: None,
                }]),
                else_block: None,
            }]),
            else_block: None,
        });
    }

    // Phase 3: suspect survivors (rc > 0) for cycle collection.
    for (var_name, cls_name) in managed.iter().rev() {
        if !is_cyclable_name(gen, cls_name) {
            continue;
        }
        let destroy_fn = destroy_fn_for_managed(gen, cls_name);
        stmts.push(IrStmt::If {
            condition: IrExpr::binop(IrExpr::var(var_name), "!=", IrExpr::lit("NULL")),
            then_block: IrBlock::new(vec![IrStmt::If {
                condition: IrExpr::binop(
                    IrExpr::call("__btrc_is_destroyed", vec![IrExpr::var(var_name)]),
                    "==",
                    IrExpr::lit("0"),
                ),
                then_block: IrBlock::new(vec![IrStmt::If {
                    condition: IrExpr::binop(
                        IrExpr::field(IrExpr::var(var_name), "__rc", true),
                        ">",
                        IrExpr::lit("0"),
                    ),
                    then_block: IrBlock::new(vec![IrStmt::ExprStmt {
                        expr: IrExpr::Call {
                            callee: "__btrc_suspect".to_string(),
                            helper_ref: "__btrc_suspect_buf".to_string(),
                            args: vec![
                                IrExpr::var(var_name),
                                IrExpr::raw(format!("(__btrc_visit_fn){}_visit", cls_name)),
                                IrExpr::raw(format!("(__btrc_destroy_fn){}", destroy_fn)),
                            ],
                        },
                    }]),
                    else_block: None,
                }]),
                else_block: None,
            }]),
            else_block: None,
        });
    }

    // Phase 4: collect cycles if anything was suspected.
    stmts.push(IrStmt::If {
        condition: IrExpr::binop(IrExpr::var("__btrc_suspect_count"), ">", IrExpr::lit("0")),
        then_block: IrBlock::new(vec![IrStmt::ExprStmt {
            expr: IrExpr::call_helper("__btrc_collect_cycles", vec![]),
        }]),
        else_block: None,
    });

    stmts.push(IrStmt::Assign {
        target: IrExpr::var("__btrc_tracking"),
        value: IrExpr::lit("0"),
    });

    stmts
}

/// rc-- for every managed var across all scopes, except the variable
/// being returned (ownership transfers to the caller).
pub fn emit_return_release(gen: &mut IrGenerator, returned_var: Option<&str>) -> Vec<IrStmt> {
    let all_managed = gen.get_all_managed_vars();
    let mut stmts = Vec::new();
    for (var_name, cls_name) in all_managed.iter().rev() {
        if Some(var_name.as_str()) == returned_var {
            continue;
        }
        let destroy_fn = destroy_fn_for_managed(gen, cls_name);
        stmts.push(simple_release(var_name, &destroy_fn));
    }
    stmts
}

/// `release x` → rc--; destroy at zero; x = NULL.
pub fn lower_release(gen: &mut IrGenerator, node: &Expr) -> Vec<IrStmt> {
    let expr_type = gen.node_type(node.id);
    let expr = lower_expr(gen, node);

    let destroy_fn = match &expr_type {
        Some(t) if gen.analyzed.class_table.contains_key(&t.base) => {
            if !t.generic_args.is_empty()
                && is_generic_class_type(Some(t), &gen.analyzed.class_table)
            {
                let mangled = mangle_generic_type(&t.base, &t.generic_args);
                destroy_fn_for_managed(gen, &mangled)
            } else {
                destroy_fn_for_managed(gen, &t.base)
            }
        }
        _ => "free".to_string(),
    };

    vec![
        IrStmt::If {
            condition: IrExpr::binop(expr.clone(), "!=", IrExpr::lit("NULL")),
            then_block: IrBlock::new(vec![IrStmt::If {
                condition: IrExpr::binop(
                    IrExpr::UnaryOp {
                        op: "--".to_string(),
                        operand: Box::new(IrExpr::field(expr.clone(), "__rc", true)),
                        prefix: true,
                    },
                    "<=",
                    IrExpr::lit("0"),
                ),
                then_block: IrBlock::new(vec![IrStmt::ExprStmt {
                    expr: IrExpr::call(destroy_fn, vec![expr.clone()]),
                }]),
                else_block: None,
            }]),
            else_block: None,
        },
        IrStmt::Assign {
            target: expr,
            value: IrExpr::lit("NULL"),
        },
    ]
}
