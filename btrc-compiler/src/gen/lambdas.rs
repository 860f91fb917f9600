// Lambda lowering: LambdaExpr → static function + capture struct.

use btrc_ast::*;

use super::statements::{lower_block, lower_stmt};
use super::{IrGenerator, PendingLambda};
use crate::ir::{CType, IrBlock, IrExpr, IrFunctionDef, IrParam, IrStmt};

/// Lift a lambda to a static function. The expression value is the
/// function name (lambdas are function-pointer values); captures go
/// through a `void*` env parameter appended after the declared ones.
pub fn lower_lambda(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::Lambda(lambda) = &node.kind else {
        return IrExpr::lit("0");
    };

    let lambda_id = gen.fresh_lambda_id();
    let fn_name = format!("__btrc_lambda_{}", lambda_id);
    let env_name = format!("__btrc_lambda_{}_env", lambda_id);

    let captures = gen
        .analyzed
        .lambda_captures
        .get(&node.id)
        .cloned()
        .unwrap_or_default();
    let has_captures = !captures.is_empty();

    let mut capture_fields = Vec::new();
    if has_captures {
        let fields = captures
            .iter()
            .map(|cap| {
                let c = gen.ctype(Some(&cap.ty));
                capture_fields.push((cap.name.clone(), c.clone()));
                crate::ir::IrStructField {
                    c_type: CType::new(c),
                    name: cap.name.clone(),
                }
            })
            .collect();
        gen.module.struct_defs.push(crate::ir::IrStructDef {
            name: env_name.clone(),
            fields,
        });
    }

    let mut params: Vec<IrParam> = lambda
        .params
        .iter()
        .map(|p| IrParam {
            c_type: CType::new(gen.ctype(Some(&p.ty))),
            name: p.name.clone(),
        })
        .collect();
    // The fn-ptr typedef carries no env parameter; captured lambdas
    // are called directly by name with the env appended, bypassing
    // the pointer.
    if has_captures {
        params.push(IrParam {
            c_type: CType::new("void*"),
            name: "__btrc_env".to_string(),
        });
    }

    // Return type: explicit annotation, or the analyzer's __fn_ptr.
    let ret_type = match &lambda.return_type {
        Some(rt) => gen.ctype(Some(rt)),
        None => match gen.node_type(node.id) {
            Some(t) if t.base == "__fn_ptr" && !t.generic_args.is_empty() => {
                let rt = t.generic_args[0].clone();
                gen.ctype(Some(&rt))
            }
            _ => match &lambda.body {
                LambdaBody::Expr(e) => match gen.node_type(e.id) {
                    Some(t) => gen.ctype(Some(&t)),
                    None => "int".to_string(),
                },
                LambdaBody::Block(_) => "void".to_string(),
            },
        },
    };

    let mut body_stmts = Vec::new();

    // Unpack captures from the env pointer.
    if has_captures {
        body_stmts.push(IrStmt::VarDecl {
            c_type: CType::new(format!("struct {}*", env_name)),
            name: "__env".to_string(),
            init: Some(IrExpr::cast(
                format!("struct {}*", env_name),
                IrExpr::var("__btrc_env"),
            )),
        });
        for (cap_name, cap_type) in &capture_fields {
            body_stmts.push(IrStmt::VarDecl {
                c_type: CType::new(cap_type.clone()),
                name: cap_name.clone(),
                init: Some(IrExpr::field(IrExpr::var("__env"), cap_name.clone(), true)),
            });
        }
    }

    // The lambda body is a separate C function — it must not inherit
    // the parent's ARC-managed variables or try depth.
    let saved_managed = std::mem::take(&mut gen.managed_stack);
    let saved_try = std::mem::replace(&mut gen.in_try_depth, 0);
    match &lambda.body {
        LambdaBody::Block(b) => {
            let block = lower_block(gen, b);
            body_stmts.extend(block.stmts);
        }
        LambdaBody::Expr(e) => {
            let stmts = lower_stmt(
                gen,
                &Stmt::Return {
                    value: Some(e.clone()),
                },
            );
            body_stmts.extend(stmts);
        }
    }
    gen.managed_stack = saved_managed;
    gen.in_try_depth = saved_try;

    gen.module.function_defs.push(IrFunctionDef {
        name: fn_name.clone(),
        return_type: CType::new(ret_type),
        params,
        body: IrBlock::new(body_stmts),
        is_static: true,
        source_line: None,
    });

    gen.pending_lambda = Some(PendingLambda {
        fn_name: fn_name.clone(),
        env_struct: has_captures.then(|| env_name),
        captures: capture_fields,
    });

    IrExpr::raw(fn_name)
}

/// `T f = <lambda>;` — declare the variable as the interned fn-ptr
/// typedef; for captured lambdas, materialize the env struct next to
/// it and remember the pair for call sites.
pub fn lower_lambda_var_decl(gen: &mut IrGenerator, node: &VarDecl, init: &Expr) -> Vec<IrStmt> {
    let lowered = super::expressions::lower_expr(gen, init);
    let pending = gen.pending_lambda.take();

    let c_type = match gen.node_type(init.id) {
        Some(t) if t.base == "__fn_ptr" => {
            super::types::fn_ptr_typedef_name(&t, &mut gen.fn_ptr_typedefs)
        }
        _ => match &node.ty {
            Some(t) => gen.ctype(Some(t)),
            None => "int".to_string(),
        },
    };

    let mut stmts = Vec::new();
    if let Some(pending) = pending {
        if let Some(env_struct) = &pending.env_struct {
            let env_var = format!("{}_data", env_struct);
            stmts.push(IrStmt::VarDecl {
                c_type: CType::new(format!("struct {}", env_struct)),
                name: env_var.clone(),
                init: None,
            });
            for (cap_name, _) in &pending.captures {
                stmts.push(IrStmt::Assign {
                    target: IrExpr::field(IrExpr::var(&env_var), cap_name.clone(), false),
                    value: IrExpr::var(cap_name),
                });
            }
            gen.fn_ptr_envs
                .insert(node.name.clone(), (pending.fn_name.clone(), env_var));
        }
    }

    stmts.push(IrStmt::VarDecl {
        c_type: CType::new(c_type),
        name: node.name.clone(),
        init: Some(lowered),
    });
    stmts
}
