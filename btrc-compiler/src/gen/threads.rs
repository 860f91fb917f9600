// Thread lowering: spawn(lambda) → static void*(void*) wrapper +
// __btrc_thread_spawn call.
//
// Thread<T> at the C level is just __btrc_thread_t*; .join() is
// handled in methods.rs with result unboxing.

use btrc_ast::*;

use super::statements::{lower_block, quick_text};
use super::IrGenerator;
use crate::ir::{CType, IrBlock, IrExpr, IrFunctionDef, IrParam, IrStmt};

const PRIMITIVE_TYPES: &[&str] = &["int", "float", "double", "char", "bool", "short", "long"];

pub fn lower_spawn(gen: &mut IrGenerator, node: &Expr) -> IrExpr {
    let ExprKind::Spawn { func } = &node.kind else {
        return IrExpr::lit("NULL");
    };

    if !gen.module.includes.iter().any(|i| i == "pthread.h") {
        gen.module.includes.push("pthread.h".to_string());
    }
    gen.use_helper("__btrc_thread_spawn");

    let ExprKind::Lambda(lambda) = &func.kind else {
        // Non-lambda spawn: treat as a function pointer.
        let fn_expr = super::expressions::lower_expr(gen, func);
        return IrExpr::SpawnThread {
            fn_ptr: quick_text(&fn_expr),
            capture_arg: None,
        };
    };

    let ret_c_type = infer_lambda_ret_type(gen, func, lambda);
    let spawn_id = gen.fresh_lambda_id();
    let wrapper_name = format!("__btrc_spawn_wrapper_{}", spawn_id);
    let env_name = format!("__btrc_spawn_env_{}", spawn_id);

    let captures = gen
        .analyzed
        .lambda_captures
        .get(&func.id)
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
        gen.module
            .forward_decls
            .push(format!("typedef struct {} {};", env_name, env_name));
        gen.module.struct_defs.push(crate::ir::IrStructDef {
            name: env_name.clone(),
            fields,
        });
    }

    // Wrapper body: unpack captures, run the lambda, box the result.
    let mut body_stmts = Vec::new();
    if has_captures {
        body_stmts.push(IrStmt::VarDecl {
            c_type: CType::new(format!("{}*", env_name)),
            name: "__env".to_string(),
            init: Some(IrExpr::cast(format!("{}*", env_name), IrExpr::var("__arg"))),
        });
        for (cap_name, cap_type) in &capture_fields {
            body_stmts.push(IrStmt::VarDecl {
                c_type: CType::new(cap_type.clone()),
                name: cap_name.clone(),
                init: Some(IrExpr::field(IrExpr::var("__env"), cap_name.clone(), true)),
            });
        }
    }

    let saved_managed = std::mem::take(&mut gen.managed_stack);
    match &lambda.body {
        LambdaBody::Block(b) => {
            let block = lower_block(gen, b);
            for stmt in block.stmts {
                body_stmts.push(rewrite_return(stmt, &ret_c_type));
            }
        }
        LambdaBody::Expr(e) => {
            let expr = super::expressions::lower_expr(gen, e);
            body_stmts.push(IrStmt::Return {
                value: Some(box_result(expr, &ret_c_type)),
            });
        }
    }
    gen.managed_stack = saved_managed;

    if ret_c_type == "void" {
        body_stmts.push(IrStmt::Return {
            value: Some(IrExpr::lit("NULL")),
        });
    }

    gen.module.function_defs.push(IrFunctionDef {
        name: wrapper_name.clone(),
        return_type: CType::new("void*"),
        params: vec![IrParam {
            c_type: CType::new("void*"),
            name: "__arg".to_string(),
        }],
        body: IrBlock::new(body_stmts),
        is_static: true,
        source_line: None,
    });

    if has_captures {
        // Allocate + populate the capture struct in a statement
        // expression around the spawn call.
        let env_var = format!("__se{}", spawn_id);
        let mut parts = vec![format!(
            "{}* {} = ({}*)malloc(sizeof({}))",
            env_name, env_var, env_name, env_name
        )];
        for (cap_name, _) in &capture_fields {
            parts.push(format!("{}->{} = {}", env_var, cap_name, cap_name));
        }
        parts.push(format!(
            "__btrc_thread_spawn((void*(*)(void*)){}, (void*){})",
            wrapper_name, env_var
        ));
        IrExpr::raw(format!("({{ {}; }})", parts.join("; ")))
    } else {
        IrExpr::SpawnThread {
            fn_ptr: wrapper_name,
            capture_arg: None,
        }
    }
}

fn infer_lambda_ret_type(gen: &mut IrGenerator, func: &Expr, lambda: &LambdaExpr) -> String {
    if let Some(rt) = &lambda.return_type {
        return gen.ctype(Some(rt));
    }
    if let Some(t) = gen.node_type(func.id) {
        if t.base == "__fn_ptr" && !t.generic_args.is_empty() {
            let rt = t.generic_args[0].clone();
            return gen.ctype(Some(&rt));
        }
    }
    if let LambdaBody::Expr(e) = &lambda.body {
        if let Some(t) = gen.node_type(e.id) {
            return gen.ctype(Some(&t));
        }
        return "int".to_string();
    }
    "void".to_string()
}

/// Box a result value into void* for the thread wrapper return.
/// Primitives go through intptr_t, pointers cast directly.
fn box_result(expr: IrExpr, ret_c_type: &str) -> IrExpr {
    if ret_c_type == "void" {
        return IrExpr::lit("NULL");
    }
    if PRIMITIVE_TYPES.contains(&ret_c_type.trim()) {
        return IrExpr::cast("void*", IrExpr::cast("intptr_t", expr));
    }
    IrExpr::cast("void*", expr)
}

fn rewrite_return(stmt: IrStmt, ret_c_type: &str) -> IrStmt {
    match stmt {
        IrStmt::Return { value } => match value {
            Some(v) => IrStmt::Return {
                value: Some(box_result(v, ret_c_type)),
            },
            None => IrStmt::Return {
                value: Some(IrExpr::lit("NULL")),
            },
        },
        other => other,
    }
}
