// Control flow lowering: if, switch, delete, try/catch, throw.

use btrc_ast::*;

use super::expressions::lower_expr;
use super::statements::{lower_block, lower_stmt};
use super::types::{is_generic_class_type, mangle_generic_type};
use super::IrGenerator;
use crate::ir::{CType, IrBlock, IrCase, IrExpr, IrStmt};

pub fn lower_if(gen: &mut IrGenerator, node: &IfStmt) -> IrStmt {
    let cond = lower_expr(gen, &node.condition);
    let then_block = lower_block(gen, &node.then_block);
    let else_block = match &node.else_branch {
        Some(ElseBranch::Else(b)) => Some(lower_block(gen, b)),
        Some(ElseBranch::ElseIf(inner)) => {
            // Chain: else if → nested IrStmt::If inside an else block.
            let inner = lower_if(gen, inner);
            Some(IrBlock::new(vec![inner]))
        }
        None => None,
    };
    IrStmt::If {
        condition: cond,
        then_block,
        else_block,
    }
}

pub fn lower_switch(gen: &mut IrGenerator, node: &SwitchStmt) -> IrStmt {
    let value = lower_expr(gen, &node.value);
    let mut cases = Vec::new();
    for c in &node.cases {
        let case_value = c.value.as_ref().map(|v| lower_expr(gen, v));
        let mut body = Vec::new();
        for s in &c.body {
            body.extend(lower_stmt(gen, s));
        }
        cases.push(IrCase {
            value: case_value,
            body,
        });
    }
    IrStmt::Switch { value, cases }
}

/// `delete x` → destructor call chosen from the class table; plain
/// `free` for non-class pointers.
pub fn lower_delete(gen: &mut IrGenerator, expr: &Expr) -> Vec<IrStmt> {
    let obj_type = gen.node_type(expr.id);
    let obj = lower_expr(gen, expr);

    if let Some(t) = &obj_type {
        if let Some(cls_info) = gen.analyzed.class_table.get(&t.base) {
            let callee =
                if !t.generic_args.is_empty() && is_generic_class_type(Some(t), &gen.analyzed.class_table) {
                    let mangled = mangle_generic_type(&t.base, &t.generic_args);
                    let dtor = if cls_info.methods.contains_key("free") {
                        "free"
                    } else {
                        "destroy"
                    };
                    format!("{}_{}", mangled, dtor)
                } else {
                    format!("{}_destroy", t.base)
                };
            return vec![IrStmt::ExprStmt {
                expr: IrExpr::call(callee, vec![obj]),
            }];
        }
        // Built-in collections free through their mangled helper.
        if matches!(t.base.as_str(), "List" | "Map" | "Set") && !t.generic_args.is_empty() {
            let mangled = mangle_generic_type(&t.base, &t.generic_args);
            return vec![IrStmt::ExprStmt {
                expr: IrExpr::call(format!("{}_free", mangled), vec![obj]),
            }];
        }
    }
    vec![IrStmt::ExprStmt {
        expr: IrExpr::call("free", vec![obj]),
    }]
}

/// try/catch lowers to a growable setjmp stack; catch binds the error
/// message, finally appends after the guarded if/else.
pub fn lower_try_catch(gen: &mut IrGenerator, node: &TryCatchStmt) -> Vec<IrStmt> {
    gen.use_helper("__btrc_trycatch_globals");
    gen.use_helper("__btrc_throw");

    let mut stmts: Vec<IrStmt> = Vec::new();
    stmts.push(IrStmt::RawC {
        text: concat!(
            "if (!__btrc_try_stack) {\n",
            "    __btrc_try_stack = (jmp_buf*)malloc(sizeof(jmp_buf) * __btrc_try_cap);\n",
            "}\n",
            "if (__btrc_try_top + 1 >= __btrc_try_cap) {\n",
            "    __btrc_try_cap *= 2;\n",
            "    __btrc_try_stack = (jmp_buf*)realloc(__btrc_try_stack, sizeof(jmp_buf) * __btrc_try_cap);\n",
            "}\n",
            "__btrc_try_top++;"
        )
        .to_string(),
        helper_refs: vec![
            "__btrc_trycatch_globals".to_string(),
            "__btrc_throw".to_string(),
        ],
    });

    gen.in_try_depth += 1;
    log::trace!("lowering try block at depth {}", gen.in_try_depth);
    let mut try_body = lower_block(gen, &node.try_block);
    gen.in_try_depth -= 1;
    try_body.stmts.push(IrStmt::raw("__btrc_try_top--;"));

    let mut catch_body = lower_block(gen, &node.catch_block);
    if let Some(var) = &node.catch_var {
        catch_body.stmts.insert(
            0,
            IrStmt::VarDecl {
                c_type: CType::new("const char*"),
                name: var.clone(),
                init: Some(IrExpr::var("__btrc_error_msg")),
            },
        );
    }

    stmts.push(IrStmt::If {
        condition: IrExpr::raw("setjmp(__btrc_try_stack[__btrc_try_top]) == 0"),
        then_block: try_body,
        else_block: Some(catch_body),
    });

    if let Some(finally) = &node.finally_block {
        let fin = lower_block(gen, finally);
        stmts.extend(fin.stmts);
    }

    stmts
}

pub fn lower_throw(gen: &mut IrGenerator, expr: &Expr) -> Vec<IrStmt> {
    gen.use_helper("__btrc_throw");
    let e = lower_expr(gen, expr);
    vec![IrStmt::ExprStmt {
        expr: IrExpr::call_helper("__btrc_throw", vec![e]),
    }]
}
