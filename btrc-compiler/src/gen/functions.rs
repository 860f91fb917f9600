// Function lowering: FunctionDecl → IrFunctionDef.

use btrc_ast::FunctionDecl;

use super::statements::lower_block;
use super::IrGenerator;
use crate::ir::{CType, IrFunctionDef, IrParam, IrStmt};

pub fn emit_function_decl(gen: &mut IrGenerator, decl: &FunctionDecl) {
    // Generic free functions are instantiated where called; the
    // unresolved template itself emits nothing.
    if !decl.generic_params.is_empty() {
        return;
    }

    let mut ret_type = gen.ctype(decl.return_type.as_ref());
    let params: Vec<IrParam> = decl
        .params
        .iter()
        .map(|p| IrParam {
            c_type: CType::new(gen.ctype(Some(&p.ty))),
            name: p.name.clone(),
        })
        .collect();

    // Body-less declaration → forward decl only.
    let Some(body) = &decl.body else {
        let param_str = if params.is_empty() {
            "void".to_string()
        } else {
            params
                .iter()
                .map(|p| format!("{} {}", p.c_type, p.name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        gen.module
            .forward_decls
            .push(format!("{} {}({});", ret_type, decl.name, param_str));
        return;
    };

    // main returns int even when declared void.
    if decl.name == "main" && ret_type == "void" {
        ret_type = "int".to_string();
    }

    let saved_keep = gen.current_fn_keep_return;
    gen.current_fn_keep_return = decl.keep_return;
    let mut block = lower_block(gen, body);
    gen.current_fn_keep_return = saved_keep;

    if decl.name == "main" && !matches!(block.stmts.last(), Some(IrStmt::Return { .. })) {
        block.stmts.push(IrStmt::Return {
            value: Some(crate::ir::IrExpr::lit("0")),
        });
    }

    gen.module.function_defs.push(IrFunctionDef {
        name: decl.name.clone(),
        return_type: CType::new(ret_type),
        params,
        body: block,
        is_static: false,
        source_line: Some(decl.line),
    });
}
